//! HTTP front end binding the five RPCs (§6) onto [`sync_datastore::Server`].
//!
//! Each accepted connection is handled on its own spawned task, playing
//! the role a pool of worker threads would in a thread-per-request
//! design: the datastore's own locking (see `sync-datastore`) is what
//! actually serializes conflicting `update_file` calls, not anything in
//! this module.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use log::{info, warn};
use tokio::net::TcpListener;

use sync_api_types::{FileInfoMap, UpdateFileRequest, UpdateFileResponse};
use sync_datastore::Server as Datastore;

/// Binds `addr` and serves the RPC surface until the process is killed.
pub async fn run(addr: SocketAddr, datastore: Arc<Datastore>) -> Result<(), Error> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("unable to bind {addr}"))?;

    info!("listening on {}", listener.local_addr()?);

    serve(listener, datastore).await
}

/// Serves the RPC surface on an already-bound listener. Split out from
/// [`run`] so tests can bind an ephemeral port and learn the chosen
/// address before the accept loop starts.
pub async fn serve(listener: TcpListener, datastore: Arc<Datastore>) -> Result<(), Error> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!("accept failed - {err}");
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let datastore = Arc::clone(&datastore);

        tokio::spawn(async move {
            let service = service_fn(move |req| handle(Arc::clone(&datastore), req));
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!("connection from {peer} failed - {err}");
            }
        });
    }
}

async fn handle(
    datastore: Arc<Datastore>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/ping") => {
            datastore.ping();
            empty_response(StatusCode::OK)
        }
        (&Method::GET, p) if p.starts_with("/block/") => {
            let hash = &p["/block/".len()..];
            bytes_response(StatusCode::OK, datastore.get_block(hash))
        }
        (&Method::POST, p) if p.starts_with("/block/") => {
            let hash = p["/block/".len()..].to_string();
            match read_body(req).await {
                Ok(data) => {
                    datastore.store_block(hash, data);
                    empty_response(StatusCode::OK)
                }
                Err(err) => error_response(err),
            }
        }
        (&Method::GET, "/fileinfo") => {
            let map: FileInfoMap = datastore.get_fileinfo_map();
            match serde_json::to_vec(&map) {
                Ok(body) => bytes_response(StatusCode::OK, body),
                Err(err) => error_response(err.into()),
            }
        }
        (&Method::POST, "/update_file") => match read_body(req).await {
            Ok(data) => match serde_json::from_slice::<UpdateFileRequest>(&data) {
                Ok(update) => {
                    let accepted = datastore.update_file(&update.filename, update.version, update.hashlist);
                    let body = serde_json::to_vec(&UpdateFileResponse { accepted })
                        .expect("UpdateFileResponse always serializes");
                    bytes_response(StatusCode::OK, body)
                }
                Err(err) => error_response(err.into()),
            },
            Err(err) => error_response(err),
        },
        _ => empty_response(StatusCode::NOT_FOUND),
    };

    Ok(response)
}

async fn read_body(req: Request<Incoming>) -> Result<Vec<u8>, Error> {
    let collected = req
        .into_body()
        .collect()
        .await
        .context("reading request body failed")?;
    Ok(collected.to_bytes().to_vec())
}

fn empty_response(status: StatusCode) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::new()))
        .expect("static response is always well-formed")
}

fn bytes_response(status: StatusCode, body: Vec<u8>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(body)))
        .expect("static response is always well-formed")
}

fn error_response(err: Error) -> Response<Full<Bytes>> {
    warn!("request handling failed - {err}");
    bytes_response(StatusCode::BAD_REQUEST, format!("{err}").into_bytes())
}
