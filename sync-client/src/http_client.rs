//! Minimal HTTP transport for the five sync RPCs.
//!
//! The wire format is plain HTTP: block transfer uses raw bytes in the
//! request/response body (`GET`/`POST /block/<hash>`), while the
//! structured calls (`get_fileinfo_map`, `update_file`) exchange JSON.
//! Any bidirectional request/response transport would satisfy the
//! protocol; this one is chosen for its ubiquity and the minimal
//! dependency footprint.

use anyhow::{bail, format_err, Error};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use sync_api_types::{FileInfoMap, UpdateFileRequest, UpdateFileResponse};

pub struct HttpClient {
    base_url: String,
    inner: Client<HttpConnector, Full<Bytes>>,
}

impl HttpClient {
    pub fn new(host: &str, port: u16) -> Self {
        let inner = Client::builder(TokioExecutor::new()).build_http();
        Self {
            base_url: format!("http://{host}:{port}"),
            inner,
        }
    }

    fn uri(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: Request<Full<Bytes>>) -> Result<(StatusCode, Bytes), Error> {
        let resp = self
            .inner
            .request(req)
            .await
            .map_err(|err| format_err!("request failed - {err}"))?;

        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|err| format_err!("reading response body failed - {err}"))?
            .to_bytes();

        Ok((status, body))
    }

    fn empty_body_request(&self, method: Method, path: &str) -> Result<Request<Full<Bytes>>, Error> {
        Request::builder()
            .method(method)
            .uri(self.uri(path))
            .body(Full::new(Bytes::new()))
            .map_err(|err| format_err!("building request failed - {err}"))
    }

    fn body_request(
        &self,
        method: Method,
        path: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<Request<Full<Bytes>>, Error> {
        Request::builder()
            .method(method)
            .uri(self.uri(path))
            .header("content-type", content_type)
            .body(Full::new(Bytes::from(body)))
            .map_err(|err| format_err!("building request failed - {err}"))
    }

    /// Liveness probe.
    pub async fn ping(&self) -> Result<(), Error> {
        let req = self.empty_body_request(Method::GET, "/ping")?;
        let (status, _) = self.send(req).await?;
        if !status.is_success() {
            bail!("ping failed with status {status}");
        }
        Ok(())
    }

    /// Returns the block bound to `hash`, or an empty `Vec` if the server
    /// has no such binding.
    pub async fn get_block(&self, hash: &str) -> Result<Vec<u8>, Error> {
        let req = self.empty_body_request(Method::GET, &format!("/block/{hash}"))?;
        let (status, body) = self.send(req).await?;
        if !status.is_success() {
            bail!("get_block({hash}) failed with status {status}");
        }
        Ok(body.to_vec())
    }

    /// Binds `hash` to `data` on the server. Idempotent.
    pub async fn store_block(&self, hash: &str, data: Vec<u8>) -> Result<(), Error> {
        let req = self.body_request(
            Method::POST,
            &format!("/block/{hash}"),
            "application/octet-stream",
            data,
        )?;
        let (status, _) = self.send(req).await?;
        if !status.is_success() {
            bail!("store_block({hash}) failed with status {status}");
        }
        Ok(())
    }

    /// Fetches a single atomic snapshot of the server's file-info map.
    pub async fn get_fileinfo_map(&self) -> Result<FileInfoMap, Error> {
        let req = self.empty_body_request(Method::GET, "/fileinfo")?;
        let (status, body) = self.send(req).await?;
        if !status.is_success() {
            bail!("get_fileinfo_map failed with status {status}");
        }
        let map: FileInfoMap = serde_json::from_slice(&body)
            .map_err(|err| format_err!("decoding fileinfo map failed - {err}"))?;
        Ok(map)
    }

    /// Submits a new (version, hashlist) for `filename`. Returns whether
    /// the server accepted it.
    pub async fn update_file(
        &self,
        filename: &str,
        version: u64,
        hashlist: Vec<String>,
    ) -> Result<bool, Error> {
        let payload = UpdateFileRequest {
            filename: filename.to_string(),
            version,
            hashlist,
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|err| format_err!("encoding update_file request failed - {err}"))?;
        let req = self.body_request(Method::POST, "/update_file", "application/json", body)?;
        let (status, body) = self.send(req).await?;
        if !status.is_success() {
            bail!("update_file({filename}) failed with status {status}");
        }
        let resp: UpdateFileResponse = serde_json::from_slice(&body)
            .map_err(|err| format_err!("decoding update_file response failed - {err}"))?;
        Ok(resp.accepted)
    }
}
