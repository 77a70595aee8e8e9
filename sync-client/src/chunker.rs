//! Fixed-size block splitting and content hashing.
//!
//! Blocks are always exactly `block_size` bytes except possibly the last,
//! which may be shorter. An empty file produces zero blocks, not one
//! zero-length block.

/// Split `data` into fixed-size blocks of `block_size` bytes, the last one
/// possibly shorter.
pub fn split_into_blocks(data: &[u8], block_size: usize) -> Vec<Vec<u8>> {
    if data.is_empty() {
        return Vec::new();
    }
    data.chunks(block_size).map(|c| c.to_vec()).collect()
}

/// Hex-encoded cryptographic digest identifying a block's content.
pub fn hash_block(data: &[u8]) -> String {
    hex::encode(openssl::sha::sha256(data))
}

/// Hashlist for `data`: the ordered hashes of its blocks.
pub fn hashlist_for(data: &[u8], block_size: usize) -> Vec<String> {
    split_into_blocks(data, block_size)
        .iter()
        .map(|block| hash_block(block))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_has_empty_hashlist() {
        assert_eq!(hashlist_for(b"", 4), Vec::<String>::new());
    }

    #[test]
    fn exact_multiple_of_block_size() {
        // "B" = 4: "helloworld" bugs out at 10 bytes -> 3 blocks, last short
        let blocks = split_into_blocks(b"hello world!", 4);
        assert_eq!(blocks, vec![b"hell".to_vec(), b"o wo".to_vec(), b"rld!".to_vec()]);
    }

    #[test]
    fn size_b_minus_one() {
        let blocks = split_into_blocks(b"abc", 4);
        assert_eq!(blocks, vec![b"abc".to_vec()]);
    }

    #[test]
    fn size_b_plus_one() {
        let blocks = split_into_blocks(b"abcde", 4);
        assert_eq!(blocks, vec![b"abcd".to_vec(), b"e".to_vec()]);
    }

    #[test]
    fn roundtrip_law() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let blocks = split_into_blocks(data, 4);
        let concatenated: Vec<u8> = blocks.iter().flatten().copied().collect();
        assert_eq!(concatenated, data);
    }

    #[test]
    fn deduplicates_identical_blocks() {
        let data = vec![0u8; 16]; // four identical all-zero blocks at B=4
        let hashlist = hashlist_for(&data, 4);
        assert_eq!(hashlist.len(), 4);
        assert!(hashlist.iter().all(|h| *h == hashlist[0]));
    }

    #[test]
    fn hash_is_hex_and_never_the_tombstone_value() {
        let h = hash_block(b"hello");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(h, "0");
    }
}
