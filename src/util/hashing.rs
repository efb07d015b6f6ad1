// bmk/src/util/hashing.rs
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

/// Length of the hash used for URLs and domains.
const URL_HASH_LEN: usize = 12;
/// Length of the record checksum.
const CHECKSUM_LEN: usize = 8;

/// SHA-256 of the input, base64-url encoded without padding, truncated to
/// `len` characters.
fn hash_n(data: &str, len: usize) -> String {
    let digest = Sha256::digest(data.as_bytes());
    let mut encoded = URL_SAFE_NO_PAD.encode(digest);
    encoded.truncate(len);
    encoded
}

/// Fixed-length hash of a URL.
pub fn hash_url(url: &str) -> String {
    hash_n(url, URL_HASH_LEN)
}

/// Fixed-length hash of a domain name.
pub fn hash_domain(domain: &str) -> String {
    hash_n(domain, URL_HASH_LEN)
}

/// Record checksum over URL, title, description and the canonical tag form.
/// Any re-canonicalization that changes the tag string changes the checksum.
pub fn checksum(url: &str, title: &str, desc: &str, tags: &str) -> String {
    let input = format!("u:{}|t:{}|d:{}|tags:{}", url, title, desc, tags);
    hash_n(&input, CHECKSUM_LEN)
}
