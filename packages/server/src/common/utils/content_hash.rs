/// Fingerprint a job's defining input.
///
/// MD5 hex digest of the raw bytes. No normalization: the key of a listing
/// URL must stay identical to the one stored in existing cache snapshots.
pub fn generate_content_hash(text: &str) -> String {
    format!("{:x}", md5::compute(text.as_bytes()))
}

/// Whether `candidate` looks like a key produced by [`generate_content_hash`].
pub fn is_content_hash(candidate: &str) -> bool {
    candidate.len() == 32 && candidate.chars().all(|c| c.is_ascii_hexdigit())
}
