/// Content hashing — streaming digests and the duplicate index.
///
/// Digests are computed with bounded-size chunked reads so arbitrarily
/// large files never get loaded into memory. Grouping is two-stage
/// (size first, digest second) so a dedupe scan only hashes files that
/// share a size with at least one other file.
pub mod index;

pub use index::{find_dupes, group_by_hash, start_dupe_scan};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read buffer for streaming digests.
const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// Supported content-hash algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha256 => write!(f, "sha256"),
            HashAlgorithm::Blake3 => write!(f, "blake3"),
        }
    }
}

/// Compute the hex digest of a file's contents via chunked reads.
pub fn hash_file(path: &Path, algo: HashAlgorithm) -> io::Result<String> {
    let file = File::open(path)?;
    match algo {
        HashAlgorithm::Sha256 => hash_sha256(file),
        HashAlgorithm::Blake3 => hash_blake3(file),
    }
}

fn hash_sha256(mut file: File) -> io::Result<String> {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn hash_blake3(mut file: File) -> io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}
