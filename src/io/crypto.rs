use crate::error::Result;
use sha2::{Digest, Sha256};
use std::{fs::File, io::Read, path::Path};

/// Content hash and length of a file, computed in one pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDigest {
    pub sha256: String,
    pub size: u64,
}

impl FileDigest {
    pub fn matches(&self, expected_hex: &str) -> bool {
        self.sha256.eq_ignore_ascii_case(expected_hex)
    }
}

pub fn digest_file(path: &Path) -> Result<FileDigest> {
    let mut f = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut size = 0u64;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok(FileDigest {
        sha256: hex::encode(hasher.finalize()),
        size,
    })
}

/// `false` when the file is missing or unreadable.
pub fn is_cached(path: &Path, expected_hex: &str) -> bool {
    digest_file(path).is_ok_and(|d| d.matches(expected_hex))
}
