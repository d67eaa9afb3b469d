//! SHA-1 checksum utilities for artifact integrity.
//!
//! Repositories publish a `.sha1` file next to each artifact; these helpers
//! compute and compare those checksums.

use crate::error::{MvnrError, MvnrResult};
use camino::Utf8Path;
use sha1::{Digest, Sha1};
use std::io::Read;

/// Compute the hex SHA-1 of data
pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the hex SHA-1 of a file, streaming its contents
pub fn sha1_file(path: &Utf8Path) -> MvnrResult<String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| MvnrError::io(format!("Failed to open {path}"), e))?;
    let mut hasher = Sha1::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|e| MvnrError::io(format!("Failed to read {path}"), e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Extract the digest from the contents of a `.sha1` file.
///
/// Published files sometimes carry the file name after the digest
/// (`<digest>  name.jar`); only the first token counts.
pub fn parse_checksum_file(contents: &str) -> Option<String> {
    contents
        .split_whitespace()
        .next()
        .filter(|token| token.len() == 40 && token.chars().all(|c| c.is_ascii_hexdigit()))
        .map(str::to_ascii_lowercase)
}

/// Verify a file against an expected SHA-1 digest
pub fn verify_checksum(path: &Utf8Path, coordinate: &str, expected: &str) -> MvnrResult<()> {
    let actual = sha1_file(path)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(MvnrError::ChecksumMismatch {
            coordinate: coordinate.to_string(),
            expected: expected.trim().to_ascii_lowercase(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::io::Write;

    const HELLO_SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";

    #[test]
    fn test_sha1_hex() {
        assert_eq!(sha1_hex(b"hello world"), HELLO_SHA1);
    }

    #[test]
    fn test_sha1_file_matches_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf()).unwrap();
        assert_eq!(sha1_file(&path).unwrap(), HELLO_SHA1);
    }

    #[test]
    fn test_verify_checksum() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf()).unwrap();

        assert!(verify_checksum(&path, "g:a:jar:1", &HELLO_SHA1.to_uppercase()).is_ok());
        let err = verify_checksum(&path, "g:a:jar:1", &"0".repeat(40)).unwrap_err();
        assert!(matches!(err, MvnrError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_parse_checksum_file() {
        assert_eq!(
            parse_checksum_file(&format!("{}  lib-1.0.jar\n", HELLO_SHA1.to_uppercase())),
            Some(HELLO_SHA1.to_string())
        );
        assert_eq!(parse_checksum_file("not-a-digest"), None);
        assert_eq!(parse_checksum_file(""), None);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = sha1_file(Utf8Path::new("/definitely/not/here.jar")).unwrap_err();
        assert!(matches!(err, MvnrError::Io { .. }));
    }
}
