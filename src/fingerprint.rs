//! Declaration fingerprinting
//!
//! A tariff is identified by the SHA-256 of its declaration file plus its
//! table files, table paths sorted so the digest does not depend on
//! registration order. Hosts use this to tell whether two deployments
//! price from the same declaration.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Hex SHA-256 over the declaration and all of its tables.
pub fn tariff_hash(declaration: &Path, table_paths: &[PathBuf]) -> io::Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(fs::read(declaration)?);

    let mut sorted: Vec<&PathBuf> = table_paths.iter().collect();
    sorted.sort();
    for path in sorted {
        hasher.update(fs::read(path)?);
    }

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        write!(hex, "{:02x}", byte).expect("writing to a String cannot fail");
    }
    Ok(hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_hash_is_stable_and_order_independent() {
        let tariff = temp_file("nodes: ...");
        let table_a = temp_file("min,max,value\n18,25,1.8\n");
        let table_b = temp_file("brand,factor\nBMW,1.15\n");

        let forward = tariff_hash(
            tariff.path(),
            &[table_a.path().to_path_buf(), table_b.path().to_path_buf()],
        )
        .unwrap();
        let reversed = tariff_hash(
            tariff.path(),
            &[table_b.path().to_path_buf(), table_a.path().to_path_buf()],
        )
        .unwrap();

        assert_eq!(forward, reversed);
        assert_eq!(forward.len(), 64);
    }

    #[test]
    fn test_hash_changes_with_content() {
        let tariff = temp_file("nodes: ...");
        let table_v1 = temp_file("min,max,value\n18,25,1.8\n");
        let table_v2 = temp_file("min,max,value\n18,25,1.9\n");

        let v1 = tariff_hash(tariff.path(), &[table_v1.path().to_path_buf()]).unwrap();
        let v2 = tariff_hash(tariff.path(), &[table_v2.path().to_path_buf()]).unwrap();
        assert_ne!(v1, v2);
    }
}
