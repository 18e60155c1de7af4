//! Content hashing and byte-level difference summaries.
//!
//! Both files are streamed in fixed-size chunks; neither is ever held in
//! memory in full.

use crate::html::{escape, group_thousands};
use crate::{ArchiveError, ArchiveResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Chunk size used for hashing and comparison. Both sides always use the
/// same size so positions stay aligned.
pub const CHUNK_SIZE: usize = 80 * 1024;

/// Hashes, sizes and differing byte count of two files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub original_sha256: String,
    pub changed_sha256: String,
    pub original_size: u64,
    pub changed_size: u64,
    pub different_bytes: u64,
    /// Differing positions relative to the larger file, in percent.
    pub difference_percent: f64,
}

impl DiffSummary {
    /// Whether both sides have the same content hash.
    pub fn is_identical(&self) -> bool {
        self.original_sha256 == self.changed_sha256
    }

    /// Render the summary as an HTML table.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        html.push_str("<table><thead><tr><th></th><th>Original</th><th>Changed</th></tr></thead><tbody>");
        html.push_str(&format!(
            "<tr><td>SHA-256</td><td><code>{}</code></td><td><code>{}</code></td></tr>",
            escape(&self.original_sha256),
            escape(&self.changed_sha256)
        ));
        html.push_str(&format!(
            "<tr><td>Size</td><td>{} bytes</td><td>{} bytes</td></tr>",
            group_thousands(self.original_size),
            group_thousands(self.changed_size)
        ));
        html.push_str(&format!(
            "<tr><td>Different bytes</td><td colspan='2'>{} ({:.2}% of larger file)</td></tr>",
            group_thousands(self.different_bytes),
            self.difference_percent
        ));
        html.push_str("</tbody></table>");
        html
    }
}

/// Compute the difference summary on a blocking worker.
pub async fn compute(original: &Path, changed: &Path) -> ArchiveResult<DiffSummary> {
    let original: PathBuf = original.to_path_buf();
    let changed: PathBuf = changed.to_path_buf();
    tokio::task::spawn_blocking(move || compute_blocking(&original, &changed)).await?
}

/// Compute the difference summary on the current thread.
pub fn compute_blocking(original: &Path, changed: &Path) -> ArchiveResult<DiffSummary> {
    let mut a = File::open(original).map_err(|e| ArchiveError::io_at(original, e))?;
    let mut b = File::open(changed).map_err(|e| ArchiveError::io_at(changed, e))?;

    let original_size = a.metadata().map_err(|e| ArchiveError::io_at(original, e))?.len();
    let changed_size = b.metadata().map_err(|e| ArchiveError::io_at(changed, e))?.len();

    let mut buf_a = vec![0u8; CHUNK_SIZE];
    let mut buf_b = vec![0u8; CHUNK_SIZE];

    let original_sha256 =
        hash_from_start(&mut a, &mut buf_a).map_err(|e| ArchiveError::io_at(original, e))?;
    let changed_sha256 =
        hash_from_start(&mut b, &mut buf_b).map_err(|e| ArchiveError::io_at(changed, e))?;

    a.seek(SeekFrom::Start(0))?;
    b.seek(SeekFrom::Start(0))?;

    let mut different_bytes = 0u64;
    loop {
        let read_a = read_chunk(&mut a, &mut buf_a).map_err(|e| ArchiveError::io_at(original, e))?;
        let read_b = read_chunk(&mut b, &mut buf_b).map_err(|e| ArchiveError::io_at(changed, e))?;
        if read_a == 0 && read_b == 0 {
            break;
        }

        // Positions past the end of the shorter chunk compare against zero.
        let max = read_a.max(read_b);
        for i in 0..max {
            let x = if i < read_a { buf_a[i] } else { 0 };
            let y = if i < read_b { buf_b[i] } else { 0 };
            if x != y {
                different_bytes += 1;
            }
        }
    }

    let base = original_size.max(changed_size);
    let difference_percent = if base == 0 {
        0.0
    } else {
        different_bytes as f64 / base as f64 * 100.0
    };

    Ok(DiffSummary {
        original_sha256,
        changed_sha256,
        original_size,
        changed_size,
        different_bytes,
        difference_percent,
    })
}

fn hash_from_start(file: &mut File, buf: &mut [u8]) -> io::Result<String> {
    let mut hasher = Sha256::new();
    loop {
        let n = file.read(buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:X}", hasher.finalize()))
}

/// Fill `buf` as far as possible; short only at end of file.
fn read_chunk(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_single_byte_change() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "A.rpt", &[0x00, 0x01, 0x02]);
        let b = write(&dir, "B.rpt", &[0x00, 0xFF, 0x02]);

        let diff = compute_blocking(&a, &b).unwrap();
        assert_eq!(diff.different_bytes, 1);
        assert!((diff.difference_percent - 33.333).abs() < 0.01);
        assert_ne!(diff.original_sha256, diff.changed_sha256);
        assert_eq!(diff.original_size, 3);
        assert_eq!(diff.changed_size, 3);
    }

    #[test]
    fn test_symmetric_except_hashes() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a", b"hello world, this is longer");
        let b = write(&dir, "b", b"jello");

        let ab = compute_blocking(&a, &b).unwrap();
        let ba = compute_blocking(&b, &a).unwrap();
        assert_eq!(ab.different_bytes, ba.different_bytes);
        assert_eq!(ab.difference_percent, ba.difference_percent);
        assert_eq!(ab.original_sha256, ba.changed_sha256);
        assert_eq!(ab.changed_sha256, ba.original_sha256);
    }

    #[test]
    fn test_identical_file_is_zero() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a", b"same content");

        let diff = compute_blocking(&a, &a).unwrap();
        assert_eq!(diff.different_bytes, 0);
        assert_eq!(diff.difference_percent, 0.0);
        assert!(diff.is_identical());
    }

    #[test]
    fn test_empty_files() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a", b"");
        let b = write(&dir, "b", b"");

        let diff = compute_blocking(&a, &b).unwrap();
        assert_eq!(diff.different_bytes, 0);
        assert_eq!(diff.difference_percent, 0.0);
    }

    #[test]
    fn test_shorter_side_compares_against_zero() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a", &[1, 2, 3]);
        let b = write(&dir, "b", &[1]);
        let diff = compute_blocking(&a, &b).unwrap();
        assert_eq!(diff.different_bytes, 2);

        // Trailing zeros are indistinguishable from missing bytes.
        let c = write(&dir, "c", &[1, 0, 0]);
        let diff = compute_blocking(&c, &b).unwrap();
        assert_eq!(diff.different_bytes, 0);
        assert_ne!(diff.original_sha256, diff.changed_sha256);
    }

    #[test]
    fn test_spans_multiple_chunks() {
        let dir = TempDir::new().unwrap();
        let mut data = vec![7u8; CHUNK_SIZE * 2 + 123];
        let a = write(&dir, "a", &data);
        data[CHUNK_SIZE + 5] = 8;
        data[CHUNK_SIZE * 2 + 100] = 9;
        let b = write(&dir, "b", &data);

        let diff = compute_blocking(&a, &b).unwrap();
        assert_eq!(diff.different_bytes, 2);
    }

    #[test]
    fn test_hash_is_uppercase_hex() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a", b"abc");
        let diff = compute_blocking(&a, &a).unwrap();
        assert_eq!(
            diff.original_sha256,
            "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD"
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a", b"abc");
        let err = compute_blocking(&a, &dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, ArchiveError::IoAt { .. }));
    }

    #[test]
    fn test_to_html_formats_percent() {
        let summary = DiffSummary {
            original_sha256: "AA".into(),
            changed_sha256: "BB".into(),
            original_size: 1_234_567,
            changed_size: 3,
            different_bytes: 1,
            difference_percent: 33.333_333,
        };
        let html = summary.to_html();
        assert!(html.contains("1,234,567 bytes"));
        assert!(html.contains("1 (33.33% of larger file)"));
    }

    #[tokio::test]
    async fn test_compute_async() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a", &[0, 1, 2]);
        let b = write(&dir, "b", &[0, 1, 3]);
        let diff = compute(&a, &b).await.unwrap();
        assert_eq!(diff.different_bytes, 1);
    }
}
