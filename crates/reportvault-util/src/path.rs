//! Path utilities.
//!
//! Report keys, archive roots and filename sanitization live here so the
//! archive engine and the CLI derive them the same way.

use std::path::{Path, PathBuf};

/// Characters that are not allowed in a file name on at least one supported
/// platform.
const INVALID_FILE_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace characters that are illegal in file names with `_`.
///
/// Names that would not create a child directory (empty, `.` or `..`)
/// become `_`.
pub fn sanitize_file_name(input: &str) -> String {
    if matches!(input, "" | "." | "..") {
        return "_".to_string();
    }
    input
        .chars()
        .map(|c| {
            if c.is_control() || INVALID_FILE_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Derive the unsanitized report key from a report path (file name without
/// extension).
pub fn report_key(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The archive root used when none is configured: `<dir of report>/archive`.
pub fn default_archive_root(report_path: &Path) -> PathBuf {
    report_path
        .parent()
        .map(|p| p.join("archive"))
        .unwrap_or_else(|| PathBuf::from("archive"))
}

/// The file name component of a path as an owned string.
pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Check whether two paths point at the same file.
///
/// On unix this compares device and inode, so hard links match. Elsewhere
/// canonical paths are compared, falling back to the paths as given.
pub fn same_file(a: &Path, b: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let (Ok(ma), Ok(mb)) = (std::fs::metadata(a), std::fs::metadata(b)) {
            return (ma.dev(), ma.ino()) == (mb.dev(), mb.ino());
        }
    }

    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Get the reportvault configuration directory.
///
/// On Unix `~/.config/reportvault` is preferred when it exists.
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        if let Some(home) = dirs::home_dir() {
            let xdg_config = home.join(".config").join("reportvault");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }
    }

    dirs::config_dir().map(|p| p.join("reportvault"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Sales Q1"), "Sales Q1");
        assert_eq!(sanitize_file_name("a:b*c?"), "a_b_c_");
        assert_eq!(sanitize_file_name("tab\there"), "tab_here");
    }

    #[test]
    fn test_sanitize_dot_names() {
        assert_eq!(sanitize_file_name(""), "_");
        assert_eq!(sanitize_file_name("."), "_");
        assert_eq!(sanitize_file_name(".."), "_");
        assert_eq!(sanitize_file_name(".hidden"), ".hidden");
        assert_eq!(report_key(Path::new("/r/..rpt")), ".");
    }

    #[test]
    fn test_report_key_strips_extension() {
        assert_eq!(report_key(Path::new("/reports/Invoice.rpt")), "Invoice");
        assert_eq!(report_key(Path::new("archive.tar.gz")), "archive.tar");
    }

    #[test]
    fn test_default_archive_root() {
        let root = default_archive_root(Path::new("/reports/Invoice.rpt"));
        assert_eq!(root, PathBuf::from("/reports/archive"));
    }

    #[test]
    fn test_same_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.rpt");
        std::fs::write(&file, b"x").unwrap();

        let dotted = dir.path().join(".").join("a.rpt");
        assert!(same_file(&file, &dotted));
        assert!(!same_file(&file, &dir.path().join("b.rpt")));
    }

    #[cfg(unix)]
    #[test]
    fn test_same_file_hard_link() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.rpt");
        let link = dir.path().join("b.rpt");
        let other = dir.path().join("c.rpt");
        std::fs::write(&file, b"x").unwrap();
        std::fs::write(&other, b"x").unwrap();
        std::fs::hard_link(&file, &link).unwrap();

        assert!(same_file(&file, &link));
        assert!(!same_file(&file, &other));
    }

    #[test]
    fn test_config_dir() {
        if let Some(dir) = config_dir() {
            assert!(dir.ends_with("reportvault"));
        }
    }
}
