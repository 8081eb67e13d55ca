use std::ffi::OsString;
use std::path::{Path, PathBuf};

const LOCK_SUFFIX: &str = ".LCK";

/// Marker file another writer leaves next to a ledger while it has it open.
pub fn lock_path(ledger: &Path) -> PathBuf {
    let mut name = OsString::from(ledger.as_os_str());
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}

pub fn is_locked(ledger: &Path) -> bool {
    lock_path(ledger).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_path_appends_suffix() {
        assert_eq!(
            lock_path(Path::new("/books/home.json")),
            PathBuf::from("/books/home.json.LCK")
        );
    }

    #[test]
    fn test_is_locked_checks_sibling_marker() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        let ledger = dir.path().join("home.json");
        std::fs::write(&ledger, "{}")?;
        assert!(!is_locked(&ledger));

        std::fs::write(dir.path().join("home.json.LCK"), "")?;
        assert!(is_locked(&ledger));
        Ok(())
    }
}
