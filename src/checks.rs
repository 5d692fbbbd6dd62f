//! Fail-fast checks on command-line paths and values.

use std::path::Path;

use crate::error::{Result, VizError};

pub fn check_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(VizError::MissingSource(path.to_path_buf()))
    }
}

pub fn check_not_file(path: &Path) -> Result<()> {
    if path.exists() {
        Err(VizError::InvalidArgument(format!(
            "\"{}\" already exists",
            path.display()
        )))
    } else {
        Ok(())
    }
}

pub fn check_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(VizError::InvalidArgument(format!(
            "\"{}\" is not a directory",
            path.display()
        )))
    }
}

pub fn check_month(month: u32) -> Result<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(VizError::InvalidArgument(format!(
            "\"{month}\" is not in the range 1-12"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("log.json");
        assert!(check_file(&file).is_err());
        assert!(check_not_file(&file).is_ok());
        std::fs::write(&file, "{}").unwrap();
        assert!(check_file(&file).is_ok());
        assert!(check_not_file(&file).is_err());
        assert!(check_dir(dir.path()).is_ok());
        assert!(check_dir(&file).is_err());
    }

    #[test]
    fn months() {
        assert!(check_month(1).is_ok());
        assert!(check_month(12).is_ok());
        assert!(check_month(0).is_err());
        assert!(check_month(13).is_err());
    }
}
