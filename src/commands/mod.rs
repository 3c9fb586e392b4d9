pub mod check;
pub mod convert;
pub mod dialects;
pub mod init;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use crate::translator::Dialect;

/// Represents the type of target we're working with
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A directory translated as a batch
    Directory(PathBuf),
    /// A single source file
    SingleFile(PathBuf),
}

/// Detect whether the target is a directory or a single file
pub fn detect_target(target: &str) -> Result<Target> {
    let path = Path::new(target);
    if path.is_dir() {
        return Ok(Target::Directory(path.to_path_buf()));
    }
    if path.is_file() {
        return Ok(Target::SingleFile(path.to_path_buf()));
    }
    anyhow::bail!("File or directory not found: {}", target)
}

/// Source dialect of a single file: explicit choice first, then the extension
pub fn source_dialect(path: &Path, from: Option<Dialect>) -> Result<Dialect> {
    if let Some(dialect) = from {
        return Ok(dialect);
    }
    path.extension()
        .and_then(|s| s.to_str())
        .and_then(Dialect::from_extension)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Cannot infer the dialect of {} from its extension. Pass --from",
                path.display()
            )
        })
}

/// Progress bar for a batch of `len` files
pub fn batch_progress(len: usize, verb: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.dim} {msg} [{bar:30}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb.set_message(verb.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_target() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("A.cs");
        std::fs::write(&file, "").unwrap();

        let dir_str = dir.path().to_str().unwrap();
        assert_eq!(detect_target(dir_str).unwrap(), Target::Directory(dir.path().to_path_buf()));
        assert_eq!(
            detect_target(file.to_str().unwrap()).unwrap(),
            Target::SingleFile(file.clone())
        );
        assert!(detect_target("no/such/file.cs").is_err());
    }

    #[test]
    fn test_source_dialect() {
        assert_eq!(source_dialect(Path::new("a.vb"), None).unwrap(), Dialect::VBNet);
        assert_eq!(
            source_dialect(Path::new("a.txt"), Some(Dialect::Delphi)).unwrap(),
            Dialect::Delphi
        );
        assert!(source_dialect(Path::new("a.txt"), None).is_err());
    }
}
