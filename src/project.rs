use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::translator::Dialect;

/// A source file found under a batch root
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,          // src/Models/Order.cs
    pub relative: PathBuf,      // Models/Order.cs
    pub dialect: Dialect,       // CSharp
}

/// Discover translatable files under `root`.
///
/// `.gitignore` files are honoured and directories named in `exclude` are
/// skipped. With `from` set, only files of that dialect are returned;
/// otherwise every file with a known extension is.
pub fn discover_files(
    root: &Path,
    from: Option<Dialect>,
    exclude: &[String],
) -> Result<Vec<SourceFile>> {
    if !root.is_dir() {
        anyhow::bail!("Source directory '{}' not found", root.display());
    }

    let excluded: Vec<String> = exclude.to_vec();
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .require_git(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map_or(false, |t| t.is_dir());
            !(is_dir
                && entry.depth() > 0
                && excluded
                    .iter()
                    .any(|name| entry.file_name().to_str() == Some(name.as_str())))
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.context(format!("Failed to walk {}", root.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(dialect) = path
            .extension()
            .and_then(|s| s.to_str())
            .and_then(Dialect::from_extension)
        else {
            continue;
        };
        if from.map_or(false, |f| f != dialect) {
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .map_err(|_| anyhow::anyhow!("Invalid path: {}", path.display()))?
            .to_path_buf();
        files.push(SourceFile {
            path: path.to_path_buf(),
            relative,
            dialect,
        });
    }

    // Sort for consistent output
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

/// Default output directory for a batch: `src` → `src_PY`
pub fn default_output_dir(root: &Path, target: Dialect) -> PathBuf {
    let name = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "out".to_string());
    let out_name = format!("{}_{}", name, target.tag());
    match root.canonicalize().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        Some(parent) => parent.join(out_name),
        None => PathBuf::from(out_name),
    }
}

/// Where a translated file lands: same relative layout, target extension
pub fn output_path(out_dir: &Path, relative: &Path, target: Dialect) -> PathBuf {
    out_dir.join(relative).with_extension(target.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_discover_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Program.cs");
        touch(dir.path(), "lib/util.py");
        touch(dir.path(), "lib/Main.pas");
        touch(dir.path(), "README.md");

        let files = discover_files(dir.path(), None, &[]).unwrap();
        let relative: Vec<_> = files.iter().map(|f| f.relative.clone()).collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("Program.cs"),
                PathBuf::from("lib/Main.pas"),
                PathBuf::from("lib/util.py"),
            ]
        );
        assert_eq!(files[1].dialect, Dialect::Delphi);
    }

    #[test]
    fn test_discover_filters_dialect_and_exclusions() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "A.cs");
        touch(dir.path(), "B.vb");
        touch(dir.path(), "obj/Generated.cs");

        let files =
            discover_files(dir.path(), Some(Dialect::CSharp), &["obj".to_string()]).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, PathBuf::from("A.cs"));
    }

    #[test]
    fn test_discover_honours_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "legacy/\n").unwrap();
        touch(dir.path(), "legacy/Old.vb");
        touch(dir.path(), "New.vb");

        let files = discover_files(dir.path(), None, &[]).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, PathBuf::from("New.vb"));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        assert!(discover_files(Path::new("does/not/exist"), None, &[]).is_err());
    }

    #[test]
    fn test_output_paths() {
        assert_eq!(
            output_path(Path::new("src_PY"), Path::new("Models/Order.cs"), Dialect::Python),
            PathBuf::from("src_PY/Models/Order.py")
        );

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir(&src).unwrap();
        let out = default_output_dir(&src, Dialect::VBNet);
        assert_eq!(out.file_name().unwrap().to_str(), Some("src_VB"));
        assert_eq!(out.parent(), src.canonicalize().unwrap().parent());
    }
}
