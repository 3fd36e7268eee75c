use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;
use zip::ZipArchive;

/// Create the directory if it doesn’t exist; error if a non-directory exists there.
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("Path exists but is not a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Extracts the given `.zip` file to the target directory.
pub fn extract_zip(zip_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = fs::File::open(zip_path)
        .with_context(|| format!("failed to open {}", zip_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("failed to read zip archive {}", zip_path.display()))?;

    archive
        .extract(dest_dir)
        .with_context(|| format!("failed to extract {} to {}", zip_path.display(), dest_dir.display()))?;

    Ok(())
}

/// Find the first file under `dir` with the given extension (recursive,
/// deterministic order).
pub fn find_file_with_extension(dir: &Path, ext: &str) -> Result<PathBuf> {
    let mut matches: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(ext))
        .collect();
    matches.sort();
    matches
        .into_iter()
        .next()
        .with_context(|| format!("no .{ext} file found under {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_dir_exists_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b/c");
        ensure_dir_exists(&nested).unwrap();
        assert!(nested.is_dir());
        // Idempotent.
        ensure_dir_exists(&nested).unwrap();
    }

    #[test]
    fn ensure_dir_exists_rejects_files() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("f");
        fs::write(&file, b"x").unwrap();
        assert!(ensure_dir_exists(&file).is_err());
    }

    #[test]
    fn find_file_prefers_lexicographic_first() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b.shp"), b"").unwrap();
        fs::write(tmp.path().join("a.shp"), b"").unwrap();
        fs::write(tmp.path().join("a.dbf"), b"").unwrap();
        let found = find_file_with_extension(tmp.path(), "shp").unwrap();
        assert!(found.ends_with("a.shp"));
        assert!(find_file_with_extension(tmp.path(), "prj").is_err());
    }
}
