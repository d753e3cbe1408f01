//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use walkdir::WalkDir;

/// Extensions treated as C headers when walking directories.
const HEADER_EXTENSIONS: &[&str] = &["h", "i"];

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Find files matching glob patterns relative to a base directory.
pub fn glob_files(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for entry in glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern))? {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        results.push(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// Whether `path` looks like a C header or preprocessed C file.
pub fn is_header(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| HEADER_EXTENSIONS.contains(&ext))
}

/// Expand inputs into header files. Files are kept as given; directories are
/// walked recursively for headers, sorted by path.
pub fn find_headers(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            results.push(input.clone());
            continue;
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(input).follow_links(true) {
            let entry =
                entry.with_context(|| format!("failed to walk directory: {}", input.display()))?;
            if entry.file_type().is_file() && is_header(entry.path()) {
                found.push(entry.into_path());
            }
        }
        if found.is_empty() {
            tracing::warn!("no headers found in {}", input.display());
        }
        found.sort();
        results.extend(found);
    }

    let mut seen = std::collections::HashSet::new();
    results.retain(|p| seen.insert(p.clone()));
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_glob_files() {
        let tmp = TempDir::new().unwrap();
        let include = tmp.path().join("include");
        fs::create_dir_all(&include).unwrap();
        fs::write(include.join("glibconfig.h"), "#define G_HAVE_INLINE 1").unwrap();
        fs::write(include.join("gtkconfig.h"), "").unwrap();
        fs::write(include.join("readme.txt"), "readme").unwrap();

        let files = glob_files(tmp.path(), &["include/*config.h".to_string()]).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_find_headers() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("gio").join("unix");
        fs::create_dir_all(&nested).unwrap();
        fs::write(tmp.path().join("glib.h"), "").unwrap();
        fs::write(nested.join("gunixfd.h"), "").unwrap();
        fs::write(nested.join("gunixfd.c"), "").unwrap();

        let explicit = tmp.path().join("extra.c");
        fs::write(&explicit, "").unwrap();

        let found = find_headers(&[tmp.path().to_path_buf(), explicit.clone()]).unwrap();
        assert_eq!(
            found,
            vec![nested.join("gunixfd.h"), tmp.path().join("glib.h"), explicit]
        );
    }

    #[test]
    fn test_read_to_string_context() {
        let err = read_to_string(Path::new("/nonexistent/srcscan.h")).unwrap_err();
        assert!(err.to_string().contains("failed to read file"));
    }
}
