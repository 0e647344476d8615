//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use glob::glob;
use walkdir::WalkDir;

use crate::core::error::{BuildError, BuildResult};
use crate::util::process::Invocation;

/// Recursively copy a directory.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;

    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else {
            copy_file(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Copy a single file, creating the destination's parent directory.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(src, dst).with_context(|| {
        format!("failed to copy {} to {}", src.display(), dst.display())
    })?;
    Ok(())
}

/// Copy a file into a directory, keeping its name.
pub fn copy_into(src: &Path, dst_dir: &Path) -> Result<PathBuf> {
    let name = src
        .file_name()
        .with_context(|| format!("not a file path: {}", src.display()))?;
    let dst = dst_dir.join(name);
    copy_file(src, &dst)?;
    Ok(dst)
}

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Bump the modification time of an existing file. Missing files are ignored.
pub fn touch(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Ok(());
    }
    let file = fs::File::options()
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open file: {}", path.display()))?;
    file.set_modified(SystemTime::now())
        .with_context(|| format!("failed to touch file: {}", path.display()))
}

/// Find files matching glob patterns relative to a base directory.
pub fn glob_files(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for entry in glob(&pattern_str)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
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

/// Touch the generated autotools files so `make` does not try to rerun
/// autoreconf after a checkout shuffled timestamps.
pub fn touch_autoconf_files(src_dir: &Path) -> Result<()> {
    for name in ["aclocal.m4", "configure", "Makefile.am"] {
        touch(&src_dir.join(name))?;
    }
    for file in glob_files(src_dir, &["**/*.in".to_string()])? {
        touch(&file)?;
    }
    Ok(())
}

/// Remove every `CMakeCache.txt` and `CMakeFiles/` under `dir`.
pub fn rm_cmake_cache(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let mut caches = Vec::new();
    let mut cmake_dirs = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let name = entry.file_name();
        if entry.file_type().is_file() && name == "CMakeCache.txt" {
            caches.push(entry.into_path());
        } else if entry.file_type().is_dir() && name == "CMakeFiles" {
            cmake_dirs.push(entry.into_path());
        }
    }

    for cache in caches {
        fs::remove_file(&cache)
            .with_context(|| format!("failed to remove {}", cache.display()))?;
    }
    for cmake_dir in cmake_dirs {
        remove_dir_all_if_exists(&cmake_dir)?;
    }
    Ok(())
}

/// Write `<name>_invocation.sh` so a failed step can be rerun by hand.
pub fn write_invocation_script(path: &Path, invocation: &Invocation) -> Result<()> {
    write_string(path, &invocation.to_script())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("failed to make executable: {}", path.display()))?;
    }

    Ok(())
}

/// Check that every expected artifact exists.
pub fn verify_artifacts<'a>(paths: impl IntoIterator<Item = &'a Path>) -> BuildResult<()> {
    for path in paths {
        if !path.exists() {
            return Err(BuildError::MissingArtifact {
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}
