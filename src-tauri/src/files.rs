//! Filesystem side of the editor: one call per command, paths in and out as
//! absolute strings.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::debug;
use thiserror::Error;

const MARKDOWN_EXTENSION: &str = "md";

#[derive(Debug, Error)]
pub enum FileError {
    #[error("{path} already exists")]
    AlreadyExists { path: PathBuf },
    #[error("invalid file name: {name:?}")]
    InvalidName { name: String },
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> FileError + '_ {
    move |source| FileError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(MARKDOWN_EXTENSION))
}

/// `name` with `.md` appended unless it already ends in it.
fn with_markdown_extension(name: &str) -> String {
    if is_markdown(Path::new(name)) {
        name.to_string()
    } else {
        format!("{name}.{MARKDOWN_EXTENSION}")
    }
}

/// A bare file name: not empty, no separators, not `.` or `..`.
fn validate_name(name: &str) -> Result<&str, FileError> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\']);
    if invalid {
        return Err(FileError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(trimmed)
}

/// Markdown files directly inside `directory`, in the order the OS lists them.
/// Subdirectories are not descended into.
pub fn list_markdown_files(directory: &Path) -> Result<Vec<String>, FileError> {
    let entries = fs::read_dir(directory).map_err(io_error(directory))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_error(directory))?;
        let path = entry.path();
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file && is_markdown(&path) {
            files.push(to_string(&path));
        }
    }
    Ok(files)
}

/// Creates `<directory>/<name>.md` empty. Never overwrites.
pub fn create_file(directory: &Path, name: &str) -> Result<String, FileError> {
    let name = validate_name(name)?;
    let path = directory.join(with_markdown_extension(name));
    match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(_) => {
            debug!("created {}", path.display());
            Ok(to_string(&path))
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(FileError::AlreadyExists { path }),
        Err(e) => Err(io_error(&path)(e)),
    }
}

/// Removes `path`. A file that is already gone counts as deleted.
pub fn delete_file(path: &Path) -> Result<(), FileError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error(path)(e)),
    }
}

/// Contents of `path`. A missing file is created empty first.
pub fn read_file(path: &Path) -> Result<String, FileError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::write(path, "").map_err(io_error(path))?;
            Ok(String::new())
        }
        Err(e) => Err(io_error(path)(e)),
    }
}

pub fn write_file(path: &Path, content: &str) -> Result<(), FileError> {
    fs::write(path, content).map_err(io_error(path))
}

/// Renames `path` to `name` (`.md` added) in the same directory. Refuses to
/// replace an existing file.
pub fn rename_file(path: &Path, name: &str) -> Result<String, FileError> {
    let name = validate_name(name)?;
    let target = path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(with_markdown_extension(name));
    if target == path {
        return Ok(to_string(&target));
    }
    // Case-only renames on case-insensitive filesystems see the source here.
    let same_file = match (fs::canonicalize(path), fs::canonicalize(&target)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if target.exists() && !same_file {
        return Err(FileError::AlreadyExists { path: target });
    }
    fs::rename(path, &target).map_err(io_error(path))?;
    Ok(to_string(&target))
}

/// Joins `relative` onto `base` and folds `.` and `..` without touching the
/// filesystem. An absolute `relative` is returned as is.
pub fn resolve_relative_path(base: &Path, relative: &str) -> PathBuf {
    let joined = base.join(relative);
    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    resolved.push(component);
                }
            }
            other => resolved.push(other),
        }
    }
    resolved
}

fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

/// The image at `path` as a base64 `data:` URI.
pub fn load_image_data_uri(path: &Path) -> Result<String, FileError> {
    let bytes = fs::read(path).map_err(io_error(path))?;
    Ok(format!("data:{};base64,{}", image_mime(path), BASE64.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_extension_is_case_insensitive() {
        assert!(is_markdown(Path::new("/d/a.md")));
        assert!(is_markdown(Path::new("/d/B.MD")));
        assert!(!is_markdown(Path::new("/d/c.markdown")));
        assert!(!is_markdown(Path::new("/d/md")));
    }

    #[test]
    fn extension_is_added_once() {
        assert_eq!(with_markdown_extension("notes"), "notes.md");
        assert_eq!(with_markdown_extension("notes.md"), "notes.md");
        assert_eq!(with_markdown_extension("v1.2"), "v1.2.md");
    }

    #[test]
    fn names_with_separators_are_rejected() {
        assert!(validate_name("ok name").is_ok());
        for bad in ["", "  ", ".", "..", "a/b", r"a\b"] {
            assert!(matches!(validate_name(bad), Err(FileError::InvalidName { .. })), "{bad:?}");
        }
    }

    #[test]
    fn relative_paths_are_folded_lexically() {
        let base = Path::new("/notes/project");
        assert_eq!(resolve_relative_path(base, "img/a.png"), PathBuf::from("/notes/project/img/a.png"));
        assert_eq!(resolve_relative_path(base, "./a.png"), PathBuf::from("/notes/project/a.png"));
        assert_eq!(resolve_relative_path(base, "../shared/b.png"), PathBuf::from("/notes/shared/b.png"));
        assert_eq!(resolve_relative_path(base, "/abs/c.png"), PathBuf::from("/abs/c.png"));
    }

    #[test]
    fn mime_follows_extension_with_png_fallback() {
        assert_eq!(image_mime(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(image_mime(Path::new("a.svg")), "image/svg+xml");
        assert_eq!(image_mime(Path::new("a.webp")), "image/webp");
        assert_eq!(image_mime(Path::new("a.bmp")), "image/png");
        assert_eq!(image_mime(Path::new("noext")), "image/png");
    }
}
