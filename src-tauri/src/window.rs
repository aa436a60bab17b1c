//! Window chrome helpers that do not need a live window.

use thiserror::Error;

pub const APP_TITLE: &str = "md-editor";

const EXTERNAL_SCHEMES: &[&str] = &["http", "https", "mailto"];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("refusing to open {url:?}: only http, https and mailto links are allowed")]
pub struct UnsupportedLink {
    pub url: String,
}

fn last_segment(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

/// `md-editor`, `<folder> - md-editor` or `<folder> - <file> - md-editor`.
/// The file part only shows inside an open folder.
pub fn compose_window_title(directory: Option<&str>, file: Option<&str>) -> String {
    match (directory.map(last_segment), file.map(last_segment)) {
        (Some(folder), Some(file)) => format!("{folder} - {file} - {APP_TITLE}"),
        (Some(folder), None) => format!("{folder} - {APP_TITLE}"),
        _ => APP_TITLE.to_string(),
    }
}

/// Accepts `url` for the system opener only when its scheme is allowed.
pub fn validate_external_url(url: &str) -> Result<&str, UnsupportedLink> {
    let url = url.trim();
    let allowed = url
        .split_once(':')
        .is_some_and(|(scheme, _)| EXTERNAL_SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)));
    if allowed {
        Ok(url)
    } else {
        Err(UnsupportedLink {
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_names_folder_then_file() {
        assert_eq!(compose_window_title(None, None), "md-editor");
        assert_eq!(compose_window_title(Some("/home/me/notes"), None), "notes - md-editor");
        assert_eq!(
            compose_window_title(Some(r"C:\notes\"), Some(r"C:\notes\todo.md")),
            "notes - todo.md - md-editor"
        );
        assert_eq!(compose_window_title(None, Some("/tmp/a.md")), "md-editor");
    }

    #[test]
    fn only_web_and_mail_links_are_opened() {
        assert_eq!(validate_external_url(" https://example.com "), Ok("https://example.com"));
        assert!(validate_external_url("HTTP://example.com").is_ok());
        assert!(validate_external_url("mailto:me@example.com").is_ok());
        assert!(validate_external_url("file:///etc/passwd").is_err());
        assert!(validate_external_url("javascript:alert(1)").is_err());
        assert!(validate_external_url("notes/other.md").is_err());
    }
}
