//! The page context document: what the server-rendered photo page used to
//! carry (CSRF meta tag, candidate users, stored tags), exported as JSON
//! for this client.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::tags::{PhotoId, Tag, UserId};

#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct PageContext {
    /// Base URL of the server, e.g. `http://localhost:5000`.
    pub server: String,
    pub photo_id: PhotoId,
    pub csrf_token: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub image_path: Option<PathBuf>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub users: Vec<Person>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Where the photo bytes come from. A local path wins over an URL when the
/// document carries both.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource<'a> {
    Path(&'a Path),
    Url(&'a str),
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid page context: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid page context: {0}")]
    Incomplete(&'static str),
}

impl PageContext {
    pub fn load(path: &Path) -> Result<Self, ContextError> {
        let raw = fs::read_to_string(path).map_err(|source| ContextError::Read {
            path: path.to_owned(),
            source,
        })?;
        let context: Self = serde_json::from_str(&raw)?;
        context.validate()?;
        Ok(context)
    }

    fn validate(&self) -> Result<(), ContextError> {
        if self.server.trim().is_empty() {
            return Err(ContextError::Incomplete("server URL is empty"));
        }
        if self.csrf_token.trim().is_empty() {
            return Err(ContextError::Incomplete("CSRF token is empty"));
        }
        if self.image_path.is_none() && self.image_url.is_none() {
            return Err(ContextError::Incomplete(
                "neither image_path nor image_url is set",
            ));
        }
        Ok(())
    }

    /// `None` only for documents that never passed [`Self::validate`].
    pub fn image_source(&self) -> Option<ImageSource<'_>> {
        match (&self.image_path, &self.image_url) {
            (Some(path), _) => Some(ImageSource::Path(path)),
            (None, Some(url)) => Some(ImageSource::Url(url)),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"{
        "server": "http://localhost:5000",
        "photo_id": 42,
        "csrf_token": "tok-123",
        "caption": "Picnic by the lake",
        "image_url": "http://localhost:5000/static/uploads/42.jpg",
        "users": [
            {"id": 1, "name": "Alice Demir"},
            {"id": 2, "name": "Bob Yilmaz"}
        ],
        "tags": [
            {"id": 7, "user_id": 1, "user_name": "Alice Demir",
             "shape": "rect", "coords": "90,90,110,110"}
        ]
    }"#;

    #[test]
    fn parses_a_full_document() {
        let context: PageContext = serde_json::from_str(FULL).unwrap();
        context.validate().unwrap();
        assert_eq!(context.photo_id, 42);
        assert_eq!(context.users.len(), 2);
        assert_eq!(context.tags[0].user_name, "Alice Demir");
        assert_eq!(
            context.image_source(),
            Some(ImageSource::Url(
                "http://localhost:5000/static/uploads/42.jpg"
            ))
        );
    }

    #[test]
    fn users_and_tags_default_to_empty() {
        let context: PageContext = serde_json::from_str(
            r#"{"server": "http://x", "photo_id": 1, "csrf_token": "t",
                "image_path": "photo.jpg"}"#,
        )
        .unwrap();
        context.validate().unwrap();
        assert!(context.users.is_empty());
        assert!(context.tags.is_empty());
        assert_eq!(context.caption, None);
    }

    #[test]
    fn local_path_wins_over_url() {
        let context: PageContext = serde_json::from_str(
            r#"{"server": "http://x", "photo_id": 1, "csrf_token": "t",
                "image_path": "local.jpg", "image_url": "http://x/remote.jpg"}"#,
        )
        .unwrap();
        assert_eq!(
            context.image_source(),
            Some(ImageSource::Path(Path::new("local.jpg")))
        );
    }

    #[test]
    fn rejects_missing_image_source() {
        let context: PageContext = serde_json::from_str(
            r#"{"server": "http://x", "photo_id": 1, "csrf_token": "t"}"#,
        )
        .unwrap();
        assert!(matches!(
            context.validate(),
            Err(ContextError::Incomplete(_))
        ));
    }

    #[test]
    fn rejects_blank_csrf_token() {
        let context: PageContext = serde_json::from_str(
            r#"{"server": "http://x", "photo_id": 1, "csrf_token": "  ",
                "image_path": "p.jpg"}"#,
        )
        .unwrap();
        assert!(matches!(
            context.validate(),
            Err(ContextError::Incomplete(_))
        ));
    }

    #[test]
    fn load_reads_and_validates_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        let context = PageContext::load(file.path()).unwrap();
        assert_eq!(context.caption.as_deref(), Some("Picnic by the lake"));
    }

    #[test]
    fn load_reports_unreadable_files() {
        let err = PageContext::load(Path::new("/nonexistent/context.json")).unwrap_err();
        assert!(matches!(err, ContextError::Read { .. }));
    }
}
