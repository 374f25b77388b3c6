use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

/// Media category of an attachment, derived from the upload's MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
    Pdf,
}

impl AttachmentKind {
    /// Prefixes are checked in priority order: image, video, pdf.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Some(Self::Image)
        } else if mime.starts_with("video/") {
            Some(Self::Video)
        } else if mime.starts_with("application/pdf") {
            Some(Self::Pdf)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown attachment type: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for AttachmentKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "pdf" => Ok(Self::Pdf),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
}

impl Attachment {
    /// `type` is stored as text; anything outside the three kinds is a
    /// corrupt row and surfaces as a conversion error.
    pub fn from_row(row: &Row) -> Result<Self, crate::repositories::RepoError> {
        let kind: String = row.try_get("type")?;
        Ok(Self {
            id: row.try_get("id")?,
            post_id: row.try_get("post_id")?,
            url: row.try_get("url")?,
            kind: kind
                .parse()
                .map_err(|e: UnknownKind| crate::repositories::RepoError::Corrupt(e.to_string()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_prefixes_map_to_kinds() {
        assert_eq!(AttachmentKind::from_mime("image/png"), Some(AttachmentKind::Image));
        assert_eq!(AttachmentKind::from_mime("image/svg+xml"), Some(AttachmentKind::Image));
        assert_eq!(AttachmentKind::from_mime("video/mp4"), Some(AttachmentKind::Video));
        assert_eq!(AttachmentKind::from_mime("application/pdf"), Some(AttachmentKind::Pdf));
        assert_eq!(AttachmentKind::from_mime("IMAGE/JPEG"), Some(AttachmentKind::Image));
    }

    #[test]
    fn other_mime_types_are_not_attachments() {
        assert_eq!(AttachmentKind::from_mime("application/zip"), None);
        assert_eq!(AttachmentKind::from_mime("text/plain"), None);
        assert_eq!(AttachmentKind::from_mime("audio/mpeg"), None);
        assert_eq!(AttachmentKind::from_mime(""), None);
        assert_eq!(AttachmentKind::from_mime("imagex/png"), None);
    }

    #[test]
    fn kind_serializes_under_type_key() {
        let att = Attachment {
            id: Uuid::nil(),
            post_id: Uuid::nil(),
            url: "https://cdn.example.com/a.png".into(),
            kind: AttachmentKind::Pdf,
        };
        let json = serde_json::to_value(&att).unwrap();
        assert_eq!(json["type"], "pdf");
        assert_eq!("video".parse::<AttachmentKind>().unwrap(), AttachmentKind::Video);
        assert!("audio".parse::<AttachmentKind>().is_err());
    }
}
