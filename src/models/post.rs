use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::models::attachment::Attachment;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&Row> for Post {
    type Error = tokio_postgres::Error;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// A post merged with its attachments; `author_name` is filled by the read
/// queries and left out of the creation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithAttachments {
    #[serde(flatten)]
    pub post: Post,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    pub attachments: Vec<Attachment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attachment::AttachmentKind;

    #[test]
    fn post_fields_are_flattened_next_to_attachments() {
        let post = Post {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "t".into(),
            description: "d".into(),
            content: "c".into(),
            created_at: Utc::now(),
        };
        let merged = PostWithAttachments {
            attachments: vec![Attachment {
                id: Uuid::new_v4(),
                post_id: post.id,
                url: "u".into(),
                kind: AttachmentKind::Image,
            }],
            author_name: None,
            post,
        };
        let json = serde_json::to_value(&merged).unwrap();
        assert_eq!(json["title"], "t");
        assert!(json.get("author_name").is_none());
        assert_eq!(json["attachments"][0]["type"], "image");
    }
}
