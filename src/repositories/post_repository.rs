// src/repositories/post_repository.rs - posts + attachments over the shared pool

use std::collections::HashMap;

use deadpool_postgres::Pool;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Row, Transaction};
use uuid::Uuid;

use crate::dtos::post_dtos::PostFields;
use crate::models::attachment::{Attachment, AttachmentKind};
use crate::models::post::{Post, PostWithAttachments};
use crate::repositories::RepoError;

pub struct PostRepository;

/// An uploaded file waiting to be recorded against its post.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttachment {
    pub url: String,
    pub kind: AttachmentKind,
}

const POST_WITH_AUTHOR: &str = "SELECT p.id, p.user_id, p.title, p.description, p.content, \
     p.created_at, u.name AS author_name \
     FROM posts p JOIN users u ON u.id = p.user_id";

/// `INSERT` for `rows` attachments, three positional parameters per row.
pub fn attachment_insert_sql(rows: usize) -> String {
    let values: Vec<String> = (0..rows)
        .map(|i| format!("(${}, ${}, ${})", i * 3 + 1, i * 3 + 2, i * 3 + 3))
        .collect();
    format!(
        "INSERT INTO attachments (post_id, url, type) VALUES {} RETURNING id, post_id, url, type",
        values.join(", ")
    )
}

impl PostRepository {
    pub async fn insert_post(
        tx: &Transaction<'_>,
        user_id: Uuid,
        fields: &PostFields,
    ) -> Result<Post, RepoError> {
        let row = tx
            .query_one(
                "INSERT INTO posts (user_id, title, description, content) VALUES ($1, $2, $3, $4) \
                 RETURNING id, user_id, title, description, content, created_at",
                &[&user_id, &fields.title, &fields.description, &fields.content],
            )
            .await?;
        Ok(Post::try_from(&row)?)
    }

    /// One statement for the whole batch. An empty batch is a no-op.
    pub async fn insert_attachments(
        tx: &Transaction<'_>,
        post_id: Uuid,
        batch: &[NewAttachment],
    ) -> Result<Vec<Attachment>, RepoError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let kinds: Vec<&'static str> = batch.iter().map(|a| a.kind.as_str()).collect();
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(batch.len() * 3);
        for (attachment, kind) in batch.iter().zip(kinds.iter()) {
            params.push(&post_id);
            params.push(&attachment.url);
            params.push(kind);
        }

        let rows = tx.query(attachment_insert_sql(batch.len()).as_str(), &params).await?;
        rows.iter().map(Attachment::from_row).collect()
    }

    /// All posts, newest first, with author name and attachments.
    pub async fn list_posts(pool: &Pool) -> Result<Vec<PostWithAttachments>, RepoError> {
        let client = pool.get().await?;
        let sql = format!("{} ORDER BY p.created_at DESC", POST_WITH_AUTHOR);
        let rows = client.query(sql.as_str(), &[]).await?;
        let attachments = Self::attachments_for(&client, &rows).await?;
        Self::merge(rows, attachments)
    }

    pub async fn list_posts_by_user(
        pool: &Pool,
        user_id: Uuid,
    ) -> Result<Vec<PostWithAttachments>, RepoError> {
        let client = pool.get().await?;
        let sql = format!("{} WHERE p.user_id = $1 ORDER BY p.created_at DESC", POST_WITH_AUTHOR);
        let rows = client.query(sql.as_str(), &[&user_id]).await?;
        let attachments = Self::attachments_for(&client, &rows).await?;
        Self::merge(rows, attachments)
    }

    pub async fn find_post(pool: &Pool, id: Uuid) -> Result<Option<PostWithAttachments>, RepoError> {
        let client = pool.get().await?;
        let sql = format!("{} WHERE p.id = $1", POST_WITH_AUTHOR);
        let Some(row) = client.query_opt(sql.as_str(), &[&id]).await? else {
            return Ok(None);
        };
        let rows = vec![row];
        let attachments = Self::attachments_for(&client, &rows).await?;
        Ok(Self::merge(rows, attachments)?.into_iter().next())
    }

    /// Updates only when `owner` owns the post; `None` covers both
    /// "not yours" and "does not exist".
    pub async fn update_owned(
        pool: &Pool,
        id: Uuid,
        owner: Uuid,
        fields: &PostFields,
    ) -> Result<Option<Post>, RepoError> {
        let client = pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE posts SET title = $1, description = $2, content = $3 \
                 WHERE id = $4 AND user_id = $5 \
                 RETURNING id, user_id, title, description, content, created_at",
                &[&fields.title, &fields.description, &fields.content, &id, &owner],
            )
            .await?;
        Ok(row.as_ref().map(Post::try_from).transpose()?)
    }

    /// Attachments go with the post through the foreign key cascade.
    pub async fn delete_owned(pool: &Pool, id: Uuid, owner: Uuid) -> Result<bool, RepoError> {
        let client = pool.get().await?;
        let deleted = client
            .execute("DELETE FROM posts WHERE id = $1 AND user_id = $2", &[&id, &owner])
            .await?;
        Ok(deleted > 0)
    }

    async fn attachments_for(
        client: &tokio_postgres::Client,
        post_rows: &[Row],
    ) -> Result<HashMap<Uuid, Vec<Attachment>>, RepoError> {
        let ids = post_rows
            .iter()
            .map(|r| r.try_get::<_, Uuid>("id"))
            .collect::<Result<Vec<_>, _>>()?;
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = client
            .query(
                "SELECT id, post_id, url, type FROM attachments WHERE post_id = ANY($1) ORDER BY id",
                &[&ids],
            )
            .await?;

        let mut grouped: HashMap<Uuid, Vec<Attachment>> = HashMap::new();
        for row in &rows {
            let attachment = Attachment::from_row(row)?;
            grouped.entry(attachment.post_id).or_default().push(attachment);
        }
        Ok(grouped)
    }

    fn merge(
        rows: Vec<Row>,
        mut attachments: HashMap<Uuid, Vec<Attachment>>,
    ) -> Result<Vec<PostWithAttachments>, RepoError> {
        rows.iter()
            .map(|row| -> Result<PostWithAttachments, RepoError> {
                let post = Post::try_from(row)?;
                let author_name: String = row.try_get("author_name")?;
                Ok(PostWithAttachments {
                    attachments: attachments.remove(&post.id).unwrap_or_default(),
                    author_name: Some(author_name),
                    post,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_sql_numbers_parameters_per_row() {
        assert_eq!(
            attachment_insert_sql(1),
            "INSERT INTO attachments (post_id, url, type) VALUES ($1, $2, $3) RETURNING id, post_id, url, type"
        );
        let five = attachment_insert_sql(5);
        assert!(five.contains("($13, $14, $15)"));
        assert!(!five.contains("$16"));
        assert_eq!(five.matches('(').count(), 6);
    }
}
