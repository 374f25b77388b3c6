// src/services/post_services.rs - post creation workflow and owner-checked mutations

use std::fmt;
use std::sync::Arc;

use deadpool_postgres::Pool;
use log::{debug, error, info, warn};
use tokio_postgres::Transaction;
use uuid::Uuid;

use crate::dtos::post_dtos::{CreatePostInput, PostFields, UploadedFile};
use crate::errors::{error_chain, AppError};
use crate::models::attachment::AttachmentKind;
use crate::models::post::{Post, PostWithAttachments};
use crate::repositories::post_repository::{NewAttachment, PostRepository};
use crate::repositories::RepoError;
use crate::services::media_uploader::{MediaUploader, UploadError};

/// Where a create request is in its transaction. Only used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CreateState {
    TransactionOpen,
    UploadsInFlight,
    RowsInserted,
    Committed,
    RolledBack,
}

impl fmt::Display for CreateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CreateState::TransactionOpen => "transaction_open",
            CreateState::UploadsInFlight => "uploads_in_flight",
            CreateState::RowsInserted => "rows_inserted",
            CreateState::Committed => "committed",
            CreateState::RolledBack => "rolled_back",
        };
        f.write_str(s)
    }
}

fn trace_state(user_id: Uuid, state: CreateState) {
    debug!("create_post[user={}] -> {}", user_id, state);
}

/// Uploads one file at a time, in order. The first failure stops the loop;
/// the files after it are never sent.
pub async fn upload_all(
    uploader: &dyn MediaUploader,
    files: Vec<UploadedFile>,
) -> Result<Vec<NewAttachment>, (UploadError, usize)> {
    let mut uploaded = Vec::with_capacity(files.len());
    for file in files {
        // validated before the transaction opened
        let Some(kind) = AttachmentKind::from_mime(&file.content_type) else {
            return Err((UploadError::ContentType(file.content_type), uploaded.len()));
        };
        match uploader.upload(file.bytes, &file.content_type).await {
            Ok(url) => uploaded.push(NewAttachment { url, kind }),
            Err(e) => return Err((e, uploaded.len())),
        }
    }
    Ok(uploaded)
}

#[derive(Clone)]
pub struct PostService {
    pool: Pool,
    uploader: Arc<dyn MediaUploader>,
}

impl PostService {
    pub fn new(pool: Pool, uploader: Arc<dyn MediaUploader>) -> Self {
        Self { pool, uploader }
    }

    /// Creates the post and its attachments atomically on the database side.
    ///
    /// One pooled connection is held for the whole call and goes back to the
    /// pool when `client` drops, on every path. Media already pushed to the
    /// host is not deleted when the transaction rolls back.
    pub async fn create_post(
        &self,
        user_id: Uuid,
        input: CreatePostInput,
    ) -> Result<PostWithAttachments, AppError> {
        let mut client = self.pool.get().await.map_err(RepoError::from)?;
        let tx = client.transaction().await.map_err(RepoError::from)?;
        trace_state(user_id, CreateState::TransactionOpen);

        match self.write_post(&tx, user_id, input).await {
            Ok(created) => {
                tx.commit().await.map_err(RepoError::from)?;
                trace_state(user_id, CreateState::Committed);
                info!(
                    "post {} created by {} with {} attachment(s)",
                    created.post.id,
                    user_id,
                    created.attachments.len()
                );
                Ok(created)
            }
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    // the server discards the transaction once the connection resets
                    error!("rollback failed for user {}: {}", user_id, error_chain(&rb));
                }
                trace_state(user_id, CreateState::RolledBack);
                Err(e)
            }
        }
    }

    async fn write_post(
        &self,
        tx: &Transaction<'_>,
        user_id: Uuid,
        input: CreatePostInput,
    ) -> Result<PostWithAttachments, AppError> {
        let post = PostRepository::insert_post(tx, user_id, &input.fields).await?;

        if !input.files.is_empty() {
            trace_state(user_id, CreateState::UploadsInFlight);
        }
        let uploaded = upload_all(self.uploader.as_ref(), input.files)
            .await
            .map_err(|(e, done)| {
                if done > 0 {
                    warn!("{} uploaded object(s) orphaned for aborted post {}", done, post.id);
                }
                AppError::UploadFailed(e)
            })?;

        let attachments = PostRepository::insert_attachments(tx, post.id, &uploaded)
            .await
            .inspect_err(|_| {
                if !uploaded.is_empty() {
                    warn!(
                        "{} uploaded object(s) orphaned for aborted post {}",
                        uploaded.len(),
                        post.id
                    );
                }
            })?;
        trace_state(user_id, CreateState::RowsInserted);

        Ok(PostWithAttachments { post, author_name: None, attachments })
    }

    pub async fn list_posts(&self) -> Result<Vec<PostWithAttachments>, AppError> {
        Ok(PostRepository::list_posts(&self.pool).await?)
    }

    pub async fn list_posts_by_user(&self, user_id: Uuid) -> Result<Vec<PostWithAttachments>, AppError> {
        Ok(PostRepository::list_posts_by_user(&self.pool, user_id).await?)
    }

    pub async fn get_post(&self, id: Uuid) -> Result<PostWithAttachments, AppError> {
        PostRepository::find_post(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    /// A post that is missing and a post owned by someone else look the same
    /// to the caller: both are 403.
    pub async fn update_post(&self, id: Uuid, owner: Uuid, fields: PostFields) -> Result<Post, AppError> {
        PostRepository::update_owned(&self.pool, id, owner, &fields)
            .await?
            .ok_or_else(|| AppError::Forbidden("Not allowed to edit this post".to_string()))
    }

    pub async fn delete_post(&self, id: Uuid, owner: Uuid) -> Result<(), AppError> {
        if PostRepository::delete_owned(&self.pool, id, owner).await? {
            info!("post {} deleted by {}", id, owner);
            Ok(())
        } else {
            Err(AppError::Forbidden("Not allowed to delete this post".to_string()))
        }
    }
}
