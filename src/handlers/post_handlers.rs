// src/handlers/post_handlers.rs - post routes; mutations go through AuthenticatedUser

use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpResponse, ResponseError};
use futures::TryStreamExt;
use log::error;
use uuid::Uuid;

use crate::dtos::post_dtos::{
    CreatePostInput, PostFieldsIn, UploadedFile, MAX_FILES, MAX_FILE_BYTES, MAX_TEXT_BYTES,
};
use crate::dtos::MessageOut;
use crate::errors::{error_chain, AppError};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::AppState;

fn fail(state: &AppState, context: &str, e: AppError) -> HttpResponse {
    if e.status_code().is_server_error() {
        error!("{}: {}", context, error_chain(&e));
    }
    e.to_response(state.debug_errors)
}

/// Reads the create-post form: text parts `title`, `description`, `content`
/// and any part carrying a filename as an attachment. Limits are enforced
/// while streaming so an oversize file is dropped before it is buffered.
/// An untouched file input (empty filename, no bytes) is skipped.
async fn read_post_form(mut payload: Multipart) -> Result<CreatePostInput, AppError> {
    let malformed = |e: actix_multipart::MultipartError| {
        AppError::Validation(format!("Malformed multipart body: {}", e))
    };

    let mut fields = PostFieldsIn::default();
    let mut files: Vec<UploadedFile> = Vec::new();

    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        if let Some(file_name) = file_name {
            let content_type = field
                .content_type()
                .map(|m| m.essence_str().to_string())
                .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

            let mut bytes = Vec::new();
            while let Some(chunk) = field.try_next().await.map_err(malformed)? {
                if bytes.len() + chunk.len() > MAX_FILE_BYTES {
                    return Err(AppError::PayloadRejected(format!(
                        "{} exceeds the {} MB limit",
                        file_name,
                        MAX_FILE_BYTES / (1024 * 1024)
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }

            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            if files.len() == MAX_FILES {
                return Err(AppError::PayloadRejected(format!(
                    "at most {} files may be attached",
                    MAX_FILES
                )));
            }
            files.push(UploadedFile { file_name: Some(file_name), content_type, bytes });
            continue;
        }

        let mut raw = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(malformed)? {
            if raw.len() + chunk.len() > MAX_TEXT_BYTES {
                return Err(AppError::Validation(format!("{} is too long", name)));
            }
            raw.extend_from_slice(&chunk);
        }
        let value = String::from_utf8(raw)
            .map_err(|_| AppError::Validation(format!("{} must be valid UTF-8", name)))?;

        match name.as_str() {
            "title" => fields.title = Some(value),
            "description" => fields.description = Some(value),
            "content" => fields.content = Some(value),
            _ => {}
        }
    }

    CreatePostInput::new(fields, files)
}

/// POST /posts (multipart)
#[post("/posts")]
pub async fn create_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: Multipart,
) -> HttpResponse {
    let input = match read_post_form(payload).await {
        Ok(input) => input,
        Err(e) => return fail(&state, "create_post rejected", e),
    };

    match state.posts.create_post(user.user_id(), input).await {
        Ok(created) => HttpResponse::Created().json(created),
        Err(e) => fail(&state, "Failed to create post", e),
    }
}

/// GET /posts
#[get("/posts")]
pub async fn list_posts(state: web::Data<AppState>) -> HttpResponse {
    match state.posts.list_posts().await {
        Ok(posts) => HttpResponse::Ok().json(posts),
        Err(e) => fail(&state, "Failed to list posts", e),
    }
}

/// GET /posts/user/{user_id}
#[get("/posts/user/{user_id}")]
pub async fn list_user_posts(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let Ok(user_id) = Uuid::parse_str(&path) else {
        return fail(&state, "list_user_posts", AppError::Validation("Invalid user id".into()));
    };

    match state.posts.list_posts_by_user(user_id).await {
        Ok(posts) => HttpResponse::Ok().json(posts),
        Err(e) => fail(&state, "Failed to list user posts", e),
    }
}

/// GET /posts/{id}
#[get("/posts/{id}")]
pub async fn get_post(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let Ok(id) = Uuid::parse_str(&path) else {
        return fail(&state, "get_post", AppError::NotFound("Post not found".into()));
    };

    match state.posts.get_post(id).await {
        Ok(post) => HttpResponse::Ok().json(post),
        Err(e) => fail(&state, "Failed to fetch post", e),
    }
}

/// PUT /posts/{id}
#[put("/posts/{id}")]
pub async fn update_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<PostFieldsIn>,
) -> HttpResponse {
    let fields = match body.into_inner().validate() {
        Ok(fields) => fields,
        Err(e) => return fail(&state, "update_post", e),
    };
    let Ok(id) = Uuid::parse_str(&path) else {
        return fail(&state, "update_post", AppError::Forbidden("Not allowed to edit this post".into()));
    };

    match state.posts.update_post(id, user.user_id(), fields).await {
        Ok(post) => HttpResponse::Ok().json(post),
        Err(e) => fail(&state, "Failed to update post", e),
    }
}

/// DELETE /posts/{id}
#[delete("/posts/{id}")]
pub async fn delete_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> HttpResponse {
    let Ok(id) = Uuid::parse_str(&path) else {
        return fail(&state, "delete_post", AppError::Forbidden("Not allowed to delete this post".into()));
    };

    match state.posts.delete_post(id, user.user_id()).await {
        Ok(()) => HttpResponse::Ok().json(MessageOut::success("Post deleted")),
        Err(e) => fail(&state, "Failed to delete post", e),
    }
}
