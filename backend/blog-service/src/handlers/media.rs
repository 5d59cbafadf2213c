/// Uploaded post images
use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::media::content_type_for;
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use std::io::ErrorKind;

/// GET /media/posts/{file_name}
pub async fn post_image(
    state: web::Data<AppState>,
    file_name: web::Path<String>,
) -> Result<HttpResponse> {
    let path = state
        .media
        .resolve_post_image(&file_name)
        .ok_or_else(|| AppError::NotFound(format!("/media/posts/{}", file_name)))?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("/media/posts/{}", file_name)))
        }
        Err(e) => return Err(e.into()),
    };

    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&path))
        .insert_header((header::CACHE_CONTROL, "public, max-age=86400"))
        .body(bytes))
}
