/// Comment service - replies under a post
use crate::db::{BlogRepository, NewComment};
use crate::error::{AppError, Result};
use crate::forms::CommentForm;
use crate::metrics;
use crate::models::Comment;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct CommentService {
    repo: Arc<dyn BlogRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn BlogRepository>) -> Self {
        Self { repo }
    }

    /// Add a comment when the form is valid. An unknown post is `NotFound`;
    /// an invalid form is silently dropped (`Ok(None)`).
    pub async fn add(
        &self,
        post_id: i64,
        author_id: i64,
        form: Option<&CommentForm>,
    ) -> Result<Option<Comment>> {
        if self.repo.find_post(post_id).await?.is_none() {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }

        let Some(form) = form.filter(|f| f.validate().is_empty()) else {
            debug!(post_id, author_id, "Comment form rejected");
            return Ok(None);
        };

        let comment = self
            .repo
            .create_comment(NewComment {
                post_id,
                author_id,
                text: form.text.clone(),
            })
            .await?;

        metrics::record_write("comment");
        debug!(post_id, comment_id = comment.id, "Comment added");
        Ok(Some(comment))
    }
}
