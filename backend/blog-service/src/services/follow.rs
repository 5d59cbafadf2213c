/// Follow service - subscriptions between readers and authors
use crate::db::{BlogRepository, PostFilter};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{PostView, User};
use crate::pagination::{Page, Paginator};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct FollowService {
    repo: Arc<dyn BlogRepository>,
    paginator: Paginator,
}

impl FollowService {
    pub fn new(repo: Arc<dyn BlogRepository>) -> Self {
        Self {
            repo,
            paginator: Paginator::default(),
        }
    }

    async fn author(&self, username: &str) -> Result<User> {
        self.repo
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", username)))
    }

    /// Subscribe `user_id` to `username`. Idempotent; following yourself is a no-op.
    pub async fn follow(&self, user_id: i64, username: &str) -> Result<User> {
        let author = self.author(username).await?;
        if author.id == user_id {
            metrics::record_follow("follow", "self");
            return Ok(author);
        }

        let created = self.repo.create_follow(user_id, author.id).await?;
        metrics::record_follow("follow", if created { "created" } else { "exists" });
        info!(user_id, author_id = author.id, created, "Follow requested");
        Ok(author)
    }

    /// Remove the subscription if present.
    pub async fn unfollow(&self, user_id: i64, username: &str) -> Result<User> {
        let author = self.author(username).await?;
        let removed = self.repo.delete_follow(user_id, author.id).await?;
        metrics::record_follow("unfollow", if removed { "removed" } else { "absent" });
        info!(user_id, author_id = author.id, removed, "Unfollow requested");
        Ok(author)
    }

    /// Profile flag: true when the viewer is the author or already follows them.
    pub async fn following_flag(&self, viewer_id: i64, author_id: i64) -> Result<bool> {
        if viewer_id == author_id {
            return Ok(true);
        }
        self.repo.is_following(viewer_id, author_id).await
    }

    /// Posts by every author `user_id` follows, paginated.
    pub async fn feed(&self, user_id: i64, requested: Option<&str>) -> Result<Page<PostView>> {
        let filter = PostFilter::FollowedBy(user_id);
        let count = self.repo.count_posts(filter).await?;
        let window = self
            .paginator
            .get_page(usize::try_from(count).unwrap_or(0), requested);
        let items = self
            .repo
            .list_posts(filter, window.limit() as i64, window.offset() as i64)
            .await?;
        Ok(Page::new(window, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryBlogRepository, NewUser};

    async fn user(repo: &Arc<dyn BlogRepository>, name: &str) -> User {
        repo.create_user(NewUser {
            username: name.into(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "hash".into(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_follow_is_idempotent() {
        let repo: Arc<dyn BlogRepository> = Arc::new(InMemoryBlogRepository::new());
        let reader = user(&repo, "reader").await;
        user(&repo, "author").await;
        let service = FollowService::new(repo.clone());

        service.follow(reader.id, "author").await.unwrap();
        service.follow(reader.id, "author").await.unwrap();
        assert_eq!(repo.count_following(reader.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_self_follow_creates_nothing() {
        let repo: Arc<dyn BlogRepository> = Arc::new(InMemoryBlogRepository::new());
        let reader = user(&repo, "reader").await;
        let service = FollowService::new(repo.clone());

        service.follow(reader.id, "reader").await.unwrap();
        assert_eq!(repo.count_following(reader.id).await.unwrap(), 0);
        assert!(service.following_flag(reader.id, reader.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_unfollow_without_follow_is_noop() {
        let repo: Arc<dyn BlogRepository> = Arc::new(InMemoryBlogRepository::new());
        let reader = user(&repo, "reader").await;
        let author = user(&repo, "author").await;
        let service = FollowService::new(repo.clone());

        service.unfollow(reader.id, "author").await.unwrap();
        assert!(!service.following_flag(reader.id, author.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_author_is_not_found() {
        let repo: Arc<dyn BlogRepository> = Arc::new(InMemoryBlogRepository::new());
        let reader = user(&repo, "reader").await;
        let service = FollowService::new(repo);

        assert!(matches!(
            service.follow(reader.id, "ghost").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.unfollow(reader.id, "ghost").await,
            Err(AppError::NotFound(_))
        ));
    }
}
