/// Post service - listings, detail pages, creation and editing
use super::Submission;
use crate::db::{BlogRepository, NewPost, PostChanges, PostFilter};
use crate::error::{AppError, Result};
use crate::forms::{FormErrors, PostForm, INVALID_CHOICE};
use crate::media::{inspect_image, ImageKind, MediaStore, INVALID_IMAGE};
use crate::metrics;
use crate::models::{CommentView, Group, Post, PostView, User};
use crate::pagination::{Page, Paginator};
use std::sync::Arc;
use tracing::info;

const CLEAR_AND_UPLOAD: &str =
    "Пожалуйста, загрузите файл или поставьте флажок \"Очистить\", но не оба сразу.";

/// Everything the post detail page shows.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostView,
    pub author_posts_count: i64,
    pub comments: Vec<CommentView>,
}

/// A validated image ready to be written.
struct AcceptedImage {
    bytes: Vec<u8>,
    kind: ImageKind,
}

#[derive(Clone)]
pub struct PostService {
    repo: Arc<dyn BlogRepository>,
    media: MediaStore,
    paginator: Paginator,
}

impl PostService {
    pub fn new(repo: Arc<dyn BlogRepository>, media: MediaStore) -> Self {
        Self {
            repo,
            media,
            paginator: Paginator::default(),
        }
    }

    /// One page of posts matching `filter`.
    pub async fn listing(
        &self,
        filter: PostFilter,
        requested: Option<&str>,
    ) -> Result<Page<PostView>> {
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

    pub async fn group_page(
        &self,
        slug: &str,
        requested: Option<&str>,
    ) -> Result<(Group, Page<PostView>)> {
        let group = self
            .repo
            .find_group_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("group {}", slug)))?;
        let page = self.listing(PostFilter::Group(group.id), requested).await?;
        Ok((group, page))
    }

    pub async fn profile_page(
        &self,
        username: &str,
        requested: Option<&str>,
    ) -> Result<(User, Page<PostView>)> {
        let author = self
            .repo
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", username)))?;
        let page = self.listing(PostFilter::Author(author.id), requested).await?;
        Ok((author, page))
    }

    pub async fn get_post(&self, post_id: i64) -> Result<PostView> {
        self.repo
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
    }

    pub async fn detail(&self, post_id: i64) -> Result<PostDetail> {
        let post = self.get_post(post_id).await?;
        let author_posts_count = self
            .repo
            .count_posts(PostFilter::Author(post.author.id))
            .await?;
        let comments = self.repo.list_comments(post_id).await?;
        Ok(PostDetail {
            post,
            author_posts_count,
            comments,
        })
    }

    pub async fn groups(&self) -> Result<Vec<Group>> {
        self.repo.list_groups().await
    }

    /// Stateless rules plus the ones that need storage: existing group, real image.
    async fn check(&self, form: &PostForm) -> Result<(FormErrors, Option<AcceptedImage>)> {
        let mut errors = form.validate();

        if let Ok(Some(group_id)) = form.group_id() {
            if self.repo.find_group_by_id(group_id).await?.is_none() {
                errors.add("group", INVALID_CHOICE);
            }
        }

        let mut accepted = None;
        if let Some(upload) = &form.image {
            if form.clear_image {
                errors.add("image", CLEAR_AND_UPLOAD);
            }
            match inspect_image(upload.bytes.clone()).await {
                Some(kind) => {
                    accepted = Some(AcceptedImage {
                        bytes: upload.bytes.clone(),
                        kind,
                    })
                }
                None => errors.add("image", INVALID_IMAGE),
            }
        }

        Ok((errors, accepted))
    }

    async fn store(&self, image: Option<AcceptedImage>) -> Result<Option<String>> {
        match image {
            Some(image) => Ok(Some(
                self.media.save_post_image(&image.bytes, image.kind).await?,
            )),
            None => Ok(None),
        }
    }

    pub async fn create(&self, author_id: i64, form: &PostForm) -> Result<Submission<Post>> {
        let (errors, image) = self.check(form).await?;
        if !errors.is_empty() {
            return Ok(Submission::Rejected(errors));
        }

        let image = self.store(image).await?;
        let post = self
            .repo
            .create_post(NewPost {
                text: form.text.clone(),
                author_id,
                group_id: form.group_id().ok().flatten(),
                image,
            })
            .await?;

        metrics::record_write("post_create");
        info!(post_id = post.id, author_id, "Post created");
        Ok(Submission::Accepted(post))
    }

    /// Replace the editable fields of `existing`. Authorship is checked by the caller.
    pub async fn update(&self, existing: &PostView, form: &PostForm) -> Result<Submission<Post>> {
        let (errors, image) = self.check(form).await?;
        if !errors.is_empty() {
            return Ok(Submission::Rejected(errors));
        }

        let image = match self.store(image).await? {
            Some(path) => Some(path),
            None if form.clear_image => None,
            None => existing.image.clone(),
        };
        let post = self
            .repo
            .update_post(
                existing.id,
                PostChanges {
                    text: form.text.clone(),
                    group_id: form.group_id().ok().flatten(),
                    image,
                },
            )
            .await?;

        metrics::record_write("post_edit");
        info!(post_id = post.id, "Post updated");
        Ok(Submission::Accepted(post))
    }
}
