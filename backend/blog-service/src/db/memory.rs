use super::{BlogRepository, NewComment, NewGroup, NewPost, NewUser, PostChanges, PostFilter};
use crate::error::{AppError, Result};
use crate::models::{Comment, CommentView, Follow, Group, Post, PostView, User};
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    next_id: i64,
    users: BTreeMap<i64, User>,
    groups: BTreeMap<i64, Group>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    follows: BTreeMap<i64, Follow>,
}

impl State {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn require_user(&self, user_id: i64) -> Result<&User> {
        self.users
            .get(&user_id)
            .ok_or_else(|| AppError::Validation(format!("user {} does not exist", user_id)))
    }

    fn require_group(&self, group_id: Option<i64>) -> Result<()> {
        match group_id {
            Some(id) if !self.groups.contains_key(&id) => {
                Err(AppError::Validation(format!("group {} does not exist", id)))
            }
            _ => Ok(()),
        }
    }

    fn matches(&self, post: &Post, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self
                .follows
                .values()
                .any(|f| f.user_id == user_id && f.author_id == post.author_id),
        }
    }

    fn post_view(&self, post: &Post) -> Option<PostView> {
        let author = self.users.get(&post.author_id)?.author_ref();
        let group = post
            .group_id
            .and_then(|id| self.groups.get(&id))
            .map(|g| crate::models::GroupRef {
                id: g.id,
                title: g.title.clone(),
                slug: g.slug.clone(),
            });
        Some(PostView {
            id: post.id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            image: post.image.clone(),
            author,
            group,
        })
    }

    fn filtered(&self, filter: PostFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .values()
            .filter(|p| self.matches(p, filter))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }

    fn remove_post(&mut self, post_id: i64) -> bool {
        let removed = self.posts.remove(&post_id).is_some();
        if removed {
            self.comments.retain(|_, c| c.post_id != post_id);
        }
        removed
    }
}

/// In-process repository with the same constraints as the PostgreSQL schema:
/// unique usernames, slugs and follow pairs, no self-follow, and cascading deletes.
#[derive(Default)]
pub struct InMemoryBlogRepository {
    state: RwLock<State>,
}

impl InMemoryBlogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BlogRepository for InMemoryBlogRepository {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "username {} is taken",
                user.username
            )));
        }
        let id = state.allocate_id();
        let created = User {
            id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            date_joined: Utc::now(),
        };
        state.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_users_by_email(&self, email: &str) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let wanted = email.to_lowercase();
        Ok(state
            .users
            .values()
            .filter(|u| u.email.to_lowercase() == wanted)
            .cloned()
            .collect())
    }

    async fn set_password(&self, user_id: i64, password_hash: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.users.remove(&user_id).is_none() {
            return Ok(false);
        }
        let authored: Vec<i64> = state
            .posts
            .values()
            .filter(|p| p.author_id == user_id)
            .map(|p| p.id)
            .collect();
        for post_id in authored {
            state.remove_post(post_id);
        }
        state.comments.retain(|_, c| c.author_id != user_id);
        state
            .follows
            .retain(|_, f| f.user_id != user_id && f.author_id != user_id);
        Ok(true)
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group> {
        let mut state = self.state.write().await;
        if state.groups.values().any(|g| g.slug == group.slug) {
            return Err(AppError::Conflict(format!("slug {} is taken", group.slug)));
        }
        let id = state.allocate_id();
        let created = Group {
            id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        state.groups.insert(id, created.clone());
        Ok(created)
    }

    async fn find_group_by_id(&self, id: i64) -> Result<Option<Group>> {
        Ok(self.state.read().await.groups.get(&id).cloned())
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let state = self.state.read().await;
        Ok(state.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let state = self.state.read().await;
        let mut groups: Vec<Group> = state.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn delete_group(&self, group_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.groups.remove(&group_id).is_none() {
            return Ok(false);
        }
        for post in state.posts.values_mut() {
            if post.group_id == Some(group_id) {
                post.group_id = None;
            }
        }
        Ok(true)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let mut state = self.state.write().await;
        state.require_user(post.author_id)?;
        state.require_group(post.group_id)?;
        let id = state.allocate_id();
        let created = Post {
            id,
            text: post.text,
            pub_date: Utc::now(),
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image,
        };
        state.posts.insert(id, created.clone());
        Ok(created)
    }

    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<Post> {
        let mut state = self.state.write().await;
        state.require_group(changes.group_id)?;
        let post = state
            .posts
            .get_mut(&post_id)
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;
        post.text = changes.text;
        post.group_id = changes.group_id;
        post.image = changes.image;
        Ok(post.clone())
    }

    async fn find_post(&self, post_id: i64) -> Result<Option<PostView>> {
        let state = self.state.read().await;
        Ok(state.posts.get(&post_id).and_then(|p| state.post_view(p)))
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state.filtered(filter).len() as i64)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostView>> {
        let state = self.state.read().await;
        Ok(state
            .filtered(filter)
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .filter_map(|p| state.post_view(p))
            .collect())
    }

    async fn delete_post(&self, post_id: i64) -> Result<bool> {
        Ok(self.state.write().await.remove_post(post_id))
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        let mut state = self.state.write().await;
        state.require_user(comment.author_id)?;
        if !state.posts.contains_key(&comment.post_id) {
            return Err(AppError::Validation(format!(
                "post {} does not exist",
                comment.post_id
            )));
        }
        let id = state.allocate_id();
        let created = Comment {
            id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created: Utc::now(),
        };
        state.comments.insert(id, created.clone());
        Ok(created)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>> {
        let state = self.state.read().await;
        let mut comments: Vec<CommentView> = state
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .filter_map(|c| {
                let author = state.users.get(&c.author_id)?.author_ref();
                Some(CommentView {
                    id: c.id,
                    post_id: c.post_id,
                    text: c.text.clone(),
                    created: c.created,
                    author,
                })
            })
            .collect();
        comments.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        Ok(comments)
    }

    async fn create_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if user_id == author_id {
            return Err(AppError::Validation("check no_self_follow failed".to_string()));
        }
        state.require_user(user_id)?;
        state.require_user(author_id)?;
        if state
            .follows
            .values()
            .any(|f| f.user_id == user_id && f.author_id == author_id)
        {
            return Ok(false);
        }
        let id = state.allocate_id();
        state.follows.insert(
            id,
            Follow {
                id,
                user_id,
                author_id,
            },
        );
        Ok(true)
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|_, f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(state.follows.len() < before)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .follows
            .values()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn count_following(&self, user_id: i64) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state.follows.values().filter(|f| f.user_id == user_id).count() as i64)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user(repo: &InMemoryBlogRepository, name: &str) -> User {
        repo.create_user(NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "hash".to_string(),
        })
        .await
        .unwrap()
    }

    async fn post(repo: &InMemoryBlogRepository, author: &User, group_id: Option<i64>) -> Post {
        repo.create_post(NewPost {
            text: "Тестовый пост".to_string(),
            author_id: author.id,
            group_id,
            image: None,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let repo = InMemoryBlogRepository::new();
        user(&repo, "auth").await;
        let err = repo
            .create_user(NewUser {
                username: "auth".to_string(),
                email: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_follow_pair_is_unique_and_not_reflexive() {
        let repo = InMemoryBlogRepository::new();
        let reader = user(&repo, "reader").await;
        let author = user(&repo, "author").await;

        assert!(repo.create_follow(reader.id, author.id).await.unwrap());
        assert!(!repo.create_follow(reader.id, author.id).await.unwrap());
        assert_eq!(repo.count_following(reader.id).await.unwrap(), 1);

        let err = repo.create_follow(reader.id, reader.id).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_listing_is_newest_first() {
        let repo = InMemoryBlogRepository::new();
        let author = user(&repo, "auth").await;
        let first = post(&repo, &author, None).await;
        let second = post(&repo, &author, None).await;

        let posts = repo.list_posts(PostFilter::All, 10, 0).await.unwrap();
        assert_eq!(posts[0].id, second.id);
        assert_eq!(posts[1].id, first.id);
    }

    #[tokio::test]
    async fn test_deleting_group_keeps_posts() {
        let repo = InMemoryBlogRepository::new();
        let author = user(&repo, "auth").await;
        let group = repo
            .create_group(NewGroup {
                title: "Группа".to_string(),
                slug: "group".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();
        let created = post(&repo, &author, Some(group.id)).await;

        assert!(repo.delete_group(group.id).await.unwrap());
        let view = repo.find_post(created.id).await.unwrap().unwrap();
        assert!(view.group.is_none());
    }

    #[tokio::test]
    async fn test_deleting_user_cascades() {
        let repo = InMemoryBlogRepository::new();
        let author = user(&repo, "auth").await;
        let reader = user(&repo, "reader").await;
        let created = post(&repo, &author, None).await;
        repo.create_comment(NewComment {
            post_id: created.id,
            author_id: reader.id,
            text: "Комментарий".to_string(),
        })
        .await
        .unwrap();
        repo.create_follow(reader.id, author.id).await.unwrap();

        assert!(repo.delete_user(author.id).await.unwrap());
        assert_eq!(repo.count_posts(PostFilter::All).await.unwrap(), 0);
        assert!(repo.list_comments(created.id).await.unwrap().is_empty());
        assert_eq!(repo.count_following(reader.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_followed_by_filter() {
        let repo = InMemoryBlogRepository::new();
        let author = user(&repo, "auth").await;
        let other = user(&repo, "other").await;
        let reader = user(&repo, "reader").await;
        post(&repo, &author, None).await;
        post(&repo, &other, None).await;
        repo.create_follow(reader.id, author.id).await.unwrap();

        let feed = repo
            .list_posts(PostFilter::FollowedBy(reader.id), 10, 0)
            .await
            .unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].author.id, author.id);
    }
}
