//! Business logic between handlers and the repository
//!
//! - `PostService`: listings, detail, create/edit with image handling
//! - `CommentService`: comments on a post
//! - `FollowService`: follow/unfollow and the followed-authors feed
//! - `AccountService`: signup, login, password change and reset

pub mod accounts;
pub mod comments;
pub mod follow;
pub mod posts;

pub use accounts::AccountService;
pub use comments::CommentService;
pub use follow::FollowService;
pub use posts::PostService;

use crate::forms::FormErrors;

/// Result of a form submission that passed or failed validation.
#[derive(Debug)]
pub enum Submission<T> {
    Accepted(T),
    Rejected(FormErrors),
}

impl<T> Submission<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Submission::Accepted(_))
    }
}
