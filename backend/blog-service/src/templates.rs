//! Askama templates
//!
//! Template structs for every rendered page. Each carries `user` because the base
//! layout shows the session-aware navigation.

use crate::forms::FormErrors;
use crate::middleware::SessionUser;
use crate::models::{labels, CommentView, Group, PostView, User};
use crate::pagination::Page;
use askama::Template;

/// `<option>` of the group select.
pub struct GroupOption {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

impl GroupOption {
    pub fn list(groups: Vec<Group>, selected: Option<i64>) -> Vec<GroupOption> {
        groups
            .into_iter()
            .map(|g| GroupOption {
                selected: Some(g.id) == selected,
                id: g.id,
                title: g.title,
            })
            .collect()
    }
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub user: Option<SessionUser>,
    pub page: Page<PostView>,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowIndexTemplate {
    pub user: Option<SessionUser>,
    pub page: Page<PostView>,
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupTemplate {
    pub user: Option<SessionUser>,
    pub group: Group,
    pub page: Page<PostView>,
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
    pub user: Option<SessionUser>,
    pub author: User,
    pub page: Page<PostView>,
    /// `None` for anonymous visitors: no follow button at all
    pub following: Option<bool>,
}

impl ProfileTemplate {
    pub fn display_name(&self) -> String {
        self.author.author_ref().display_name()
    }

    pub fn follow_url(&self) -> String {
        format!("{}follow/", self.author.author_ref().profile_url())
    }

    pub fn unfollow_url(&self) -> String {
        format!("{}unfollow/", self.author.author_ref().profile_url())
    }

    fn is_own_profile(&self) -> bool {
        self.user.as_ref().map(|u| u.id) == Some(self.author.id)
    }

    /// Logged-in visitors other than the author get a follow or unfollow button.
    pub fn shows_follow(&self) -> bool {
        self.following == Some(false) && !self.is_own_profile()
    }

    pub fn shows_unfollow(&self) -> bool {
        self.following == Some(true) && !self.is_own_profile()
    }
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
    pub user: Option<SessionUser>,
    pub post: PostView,
    pub author_posts_count: i64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub comment_label: &'static str,
}

impl PostDetailTemplate {
    pub fn new(
        user: Option<SessionUser>,
        post: PostView,
        author_posts_count: i64,
        comments: Vec<CommentView>,
    ) -> Self {
        let can_edit = user.as_ref().map(|u| post.is_authored_by(u.id)).unwrap_or(false);
        Self {
            user,
            post,
            author_posts_count,
            comments,
            can_edit,
            comment_label: labels::COMMENT_TEXT,
        }
    }

    pub fn comment_url(&self) -> String {
        format!("{}comment/", self.post.url())
    }
}

/// Create and edit share one template; `is_edit` switches titles and the action.
#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate {
    pub user: Option<SessionUser>,
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub current_image: Option<String>,
    pub errors: FormErrors,
}

impl PostFormTemplate {
    pub fn text_label(&self) -> &'static str {
        labels::POST_TEXT
    }

    pub fn text_help(&self) -> &'static str {
        labels::POST_TEXT_HELP
    }

    pub fn group_label(&self) -> &'static str {
        labels::POST_GROUP
    }

    pub fn group_help(&self) -> &'static str {
        labels::POST_GROUP_HELP
    }

    pub fn image_label(&self) -> &'static str {
        labels::POST_IMAGE
    }

    pub fn no_group_selected(&self) -> bool {
        !self.groups.iter().any(|g| g.selected)
    }
}

#[derive(Template)]
#[template(path = "users/signup.html")]
pub struct SignupTemplate {
    pub user: Option<SessionUser>,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub user: Option<SessionUser>,
    pub username: String,
    pub next: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "users/logged_out.html")]
pub struct LoggedOutTemplate {
    pub user: Option<SessionUser>,
}

#[derive(Template)]
#[template(path = "users/password_change_form.html")]
pub struct PasswordChangeTemplate {
    pub user: Option<SessionUser>,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "users/password_change_done.html")]
pub struct PasswordChangeDoneTemplate {
    pub user: Option<SessionUser>,
}

#[derive(Template)]
#[template(path = "users/password_reset_form.html")]
pub struct PasswordResetTemplate {
    pub user: Option<SessionUser>,
    pub email: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "users/password_reset_done.html")]
pub struct PasswordResetDoneTemplate {
    pub user: Option<SessionUser>,
}

#[derive(Template)]
#[template(path = "users/password_reset_confirm.html")]
pub struct PasswordResetConfirmTemplate {
    pub user: Option<SessionUser>,
    pub valid_link: bool,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "users/password_reset_complete.html")]
pub struct PasswordResetCompleteTemplate {
    pub user: Option<SessionUser>,
}

#[derive(Template)]
#[template(path = "about/author.html")]
pub struct AboutAuthorTemplate {
    pub user: Option<SessionUser>,
}

#[derive(Template)]
#[template(path = "about/tech.html")]
pub struct AboutTechTemplate {
    pub user: Option<SessionUser>,
}

#[derive(Template)]
#[template(path = "core/404.html")]
pub struct NotFoundTemplate {
    pub user: Option<SessionUser>,
    pub path: String,
}

impl NotFoundTemplate {
    pub fn new(path: String) -> Self {
        Self { user: None, path }
    }
}

#[derive(Template)]
#[template(path = "core/500.html")]
pub struct ServerErrorTemplate {
    pub user: Option<SessionUser>,
    pub status: u16,
    pub message: String,
}

impl ServerErrorTemplate {
    pub fn new(status: u16, message: String) -> Self {
        Self {
            user: None,
            status,
            message,
        }
    }
}
