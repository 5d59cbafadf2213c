/// Post handlers - listings, detail, create/edit, comments, follows
use super::{redirect, render, PageQuery};
use crate::app::AppState;
use crate::db::PostFilter;
use crate::error::Result;
use crate::forms::{CommentForm, FormErrors, PostForm};
use crate::middleware::{CurrentUser, LoginRequired, SessionUser};
use crate::models::{path_segment, PostView, User};
use crate::services::Submission;
use crate::templates::{
    FollowIndexTemplate, GroupOption, GroupTemplate, IndexTemplate, PostDetailTemplate,
    PostFormTemplate, ProfileTemplate,
};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};

/// GET /
pub async fn index(
    state: web::Data<AppState>,
    user: CurrentUser,
    query: PageQuery,
) -> Result<HttpResponse> {
    let page = state
        .posts
        .listing(PostFilter::All, query.requested())
        .await?;
    render(&IndexTemplate { user: user.0, page })
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    user: CurrentUser,
    slug: web::Path<String>,
    query: PageQuery,
) -> Result<HttpResponse> {
    let (group, page) = state.posts.group_page(&slug, query.requested()).await?;
    render(&GroupTemplate {
        user: user.0,
        group,
        page,
    })
}

async fn render_profile(
    state: &AppState,
    viewer: Option<SessionUser>,
    author: User,
    requested: Option<&str>,
    following: Option<bool>,
) -> Result<HttpResponse> {
    let page = state
        .posts
        .listing(PostFilter::Author(author.id), requested)
        .await?;
    render(&ProfileTemplate {
        user: viewer,
        author,
        page,
        following,
    })
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    user: CurrentUser,
    username: web::Path<String>,
    query: PageQuery,
) -> Result<HttpResponse> {
    let (author, page) = state
        .posts
        .profile_page(&username, query.requested())
        .await?;
    let following = match user.id() {
        Some(viewer_id) => Some(state.follows.following_flag(viewer_id, author.id).await?),
        None => None,
    };
    render(&ProfileTemplate {
        user: user.0,
        author,
        page,
        following,
    })
}

/// GET /profile/{username}/follow/
pub async fn profile_follow(
    state: web::Data<AppState>,
    user: LoginRequired,
    username: web::Path<String>,
    query: PageQuery,
) -> Result<HttpResponse> {
    let author = state.follows.follow(user.0.id, &username).await?;
    render_profile(&state, Some(user.0), author, query.requested(), Some(true)).await
}

/// GET /profile/{username}/unfollow/
pub async fn profile_unfollow(
    state: web::Data<AppState>,
    user: LoginRequired,
    username: web::Path<String>,
    query: PageQuery,
) -> Result<HttpResponse> {
    let author = state.follows.unfollow(user.0.id, &username).await?;
    render_profile(&state, Some(user.0), author, query.requested(), Some(false)).await
}

/// GET /follow/
pub async fn follow_index(
    state: web::Data<AppState>,
    user: LoginRequired,
    query: PageQuery,
) -> Result<HttpResponse> {
    let page = state.follows.feed(user.0.id, query.requested()).await?;
    render(&FollowIndexTemplate {
        user: Some(user.0),
        page,
    })
}

/// GET|POST /posts/{post_id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    user: CurrentUser,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let detail = state.posts.detail(*post_id).await?;
    render(&PostDetailTemplate::new(
        user.0,
        detail.post,
        detail.author_posts_count,
        detail.comments,
    ))
}

/// GET|POST /posts/{post_id}/comment/
///
/// A GET or an unparseable body reaches the service with no form and only
/// redirects back.
pub async fn add_comment(
    state: web::Data<AppState>,
    user: LoginRequired,
    post_id: web::Path<i64>,
    form: Option<web::Form<CommentForm>>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    state
        .comments
        .add(post_id, user.0.id, form.as_deref())
        .await?;
    Ok(redirect(&format!("/posts/{}/", post_id)))
}

struct FormState<'a> {
    text: &'a str,
    group_id: Option<i64>,
    errors: FormErrors,
}

async fn render_post_form(
    state: &AppState,
    user: SessionUser,
    existing: Option<&PostView>,
    form: FormState<'_>,
) -> Result<HttpResponse> {
    let groups = GroupOption::list(state.posts.groups().await?, form.group_id);
    render(&PostFormTemplate {
        user: Some(user),
        is_edit: existing.is_some(),
        action: existing
            .map(PostView::edit_url)
            .unwrap_or_else(|| "/create/".to_string()),
        text: form.text.to_string(),
        groups,
        current_image: existing.and_then(PostView::image_url),
        errors: form.errors,
    })
}

/// GET /create/
pub async fn post_create_form(
    state: web::Data<AppState>,
    user: LoginRequired,
) -> Result<HttpResponse> {
    let empty = FormState {
        text: "",
        group_id: None,
        errors: FormErrors::new(),
    };
    render_post_form(&state, user.0, None, empty).await
}

/// POST /create/
pub async fn post_create(
    state: web::Data<AppState>,
    user: LoginRequired,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = PostForm::from_multipart(payload, state.max_upload_bytes).await?;
    match state.posts.create(user.0.id, &form).await? {
        Submission::Accepted(_) => Ok(redirect(&format!(
            "/profile/{}/",
            path_segment(&user.0.username)
        ))),
        Submission::Rejected(errors) => {
            let submitted = FormState {
                text: &form.text,
                group_id: form.group_id().ok().flatten(),
                errors,
            };
            render_post_form(&state, user.0, None, submitted).await
        }
    }
}

/// GET /posts/{post_id}/edit/
pub async fn post_edit_form(
    state: web::Data<AppState>,
    user: LoginRequired,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let post = state.posts.get_post(*post_id).await?;
    if !post.is_authored_by(user.0.id) {
        return Ok(redirect(&post.url()));
    }

    let current = FormState {
        text: &post.text,
        group_id: post.group.as_ref().map(|g| g.id),
        errors: FormErrors::new(),
    };
    render_post_form(&state, user.0, Some(&post), current).await
}

/// POST /posts/{post_id}/edit/
pub async fn post_edit(
    state: web::Data<AppState>,
    user: LoginRequired,
    post_id: web::Path<i64>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let post = state.posts.get_post(*post_id).await?;
    if !post.is_authored_by(user.0.id) {
        tracing::warn!(post_id = post.id, user_id = user.0.id, "Edit attempt by non-author");
        return Ok(redirect(&post.url()));
    }

    let form = PostForm::from_multipart(payload, state.max_upload_bytes).await?;
    match state.posts.update(&post, &form).await? {
        Submission::Accepted(_) => Ok(redirect(&post.url())),
        Submission::Rejected(errors) => {
            let submitted = FormState {
                text: &form.text,
                group_id: form.group_id().ok().flatten(),
                errors,
            };
            render_post_form(&state, user.0, Some(&post), submitted).await
        }
    }
}
