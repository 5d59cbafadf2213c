/// Account handlers mounted under /auth/
use super::{redirect, render};
use crate::app::AppState;
use crate::error::Result;
use crate::forms::{
    FormErrors, LoginForm, PasswordChangeForm, PasswordResetForm, SetPasswordForm, SignupForm,
};
use crate::middleware::{CurrentUser, LoginRequired};
use crate::models::User;
use crate::services::Submission;
use crate::templates::{
    LoggedOutTemplate, LoginTemplate, PasswordChangeDoneTemplate, PasswordChangeTemplate,
    PasswordResetCompleteTemplate, PasswordResetConfirmTemplate, PasswordResetDoneTemplate,
    PasswordResetTemplate, SignupTemplate,
};
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use askama::Template;
use serde::Deserialize;

/// Only same-site paths are followed after login.
fn safe_next(next: &str) -> &str {
    if next.starts_with('/') && !next.starts_with("//") && !next.starts_with("/\\") {
        next
    } else {
        "/"
    }
}

/// Redirect that also sets the session cookie for `user`.
fn login_redirect(state: &AppState, user: &User, location: &str) -> Result<HttpResponse> {
    let cookie = state.sessions.login_cookie(user.id, &user.username)?;
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, location.to_string()))
        .cookie(cookie)
        .finish())
}

/// GET /auth/signup/
pub async fn signup_form(user: CurrentUser) -> Result<HttpResponse> {
    render(&SignupTemplate {
        user: user.0,
        first_name: String::new(),
        last_name: String::new(),
        username: String::new(),
        email: String::new(),
        errors: FormErrors::new(),
    })
}

/// POST /auth/signup/
pub async fn signup(
    state: web::Data<AppState>,
    user: CurrentUser,
    form: web::Form<SignupForm>,
) -> Result<HttpResponse> {
    match state.accounts.signup(&form).await? {
        Submission::Accepted(created) => login_redirect(&state, &created, "/"),
        Submission::Rejected(errors) => {
            let form = form.into_inner();
            render(&SignupTemplate {
                user: user.0,
                first_name: form.first_name,
                last_name: form.last_name,
                username: form.username,
                email: form.email,
                errors,
            })
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// GET /auth/login/
pub async fn login_form(user: CurrentUser, query: web::Query<NextQuery>) -> Result<HttpResponse> {
    render(&LoginTemplate {
        user: user.0,
        username: String::new(),
        next: query.into_inner().next.unwrap_or_default(),
        errors: FormErrors::new(),
    })
}

/// POST /auth/login/
pub async fn login(
    state: web::Data<AppState>,
    user: CurrentUser,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse> {
    match state.accounts.login(&form).await? {
        Submission::Accepted(account) => login_redirect(&state, &account, safe_next(&form.next)),
        Submission::Rejected(errors) => {
            let form = form.into_inner();
            render(&LoginTemplate {
                user: user.0,
                username: form.username,
                next: form.next,
                errors,
            })
        }
    }
}

/// GET|POST /auth/logout/
pub async fn logout(state: web::Data<AppState>) -> Result<HttpResponse> {
    let body = LoggedOutTemplate { user: None }.render()?;
    Ok(HttpResponse::Ok()
        .cookie(state.sessions.logout_cookie())
        .content_type("text/html; charset=utf-8")
        .body(body))
}

/// GET /auth/password_change/
pub async fn password_change_form(user: LoginRequired) -> Result<HttpResponse> {
    render(&PasswordChangeTemplate {
        user: Some(user.0),
        errors: FormErrors::new(),
    })
}

/// POST /auth/password_change/
pub async fn password_change(
    state: web::Data<AppState>,
    user: LoginRequired,
    form: web::Form<PasswordChangeForm>,
) -> Result<HttpResponse> {
    match state.accounts.change_password(user.0.id, &form).await? {
        Submission::Accepted(()) => Ok(redirect("/auth/password_change/done/")),
        Submission::Rejected(errors) => render(&PasswordChangeTemplate {
            user: Some(user.0),
            errors,
        }),
    }
}

/// GET /auth/password_change/done/
pub async fn password_change_done(user: LoginRequired) -> Result<HttpResponse> {
    render(&PasswordChangeDoneTemplate { user: Some(user.0) })
}

/// GET /auth/password_reset/
pub async fn password_reset_form(user: CurrentUser) -> Result<HttpResponse> {
    render(&PasswordResetTemplate {
        user: user.0,
        email: String::new(),
        errors: FormErrors::new(),
    })
}

/// POST /auth/password_reset/
pub async fn password_reset(
    state: web::Data<AppState>,
    user: CurrentUser,
    form: web::Form<PasswordResetForm>,
) -> Result<HttpResponse> {
    match state.accounts.request_reset(&form).await? {
        Submission::Accepted(_) => Ok(redirect("/auth/password_reset/done/")),
        Submission::Rejected(errors) => render(&PasswordResetTemplate {
            user: user.0,
            email: form.into_inner().email,
            errors,
        }),
    }
}

/// GET /auth/password_reset/done/
pub async fn password_reset_done(user: CurrentUser) -> Result<HttpResponse> {
    render(&PasswordResetDoneTemplate { user: user.0 })
}

/// GET /auth/reset/{uid}/{token}/
pub async fn password_reset_confirm_form(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (uid, token) = path.into_inner();
    let target = state.accounts.reset_target(&uid, &token).await?;
    render(&PasswordResetConfirmTemplate {
        user: user.0,
        valid_link: target.is_some(),
        errors: FormErrors::new(),
    })
}

/// POST /auth/reset/{uid}/{token}/
pub async fn password_reset_confirm(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<(String, String)>,
    form: web::Form<SetPasswordForm>,
) -> Result<HttpResponse> {
    let (uid, token) = path.into_inner();
    let Some(target) = state.accounts.reset_target(&uid, &token).await? else {
        return render(&PasswordResetConfirmTemplate {
            user: user.0,
            valid_link: false,
            errors: FormErrors::new(),
        });
    };

    match state.accounts.reset_password(&target, &form).await? {
        Submission::Accepted(()) => Ok(redirect("/auth/reset/done/")),
        Submission::Rejected(errors) => render(&PasswordResetConfirmTemplate {
            user: user.0,
            valid_link: true,
            errors,
        }),
    }
}

/// GET /auth/reset/done/
pub async fn password_reset_complete(user: CurrentUser) -> Result<HttpResponse> {
    render(&PasswordResetCompleteTemplate { user: user.0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_accepts_local_paths() {
        assert_eq!(safe_next("/create/"), "/create/");
        assert_eq!(safe_next("/profile/auth/?page=2"), "/profile/auth/?page=2");
    }

    #[test]
    fn test_safe_next_rejects_offsite_targets() {
        assert_eq!(safe_next(""), "/");
        assert_eq!(safe_next("https://evil.example/"), "/");
        assert_eq!(safe_next("//evil.example/"), "/");
        assert_eq!(safe_next("/\\evil.example/"), "/");
    }
}
