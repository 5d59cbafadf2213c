/// Account service - signup, login, password change and reset
use super::Submission;
use crate::db::{BlogRepository, NewUser};
use crate::error::{AppError, Result};
use crate::forms::{
    FormErrors, LoginForm, PasswordChangeForm, PasswordResetForm, SetPasswordForm, SignupForm,
};
use crate::models::User;
use crate::security::{hash_password, verify_password, ResetTokens};
use std::sync::Arc;
use tracing::{info, warn};

pub const INVALID_LOGIN: &str = "Пожалуйста, введите правильные имя пользователя и пароль. Оба поля могут быть чувствительны к регистру.";
pub const USERNAME_TAKEN: &str = "Пользователь с таким именем уже существует.";
pub const WRONG_OLD_PASSWORD: &str =
    "Ваш старый пароль введен неправильно. Пожалуйста, введите его снова.";

#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn BlogRepository>,
    reset_tokens: ResetTokens,
}

impl AccountService {
    pub fn new(repo: Arc<dyn BlogRepository>, reset_tokens: ResetTokens) -> Self {
        Self { repo, reset_tokens }
    }

    pub async fn signup(&self, form: &SignupForm) -> Result<Submission<User>> {
        let mut errors = form.check();
        let username = form.username.trim();
        if !errors.has("username") && self.repo.find_user_by_username(username).await?.is_some() {
            errors.add("username", USERNAME_TAKEN);
        }
        if !errors.is_empty() {
            return Ok(Submission::Rejected(errors));
        }

        let created = self
            .repo
            .create_user(NewUser {
                username: username.to_string(),
                email: form.email.trim().to_string(),
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                password_hash: hash_password(&form.password1)?,
            })
            .await;

        match created {
            Ok(user) => {
                info!(user_id = user.id, username = %user.username, "User registered");
                Ok(Submission::Accepted(user))
            }
            // Lost a race with a concurrent signup for the same name.
            Err(AppError::Conflict(_)) => {
                let mut errors = FormErrors::new();
                errors.add("username", USERNAME_TAKEN);
                Ok(Submission::Rejected(errors))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn login(&self, form: &LoginForm) -> Result<Submission<User>> {
        let mut errors = form.check();
        if !errors.is_empty() {
            return Ok(Submission::Rejected(errors));
        }

        if let Some(user) = self.repo.find_user_by_username(form.username.trim()).await? {
            if verify_password(&form.password, &user.password_hash)? {
                info!(user_id = user.id, "User logged in");
                return Ok(Submission::Accepted(user));
            }
        }

        warn!(username = %form.username, "Failed login attempt");
        errors.add_non_field(INVALID_LOGIN);
        Ok(Submission::Rejected(errors))
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        form: &PasswordChangeForm,
    ) -> Result<Submission<()>> {
        let user = self
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;

        let mut errors = form.check(&user.username);
        if !errors.has("old_password") && !verify_password(&form.old_password, &user.password_hash)? {
            errors.add("old_password", WRONG_OLD_PASSWORD);
        }
        if !errors.is_empty() {
            return Ok(Submission::Rejected(errors));
        }

        self.repo
            .set_password(user.id, &hash_password(&form.new_password1)?)
            .await?;
        info!(user_id = user.id, "Password changed");
        Ok(Submission::Accepted(()))
    }

    /// Issue reset links for every account with the given email. Unknown addresses
    /// are accepted silently so the form does not reveal who is registered.
    /// Returns the issued links.
    pub async fn request_reset(&self, form: &PasswordResetForm) -> Result<Submission<Vec<String>>> {
        let errors = form.check();
        if !errors.is_empty() {
            return Ok(Submission::Rejected(errors));
        }

        let mut links = Vec::new();
        for user in self.repo.find_users_by_email(form.email.trim()).await? {
            if let Some(token) = self.reset_tokens.issue(&user) {
                let link = format!("/auth/reset/{}/{}/", user.id, token);
                // No mail transport: the link goes to the log.
                info!(user_id = user.id, link = %link, "Password reset link issued");
                links.push(link);
            }
        }
        Ok(Submission::Accepted(links))
    }

    /// The account a reset link belongs to, if the link is still valid.
    pub async fn reset_target(&self, uid: &str, token: &str) -> Result<Option<User>> {
        let Ok(user_id) = uid.parse::<i64>() else {
            return Ok(None);
        };
        let user = self.repo.find_user_by_id(user_id).await?;
        Ok(user.filter(|u| self.reset_tokens.check(u, token)))
    }

    pub async fn reset_password(
        &self,
        user: &User,
        form: &SetPasswordForm,
    ) -> Result<Submission<()>> {
        let errors = form.check(&user.username);
        if !errors.is_empty() {
            return Ok(Submission::Rejected(errors));
        }
        self.repo
            .set_password(user.id, &hash_password(&form.new_password1)?)
            .await?;
        info!(user_id = user.id, "Password reset completed");
        Ok(Submission::Accepted(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryBlogRepository;

    fn service() -> (AccountService, Arc<dyn BlogRepository>) {
        let repo: Arc<dyn BlogRepository> = Arc::new(InMemoryBlogRepository::new());
        let tokens = ResetTokens::new("account-service-test-secret-0123456789");
        (AccountService::new(repo.clone(), tokens), repo)
    }

    fn signup_form(username: &str) -> SignupForm {
        SignupForm {
            first_name: "Лев".into(),
            last_name: "Толстой".into(),
            username: username.into(),
            email: "leo@example.com".into(),
            password1: "Voina1Mir".into(),
            password2: "Voina1Mir".into(),
        }
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let (service, _) = service();
        assert!(service.signup(&signup_form("leo")).await.unwrap().is_accepted());

        let good = LoginForm {
            username: "leo".into(),
            password: "Voina1Mir".into(),
            next: String::new(),
        };
        assert!(service.login(&good).await.unwrap().is_accepted());

        let bad = LoginForm {
            password: "wrong-password".into(),
            ..good
        };
        match service.login(&bad).await.unwrap() {
            Submission::Rejected(errors) => {
                assert_eq!(errors.non_field(), &[INVALID_LOGIN.to_string()])
            }
            Submission::Accepted(_) => panic!("wrong password accepted"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_signup_is_rejected() {
        let (service, _) = service();
        service.signup(&signup_form("leo")).await.unwrap();
        match service.signup(&signup_form("leo")).await.unwrap() {
            Submission::Rejected(errors) => {
                assert_eq!(errors.field("username"), &[USERNAME_TAKEN.to_string()])
            }
            Submission::Accepted(_) => panic!("duplicate username accepted"),
        }
    }

    #[tokio::test]
    async fn test_change_password_checks_old_password() {
        let (service, repo) = service();
        service.signup(&signup_form("leo")).await.unwrap();
        let user = repo.find_user_by_username("leo").await.unwrap().unwrap();

        let wrong = PasswordChangeForm {
            old_password: "nope".into(),
            new_password1: "Anna2Karenina".into(),
            new_password2: "Anna2Karenina".into(),
        };
        assert!(!service.change_password(user.id, &wrong).await.unwrap().is_accepted());

        let right = PasswordChangeForm {
            old_password: "Voina1Mir".into(),
            ..wrong
        };
        assert!(service.change_password(user.id, &right).await.unwrap().is_accepted());
        let updated = repo.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(verify_password("Anna2Karenina", &updated.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_reset_link_is_single_use() {
        let (service, _) = service();
        service.signup(&signup_form("leo")).await.unwrap();

        let request = PasswordResetForm {
            email: "LEO@example.com".into(),
        };
        let Submission::Accepted(links) = service.request_reset(&request).await.unwrap() else {
            panic!("reset request rejected");
        };
        assert_eq!(links.len(), 1);

        let parts: Vec<&str> = links[0].trim_matches('/').split('/').collect();
        let (uid, token) = (parts[2], parts[3]);
        let user = service.reset_target(uid, token).await.unwrap().unwrap();

        let form = SetPasswordForm {
            new_password1: "Anna2Karenina".into(),
            new_password2: "Anna2Karenina".into(),
        };
        assert!(service.reset_password(&user, &form).await.unwrap().is_accepted());
        assert!(service.reset_target(uid, token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_for_unknown_email_issues_nothing() {
        let (service, _) = service();
        let request = PasswordResetForm {
            email: "nobody@example.com".into(),
        };
        match service.request_reset(&request).await.unwrap() {
            Submission::Accepted(links) => assert!(links.is_empty()),
            Submission::Rejected(_) => panic!("valid email rejected"),
        }
    }
}
