//! Form payloads and their stateless validation
//!
//! Checks that need storage (unique username, existing group, old password) live in
//! the services and add to the same `FormErrors`.

use crate::error::Result;
use actix_multipart::Multipart;
use futures_util::StreamExt;
use serde::Deserialize;
use std::collections::BTreeMap;
use validator::{Validate, ValidateEmail, ValidationErrors};

pub const REQUIRED: &str = "Обязательное поле.";
pub const INVALID_CHOICE: &str =
    "Выберите корректный вариант. Вашего варианта нет среди допустимых значений.";
pub const PASSWORD_MISMATCH: &str = "Введенные пароли не совпадают.";
pub const FILE_TOO_LARGE: &str = "Файл слишком большой.";
pub const FIELD_TOO_LARGE: &str = "Слишком большое значение поля.";

/// Per-field and form-wide error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn field(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, name: &str) -> bool {
        !self.field(name).is_empty()
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    /// Fold `validator` derive output in, using each rule's message.
    pub fn merge(&mut self, errors: &ValidationErrors) {
        for (field, list) in errors.field_errors() {
            for error in list.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Некорректное значение ({})", error.code));
                self.add(&field, message);
            }
        }
    }
}

fn require(errors: &mut FormErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
    }
}

/// Image part of a post form, before format sniffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Create/edit post form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostForm {
    pub text: String,
    /// Raw select value; empty means "no group"
    pub group: String,
    pub image: Option<UploadedFile>,
    /// "Clear" checkbox of the image widget
    pub clear_image: bool,
    /// Parts that went over the size cap; their content is dropped whole
    pub oversized: Vec<String>,
}

impl PostForm {
    /// Drain a multipart body into a form. Unknown fields are skipped.
    pub async fn from_multipart(mut payload: Multipart, max_upload_bytes: usize) -> Result<Self> {
        let mut form = PostForm::default();

        while let Some(item) = payload.next().await {
            let mut field = item?;
            let (name, filename) = match field.content_disposition() {
                Some(cd) => (
                    cd.get_name().unwrap_or_default().to_string(),
                    cd.get_filename().map(str::to_string),
                ),
                None => (String::new(), None),
            };

            let mut bytes = Vec::new();
            let mut oversized = false;
            while let Some(chunk) = field.next().await {
                let chunk = chunk?;
                // Keep draining so the next part can be read, but never splice.
                if oversized || bytes.len() + chunk.len() > max_upload_bytes {
                    oversized = true;
                    bytes.clear();
                    continue;
                }
                bytes.extend_from_slice(&chunk);
            }

            if oversized {
                form.oversized.push(name);
                continue;
            }

            match name.as_str() {
                "text" => form.text = String::from_utf8_lossy(&bytes).into_owned(),
                "group" => form.group = String::from_utf8_lossy(&bytes).trim().to_string(),
                "image-clear" => form.clear_image = true,
                // Browsers send an empty part when no file was picked.
                "image" if !bytes.is_empty() => {
                    form.image = Some(UploadedFile {
                        filename: filename.unwrap_or_default(),
                        bytes,
                    })
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// Selected group id; `Err` for a value that is not an id at all.
    pub fn group_id(&self) -> std::result::Result<Option<i64>, std::num::ParseIntError> {
        if self.group.is_empty() {
            return Ok(None);
        }
        self.group.parse::<i64>().map(Some)
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        for field in &self.oversized {
            let message = if field == "image" {
                FILE_TOO_LARGE
            } else {
                FIELD_TOO_LARGE
            };
            errors.add(field, message);
        }
        if !self.is_oversized("text") {
            require(&mut errors, "text", &self.text);
        }
        if self.group_id().is_err() {
            errors.add("group", INVALID_CHOICE);
        }
        errors
    }

    fn is_oversized(&self, field: &str) -> bool {
        self.oversized.iter().any(|f| f == field)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        require(&mut errors, "text", &self.text);
        errors
    }
}

fn username_chars_ok(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// Account creation form
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SignupForm {
    #[serde(default)]
    #[validate(length(max = 150, message = "Не более 150 символов."))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "Не более 150 символов."))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "Не более 150 символов."))]
    pub username: String,
    #[serde(default)]
    #[validate(length(max = 254, message = "Не более 254 символов."))]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

impl SignupForm {
    pub fn check(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        if let Err(e) = Validate::validate(self) {
            errors.merge(&e);
        }

        let username = self.username.trim();
        require(&mut errors, "username", username);
        if !username.is_empty() && !username_chars_ok(username) {
            errors.add(
                "username",
                "Введите правильное имя пользователя. Оно может содержать только буквы, цифры и знаки @/./+/-/_.",
            );
        }
        let email = self.email.trim();
        if !email.is_empty() && !email.validate_email() {
            errors.add("email", "Введите правильный адрес электронной почты.");
        }

        require(&mut errors, "password1", &self.password1);
        require(&mut errors, "password2", &self.password2);
        if !self.password1.is_empty() && !self.password2.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", PASSWORD_MISMATCH);
            } else {
                for problem in crate::security::validate_password(&self.password2, username) {
                    errors.add("password2", problem);
                }
            }
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Where to go after a successful login
    #[serde(default)]
    pub next: String,
}

impl LoginForm {
    pub fn check(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        require(&mut errors, "username", &self.username);
        require(&mut errors, "password", &self.password);
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordChangeForm {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password1: String,
    #[serde(default)]
    pub new_password2: String,
}

impl PasswordChangeForm {
    pub fn check(&self, username: &str) -> FormErrors {
        let mut errors = FormErrors::new();
        require(&mut errors, "old_password", &self.old_password);
        check_new_password(&mut errors, &self.new_password1, &self.new_password2, username);
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordResetForm {
    #[serde(default)]
    pub email: String,
}

impl PasswordResetForm {
    pub fn check(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        let email = self.email.trim();
        if email.is_empty() {
            errors.add("email", REQUIRED);
        } else if !email.validate_email() {
            errors.add("email", "Введите правильный адрес электронной почты.");
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetPasswordForm {
    #[serde(default)]
    pub new_password1: String,
    #[serde(default)]
    pub new_password2: String,
}

impl SetPasswordForm {
    pub fn check(&self, username: &str) -> FormErrors {
        let mut errors = FormErrors::new();
        check_new_password(&mut errors, &self.new_password1, &self.new_password2, username);
        errors
    }
}

fn check_new_password(errors: &mut FormErrors, first: &str, second: &str, username: &str) {
    require(errors, "new_password1", first);
    require(errors, "new_password2", second);
    if first.is_empty() || second.is_empty() {
        return;
    }
    if first != second {
        errors.add("new_password2", PASSWORD_MISMATCH);
        return;
    }
    for problem in crate::security::validate_password(second, username) {
        errors.add("new_password2", problem);
    }
}
