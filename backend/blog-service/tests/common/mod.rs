//! Shared fixtures for the HTTP integration tests
//!
//! Every test gets its own in-process repository, memory page store and media
//! directory, so tests do not need PostgreSQL or Redis and can run in parallel.

#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::{test, web};
use blog_service::config::{
    AppConfig, CacheConfig, Config, MediaConfig, PageCacheBackend, SessionConfig, StorageBackend,
    StorageConfig,
};
use blog_service::db::{BlogRepository, InMemoryBlogRepository, NewGroup, NewPost, NewUser};
use blog_service::models::{Group, Post, User};
use blog_service::security::{hash_password, SESSION_COOKIE};
use blog_service::AppState;
use page_cache::MemoryPageStore;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

pub const TEST_SECRET: &str = "integration-test-secret-key-0123456789";
pub const TEST_PASSWORD: &str = "Str0ngPassw0rd";
pub const BOUNDARY: &str = "----blogservicetestboundary";

pub struct TestEnv {
    pub repo: Arc<dyn BlogRepository>,
    pub pages: Arc<MemoryPageStore>,
    pub state: web::Data<AppState>,
    pub media_root: PathBuf,
}

pub fn test_config(media_root: PathBuf) -> Config {
    Config {
        app: AppConfig {
            env: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
        },
        session: SessionConfig {
            secret_key: TEST_SECRET.to_string(),
            ttl_secs: 3600,
            secure_cookie: false,
        },
        cache: CacheConfig {
            backend: PageCacheBackend::Memory,
            redis_url: None,
            index_ttl_secs: 20,
        },
        media: MediaConfig {
            root: media_root,
            max_upload_bytes: 5 * 1024 * 1024,
        },
    }
}

impl TestEnv {
    pub fn new() -> Self {
        let media_root =
            std::env::temp_dir().join(format!("blog-service-test-{}", uuid::Uuid::new_v4()));
        let repo: Arc<dyn BlogRepository> = Arc::new(InMemoryBlogRepository::new());
        let pages = Arc::new(MemoryPageStore::new());
        let state = web::Data::new(AppState::new(
            &test_config(media_root.clone()),
            repo.clone(),
            pages.clone(),
        ));
        Self {
            repo,
            pages,
            state,
            media_root,
        }
    }

    pub async fn user(&self, username: &str) -> User {
        self.repo
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                first_name: String::new(),
                last_name: String::new(),
                password_hash: hash_password(TEST_PASSWORD).unwrap(),
            })
            .await
            .unwrap()
    }

    pub async fn group(&self, slug: &str) -> Group {
        self.repo
            .create_group(NewGroup {
                title: format!("Группа {}", slug),
                slug: slug.to_string(),
                description: "Тестовое описание".to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn post(&self, author: &User, group: Option<&Group>, text: &str) -> Post {
        self.repo
            .create_post(NewPost {
                text: text.to_string(),
                author_id: author.id,
                group_id: group.map(|g| g.id),
                image: None,
            })
            .await
            .unwrap()
    }

    pub async fn posts(&self, author: &User, group: Option<&Group>, count: usize) {
        for i in 0..count {
            self.post(author, group, &format!("Тестовый пост {}", i)).await;
        }
    }

    pub fn session_cookie(&self, user: &User) -> Cookie<'static> {
        self.state
            .sessions
            .login_cookie(user.id, &user.username)
            .unwrap()
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.media_root);
    }
}

/// Number of post cards rendered on a listing page.
pub fn post_cards(body: &str) -> usize {
    body.matches("<article class=\"post\">").count()
}

pub async fn body_text<B: MessageBody>(resp: ServiceResponse<B>) -> String {
    let bytes = test::read_body(resp).await;
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get("location")
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

/// Session cookie set by a response, if any.
pub fn response_session_cookie<B>(resp: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.into_owned())
}

/// `multipart/form-data` body with text fields and an optional file part.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((name, filename, bytes)) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header((
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(fields, file))
}

/// A tiny valid PNG.
pub fn small_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(2, 1, image::Rgb([10, 20, 30]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageOutputFormat::Png).unwrap();
    out.into_inner()
}
