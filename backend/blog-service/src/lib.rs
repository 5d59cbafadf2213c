/// Blog Service Library
///
/// Server-rendered blog: posts filed under groups, author profiles, comments,
/// subscriptions to authors and a personal feed, plus account management.
///
/// # Modules
///
/// - `app`: shared state and route table
/// - `handlers`: HTTP request handlers
/// - `models`: users, groups, posts, comments, follows
/// - `services`: business logic layer
/// - `db`: repository trait with PostgreSQL and in-process backends
/// - `middleware`: session authentication and page caching
/// - `forms`: form payloads and validation
/// - `templates`: askama page templates
/// - `pagination`: page windows over listings
/// - `security`: password hashing, session and reset tokens
/// - `media`: uploaded image storage
/// - `error`: error types and handling
/// - `config`: configuration management
/// - `metrics`: Prometheus collectors
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod media;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod security;
pub mod services;
pub mod templates;

pub use app::{build_app, AppState};
pub use config::Config;
pub use error::{AppError, Result};
