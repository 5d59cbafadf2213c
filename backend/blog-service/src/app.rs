//! Application wiring
//!
//! `AppState` holds the services shared by every worker; `build_app` mounts the
//! routes. `main` and the integration tests both go through `build_app`.

use crate::config::Config;
use crate::db::BlogRepository;
use crate::error::AppError;
use crate::handlers::{self, about, auth, health, media, posts};
use crate::media::MediaStore;
use crate::metrics;
use crate::middleware::{CachePage, SessionAuth};
use crate::security::{ResetTokens, SessionKeys};
use crate::services::{AccountService, CommentService, FollowService, PostService};
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App};
use page_cache::PageStore;
use std::sync::Arc;
use std::time::Duration;
use tracing_actix_web::TracingLogger;

/// Key prefix of the cached main listing.
pub const INDEX_CACHE_PREFIX: &str = "index_page";

pub struct AppState {
    pub repo: Arc<dyn BlogRepository>,
    pub pages: Arc<dyn PageStore>,
    pub sessions: SessionKeys,
    pub posts: PostService,
    pub comments: CommentService,
    pub follows: FollowService,
    pub accounts: AccountService,
    pub media: MediaStore,
    pub max_upload_bytes: usize,
    pub index_cache_ttl: Duration,
}

impl AppState {
    pub fn new(config: &Config, repo: Arc<dyn BlogRepository>, pages: Arc<dyn PageStore>) -> Self {
        let media = MediaStore::new(config.media.root.clone());
        Self {
            sessions: SessionKeys::new(
                &config.session.secret_key,
                config.session.ttl_secs,
                config.session.secure_cookie,
            ),
            posts: PostService::new(repo.clone(), media.clone()),
            comments: CommentService::new(repo.clone()),
            follows: FollowService::new(repo.clone()),
            accounts: AccountService::new(
                repo.clone(),
                ResetTokens::new(&config.session.secret_key),
            ),
            media,
            max_upload_bytes: config.media.max_upload_bytes,
            index_cache_ttl: Duration::from_secs(config.cache.index_ttl_secs),
            repo,
            pages,
        }
    }
}

/// Build the application with every route mounted.
pub fn build_app(
    state: web::Data<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let index_cache = CachePage::new(
        state.pages.clone(),
        INDEX_CACHE_PREFIX,
        state.index_cache_ttl,
    );
    let sessions = state.sessions.clone();

    App::new()
        .app_data(state)
        // A path segment of the wrong type (`/posts/abc/`) is an unknown page.
        .app_data(
            web::PathConfig::default()
                .error_handler(|_, req| AppError::NotFound(req.path().to_string()).into()),
        )
        .wrap(SessionAuth::new(sessions))
        .wrap(TracingLogger::default())
        .route("/metrics", web::get().to(metrics::serve_metrics))
        .route("/health", web::get().to(health::liveness))
        .route("/health/ready", web::get().to(health::readiness))
        .service(
            web::resource("/")
                .wrap(index_cache)
                .route(web::get().to(posts::index)),
        )
        .route("/follow/", web::get().to(posts::follow_index))
        .route("/group/{slug}/", web::get().to(posts::group_posts))
        .route("/profile/{username}/", web::get().to(posts::profile))
        .route(
            "/profile/{username}/follow/",
            web::get().to(posts::profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            web::get().to(posts::profile_unfollow),
        )
        .service(
            web::resource("/create/")
                .route(web::get().to(posts::post_create_form))
                .route(web::post().to(posts::post_create)),
        )
        .service(
            web::resource("/posts/{post_id}/")
                .route(web::get().to(posts::post_detail))
                .route(web::post().to(posts::post_detail)),
        )
        .service(
            web::resource("/posts/{post_id}/edit/")
                .route(web::get().to(posts::post_edit_form))
                .route(web::post().to(posts::post_edit)),
        )
        .service(
            web::resource("/posts/{post_id}/comment/")
                .route(web::get().to(posts::add_comment))
                .route(web::post().to(posts::add_comment)),
        )
        .service(
            web::scope("/auth")
                .service(
                    web::resource("/signup/")
                        .route(web::get().to(auth::signup_form))
                        .route(web::post().to(auth::signup)),
                )
                .service(
                    web::resource("/login/")
                        .route(web::get().to(auth::login_form))
                        .route(web::post().to(auth::login)),
                )
                .service(
                    web::resource("/logout/")
                        .route(web::get().to(auth::logout))
                        .route(web::post().to(auth::logout)),
                )
                .service(
                    web::resource("/password_change/")
                        .route(web::get().to(auth::password_change_form))
                        .route(web::post().to(auth::password_change)),
                )
                .route(
                    "/password_change/done/",
                    web::get().to(auth::password_change_done),
                )
                .service(
                    web::resource("/password_reset/")
                        .route(web::get().to(auth::password_reset_form))
                        .route(web::post().to(auth::password_reset)),
                )
                .route(
                    "/password_reset/done/",
                    web::get().to(auth::password_reset_done),
                )
                .route("/reset/done/", web::get().to(auth::password_reset_complete))
                .service(
                    web::resource("/reset/{uid}/{token}/")
                        .route(web::get().to(auth::password_reset_confirm_form))
                        .route(web::post().to(auth::password_reset_confirm)),
                ),
        )
        .service(
            web::scope("/about")
                .route("/author/", web::get().to(about::author))
                .route("/tech/", web::get().to(about::tech)),
        )
        .route("/media/posts/{file_name}", web::get().to(media::post_image))
        .default_service(web::to(handlers::not_found))
}
