mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use blog_service::build_app;
use blog_service::db::BlogRepository;
use common::{body_text, TestEnv};
use page_cache::PageStore;

#[actix_web::test]
async fn test_index_is_served_from_cache_within_window() {
    let env = TestEnv::new();
    let author = env.user("auth").await;
    let post = env.post(&author, None, "Кешированный пост").await;
    let app = test::init_service(build_app(env.state.clone())).await;

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("cache-control").unwrap(), "max-age=20");
    let first = test::read_body(resp).await;
    assert!(String::from_utf8_lossy(&first).contains("Кешированный пост"));

    assert!(env.repo.delete_post(post.id).await.unwrap());

    let req = test::TestRequest::get().uri("/").to_request();
    let second = test::read_body(test::call_service(&app, req).await).await;
    assert_eq!(first, second);

    env.pages.clear().await.unwrap();

    let req = test::TestRequest::get().uri("/").to_request();
    let third = body_text(test::call_service(&app, req).await).await;
    assert!(!third.contains("Кешированный пост"));
}

#[actix_web::test]
async fn test_cache_varies_on_session_and_query() {
    let env = TestEnv::new();
    let author = env.user("auth").await;
    env.post(&author, None, "Первый пост").await;
    let app = test::init_service(build_app(env.state.clone())).await;

    let req = test::TestRequest::get().uri("/").to_request();
    let anonymous = body_text(test::call_service(&app, req).await).await;
    assert!(anonymous.contains("/auth/login/"));

    let req = test::TestRequest::get()
        .uri("/")
        .cookie(env.session_cookie(&author))
        .to_request();
    let logged_in = body_text(test::call_service(&app, req).await).await;
    assert!(logged_in.contains("/auth/logout/"));
    assert!(!logged_in.contains("href=\"/auth/login/\""));

    env.post(&author, None, "Второй пост").await;
    let req = test::TestRequest::get().uri("/?page=1").to_request();
    let other_query = body_text(test::call_service(&app, req).await).await;
    assert!(other_query.contains("Второй пост"));
}

#[actix_web::test]
async fn test_other_listings_are_not_cached() {
    let env = TestEnv::new();
    let author = env.user("auth").await;
    let post = env.post(&author, None, "Свежий пост").await;
    let app = test::init_service(build_app(env.state.clone())).await;

    let req = test::TestRequest::get().uri("/profile/auth/").to_request();
    assert!(body_text(test::call_service(&app, req).await)
        .await
        .contains("Свежий пост"));

    env.repo.delete_post(post.id).await.unwrap();

    let req = test::TestRequest::get().uri("/profile/auth/").to_request();
    assert!(!body_text(test::call_service(&app, req).await)
        .await
        .contains("Свежий пост"));
}
