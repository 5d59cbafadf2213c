mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use blog_service::build_app;
use common::{body_text, location, TestEnv};

#[actix_web::test]
async fn test_public_pages_are_available_to_anyone() {
    let env = TestEnv::new();
    let author = env.user("auth").await;
    let group = env.group("test_slug").await;
    let post = env.post(&author, Some(&group), "Тестовый пост").await;
    let app = test::init_service(build_app(env.state.clone())).await;

    let detail = format!("/posts/{}/", post.id);
    for uri in [
        "/",
        "/group/test_slug/",
        "/profile/auth/",
        detail.as_str(),
        "/about/author/",
        "/about/tech/",
        "/auth/signup/",
        "/auth/login/",
        "/auth/password_reset/",
        "/auth/password_reset/done/",
        "/auth/reset/done/",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", uri);
    }
}

#[actix_web::test]
async fn test_unknown_page_renders_custom_404() {
    let env = TestEnv::new();
    let app = test::init_service(build_app(env.state.clone())).await;

    let req = test::TestRequest::get().uri("/unexisting_page/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_text(resp).await.contains("Custom 404"));
}

#[actix_web::test]
async fn test_missing_objects_are_404() {
    let env = TestEnv::new();
    let app = test::init_service(build_app(env.state.clone())).await;

    for uri in [
        "/group/nope/",
        "/profile/nobody/",
        "/posts/999/",
        "/posts/not-a-number/",
        "/media/posts/missing.png",
        "/media/posts/..%2Fsecret",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "GET {}", uri);
    }
}

#[actix_web::test]
async fn test_login_required_pages_redirect_anonymous() {
    let env = TestEnv::new();
    let author = env.user("auth").await;
    let post = env.post(&author, None, "Тестовый пост").await;
    let app = test::init_service(build_app(env.state.clone())).await;

    let edit = format!("/posts/{}/edit/", post.id);
    let comment = format!("/posts/{}/comment/", post.id);
    for uri in [
        "/create/",
        "/follow/",
        edit.as_str(),
        comment.as_str(),
        "/profile/auth/follow/",
        "/profile/auth/unfollow/",
        "/auth/password_change/",
        "/auth/password_change/done/",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "GET {}", uri);
        assert_eq!(location(&resp), format!("/auth/login/?next={}", uri));
    }
}

#[actix_web::test]
async fn test_private_pages_open_for_logged_in_user() {
    let env = TestEnv::new();
    let author = env.user("auth").await;
    let post = env.post(&author, None, "Тестовый пост").await;
    let app = test::init_service(build_app(env.state.clone())).await;

    let edit = format!("/posts/{}/edit/", post.id);
    for uri in [
        "/create/",
        "/follow/",
        edit.as_str(),
        "/auth/password_change/",
        "/auth/password_change/done/",
    ] {
        let req = test::TestRequest::get()
            .uri(uri)
            .cookie(env.session_cookie(&author))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", uri);
    }
}

#[actix_web::test]
async fn test_health_endpoints() {
    let env = TestEnv::new();
    let app = test::init_service(build_app(env.state.clone())).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["alive"], true);

    let req = test::TestRequest::get().uri("/health/ready").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["ready"], true);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["repository"]["status"], "healthy");
    assert_eq!(body["checks"]["page_cache"]["status"], "healthy");
}

#[actix_web::test]
async fn test_metrics_exposes_blog_collectors() {
    let env = TestEnv::new();
    let reader = env.user("reader").await;
    env.user("auth").await;
    let app = test::init_service(build_app(env.state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/profile/auth/follow/")
        .cookie(env.session_cookie(&reader))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("blog_follow_events_total"));
}
