//! Full-response cache for a route
//!
//! `GET` responses with status 200 are stored for a fixed TTL under a key built from
//! the prefix, the path with query string, and the visitor's session identity.
//! Within the window the stored bytes are replayed as-is. Store failures degrade to
//! an uncached render.

use crate::middleware::SessionUser;
use actix_web::body::{to_bytes, BoxBody, MessageBody};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use actix_web::http::{Method, StatusCode};
use actix_web::{Error, HttpMessage, HttpResponse};
use futures_util::future::LocalBoxFuture;
use page_cache::{CacheMetrics, CachedPage, PageKey, PageStore};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Middleware factory; wrap a resource with it.
#[derive(Clone)]
pub struct CachePage {
    store: Arc<dyn PageStore>,
    prefix: String,
    ttl: Duration,
}

impl CachePage {
    pub fn new(store: Arc<dyn PageStore>, prefix: &str, ttl: Duration) -> Self {
        Self {
            store,
            prefix: prefix.to_string(),
            ttl,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CachePage
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = CachePageService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CachePageService {
            service: Rc::new(service),
            store: self.store.clone(),
            prefix: Rc::from(self.prefix.as_str()),
            ttl: self.ttl,
            metrics: CacheMetrics::new(&self.prefix),
        }))
    }
}

pub struct CachePageService<S> {
    service: Rc<S>,
    store: Arc<dyn PageStore>,
    prefix: Rc<str>,
    ttl: Duration,
    metrics: CacheMetrics,
}

fn cache_control(ttl: Duration) -> HeaderValue {
    HeaderValue::from_str(&format!("max-age={}", ttl.as_secs()))
        .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
}

impl<S, B> Service<ServiceRequest> for CachePageService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        if req.method() != Method::GET {
            return Box::pin(async move { Ok(service.call(req).await?.map_into_boxed_body()) });
        }

        let variant = req
            .extensions()
            .get::<SessionUser>()
            .map(|u| format!("user:{}", u.id))
            .unwrap_or_else(|| "anon".to_string());
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());
        let key = PageKey::new(&self.prefix, "GET", &path_and_query)
            .vary_on(variant)
            .build();

        let store = self.store.clone();
        let ttl = self.ttl;
        let metrics = self.metrics.clone();

        Box::pin(async move {
            match store.get(&key).await {
                Ok(Some(page)) => {
                    metrics.record_hit();
                    debug!(key = %key, "Page cache hit");
                    let mut builder = HttpResponse::Ok();
                    if let Some(content_type) = page.content_type {
                        builder.content_type(content_type);
                    }
                    builder.insert_header((CACHE_CONTROL, cache_control(ttl)));
                    return Ok(req.into_response(builder.body(page.body)));
                }
                Ok(None) => {
                    metrics.record_miss();
                    debug!(key = %key, "Page cache miss");
                }
                Err(e) => {
                    metrics.record_error();
                    warn!(key = %key, error = %e, "Page cache read failed; rendering uncached");
                }
            }

            let res = service.call(req).await?;
            if res.status() != StatusCode::OK {
                return Ok(res.map_into_boxed_body());
            }

            let (req, response) = res.into_parts();
            let (mut response, body) = response.into_parts();
            let bytes = to_bytes(body).await.map_err(|_| {
                actix_web::error::ErrorInternalServerError("failed to buffer response body")
            })?;

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let page = CachedPage::new(content_type, bytes.to_vec());
            match store.set(&key, &page, ttl).await {
                Ok(()) => metrics.record_write(),
                Err(e) => {
                    metrics.record_error();
                    warn!(key = %key, error = %e, "Page cache write failed");
                }
            }

            response
                .headers_mut()
                .insert(CACHE_CONTROL, cache_control(ttl));
            let response = response.set_body(BoxBody::new(bytes));
            Ok(ServiceResponse::new(req, response))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};
    use page_cache::MemoryPageStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    async fn counted(counter: web::Data<Counter>) -> HttpResponse {
        let n = counter.0.fetch_add(1, Ordering::SeqCst);
        HttpResponse::Ok()
            .content_type("text/plain")
            .body(format!("render {}", n))
    }

    async fn missing() -> HttpResponse {
        HttpResponse::NotFound().body("missing")
    }

    #[actix_web::test]
    async fn test_response_is_replayed_within_ttl() {
        let store: Arc<dyn PageStore> = Arc::new(MemoryPageStore::new());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Counter(AtomicUsize::new(0))))
                .service(
                    web::resource("/")
                        .wrap(CachePage::new(store.clone(), "test_page", Duration::from_secs(20)))
                        .route(web::get().to(counted)),
                ),
        )
        .await;

        let first = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
        let second = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(first, "render 0");
        assert_eq!(first, second);

        let other_page = test::call_and_read_body(
            &app,
            test::TestRequest::get().uri("/?page=2").to_request(),
        )
        .await;
        assert_eq!(other_page, "render 1");

        store.clear().await.unwrap();
        let fresh = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(fresh, "render 2");
    }

    #[actix_web::test]
    async fn test_cached_response_keeps_headers() {
        let store: Arc<dyn PageStore> = Arc::new(MemoryPageStore::new());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Counter(AtomicUsize::new(0))))
                .service(
                    web::resource("/")
                        .wrap(CachePage::new(store, "test_page", Duration::from_secs(20)))
                        .route(web::get().to(counted)),
                ),
        )
        .await;

        test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(resp.headers().get(CACHE_CONTROL).unwrap(), "max-age=20");
    }

    #[actix_web::test]
    async fn test_non_ok_responses_are_not_stored() {
        let store = Arc::new(MemoryPageStore::new());
        let app = test::init_service(
            App::new().service(
                web::resource("/gone")
                    .wrap(CachePage::new(store.clone(), "test_page", Duration::from_secs(20)))
                    .route(web::get().to(missing)),
            ),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/gone").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(store.is_empty());
    }
}
