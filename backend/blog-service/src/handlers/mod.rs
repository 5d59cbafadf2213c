//! HTTP handlers
//!
//! - `posts`: listings, detail, create/edit, comments, follows
//! - `auth`: signup, login/logout, password change and reset
//! - `about`: static pages
//! - `media`: uploaded images
//! - `health`: liveness and readiness

pub mod about;
pub mod auth;
pub mod health;
pub mod media;
pub mod posts;

use crate::error::Result;
use crate::templates::NotFoundTemplate;
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{FromRequest, HttpMessage, HttpRequest, HttpResponse};
use askama::Template;
use std::future::{ready, Ready};

/// `?page=` value shared by every paginated listing.
///
/// Read straight from the query string so that a repeated or malformed parameter
/// never rejects the request; the last `page` wins.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn from_query_string(query: &str) -> Self {
        let page = query
            .split('&')
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .filter(|(key, _)| *key == "page")
            .map(|(_, value)| {
                let value = value.replace('+', " ");
                urlencoding::decode(&value)
                    .map(|v| v.into_owned())
                    .unwrap_or(value)
            })
            .last();
        Self { page }
    }

    pub fn requested(&self) -> Option<&str> {
        self.page.as_deref()
    }
}

impl FromRequest for PageQuery {
    type Error = actix_web::Error;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(PageQuery::from_query_string(req.query_string())))
    }
}

/// Render a template into a 200 HTML response.
pub(crate) fn render<T: Template>(template: &T) -> Result<HttpResponse> {
    let body = template.render()?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.to_string()))
        .finish()
}

/// Default service: any unmatched route.
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse> {
    let mut template = NotFoundTemplate::new(req.path().to_string());
    template.user = req
        .extensions()
        .get::<crate::middleware::SessionUser>()
        .cloned();
    let body = template.render()?;
    Ok(HttpResponse::NotFound()
        .content_type("text/html; charset=utf-8")
        .body(body))
}
