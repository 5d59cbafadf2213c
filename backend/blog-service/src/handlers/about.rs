/// Static "about" pages
use super::render;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::templates::{AboutAuthorTemplate, AboutTechTemplate};
use actix_web::HttpResponse;

pub async fn author(user: CurrentUser) -> Result<HttpResponse> {
    render(&AboutAuthorTemplate { user: user.0 })
}

pub async fn tech(user: CurrentUser) -> Result<HttpResponse> {
    render(&AboutTechTemplate { user: user.0 })
}
