/// HTTP middleware for blog-service
///
/// - `SessionAuth`: resolves the `sessionid` cookie into a `SessionUser`
/// - `CachePage`: time-bounded full-response cache for a route
pub mod cache_page;
pub mod session;

pub use cache_page::CachePage;
pub use session::{CurrentUser, LoginRequired, SessionAuth, SessionUser};
