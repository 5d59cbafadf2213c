//! Credentials and signed tokens
//!
//! - `password`: Argon2id hashing and the account password policy
//! - `session`: HS256 session tokens carried in the `sessionid` cookie
//! - `reset`: single-use password reset tokens

pub mod password;
pub mod reset;
pub mod session;

pub use password::{hash_password, validate_password, verify_password};
pub use reset::ResetTokens;
pub use session::{SessionClaims, SessionKeys, SESSION_COOKIE};
