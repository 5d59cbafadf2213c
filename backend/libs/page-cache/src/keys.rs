//! Page cache key schema
//!
//! Key format: v{VERSION}:page:{prefix}:{method}:{path_and_query}:{variant}

/// Cache schema version - increment when changing key formats
pub const CACHE_VERSION: u32 = 1;

/// Namespace shared by every page key, used for bulk invalidation.
pub fn namespace() -> String {
    format!("v{}:page:", CACHE_VERSION)
}

/// Builder for full-response cache keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageKey {
    prefix: String,
    method: String,
    path_and_query: String,
    variant: String,
}

impl PageKey {
    pub fn new(prefix: &str, method: &str, path_and_query: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            method: method.to_ascii_uppercase(),
            path_and_query: path_and_query.to_string(),
            variant: "anon".to_string(),
        }
    }

    /// Responses that differ per viewer are stored under separate variants.
    pub fn vary_on(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    pub fn build(&self) -> String {
        format!(
            "{}{}:{}:{}:{}",
            namespace(),
            self.prefix,
            self.method,
            self.path_and_query,
            self.variant
        )
    }
}
