use crate::keys::namespace;
use crate::{CacheError, CacheResult, CachedPage, PageStore};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Pipeline};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const FIELD_BODY: &str = "body";
const FIELD_CONTENT_TYPE: &str = "content_type";

/// Redis-backed page store shared by every worker and replica.
#[derive(Clone)]
pub struct RedisPageStore {
    redis: ConnectionManager,
}

impl RedisPageStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Open a connection manager for `url`.
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager))
    }

    /// PING round-trip, used by readiness checks.
    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.redis.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::InvalidData(format!("unexpected PING reply: {pong}")))
        }
    }
}

#[async_trait::async_trait]
impl PageStore for RedisPageStore {
    async fn get(&self, key: &str) -> CacheResult<Option<CachedPage>> {
        let mut conn = self.redis.clone();
        let mut fields: HashMap<String, Vec<u8>> = conn.hgetall(key).await?;

        let Some(body) = fields.remove(FIELD_BODY) else {
            return Ok(None);
        };
        let content_type = match fields.remove(FIELD_CONTENT_TYPE) {
            Some(raw) if !raw.is_empty() => Some(
                String::from_utf8(raw)
                    .map_err(|e| CacheError::InvalidData(format!("content type: {e}")))?,
            ),
            _ => None,
        };

        Ok(Some(CachedPage { content_type, body }))
    }

    async fn set(&self, key: &str, page: &CachedPage, ttl: Duration) -> CacheResult<()> {
        let content_type = page.content_type.clone().unwrap_or_default().into_bytes();
        // EXPIRE takes whole seconds; never let a sub-second TTL become "no expiry".
        let ttl_secs = ttl.as_secs().max(1) as i64;

        let mut conn = self.redis.clone();
        let mut pipe = Pipeline::new();
        pipe.atomic()
            .del(key)
            .ignore()
            .hset_multiple(
                key,
                &[
                    (FIELD_BODY, page.body.as_slice()),
                    (FIELD_CONTENT_TYPE, content_type.as_slice()),
                ],
            )
            .ignore()
            .expire(key, ttl_secs)
            .ignore();
        pipe.query_async::<_, ()>(&mut conn).await?;

        debug!(key = %key, ttl_secs, "Page cache set");
        Ok(())
    }

    async fn clear(&self) -> CacheResult<usize> {
        let mut conn = self.redis.clone();
        let pattern = format!("{}*", namespace());
        let mut cursor: u64 = 0;
        let mut total_deleted = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let mut pipe = Pipeline::new();
                for key in &keys {
                    pipe.del(key).ignore();
                }
                pipe.query_async::<_, ()>(&mut conn).await?;
                total_deleted += keys.len();
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = %pattern, deleted = total_deleted, "Page cache scan delete");
        Ok(total_deleted)
    }
}
