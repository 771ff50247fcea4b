use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::CacheTier;
use crate::error::StoreError;
use crate::metrics::track_store_operation;

/// Shared cache level backed by Redis string keys with an expiry.
#[derive(Clone)]
pub struct RedisCacheTier {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisCacheTier {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            prefix: "ecg:".to_string(),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheTier for RedisCacheTier {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        track_store_operation("get", "redis", async move {
            Ok(redis::cmd("GET")
                .arg(&key)
                .query_async::<Option<String>>(&mut conn)
                .await?)
        })
        .await
    }

    async fn store(&self, key: &str, payload: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        track_store_operation("setex", "redis", async move {
            redis::cmd("SETEX")
                .arg(&key)
                .arg(ttl_seconds.max(1))
                .arg(payload)
                .query_async::<()>(&mut conn)
                .await?;
            Ok(())
        })
        .await
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        track_store_operation("del", "redis", async move {
            redis::cmd("DEL")
                .arg(&key)
                .query_async::<()>(&mut conn)
                .await?;
            Ok(())
        })
        .await
    }
}
