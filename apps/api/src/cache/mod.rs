//! Cache gateway: a key → serialized-value store with TTLs.
//!
//! Used as a read-through cache of each user's assessment list. Every write to
//! a user's assessments deletes that user's entry.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisError};
use tracing::info;

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, RedisError>;
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), RedisError>;
    async fn del(&self, key: &str) -> Result<(), RedisError>;
}

/// Cache key holding the assessment list of one identity-provider subject.
pub fn assessments_key(subject: &str) -> String {
    format!("assessments:{subject}")
}

/// Redis-backed cache. The multiplexed connection is opened once and cloned per call.
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, RedisError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Redis connection established");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, RedisError> {
        let mut conn = self.conn.clone();
        conn.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), RedisError> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl_secs).await
    }

    async fn del(&self, key: &str) -> Result<(), RedisError> {
        let mut conn = self.conn.clone();
        conn.del(key).await
    }
}
