//! Redis connection used for request rate limiting.

use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};

use crate::config::{Config, CACHE_PREFIX_RATE_LIMIT};
use crate::errors::{AppError, AppResult};

/// Outcome of one rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// Requests counted in the current window, this one included
    pub count: u64,
    pub limit: u64,
    /// Seconds until the window resets
    pub reset_in: u64,
}

impl RateLimitStatus {
    pub fn allowed(&self) -> bool {
        self.count <= self.limit
    }

    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }
}

/// Redis cache wrapper with connection pooling.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
}

impl Cache {
    /// Connect to Redis, returning an error instead of panicking.
    pub async fn try_connect(config: &Config) -> Result<Self, RedisError> {
        let client = Client::open(config.redis_url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis cache connected");
        Ok(Self { connection })
    }

    /// Round-trip check used by `/health`.
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }

    /// Count one request against a fixed window.
    ///
    /// The counter is created by `INCR`; the request that observes 1 attaches
    /// the window expiry.
    pub async fn check_rate_limit(
        &self,
        scope: &str,
        identifier: &str,
        limit: u64,
        window_seconds: u64,
    ) -> AppResult<RateLimitStatus> {
        let key = rate_limit_key(scope, identifier);
        let mut conn = self.connection.clone();

        let count: i64 = conn.incr(&key, 1).await.map_err(cache_error)?;
        if count == 1 {
            let _: bool = conn
                .expire(&key, window_seconds as i64)
                .await
                .map_err(cache_error)?;
        }

        let ttl: i64 = conn.ttl(&key).await.map_err(cache_error)?;
        if ttl < 0 {
            // Counter without expiry: INCR succeeded but EXPIRE did not.
            let _: bool = conn
                .expire(&key, window_seconds as i64)
                .await
                .map_err(cache_error)?;
        }

        Ok(RateLimitStatus {
            count: count.max(0) as u64,
            limit,
            reset_in: if ttl > 0 { ttl as u64 } else { window_seconds },
        })
    }
}

fn rate_limit_key(scope: &str, identifier: &str) -> String {
    format!("{}{}:{}", CACHE_PREFIX_RATE_LIMIT, scope, identifier)
}

/// Convert Redis error to AppError.
fn cache_error(e: RedisError) -> AppError {
    tracing::error!("Redis error: {}", e);
    AppError::internal(format!("Cache error: {}", e))
}
