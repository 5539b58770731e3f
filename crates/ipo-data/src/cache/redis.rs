//! Redis 캐시 백엔드.
//!
//! 프로세스당 한 번 `connect`로 연결을 열고 모든 요청에서 재사용합니다.
//! 종료 시 `close`로 명시적으로 연결을 해제합니다.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::DatasetCache;
use crate::error::{DataError, Result};

/// Redis 연결 래퍼.
#[derive(Clone)]
pub struct RedisCache {
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
}

impl RedisCache {
    /// 새로운 Redis 연결을 생성합니다.
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Redis 연결 중...");

        let client = Client::open(url).map_err(|e| DataError::CacheError(e.to_string()))?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| DataError::CacheError(e.to_string()))?;

        info!("Redis 연결 완료");

        Ok(Self {
            connection: Arc::new(RwLock::new(Some(connection))),
        })
    }

    /// 공유 연결의 핸들을 가져옵니다 (multiplexed 연결은 clone이 저렴함).
    async fn connection(&self) -> Result<MultiplexedConnection> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or_else(|| DataError::CacheError("Redis 연결이 종료됨".to_string()))
    }

    /// Redis 상태를 확인합니다.
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection().await?;
        let result: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| DataError::CacheError(e.to_string()))?;

        Ok(result == "PONG")
    }

    /// 캐시에서 키를 삭제합니다.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let deleted: i64 = conn
            .del(key)
            .await
            .map_err(|e| DataError::CacheError(e.to_string()))?;

        Ok(deleted > 0)
    }

    /// 연결이 열려 있는지 확인합니다.
    pub async fn is_open(&self) -> bool {
        self.connection.read().await.is_some()
    }
}

#[async_trait]
impl DatasetCache for RedisCache {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| DataError::CacheError(e.to_string()))?;

        Ok(value)
    }

    async fn set(&self, key: &str, payload: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .set_ex(key, payload, ttl_secs)
            .await
            .map_err(|e| DataError::CacheError(e.to_string()))?;

        debug!(key = key, ttl_secs, bytes = payload.len(), "Redis 저장");
        Ok(())
    }

    async fn close(&self) {
        if self.connection.write().await.take().is_some() {
            info!("Redis 연결 종료");
        }
    }
}
