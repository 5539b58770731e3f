//! 데이터셋 캐시.
//!
//! 파이프라인 전체 결과를 논리적 데이터셋 키(`ipos`)로 캐시합니다.
//!
//! - [`RedisCache`]: 단일 `MultiplexedConnection`을 재사용하는 Redis 백엔드
//! - [`MemoryCache`]: 프로세스 내 만료 시각 기반 맵
//! - [`CacheGateway`]: 백엔드 부재/오류를 no-cache 모드로 degrade 하는 진입점

pub mod gateway;
pub mod memory;
pub mod redis;

pub use gateway::{CacheGateway, CacheStats};
pub use memory::MemoryCache;
pub use self::redis::RedisCache;

use async_trait::async_trait;

use crate::error::Result;

/// 문자열 payload 캐시 백엔드.
#[async_trait]
pub trait DatasetCache: Send + Sync {
    /// 백엔드 이름 (로그용).
    fn backend(&self) -> &'static str;

    /// 만료되지 않은 payload 조회.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// payload 저장. 기존 값은 통째로 교체됩니다.
    async fn set(&self, key: &str, payload: &str, ttl_secs: u64) -> Result<()>;

    /// 연결 종료. 이후 호출은 오류를 반환할 수 있습니다.
    async fn close(&self) {}
}
