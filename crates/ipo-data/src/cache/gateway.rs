//! 캐시 게이트웨이.
//!
//! 백엔드 오류는 모두 이 경계에서 잡아 miss로 처리합니다. 캐시가 없거나
//! 사용할 수 없어도 파이프라인은 no-cache 모드로 계속 동작합니다.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::DatasetCache;

/// 캐시 통계.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// 백엔드/직렬화 오류 수
    pub errors: u64,
    pub hit_rate: f64,
}

/// 데이터셋 캐시 진입점.
pub struct CacheGateway {
    backend: Option<Arc<dyn DatasetCache>>,
    ttl_secs: u64,
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

impl CacheGateway {
    pub fn new(backend: Arc<dyn DatasetCache>, ttl_secs: u64) -> Self {
        Self::with_backend(Some(backend), ttl_secs)
    }

    /// 캐시 없음 (no-cache 모드).
    pub fn disabled() -> Self {
        Self::with_backend(None, 0)
    }

    pub fn with_backend(backend: Option<Arc<dyn DatasetCache>>, ttl_secs: u64) -> Self {
        Self {
            backend,
            ttl_secs,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// 캐시된 값을 조회합니다.
    ///
    /// miss, 백엔드 오류, 역직렬화 실패는 모두 `None`입니다.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let backend = self.backend.as_ref()?;

        let payload = match backend.get(key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = key, backend = backend.backend(), "캐시 miss");
                return None;
            }
            Err(e) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = key, backend = backend.backend(), error = %e, "캐시 조회 실패, no-cache로 진행");
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = key, backend = backend.backend(), "캐시 hit");
                Some(value)
            }
            Err(e) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = key, error = %e, "캐시 payload 역직렬화 실패, miss로 처리");
                None
            }
        }
    }

    /// 값을 저장합니다. 저장 여부를 반환합니다.
    pub async fn store<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = key, error = %e, "캐시 payload 직렬화 실패");
                return false;
            }
        };

        match backend.set(key, &payload, self.ttl_secs).await {
            Ok(()) => true,
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = key, backend = backend.backend(), error = %e, "캐시 저장 실패");
                false
            }
        }
    }

    /// 백엔드 연결 종료.
    pub async fn close(&self) {
        if let Some(backend) = &self.backend {
            backend.close().await;
        }
    }

    /// 캐시 통계를 반환합니다.
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            hits,
            misses,
            errors: self.errors.load(Ordering::Relaxed),
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}
