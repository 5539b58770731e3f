//! 프로세스 내 메모리 캐시.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::DatasetCache;
use crate::error::Result;

struct Entry {
    payload: String,
    expires_at: Instant,
}

/// 만료 시각을 가진 메모리 캐시.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 만료된 항목 제거. 제거된 수를 반환합니다.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}

#[async_trait]
impl DatasetCache for MemoryCache {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.payload.clone()))
    }

    async fn set(&self, key: &str, payload: &str, ttl_secs: u64) -> Result<()> {
        let entry = Entry {
            payload: payload.to_string(),
            expires_at: Instant::now() + Duration::from_secs(ttl_secs),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }
}
