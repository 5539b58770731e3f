//! 실행 컨텍스트: 캐시/저장소 연결과 파이프라인 구성.

use anyhow::Context as _;
use ipo_core::AppConfig;
use ipo_data::{
    CacheGateway, DatasetCache, DetailStore, ListingPipeline, MemoryCache, PgDetailStore,
    RedisCache,
};
use std::sync::Arc;
use tracing::{info, warn};

/// 명령 실행에 필요한 자원 묶음.
pub struct AppContext {
    pub pipeline: ListingPipeline,
    pg_store: Option<PgDetailStore>,
}

impl AppContext {
    /// 설정에 따라 캐시와 저장소를 연결하고 파이프라인을 구성합니다.
    ///
    /// Redis 연결 실패는 메모리 캐시로, DB 연결 실패는 저장소 없음으로 degrade 합니다.
    pub async fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let cache = Self::connect_cache(config).await;

        let pg_store = match &config.database.url {
            Some(url) => match PgDetailStore::connect(url, &config.database).await {
                Ok(store) => match store.ensure_schema().await {
                    Ok(()) => Some(store),
                    Err(e) => {
                        warn!(error = %e, "ipo_details 스키마 생성 실패, 상세 저장소 비활성화");
                        None
                    }
                },
                Err(e) => {
                    warn!(error = %e, "데이터베이스 연결 실패, 상세 저장소 비활성화");
                    None
                }
            },
            None => None,
        };

        let detail_store = pg_store
            .clone()
            .map(|store| Arc::new(store) as Arc<dyn DetailStore>);

        let pipeline = ListingPipeline::from_config(config, cache, detail_store)
            .context("파이프라인 구성 실패")?;

        Ok(Self { pipeline, pg_store })
    }

    async fn connect_cache(config: &AppConfig) -> CacheGateway {
        if config.cache.disabled {
            info!("캐시 비활성화");
            return CacheGateway::disabled();
        }

        let backend: Arc<dyn DatasetCache> = match &config.cache.redis_url {
            Some(url) => match RedisCache::connect(url).await {
                Ok(redis) => Arc::new(redis),
                Err(e) => {
                    warn!(error = %e, "Redis 연결 실패, 메모리 캐시 사용");
                    Arc::new(MemoryCache::new())
                }
            },
            None => Arc::new(MemoryCache::new()),
        };

        info!(backend = backend.backend(), ttl_secs = config.cache.ttl_secs, "캐시 준비");
        CacheGateway::new(backend, config.cache.ttl_secs)
    }

    /// 상세 저장소 (설정된 경우).
    pub fn detail_store(&self) -> Option<&Arc<dyn DetailStore>> {
        self.pipeline.detail_store()
    }

    /// 연결 종료.
    pub async fn shutdown(&self) {
        self.pipeline.cache().close().await;
        if let Some(store) = &self.pg_store {
            store.close().await;
        }
    }
}
