//! # IPO Data
//!
//! IPO 상장 정보 수집 파이프라인.
//!
//! ## 구성
//! - `provider`: 외부 소스 어댑터 (IPOAlerts, Chittorgarh, Moneycontrol, GMP RSS, NSE/Yahoo 시세)
//! - `normalize`: 이름 정규화 및 매칭 정책
//! - `reconcile`: 소스 간 레코드 병합
//! - `classify`: 상태 분류 및 버킷화
//! - `enrich`: 상장 후 수익률 계산
//! - `cache`: 데이터셋 캐시 (Redis / 메모리)
//! - `storage`: 회사 상세 정보 저장소 (PostgreSQL / 메모리)
//! - `pipeline`: 위 단계를 묶는 Orchestrator

pub mod cache;
pub mod classify;
pub mod enrich;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod provider;
pub mod reconcile;
pub mod stats;
pub mod storage;

pub use cache::{CacheGateway, CacheStats, DatasetCache, MemoryCache, RedisCache};
pub use classify::{classify, classify_status};
pub use enrich::{parse_listing_date, Enricher};
pub use error::{DataError, PipelineError, Result, SourceError};
pub use normalize::{normalize, same_entity, signal_matches, MatchPolicy};
pub use pipeline::{build_price_source, DatasetPlan, FetchMode, ListingPipeline};
pub use provider::{
    build_http_client, FallbackPriceSource, GmpFeedSource, HtmlTableSource, IpoAlertsSource,
    ListingSource, NseHistoricalSource, PriceHistorySource, SourceResult, YahooPriceSource,
};
pub use reconcile::{reconcile, ReconcileReport, ReconciledListing, Reconciliation};
pub use stats::PipelineStats;
pub use storage::{DetailStore, MemoryDetailStore, PgDetailStore};
