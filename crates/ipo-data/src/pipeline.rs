//! 수집 파이프라인 (Orchestrator).
//!
//! ```text
//! fetch_listings
//!   ├─ CacheGateway::load ──hit──▶ 응답
//!   └─ miss ─▶ 키별 lock ─▶ 재확인 ─▶ 소스 호출 ─▶ reconcile ─▶ classify ─▶ enrich ─▶ store
//! ```
//!
//! 데이터셋마다 [`DatasetPlan`]이 주 소스의 호출 방식(tiered / fan-out)과
//! 보조 소스를 정의합니다. 보조 소스는 항상 주 소스와 동시에 호출됩니다.

use futures::future::join_all;
use ipo_core::{AppConfig, ListingDetail, ListingsResponse, SourcesConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::CacheGateway;
use crate::classify::classify;
use crate::enrich::Enricher;
use crate::error::{PipelineError, SourceError};
use crate::normalize::normalize;
use crate::provider::{
    build_http_client, run_source, FallbackPriceSource, GmpFeedSource, HtmlTableSource,
    IpoAlertsSource, ListingSource, NseHistoricalSource, PriceHistorySource, SourceResult,
    YahooPriceSource,
};
use crate::reconcile::reconcile;
use crate::stats::PipelineStats;
use crate::storage::DetailStore;

/// 키별 재계산 lock 맵.
type FetchLockMap = RwLock<HashMap<String, Arc<RwLock<()>>>>;

/// 주 소스 호출 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// 우선순위 순서로 시도, 첫 번째 비어 있지 않은 성공에서 중단
    Tiered,
    /// 모두 동시에 호출 후 병합
    FanOut,
}

/// 데이터셋 수집 계획.
pub struct DatasetPlan {
    /// 캐시 키
    pub key: String,
    pub primary_mode: FetchMode,
    pub primary: Vec<Arc<dyn ListingSource>>,
    pub auxiliary: Vec<Arc<dyn ListingSource>>,
}

impl DatasetPlan {
    pub fn new(key: impl Into<String>, primary_mode: FetchMode) -> Self {
        Self {
            key: key.into(),
            primary_mode,
            primary: Vec::new(),
            auxiliary: Vec::new(),
        }
    }

    pub fn with_primary(mut self, source: Arc<dyn ListingSource>) -> Self {
        self.primary.push(source);
        self
    }

    pub fn with_auxiliary(mut self, source: Arc<dyn ListingSource>) -> Self {
        self.auxiliary.push(source);
        self
    }

    /// 기본 `ipos` 계획.
    ///
    /// ipo_alerts → chittorgarh → moneycontrol 순 tiered, GMP 피드는 설정된
    /// 경우에만 보조 소스로 추가합니다.
    pub fn ipos(
        key: impl Into<String>,
        config: &SourcesConfig,
        client: reqwest::Client,
    ) -> Self {
        let mut plan = Self::new(key, FetchMode::Tiered)
            .with_primary(Arc::new(IpoAlertsSource::new(
                client.clone(),
                &config.ipo_alerts_url,
                config.ipo_alerts_api_key.clone(),
            )))
            .with_primary(Arc::new(HtmlTableSource::chittorgarh(
                client.clone(),
                &config.chittorgarh_url,
            )))
            .with_primary(Arc::new(HtmlTableSource::moneycontrol(
                client.clone(),
                &config.moneycontrol_url,
            )));

        if let Some(url) = &config.gmp_feed_url {
            plan = plan.with_auxiliary(Arc::new(GmpFeedSource::new(client, url)));
        }

        plan
    }

    /// 모든 소스 (주 → 보조).
    pub fn sources(&self) -> impl Iterator<Item = &Arc<dyn ListingSource>> {
        self.primary.iter().chain(self.auxiliary.iter())
    }
}

/// 설정에 따른 시세 소스 구성 (NSE, 선택적으로 Yahoo fallback).
pub fn build_price_source(
    config: &SourcesConfig,
    client: reqwest::Client,
) -> Arc<dyn PriceHistorySource> {
    let mut sources: Vec<Arc<dyn PriceHistorySource>> =
        vec![Arc::new(NseHistoricalSource::new(client, &config.nse_base_url))];

    if config.enable_yahoo_fallback {
        match YahooPriceSource::new() {
            Ok(yahoo) => sources.push(Arc::new(yahoo)),
            Err(e) => warn!(error = %e, "Yahoo fallback 비활성화"),
        }
    }

    Arc::new(FallbackPriceSource::new(sources))
}

/// IPO 데이터셋 파이프라인.
pub struct ListingPipeline {
    plan: DatasetPlan,
    source_timeout: Duration,
    cache: CacheGateway,
    enricher: Option<Enricher>,
    detail_store: Option<Arc<dyn DetailStore>>,
    fetch_locks: FetchLockMap,
}

impl ListingPipeline {
    pub fn new(plan: DatasetPlan) -> Self {
        Self {
            plan,
            source_timeout: Duration::from_secs(10),
            cache: CacheGateway::disabled(),
            enricher: None,
            detail_store: None,
            fetch_locks: RwLock::new(HashMap::new()),
        }
    }

    /// 설정으로 기본 파이프라인을 구성합니다.
    ///
    /// 캐시와 상세 저장소는 호출자가 연결해서 주입합니다.
    pub fn from_config(
        config: &AppConfig,
        cache: CacheGateway,
        detail_store: Option<Arc<dyn DetailStore>>,
    ) -> Result<Self, SourceError> {
        let client = build_http_client(&config.sources)?;
        let plan = DatasetPlan::ipos(&config.cache.dataset_key, &config.sources, client.clone());
        let prices = build_price_source(&config.sources, client);

        let mut pipeline = Self::new(plan)
            .with_source_timeout(config.sources.timeout())
            .with_cache(cache)
            .with_enricher(Enricher::from_config(prices, &config.enrichment));
        pipeline.detail_store = detail_store;
        Ok(pipeline)
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn with_cache(mut self, cache: CacheGateway) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_detail_store(mut self, store: Arc<dyn DetailStore>) -> Self {
        self.detail_store = Some(store);
        self
    }

    pub fn plan(&self) -> &DatasetPlan {
        &self.plan
    }

    pub fn cache(&self) -> &CacheGateway {
        &self.cache
    }

    pub fn detail_store(&self) -> Option<&Arc<dyn DetailStore>> {
        self.detail_store.as_ref()
    }

    /// 데이터셋 조회 (캐시 우선).
    ///
    /// 모든 소스가 실패해도 오류가 아니라 `message`가 채워진 빈 응답을
    /// 반환합니다. 오류는 내부 불변식 위반일 때만 반환합니다.
    pub async fn fetch_listings(&self) -> Result<ListingsResponse, PipelineError> {
        let key = self.plan.key.as_str();

        if let Some(cached) = self.cache.load::<ListingsResponse>(key).await {
            return Ok(cached);
        }

        // 같은 키의 동시 miss는 하나만 재계산
        let lock = self.get_or_create_lock(key).await;
        let _guard = lock.write().await;

        if let Some(cached) = self.cache.load::<ListingsResponse>(key).await {
            debug!(dataset = key, "대기 중 다른 요청이 캐시를 채움");
            return Ok(cached);
        }

        self.recompute_and_store().await
    }

    /// 캐시를 무시하고 재계산 후 저장합니다 (데몬 갱신용).
    pub async fn refresh(&self) -> Result<ListingsResponse, PipelineError> {
        let lock = self.get_or_create_lock(&self.plan.key).await;
        let _guard = lock.write().await;
        self.recompute_and_store().await
    }

    /// 단건 조회.
    ///
    /// 표시 이름(대소문자 무시) 또는 정규화 키가 일치하는 레코드를
    /// upcoming → current → listed 순으로 찾습니다.
    pub async fn find_listing(&self, name: &str) -> Result<Option<ListingDetail>, PipelineError> {
        let response = self.fetch_listings().await?;

        let wanted = name.trim().to_lowercase();
        let key = normalize(name);
        let Some(listing) = response
            .iter()
            .find(|r| r.name.to_lowercase() == wanted || (!key.is_empty() && r.normalized_key == key))
            .cloned()
        else {
            return Ok(None);
        };

        let detail = match &self.detail_store {
            Some(store) => match store.get(&listing.name).await {
                Ok(detail) => detail,
                Err(e) => {
                    warn!(name = %listing.name, error = %e, "상세 정보 조회 실패");
                    None
                }
            },
            None => None,
        };

        Ok(Some(ListingDetail { listing, detail }))
    }

    /// 모든 소스를 한 번씩 동시에 호출합니다 (진단용).
    pub async fn probe(&self) -> Vec<SourceResult> {
        let sources: Vec<Arc<dyn ListingSource>> = self.plan.sources().cloned().collect();
        self.fetch_fan_out(&sources).await
    }

    /// 계획에 따라 소스를 호출합니다.
    pub async fn collect(&self) -> Vec<SourceResult> {
        let primary = async {
            match self.plan.primary_mode {
                FetchMode::Tiered => self.fetch_tiered(&self.plan.primary).await,
                FetchMode::FanOut => self.fetch_fan_out(&self.plan.primary).await,
            }
        };
        let auxiliary = self.fetch_fan_out(&self.plan.auxiliary);

        let (mut results, auxiliary) = futures::join!(primary, auxiliary);
        results.extend(auxiliary);
        results
    }

    async fn fetch_tiered(&self, sources: &[Arc<dyn ListingSource>]) -> Vec<SourceResult> {
        let mut ordered = sources.to_vec();
        ordered.sort_by_key(|s| (s.priority(), s.id()));

        let mut results = Vec::with_capacity(ordered.len());
        for source in ordered {
            let result = run_source(source.as_ref(), self.source_timeout).await;
            let usable = result.is_usable();
            results.push(result);

            if usable {
                debug!(source = %source.id(), "tiered: 사용 가능한 결과, 이후 소스 생략");
                break;
            }
        }
        results
    }

    async fn fetch_fan_out(&self, sources: &[Arc<dyn ListingSource>]) -> Vec<SourceResult> {
        join_all(
            sources
                .iter()
                .map(|source| run_source(source.as_ref(), self.source_timeout)),
        )
        .await
    }

    async fn recompute_and_store(&self) -> Result<ListingsResponse, PipelineError> {
        let response = self.recompute().await?;

        if response.is_degraded() {
            warn!(dataset = %self.plan.key, "모든 소스 실패, 캐시하지 않음");
        } else if self.cache.store(&self.plan.key, &response).await {
            debug!(dataset = %self.plan.key, ttl_secs = self.cache.ttl_secs(), "데이터셋 캐시 저장");
        }

        Ok(response)
    }

    async fn recompute(&self) -> Result<ListingsResponse, PipelineError> {
        let started = Instant::now();
        let mut stats = PipelineStats::new();

        let results = self.collect().await;
        stats.record_sources(&results);

        let reconciliation = reconcile(&results);
        stats.record_reconcile(&reconciliation.report, reconciliation.listings.len());

        let mut response = if reconciliation.listings.is_empty() {
            ListingsResponse::degraded()
        } else {
            classify(reconciliation.listings)?
        };

        if let Some(enricher) = &self.enricher {
            if !response.listed.is_empty() {
                response.listed = enricher.enrich(std::mem::take(&mut response.listed)).await;
            }
        }

        stats.record_response(&response);
        stats.elapsed = started.elapsed();
        stats.log_summary(&self.plan.key);

        if response.is_degraded() {
            info!(dataset = %self.plan.key, "데이터 없음 응답 반환");
        }

        Ok(response)
    }

    /// 동시성 제어를 위한 Lock 획득 또는 생성.
    async fn get_or_create_lock(&self, key: &str) -> Arc<RwLock<()>> {
        let locks = self.fetch_locks.read().await;
        if let Some(lock) = locks.get(key) {
            return lock.clone();
        }
        drop(locks);

        let mut locks = self.fetch_locks.write().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }
}
