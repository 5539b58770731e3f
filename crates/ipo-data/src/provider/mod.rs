//! 데이터 Provider 모듈.
//!
//! 외부 소스에서 IPO 목록과 시세를 가져오는 어댑터들을 정의합니다.
//! 각 어댑터는 소스 고유 형식을 명시적인 매핑 테이블로 [`RawRecord`]에
//! 옮기며, 모든 전송/파싱 오류를 [`SourceError`]로 변환해 반환합니다.
//!
//! ## IPO 목록 소스
//! - `IpoAlertsSource`: IPOAlerts JSON API (API 키 필요, 주 소스)
//! - `HtmlTableSource`: Chittorgarh / Moneycontrol HTML 테이블 (주 소스 fallback)
//! - `GmpFeedSource`: GMP RSS 피드 (보조 신호)
//!
//! ## 시세 소스
//! - `NseHistoricalSource`: NSE 과거 시세 API
//! - `YahooPriceSource`: Yahoo Finance (`.NS`) fallback
//! - `FallbackPriceSource`: 우선순위 순서로 시도

pub mod gmp_feed;
pub mod html_table;
pub mod ipo_alerts;
pub mod nse;
pub mod price;
pub mod yahoo;

pub use gmp_feed::GmpFeedSource;
pub use html_table::{ColumnMap, HtmlTableSource};
pub use ipo_alerts::IpoAlertsSource;
pub use nse::NseHistoricalSource;
pub use price::{FallbackPriceSource, PriceHistorySource};
pub use yahoo::YahooPriceSource;

use async_trait::async_trait;
use ipo_core::{RawRecord, SourceId, SourceRole, SourcesConfig};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::SourceError;

/// IPO 목록 소스 trait.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// 소스 식별자.
    fn id(&self) -> SourceId;

    /// 소스 역할 (주 목록 / 보조 신호).
    fn role(&self) -> SourceRole;

    /// 우선순위 (작을수록 먼저). tiered 순서와 병합 순서를 결정합니다.
    fn priority(&self) -> u8;

    /// 원본 레코드 조회.
    ///
    /// 어떤 오류도 panic/전파하지 않고 `Err(SourceError)`로 반환해야 합니다.
    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError>;
}

/// 어댑터 1회 호출 결과.
#[derive(Debug, Clone)]
pub struct SourceResult {
    pub source: SourceId,
    pub role: SourceRole,
    pub priority: u8,
    pub outcome: Result<Vec<RawRecord>, SourceError>,
    /// 호출 소요 시간
    pub elapsed: Duration,
}

impl SourceResult {
    /// 성공한 경우의 레코드 (실패 시 빈 슬라이스).
    pub fn records(&self) -> &[RawRecord] {
        match &self.outcome {
            Ok(records) => records,
            Err(_) => &[],
        }
    }

    /// 성공 + 비어 있지 않음.
    pub fn is_usable(&self) -> bool {
        matches!(&self.outcome, Ok(records) if !records.is_empty())
    }
}

/// 소스를 타임아웃과 함께 호출합니다.
///
/// 타임아웃은 이 소스의 호출만 취소하며, 결과는 항상 `SourceResult`로 반환됩니다.
pub async fn run_source(source: &dyn ListingSource, timeout: Duration) -> SourceResult {
    let started = Instant::now();
    let id = source.id();

    let outcome = match tokio::time::timeout(timeout, source.fetch()).await {
        Ok(outcome) => outcome,
        Err(_) => Err(SourceError::Timeout(timeout)),
    };
    let elapsed = started.elapsed();

    match &outcome {
        Ok(records) => debug!(
            source = %id,
            count = records.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "소스 조회 완료"
        ),
        Err(e) => warn!(
            source = %id,
            kind = e.kind(),
            error = %e,
            elapsed_ms = elapsed.as_millis() as u64,
            "소스 조회 실패, 이번 실행에서 제외"
        ),
    }

    SourceResult {
        source: id,
        role: source.role(),
        priority: source.priority(),
        outcome,
        elapsed,
    }
}

/// 모든 어댑터가 공유하는 HTTP 클라이언트 생성.
pub fn build_http_client(config: &SourcesConfig) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| SourceError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))
}

/// 셀/필드 텍스트 정리 (공백 축약, 빈 값은 None).
pub(crate) fn clean_text(text: &str) -> Option<String> {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if joined.is_empty() || joined == "-" {
        None
    } else {
        Some(joined)
    }
}
