//! 상장 후 수익률 보강 (Enricher).
//!
//! `Closed` 상태이면서 `symbol`이 있는 레코드에 대해 `[상장일, 오늘]` 구간의
//! 종가를 조회하고 첫/마지막 종가로 수익률을 계산합니다. 오늘은
//! `Asia/Kolkata` 기준 날짜입니다.
//!
//! 레코드 하나의 실패(상장일 파싱 불가, 시세 오류, 타임아웃, 첫 종가 0)는
//! `performance = None`으로 처리되며 다른 레코드에 영향을 주지 않습니다.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use futures::stream::{self, StreamExt};
use ipo_core::{CanonicalRecord, EnrichmentConfig, ListingStatus, Performance};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{DataError, Result};
use crate::provider::PriceHistorySource;

/// 상장일 문자열 형식 (우선순위 순).
const LISTING_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d-%b-%Y",
];

/// 상장일 문자열을 관대하게 파싱합니다.
///
/// `YYYY-MM-DD`, `DD-MM-YYYY`, `DD Mon YYYY`, `Mon DD, YYYY` 형식을 지원합니다.
pub fn parse_listing_date(text: &str) -> Option<NaiveDate> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    LISTING_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
}

/// 수익률 보강기.
pub struct Enricher {
    prices: Arc<dyn PriceHistorySource>,
    max_concurrency: usize,
    timeout: Duration,
    timezone: Tz,
}

impl Enricher {
    pub fn new(prices: Arc<dyn PriceHistorySource>) -> Self {
        Self {
            prices,
            max_concurrency: 4,
            timeout: Duration::from_secs(15),
            timezone: chrono_tz::Asia::Kolkata,
        }
    }

    /// 설정 파일의 보강 섹션 적용.
    pub fn from_config(prices: Arc<dyn PriceHistorySource>, config: &EnrichmentConfig) -> Self {
        Self::new(prices)
            .with_max_concurrency(config.max_concurrency)
            .with_timeout(config.timeout())
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 거래소 기준 오늘 날짜.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// 레코드 목록 보강. 출력 순서는 입력 순서와 같습니다.
    pub async fn enrich(&self, records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
        self.enrich_as_of(records, self.today()).await
    }

    /// 기준일을 지정한 보강.
    pub async fn enrich_as_of(
        &self,
        records: Vec<CanonicalRecord>,
        today: NaiveDate,
    ) -> Vec<CanonicalRecord> {
        stream::iter(records)
            .map(|record| self.enrich_one(record, today))
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    async fn enrich_one(&self, record: CanonicalRecord, today: NaiveDate) -> CanonicalRecord {
        if record.status != ListingStatus::Closed {
            return record;
        }

        let Some(symbol) = record.fields.symbol.as_deref() else {
            debug!(name = %record.name, "심볼 없음, 수익률 생략");
            return record.with_performance(None);
        };

        match self
            .compute_performance(symbol, record.fields.listing_date.as_deref(), today)
            .await
        {
            Ok(performance) => record.with_performance(performance),
            Err(e) => {
                warn!(name = %record.name, symbol = symbol, error = %e, "수익률 계산 실패");
                record.with_performance(None)
            }
        }
    }

    /// 시세가 비어 있으면 `Ok(None)`.
    async fn compute_performance(
        &self,
        symbol: &str,
        listing_date: Option<&str>,
        today: NaiveDate,
    ) -> Result<Option<Performance>> {
        let from = listing_date
            .and_then(parse_listing_date)
            .ok_or_else(|| DataError::InvalidData(format!("상장일 파싱 불가: {:?}", listing_date)))?;

        if from > today {
            return Ok(None);
        }

        let series = tokio::time::timeout(self.timeout, self.prices.get_series(symbol, from, today))
            .await
            .map_err(|_| DataError::Timeout(format!("{} 시세 조회 ({:?})", symbol, self.timeout)))??;

        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            debug!(symbol = symbol, "빈 시세");
            return Ok(None);
        };

        Performance::from_closes(first.close, last.close)
            .map(Some)
            .ok_or_else(|| DataError::InvalidData(format!("{} 첫 종가가 0", symbol)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ipo_core::{ListingFields, PricePoint, SourceId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::{BTreeSet, HashMap};

    struct MapSource {
        series: HashMap<&'static str, Vec<Decimal>>,
        delay: Duration,
    }

    #[async_trait]
    impl PriceHistorySource for MapSource {
        fn name(&self) -> &str {
            "map"
        }

        async fn get_series(
            &self,
            symbol: &str,
            from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<PricePoint>> {
            tokio::time::sleep(self.delay).await;
            match self.series.get(symbol) {
                Some(closes) => Ok(closes
                    .iter()
                    .enumerate()
                    .map(|(i, c)| PricePoint::new(from + chrono::Duration::days(i as i64), *c))
                    .collect()),
                None => Err(DataError::FetchError(format!("unknown {}", symbol))),
            }
        }
    }

    fn enricher(delay: Duration) -> Enricher {
        let series = HashMap::from([
            ("XYZ", vec![dec!(100), dec!(110), dec!(120)]),
            ("ZERO", vec![dec!(0), dec!(10)]),
            ("EMPTY", vec![]),
        ]);
        Enricher::new(Arc::new(MapSource { series, delay }))
    }

    fn closed(name: &str, symbol: Option<&str>, listing_date: Option<&str>) -> CanonicalRecord {
        CanonicalRecord {
            name: name.to_string(),
            normalized_key: name.to_lowercase(),
            status: ListingStatus::Closed,
            fields: ListingFields {
                symbol: symbol.map(str::to_string),
                listing_date: listing_date.map(str::to_string),
                ..Default::default()
            },
            performance: None,
            sources: BTreeSet::from([SourceId::new("a")]),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()
    }

    #[test]
    fn test_parse_listing_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 9, 2);
        assert_eq!(parse_listing_date("2024-09-02"), expected);
        assert_eq!(parse_listing_date("02-09-2024"), expected);
        assert_eq!(parse_listing_date("2 Sep 2024"), expected);
        assert_eq!(parse_listing_date("Sep 2, 2024"), expected);
        assert_eq!(parse_listing_date(" 02  September 2024 "), expected);
        assert_eq!(parse_listing_date("soon"), None);
    }

    #[tokio::test]
    async fn test_xyz_performance() {
        let out = enricher(Duration::ZERO)
            .enrich_as_of(vec![closed("XYZ", Some("XYZ"), Some("2024-09-02"))], today())
            .await;

        let perf = out[0].performance.as_ref().unwrap();
        assert_eq!(perf.first_close, dec!(100));
        assert_eq!(perf.last_close, dec!(120));
        assert_eq!(perf.returns_pct, dec!(20.00));
    }

    #[tokio::test]
    async fn test_non_fatal_failures() {
        let records = vec![
            closed("NoSymbol", None, Some("2024-09-02")),
            closed("Zero", Some("ZERO"), Some("2024-09-02")),
            closed("Empty", Some("EMPTY"), Some("2024-09-02")),
            closed("Unknown", Some("NOPE"), Some("2024-09-02")),
            closed("BadDate", Some("XYZ"), Some("TBA")),
            closed("Future", Some("XYZ"), Some("2024-12-01")),
            closed("Good", Some("XYZ"), Some("2 Sep 2024")),
        ];

        let out = enricher(Duration::ZERO).enrich_as_of(records, today()).await;

        let names: Vec<&str> = out.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["NoSymbol", "Zero", "Empty", "Unknown", "BadDate", "Future", "Good"]
        );
        assert!(out[..6].iter().all(|r| r.performance.is_none()));
        assert!(out[6].performance.is_some());
    }

    #[tokio::test]
    async fn test_non_closed_untouched() {
        let mut record = closed("Open", Some("XYZ"), Some("2024-09-02"));
        record.status = ListingStatus::Current;

        let out = enricher(Duration::ZERO).enrich_as_of(vec![record.clone()], today()).await;
        assert_eq!(out[0], record);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_none() {
        let enricher = enricher(Duration::from_secs(60)).with_timeout(Duration::from_secs(1));
        let out = enricher
            .enrich_as_of(vec![closed("XYZ", Some("XYZ"), Some("2024-09-02"))], today())
            .await;
        assert!(out[0].performance.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_preserved_under_concurrency() {
        let enricher = enricher(Duration::from_millis(10)).with_max_concurrency(2);
        let records: Vec<CanonicalRecord> = (0..6)
            .map(|i| closed(&format!("R{}", i), Some("XYZ"), Some("2024-09-02")))
            .collect();

        let out = enricher.enrich_as_of(records, today()).await;
        let names: Vec<String> = out.iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["R0", "R1", "R2", "R3", "R4", "R5"]);
        assert!(out.iter().all(|r| r.performance.is_some()));
    }
}
