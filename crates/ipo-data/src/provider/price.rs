//! 과거 시세 소스 trait 및 fallback 조합.

use async_trait::async_trait;
use chrono::NaiveDate;
use ipo_core::PricePoint;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{DataError, Result};

/// 과거 종가 시세 조회 trait.
#[async_trait]
pub trait PriceHistorySource: Send + Sync {
    /// 소스 이름 (로그용).
    fn name(&self) -> &str;

    /// `[from, to]` 구간의 일별 종가를 날짜 오름차순으로 반환합니다.
    ///
    /// 데이터가 없으면 빈 벡터를 반환합니다.
    async fn get_series(&self, symbol: &str, from: NaiveDate, to: NaiveDate)
        -> Result<Vec<PricePoint>>;
}

/// 우선순위 순서로 시세 소스를 시도합니다.
///
/// 처음으로 비어 있지 않은 `Ok` 시리즈를 반환합니다. 모든 소스가 빈 시리즈를
/// 반환하면 빈 시리즈, 모든 소스가 실패하면 마지막 오류를 반환합니다.
pub struct FallbackPriceSource {
    sources: Vec<Arc<dyn PriceHistorySource>>,
}

impl FallbackPriceSource {
    pub fn new(sources: Vec<Arc<dyn PriceHistorySource>>) -> Self {
        Self { sources }
    }

    /// 등록된 소스 수.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl PriceHistorySource for FallbackPriceSource {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn get_series(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>> {
        let mut any_ok = false;
        let mut last_error = None;

        for source in &self.sources {
            match source.get_series(symbol, from, to).await {
                Ok(series) if !series.is_empty() => {
                    debug!(
                        source = source.name(),
                        symbol = symbol,
                        points = series.len(),
                        "시세 조회 성공"
                    );
                    return Ok(series);
                }
                Ok(_) => {
                    debug!(source = source.name(), symbol = symbol, "빈 시세, 다음 소스 시도");
                    any_ok = true;
                }
                Err(e) => {
                    warn!(source = source.name(), symbol = symbol, error = %e, "시세 조회 실패, 다음 소스 시도");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !any_ok => Err(e),
            _ if self.sources.is_empty() => Err(DataError::FetchError(
                "등록된 시세 소스 없음".to_string(),
            )),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        name: &'static str,
        result: std::result::Result<Vec<PricePoint>, &'static str>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn ok(name: &'static str, closes: &[rust_decimal::Decimal]) -> Arc<Self> {
            let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let series = closes
                .iter()
                .enumerate()
                .map(|(i, c)| PricePoint::new(base + chrono::Duration::days(i as i64), *c))
                .collect();
            Arc::new(Self {
                name,
                result: Ok(series),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                result: Err("down"),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PriceHistorySource for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn get_series(&self, _: &str, _: NaiveDate, _: NaiveDate) -> Result<Vec<PricePoint>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .clone()
                .map_err(|e| DataError::FetchError(e.to_string()))
        }
    }

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_first_non_empty_wins() {
        let empty = StaticSource::ok("empty", &[]);
        let primary = StaticSource::ok("primary", &[dec!(100), dec!(120)]);
        let backup = StaticSource::ok("backup", &[dec!(1)]);
        let fallback = FallbackPriceSource::new(vec![empty.clone(), primary.clone(), backup.clone()]);

        let (from, to) = range();
        let series = fallback.get_series("XYZ", from, to).await.unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].close, dec!(100));
        assert_eq!(backup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_then_success() {
        let down = StaticSource::failing("nse");
        let yahoo = StaticSource::ok("yahoo", &[dec!(50)]);
        let fallback = FallbackPriceSource::new(vec![down, yahoo]);

        let (from, to) = range();
        assert_eq!(fallback.get_series("XYZ", from, to).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_empty_is_empty() {
        let fallback = FallbackPriceSource::new(vec![
            StaticSource::failing("nse"),
            StaticSource::ok("yahoo", &[]),
        ]);
        let (from, to) = range();
        assert!(fallback.get_series("XYZ", from, to).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_failed_is_error() {
        let fallback = FallbackPriceSource::new(vec![
            StaticSource::failing("nse"),
            StaticSource::failing("yahoo"),
        ]);
        let (from, to) = range();
        assert!(fallback.get_series("XYZ", from, to).await.is_err());
    }
}
