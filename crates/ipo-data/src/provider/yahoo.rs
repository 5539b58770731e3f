//! Yahoo Finance 시세 소스.
//!
//! NSE 조회가 실패하거나 비어 있을 때 사용하는 fallback입니다.
//! 인도 상장 종목은 `.NS` 접미사를 붙여 조회합니다.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use ipo_core::PricePoint;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::debug;

use super::price::PriceHistorySource;
use crate::error::{DataError, Result};

/// Yahoo Finance 시세 소스.
pub struct YahooPriceSource {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooPriceSource {
    pub fn new() -> Result<Self> {
        let connector = yahoo_finance_api::YahooConnector::new()
            .map_err(|e| DataError::FetchError(format!("Yahoo 커넥터 생성 실패: {}", e)))?;
        Ok(Self { connector })
    }
}

/// NSE 심볼을 Yahoo 심볼로 변환 (이미 접미사가 있으면 유지).
pub fn to_yahoo_symbol(symbol: &str) -> String {
    let symbol = symbol.trim().to_uppercase();
    if symbol.contains('.') {
        symbol
    } else {
        format!("{}.NS", symbol)
    }
}

/// NaiveDate를 OffsetDateTime(UTC 자정)으로 변환.
fn naive_date_to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime> {
    let month = time::Month::try_from(date.month() as u8)
        .map_err(|e| DataError::InvalidData(e.to_string()))?;
    let date = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
        .map_err(|e| DataError::InvalidData(e.to_string()))?;
    Ok(date.midnight().assume_utc())
}

#[async_trait]
impl PriceHistorySource for YahooPriceSource {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn get_series(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>> {
        let yahoo_symbol = to_yahoo_symbol(symbol);
        let start = naive_date_to_offset_datetime(from)?;
        // 종료일 당일 시세 포함
        let end = naive_date_to_offset_datetime(to.succ_opt().unwrap_or(to))?;

        debug!(symbol = %yahoo_symbol, start = %from, end = %to, "Yahoo Finance 일봉 요청");

        let response = self
            .connector
            .get_quote_history_interval(&yahoo_symbol, start, end, "1d")
            .await
            .map_err(|e| {
                DataError::FetchError(format!("Yahoo Finance API 오류 ({}): {}", yahoo_symbol, e))
            })?;

        let quotes = response
            .quotes()
            .map_err(|e| DataError::ParseError(format!("Quote 파싱 오류: {}", e)))?;

        let mut points: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                let date = Utc
                    .timestamp_opt(q.timestamp as i64, 0)
                    .single()?
                    .date_naive();
                let close = Decimal::from_f64_retain(q.close)?.round_dp(4);
                Some(PricePoint::new(date, close))
            })
            .filter(|p| p.date >= from && p.date <= to)
            .collect();

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}
