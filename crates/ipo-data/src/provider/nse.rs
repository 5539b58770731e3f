//! NSE 과거 시세 API.
//!
//! `GET {base}/api/historical/cm/equity?symbol=..&series=["EQ"]&from=DD-MM-YYYY&to=DD-MM-YYYY`
//!
//! 응답의 `data` 배열은 두 형식이 섞여 올 수 있습니다.
//! - 배열 행: `[date, .., .., .., close, ..]` (종가는 인덱스 4)
//! - 객체 행: `{ "CH_TIMESTAMP": "2024-01-15", "CH_CLOSING_PRICE": 120.5 }`
//!
//! NSE는 최신순으로 반환하므로 날짜 오름차순으로 정렬합니다.

use async_trait::async_trait;
use chrono::NaiveDate;
use ipo_core::PricePoint;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::debug;

use super::price::PriceHistorySource;
use crate::error::{DataError, Result, SourceError};

/// 배열 행에서 종가 위치.
const CLOSE_INDEX: usize = 4;

/// NSE 날짜 파라미터 형식.
const NSE_DATE_FORMAT: &str = "%d-%m-%Y";

/// 응답 행 날짜 형식.
const ROW_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%b-%Y", "%d-%m-%Y"];

#[derive(Debug, Deserialize)]
struct HistoricalResponse {
    #[serde(default)]
    data: Vec<HistoricalRow>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistoricalRow {
    Array(Vec<serde_json::Value>),
    Object {
        #[serde(rename = "CH_TIMESTAMP")]
        timestamp: String,
        #[serde(rename = "CH_CLOSING_PRICE")]
        close: serde_json::Value,
    },
}

impl HistoricalRow {
    fn into_point(self) -> Option<PricePoint> {
        let (date, close) = match self {
            Self::Array(cells) => {
                let date = cells.first()?.as_str()?.to_string();
                let close = cells.get(CLOSE_INDEX)?.clone();
                (date, close)
            }
            Self::Object { timestamp, close } => (timestamp, close),
        };

        Some(PricePoint::new(parse_row_date(&date)?, parse_close(&close)?))
    }
}

fn parse_row_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    // "2024-01-15T00:00:00" 같은 타임스탬프는 날짜 부분만 사용
    let text = text.split('T').next().unwrap_or(text);
    ROW_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

fn parse_close(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        serde_json::Value::String(s) => Decimal::from_str(&s.trim().replace(',', "")).ok(),
        _ => None,
    }
}

/// NSE 과거 시세 소스.
pub struct NseHistoricalSource {
    client: Client,
    base_url: String,
}

impl NseHistoricalSource {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// 응답 본문 파싱. 날짜 오름차순으로 정렬된 시세를 반환합니다.
    pub fn parse_body(body: &str) -> Result<Vec<PricePoint>> {
        let response: HistoricalResponse = serde_json::from_str(body)
            .map_err(|e| DataError::ParseError(format!("NSE 응답: {}", e)))?;

        let total = response.data.len();
        let mut points: Vec<PricePoint> = response
            .data
            .into_iter()
            .filter_map(HistoricalRow::into_point)
            .collect();

        if points.len() < total {
            debug!(skipped = total - points.len(), "파싱 불가 NSE 행 제외");
        }

        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Ok(points)
    }
}

#[async_trait]
impl PriceHistorySource for NseHistoricalSource {
    fn name(&self) -> &str {
        "nse"
    }

    async fn get_series(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>> {
        let url = format!("{}/api/historical/cm/equity", self.base_url);
        let from_param = from.format(NSE_DATE_FORMAT).to_string();
        let to_param = to.format(NSE_DATE_FORMAT).to_string();

        debug!(symbol = symbol, from = %from, to = %to, "NSE 과거 시세 요청");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("series", "[\"EQ\"]"),
                ("from", from_param.as_str()),
                ("to", to_param.as_str()),
            ])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(SourceError::from)?;

        if let Some(err) = SourceError::from_status(response.status()) {
            return Err(err.into());
        }

        let body = response.text().await.map_err(SourceError::from)?;
        Self::parse_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_array_rows_sorted() {
        let body = r#"{"data":[
            ["2024-01-17", "EQ", 0, 0, "1,130.50", 0],
            ["2024-01-15", "EQ", 0, 0, 100, 0],
            ["2024-01-16", "EQ", 0, 0, 120.25, 0],
            ["bad-date", "EQ", 0, 0, 1, 0],
            ["2024-01-18"]
        ]}"#;

        let points = NseHistoricalSource::parse_body(body).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(points[0].close, dec!(100));
        assert_eq!(points[1].close, dec!(120.25));
        assert_eq!(points[2].close, dec!(1130.50));
    }

    #[test]
    fn test_parse_object_rows() {
        let body = r#"{"data":[
            {"CH_TIMESTAMP":"2024-01-16","CH_CLOSING_PRICE":120},
            {"CH_TIMESTAMP":"15-Jan-2024","CH_CLOSING_PRICE":"100.00"}
        ]}"#;

        let points = NseHistoricalSource::parse_body(body).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].close, dec!(100.00));
        assert_eq!(points[1].close, dec!(120));
    }

    #[test]
    fn test_parse_empty_and_invalid() {
        assert!(NseHistoricalSource::parse_body(r#"{"data":[]}"#).unwrap().is_empty());
        assert!(NseHistoricalSource::parse_body("{}").unwrap().is_empty());
        assert!(NseHistoricalSource::parse_body("<html>").is_err());
    }

    #[tokio::test]
    async fn test_get_series_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/historical/cm/equity")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("symbol".into(), "XYZ".into()),
                Matcher::UrlEncoded("from".into(), "01-09-2024".into()),
                Matcher::UrlEncoded("to".into(), "30-09-2024".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data":[["2024-09-02","EQ",0,0,100,0],["2024-09-30","EQ",0,0,120,0]]}"#)
            .create_async()
            .await;

        let source = NseHistoricalSource::new(Client::new(), server.url());
        let series = source
            .get_series(
                "XYZ",
                NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[1].close, dec!(120));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_series_forbidden() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/historical/cm/equity")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let source = NseHistoricalSource::new(Client::new(), server.url());
        let result = source
            .get_series(
                "XYZ",
                NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
            )
            .await;
        assert!(matches!(result, Err(DataError::FetchError(_))));
    }
}
