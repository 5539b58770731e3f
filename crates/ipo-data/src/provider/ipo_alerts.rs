//! IPOAlerts JSON API 클라이언트.
//!
//! 주 목록 소스입니다. `GET {base}/ipo?status=all`에 `x-api-key` 헤더로
//! 인증합니다. 응답 본문의 `data` 또는 `ipos` 배열을 읽습니다.
//!
//! ## 필드 매핑
//! | API 필드 | RawRecord |
//! |---|---|
//! | `name` | `name` |
//! | `status` | `status` |
//! | `symbol` | `symbol` |
//! | `startDate` / `issueOpenDate` | `issueOpenDate` |
//! | `endDate` / `issueCloseDate` | `issueCloseDate` |
//! | `listingDate` | `listingDate` |
//! | `priceRange` / `priceBand` | `priceBand` |
//! | `minQty` / `lotSize` | `lotSize` |
//! | `issueSize` | `issueSize` |

use async_trait::async_trait;
use ipo_core::{ListingFields, RawRecord, SourceId, SourceRole};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{clean_text, ListingSource};
use crate::error::SourceError;

/// 소스 식별자.
pub const SOURCE_ID: &str = "ipo_alerts";

/// API 응답 본문.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default, alias = "ipos")]
    data: Option<Vec<ApiIpo>>,
}

/// 문자열/숫자 혼용 필드.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl Scalar {
    fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => clean_text(&s),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
        }
    }
}

/// API IPO 항목.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiIpo {
    name: Option<String>,
    status: Option<String>,
    symbol: Option<Scalar>,
    #[serde(alias = "issueOpenDate")]
    start_date: Option<Scalar>,
    #[serde(alias = "issueCloseDate")]
    end_date: Option<Scalar>,
    listing_date: Option<Scalar>,
    #[serde(alias = "priceBand")]
    price_range: Option<Scalar>,
    #[serde(alias = "lotSize")]
    min_qty: Option<Scalar>,
    issue_size: Option<Scalar>,
}

impl ApiIpo {
    /// 매핑 테이블 적용. 이름이 없으면 None.
    fn into_raw(self, source: &SourceId) -> Option<RawRecord> {
        let name = self.name.as_deref().and_then(clean_text)?;
        let text = |value: Option<Scalar>| value.and_then(Scalar::into_text);

        let fields = ListingFields {
            issue_open_date: text(self.start_date),
            issue_close_date: text(self.end_date),
            price_band: text(self.price_range),
            lot_size: text(self.min_qty),
            issue_size: text(self.issue_size),
            listing_date: text(self.listing_date),
            symbol: text(self.symbol),
            ..Default::default()
        };

        let mut record = RawRecord::new(source.clone(), name).with_fields(fields);
        record.status = self.status.as_deref().and_then(clean_text);
        Some(record)
    }
}

/// IPOAlerts 소스.
pub struct IpoAlertsSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl IpoAlertsSource {
    /// 새 소스 생성. API 키가 없으면 `fetch` 시 설정 오류를 반환합니다.
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// 응답 본문 파싱.
    pub fn parse_body(&self, body: &str) -> Result<Vec<RawRecord>, SourceError> {
        let response: ApiResponse = serde_json::from_str(body)
            .map_err(|e| SourceError::Parse(format!("IPOAlerts JSON: {}", e)))?;

        let source = self.id();
        let items = response.data.unwrap_or_default();
        let total = items.len();
        let records: Vec<RawRecord> = items
            .into_iter()
            .filter_map(|item| item.into_raw(&source))
            .collect();

        if records.len() < total {
            debug!(
                skipped = total - records.len(),
                "이름 없는 IPOAlerts 항목 제외"
            );
        }

        Ok(records)
    }
}

#[async_trait]
impl ListingSource for IpoAlertsSource {
    fn id(&self) -> SourceId {
        SourceId::new(SOURCE_ID)
    }

    fn role(&self) -> SourceRole {
        SourceRole::Primary
    }

    fn priority(&self) -> u8 {
        0
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::Config("IPO_ALERTS_API_KEY 미설정".to_string()))?;

        let url = format!("{}/ipo", self.base_url);
        debug!(url = %url, "IPOAlerts API 요청");

        let response = self
            .client
            .get(&url)
            .query(&[("status", "all")])
            .header("x-api-key", api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        if let Some(err) = SourceError::from_status(response.status()) {
            return Err(err);
        }

        let body = response.text().await?;
        self.parse_body(&body)
    }
}
