//! IPO 레코드 모델.
//!
//! 수집 파이프라인의 각 단계에서 사용하는 레코드 타입입니다.
//!
//! ```text
//! RawRecord (소스별) ──▶ CanonicalRecord (정규화·병합) ──▶ ListingsResponse (버킷)
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::source::SourceId;

/// 전체 소스 실패 시 응답에 포함되는 안내 메시지.
pub const NO_DATA_MESSAGE: &str = "No IPO data available. Try again later.";

/// 소스 간 공통 IPO 필드.
///
/// 모든 값은 소스가 제공한 표시용 문자열 그대로 유지합니다.
/// 빈 문자열은 어댑터에서 `None`으로 변환됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingFields {
    /// 청약 시작일
    pub issue_open_date: Option<String>,
    /// 청약 마감일
    pub issue_close_date: Option<String>,
    /// 공모가 밴드 (예: "₹95-100")
    pub price_band: Option<String>,
    /// 최소 청약 단위
    pub lot_size: Option<String>,
    /// 공모 규모
    pub issue_size: Option<String>,
    /// 상장일
    pub listing_date: Option<String>,
    /// 거래소 심볼 (상장 후)
    pub symbol: Option<String>,
    /// 장외 프리미엄 (grey-market premium)
    pub gmp: Option<String>,
    /// GMP 기준 예상 수익률
    pub gain_percent: Option<String>,
}

impl ListingFields {
    /// 비어 있는 필드만 `other`의 값으로 채웁니다.
    ///
    /// 이미 값이 있는 필드는 절대 덮어쓰지 않습니다 (first-writer-wins).
    /// 채운 필드 수를 반환합니다.
    pub fn fill_missing(&mut self, other: &ListingFields) -> usize {
        let pairs = [
            (&mut self.issue_open_date, &other.issue_open_date),
            (&mut self.issue_close_date, &other.issue_close_date),
            (&mut self.price_band, &other.price_band),
            (&mut self.lot_size, &other.lot_size),
            (&mut self.issue_size, &other.issue_size),
            (&mut self.listing_date, &other.listing_date),
            (&mut self.symbol, &other.symbol),
            (&mut self.gmp, &other.gmp),
            (&mut self.gain_percent, &other.gain_percent),
        ];

        let mut filled = 0;
        for (target, source) in pairs {
            if target.is_none() {
                if let Some(value) = source {
                    *target = Some(value.clone());
                    filled += 1;
                }
            }
        }
        filled
    }
}

/// 소스 어댑터가 생성한 원본 레코드.
///
/// 어댑터별 매핑 테이블을 거친 뒤의 타입화된 형태입니다.
/// 소스 간 유일성은 보장되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    /// 레코드를 생성한 소스
    pub source: SourceId,
    /// 표시용 이름 (정규화 전)
    pub name: String,
    /// 소스 고유 상태 문자열 ("Upcoming", "Open", "Listed" 등)
    pub status: Option<String>,
    #[serde(flatten)]
    pub fields: ListingFields,
}

impl RawRecord {
    pub fn new(source: SourceId, name: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
            status: None,
            fields: ListingFields::default(),
        }
    }

    /// 상태 문자열 설정.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// 필드 설정.
    pub fn with_fields(mut self, fields: ListingFields) -> Self {
        self.fields = fields;
        self
    }
}

/// IPO 생애주기 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingStatus {
    /// 청약 예정
    Upcoming,
    /// 청약 진행 중
    Current,
    /// 청약 마감 또는 상장 완료
    Closed,
}

impl ListingStatus {
    /// 응답 버킷 이름.
    pub fn bucket(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Current => "current",
            Self::Closed => "listed",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upcoming => write!(f, "Upcoming"),
            Self::Current => write!(f, "Current"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// 상장 후 수익률.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    /// 상장일 이후 첫 종가
    pub first_close: Decimal,
    /// 최근 종가
    pub last_close: Decimal,
    /// 수익률 (%), 소수점 둘째 자리 반올림
    pub returns_pct: Decimal,
}

impl Performance {
    /// 첫/마지막 종가로 수익률 계산.
    ///
    /// 첫 종가가 0이면 수익률을 정의할 수 없으므로 `None`을 반환합니다.
    pub fn from_closes(first_close: Decimal, last_close: Decimal) -> Option<Self> {
        if first_close.is_zero() {
            return None;
        }

        let returns_pct = ((last_close - first_close) / first_close * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        Some(Self {
            first_close,
            last_close,
            returns_pct,
        })
    }
}

/// 정규화·병합된 IPO 레코드.
///
/// 하나의 데이터셋 스냅샷 안에서 `normalized_key`당 최대 하나만 존재합니다.
/// Reconciler가 생성한 뒤에는 변경되지 않으며, Enricher는 `performance`가
/// 채워진 사본을 반환합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    /// 처음 관측된 표시용 이름
    pub name: String,
    /// 정규화 키
    pub normalized_key: String,
    /// 생애주기 상태
    pub status: ListingStatus,
    #[serde(flatten)]
    pub fields: ListingFields,
    /// 상장 후 수익률 (Closed + symbol인 경우에만)
    pub performance: Option<Performance>,
    /// 이 레코드에 기여한 소스 목록
    pub sources: BTreeSet<SourceId>,
}

impl CanonicalRecord {
    /// 수익률이 채워진 사본 반환.
    pub fn with_performance(&self, performance: Option<Performance>) -> Self {
        Self {
            performance,
            ..self.clone()
        }
    }
}

/// 파이프라인 최종 응답.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingsResponse {
    pub upcoming: Vec<CanonicalRecord>,
    pub current: Vec<CanonicalRecord>,
    pub listed: Vec<CanonicalRecord>,
    /// 모든 소스가 실패했을 때만 채워지는 안내 메시지
    #[serde(default)]
    pub message: Option<String>,
}

impl ListingsResponse {
    /// 데이터 없음 응답 (degraded success).
    pub fn degraded() -> Self {
        Self {
            message: Some(NO_DATA_MESSAGE.to_string()),
            ..Default::default()
        }
    }

    /// 데이터 없음 응답 여부.
    pub fn is_degraded(&self) -> bool {
        self.message.is_some()
    }

    /// 전체 레코드 수.
    pub fn total(&self) -> usize {
        self.upcoming.len() + self.current.len() + self.listed.len()
    }

    /// upcoming → current → listed 순으로 모든 레코드 순회.
    pub fn iter(&self) -> impl Iterator<Item = &CanonicalRecord> {
        self.upcoming
            .iter()
            .chain(self.current.iter())
            .chain(self.listed.iter())
    }
}

/// 영구 저장되는 회사 상세 정보.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDetail {
    /// canonical 이름 (저장 키)
    pub name: String,
    /// 회사 소개
    pub about: String,
    /// 재무 요약
    pub financials: String,
    /// 마지막 저장 시각
    pub updated_at: DateTime<Utc>,
}

/// 단건 조회 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDetail {
    #[serde(flatten)]
    pub listing: CanonicalRecord,
    /// 저장소에 보관된 상세 정보 (없으면 None)
    pub detail: Option<CompanyDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fill_missing_never_overwrites() {
        let mut target = ListingFields {
            issue_open_date: Some("10 Oct".to_string()),
            ..Default::default()
        };
        let other = ListingFields {
            issue_open_date: Some("11 Oct".to_string()),
            gmp: Some("+45".to_string()),
            ..Default::default()
        };

        let filled = target.fill_missing(&other);

        assert_eq!(filled, 1);
        assert_eq!(target.issue_open_date.as_deref(), Some("10 Oct"));
        assert_eq!(target.gmp.as_deref(), Some("+45"));
    }

    #[test]
    fn test_performance_from_closes() {
        let perf = Performance::from_closes(dec!(100), dec!(120)).unwrap();
        assert_eq!(perf.returns_pct, dec!(20.00));

        let perf = Performance::from_closes(dec!(300), dec!(200)).unwrap();
        assert_eq!(perf.returns_pct, dec!(-33.33));

        // 0으로 나누기 방지
        assert!(Performance::from_closes(Decimal::ZERO, dec!(10)).is_none());
    }

    #[test]
    fn test_status_buckets() {
        assert_eq!(ListingStatus::Upcoming.bucket(), "upcoming");
        assert_eq!(ListingStatus::Current.bucket(), "current");
        assert_eq!(ListingStatus::Closed.bucket(), "listed");
    }

    #[test]
    fn test_degraded_response() {
        let resp = ListingsResponse::degraded();
        assert!(resp.is_degraded());
        assert_eq!(resp.total(), 0);
        assert_eq!(resp.message.as_deref(), Some(NO_DATA_MESSAGE));
    }

    #[test]
    fn test_raw_record_serializes_flat_camel_case() {
        let record = RawRecord::new(SourceId::new("ipo_alerts"), "ABC Ltd")
            .with_status("Upcoming")
            .with_fields(ListingFields {
                issue_open_date: Some("10 Oct".to_string()),
                ..Default::default()
            });

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["name"], "ABC Ltd");
        assert_eq!(value["issueOpenDate"], "10 Oct");
        assert_eq!(value["source"], "ipo_alerts");
    }
}
