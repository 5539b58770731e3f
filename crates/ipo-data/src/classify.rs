//! 상태 분류 (Status Classifier).
//!
//! 소스 원본 상태 문자열을 고정된 어휘 테이블로 [`ListingStatus`]에 매핑하고
//! 응답 버킷으로 나눕니다.
//!
//! | 원본 (대소문자 무시, trim) | 상태 | 버킷 |
//! |---|---|---|
//! | `upcoming` | Upcoming | upcoming |
//! | `current`, `open` | Current | current |
//! | `closed`, `listed` | Closed | listed |
//! | 그 외 / 없음 | Upcoming (경고) | upcoming |

use ipo_core::{CanonicalRecord, ListingStatus, ListingsResponse};
use std::collections::HashSet;
use tracing::warn;

use crate::error::PipelineError;
use crate::reconcile::ReconciledListing;

/// 상태 어휘 테이블.
const STATUS_VOCABULARY: &[(&str, ListingStatus)] = &[
    ("upcoming", ListingStatus::Upcoming),
    ("current", ListingStatus::Current),
    ("open", ListingStatus::Current),
    ("closed", ListingStatus::Closed),
    ("listed", ListingStatus::Closed),
];

/// 원본 상태 문자열을 어휘 테이블에서 찾습니다. 인식하지 못하면 `None`.
pub fn lookup_status(raw: &str) -> Option<ListingStatus> {
    let raw = raw.trim();
    STATUS_VOCABULARY
        .iter()
        .find(|(word, _)| word.eq_ignore_ascii_case(raw))
        .map(|(_, status)| *status)
}

/// 상태 분류. 인식하지 못한 값은 `Upcoming`으로 분류하고 경고를 남깁니다.
pub fn classify_status(name: &str, raw: Option<&str>) -> ListingStatus {
    match raw.and_then(lookup_status) {
        Some(status) => status,
        None => {
            warn!(name = %name, raw_status = ?raw, "알 수 없는 상태, Upcoming으로 분류");
            ListingStatus::Upcoming
        }
    }
}

/// 병합된 레코드를 분류하고 버킷으로 나눕니다.
///
/// 모든 레코드는 정확히 하나의 버킷에 들어갑니다. 버킷 합계가 입력 수와
/// 다르거나 같은 키가 두 번 나타나면 내부 오류를 반환합니다.
pub fn classify(listings: Vec<ReconciledListing>) -> Result<ListingsResponse, PipelineError> {
    let input_count = listings.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(input_count);
    let mut response = ListingsResponse::default();

    for listing in listings {
        if !seen.insert(listing.key.clone()) {
            return Err(PipelineError::Internal(format!(
                "정규화 키 중복: {}",
                listing.key
            )));
        }

        let status = classify_status(&listing.name, listing.raw_status.as_deref());
        let record = CanonicalRecord {
            name: listing.name,
            normalized_key: listing.key,
            status,
            fields: listing.fields,
            performance: None,
            sources: listing.sources,
        };

        match status {
            ListingStatus::Upcoming => response.upcoming.push(record),
            ListingStatus::Current => response.current.push(record),
            ListingStatus::Closed => response.listed.push(record),
        }
    }

    if response.total() != input_count {
        return Err(PipelineError::Internal(format!(
            "버킷 합계 불일치: 입력 {}, 출력 {}",
            input_count,
            response.total()
        )));
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipo_core::{ListingFields, SourceId};
    use std::collections::BTreeSet;

    fn listing(name: &str, key: &str, status: Option<&str>) -> ReconciledListing {
        ReconciledListing {
            name: name.to_string(),
            key: key.to_string(),
            raw_status: status.map(str::to_string),
            fields: ListingFields::default(),
            sources: BTreeSet::from([SourceId::new("a")]),
        }
    }

    #[test]
    fn test_vocabulary() {
        assert_eq!(lookup_status("Upcoming"), Some(ListingStatus::Upcoming));
        assert_eq!(lookup_status(" OPEN "), Some(ListingStatus::Current));
        assert_eq!(lookup_status("current"), Some(ListingStatus::Current));
        assert_eq!(lookup_status("Closed"), Some(ListingStatus::Closed));
        assert_eq!(lookup_status("LISTED"), Some(ListingStatus::Closed));
        assert_eq!(lookup_status("announced"), None);
        assert_eq!(lookup_status("open soon"), None);
    }

    #[test]
    fn test_unknown_defaults_to_upcoming() {
        assert_eq!(classify_status("ABC", None), ListingStatus::Upcoming);
        assert_eq!(classify_status("ABC", Some("withdrawn")), ListingStatus::Upcoming);
    }

    #[test]
    fn test_each_record_in_one_bucket() {
        let response = classify(vec![
            listing("A", "a", Some("Upcoming")),
            listing("B", "b", Some("open")),
            listing("C", "c", Some("listed")),
            listing("D", "d", None),
            listing("E", "e", Some("closed")),
        ])
        .unwrap();

        assert_eq!(response.upcoming.len(), 2);
        assert_eq!(response.current.len(), 1);
        assert_eq!(response.listed.len(), 2);
        assert_eq!(response.listed[0].name, "C");
        assert_eq!(response.listed[1].name, "E");
        assert_eq!(response.total(), 5);
        assert!(!response.is_degraded());
    }

    #[test]
    fn test_duplicate_key_is_internal_error() {
        let result = classify(vec![
            listing("ABC Ltd", "abc", Some("Upcoming")),
            listing("ABC", "abc", Some("Closed")),
        ]);
        assert!(matches!(result, Err(PipelineError::Internal(_))));
    }
}
