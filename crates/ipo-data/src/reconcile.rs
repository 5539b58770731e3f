//! 소스 간 레코드 병합 (Reconciler).
//!
//! 1. 결과를 `(priority, source id)` 순으로 정렬 (도착 순서 무관)
//! 2. 주 소스 레코드로 정규화 키 맵을 구성 (먼저 관측된 레코드 우선)
//! 3. 같은 키의 후속 주 레코드는 비어 있는 필드만 채움
//! 4. 보조 레코드는 완전 일치 → 포함 관계 순으로 결합, 실패 시 버림
//!
//! 출력 순서는 정렬된 주 소스 패스에서 키가 처음 관측된 순서입니다.

use ipo_core::{ListingFields, RawRecord, SourceId, SourceRole};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::normalize::{normalize, MatchPolicy};
use crate::provider::SourceResult;

/// 병합된 레코드 (상태 분류 전).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledListing {
    /// 처음 관측된 표시용 이름
    pub name: String,
    /// 정규화 키
    pub key: String,
    /// 소스 원본 상태 문자열 (처음 관측된 값)
    pub raw_status: Option<String>,
    pub fields: ListingFields,
    pub sources: BTreeSet<SourceId>,
}

impl ReconciledListing {
    fn seed(key: String, source: &SourceId, record: &RawRecord) -> Self {
        Self {
            name: record.name.clone(),
            key,
            raw_status: record.status.clone(),
            fields: record.fields.clone(),
            sources: BTreeSet::from([source.clone()]),
        }
    }

    fn absorb(&mut self, source: &SourceId, status: Option<&String>, fields: &ListingFields) {
        if self.raw_status.is_none() {
            self.raw_status = status.cloned();
        }
        self.fields.fill_missing(fields);
        self.sources.insert(source.clone());
    }
}

/// 병합 통계.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// 입력 레코드 수 (성공한 소스만)
    pub raw_records: usize,
    /// 기존 레코드에 병합된 주 레코드 수
    pub merged_duplicates: usize,
    /// 키가 비어 버려진 레코드 수
    pub dropped_empty_key: usize,
    /// 완전 일치로 결합된 보조 레코드 수
    pub signals_exact: usize,
    /// 포함 관계로 결합된 보조 레코드 수
    pub signals_containment: usize,
    /// 결합 대상이 없어 버려진 보조 레코드 수
    pub signals_dropped: usize,
}

/// Reconciler 출력.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub listings: Vec<ReconciledListing>,
    pub report: ReconcileReport,
}

/// 소스 결과를 병합합니다.
///
/// 실패한 소스는 무시합니다. 같은 입력에 대해서는 완료 순서와 관계없이
/// 항상 같은 출력을 생성합니다.
pub fn reconcile(results: &[SourceResult]) -> Reconciliation {
    let mut ordered: Vec<&SourceResult> = results.iter().filter(|r| r.outcome.is_ok()).collect();
    ordered.sort_by(|a, b| (a.priority, &a.source).cmp(&(b.priority, &b.source)));

    let mut listings: Vec<ReconciledListing> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut report = ReconcileReport::default();

    // 주 소스 패스
    for result in ordered.iter().filter(|r| r.role == SourceRole::Primary) {
        for record in result.records() {
            report.raw_records += 1;
            let key = normalize(&record.name);
            if key.is_empty() {
                warn!(source = %result.source, name = %record.name, "정규화 키가 비어 레코드 제외");
                report.dropped_empty_key += 1;
                continue;
            }

            match index.get(&key) {
                Some(&i) => {
                    listings[i].absorb(&result.source, record.status.as_ref(), &record.fields);
                    report.merged_duplicates += 1;
                }
                None => {
                    index.insert(key.clone(), listings.len());
                    listings.push(ReconciledListing::seed(key, &result.source, record));
                }
            }
        }
    }

    // 보조 신호 패스
    for result in ordered.iter().filter(|r| r.role == SourceRole::Auxiliary) {
        for record in result.records() {
            report.raw_records += 1;
            let key = normalize(&record.name);

            let target = match index.get(&key) {
                Some(&i) => {
                    report.signals_exact += 1;
                    Some(i)
                }
                None => {
                    let found = listings
                        .iter()
                        .position(|l| MatchPolicy::Containment.matches(&l.key, &key));
                    if found.is_some() {
                        report.signals_containment += 1;
                    }
                    found
                }
            };

            match target {
                Some(i) => {
                    debug!(
                        source = %result.source,
                        signal = %record.name,
                        listing = %listings[i].name,
                        "보조 신호 결합"
                    );
                    // 보조 소스의 상태 문자열은 사용하지 않음
                    listings[i].absorb(&result.source, None, &record.fields);
                }
                None => {
                    warn!(source = %result.source, name = %record.name, "결합 대상 없는 보조 신호 제외");
                    report.signals_dropped += 1;
                }
            }
        }
    }

    Reconciliation { listings, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(id: &str, role: SourceRole, priority: u8, records: Vec<RawRecord>) -> SourceResult {
        SourceResult {
            source: SourceId::new(id),
            role,
            priority,
            outcome: Ok(records),
            elapsed: Duration::ZERO,
        }
    }

    fn raw(id: &str, name: &str) -> RawRecord {
        RawRecord::new(SourceId::new(id), name)
    }

    #[test]
    fn test_abc_example() {
        let a = result(
            "a",
            SourceRole::Primary,
            0,
            vec![raw("a", "ABC Ltd")
                .with_status("Upcoming")
                .with_fields(ListingFields {
                    issue_open_date: Some("10 Oct".into()),
                    ..Default::default()
                })],
        );
        let b = result(
            "b",
            SourceRole::Auxiliary,
            10,
            vec![raw("b", "ABC").with_fields(ListingFields {
                gmp: Some("+45".into()),
                ..Default::default()
            })],
        );

        let out = reconcile(&[b, a]);
        assert_eq!(out.listings.len(), 1);
        let abc = &out.listings[0];
        assert_eq!(abc.name, "ABC Ltd");
        assert_eq!(abc.key, "abc");
        assert_eq!(abc.raw_status.as_deref(), Some("Upcoming"));
        assert_eq!(abc.fields.issue_open_date.as_deref(), Some("10 Oct"));
        assert_eq!(abc.fields.gmp.as_deref(), Some("+45"));
        assert_eq!(abc.sources.len(), 2);
        assert_eq!(out.report.signals_exact, 1);
    }

    #[test]
    fn test_first_writer_wins_by_priority() {
        let high = result(
            "high",
            SourceRole::Primary,
            0,
            vec![raw("high", "XYZ Ltd").with_fields(ListingFields {
                price_band: Some("95-100".into()),
                ..Default::default()
            })],
        );
        let low = result(
            "low",
            SourceRole::Primary,
            1,
            vec![raw("low", "XYZ Limited IPO")
                .with_status("Open")
                .with_fields(ListingFields {
                    price_band: Some("90-95".into()),
                    lot_size: Some("150".into()),
                    ..Default::default()
                })],
        );

        // 도착 순서가 달라도 결과는 동일
        let forward = reconcile(&[high.clone(), low.clone()]);
        let backward = reconcile(&[low, high]);
        assert_eq!(forward.listings, backward.listings);

        let xyz = &forward.listings[0];
        assert_eq!(xyz.name, "XYZ Ltd");
        assert_eq!(xyz.fields.price_band.as_deref(), Some("95-100"));
        assert_eq!(xyz.fields.lot_size.as_deref(), Some("150"));
        // 첫 레코드에 상태가 없으면 후속 레코드의 상태로 채움
        assert_eq!(xyz.raw_status.as_deref(), Some("Open"));
        assert_eq!(forward.report.merged_duplicates, 1);
    }

    #[test]
    fn test_containment_join_and_drop() {
        let primary = result(
            "p",
            SourceRole::Primary,
            0,
            vec![raw("p", "Neotech Labs Ltd"), raw("p", "Olive Foods")],
        );
        let aux = result(
            "gmp",
            SourceRole::Auxiliary,
            10,
            vec![
                raw("gmp", "Neotech").with_fields(ListingFields {
                    gmp: Some("+12".into()),
                    ..Default::default()
                }),
                raw("gmp", "Unrelated Co").with_fields(ListingFields {
                    gmp: Some("+1".into()),
                    ..Default::default()
                }),
            ],
        );

        let out = reconcile(&[primary, aux]);
        assert_eq!(out.listings.len(), 2);
        assert_eq!(out.listings[0].fields.gmp.as_deref(), Some("+12"));
        assert!(out.listings[1].fields.gmp.is_none());
        assert_eq!(out.report.signals_containment, 1);
        assert_eq!(out.report.signals_dropped, 1);
    }

    #[test]
    fn test_auxiliary_never_creates_records() {
        let aux = result("gmp", SourceRole::Auxiliary, 10, vec![raw("gmp", "ABC")]);
        let out = reconcile(&[aux]);
        assert!(out.listings.is_empty());
        assert_eq!(out.report.signals_dropped, 1);
    }

    #[test]
    fn test_empty_key_dropped_and_failures_ignored() {
        let ok = result("p", SourceRole::Primary, 0, vec![raw("p", "IPO Ltd"), raw("p", "ABC")]);
        let failed = SourceResult {
            source: SourceId::new("down"),
            role: SourceRole::Primary,
            priority: 1,
            outcome: Err(crate::error::SourceError::RateLimited),
            elapsed: Duration::ZERO,
        };

        let out = reconcile(&[failed, ok]);
        assert_eq!(out.listings.len(), 1);
        assert_eq!(out.report.dropped_empty_key, 1);
    }

    #[test]
    fn test_containment_never_merges_primaries() {
        let p = result(
            "p",
            SourceRole::Primary,
            0,
            vec![raw("p", "ABC"), raw("p", "ABC Foods")],
        );
        let out = reconcile(&[p]);
        assert_eq!(out.listings.len(), 2);
    }
}
