//! 파이프라인 실행 통계.

use ipo_core::ListingsResponse;
use serde::Serialize;
use std::time::Duration;

use crate::provider::SourceResult;
use crate::reconcile::ReconcileReport;

/// 재계산 1회 통계
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// 호출한 소스 수
    pub sources_attempted: usize,
    /// 레코드를 반환한 소스 수
    pub sources_succeeded: usize,
    /// 성공했지만 빈 결과를 반환한 소스 수
    pub sources_empty: usize,
    /// 실패한 소스 수
    pub sources_failed: usize,
    /// 입력 원본 레코드 수
    pub raw_records: usize,
    /// 병합 후 레코드 수
    pub canonical_records: usize,
    pub upcoming: usize,
    pub current: usize,
    pub listed: usize,
    /// 수익률이 채워진 레코드 수
    pub enriched: usize,
    /// 결합 대상 없이 버려진 보조 신호 수
    pub signals_dropped: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 소스 결과 집계.
    pub fn record_sources(&mut self, results: &[SourceResult]) {
        for result in results {
            self.sources_attempted += 1;
            match &result.outcome {
                Ok(records) if records.is_empty() => self.sources_empty += 1,
                Ok(_) => self.sources_succeeded += 1,
                Err(_) => self.sources_failed += 1,
            }
        }
    }

    /// 병합 통계 반영.
    pub fn record_reconcile(&mut self, report: &ReconcileReport, canonical: usize) {
        self.raw_records = report.raw_records;
        self.signals_dropped = report.signals_dropped;
        self.canonical_records = canonical;
    }

    /// 최종 응답 반영.
    pub fn record_response(&mut self, response: &ListingsResponse) {
        self.upcoming = response.upcoming.len();
        self.current = response.current.len();
        self.listed = response.listed.len();
        self.enriched = response
            .listed
            .iter()
            .filter(|r| r.performance.is_some())
            .count();
    }

    /// 소스 성공률 (%)
    pub fn success_rate(&self) -> f64 {
        if self.sources_attempted == 0 {
            0.0
        } else {
            (self.sources_succeeded as f64 / self.sources_attempted as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, dataset: &str) {
        tracing::info!(
            dataset = dataset,
            sources = self.sources_attempted,
            succeeded = self.sources_succeeded,
            empty = self.sources_empty,
            failed = self.sources_failed,
            raw_records = self.raw_records,
            canonical = self.canonical_records,
            upcoming = self.upcoming,
            current = self.current,
            listed = self.listed,
            enriched = self.enriched,
            signals_dropped = self.signals_dropped,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "데이터셋 재계산 완료"
        );
    }
}
