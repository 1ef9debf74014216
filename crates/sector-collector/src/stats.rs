//! 수집 통계 구조체.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use sector_core::{FrequencyTier, RefreshMode};

/// 단계 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    /// 이미 있는 종목도 덮어쓰기 (전체 재구축의 우선 소스)
    Overwrite,
    /// 없는 종목만 채우기
    GapFill,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseKind::Overwrite => write!(f, "overwrite"),
            PhaseKind::GapFill => write!(f, "gap_fill"),
        }
    }
}

/// 단계별 통계
#[derive(Debug, Clone, Serialize)]
pub struct PhaseStats {
    /// 소스 이름
    pub source: String,
    /// 단계 종류
    pub kind: PhaseKind,
    /// 소스가 반환한 종목 수
    pub listed: usize,
    /// 권리락(-RE) 종목 제외 수
    pub rights_filtered: usize,
    /// 중복 목록 제외 수
    pub duplicates: usize,
    /// 이미 데이터셋에 있어 건너뛴 수
    pub already_present: usize,
    /// 분류 수집 성공 수
    pub fetched: usize,
    /// 거래소에 분류 없음
    pub not_found: usize,
    /// 그 외 실패 (재시도 소진 포함)
    pub failed: usize,
    /// 배치 flush 횟수
    pub flushes: usize,
    /// 목록 조회 실패 메시지
    pub enumeration_error: Option<String>,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl PhaseStats {
    /// 새 통계 객체 생성
    pub fn new(source: impl Into<String>, kind: PhaseKind) -> Self {
        Self {
            source: source.into(),
            kind,
            listed: 0,
            rights_filtered: 0,
            duplicates: 0,
            already_present: 0,
            fetched: 0,
            not_found: 0,
            failed: 0,
            flushes: 0,
            enumeration_error: None,
            elapsed: Duration::ZERO,
        }
    }

    /// 실제로 조회를 시도한 종목 수
    pub fn attempted(&self) -> usize {
        self.fetched + self.not_found + self.failed
    }

    /// 목록 조회가 성공했는지 여부
    pub fn enumerated(&self) -> bool {
        self.enumeration_error.is_none()
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self) {
        if let Some(error) = &self.enumeration_error {
            tracing::error!(
                source = %self.source,
                phase = %self.kind,
                error = %error,
                "단계 실패: 종목 목록 조회 불가"
            );
            return;
        }

        tracing::info!(
            source = %self.source,
            phase = %self.kind,
            listed = self.listed,
            rights_filtered = self.rights_filtered,
            duplicates = self.duplicates,
            already_present = self.already_present,
            fetched = self.fetched,
            not_found = self.not_found,
            failed = self.failed,
            flushes = self.flushes,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "단계 완료"
        );
    }
}

/// 한 번의 갱신 실행 결과
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub mode: RefreshMode,
    pub frequency: FrequencyTier,
    pub started_at: DateTime<Utc>,
    /// 실행 순서대로의 단계 통계
    pub phases: Vec<PhaseStats>,
    /// 최종 데이터셋 종목 수
    pub records: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RefreshReport {
    pub fn new(mode: RefreshMode, frequency: FrequencyTier) -> Self {
        Self {
            mode,
            frequency,
            started_at: Utc::now(),
            phases: Vec::new(),
            records: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// 모든 단계의 목록 조회가 성공했는지 여부
    pub fn is_success(&self) -> bool {
        self.phases.iter().all(PhaseStats::enumerated)
    }

    /// 모든 단계의 수집 성공 수 합계
    pub fn total_fetched(&self) -> usize {
        self.phases.iter().map(|p| p.fetched).sum()
    }

    /// 모든 단계의 건너뛴(실패+없음) 수 합계
    pub fn total_skipped(&self) -> usize {
        self.phases.iter().map(|p| p.not_found + p.failed).sum()
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self) {
        for phase in &self.phases {
            phase.log_summary();
        }

        tracing::info!(
            mode = %self.mode,
            frequency = %self.frequency,
            started_at = %self.started_at.to_rfc3339(),
            records = self.records,
            fetched = self.total_fetched(),
            skipped = self.total_skipped(),
            success = self.is_success(),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "갱신 완료"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_fails_when_any_phase_failed_enumeration() {
        let mut report = RefreshReport::new(RefreshMode::Full, FrequencyTier::Weekly);

        let mut ok = PhaseStats::new("nse", PhaseKind::Overwrite);
        ok.fetched = 3;
        ok.not_found = 1;
        report.phases.push(ok);
        assert!(report.is_success());

        let mut broken = PhaseStats::new("bse", PhaseKind::GapFill);
        broken.enumeration_error = Some("HTTP 503".to_string());
        report.phases.push(broken);

        assert!(!report.is_success());
        assert_eq!(report.total_fetched(), 3);
        assert_eq!(report.total_skipped(), 1);
    }

    #[test]
    fn test_attempted_counts_every_fetch_outcome() {
        let mut stats = PhaseStats::new("bse", PhaseKind::GapFill);
        stats.fetched = 5;
        stats.not_found = 2;
        stats.failed = 1;
        stats.already_present = 10;
        assert_eq!(stats.attempted(), 8);
    }
}
