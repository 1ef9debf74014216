//! 업종 분류 병합 모듈.
//!
//! 두 소스를 순서대로 돌며 데이터셋을 채웁니다.
//!
//! | 모드 | 1단계 | 2단계 |
//! |------|-------|-------|
//! | 전체 재구축 | 우선 소스, 덮어쓰기 | 보조 소스, 빈 곳만 |
//! | 증분 갱신 | 보조 소스, 빈 곳만 | 우선 소스, 빈 곳만 |

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use sector_core::{phase_span, with_retry, RefreshMode, RefreshRequest, RetryConfig};
use sector_data::{BseSource, ClassificationSource, ClassificationStore, NseSource};

use crate::config::PrecedenceSource;
use crate::stats::{PhaseKind, PhaseStats, RefreshReport};
use crate::{CollectorConfig, Result};

/// 진행 상황 로그 간격 (조회 건수)
const PROGRESS_LOG_INTERVAL: usize = 100;

/// 모드에 맞게 저장소를 엽니다.
///
/// 전체 재구축은 기존 파일을 읽지 않으므로 손상된 파일도 복구할 수 있습니다.
/// 증분 갱신은 기존 파일을 읽고, 손상되어 있으면 실패합니다.
pub fn open_store(mode: RefreshMode, path: &Path, batch_size: usize) -> Result<ClassificationStore> {
    let store = match mode {
        RefreshMode::Full => ClassificationStore::new(path),
        RefreshMode::Incremental => ClassificationStore::load(path)?,
    };
    Ok(store.with_batch_size(batch_size))
}

/// 업종 분류 병합기.
pub struct Reconciler {
    /// 전체 재구축 시 우선권을 갖는 소스 (Source-B)
    precedence: Arc<dyn ClassificationSource>,
    /// 빈 곳을 채우는 소스 (Source-A)
    secondary: Arc<dyn ClassificationSource>,
}

impl Reconciler {
    pub fn new(
        precedence: Arc<dyn ClassificationSource>,
        secondary: Arc<dyn ClassificationSource>,
    ) -> Self {
        Self {
            precedence,
            secondary,
        }
    }

    /// 설정으로부터 NSE/BSE 어댑터를 만들어 병합기를 생성합니다.
    pub fn from_config(config: &CollectorConfig) -> Result<Self> {
        let options = config.source.options();
        let nse: Arc<dyn ClassificationSource> = Arc::new(NseSource::with_urls(
            &config.source.nse_base_url,
            &config.source.nse_archive_url,
            options.clone(),
        )?);
        let bse: Arc<dyn ClassificationSource> = Arc::new(BseSource::with_api_url(
            &config.source.bse_api_url,
            options,
        )?);

        Ok(match config.precedence {
            PrecedenceSource::Nse => Self::new(nse, bse),
            PrecedenceSource::Bse => Self::new(bse, nse),
        })
    }

    /// 갱신 실행.
    ///
    /// 종목별 실패와 목록 조회 실패는 통계에 남기고 계속 진행합니다.
    /// 저장소 에러만 즉시 반환합니다.
    pub async fn refresh(
        &self,
        request: RefreshRequest,
        store: &mut ClassificationStore,
        retry: &RetryConfig,
    ) -> Result<RefreshReport> {
        let start = Instant::now();
        let mut report = RefreshReport::new(request.mode, request.frequency);

        tracing::info!(
            mode = %request.mode,
            frequency = %request.frequency,
            precedence = self.precedence.name(),
            existing = store.len(),
            max_attempts = retry.max_attempts,
            "업종 분류 갱신 시작"
        );

        let plan: [(&dyn ClassificationSource, PhaseKind); 2] = match request.mode {
            RefreshMode::Full => {
                store.clear();
                [
                    (self.precedence.as_ref(), PhaseKind::Overwrite),
                    (self.secondary.as_ref(), PhaseKind::GapFill),
                ]
            }
            RefreshMode::Incremental => [
                (self.secondary.as_ref(), PhaseKind::GapFill),
                (self.precedence.as_ref(), PhaseKind::GapFill),
            ],
        };

        for (step, (source, kind)) in plan.into_iter().enumerate() {
            tracing::info!("Step {}/2: {} ({})", step + 1, source.name(), kind);
            let stats = reconcile_phase(request.mode, source, kind, store, retry).await?;
            report.phases.push(stats);
        }

        // 전체 재구축은 목록을 하나라도 받았으면 결과가 비어 있어도 덮어씀.
        // 그 외에는 변경이 없으면 기존 파일을 그대로 둠
        let rebuilt = request.mode == RefreshMode::Full
            && report.phases.iter().any(PhaseStats::enumerated);
        if rebuilt || store.pending() > 0 || !store.path().exists() {
            store.flush()?;
        }

        report.records = store.len();
        report.elapsed = start.elapsed();
        Ok(report)
    }
}

/// 한 소스에 대해 목록 조회 → 필터 → 분류 수집 → 저장을 수행합니다.
async fn reconcile_phase(
    mode: RefreshMode,
    source: &dyn ClassificationSource,
    kind: PhaseKind,
    store: &mut ClassificationStore,
    retry: &RetryConfig,
) -> Result<PhaseStats> {
    let span = phase_span!(mode, kind, source.name());
    run_phase(source, kind, store, retry).instrument(span).await
}

async fn run_phase(
    source: &dyn ClassificationSource,
    kind: PhaseKind,
    store: &mut ClassificationStore,
    retry: &RetryConfig,
) -> Result<PhaseStats> {
    let start = Instant::now();
    let name = source.name();
    let mut stats = PhaseStats::new(name, kind);

    let listing_label = format!("{}:list_symbols", name);
    let listings = match with_retry(retry, &listing_label, || source.list_symbols()).await {
        Ok(listings) => listings,
        Err(e) => {
            tracing::error!(
                source = name,
                phase = %kind,
                error_kind = e.kind(),
                error = %e,
                "종목 목록 조회 실패, 단계 중단"
            );
            stats.enumeration_error = Some(e.to_string());
            stats.elapsed = start.elapsed();
            return Ok(stats);
        }
    };

    stats.listed = listings.len();
    tracing::info!(count = stats.listed, "종목 목록 조회 완료");

    let mut seen: HashSet<&str> = HashSet::with_capacity(listings.len());

    for listing in &listings {
        if listing.is_rights_entitlement() {
            stats.rights_filtered += 1;
            tracing::debug!(symbol = %listing.symbol, "권리락 종목 제외");
            continue;
        }

        if !seen.insert(listing.symbol.as_str()) {
            stats.duplicates += 1;
            continue;
        }

        if kind == PhaseKind::GapFill && store.contains(&listing.symbol) {
            stats.already_present += 1;
            continue;
        }

        let label = format!("{}:{}", name, listing.symbol);
        match with_retry(retry, &label, || source.fetch_classification(listing)).await {
            Ok(classification) => {
                store.upsert(&listing.symbol, classification);
                stats.fetched += 1;

                if store.flush_if_due()? {
                    stats.flushes += 1;
                    tracing::debug!(records = store.len(), "배치 저장");
                }
            }
            Err(e) if e.is_not_found() => {
                stats.not_found += 1;
                tracing::info!(
                    symbol = %listing.symbol,
                    source = name,
                    phase = %kind,
                    error_kind = e.kind(),
                    "업종 정보 없음, 건너뜀"
                );
            }
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(
                    symbol = %listing.symbol,
                    source = name,
                    phase = %kind,
                    error_kind = e.kind(),
                    error = %e,
                    "업종 수집 실패, 건너뜀"
                );
            }
        }

        let attempted = stats.attempted();
        if attempted % PROGRESS_LOG_INTERVAL == 0 {
            tracing::info!(
                attempted,
                fetched = stats.fetched,
                records = store.len(),
                "진행 상황"
            );
        }
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}
