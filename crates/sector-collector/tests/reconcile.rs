//! 병합기 통합 테스트.
//!
//! 가짜 소스로 우선순위, 빈 곳 채우기, 재시도 경계, 배치 저장을 검증합니다.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use sector_collector::modules::{open_store, Reconciler};
use sector_collector::CollectorError;
use sector_core::{
    Classification, FrequencyTier, RefreshMode, RefreshRequest, RetryConfig, SourceError,
    SourceResult, SymbolListing,
};
use sector_data::{ClassificationSource, ClassificationStore, StoreError};

const MAX_ATTEMPTS: u32 = 4;

fn retry() -> RetryConfig {
    RetryConfig::new(
        MAX_ATTEMPTS,
        Duration::from_millis(10),
        Duration::from_millis(40),
    )
}

fn class(tag: &str) -> Classification {
    Classification::new(
        format!("{tag}-macro"),
        format!("{tag}-sector"),
        format!("{tag}-industry"),
        format!("{tag}-basic"),
    )
}

fn http(status: u16) -> SourceError {
    SourceError::from_status(status, "mock")
}

/// 호출 횟수를 기록하는 가짜 소스.
struct MockSource {
    name: &'static str,
    listing: SourceResult<Vec<SymbolListing>>,
    records: HashMap<String, Classification>,
    /// 순서대로 반환할 실패 (소진되면 records 조회)
    scripted_failures: HashMap<String, Vec<SourceError>>,
    /// 매번 반환할 실패
    persistent_failures: HashMap<String, SourceError>,
    fetch_calls: Mutex<HashMap<String, u32>>,
    list_calls: AtomicU32,
    /// 조회 시점마다 디스크의 레코드 수를 기록
    watched_file: Option<PathBuf>,
    observed_on_disk: Mutex<Vec<usize>>,
}

impl MockSource {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            listing: Ok(Vec::new()),
            records: HashMap::new(),
            scripted_failures: HashMap::new(),
            persistent_failures: HashMap::new(),
            fetch_calls: Mutex::new(HashMap::new()),
            list_calls: AtomicU32::new(0),
            watched_file: None,
            observed_on_disk: Mutex::new(Vec::new()),
        }
    }

    /// 목록에 올리고 분류도 제공하는 종목
    fn with(mut self, symbol: &str, record: Classification) -> Self {
        self.list_only(symbol);
        self.records.insert(symbol.to_string(), record);
        self
    }

    /// 목록에만 있고 분류는 없는 종목
    fn listed(mut self, symbol: &str) -> Self {
        self.list_only(symbol);
        self
    }

    fn list_only(&mut self, symbol: &str) {
        if let Ok(listings) = &mut self.listing {
            listings.push(SymbolListing::new(symbol, format!("key-{symbol}")));
        }
    }

    fn failing_list(mut self, error: SourceError) -> Self {
        self.listing = Err(error);
        self
    }

    fn scripted(mut self, symbol: &str, failures: Vec<SourceError>) -> Self {
        self.scripted_failures.insert(symbol.to_string(), failures);
        self
    }

    fn always_failing(mut self, symbol: &str, error: SourceError) -> Self {
        self.list_only(symbol);
        self.persistent_failures.insert(symbol.to_string(), error);
        self
    }

    fn watching_disk(mut self, path: &Path) -> Self {
        self.watched_file = Some(path.to_path_buf());
        self
    }

    fn calls(&self, symbol: &str) -> u32 {
        self.fetch_calls
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .unwrap_or(0)
    }

    fn total_calls(&self) -> u32 {
        self.fetch_calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ClassificationSource for MockSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn list_symbols(&self) -> SourceResult<Vec<SymbolListing>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.listing.clone()
    }

    async fn fetch_classification(&self, listing: &SymbolListing) -> SourceResult<Classification> {
        let symbol = listing.symbol.as_str();
        assert_eq!(listing.lookup_key, format!("key-{symbol}"));

        if let Some(path) = &self.watched_file {
            let on_disk = ClassificationStore::load(path).unwrap().len();
            self.observed_on_disk.lock().unwrap().push(on_disk);
        }

        let call = {
            let mut calls = self.fetch_calls.lock().unwrap();
            let count = calls.entry(symbol.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        if let Some(error) = self.persistent_failures.get(symbol) {
            return Err(error.clone());
        }
        if let Some(error) = self
            .scripted_failures
            .get(symbol)
            .and_then(|failures| failures.get(call as usize - 1))
        {
            return Err(error.clone());
        }

        self.records
            .get(symbol)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(symbol.to_string()))
    }
}

struct Harness {
    _dir: TempDir,
    path: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("industry_data.json");
        Self { _dir: dir, path }
    }

    fn store(&self, mode: RefreshMode) -> ClassificationStore {
        open_store(mode, &self.path, 50).unwrap()
    }

    fn seed(&self, records: &[(&str, Classification)]) {
        let mut store = ClassificationStore::new(&self.path);
        for (symbol, record) in records {
            store.upsert(symbol, record.clone());
        }
        store.flush().unwrap();
    }

    fn reload(&self) -> ClassificationStore {
        ClassificationStore::load(&self.path).unwrap()
    }
}

async fn run(
    precedence: &Arc<MockSource>,
    secondary: &Arc<MockSource>,
    request: RefreshRequest,
    store: &mut ClassificationStore,
) -> sector_collector::RefreshReport {
    let reconciler = Reconciler::new(precedence.clone(), secondary.clone());
    reconciler.refresh(request, store, &retry()).await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_full_refresh_precedence_then_gap_fill() {
    let h = Harness::new();
    let b = Arc::new(MockSource::new("nse").with("AAA", class("x")));
    let a = Arc::new(
        MockSource::new("bse")
            .with("AAA", class("y"))
            .with("BBB", class("z")),
    );

    let mut store = h.store(RefreshMode::Full);
    let report = run(&b, &a, RefreshRequest::full(FrequencyTier::Weekly), &mut store).await;

    let saved = h.reload();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved.get("AAA"), Some(&class("x")));
    assert_eq!(saved.get("BBB"), Some(&class("z")));

    // 우선 소스에 있는 종목은 보조 소스에서 조회하지 않음
    assert_eq!(a.calls("AAA"), 0);
    assert_eq!(a.calls("BBB"), 1);

    assert!(report.is_success());
    assert_eq!(report.records, 2);
    assert_eq!(report.phases[0].source, "nse");
    assert_eq!(report.phases[1].already_present, 1);
}

#[tokio::test(start_paused = true)]
async fn test_full_refresh_discards_previous_dataset() {
    let h = Harness::new();
    h.seed(&[("OLD", class("stale")), ("AAA", class("stale"))]);

    let b = Arc::new(MockSource::new("nse").with("AAA", class("fresh")));
    let a = Arc::new(MockSource::new("bse"));

    let mut store = h.store(RefreshMode::Full);
    run(&b, &a, RefreshRequest::full(FrequencyTier::Daily), &mut store).await;

    let saved = h.reload();
    assert!(!saved.contains("OLD"));
    assert_eq!(saved.get("AAA"), Some(&class("fresh")));
}

#[tokio::test(start_paused = true)]
async fn test_rights_entitlements_never_fetched() {
    let h = Harness::new();
    let b = Arc::new(
        MockSource::new("nse")
            .with("XYZ-RE", class("rights"))
            .with("XYZ", class("x")),
    );
    let a = Arc::new(MockSource::new("bse").with("ABC-RE", class("rights")));

    let mut store = h.store(RefreshMode::Full);
    let report = run(&b, &a, RefreshRequest::full(FrequencyTier::Weekly), &mut store).await;

    assert_eq!(b.calls("XYZ-RE"), 0);
    assert_eq!(a.calls("ABC-RE"), 0);
    let saved = h.reload();
    assert!(!saved.contains("XYZ-RE"));
    assert!(!saved.contains("ABC-RE"));
    assert!(saved.contains("XYZ"));
    assert_eq!(report.phases[0].rights_filtered, 1);
    assert_eq!(report.phases[1].rights_filtered, 1);
}

#[tokio::test(start_paused = true)]
async fn test_incremental_only_fills_gaps() {
    let h = Harness::new();
    h.seed(&[("AAA", class("old"))]);

    let b = Arc::new(
        MockSource::new("nse")
            .with("AAA", class("new-b"))
            .with("CCC", class("c-from-b"))
            .with("DDD", class("d")),
    );
    let a = Arc::new(
        MockSource::new("bse")
            .with("AAA", class("new-a"))
            .with("CCC", class("c-from-a")),
    );

    let mut store = h.store(RefreshMode::Incremental);
    let report = run(
        &b,
        &a,
        RefreshRequest::incremental(FrequencyTier::Weekly),
        &mut store,
    )
    .await;

    let saved = h.reload();
    assert_eq!(saved.get("AAA"), Some(&class("old")));
    // 증분 모드는 보조 소스가 먼저 실행됨
    assert_eq!(saved.get("CCC"), Some(&class("c-from-a")));
    assert_eq!(saved.get("DDD"), Some(&class("d")));

    assert_eq!(a.calls("AAA"), 0);
    assert_eq!(b.calls("AAA"), 0);
    assert_eq!(b.calls("CCC"), 0);
    assert_eq!(report.phases[0].source, "bse");
    assert_eq!(report.phases[1].source, "nse");
}

#[tokio::test(start_paused = true)]
async fn test_incremental_is_idempotent() {
    let h = Harness::new();
    let b = Arc::new(
        MockSource::new("nse")
            .with("AAA", class("a"))
            .listed("GONE"),
    );
    let a = Arc::new(MockSource::new("bse").with("BBB", class("b")));
    let request = RefreshRequest::incremental(FrequencyTier::Weekly);

    let mut store = h.store(RefreshMode::Incremental);
    run(&b, &a, request, &mut store).await;
    let first = std::fs::read(&h.path).unwrap();
    let calls_after_first = b.total_calls() + a.total_calls();

    let mut store = h.store(RefreshMode::Incremental);
    let report = run(&b, &a, request, &mut store).await;
    let second = std::fs::read(&h.path).unwrap();

    assert_eq!(first, second);
    // 두 번째 실행은 분류가 없는 종목만 다시 조회
    assert_eq!(b.total_calls() + a.total_calls() - calls_after_first, 1);
    assert_eq!(report.phases[0].already_present, 1);
    assert_eq!(report.phases[1].already_present, 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_boundaries_per_symbol() {
    let h = Harness::new();
    let b = Arc::new(
        MockSource::new("nse")
            .listed("MISSING")
            .always_failing("DOWN", http(503))
            .always_failing("FORBIDDEN", http(403))
            .always_failing("GARBLED", SourceError::Parse("html".into()))
            .with("FLAKY", class("f"))
            .scripted(
                "FLAKY",
                vec![SourceError::Timeout("t".into()), http(429)],
            ),
    );
    let a = Arc::new(MockSource::new("bse"));

    let mut store = h.store(RefreshMode::Full);
    let report = run(&b, &a, RefreshRequest::full(FrequencyTier::Weekly), &mut store).await;

    assert_eq!(b.calls("MISSING"), 1);
    assert_eq!(b.calls("FORBIDDEN"), 1);
    assert_eq!(b.calls("GARBLED"), 1);
    assert_eq!(b.calls("DOWN"), MAX_ATTEMPTS);
    assert_eq!(b.calls("FLAKY"), 3);

    let saved = h.reload();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved.get("FLAKY"), Some(&class("f")));

    let phase = &report.phases[0];
    assert_eq!(phase.fetched, 1);
    assert_eq!(phase.not_found, 1);
    assert_eq!(phase.failed, 3);
    // 종목별 실패는 실행 실패가 아님
    assert!(report.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_enumeration_failure_is_fatal_for_phase_only() {
    let h = Harness::new();
    let b = Arc::new(MockSource::new("nse").failing_list(http(503)));
    let a = Arc::new(MockSource::new("bse").with("BBB", class("b")));

    let mut store = h.store(RefreshMode::Full);
    let report = run(&b, &a, RefreshRequest::full(FrequencyTier::Weekly), &mut store).await;

    assert_eq!(b.list_calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    assert!(report.phases[0].enumeration_error.is_some());
    assert!(report.phases[1].enumerated());
    assert!(!report.is_success());

    assert_eq!(h.reload().get("BBB"), Some(&class("b")));
}

#[tokio::test(start_paused = true)]
async fn test_failed_full_refresh_keeps_existing_file() {
    let h = Harness::new();
    h.seed(&[("AAA", class("kept"))]);
    let before = std::fs::read(&h.path).unwrap();

    let b = Arc::new(MockSource::new("nse").failing_list(http(403)));
    let a = Arc::new(MockSource::new("bse").failing_list(SourceError::Network("down".into())));

    let mut store = h.store(RefreshMode::Full);
    let report = run(&b, &a, RefreshRequest::full(FrequencyTier::Weekly), &mut store).await;

    assert!(!report.is_success());
    assert_eq!(b.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(std::fs::read(&h.path).unwrap(), before);
}

#[tokio::test(start_paused = true)]
async fn test_full_refresh_without_records_still_replaces_dataset() {
    let h = Harness::new();
    h.seed(&[("OLD", class("stale"))]);

    let b = Arc::new(MockSource::new("nse").listed("XXX"));
    let a = Arc::new(MockSource::new("bse").always_failing("YYY", http(403)));

    let mut store = h.store(RefreshMode::Full);
    let report = run(&b, &a, RefreshRequest::full(FrequencyTier::Weekly), &mut store).await;

    assert!(report.is_success());
    assert_eq!(report.records, 0);
    let saved = h.reload();
    assert!(!saved.contains("OLD"));
    assert!(saved.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_full_refresh_with_one_listed_phase_replaces_dataset() {
    let h = Harness::new();
    h.seed(&[("OLD", class("stale"))]);

    let b = Arc::new(MockSource::new("nse").failing_list(http(403)));
    let a = Arc::new(MockSource::new("bse").listed("YYY"));

    let mut store = h.store(RefreshMode::Full);
    let report = run(&b, &a, RefreshRequest::full(FrequencyTier::Weekly), &mut store).await;

    assert!(!report.is_success());
    assert!(!h.reload().contains("OLD"));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_listings_fetched_once() {
    let h = Harness::new();
    let b = Arc::new(
        MockSource::new("nse")
            .with("AAA", class("a"))
            .with("AAA", class("a")),
    );
    let a = Arc::new(MockSource::new("bse"));

    let mut store = h.store(RefreshMode::Full);
    let report = run(&b, &a, RefreshRequest::full(FrequencyTier::Weekly), &mut store).await;

    assert_eq!(b.calls("AAA"), 1);
    assert_eq!(report.phases[0].duplicates, 1);
}

#[tokio::test(start_paused = true)]
async fn test_batches_reach_disk_during_run() {
    let h = Harness::new();
    let symbols: Vec<String> = (0..7).map(|i| format!("SYM{i}")).collect();

    let mut source = MockSource::new("nse").watching_disk(&h.path);
    for symbol in &symbols {
        source = source.with(symbol, class(symbol));
    }
    let b = Arc::new(source);
    let a = Arc::new(MockSource::new("bse"));

    let mut store = ClassificationStore::new(&h.path).with_batch_size(3);
    let report = run(&b, &a, RefreshRequest::full(FrequencyTier::Weekly), &mut store).await;

    // n번째 조회 시점에 디스크에는 직전 배치까지 저장되어 있음
    assert_eq!(
        *b.observed_on_disk.lock().unwrap(),
        vec![0, 0, 0, 3, 3, 3, 6]
    );
    assert_eq!(report.phases[0].flushes, 2);
    assert_eq!(h.reload().len(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_corrupt_dataset_handling_by_mode() {
    let h = Harness::new();
    std::fs::create_dir_all(h.path.parent().unwrap()).unwrap();
    std::fs::write(&h.path, "{ not json").unwrap();

    let err = open_store(RefreshMode::Incremental, &h.path, 50).unwrap_err();
    assert!(matches!(
        err,
        CollectorError::Store(StoreError::DataCorruption { .. })
    ));
    // 손상된 파일은 그대로 남아 있음
    assert_eq!(std::fs::read_to_string(&h.path).unwrap(), "{ not json");

    // 전체 재구축은 손상된 파일을 복구
    let b = Arc::new(MockSource::new("nse").with("AAA", class("a")));
    let a = Arc::new(MockSource::new("bse"));
    let mut store = h.store(RefreshMode::Full);
    run(&b, &a, RefreshRequest::full(FrequencyTier::Weekly), &mut store).await;

    assert_eq!(h.reload().get("AAA"), Some(&class("a")));
}

#[tokio::test(start_paused = true)]
async fn test_unwritable_dataset_aborts_run() {
    let h = Harness::new();
    // 부모 경로가 파일이면 디렉터리를 만들 수 없음
    let blocker = h.path.parent().unwrap().to_path_buf();
    std::fs::create_dir_all(blocker.parent().unwrap()).unwrap();
    std::fs::write(&blocker, "not a directory").unwrap();

    let b = Arc::new(MockSource::new("nse").with("AAA", class("a")));
    let a = Arc::new(MockSource::new("bse"));
    let reconciler = Reconciler::new(b, a);

    let mut store = ClassificationStore::new(&h.path);
    let err = reconciler
        .refresh(RefreshRequest::full(FrequencyTier::Weekly), &mut store, &retry())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CollectorError::Store(StoreError::Persistence { .. })
    ));
}
