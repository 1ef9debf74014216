//! JSON 파일 기반 분류 저장소.
//!
//! 데이터셋 전체를 메모리에 보관하고, 배치 단위로 파일에 반영합니다.
//!
//! # 파일 형식
//!
//! ```json
//! {
//!   "metadata": ["Macro", "Sector", "Industry", "Basic Industry"],
//!   "data": {
//!     "RELIANCE": ["Energy", "Oil Gas & Consumable Fuels", "Petroleum Products", "Refineries & Marketing"]
//!   }
//! }
//! ```
//!
//! # 주요 기능
//!
//! - **원자적 쓰기**: 같은 디렉토리의 `.tmp` 파일에 쓴 뒤 rename으로 교체
//! - **배치 flush**: N건(기본 50건) 변경마다 저장, 중단 시 최대 한 배치만 유실
//! - **손상 감지**: 해석할 수 없는 파일은 빈 데이터셋으로 덮어쓰지 않고 오류 반환

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use sector_core::{Classification, CLASSIFICATION_SCHEMA};

use crate::error::{Result, StoreError};

/// 기본 flush 배치 크기.
pub const DEFAULT_FLUSH_BATCH_SIZE: usize = 50;

/// 파일에 쓰는 형식.
#[derive(Serialize)]
struct DatasetOut<'a> {
    metadata: [&'static str; 4],
    data: &'a BTreeMap<String, Classification>,
}

/// 파일에서 읽는 형식.
///
/// 이전 도구가 남긴 `null` 항목(알려졌지만 불완전)은 허용하고 누락으로 취급합니다.
#[derive(Deserialize)]
struct DatasetIn {
    metadata: Vec<String>,
    data: BTreeMap<String, Option<Classification>>,
}

/// 종목 → 업종 분류 저장소.
///
/// 데이터셋의 유일한 소유자입니다. 모든 변경은 `&mut self`를 거치므로
/// upsert/flush와 배치 카운트는 항상 단일 작성자 규칙 아래에 있습니다.
#[derive(Debug)]
pub struct ClassificationStore {
    path: PathBuf,
    records: BTreeMap<String, Classification>,
    /// 마지막 flush 이후 변경 건수
    pending: usize,
    batch_size: usize,
}

impl ClassificationStore {
    /// 디스크를 읽지 않고 빈 저장소를 생성합니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: BTreeMap::new(),
            pending: 0,
            batch_size: DEFAULT_FLUSH_BATCH_SIZE,
        }
    }

    /// 저장 파일을 읽어 저장소를 생성합니다.
    ///
    /// - 파일 없음: 빈 데이터셋
    /// - 빈 파일: 빈 데이터셋 (경고)
    /// - 해석 불가 / 스키마 불일치: [`StoreError::DataCorruption`]
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::new(path);

        let content = match fs::read_to_string(&store.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %store.path.display(), "저장 파일 없음, 빈 데이터셋으로 시작");
                return Ok(store);
            }
            Err(e) => return Err(StoreError::corruption(&store.path, e)),
        };

        if content.trim().is_empty() {
            warn!(path = %store.path.display(), "저장 파일이 비어 있음, 빈 데이터셋으로 시작");
            return Ok(store);
        }

        let parsed: DatasetIn = serde_json::from_str(&content)
            .map_err(|e| StoreError::corruption(&store.path, e))?;

        if parsed.metadata.iter().map(String::as_str).ne(CLASSIFICATION_SCHEMA) {
            return Err(StoreError::corruption(
                &store.path,
                format!(
                    "metadata {:?} does not match schema {:?}",
                    parsed.metadata, CLASSIFICATION_SCHEMA
                ),
            ));
        }

        let total = parsed.data.len();
        store.records = parsed
            .data
            .into_iter()
            .filter_map(|(symbol, record)| record.map(|r| (symbol, r)))
            .collect();

        let incomplete = total - store.records.len();
        if incomplete > 0 {
            warn!(incomplete, "불완전(null) 항목은 누락으로 처리");
        }

        info!(
            path = %store.path.display(),
            records = store.records.len(),
            "저장 파일 로드 완료"
        );
        Ok(store)
    }

    /// flush 배치 크기를 설정합니다 (최소 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// 저장 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 마지막 flush 이후 변경 건수
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// 레코드 수
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 종목 존재 여부 (갭 필터에 사용).
    pub fn contains(&self, symbol: &str) -> bool {
        self.records.contains_key(symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&Classification> {
        self.records.get(symbol)
    }

    /// 레코드를 삽입하거나 통째로 교체합니다.
    ///
    /// 동일한 레코드가 이미 있으면 아무것도 하지 않고 `false`를 반환합니다.
    pub fn upsert(&mut self, symbol: &str, record: Classification) -> bool {
        if self.records.get(symbol) == Some(&record) {
            return false;
        }

        self.records.insert(symbol.to_string(), record);
        self.pending += 1;
        true
    }

    /// 메모리의 데이터셋을 비웁니다. 디스크는 다음 flush 전까지 그대로입니다.
    pub fn clear(&mut self) {
        if !self.records.is_empty() {
            self.records.clear();
            self.pending += 1;
        }
    }

    /// 데이터셋 전체를 원자적으로 저장합니다.
    ///
    /// 임시 파일에 쓰고 fsync한 뒤 rename으로 교체하므로, 중간에 실패해도
    /// 기존 파일은 그대로 남습니다.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| StoreError::persistence(&self.path, e))?;
        }

        let out = DatasetOut {
            metadata: CLASSIFICATION_SCHEMA,
            data: &self.records,
        };
        let bytes = serde_json::to_vec_pretty(&out)
            .map_err(|e| StoreError::persistence(&self.path, e))?;

        let tmp_path = self.tmp_path();
        if let Err(e) = write_synced(&tmp_path, &bytes) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StoreError::persistence(&self.path, e));
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StoreError::persistence(
                &self.path,
                format!("atomic rename failed: {}", e),
            ));
        }

        debug!(
            path = %self.path.display(),
            records = self.records.len(),
            flushed = self.pending,
            "데이터셋 저장 완료"
        );
        self.pending = 0;
        Ok(())
    }

    /// 변경 건수가 배치 크기에 도달했으면 저장합니다.
    ///
    /// 저장했으면 `true`를 반환합니다.
    pub fn flush_if_due(&mut self) -> Result<bool> {
        if self.pending < self.batch_size {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.write_all(b"\n")?;
    file.sync_all()
}
