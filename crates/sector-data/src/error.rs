//! 저장소 오류 타입.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// 분류 저장소 관련 오류.
///
/// 두 오류 모두 실행 전체를 중단시키는 치명적 오류입니다.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 저장 파일이 존재하지만 읽거나 해석할 수 없음
    #[error("Data corruption in {}: {reason}", path.display())]
    DataCorruption { path: PathBuf, reason: String },

    /// 저장 파일을 쓸 수 없음 (기존 파일은 그대로 유지됨)
    #[error("Persistence failure for {}: {reason}", path.display())]
    Persistence { path: PathBuf, reason: String },
}

impl StoreError {
    pub(crate) fn corruption(path: &Path, reason: impl ToString) -> Self {
        StoreError::DataCorruption {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn persistence(path: &Path, reason: impl ToString) -> Self {
        StoreError::Persistence {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
