//! 에러 타입 정의.

use sector_core::SourceError;
use sector_data::StoreError;
use thiserror::Error;

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 저장소 에러 (손상된 파일, 쓰기 실패)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 데이터 소스 에러 (어댑터 생성 실패 등)
    #[error("Data source error: {0}")]
    DataSource(#[from] SourceError),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
