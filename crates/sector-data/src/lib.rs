//! 거래소 데이터 소스 및 분류 저장소.
//!
//! 이 crate는 다음을 제공합니다:
//! - 거래소 공통 인터페이스 (`ClassificationSource`)
//! - NSE 어댑터 (메인보드 + SME 목록, 시장 구분 폴백)
//! - BSE 어댑터 (스크립 코드 기반 조회)
//! - JSON 분류 저장소 (배치 flush, 원자적 쓰기, 손상 감지)

pub mod error;
pub mod provider;
pub mod storage;

pub use error::{Result, StoreError};

// 데이터 소스 재내보내기
pub use provider::{BseSource, ClassificationSource, NseSource, SourceOptions};

// 저장소 재내보내기
pub use storage::json_store::{ClassificationStore, DEFAULT_FLUSH_BATCH_SIZE};
