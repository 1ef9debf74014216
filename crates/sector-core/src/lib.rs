//! # Sector Core
//!
//! 종목-업종 분류 매퍼의 핵심 도메인 타입을 제공합니다.
//!
//! 이 크레이트는 다른 크레이트 전반에서 사용되는 기본 요소를 제공합니다:
//! - 4단계 업종 분류 레코드 (Macro / Sector / Industry / Basic Industry)
//! - 종목 목록 항목 및 심볼 정규화
//! - 갱신 요청 (모드 + 빈도 등급)
//! - 데이터 소스 에러 분류 (재시도 가능 / 불가)
//! - 빈도 등급별 지수 백오프 재시도 정책
//! - 로깅 인프라

pub mod error;
pub mod logging;
pub mod retry;
pub mod types;

pub use error::*;
pub use logging::*;
pub use retry::{with_retry, with_retry_if, RetryConfig};
pub use types::*;
