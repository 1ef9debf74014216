//! NSE/BSE 업종 분류 수집기.
//!
//! 두 거래소의 업종 분류를 하나의 JSON 데이터셋으로 병합합니다:
//! - 전체 재구축 (`--full-refresh`): 우선 소스로 채운 뒤 나머지 소스로 빈 곳 채우기
//! - 증분 갱신 (`--refresh`): 기존 데이터셋에 없는 종목만 추가

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::{CollectorConfig, PrecedenceSource};
pub use error::{CollectorError, Result};
pub use stats::{PhaseStats, RefreshReport};
