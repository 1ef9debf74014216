//! 분류 데이터셋 저장소.
//!
//! - `json_store`: JSON 파일 기반 저장소 (배치 flush, 원자적 쓰기)

pub mod json_store;
