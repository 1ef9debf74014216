//! 업종 분류 데이터 소스 모듈.
//!
//! 거래소별 특이사항은 각 어댑터 내부에 격리되고, 오케스트레이터는
//! [`ClassificationSource`]의 두 연산만 사용합니다.
//!
//! ## NSE (National Stock Exchange)
//! - `NseSource`: 메인보드/SME CSV 목록 + 시세 API의 업종 정보
//! - 시리즈 코드가 조회 키, 시장 구분 `N` → `G` 폴백
//!
//! ## BSE (Bombay Stock Exchange)
//! - `BseSource`: 스크립 목록 API + 종목 메타 정보 API
//! - 스크립 코드가 조회 키

pub mod bse;
mod http;
pub mod nse;

use std::time::Duration;

use async_trait::async_trait;

use sector_core::{Classification, SourceResult, SymbolListing};

pub use bse::BseSource;
pub use nse::NseSource;

/// 브라우저와 유사한 User-Agent (거래소 API는 기본 UA를 차단함).
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 업종 분류 데이터 소스 trait.
///
/// 두 연산 모두 재시도 없이 한 번만 호출합니다. 재시도는 호출자가
/// 재시도 정책으로 감쌉니다.
#[async_trait]
pub trait ClassificationSource: Send + Sync {
    /// 소스 이름 (로그용, 예: "nse", "bse").
    fn name(&self) -> &str;

    /// 현재 상장된 종목 목록 조회.
    async fn list_symbols(&self) -> SourceResult<Vec<SymbolListing>>;

    /// 종목의 업종 분류 조회.
    ///
    /// 데이터가 없으면 [`sector_core::SourceError::NotFound`]를 반환합니다.
    async fn fetch_classification(&self, listing: &SymbolListing)
        -> SourceResult<Classification>;
}

/// 어댑터 공통 HTTP 설정.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// 요청 타임아웃
    pub timeout: Duration,
    /// 요청 간 딜레이 (기본: 100ms)
    pub request_delay: Duration,
    /// 서버(CI) 실행 모드 여부
    ///
    /// 켜져 있으면 ALPN으로 HTTP/2를 협상하고, 꺼져 있으면 HTTP/1.1만 사용합니다.
    pub server_mode: bool,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            request_delay: Duration::from_millis(100),
            server_mode: false,
        }
    }
}
