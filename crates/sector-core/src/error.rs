//! 데이터 소스 에러 타입.
//!
//! 거래소 어댑터가 반환하는 모든 실패를 하나의 분류 체계로 정의합니다.
//! 재시도 여부는 [`SourceError::retry_class`]가 결정합니다.

use thiserror::Error;

/// 재시도 시 일시적 장애로 간주하는 HTTP 상태 코드.
///
/// 408 Request Timeout, 429 Too Many Requests, 502 Bad Gateway,
/// 503 Service Unavailable, 504 Gateway Timeout.
pub const RETRYABLE_STATUS_CODES: [u16; 5] = [408, 429, 502, 503, 504];

/// 재시도 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// 백오프 후 재시도
    Retryable,
    /// 즉시 포기
    NonRetryable,
}

/// 데이터 소스(거래소) 관련 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// 업종 정보 없음 (거래소에 데이터 자체가 없음)
    #[error("Classification not found: {0}")]
    NotFound(String),

    /// 요청 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 상태 코드 에러
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// 응답 파싱 에러
    #[error("Parse error: {0}")]
    Parse(String),
}

impl SourceError {
    /// HTTP 상태 코드로부터 에러 생성.
    ///
    /// 404는 데이터 부재로 보고 [`SourceError::NotFound`]로 변환합니다.
    pub fn from_status(status: u16, context: impl Into<String>) -> Self {
        let context = context.into();
        if status == 404 {
            SourceError::NotFound(context)
        } else {
            SourceError::Http {
                status,
                message: context,
            }
        }
    }

    /// 재시도 분류 반환.
    ///
    /// 타임아웃, 네트워크 장애, 과부하/게이트웨이 상태 코드만 재시도합니다.
    /// NotFound, 400/401/403/500 등은 재시도해도 결과가 같으므로 즉시 포기합니다.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            SourceError::Timeout(_) | SourceError::Network(_) => RetryClass::Retryable,
            SourceError::Http { status, .. } if RETRYABLE_STATUS_CODES.contains(status) => {
                RetryClass::Retryable
            }
            SourceError::NotFound(_) | SourceError::Http { .. } | SourceError::Parse(_) => {
                RetryClass::NonRetryable
            }
        }
    }

    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        self.retry_class() == RetryClass::Retryable
    }

    /// 데이터 부재 에러인지 확인.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }

    /// 로그용 에러 종류 라벨.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::NotFound(_) => "not_found",
            SourceError::Timeout(_) => "timeout",
            SourceError::Network(_) => "network",
            SourceError::Http { .. } => "http",
            SourceError::Parse(_) => "parse",
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(err.to_string())
    }
}

/// 데이터 소스 작업을 위한 Result 타입.
pub type SourceResult<T> = Result<T, SourceError>;
