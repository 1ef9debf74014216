//! 어댑터 공통 HTTP 유틸리티.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::{Client, RequestBuilder, Response};

use sector_core::{SourceError, SourceResult};

use super::{SourceOptions, BROWSER_USER_AGENT};

/// 어댑터용 HTTP 클라이언트 생성.
pub(crate) fn build_client(options: &SourceOptions, referer: &str) -> SourceResult<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    if let Ok(value) = HeaderValue::from_str(referer) {
        headers.insert(REFERER, value);
    }

    let mut builder = Client::builder()
        .timeout(options.timeout)
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(headers)
        .cookie_store(true);

    if !options.server_mode {
        builder = builder.http1_only();
    }

    builder
        .build()
        .map_err(|e| SourceError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))
}

/// reqwest 에러를 재시도 분류가 가능한 [`SourceError`]로 변환.
pub(crate) fn map_reqwest_error(err: reqwest::Error, context: &str) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout(format!("{}: {}", context, err))
    } else if let Some(status) = err.status() {
        SourceError::from_status(status.as_u16(), format!("{}: {}", context, err))
    } else if err.is_decode() {
        SourceError::Parse(format!("{}: {}", context, err))
    } else {
        SourceError::Network(format!("{}: {}", context, err))
    }
}

/// 요청을 보내고 성공 상태 코드가 아니면 에러로 변환.
pub(crate) async fn send_checked(request: RequestBuilder, context: &str) -> SourceResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| map_reqwest_error(e, context))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::from_status(
            status.as_u16(),
            format!("{} returned {}", context, status),
        ));
    }

    Ok(response)
}

/// 응답 본문을 텍스트로 읽기.
pub(crate) async fn read_text(response: Response, context: &str) -> SourceResult<String> {
    response
        .text()
        .await
        .map_err(|e| map_reqwest_error(e, context))
}
