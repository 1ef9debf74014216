//! 빈도 등급별 지수 백오프 재시도.
//!
//! 모든 거래소 호출은 이 모듈을 거칩니다. 실패는 분류 함수로
//! [`RetryClass`]를 판정하여 처리합니다:
//!
//! - **Retryable**: 지수 백오프(+지터) 후 최대 시도 횟수까지 재시도
//! - **NonRetryable**: 즉시 포기, 추가 시도 없음
//!
//! 시도 횟수를 모두 소진하면 마지막 에러를 반환합니다.
//!
//! # 대기 시간
//!
//! ```text
//! n번째 실패 후 대기 = min(max_delay, base_delay * 2^(n-1))
//! 지터 적용 시      = [대기/2, 대기] 구간의 균등 난수
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::{RetryClass, SourceError};
use crate::types::FrequencyTier;

/// 재시도 설정.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// 최대 시도 횟수 (첫 시도 포함, 최소 1)
    pub max_attempts: u32,
    /// 첫 재시도 전 대기 시간
    pub base_delay: Duration,
    /// 대기 시간 상한
    pub max_delay: Duration,
    /// 지터 적용 여부
    pub jitter: bool,
}

impl RetryConfig {
    /// 새 재시도 설정을 생성합니다 (지터 활성).
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            jitter: true,
        }
    }

    /// 빈도 등급의 기본 프리셋.
    ///
    /// 수치는 설정값이며, 환경변수로 덮어쓸 수 있습니다.
    pub fn preset(tier: FrequencyTier) -> Self {
        match tier {
            FrequencyTier::Daily => {
                Self::new(5, Duration::from_secs(1), Duration::from_secs(30))
            }
            FrequencyTier::Weekly => {
                Self::new(15, Duration::from_secs(2), Duration::from_secs(90))
            }
            FrequencyTier::Monthly => {
                Self::new(25, Duration::from_secs(2), Duration::from_secs(300))
            }
        }
    }

    /// 지터를 끕니다.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// `attempt`번째 시도가 실패한 뒤의 지터 적용 전 대기 시간 (1부터 시작).
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// `attempt`번째 시도가 실패한 뒤 실제로 대기할 시간.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ceiling = self.backoff_ceiling(attempt);
        if !self.jitter {
            return ceiling;
        }

        let half = ceiling / 2;
        let spread = (ceiling - half).as_millis() as u64;
        let extra = rand::thread_rng().gen_range(0..=spread);
        (half + Duration::from_millis(extra)).min(ceiling)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::preset(FrequencyTier::default())
    }
}

/// 분류 함수를 사용해 작업을 재시도합니다.
///
/// # Arguments
/// * `config` - 재시도 설정
/// * `label` - 로그에 남길 작업 이름 (예: "nse:RELIANCE")
/// * `operation` - 매 시도마다 새 future를 만드는 클로저
/// * `classify` - 실패를 Retryable / NonRetryable로 분류
pub async fn with_retry_if<T, E, F, Fut, C>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
    classify: C,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryClass,
    E: Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if classify(&err) == RetryClass::NonRetryable {
            tracing::debug!(
                operation = label,
                attempt,
                error = %err,
                "재시도 불가 에러, 즉시 포기"
            );
            return Err(err);
        }

        if attempt >= max_attempts {
            tracing::warn!(
                operation = label,
                attempts = attempt,
                error = %err,
                "재시도 횟수 소진"
            );
            return Err(err);
        }

        let delay = config.delay_for(attempt);
        tracing::debug!(
            operation = label,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "재시도 예정"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// [`SourceError::retry_class`]로 분류하여 작업을 재시도합니다.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    label: &str,
    operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    with_retry_if(config, label, operation, SourceError::retry_class).await
}
