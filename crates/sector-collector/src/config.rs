//! 환경변수 기반 설정 모듈.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sector_core::{FrequencyTier, RetryConfig};
use sector_data::provider::bse::BSE_API_URL;
use sector_data::provider::nse::{NSE_ARCHIVE_URL, NSE_BASE_URL};
use sector_data::{SourceOptions, DEFAULT_FLUSH_BATCH_SIZE};

use crate::error::CollectorError;
use crate::Result;

/// 기본 데이터셋 경로
pub const DEFAULT_DATA_PATH: &str = "out/industry_data.json";

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터셋 파일 경로
    pub data_path: PathBuf,
    /// 배치 flush 기준 변경 수
    pub flush_batch_size: usize,
    /// 전체 재구축 시 우선권을 갖는 소스
    pub precedence: PrecedenceSource,
    /// 어댑터 HTTP 설정
    pub source: SourceConfig,
    /// 주기별 재시도 설정
    pub retry: RetryPresets,
}

/// 어댑터 HTTP 설정
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// API 요청 간 딜레이 (밀리초)
    pub request_delay_ms: u64,
    /// 요청 타임아웃 (초)
    pub http_timeout_secs: u64,
    pub nse_base_url: String,
    pub nse_archive_url: String,
    pub bse_api_url: String,
    /// 서버(CI) 실행 여부
    pub server_mode: bool,
}

/// 주기별 재시도 프리셋
#[derive(Debug, Clone)]
pub struct RetryPresets {
    pub daily: RetryConfig,
    pub weekly: RetryConfig,
    pub monthly: RetryConfig,
}

/// 우선 소스 (Source-B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrecedenceSource {
    #[default]
    Nse,
    Bse,
}

impl FromStr for PrecedenceSource {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "nse" => Ok(PrecedenceSource::Nse),
            "bse" => Ok(PrecedenceSource::Bse),
            other => Err(CollectorError::Config(format!(
                "PRECEDENCE_SOURCE는 nse 또는 bse여야 합니다: {}",
                other
            ))),
        }
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드 (`.env` 파일 포함)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로부터 설정 로드
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let precedence = match env.get("PRECEDENCE_SOURCE") {
            Some(value) => value.parse()?,
            None => PrecedenceSource::default(),
        };

        let flush_batch_size: usize = env.parse("FLUSH_BATCH_SIZE", DEFAULT_FLUSH_BATCH_SIZE);
        if flush_batch_size == 0 {
            return Err(CollectorError::Config(
                "FLUSH_BATCH_SIZE는 1 이상이어야 합니다".to_string(),
            ));
        }

        Ok(Self {
            data_path: env
                .get("DATA_PATH")
                .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string())
                .into(),
            flush_batch_size,
            precedence,
            source: SourceConfig {
                request_delay_ms: env.parse("REQUEST_DELAY_MS", 100),
                http_timeout_secs: env.parse("HTTP_TIMEOUT_SECS", 30),
                nse_base_url: env.get("NSE_BASE_URL").unwrap_or_else(|| NSE_BASE_URL.to_string()),
                nse_archive_url: env
                    .get("NSE_ARCHIVE_URL")
                    .unwrap_or_else(|| NSE_ARCHIVE_URL.to_string()),
                bse_api_url: env.get("BSE_API_URL").unwrap_or_else(|| BSE_API_URL.to_string()),
                server_mode: env.bool("GITHUB_ACTIONS", false) || env.bool("CI", false),
            },
            retry: RetryPresets {
                daily: env.retry(FrequencyTier::Daily),
                weekly: env.retry(FrequencyTier::Weekly),
                monthly: env.retry(FrequencyTier::Monthly),
            },
        })
    }

    /// 주기에 해당하는 재시도 설정
    pub fn retry_for(&self, tier: FrequencyTier) -> &RetryConfig {
        match tier {
            FrequencyTier::Daily => &self.retry.daily,
            FrequencyTier::Weekly => &self.retry.weekly,
            FrequencyTier::Monthly => &self.retry.monthly,
        }
    }
}

impl SourceConfig {
    /// API 요청 간 딜레이를 Duration으로 반환
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// 어댑터 공통 옵션
    pub fn options(&self) -> SourceOptions {
        SourceOptions {
            timeout: Duration::from_secs(self.http_timeout_secs),
            request_delay: self.request_delay(),
            server_mode: self.server_mode,
        }
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    /// 값을 파싱 (실패 시 기본값 사용)
    fn parse<T: FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn bool(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(default)
    }

    /// 프리셋에 `RETRY_<TIER>_*` 오버라이드 적용
    fn retry(&self, tier: FrequencyTier) -> RetryConfig {
        let preset = RetryConfig::preset(tier);
        let prefix = format!("RETRY_{}", tier.as_str().to_uppercase());

        let max_attempts = self.parse(&format!("{prefix}_MAX_ATTEMPTS"), preset.max_attempts);
        let base_ms = self.parse(
            &format!("{prefix}_BASE_DELAY_MS"),
            preset.base_delay.as_millis() as u64,
        );
        let max_ms = self.parse(
            &format!("{prefix}_MAX_DELAY_MS"),
            preset.max_delay.as_millis() as u64,
        );

        let config = RetryConfig::new(
            max_attempts,
            Duration::from_millis(base_ms),
            Duration::from_millis(max_ms),
        );
        if self.bool("RETRY_JITTER", true) {
            config
        } else {
            config.without_jitter()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<CollectorConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CollectorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.data_path, PathBuf::from(DEFAULT_DATA_PATH));
        assert_eq!(config.flush_batch_size, 50);
        assert_eq!(config.precedence, PrecedenceSource::Nse);
        assert_eq!(config.source.request_delay(), Duration::from_millis(100));
        assert!(!config.source.server_mode);
        assert_eq!(config.retry_for(FrequencyTier::Weekly).max_attempts, 15);
        assert_eq!(config.retry_for(FrequencyTier::Daily).max_attempts, 5);
        assert_eq!(
            config.retry_for(FrequencyTier::Monthly).max_delay,
            Duration::from_secs(300)
        );
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DATA_PATH", "/tmp/sectors.json"),
            ("FLUSH_BATCH_SIZE", "10"),
            ("PRECEDENCE_SOURCE", "BSE"),
            ("RETRY_DAILY_MAX_ATTEMPTS", "3"),
            ("RETRY_DAILY_BASE_DELAY_MS", "250"),
            ("GITHUB_ACTIONS", "true"),
        ])
        .unwrap();

        assert_eq!(config.data_path, PathBuf::from("/tmp/sectors.json"));
        assert_eq!(config.flush_batch_size, 10);
        assert_eq!(config.precedence, PrecedenceSource::Bse);
        assert!(config.source.server_mode);

        let daily = config.retry_for(FrequencyTier::Daily);
        assert_eq!(daily.max_attempts, 3);
        assert_eq!(daily.base_delay, Duration::from_millis(250));
        assert_eq!(daily.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_can_be_disabled() {
        let config = config_from(&[]).unwrap();
        assert!(config.retry_for(FrequencyTier::Weekly).jitter);

        let config = config_from(&[("RETRY_JITTER", "false")]).unwrap();
        for tier in [FrequencyTier::Daily, FrequencyTier::Weekly, FrequencyTier::Monthly] {
            let retry = config.retry_for(tier);
            assert!(!retry.jitter);
            assert_eq!(retry.delay_for(3), retry.backoff_ceiling(3));
        }
    }

    #[test]
    fn test_unparseable_number_falls_back_to_default() {
        let config = config_from(&[("REQUEST_DELAY_MS", "fast")]).unwrap();
        assert_eq!(config.source.request_delay_ms, 100);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            config_from(&[("PRECEDENCE_SOURCE", "mcx")]),
            Err(CollectorError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("FLUSH_BATCH_SIZE", "0")]),
            Err(CollectorError::Config(_))
        ));
    }
}
