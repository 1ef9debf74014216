//! 로그 구독자 설정과 단계 span.
//!
//! 구독자는 바이너리가 한 번만 설치합니다. 라이브러리 코드는 전역 설정 대신
//! [`phase_span!`]으로 만든 span에 모드/단계/소스를 실어 보냅니다.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// 로그 출력 형식 (`LOG_FORMAT`, `--log-format`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 로컬 실행용 여러 줄 출력
    #[default]
    Pretty,
    /// CI 로그 수집용, 이벤트마다 현재 단계 span 포함
    Json,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(format!("지원하지 않는 로그 형식: {} (pretty, json, compact)", other)),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// 필터 지시문 (예: "info", "sector_collector=debug")
    pub level: String,
    /// 출력 형식
    pub format: LogFormat,
}

impl LogConfig {
    /// `RUST_LOG`, `LOG_FORMAT`에서 설정을 읽습니다 (기본: info / pretty).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            format: lookup("LOG_FORMAT")
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }

    /// CLI 인자가 주어지면 환경변수 값보다 우선합니다.
    pub fn override_with(mut self, level: Option<String>, format: Option<LogFormat>) -> Self {
        if let Some(level) = level {
            self.level = level;
        }
        if let Some(format) = format {
            self.format = format;
        }
        self
    }
}

/// 전역 구독자를 설치합니다. 프로세스당 한 번만 호출합니다.
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_new(&config.level)?;

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
        // span 필드(mode, phase, source)를 각 이벤트에 포함
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    tracing::debug!(format = ?config.format, level = %config.level, "로깅 초기화 완료");
    Ok(())
}

/// 갱신 단계 문맥 필드가 포함된 span을 생성하는 매크로.
#[macro_export]
macro_rules! phase_span {
    ($mode:expr, $phase:expr, $source:expr) => {
        tracing::info_span!(
            "reconcile",
            mode = %$mode,
            phase = %$phase,
            source = %$source
        )
    };
}
