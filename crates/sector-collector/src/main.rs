//! 업종 분류 수집기 CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgGroup, Parser, ValueEnum};

use sector_collector::{modules, CollectorConfig};
use sector_core::{init_logging, FrequencyTier, LogConfig, LogFormat, RefreshRequest};

#[derive(Parser)]
#[command(name = "sector-collector")]
#[command(about = "NSE/BSE Industry Classification Reconciler", long_about = None)]
#[command(version)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["full_refresh", "refresh"])
))]
struct Cli {
    /// 전체 재구축 (우선 소스로 다시 채운 뒤 보조 소스로 빈 곳 채우기)
    #[arg(long)]
    full_refresh: bool,

    /// 증분 갱신 (데이터셋에 없는 종목만 추가)
    #[arg(long)]
    refresh: bool,

    /// 실행 주기 (재시도 프리셋 선택)
    #[arg(long, value_enum, default_value_t = Frequency::Weekly)]
    frequency: Frequency,

    /// 데이터셋 파일 경로 (DATA_PATH 대신 사용)
    #[arg(long)]
    data_path: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl From<Frequency> for FrequencyTier {
    fn from(value: Frequency) -> Self {
        match value {
            Frequency::Daily => FrequencyTier::Daily,
            Frequency::Weekly => FrequencyTier::Weekly,
            Frequency::Monthly => FrequencyTier::Monthly,
        }
    }
}

impl Cli {
    fn request(&self) -> RefreshRequest {
        let frequency = self.frequency.into();
        if self.full_refresh {
            RefreshRequest::full(frequency)
        } else {
            RefreshRequest::incremental(frequency)
        }
    }

    fn log_config(&self) -> LogConfig {
        LogConfig::from_env().override_with(self.log_level.clone(), self.log_format)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // .env는 설정 로드 시 읽히므로 로깅보다 먼저 로드
    let config = match CollectorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("설정 로드 실패: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(cli.log_config()) {
        eprintln!("로깅 초기화 실패: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!("Sector Collector 시작");

    match run(&cli, config).await {
        Ok(true) => {
            tracing::info!("Sector Collector 종료");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            tracing::error!("일부 소스의 종목 목록을 가져오지 못했습니다");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = format!("{:#}", e), "실행 실패");
            ExitCode::FAILURE
        }
    }
}

/// 갱신 실행. 모든 단계의 목록 조회가 성공하면 `true`.
async fn run(cli: &Cli, mut config: CollectorConfig) -> anyhow::Result<bool> {
    if let Some(path) = &cli.data_path {
        config.data_path = path.clone();
    }

    let request = cli.request();
    let retry = config.retry_for(request.frequency).clone();
    tracing::debug!(
        data_path = %config.data_path.display(),
        precedence = ?config.precedence,
        server_mode = config.source.server_mode,
        "설정 로드 완료"
    );

    let mut store = modules::open_store(request.mode, &config.data_path, config.flush_batch_size)
        .context("데이터셋 열기 실패")?;
    let reconciler = modules::Reconciler::from_config(&config).context("소스 초기화 실패")?;

    let report = reconciler
        .refresh(request, &mut store, &retry)
        .await
        .context("갱신 중단")?;
    report.log_summary();

    Ok(report.is_success())
}
