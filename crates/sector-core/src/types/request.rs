//! 갱신 요청 타입.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 갱신 모드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// 전체 재구축 (기존 데이터셋을 비우고 다시 수집)
    Full,
    /// 증분 갱신 (누락된 종목만 채움)
    Incremental,
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshMode::Full => write!(f, "full"),
            RefreshMode::Incremental => write!(f, "incremental"),
        }
    }
}

/// 실행 빈도 등급.
///
/// 등급마다 재시도 예산이 다릅니다. 자주 실행될수록 빠르게 포기하고,
/// 드물게 실행될수록 더 깊은 백오프를 허용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyTier {
    /// 매일 실행
    Daily,
    /// 매주 실행
    #[default]
    Weekly,
    /// 매월 실행
    Monthly,
}

impl FrequencyTier {
    /// 문자열 표현 (환경변수 접두사 등에 사용).
    pub fn as_str(&self) -> &'static str {
        match self {
            FrequencyTier::Daily => "daily",
            FrequencyTier::Weekly => "weekly",
            FrequencyTier::Monthly => "monthly",
        }
    }
}

impl fmt::Display for FrequencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrequencyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(format!("Unknown frequency tier: {}", s)),
        }
    }
}

/// 한 번의 실행에 대한 갱신 요청.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    /// 갱신 모드
    pub mode: RefreshMode,
    /// 빈도 등급 (재시도 프리셋 선택)
    pub frequency: FrequencyTier,
}

impl RefreshRequest {
    /// 새 갱신 요청을 생성합니다.
    pub fn new(mode: RefreshMode, frequency: FrequencyTier) -> Self {
        Self { mode, frequency }
    }

    /// 전체 재구축 요청.
    pub fn full(frequency: FrequencyTier) -> Self {
        Self::new(RefreshMode::Full, frequency)
    }

    /// 증분 갱신 요청.
    pub fn incremental(frequency: FrequencyTier) -> Self {
        Self::new(RefreshMode::Incremental, frequency)
    }
}
