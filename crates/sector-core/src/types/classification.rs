//! 4단계 업종 분류 레코드.
//!
//! 저장 형식에서 레코드는 스키마 순서를 따르는 4개 문자열 배열입니다:
//!
//! ```text
//! ["Macro", "Sector", "Industry", "Basic Industry"]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// 값이 없는 단계에 기록하는 명시적 "unknown" 값.
pub const UNKNOWN_LEVEL: &str = "-";

/// 분류 단계 이름 (고정 순서).
pub const CLASSIFICATION_SCHEMA: [&str; 4] = ["Macro", "Sector", "Industry", "Basic Industry"];

/// 종목의 업종 분류 (Macro / Sector / Industry / Basic Industry).
///
/// 생성 후 변경되지 않으며, 갱신 시 레코드 전체가 교체됩니다.
/// 4개 단계는 항상 채워져 있고, 값이 없는 단계는 [`UNKNOWN_LEVEL`]입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[String; 4]", into = "[String; 4]")]
pub struct Classification {
    macro_sector: String,
    sector: String,
    industry: String,
    basic_industry: String,
}

impl Classification {
    /// 새 분류를 생성합니다. 빈 값은 [`UNKNOWN_LEVEL`]로 채웁니다.
    pub fn new(
        macro_sector: impl Into<String>,
        sector: impl Into<String>,
        industry: impl Into<String>,
        basic_industry: impl Into<String>,
    ) -> Self {
        Self {
            macro_sector: level_or_unknown(macro_sector.into()),
            sector: level_or_unknown(sector.into()),
            industry: level_or_unknown(industry.into()),
            basic_industry: level_or_unknown(basic_industry.into()),
        }
    }

    /// 거래소 응답의 선택적 필드로부터 분류를 생성합니다.
    ///
    /// 4개 단계가 모두 비어 있으면 `None`을 반환합니다. 이 경우 어댑터는
    /// 레코드 대신 NotFound를 보고해야 합니다.
    pub fn from_parts(
        macro_sector: Option<&str>,
        sector: Option<&str>,
        industry: Option<&str>,
        basic_industry: Option<&str>,
    ) -> Option<Self> {
        let parts = [macro_sector, sector, industry, basic_industry];
        if parts.iter().all(|p| is_blank(*p)) {
            return None;
        }

        Some(Self::new(
            macro_sector.unwrap_or_default(),
            sector.unwrap_or_default(),
            industry.unwrap_or_default(),
            basic_industry.unwrap_or_default(),
        ))
    }

    /// Macro 단계
    pub fn macro_sector(&self) -> &str {
        &self.macro_sector
    }

    /// Sector 단계
    pub fn sector(&self) -> &str {
        &self.sector
    }

    /// Industry 단계
    pub fn industry(&self) -> &str {
        &self.industry
    }

    /// Basic Industry 단계
    pub fn basic_industry(&self) -> &str {
        &self.basic_industry
    }

    /// 스키마 순서대로 단계 값을 반환합니다.
    pub fn levels(&self) -> [&str; 4] {
        [
            self.macro_sector.as_str(),
            self.sector.as_str(),
            self.industry.as_str(),
            self.basic_industry.as_str(),
        ]
    }

    /// 모든 단계가 unknown인지 확인합니다.
    pub fn is_unknown(&self) -> bool {
        self.levels().iter().all(|l| *l == UNKNOWN_LEVEL)
    }
}

impl From<[String; 4]> for Classification {
    fn from([macro_sector, sector, industry, basic_industry]: [String; 4]) -> Self {
        Self::new(macro_sector, sector, industry, basic_industry)
    }
}

impl From<Classification> for [String; 4] {
    fn from(c: Classification) -> Self {
        [c.macro_sector, c.sector, c.industry, c.basic_industry]
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {} / {}",
            self.macro_sector, self.sector, self.industry, self.basic_industry
        )
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

fn level_or_unknown(value: String) -> String {
    match value.trim() {
        "" => UNKNOWN_LEVEL.to_string(),
        trimmed => trimmed.to_string(),
    }
}
