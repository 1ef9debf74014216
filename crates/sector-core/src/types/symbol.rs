//! 종목 목록 항목 및 심볼 규칙.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 권리락(rights entitlement) 임시 종목의 접미사.
///
/// 이 종목들은 업종 정보가 없으므로 조회하지 않습니다.
pub const RIGHTS_ENTITLEMENT_SUFFIX: &str = "-RE";

/// 거래소 티커를 저장 키 형식으로 정규화합니다.
///
/// 앞뒤 공백을 제거하고 대문자로 변환합니다. 빈 값이거나 내부에 공백이
/// 포함된 값은 유효한 티커가 아니므로 `None`을 반환합니다.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return None;
    }
    Some(trimmed.to_uppercase())
}

/// 권리락 임시 종목인지 확인합니다.
pub fn is_rights_entitlement(symbol: &str) -> bool {
    symbol.to_uppercase().ends_with(RIGHTS_ENTITLEMENT_SUFFIX)
}

/// 거래소 종목 목록의 한 항목.
///
/// `lookup_key`는 어댑터 전용 조회 키입니다 (NSE: 시리즈 코드, BSE: 스크립 코드).
/// 오케스트레이터는 이 값을 해석하지 않고 그대로 어댑터에 돌려줍니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolListing {
    /// 정규화된 티커 (저장 키)
    pub symbol: String,
    /// 어댑터 전용 조회 키
    pub lookup_key: String,
}

impl SymbolListing {
    /// 새 목록 항목을 생성합니다.
    pub fn new(symbol: impl Into<String>, lookup_key: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            lookup_key: lookup_key.into(),
        }
    }

    /// 권리락 임시 종목인지 확인합니다.
    pub fn is_rights_entitlement(&self) -> bool {
        is_rights_entitlement(&self.symbol)
    }
}

impl fmt::Display for SymbolListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.lookup_key)
    }
}
