//! BSE (Bombay Stock Exchange) 업종 분류 소스.
//!
//! BSE 웹사이트가 사용하는 JSON API를 직접 호출합니다.
//! Referer 헤더가 없으면 빈 응답을 돌려주므로 클라이언트 기본 헤더에 포함합니다.
//!
//! 필드 매핑:
//! - `Sector` → Macro
//! - `IndustryNew` → Sector
//! - `IGroup` → Industry
//! - `ISubGroup` → Basic Industry

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use sector_core::{normalize_symbol, Classification, SourceError, SourceResult, SymbolListing};

use super::http::{build_client, read_text, send_checked};
use super::{ClassificationSource, SourceOptions};

/// BSE API 기본 URL.
pub const BSE_API_URL: &str = "https://api.bseindia.com";

const BSE_REFERER: &str = "https://www.bseindia.com/";
const SCRIP_LIST_PATH: &str = "/BseIndiaAPI/api/ListofScripData/w";
const SCRIP_HEADER_PATH: &str = "/BseIndiaAPI/api/ComHeadernew/w";

/// 스크립 목록 항목.
#[derive(Debug, Deserialize)]
struct ScripEntry {
    /// 문자열 또는 숫자로 내려옴
    #[serde(rename = "SCRIP_CD", default)]
    scrip_code: Option<Value>,
    #[serde(rename = "scrip_id", default)]
    scrip_id: Option<String>,
}

/// 종목 헤더 메타 정보.
#[derive(Debug, Default, Deserialize)]
struct ScripHeader {
    #[serde(rename = "Sector", default)]
    sector: Option<String>,
    #[serde(rename = "IndustryNew", default)]
    industry_new: Option<String>,
    #[serde(rename = "IGroup", default)]
    i_group: Option<String>,
    #[serde(rename = "ISubGroup", default)]
    i_sub_group: Option<String>,
}

/// BSE 업종 분류 소스.
pub struct BseSource {
    client: reqwest::Client,
    api_url: String,
    options: SourceOptions,
}

impl BseSource {
    /// 엔드포인트를 지정해 생성 (기본값: [`BSE_API_URL`]).
    pub fn with_api_url(api_url: impl Into<String>, options: SourceOptions) -> SourceResult<Self> {
        let client = build_client(&options, BSE_REFERER)?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            options,
        })
    }
}

#[async_trait]
impl ClassificationSource for BseSource {
    fn name(&self) -> &str {
        "bse"
    }

    async fn list_symbols(&self) -> SourceResult<Vec<SymbolListing>> {
        let url = format!("{}{}", self.api_url, SCRIP_LIST_PATH);
        let request = self.client.get(&url).query(&[
            ("Group", ""),
            ("Scripcode", ""),
            ("industry", ""),
            ("segment", "Equity"),
            ("status", "Active"),
        ]);

        let response = send_checked(request, "bse scrip list").await?;
        let body = read_text(response, "bse scrip list").await?;
        let entries: Vec<ScripEntry> = serde_json::from_str(&body)
            .map_err(|e| SourceError::Parse(format!("bse scrip list: {}", e)))?;

        let listings: Vec<SymbolListing> = entries.into_iter().filter_map(to_listing).collect();
        info!(count = listings.len(), "BSE 종목 목록 수집");
        Ok(listings)
    }

    async fn fetch_classification(
        &self,
        listing: &SymbolListing,
    ) -> SourceResult<Classification> {
        tokio::time::sleep(self.options.request_delay).await;

        let url = format!("{}{}", self.api_url, SCRIP_HEADER_PATH);
        let request = self.client.get(&url).query(&[
            ("quotetype", "EQ"),
            ("scripcode", listing.lookup_key.as_str()),
            ("seriesid", ""),
        ]);

        let context = format!("bse header {} ({})", listing.symbol, listing.lookup_key);
        let response = send_checked(request, &context).await?;
        let body = read_text(response, &context).await?;

        // 존재하지 않는 스크립은 빈 본문이나 null로 응답
        let header: Option<ScripHeader> = if body.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&body)
                .map_err(|e| SourceError::Parse(format!("{}: {}", context, e)))?
        };

        header
            .and_then(|h| {
                Classification::from_parts(
                    h.sector.as_deref(),
                    h.industry_new.as_deref(),
                    h.i_group.as_deref(),
                    h.i_sub_group.as_deref(),
                )
            })
            .ok_or(SourceError::NotFound(context))
    }
}

fn to_listing(entry: ScripEntry) -> Option<SymbolListing> {
    let symbol = normalize_symbol(entry.scrip_id.as_deref()?)?;
    let code = match entry.scrip_code? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if code.is_empty() {
        return None;
    }
    Some(SymbolListing::new(symbol, code))
}
