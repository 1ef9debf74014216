//! NSE (National Stock Exchange of India) 업종 분류 소스.
//!
//! ## 데이터 소스
//! - `{archive}/content/equities/EQUITY_L.csv`: 메인보드 종목 목록
//! - `{archive}/emerge/corporates/content/SME_EQUITY_L.csv`: SME 종목 목록
//! - `{base}/api/NextApi/apiClient/GetQuoteApi`: 종목별 업종 정보 (`secInfo`)
//!
//! ## 특이사항
//! - CSV 헤더에 공백이 섞여 있어 trim 후 해석합니다.
//! - 시세 API는 시리즈 코드(EQ, BE, SM, ST 등)가 필요하므로 목록의 `SERIES`를
//!   조회 키로 보관합니다.
//! - 정규시장(`N`) 응답에 `secInfo`가 없으면 콜옥션 시장(`G`)으로 다시 조회합니다.
//! - API 호출 전 홈페이지를 한 번 방문하여 세션 쿠키를 받습니다.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use sector_core::{
    normalize_symbol, Classification, SourceError, SourceResult, SymbolListing,
};

use super::http::{build_client, read_text, send_checked};
use super::{ClassificationSource, SourceOptions};

/// NSE 웹사이트/API 기본 URL.
pub const NSE_BASE_URL: &str = "https://www.nseindia.com";
/// NSE 아카이브(CSV) 기본 URL.
pub const NSE_ARCHIVE_URL: &str = "https://nsearchives.nseindia.com";

const MAINBOARD_CSV_PATH: &str = "/content/equities/EQUITY_L.csv";
const SME_CSV_PATH: &str = "/emerge/corporates/content/SME_EQUITY_L.csv";
const QUOTE_API_PATH: &str = "/api/NextApi/apiClient/GetQuoteApi";

/// 시장 구분.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarketType {
    /// 정규시장
    Normal,
    /// 콜옥션 시장 (거래 부진 종목)
    CallAuction,
}

impl MarketType {
    fn code(&self) -> &'static str {
        match self {
            MarketType::Normal => "N",
            MarketType::CallAuction => "G",
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "equityResponse", default)]
    equity_response: Vec<EquityResponse>,
}

#[derive(Debug, Deserialize)]
struct EquityResponse {
    #[serde(rename = "secInfo", default)]
    sec_info: Option<SecInfo>,
}

#[derive(Debug, Deserialize)]
struct SecInfo {
    #[serde(rename = "macro", default)]
    macro_sector: Option<String>,
    #[serde(default)]
    sector: Option<String>,
    #[serde(rename = "industryInfo", default)]
    industry_info: Option<String>,
    #[serde(rename = "basicIndustry", default)]
    basic_industry: Option<String>,
}

/// NSE 업종 분류 소스.
pub struct NseSource {
    client: reqwest::Client,
    base_url: String,
    archive_url: String,
    options: SourceOptions,
    /// 세션 쿠키 초기화 여부
    session: OnceCell<()>,
}

impl NseSource {
    /// 엔드포인트를 지정해 생성 (기본값: [`NSE_BASE_URL`], [`NSE_ARCHIVE_URL`]).
    pub fn with_urls(
        base_url: impl Into<String>,
        archive_url: impl Into<String>,
        options: SourceOptions,
    ) -> SourceResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let archive_url = archive_url.into().trim_end_matches('/').to_string();

        if options.server_mode {
            info!("서버 모드 감지, HTTP/2 협상 사용");
        }

        let client = build_client(&options, &format!("{}/", base_url))?;

        Ok(Self {
            client,
            base_url,
            archive_url,
            options,
            session: OnceCell::new(),
        })
    }

    /// 홈페이지를 한 번 방문하여 세션 쿠키를 받습니다.
    ///
    /// 실패해도 API 호출은 계속 시도합니다.
    async fn ensure_session(&self) {
        self.session
            .get_or_init(|| async {
                let url = format!("{}/", self.base_url);
                match send_checked(self.client.get(&url), "nse home").await {
                    Ok(_) => debug!("NSE 세션 쿠키 초기화 완료"),
                    Err(e) => warn!(error = %e, "NSE 세션 초기화 실패, 쿠키 없이 계속"),
                }
            })
            .await;
    }

    async fn fetch_listing_csv(&self, path: &str, label: &str) -> SourceResult<Vec<SymbolListing>> {
        let url = format!("{}{}", self.archive_url, path);
        let response = send_checked(self.client.get(&url), label).await?;
        let body = read_text(response, label).await?;

        let listings = parse_equity_csv(&body)?;
        info!(list = label, count = listings.len(), "NSE 종목 목록 수집");
        Ok(listings)
    }

    async fn fetch_sec_info(
        &self,
        listing: &SymbolListing,
        market: MarketType,
    ) -> SourceResult<Option<Classification>> {
        let url = format!("{}{}", self.base_url, QUOTE_API_PATH);
        let request = self.client.get(&url).query(&[
            ("functionName", "getSymbolData"),
            ("marketType", market.code()),
            ("series", listing.lookup_key.as_str()),
            ("symbol", listing.symbol.as_str()),
        ]);

        let context = format!("nse quote {} ({})", listing.symbol, market.code());
        let response = send_checked(request, &context).await?;
        let body = read_text(response, &context).await?;

        let quote: QuoteResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::Parse(format!("{}: {}", context, e)))?;

        Ok(extract_classification(quote))
    }
}

#[async_trait]
impl ClassificationSource for NseSource {
    fn name(&self) -> &str {
        "nse"
    }

    async fn list_symbols(&self) -> SourceResult<Vec<SymbolListing>> {
        let mut listings = self
            .fetch_listing_csv(MAINBOARD_CSV_PATH, "nse mainboard")
            .await?;

        tokio::time::sleep(self.options.request_delay).await;

        let sme = self.fetch_listing_csv(SME_CSV_PATH, "nse sme").await?;
        listings.extend(sme);
        Ok(listings)
    }

    async fn fetch_classification(
        &self,
        listing: &SymbolListing,
    ) -> SourceResult<Classification> {
        self.ensure_session().await;
        tokio::time::sleep(self.options.request_delay).await;

        if let Some(found) = self.fetch_sec_info(listing, MarketType::Normal).await? {
            return Ok(found);
        }

        debug!(symbol = %listing.symbol, "정규시장 업종 정보 없음, 콜옥션 시장으로 재조회");
        if let Some(found) = self.fetch_sec_info(listing, MarketType::CallAuction).await? {
            return Ok(found);
        }

        Err(SourceError::NotFound(format!(
            "nse {} ({})",
            listing.symbol, listing.lookup_key
        )))
    }
}

/// NSE 종목 목록 CSV 파싱.
///
/// `SYMBOL`, `SERIES` 컬럼이 모두 있는 행만 사용합니다.
fn parse_equity_csv(content: &str) -> SourceResult<Vec<SymbolListing>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SourceError::Parse(format!("nse csv header: {}", e)))?
        .clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| SourceError::Parse(format!("nse csv: missing {} column", name)))
    };
    let symbol_idx = column("SYMBOL")?;
    let series_idx = column("SERIES")?;

    let mut listings = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| SourceError::Parse(format!("nse csv row: {}", e)))?;

        let symbol = row.get(symbol_idx).and_then(normalize_symbol);
        let series = row.get(series_idx).filter(|s| !s.is_empty());

        if let (Some(symbol), Some(series)) = (symbol, series) {
            listings.push(SymbolListing::new(symbol, series));
        }
    }

    Ok(listings)
}

fn extract_classification(quote: QuoteResponse) -> Option<Classification> {
    let info = quote.equity_response.into_iter().next()?.sec_info?;
    Classification::from_parts(
        info.macro_sector.as_deref(),
        info.sector.as_deref(),
        info.industry_info.as_deref(),
        info.basic_industry.as_deref(),
    )
}
