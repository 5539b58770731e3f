//! HTML 테이블 스크래퍼.
//!
//! Chittorgarh, Moneycontrol처럼 IPO 일정을 HTML 테이블로 제공하는 페이지를
//! 파싱합니다. 행 셀렉터와 열 매핑만 다르므로 하나의 구현을 공유합니다.
//!
//! | 소스 | 행 셀렉터 | td0 | td1 | td2 |
//! |---|---|---|---|---|
//! | chittorgarh | `.table.table-striped tr` | name | issueOpenDate | issueCloseDate |
//! | moneycontrol | `.tblList tbody tr` | name | issueOpenDate | issueCloseDate |
//!
//! 두 페이지 모두 예정 IPO 목록이므로 상태는 `Upcoming`으로 고정합니다.

use async_trait::async_trait;
use ipo_core::{ListingFields, RawRecord, SourceId, SourceRole};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{clean_text, ListingSource};
use crate::error::SourceError;

/// 테이블 열 → 필드 매핑.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: usize,
    pub issue_open_date: Option<usize>,
    pub issue_close_date: Option<usize>,
    pub listing_date: Option<usize>,
    pub price_band: Option<usize>,
    pub lot_size: Option<usize>,
    pub issue_size: Option<usize>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            name: 0,
            issue_open_date: Some(1),
            issue_close_date: Some(2),
            listing_date: None,
            price_band: None,
            lot_size: None,
            issue_size: None,
        }
    }
}

/// HTML 테이블 기반 IPO 소스.
pub struct HtmlTableSource {
    id: SourceId,
    priority: u8,
    client: Client,
    url: String,
    row_selector: String,
    columns: ColumnMap,
    default_status: String,
}

impl HtmlTableSource {
    pub fn new(
        id: impl Into<SourceId>,
        priority: u8,
        client: Client,
        url: impl Into<String>,
        row_selector: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            priority,
            client,
            url: url.into(),
            row_selector: row_selector.into(),
            columns: ColumnMap::default(),
            default_status: "Upcoming".to_string(),
        }
    }

    /// Chittorgarh 예정 IPO 페이지.
    pub fn chittorgarh(client: Client, url: impl Into<String>) -> Self {
        Self::new("chittorgarh", 1, client, url, ".table.table-striped tr")
    }

    /// Moneycontrol IPO 페이지.
    pub fn moneycontrol(client: Client, url: impl Into<String>) -> Self {
        Self::new("moneycontrol", 2, client, url, ".tblList tbody tr")
    }

    /// 열 매핑 변경.
    pub fn with_columns(mut self, columns: ColumnMap) -> Self {
        self.columns = columns;
        self
    }

    /// HTML 문서에서 레코드 추출.
    ///
    /// `td`가 없는 행(헤더)과 이름 셀이 비어 있는 행은 건너뜁니다.
    pub fn parse_document(&self, html: &str) -> Result<Vec<RawRecord>, SourceError> {
        let row_selector = Selector::parse(&self.row_selector)
            .map_err(|e| SourceError::Parse(format!("잘못된 셀렉터 {}: {}", self.row_selector, e)))?;
        let cell_selector =
            Selector::parse("td").map_err(|e| SourceError::Parse(e.to_string()))?;

        let document = Html::parse_document(html);
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for row in document.select(&row_selector) {
            let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
            if cells.is_empty() {
                continue;
            }

            let cell = |idx: Option<usize>| {
                idx.and_then(|i| cells.get(i))
                    .and_then(|c| clean_text(&c.text().collect::<String>()))
            };

            let Some(name) = cell(Some(self.columns.name)) else {
                skipped += 1;
                continue;
            };

            let fields = ListingFields {
                issue_open_date: cell(self.columns.issue_open_date),
                issue_close_date: cell(self.columns.issue_close_date),
                listing_date: cell(self.columns.listing_date),
                price_band: cell(self.columns.price_band),
                lot_size: cell(self.columns.lot_size),
                issue_size: cell(self.columns.issue_size),
                ..Default::default()
            };

            records.push(
                RawRecord::new(self.id.clone(), name)
                    .with_status(self.default_status.as_str())
                    .with_fields(fields),
            );
        }

        if skipped > 0 {
            debug!(source = %self.id, skipped, "이름 없는 행 제외");
        }

        Ok(records)
    }
}

#[async_trait]
impl ListingSource for HtmlTableSource {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    fn role(&self) -> SourceRole {
        SourceRole::Primary
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError> {
        debug!(source = %self.id, url = %self.url, "HTML 페이지 요청");

        let response = self.client.get(&self.url).send().await?;
        if let Some(err) = SourceError::from_status(response.status()) {
            return Err(err);
        }

        let html = response.text().await?;
        self.parse_document(&html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHITTORGARH_HTML: &str = r#"
        <html><body>
        <table class="table table-striped">
            <tr><th>Company</th><th>Open</th><th>Close</th></tr>
            <tr><td><a href="/ipo/abc">ABC Ltd IPO</a></td><td>Oct 10, 2024</td><td>Oct 14, 2024</td></tr>
            <tr><td>  Neotech
                Labs Ltd </td><td>Oct 15, 2024</td><td></td></tr>
            <tr><td></td><td>Oct 16, 2024</td><td>Oct 18, 2024</td></tr>
        </table>
        </body></html>
    "#;

    const MONEYCONTROL_HTML: &str = r#"
        <table class="tblList">
            <thead><tr><th>Name</th><th>Open</th><th>Close</th></tr></thead>
            <tbody>
                <tr><td>XYZ Industries</td><td>21-10-2024</td><td>23-10-2024</td></tr>
            </tbody>
        </table>
    "#;

    #[test]
    fn test_chittorgarh_rows() {
        let source = HtmlTableSource::chittorgarh(Client::new(), "http://localhost");
        let records = source.parse_document(CHITTORGARH_HTML).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "ABC Ltd IPO");
        assert_eq!(records[0].status.as_deref(), Some("Upcoming"));
        assert_eq!(records[0].fields.issue_open_date.as_deref(), Some("Oct 10, 2024"));
        assert_eq!(records[0].fields.issue_close_date.as_deref(), Some("Oct 14, 2024"));
        assert_eq!(records[1].name, "Neotech Labs Ltd");
        assert!(records[1].fields.issue_close_date.is_none());
        assert_eq!(records[0].source.as_str(), "chittorgarh");
    }

    #[test]
    fn test_moneycontrol_rows() {
        let source = HtmlTableSource::moneycontrol(Client::new(), "http://localhost");
        let records = source.parse_document(MONEYCONTROL_HTML).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "XYZ Industries");
        assert_eq!(records[0].fields.issue_close_date.as_deref(), Some("23-10-2024"));
        assert_eq!(source.priority(), 2);
    }

    #[test]
    fn test_page_without_table() {
        let source = HtmlTableSource::moneycontrol(Client::new(), "http://localhost");
        assert!(source.parse_document("<html></html>").unwrap().is_empty());
    }

    #[test]
    fn test_custom_columns() {
        let html = r#"<table class="tblList"><tbody>
            <tr><td>1</td><td>ABC</td><td>₹95-100</td></tr>
        </tbody></table>"#;
        let source = HtmlTableSource::moneycontrol(Client::new(), "http://localhost").with_columns(
            ColumnMap {
                name: 1,
                issue_open_date: None,
                issue_close_date: None,
                price_band: Some(2),
                ..Default::default()
            },
        );

        let records = source.parse_document(html).unwrap();
        assert_eq!(records[0].name, "ABC");
        assert_eq!(records[0].fields.price_band.as_deref(), Some("₹95-100"));
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/ipo/")
            .with_status(500)
            .create_async()
            .await;

        let url = format!("{}/ipo/", server.url());
        let source = HtmlTableSource::chittorgarh(Client::new(), url);
        assert!(matches!(
            source.fetch().await,
            Err(SourceError::HttpStatus { status: 500 })
        ));
    }

    #[tokio::test]
    async fn test_fetch_parses_page() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/ipo/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(CHITTORGARH_HTML)
            .create_async()
            .await;

        let url = format!("{}/ipo/", server.url());
        let source = HtmlTableSource::chittorgarh(Client::new(), url);
        assert_eq!(source.fetch().await.unwrap().len(), 2);
    }

    #[tokio::test]
    #[ignore] // 실제 네트워크 호출
    async fn test_chittorgarh_live() {
        let source = HtmlTableSource::chittorgarh(
            Client::new(),
            "https://www.chittorgarh.com/ipo/upcoming-ipo/",
        );
        let records = source.fetch().await.unwrap();
        println!("chittorgarh: {} rows", records.len());
    }
}
