//! GMP(grey-market premium) RSS 피드.
//!
//! 보조 신호 소스입니다. 각 `<item>`의 `<title>`에서 회사명, GMP,
//! 예상 수익률을 추출합니다.
//!
//! ```text
//! ABC Ltd IPO GMP: +45 (12.5%)      → name="ABC Ltd IPO", gmp="+45", gainPercent="12.5%"
//! XYZ Industries IPO GMP today ₹30  → name="XYZ Industries IPO", gmp="today ₹30"
//! ```
//!
//! 상태 정보는 제공하지 않으므로 단독으로는 레코드를 만들지 않고,
//! Reconciler가 기존 레코드에 결합합니다.

use async_trait::async_trait;
use ipo_core::{ListingFields, RawRecord, SourceId, SourceRole};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use tracing::debug;

use super::{clean_text, ListingSource};
use crate::error::SourceError;

/// 소스 식별자.
pub const SOURCE_ID: &str = "gmp_feed";

/// GMP RSS 피드 소스.
pub struct GmpFeedSource {
    client: Client,
    url: String,
}

impl GmpFeedSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// RSS 문서에서 GMP 레코드 추출.
    ///
    /// GMP 표기를 찾을 수 없는 항목은 건너뜁니다.
    pub fn parse_feed(&self, xml: &str) -> Result<Vec<RawRecord>, SourceError> {
        let source = self.id();
        let titles = item_titles(xml)?;
        let total = titles.len();

        let records: Vec<RawRecord> = titles
            .iter()
            .filter_map(|title| parse_gmp_title(title))
            .map(|(name, gmp, gain)| {
                RawRecord::new(source.clone(), name).with_fields(ListingFields {
                    gmp: Some(gmp),
                    gain_percent: gain,
                    ..Default::default()
                })
            })
            .collect();

        if records.len() < total {
            debug!(
                skipped = total - records.len(),
                "GMP 표기 없는 RSS 항목 제외"
            );
        }

        Ok(records)
    }
}

/// `<item>` (또는 Atom `<entry>`) 내부의 `<title>` 텍스트 수집.
fn item_titles(xml: &str) -> Result<Vec<String>, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut titles = Vec::new();
    let mut in_item = false;
    let mut in_title = false;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"item" | b"entry" => in_item = true,
                b"title" if in_item => {
                    in_title = true;
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"item" | b"entry" => in_item = false,
                b"title" if in_title => {
                    in_title = false;
                    titles.push(current.trim().to_string());
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_title => {
                let text = t
                    .unescape()
                    .map_err(|e| SourceError::Parse(format!("RSS 텍스트: {}", e)))?;
                current.push_str(&text);
            }
            Ok(Event::CData(c)) if in_title => {
                current.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SourceError::Parse(format!(
                    "RSS 파싱 실패 (위치 {}): {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(titles)
}

/// 제목에서 (이름, GMP, 예상 수익률) 추출.
fn parse_gmp_title(title: &str) -> Option<(String, String, Option<String>)> {
    // ASCII 소문자 변환은 바이트 위치를 유지함
    let lower = title.to_ascii_lowercase();
    let idx = lower.find("gmp")?;

    let name = title[..idx]
        .trim_end_matches(|c: char| c == '-' || c == ':' || c == '|' || c.is_whitespace());
    let name = clean_text(name)?;

    let rest = title[idx + 3..]
        .trim_start_matches(|c: char| c == ':' || c == '-' || c == '=' || c.is_whitespace());

    let (gmp_part, gain_part) = match rest.find('(') {
        Some(open) => {
            let close = rest[open..]
                .find(')')
                .map(|offset| open + offset)
                .unwrap_or(rest.len());
            (&rest[..open], Some(&rest[open + 1..close]))
        }
        None => (rest, None),
    };

    let gmp = clean_text(gmp_part)?;
    let gain = gain_part
        .map(str::trim)
        .filter(|g| g.contains('%'))
        .map(str::to_string);

    Some((name, gmp, gain))
}

#[async_trait]
impl ListingSource for GmpFeedSource {
    fn id(&self) -> SourceId {
        SourceId::new(SOURCE_ID)
    }

    fn role(&self) -> SourceRole {
        SourceRole::Auxiliary
    }

    fn priority(&self) -> u8 {
        10
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError> {
        debug!(url = %self.url, "GMP 피드 요청");

        let response = self.client.get(&self.url).send().await?;
        if let Some(err) = SourceError::from_status(response.status()) {
            return Err(err);
        }

        let xml = response.text().await?;
        self.parse_feed(&xml)
    }
}
