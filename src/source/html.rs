use async_trait::async_trait;
use chrono::NaiveDate;
use scraper::{Html, Selector};

use crate::config::SourceConfig;
use crate::constants::{PICK_COUNT, PRIZE_TIER_COUNT, SOURCE_DATE_FORMAT};
use crate::source::{DrawSource, SourceError};
use crate::store::operations::draws::{DrawResult, PrizeTierDetail};

// Result-page selectors. Any structural change on the publisher side
// degrades to a typed failure, never to corrupted data.
const SEL_LATEST_ROUND: &str = "#lottoDrwNo";
const SEL_ROUND_HEADER: &str = ".win_result h4 strong";
const SEL_DRAW_DATE: &str = ".win_result p.desc";
const SEL_WIN_BALLS: &str = "div.num.win p span.ball_645";
const SEL_BONUS_BALL: &str = "div.num.bonus p span.ball_645";
const SEL_TIER_ROWS: &str = "table.tbl_data tbody tr";
const SEL_TOTAL_SALES: &str = "ul.list_text_common li strong";

/// Scrapes the publisher's result pages over HTTP. The client carries a
/// bounded timeout; an elapsed wait surfaces as `Unavailable`, not a crash.
pub struct HtmlDrawSource {
    client: reqwest::Client,
    base_url: String,
}

impl HtmlDrawSource {
    /// Fails if the HTTP client cannot be built; a client without the
    /// configured timeout would wait on the publisher unboundedly.
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::unavailable(format!("http client build failed: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn main_page_url(&self) -> String {
        format!("{}/common.do?method=main", self.base_url)
    }

    fn round_page_url(&self, round: u32) -> String {
        format!(
            "{}/gameResult.do?method=byWin&drwNo={}",
            self.base_url, round
        )
    }

    async fn fetch_page(&self, url: &str) -> Result<String, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::unavailable(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SourceError::unavailable(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::unavailable(format!("body read failed: {e}")))
    }
}

#[async_trait]
impl DrawSource for HtmlDrawSource {
    async fn latest_round(&self) -> Result<u32, SourceError> {
        let html = self.fetch_page(&self.main_page_url()).await?;
        parse_latest_round(&html)
    }

    async fn fetch_round(&self, round: u32) -> Result<DrawResult, SourceError> {
        let html = self.fetch_page(&self.round_page_url(round)).await?;
        parse_draw_page(round, &html)
    }
}

/// Extract the latest-round marker from the publisher's main page.
pub fn parse_latest_round(html: &str) -> Result<u32, SourceError> {
    let document = Html::parse_document(html);
    let marker = selector(SEL_LATEST_ROUND);
    document
        .select(&marker)
        .next()
        .and_then(|el| digits_u64(&element_text(&el)))
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| SourceError::unavailable("latest-round marker absent"))
}

/// Extract one round's full result from its result page.
///
/// The publisher serves the latest round's page for not-yet-published round
/// numbers, so a header/requested mismatch means "not published yet" rather
/// than a parse bug.
pub fn parse_draw_page(round: u32, html: &str) -> Result<DrawResult, SourceError> {
    let document = Html::parse_document(html);

    let header_round = document
        .select(&selector(SEL_ROUND_HEADER))
        .next()
        .and_then(|el| digits_u64(&element_text(&el)))
        .ok_or(SourceError::Parse {
            round,
            field: "round header",
        })?;
    if header_round != round as u64 {
        return Err(SourceError::unavailable(format!(
            "round {} not yet published (page shows {})",
            round, header_round
        )));
    }

    let draw_date = document
        .select(&selector(SEL_DRAW_DATE))
        .next()
        .map(|el| element_text(&el))
        .and_then(|text| parse_draw_date(&text))
        .ok_or(SourceError::Parse {
            round,
            field: "draw date",
        })?;

    let balls: Vec<u8> = document
        .select(&selector(SEL_WIN_BALLS))
        .filter_map(|el| digits_u64(&element_text(&el)))
        .filter_map(|n| u8::try_from(n).ok())
        .collect();
    if balls.len() != PICK_COUNT {
        return Err(SourceError::Parse {
            round,
            field: "winning numbers",
        });
    }
    let mut numbers = [0u8; PICK_COUNT];
    numbers.copy_from_slice(&balls);

    let bonus_number = document
        .select(&selector(SEL_BONUS_BALL))
        .next()
        .and_then(|el| digits_u64(&element_text(&el)))
        .and_then(|n| u8::try_from(n).ok())
        .ok_or(SourceError::Parse {
            round,
            field: "bonus number",
        })?;

    let prize_tiers = parse_prize_tiers(round, &document)?;
    let first = prize_tiers.first().ok_or(SourceError::Parse {
        round,
        field: "first prize tier",
    })?;
    let (first_prize_winner_count, first_prize_amount) = (first.winner_count, first.amount);

    let total_sales_amount = document
        .select(&selector(SEL_TOTAL_SALES))
        .next()
        .and_then(|el| digits_u64(&element_text(&el)))
        .ok_or(SourceError::Parse {
            round,
            field: "total sales",
        })?;

    Ok(DrawResult {
        round,
        draw_date,
        numbers,
        bonus_number,
        first_prize_winner_count,
        first_prize_amount,
        total_sales_amount,
        prize_tiers,
    })
}

/// Up to the top five tier rows: rank | total amount | winner count |
/// per-winner amount | criteria. Short or reordered tables fail typed.
fn parse_prize_tiers(round: u32, document: &Html) -> Result<Vec<PrizeTierDetail>, SourceError> {
    let row_sel = selector(SEL_TIER_ROWS);
    let cell_sel = selector("td");
    let mut tiers = Vec::with_capacity(PRIZE_TIER_COUNT);

    for row in document.select(&row_sel).take(PRIZE_TIER_COUNT) {
        let cells: Vec<String> = row.select(&cell_sel).map(|el| element_text(&el)).collect();
        if cells.len() < 4 {
            return Err(SourceError::Parse {
                round,
                field: "prize tier row",
            });
        }

        let rank = digits_u64(&cells[0])
            .and_then(|n| u8::try_from(n).ok())
            .ok_or(SourceError::Parse {
                round,
                field: "prize tier rank",
            })?;
        let winner_count = digits_u64(&cells[2])
            .and_then(|n| u32::try_from(n).ok())
            .ok_or(SourceError::Parse {
                round,
                field: "prize tier winner count",
            })?;
        let amount = digits_u64(&cells[3]).ok_or(SourceError::Parse {
            round,
            field: "prize tier amount",
        })?;

        tiers.push(PrizeTierDetail {
            rank,
            winner_count,
            amount,
        });
    }

    if tiers.len() != PRIZE_TIER_COUNT {
        return Err(SourceError::Parse {
            round,
            field: "prize tier table",
        });
    }
    Ok(tiers)
}

/// e.g. "(2024년 01월 06일 추첨)" -> 2024-01-06
fn parse_draw_date(text: &str) -> Option<NaiveDate> {
    let cleaned = text
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim_end_matches("추첨")
        .trim();
    NaiveDate::parse_from_str(cleaned, SOURCE_DATE_FORMAT).ok()
}

/// Strip every non-digit character and parse what remains. Empty -> None.
fn digits_u64(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok()
}

fn element_text(el: &scraper::ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

fn selector(raw: &str) -> Selector {
    // Selector constants are compile-time fixed strings.
    Selector::parse(raw).expect("invalid static selector")
}
