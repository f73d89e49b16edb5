use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::markup::{cells, draw_id, link_texts, strip_tags};
use super::Extractor;
use crate::record::{normalize_date, DrawResult, PrizeTiers, Record, Shape};

static DRAW_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Ngày:\s*(\d{1,2}/\d{1,2}/\d{4})").unwrap());
static RESULT_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div[^>]*class="[^"]*tong_day_so_ket_qua[^"]*"[^>]*>(.*?)</div>"#).unwrap()
});
static BALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span[^>]*class="[^"]*bong_tron[^"]*"[^>]*>\s*(\d+)\s*</span>"#).unwrap()
});

const DIGITS_PER_NUMBER: usize = 3;

/// Max 3D prize tiers, in the order their digits appear on the page.
pub const MAX3D_TIERS: &[(&str, usize)] = &[
    ("Giải Đặc biệt", 6),
    ("Giải Nhất", 12),
    ("Giải Nhì", 18),
    ("Giải ba", 24),
];

/// Max 3D family: every digit of every prize is its own ball span, and the
/// prize a digit belongs to is only known from its position.
pub struct Max3dExtractor {
    pub tiers: &'static [(&'static str, usize)],
}

impl Max3dExtractor {
    fn shape(&self) -> Shape {
        Shape::exactly(self.tiers.iter().map(|(_, n)| n).sum())
    }

    fn group(&self, digits: &[String]) -> PrizeTiers {
        let mut tiers = Vec::with_capacity(self.tiers.len());
        let mut offset = 0;
        for (name, count) in self.tiers {
            let end = (offset + count).min(digits.len());
            let numbers = digits[offset..end]
                .chunks(DIGITS_PER_NUMBER)
                .map(|chunk| chunk.concat())
                .collect();
            tiers.push((name.to_string(), numbers));
            offset = end;
        }
        PrizeTiers(tiers)
    }
}

impl Extractor for Max3dExtractor {
    fn parse_row(&self, row: &str, page: u32) -> Option<Record> {
        let raw_date = DRAW_DATE_RE.captures(row)?.get(1)?.as_str().to_string();
        let date = normalize_date(&raw_date)?;

        let cells = cells(row);
        let first = cells.first()?;
        let id = draw_id(link_texts(first).first()?);

        let Some(block) = RESULT_BLOCK_RE.captures(row) else {
            debug!("No result block for ID {} on page {}", id, page);
            return None;
        };
        let block = block.get(1)?.as_str();

        let mut digits: Vec<String> = BALL_RE
            .captures_iter(block)
            .map(|c| c[1].to_string())
            .collect();
        if digits.is_empty() {
            digits = strip_tags(block)
                .split_whitespace()
                .filter(|t| t.bytes().all(|b| b.is_ascii_digit()))
                .map(str::to_string)
                .collect();
        }

        if !self.shape().accepts(digits.len(), &id, page) {
            return None;
        }

        Some(Record::new(
            date,
            id,
            DrawResult::Tiers(self.group(&digits)),
            page,
        ))
    }
}
