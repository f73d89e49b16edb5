use tracing::debug;

use super::markup::{cells, draw_id, link_texts, numbers, strip_tags};
use super::Extractor;
use crate::record::{normalize_date, DrawResult, Record, Shape};

/// Power 6/45, 6/55 and 5/35 result tables.
///
/// Row layout: `<td>DD/MM/YYYY</td><td><a>id</a></td><td>number spans</td>`.
/// The bonus/special number, when the game has one, is the last span.
pub struct PowerExtractor {
    pub shape: Shape,
}

impl PowerExtractor {
    pub const fn new(numbers: usize) -> Self {
        PowerExtractor {
            shape: Shape::exactly(numbers),
        }
    }
}

impl Extractor for PowerExtractor {
    fn parse_row(&self, row: &str, page: u32) -> Option<Record> {
        let cells = cells(row);
        if cells.len() < 3 {
            return None;
        }

        let raw_date = strip_tags(cells[0]);
        let Some(date) = normalize_date(&raw_date) else {
            debug!("Skipping row with unparseable date '{}' on page {}", raw_date, page);
            return None;
        };

        let id = link_texts(cells[1])
            .first()
            .map(|text| draw_id(text))
            .unwrap_or_else(|| draw_id(&strip_tags(cells[1])));
        if id.is_empty() {
            return None;
        }

        let drawn = numbers(cells[2]);
        if !self.shape.accepts(drawn.len(), &id, page) {
            return None;
        }

        Some(Record::new(date, id, DrawResult::Numbers(drawn), page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_page;

    fn fixture() -> serde_json::Value {
        let raw = std::fs::read_to_string("tests/fixtures/power655.json").unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn power655_page_has_eight_draws() {
        let records = parse_page(&PowerExtractor::new(7), &fixture(), 1);
        assert_eq!(records.len(), 8);

        let first = &records[0];
        assert_eq!(first.date, "2025-09-25");
        assert_eq!(first.id, "01247");
        assert_eq!(first.result, DrawResult::Numbers(vec![5, 17, 30, 31, 38, 53, 8]));
        assert_eq!(first.page, 1);

        let last = &records[7];
        assert_eq!(last.date, "2025-09-09");
        assert_eq!(last.id, "01240");
        assert_eq!(last.result, DrawResult::Numbers(vec![16, 20, 21, 31, 40, 52, 2]));
    }

    #[test]
    fn every_draw_is_well_formed() {
        let records = parse_page(&PowerExtractor::new(7), &fixture(), 1);
        let iso = regex::Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
        let five_digits = regex::Regex::new(r"^\d{5}$").unwrap();
        for r in &records {
            assert!(matches!(&r.result, DrawResult::Numbers(n) if n.len() == 7));
            assert!(iso.is_match(&r.date), "{}", r.date);
            assert!(five_digits.is_match(&r.id), "{}", r.id);
            assert!(r.extra.is_empty());
        }
    }

    #[test]
    fn wrong_count_is_dropped() {
        // 6/45 expects six numbers; every 6/55 row carries seven.
        let records = parse_page(&PowerExtractor::new(6), &fixture(), 1);
        assert!(records.is_empty());
    }

    #[test]
    fn short_rows_are_skipped_not_fatal() {
        let html = concat!(
            "<tr><td>25/09/2025</td><td><a>01247</a></td></tr>",
            "<tr><td>bad date</td><td><a>01246</a></td><td><span>1</span></td></tr>",
            "<tr><td>20/09/2025</td><td><a>01245</a></td><td>",
            "<span>1</span><span>2</span><span>3</span><span>4</span><span>5</span><span>6</span>",
            "</td></tr>",
        );
        let records = PowerExtractor::new(6).extract(html, 0);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "01245");
        assert_eq!(records[0].date, "2025-09-20");
    }

    #[test]
    fn plain_text_numbers_and_id() {
        let html = "<tr><td>02/01/2025</td><td>00123</td><td>01 02 03 04 05 | 06</td></tr>";
        let records = PowerExtractor::new(6).extract(html, 2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "00123");
        assert_eq!(records[0].result, DrawResult::Numbers(vec![1, 2, 3, 4, 5, 6]));
    }
}
