use tracing::debug;

use super::markup::{cells, draw_id, link_texts, numbers, strip_tags};
use super::Extractor;
use crate::record::{normalize_date, DrawResult, Record, Shape};

const KENO_NUMBERS: usize = 20;

/// Keno result table: header row, then
/// `<td><a>date</a><a>#id</a></td><td>20 spans</td><td>big/small</td><td>odd/even</td>`.
pub struct KenoExtractor;

impl Extractor for KenoExtractor {
    fn skips_header(&self) -> bool {
        true
    }

    fn parse_row(&self, row: &str, page: u32) -> Option<Record> {
        let cells = cells(row);
        if cells.len() < 4 {
            return None;
        }

        let links = link_texts(cells[0]);
        if links.len() < 2 {
            return None;
        }
        let Some(date) = normalize_date(&links[0]) else {
            debug!("Skipping keno row with date '{}' on page {}", links[0], page);
            return None;
        };
        let id = draw_id(&links[1]);

        let drawn = numbers(cells[1]);
        if !Shape::exactly(KENO_NUMBERS).accepts(drawn.len(), &id, page) {
            return None;
        }

        Some(
            Record::new(date, id, DrawResult::Numbers(drawn), page)
                .with_extra("big_small", strip_tags(cells[2]))
                .with_extra("odd_even", strip_tags(cells[3])),
        )
    }
}
