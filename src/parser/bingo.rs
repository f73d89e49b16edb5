use tracing::warn;

use super::markup::{cells, draw_id, link_texts, numbers, strip_tags};
use super::Extractor;
use crate::record::{normalize_date, DrawResult, Record, Shape};

const BINGO_NUMBERS: usize = 3;
const MAX_DIGIT: u32 = 9;

/// Bingo18: three dice-like digits per draw, plus total and large/small.
pub struct Bingo18Extractor;

impl Extractor for Bingo18Extractor {
    fn skips_header(&self) -> bool {
        true
    }

    fn parse_row(&self, row: &str, page: u32) -> Option<Record> {
        let cells = cells(row);
        if cells.len() < 2 {
            return None;
        }

        let links = link_texts(cells[0]);
        if links.len() < 2 {
            return None;
        }
        let date = normalize_date(&links[0])?;
        let id = draw_id(&links[1]);

        let drawn = numbers(cells[1]);
        if !Shape::exactly(BINGO_NUMBERS).accepts(drawn.len(), &id, page) {
            return None;
        }
        if let Some(bad) = drawn.iter().find(|&&n| n > MAX_DIGIT) {
            warn!(
                "Invalid digit {} (expected 0-{}) for ID {} on page {}",
                bad, MAX_DIGIT, id, page
            );
            return None;
        }

        let total = cells
            .get(2)
            .and_then(|cell| strip_tags(cell).parse::<u32>().ok())
            .unwrap_or_else(|| drawn.iter().sum());
        let large_small = cells
            .get(3)
            .map(|cell| strip_tags(cell))
            .filter(|text| !text.is_empty());

        let mut record = Record::new(date, id, DrawResult::Numbers(drawn), page)
            .with_extra("total", total);
        if let Some(label) = large_small {
            record = record.with_extra("large_small", label);
        }
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r##"
<table>
  <tr><th>Kỳ</th><th>Kết quả</th><th>Tổng</th><th>Lớn/Nhỏ</th></tr>
  <tr>
    <td><a href="#">14/10/2025</a> <a href="/bingo18?id=0107001">#0107001</a></td>
    <td><span class="bong_tron">4</span><span class="bong_tron">6</span><span class="bong_tron">5</span></td>
    <td>15</td>
    <td><b>Lớn</b></td>
  </tr>
  <tr>
    <td><a>14/10/2025</a><a>0107000</a></td>
    <td>1 2 3</td>
    <td>--</td>
  </tr>
  <tr>
    <td><a>14/10/2025</a><a>0106999</a></td>
    <td><span>1</span><span>2</span><span>3</span><span>4</span></td>
    <td>10</td>
    <td>Nhỏ</td>
  </tr>
  <tr>
    <td><a>14/10/2025</a></td>
    <td><span>1</span><span>2</span><span>3</span></td>
  </tr>
</table>"##;

    #[test]
    fn bingo_rows() {
        let records = Bingo18Extractor.extract(TABLE, 0);
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.id, "0107001");
        assert_eq!(first.date, "2025-10-14");
        assert_eq!(first.result, DrawResult::Numbers(vec![4, 6, 5]));
        assert_eq!(first.extra["total"], 15);
        assert_eq!(first.extra["large_small"], "Lớn");
    }

    #[test]
    fn total_falls_back_to_sum() {
        let records = Bingo18Extractor.extract(TABLE, 0);
        let second = &records[1];
        assert_eq!(second.id, "0107000");
        assert_eq!(second.result, DrawResult::Numbers(vec![1, 2, 3]));
        assert_eq!(second.extra["total"], 6);
        assert!(!second.extra.contains_key("large_small"));
    }

    #[test]
    fn out_of_range_digits_drop_the_row() {
        let html = concat!(
            "<tr><th>h</th></tr>",
            "<tr><td><a>14/10/2025</a><a>#1</a></td>",
            "<td><span>4294967295</span><span>4294967295</span><span>1</span></td></tr>",
            "<tr><td><a>14/10/2025</a><a>#2</a></td>",
            "<td><span>9</span><span>10</span><span>0</span></td></tr>",
            "<tr><td><a>14/10/2025</a><a>#3</a></td>",
            "<td><span>9</span><span>9</span><span>9</span></td></tr>",
        );
        let records = Bingo18Extractor.extract(html, 0);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "3");
        assert_eq!(records[0].extra["total"], 27);
    }
}
