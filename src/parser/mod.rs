pub mod bingo;
pub mod keno;
pub mod markup;
pub mod max3d;
pub mod power;

use serde_json::Value;
use tracing::{debug, warn};

use crate::record::Record;

/// Product-specific strategy for turning one result table into records.
///
/// Implementations only describe a single row; splitting the fragment into
/// rows, header skipping and logging are shared.
pub trait Extractor: Send + Sync {
    /// Whether the first `<tr>` is always a header.
    fn skips_header(&self) -> bool {
        false
    }

    /// `None` means the row is skipped; a reason is logged at debug level or
    /// by shape validation.
    fn parse_row(&self, row: &str, page: u32) -> Option<Record>;

    fn extract(&self, html: &str, page: u32) -> Vec<Record> {
        let skip = usize::from(self.skips_header());
        markup::rows(html)
            .skip(skip)
            .filter_map(|row| self.parse_row(row, page))
            .collect()
    }
}

/// Parse one raw response payload. Never fails: a payload without an HTML
/// fragment yields no records and a warning.
pub fn parse_page(extractor: &dyn Extractor, payload: &Value, page: u32) -> Vec<Record> {
    let Some(html) = html_fragment(payload) else {
        warn!("No HTML content found for page {}", page);
        return Vec::new();
    };
    let records = extractor.extract(&html, page);
    debug!("Parsed {} results from page {}", records.len(), page);
    records
}

/// Locate the HTML fragment inside an AjaxPro envelope.
///
/// Accepted shapes: the envelope itself as a JSON string, `value` holding the
/// fragment directly, `value` holding a JSON string, or `value.HtmlContent`.
pub fn html_fragment(payload: &Value) -> Option<String> {
    let reparsed;
    let envelope = match payload {
        Value::String(s) => {
            reparsed = serde_json::from_str::<Value>(s).ok()?;
            &reparsed
        }
        other => other,
    };

    let html = match envelope.get("value")? {
        Value::Object(obj) => obj.get("HtmlContent")?.as_str()?.to_string(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(obj)) => obj.get("HtmlContent")?.as_str()?.to_string(),
            _ => s.clone(),
        },
        _ => return None,
    };

    if html.trim().is_empty() {
        None
    } else {
        Some(html)
    }
}
