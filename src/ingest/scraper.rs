use anyhow::Result;
use ::scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::error::DataResult;
use crate::fetch::{HttpClient, fetch_text};
use crate::table::Table;

/// CSS class identifying the delay table on the timetable page.
pub const DELAY_TABLE_CLASS: &str = "delays-table";

/// Header row plus string cells lifted from an HTML table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ScrapedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_table(self) -> DataResult<Table> {
        Table::from_text_rows(&self.headers, &self.rows)
    }

    /// Appends rows from another scrape with the same headers. Rows from a
    /// scrape with different headers are dropped with a warning.
    pub fn extend(&mut self, other: ScrapedTable) {
        if other.is_empty() {
            return;
        }
        if self.headers.is_empty() {
            self.headers = other.headers;
        } else if self.headers != other.headers {
            warn!(
                expected = ?self.headers,
                found = ?other.headers,
                "Scraped headers differ, skipping rows"
            );
            return;
        }
        self.rows.extend(other.rows);
    }
}

/// Fetches `url` with `params` and extracts the delay table.
///
/// A page without the table yields an empty result; transport and HTTP
/// status failures are returned as errors.
#[tracing::instrument(skip(client, params))]
pub async fn scrape_delays<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    params: &[(&str, String)],
) -> Result<ScrapedTable> {
    let html = fetch_text(client, url, params).await?;
    debug!(bytes = html.len(), "Timetable page received");
    Ok(parse_delay_table(&html, DELAY_TABLE_CLASS).unwrap_or_default())
}

/// Extracts `table.<class>` from an HTML document.
///
/// Headers come from `thead th`, rows from `tbody tr` / `td`. Rows whose
/// cell count does not match the header count are skipped. Returns `None`
/// when no such table exists.
pub fn parse_delay_table(html: &str, class: &str) -> Option<ScrapedTable> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse(&format!("table.{class}")).ok()?;
    let header_sel = Selector::parse("thead th").ok()?;
    let row_sel = Selector::parse("tbody tr").ok()?;
    let cell_sel = Selector::parse("td").ok()?;

    let Some(table) = document.select(&table_sel).next() else {
        warn!(class, "No table with the expected class found, adjust selectors as needed");
        return None;
    };

    let headers: Vec<String> = table.select(&header_sel).map(cell_text).collect();
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for tr in table.select(&row_sel) {
        let values: Vec<String> = tr.select(&cell_sel).map(cell_text).collect();
        if values.len() == headers.len() {
            rows.push(values);
        } else {
            skipped += 1;
        }
    }
    if skipped > 0 {
        debug!(skipped, "Rows with mismatched cell count skipped");
    }

    Some(ScrapedTable { headers, rows })
}

fn cell_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <table class="other"><tr><td>ignore</td></tr></table>
          <table class="delays-table">
            <thead><tr><th>train_id</th><th>scheduled_time</th><th>delay_minutes</th></tr></thead>
            <tbody>
              <tr><td>R123</td><td>2023-01-15 08:00:00</td><td> 5 </td></tr>
              <tr><td>EC456</td><td>2023-01-15 10:30:00</td></tr>
              <tr><td><b>Os 3</b></td><td>2023-01-15 12:00:00</td><td>0</td></tr>
            </tbody>
          </table>
        </body></html>"#;

    #[test]
    fn test_parse_delay_table_extracts_rows() {
        let scraped = parse_delay_table(PAGE, DELAY_TABLE_CLASS).unwrap();
        assert_eq!(
            scraped.headers,
            vec!["train_id", "scheduled_time", "delay_minutes"]
        );
        // the short row is skipped
        assert_eq!(scraped.rows.len(), 2);
        assert_eq!(scraped.rows[0][2], "5");
        assert_eq!(scraped.rows[1][0], "Os 3");
    }

    #[test]
    fn test_parse_delay_table_missing_table() {
        assert!(parse_delay_table("<html><body></body></html>", DELAY_TABLE_CLASS).is_none());
    }

    #[test]
    fn test_into_table() {
        let table = parse_delay_table(PAGE, DELAY_TABLE_CLASS)
            .unwrap()
            .into_table()
            .unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.has_column("delay_minutes"));
    }

    #[test]
    fn test_extend_rejects_mismatched_headers() {
        let mut all = ScrapedTable::default();
        all.extend(parse_delay_table(PAGE, DELAY_TABLE_CLASS).unwrap());
        all.extend(ScrapedTable {
            headers: vec!["x".to_string()],
            rows: vec![vec!["1".to_string()]],
        });
        assert_eq!(all.rows.len(), 2);
    }
}
