use crate::models::ListingEntry;
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

// Matches both the preformatted and the table flavour of Apache's index:
// `<a href="x">x</a>   2016-06-01 10:12` and
// `<a href="x">x</a></td><td align="right">01-Jun-2016 10:12  </td>`
const INDEX_ENTRY_PATTERN: &str = r#"<a href="([^"?/][^"]*)">[^<]*</a>(?:\s*</td>\s*<td[^>]*>)?\s*(\d{4}-\d{2}-\d{2} \d{2}:\d{2}(?::\d{2})?|\d{2}-[A-Za-z]{3}-\d{4} \d{2}:\d{2})"#;

const INDEX_TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%d-%b-%Y %H:%M"];

fn index_entry_regex() -> &'static Regex {
    static ENTRY: OnceLock<Regex> = OnceLock::new();
    ENTRY.get_or_init(|| Regex::new(INDEX_ENTRY_PATTERN).expect("index pattern compiles"))
}

/// Extract `(name, last-modified)` pairs from an Apache directory index.
///
/// Rows without a timestamp (the parent-directory link, sort headers) are
/// skipped. Index timestamps carry no zone and are taken as UTC.
pub fn parse_index_page(html: &str) -> Vec<ListingEntry> {
    index_entry_regex()
        .captures_iter(html)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            let stamp = caps.get(2)?.as_str();
            let modified = INDEX_TIMESTAMP_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(stamp, format).ok())?
                .and_utc();
            Some(ListingEntry::new(name, modified))
        })
        .collect()
}
