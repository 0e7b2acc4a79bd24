use serde::{Deserialize, Serialize};

use super::schedule::month::Month;
pub use super::id::DocumentId;

/// Raw cell grid exchanged with the document store.
pub type Grid = Vec<Vec<serde_json::Value>>;

pub const MANAGEMENT_TAB: &str = "MANAGEMENT";
pub const MANAGEMENT_RANGE: &str = "MANAGEMENT!A1:C20";
const MANAGEMENT_MIN_ROWS: usize = 20;
/// Widest grid any tab holds: columns A through Z.
pub const MAX_COLUMNS: usize = 26;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: DocumentId,
    pub title: String,
    pub sheets: Vec<String>,
}

impl DocumentMeta {
    pub fn url(&self) -> String {
        format!("https://docs.google.com/spreadsheets/d/{}", self.id)
    }
}

/// Deterministic workbook name for one shop and year.
pub fn document_title(shop_name: &str, year: i32) -> String {
    format!("GrafikZabka-{shop_name}-{year}")
}

/// Management tab first, then the twelve months in calendar order.
pub fn year_document_tabs() -> Vec<String> {
    std::iter::once(MANAGEMENT_TAB.to_string())
        .chain(Month::ALL.iter().map(|m| m.tab_name().to_string()))
        .collect()
}

/// A1 column label for a zero-based column index, capped at `Z`.
pub fn column_label(index: usize) -> char {
    let capped = index.min(MAX_COLUMNS - 1) as u8;
    (b'A' + capped) as char
}

/// Range covering a grid of the given width and height starting at A1.
pub fn grid_range(tab: &str, width: usize, height: usize) -> String {
    format!(
        "{tab}!A1:{}{}",
        column_label(width.saturating_sub(1)),
        height.max(1)
    )
}

/// Management tab content for a roster given in column order.
pub fn management_grid(shop_name: &str, roster: &[super::employee::Employee]) -> Grid {
    use serde_json::Value;

    let mut rows: Grid = vec![
        vec![Value::from(format!(
            "ZARZĄDZANIE PRACOWNIKAMI - GrafikZabka-{shop_name}"
        ))],
        vec![Value::from("")],
        vec![
            Value::from("Email"),
            Value::from("Imię i Nazwisko"),
            Value::from("Stawka godzinowa (PLN)"),
        ],
    ];
    rows.extend(roster.iter().map(|e| {
        vec![
            Value::from(e.email.clone()),
            Value::from(e.name.clone()),
            Value::from(e.hourly_rate),
        ]
    }));
    // Blank out rows a longer previous roster may have left behind.
    while rows.len() < MANAGEMENT_MIN_ROWS {
        rows.push(vec![Value::from(""), Value::from(""), Value::from("")]);
    }
    rows
}
