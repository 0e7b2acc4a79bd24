use chrono::Datelike;
use serde::Serialize;
use serde_json::Value;
use shared::error::{AppError, AppResult};

use self::{
    hours::{format_decimal, shift_hours},
    month::{weekday_name, Month},
};
use super::{
    document::{grid_range, Grid, MAX_COLUMNS},
    employee::Employee,
};

pub mod hours;
pub mod month;

pub const DAY_COLUMN_LABEL: &str = "DZIEŃ TYGODNIA";
pub const TAGS_COLUMN_LABEL: &str = "TAGI";
pub const HOURS_ROW_LABEL: &str = "SUMA GODZIN";
pub const WAGES_ROW_LABEL: &str = "WYPŁATA";
const PLACEHOLDER_COLUMNS: usize = 3;
/// Employee columns that fit between the label and tags columns.
pub const MAX_EMPLOYEE_COLUMNS: usize = MAX_COLUMNS - 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Header,
    Day,
    Spacer,
    HoursSummary,
    WagesSummary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub kind: RowKind,
    /// Label column, one column per employee, then the tags column.
    pub cells: Vec<String>,
}

/// One month tab: header, a row per calendar day, a spacer and the two
/// summary rows. Rows are identified by position, never by their label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleGrid {
    pub month: Month,
    pub year: i32,
    pub rows: Vec<ScheduleRow>,
}

impl ScheduleGrid {
    /// Blank template for a roster given in column order. An empty roster
    /// gets placeholder columns so the tab is usable before hiring.
    pub fn template(month: Month, year: i32, roster: &[Employee]) -> Self {
        let names: Vec<String> = if roster.is_empty() {
            (1..=PLACEHOLDER_COLUMNS)
                .map(|i| format!("PRACOWNIK {i}"))
                .collect()
        } else {
            roster.iter().map(|e| e.name.to_uppercase()).collect()
        };
        let columns = names.len();

        let mut rows = Vec::with_capacity(month.days_in(year) as usize + 4);
        rows.push(ScheduleRow {
            kind: RowKind::Header,
            cells: std::iter::once(DAY_COLUMN_LABEL.to_string())
                .chain(names)
                .chain(std::iter::once(TAGS_COLUMN_LABEL.to_string()))
                .collect(),
        });

        for day in 1..=month.days_in(year) {
            let label = month
                .date(year, day)
                .map(|d| format!("{} {day}", weekday_name(d.weekday())))
                .unwrap_or_else(|| day.to_string());
            rows.push(labelled_row(RowKind::Day, label, columns, ""));
        }
        rows.push(labelled_row(RowKind::Spacer, String::new(), columns, ""));
        rows.push(labelled_row(
            RowKind::HoursSummary,
            HOURS_ROW_LABEL.into(),
            columns,
            "0,00",
        ));
        rows.push(labelled_row(
            RowKind::WagesSummary,
            WAGES_ROW_LABEL.into(),
            columns,
            "0,00",
        ));

        Self { month, year, rows }
    }

    /// Number of rows a grid for this month must have.
    pub fn expected_rows(month: Month, year: i32) -> usize {
        month.days_in(year) as usize + 4
    }

    /// Types a raw grid positionally. Ragged rows are padded to the header width.
    pub fn from_values(month: Month, year: i32, values: &Grid) -> AppResult<Self> {
        let expected = Self::expected_rows(month, year);
        if values.len() != expected {
            return Err(AppError::ValidationError(format!(
                "schedule for {month} {year} must have {expected} rows, got {}",
                values.len()
            )));
        }
        let width = values[0].len();
        if width < 2 {
            return Err(AppError::ValidationError(
                "schedule header must have a label and a tags column".into(),
            ));
        }
        if width > MAX_COLUMNS {
            return Err(AppError::ValidationError(format!(
                "schedule may have at most {MAX_COLUMNS} columns, got {width}"
            )));
        }

        let days = month.days_in(year) as usize;
        let rows = values
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let kind = match i {
                    0 => RowKind::Header,
                    i if i <= days => RowKind::Day,
                    i if i == days + 1 => RowKind::Spacer,
                    i if i == days + 2 => RowKind::HoursSummary,
                    _ => RowKind::WagesSummary,
                };
                if raw.len() > width {
                    return Err(AppError::ValidationError(format!(
                        "schedule row {} is wider than the header",
                        i + 1
                    )));
                }
                let mut cells: Vec<String> = raw.iter().map(cell_text).collect();
                cells.resize(width, String::new());
                Ok(ScheduleRow { kind, cells })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self { month, year, rows })
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.cells.len())
    }

    /// Employee (or placeholder) columns between the label and tags columns.
    pub fn employee_columns(&self) -> usize {
        self.width().saturating_sub(2)
    }

    pub fn rows_of(&self, kind: RowKind) -> impl Iterator<Item = &ScheduleRow> {
        self.rows.iter().filter(move |r| r.kind == kind)
    }

    /// Total hours per employee column, summed over the day rows.
    pub fn column_hours(&self) -> Vec<f64> {
        (1..=self.employee_columns())
            .map(|col| {
                self.rows_of(RowKind::Day)
                    .map(|r| r.cells.get(col).map_or(0.0, |c| shift_hours(c)))
                    .sum()
            })
            .collect()
    }

    /// Rewrites both summary rows from the day cells. `rates` is indexed by
    /// employee column; missing rates count as zero.
    pub fn recompute_summaries(&mut self, rates: &[f64]) {
        let hours = self.column_hours();
        for row in self.rows.iter_mut() {
            let values: Vec<f64> = match row.kind {
                RowKind::HoursSummary => hours.clone(),
                RowKind::WagesSummary => hours
                    .iter()
                    .enumerate()
                    .map(|(i, h)| h * rates.get(i).copied().unwrap_or(0.0))
                    .collect(),
                _ => continue,
            };
            for (i, v) in values.into_iter().enumerate() {
                if let Some(cell) = row.cells.get_mut(i + 1) {
                    *cell = format_decimal(v);
                }
            }
        }
    }

    pub fn range(&self) -> String {
        grid_range(self.month.tab_name(), self.width(), self.rows.len())
    }

    pub fn to_values(&self) -> Grid {
        self.rows
            .iter()
            .map(|r| r.cells.iter().map(|c| Value::from(c.as_str())).collect())
            .collect()
    }

    pub fn row_kinds(&self) -> Vec<RowKind> {
        self.rows.iter().map(|r| r.kind).collect()
    }
}

fn labelled_row(kind: RowKind, label: String, columns: usize, fill: &str) -> ScheduleRow {
    let cells = std::iter::once(label)
        .chain(std::iter::repeat(fill.to_string()).take(columns))
        .chain(std::iter::once(String::new()))
        .collect();
    ScheduleRow { kind, cells }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice_and_bob() -> Vec<Employee> {
        vec![
            Employee {
                email: "alice@example.com".into(),
                name: "Alice".into(),
                hourly_rate: 35.0,
            },
            Employee {
                email: "bob@example.com".into(),
                name: "Bob".into(),
                hourly_rate: 30.0,
            },
        ]
    }

    #[test]
    fn empty_roster_gets_three_placeholder_columns() {
        let grid = ScheduleGrid::template(Month::February, 2025, &[]);
        assert_eq!(grid.rows.len(), 28 + 4);
        assert_eq!(
            grid.rows[0].cells,
            vec![
                "DZIEŃ TYGODNIA",
                "PRACOWNIK 1",
                "PRACOWNIK 2",
                "PRACOWNIK 3",
                "TAGI"
            ]
        );
        assert!(grid.rows.iter().all(|r| r.cells.len() == 5));
        let hours = grid.rows_of(RowKind::HoursSummary).next().unwrap();
        assert_eq!(hours.cells, vec!["SUMA GODZIN", "0,00", "0,00", "0,00", ""]);
    }

    #[test]
    fn template_uses_uppercased_names_and_localized_days() {
        let grid = ScheduleGrid::template(Month::January, 2025, &alice_and_bob());
        assert_eq!(grid.rows[0].cells[1], "ALICE");
        assert_eq!(grid.rows[0].cells[2], "BOB");
        assert_eq!(grid.rows[1].cells[0], "Środa 1");
        assert_eq!(grid.rows[31].cells[0], "Piątek 31");
        assert_eq!(grid.rows[32].kind, RowKind::Spacer);
        assert_eq!(grid.rows[34].cells[0], "WYPŁATA");
        assert_eq!(grid.range(), "STYCZEŃ!A1:D35");
    }

    #[test]
    fn summaries_are_derived_from_day_cells() -> AppResult<()> {
        let mut values = ScheduleGrid::template(Month::January, 2025, &alice_and_bob()).to_values();
        values[1][1] = Value::from("09:00-17:00");
        values[2][1] = Value::from("22:00-06:00");
        values[3][1] = Value::from("DW");
        values[1][2] = Value::from("10:00-14:30");
        // Hand-edited totals get overwritten.
        values[33][1] = Value::from("999,00");

        let mut grid = ScheduleGrid::from_values(Month::January, 2025, &values)?;
        grid.recompute_summaries(&[35.0, 30.0]);

        let hours = grid.rows_of(RowKind::HoursSummary).next().unwrap();
        assert_eq!(hours.cells[1], "16,00");
        assert_eq!(hours.cells[2], "4,50");
        let wages = grid.rows_of(RowKind::WagesSummary).next().unwrap();
        assert_eq!(wages.cells[1], "560,00");
        assert_eq!(wages.cells[2], "135,00");
        Ok(())
    }

    #[test]
    fn ragged_rows_are_padded() -> AppResult<()> {
        let mut values = ScheduleGrid::template(Month::April, 2025, &alice_and_bob()).to_values();
        values[31] = vec![];
        let grid = ScheduleGrid::from_values(Month::April, 2025, &values)?;
        assert_eq!(grid.rows[31].kind, RowKind::Spacer);
        assert_eq!(grid.rows[31].cells.len(), 4);
        Ok(())
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let values = ScheduleGrid::template(Month::April, 2025, &[]).to_values();
        let err = ScheduleGrid::from_values(Month::May, 2025, &values).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn grids_wider_than_column_z_are_rejected() {
        let roster: Vec<Employee> = (0..=MAX_EMPLOYEE_COLUMNS)
            .map(|i| Employee {
                email: format!("e{i}@example.com"),
                name: format!("E{i}"),
                hourly_rate: 30.0,
            })
            .collect();
        let values = ScheduleGrid::template(Month::April, 2025, &roster).to_values();
        assert_eq!(values[0].len(), MAX_COLUMNS + 1);
        let err = ScheduleGrid::from_values(Month::April, 2025, &values).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let fits = ScheduleGrid::template(Month::April, 2025, &roster[..MAX_EMPLOYEE_COLUMNS]);
        assert_eq!(fits.range(), "KWIECIEŃ!A1:Z34");
    }
}
