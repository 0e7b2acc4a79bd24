use chrono::{Datelike, NaiveDate, Weekday};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Calendar number, 1-based.
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    pub fn from_number(n: u32) -> Option<Self> {
        Self::ALL.get(n.checked_sub(1)? as usize).copied()
    }

    /// Name of the workbook tab holding this month.
    pub fn tab_name(self) -> &'static str {
        match self {
            Month::January => "STYCZEŃ",
            Month::February => "LUTY",
            Month::March => "MARZEC",
            Month::April => "KWIECIEŃ",
            Month::May => "MAJ",
            Month::June => "CZERWIEC",
            Month::July => "LIPIEC",
            Month::August => "SIERPIEŃ",
            Month::September => "WRZESIEŃ",
            Month::October => "PAŹDZIERNIK",
            Month::November => "LISTOPAD",
            Month::December => "GRUDZIEŃ",
        }
    }

    pub fn current() -> Self {
        let today = chrono::Local::now().date_naive();
        Self::ALL[today.month0() as usize]
    }

    pub fn days_in(self, year: i32) -> u32 {
        let (next_year, next_month) = match self {
            Month::December => (year + 1, 1),
            m => (year, m.number() + 1),
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .map(|d| d.day())
            .unwrap_or(31)
    }

    pub fn date(self, year: i32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.number(), day)
    }
}

impl std::fmt::Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tab_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMonth(pub String);

impl std::fmt::Display for UnknownMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown month: {}", self.0)
    }
}

impl std::error::Error for UnknownMonth {}

impl FromStr for Month {
    type Err = UnknownMonth;

    /// Accepts a tab name (any case) or a calendar number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<u32>() {
            return Self::from_number(n).ok_or_else(|| UnknownMonth(s.to_string()));
        }
        let upper = trimmed.to_uppercase();
        Self::ALL
            .into_iter()
            .find(|m| m.tab_name() == upper)
            .ok_or_else(|| UnknownMonth(s.to_string()))
    }
}

/// Localized weekday label used in the first column of day rows.
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Poniedziałek",
        Weekday::Tue => "Wtorek",
        Weekday::Wed => "Środa",
        Weekday::Thu => "Czwartek",
        Weekday::Fri => "Piątek",
        Weekday::Sat => "Sobota",
        Weekday::Sun => "Niedziela",
    }
}
