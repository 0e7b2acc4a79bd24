/// Cell value marking a day off.
pub const DAY_OFF: &str = "DW";

/// Hours contributed by one schedule cell.
///
/// `HH:MM-HH:MM` yields `end - start`, wrapping past midnight when the end
/// precedes the start. The day-off marker, empty cells and anything
/// unparsable contribute zero.
pub fn shift_hours(cell: &str) -> f64 {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case(DAY_OFF) {
        return 0.0;
    }
    let Some((start, end)) = cell.split_once('-') else {
        return 0.0;
    };
    let (Some(start), Some(end)) = (minutes_of_day(start), minutes_of_day(end)) else {
        return 0.0;
    };
    let span = if end < start {
        end + 24 * 60 - start
    } else {
        end - start
    };
    f64::from(span) / 60.0
}

fn minutes_of_day(raw: &str) -> Option<u32> {
    let (h, m) = raw.trim().split_once(':')?;
    if h.is_empty() || m.len() != 2 {
        return None;
    }
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    (h <= 24 && m < 60 && h * 60 + m <= 24 * 60).then_some(h * 60 + m)
}

/// Two-decimal rendering with a comma separator, e.g. `8,50`.
pub fn format_decimal(value: f64) -> String {
    format!("{value:.2}").replace('.', ",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn computes_day_and_overnight_shifts() {
        assert_eq!(shift_hours("09:00-17:00"), 8.0);
        assert_eq!(shift_hours("22:00-06:00"), 8.0);
        assert_eq!(shift_hours("06:30-14:00"), 7.5);
        assert_eq!(shift_hours(" 9:00 - 13:15 "), 4.25);
    }

    #[test]
    fn non_shift_cells_count_as_zero() {
        assert_eq!(shift_hours("DW"), 0.0);
        assert_eq!(shift_hours(""), 0.0);
        assert_eq!(shift_hours("abc"), 0.0);
        assert_eq!(shift_hours("25:00-26:00"), 0.0);
        assert_eq!(shift_hours("09:00"), 0.0);
    }

    #[test]
    fn decimals_use_comma_separator() {
        assert_eq!(format_decimal(0.0), "0,00");
        assert_eq!(format_decimal(8.5), "8,50");
        assert_eq!(format_decimal(1067.5), "1067,50");
    }

    proptest! {
        #[test]
        fn shift_hours_stay_within_a_day(sh in 0u32..24, sm in 0u32..60, eh in 0u32..24, em in 0u32..60) {
            let cell = format!("{sh:02}:{sm:02}-{eh:02}:{em:02}");
            let hours = shift_hours(&cell);
            prop_assert!((0.0..24.0).contains(&hours));
        }

        #[test]
        fn arbitrary_text_never_panics(s in ".*") {
            let hours = shift_hours(&s);
            prop_assert!(hours >= 0.0);
        }
    }
}
