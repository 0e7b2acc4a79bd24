pub mod google;
pub mod memory;

/// Splits `TAB!A1:C20` into the tab name and the zero-based bounds
/// (inclusive end column, exclusive end row). Only ranges anchored at A1
/// are produced by this crate.
pub(crate) fn parse_range(range: &str) -> Option<(&str, usize, usize)> {
    let (tab, cells) = range.rsplit_once('!')?;
    let (start, end) = cells.split_once(':')?;
    if !start.eq_ignore_ascii_case("A1") {
        return None;
    }
    let split = end.find(|c: char| c.is_ascii_digit())?;
    let (col, row) = end.split_at(split);
    let mut chars = col.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !letter.is_ascii_uppercase() {
        return None;
    }
    let rows: usize = row.parse().ok()?;
    Some((tab.trim_matches('\''), (letter as u8 - b'A') as usize, rows))
}

#[cfg(test)]
mod tests {
    use super::parse_range;

    #[test]
    fn parses_anchored_ranges() {
        assert_eq!(parse_range("MANAGEMENT!A1:C20"), Some(("MANAGEMENT", 2, 20)));
        assert_eq!(parse_range("STYCZEŃ!A1:Z50"), Some(("STYCZEŃ", 25, 50)));
        assert_eq!(parse_range("MAJ!B2:C3"), None);
        assert_eq!(parse_range("garbage"), None);
    }
}
