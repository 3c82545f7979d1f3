use chrono::NaiveDate;

/// Parse a time-series header label such as `"1/23/20"` (M/D/YY) into a date.
/// Four-digit years (`"1/23/2020"`) are accepted too.
pub fn parse_header_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let mut parts = s.split('/');
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    let year_str = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let year: i32 = match year_str.len() {
        2 => 2000 + year_str.parse::<i32>().ok()?,
        4 => year_str.parse().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}
