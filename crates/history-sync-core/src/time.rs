use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Source catalog timestamps carry no offset and are UTC+8.
pub const SOURCE_UTC_OFFSET_HOURS: i64 = 8;

/// Clock time paired with a bare page date.
pub const MIDDAY_HOUR: u32 = 12;

const SOURCE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn source_to_utc(local: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&(local - Duration::hours(SOURCE_UTC_OFFSET_HOURS)))
}

pub fn utc_to_source(instant: DateTime<Utc>) -> NaiveDateTime {
    instant.naive_utc() + Duration::hours(SOURCE_UTC_OFFSET_HOURS)
}

pub fn midday_local(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(MIDDAY_HOUR, 0, 0)
}

pub fn midday_utc(date: NaiveDate) -> Option<DateTime<Utc>> {
    midday_local(date).map(source_to_utc)
}

/// Parse `YYYY-MM-DD HH:MM:SS` (source-local) or an RFC 3339 value with
/// an explicit offset. Anything else is `None`.
pub fn parse_source_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(local) = NaiveDateTime::parse_from_str(raw, SOURCE_FORMAT) {
        return Some(source_to_utc(local));
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn format_source_local(instant: DateTime<Utc>) -> String {
    utc_to_source(instant).format(SOURCE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_to_utc() {
        let local = NaiveDate::from_ymd_opt(2020, 1, 5)
            .unwrap()
            .and_hms_opt(21, 0, 0)
            .unwrap();
        assert_eq!(source_to_utc(local).to_rfc3339(), "2020-01-05T13:00:00+00:00");

        // Early morning local time lands on the previous UTC day
        let early = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(3, 30, 0)
            .unwrap();
        assert_eq!(source_to_utc(early).to_rfc3339(), "2019-12-31T19:30:00+00:00");
    }

    #[test]
    fn test_midday_utc() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 5).unwrap();
        assert_eq!(
            midday_utc(date).unwrap().to_rfc3339(),
            "2020-01-05T04:00:00+00:00"
        );
    }

    #[test]
    fn test_parse_source_datetime() {
        assert_eq!(
            parse_source_datetime("2020-01-05 21:00:00").unwrap().to_rfc3339(),
            "2020-01-05T13:00:00+00:00"
        );
        assert_eq!(
            parse_source_datetime("2020-01-05T13:00:00+00:00").unwrap().to_rfc3339(),
            "2020-01-05T13:00:00+00:00"
        );
        assert!(parse_source_datetime("").is_none());
        assert!(parse_source_datetime("2020-01-05").is_none());
        assert!(parse_source_datetime("yesterday").is_none());
    }

    #[test]
    fn test_format_source_local_round_trip() {
        let instant = parse_source_datetime("2023-07-28 21:32:11").unwrap();
        assert_eq!(format_source_local(instant), "2023-07-28 21:32:11");
    }
}
