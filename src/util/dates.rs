use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Parse an IANA time-zone name ("Europe/Paris", "UTC", ...).
pub fn parse_time_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| anyhow!("Unknown time zone '{name}'"))
}

/// Format a UTC instant in the given zone with a strftime pattern.
pub fn format_in_zone(instant: DateTime<Utc>, tz: Tz, format: &str) -> String {
    instant.with_timezone(&tz).format(format).to_string()
}

/// Same as [`format_in_zone`] but renders `None` as an empty cell.
pub fn format_opt(instant: Option<DateTime<Utc>>, tz: Tz, format: &str) -> String {
    instant
        .map(|dt| format_in_zone(dt, tz, format))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};

    #[test]
    fn parses_known_zone() {
        assert!(parse_time_zone("Europe/Paris").is_ok());
        assert!(parse_time_zone("UTC").is_ok());
    }

    #[test]
    fn rejects_unknown_zone() {
        let err = parse_time_zone("Mars/Olympus").unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus"));
    }

    #[test]
    fn formats_in_configured_zone() {
        let tz = parse_time_zone("Europe/Paris").unwrap();
        let instant = "2024-01-15T23:30:00Z".parse::<DateTime<Utc>>().unwrap();
        // Paris is UTC+1 in January, so this rolls over to the next day.
        assert_eq!(format_in_zone(instant, tz, "%Y-%m-%d"), "2024-01-16");
    }

    #[test]
    fn none_formats_as_empty() {
        let tz = parse_time_zone("UTC").unwrap();
        assert_eq!(format_opt(None, tz, "%Y-%m-%d"), "");
    }

    #[test]
    fn formatting_round_trips_at_configured_precision() {
        let tz = parse_time_zone("Europe/Paris").unwrap();
        let format = "%Y-%m-%d %H:%M:%S";
        let instant = "2024-01-15T10:00:00Z".parse::<DateTime<Utc>>().unwrap();

        let formatted = format_in_zone(instant, tz, format);
        let naive = NaiveDateTime::parse_from_str(&formatted, format).unwrap();
        let parsed_back = tz.from_local_datetime(&naive).single().unwrap();

        assert_eq!(parsed_back.with_timezone(&Utc), instant);
    }
}
