//! Display helpers for the Kenyan storefront.
//!
//! Dates are rendered in Nairobi time. Kenya has no daylight saving, so a
//! fixed UTC+3 offset is exact.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Offset, Utc};
use rust_decimal::Decimal;

use crate::types::DeliveryTier;

/// Nairobi's offset from UTC, in seconds.
pub const NAIROBI_UTC_OFFSET_SECS: i32 = 3 * 3600;

/// Country appended to addresses when none is given.
pub const DEFAULT_COUNTRY: &str = "Kenya";

/// Placeholder shown for missing ratings and margins.
pub const MISSING_VALUE: &str = "—";

/// The Africa/Nairobi offset.
#[must_use]
pub fn nairobi_offset() -> FixedOffset {
    FixedOffset::east_opt(NAIROBI_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Convert a UTC instant to Nairobi local time.
#[must_use]
pub fn to_nairobi(at: DateTime<Utc>) -> DateTime<FixedOffset> {
    at.with_timezone(&nairobi_offset())
}

/// Today's date in Nairobi.
#[must_use]
pub fn nairobi_today(now: DateTime<Utc>) -> NaiveDate {
    to_nairobi(now).date_naive()
}

/// Parse an RFC 3339 timestamp as emitted by the API.
#[must_use]
pub fn parse_api_datetime(input: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input.trim())
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

// =============================================================================
// Dates
// =============================================================================

/// Short date, e.g. `17 Oct 26`.
#[must_use]
pub fn format_date_short(at: DateTime<Utc>) -> String {
    to_nairobi(at).format("%-d %b %y").to_string()
}

/// Long date, e.g. `Saturday, 17 October 2026`.
#[must_use]
pub fn format_date_long(at: DateTime<Utc>) -> String {
    to_nairobi(at).format("%A, %-d %B %Y").to_string()
}

/// Time of day on a 24-hour clock, e.g. `14:05`.
#[must_use]
pub fn format_time(at: DateTime<Utc>) -> String {
    to_nairobi(at).format("%H:%M").to_string()
}

/// Short date followed by time, e.g. `17 Oct 26 14:05`.
#[must_use]
pub fn format_datetime(at: DateTime<Utc>) -> String {
    format!("{} {}", format_date_short(at), format_time(at))
}

/// Compact relative time, e.g. `3d ago`.
///
/// Each unit is used only once more than one whole unit has elapsed, so
/// exactly one day ago still reads `24h ago`. Future instants read `0s ago`.
#[must_use]
pub fn format_relative(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    const UNITS: [(i64, &str); 5] = [
        (31_536_000, "y"),
        (2_592_000, "mo"),
        (86_400, "d"),
        (3_600, "h"),
        (60, "m"),
    ];

    let seconds = (now - then).num_seconds().max(0);
    for (size, suffix) in UNITS {
        if seconds > size {
            return format!("{}{suffix} ago", seconds / size);
        }
    }
    format!("{seconds}s ago")
}

/// Estimated delivery window for a tier, starting from `today`.
///
/// Returns a single date when the window collapses to one day, otherwise
/// `"<earliest> - <latest>"`.
#[must_use]
pub fn estimated_delivery(today: NaiveDate, tier: DeliveryTier) -> String {
    let (min_days, max_days) = tier.estimated_days();
    let short = |days: u32| {
        today
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(today)
            .format("%-d %b %y")
            .to_string()
    };

    if min_days == max_days {
        short(min_days)
    } else {
        format!("{} - {}", short(min_days), short(max_days))
    }
}

// =============================================================================
// Text
// =============================================================================

/// SKUs are shown uppercase.
#[must_use]
pub fn format_sku(sku: &str) -> String {
    sku.to_uppercase()
}

/// Uppercase the first character.
#[must_use]
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Product names arrive in mixed case from suppliers; show them as a sentence.
#[must_use]
pub fn format_product_name(name: &str) -> String {
    capitalize(&name.to_lowercase())
}

/// `brake-pads-front` becomes `Brake Pads Front`.
#[must_use]
pub fn slug_to_title(slug: &str) -> String {
    slug.split('-').map(capitalize).collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters including `suffix`.
#[must_use]
pub fn truncate_text(text: &str, max_chars: usize, suffix: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(suffix.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(suffix);
    out
}

/// Join non-empty address parts with commas.
#[must_use]
pub fn format_address(street: &str, city: &str, postal_code: &str, country: Option<&str>) -> String {
    [
        street,
        city,
        postal_code,
        country.unwrap_or(DEFAULT_COUNTRY),
    ]
    .iter()
    .map(|part| part.trim())
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}

// =============================================================================
// Numbers
// =============================================================================

/// `15% off`, or an empty string when there is no discount.
#[must_use]
pub fn format_discount_percentage(percent: Decimal) -> String {
    if percent <= Decimal::ZERO {
        return String::new();
    }
    format!("{}% off", percent.normalize())
}

/// Rating to one decimal place, or a dash when unrated.
#[must_use]
pub fn format_rating(rating: Option<f64>) -> String {
    match rating {
        Some(value) if value != 0.0 && value.is_finite() => {
            format!("{:.1}", (value * 10.0).round() / 10.0)
        }
        _ => MISSING_VALUE.to_string(),
    }
}

/// Whole-percent margin, or a dash when unknown.
#[must_use]
pub fn format_profit_margin(margin: Option<f64>) -> String {
    match margin {
        Some(value) if value != 0.0 && value.is_finite() => format!("{:.0}%", value.round()),
        _ => MISSING_VALUE.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_dates_use_nairobi_time() {
        // 22:30 UTC is already the next day in Nairobi.
        let at = utc(2026, 10, 16, 22, 30);
        assert_eq!(format_date_short(at), "17 Oct 26");
        assert_eq!(format_date_long(at), "Saturday, 17 October 2026");
        assert_eq!(format_time(at), "01:30");
        assert_eq!(format_datetime(at), "17 Oct 26 01:30");
    }

    #[test]
    fn test_parse_api_datetime() {
        let at = parse_api_datetime("2026-10-17T11:05:00+03:00").unwrap();
        assert_eq!(at, utc(2026, 10, 17, 8, 5));
        assert!(parse_api_datetime("yesterday").is_none());
    }

    #[test]
    fn test_format_relative() {
        let now = utc(2026, 10, 17, 12, 0);
        assert_eq!(format_relative(now, utc(2026, 10, 17, 11, 59)), "60s ago");
        assert_eq!(format_relative(now, utc(2026, 10, 17, 9, 0)), "3h ago");
        assert_eq!(format_relative(now, utc(2026, 10, 14, 11, 0)), "3d ago");
        assert_eq!(format_relative(now, utc(2024, 1, 1, 0, 0)), "2y ago");
        assert_eq!(format_relative(now, utc(2026, 10, 18, 0, 0)), "0s ago");
    }

    #[test]
    fn test_estimated_delivery() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(
            estimated_delivery(today, DeliveryTier::Economy),
            "22 Oct 26 - 24 Oct 26"
        );
        assert_eq!(
            estimated_delivery(today, DeliveryTier::Express),
            "17 Oct 26 - 18 Oct 26"
        );
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(format_sku("bp-1042a"), "BP-1042A");
        assert_eq!(slug_to_title("brake-pads-front"), "Brake Pads Front");
        assert_eq!(capitalize(""), "");
        assert_eq!(format_product_name("OIL FILTER"), "Oil filter");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10, "..."), "short");
        assert_eq!(truncate_text("Alternator belt", 10, "..."), "Alterna...");
        assert_eq!(truncate_text("abc", 2, "..."), "...");
    }

    #[test]
    fn test_format_address() {
        assert_eq!(
            format_address("Moi Avenue 12", "Nairobi", "", None),
            "Moi Avenue 12, Nairobi, Kenya"
        );
        assert_eq!(
            format_address("Plot 4", "Kampala", "256", Some("Uganda")),
            "Plot 4, Kampala, 256, Uganda"
        );
    }

    #[test]
    fn test_number_helpers() {
        assert_eq!(format_discount_percentage(Decimal::from(15)), "15% off");
        assert_eq!(format_discount_percentage(Decimal::ZERO), "");
        assert_eq!(format_rating(Some(4.46)), "4.5");
        assert_eq!(format_rating(None), MISSING_VALUE);
        assert_eq!(format_rating(Some(0.0)), MISSING_VALUE);
        assert_eq!(format_profit_margin(Some(32.6)), "33%");
        assert_eq!(format_profit_margin(None), MISSING_VALUE);
    }
}
