//! Wall-clock helpers shared by every component that stamps records.

use std::time::{SystemTime, UNIX_EPOCH};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Current Unix epoch in seconds.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Render a Unix epoch-seconds timestamp as RFC 3339 UTC, the wire format
/// required by spec.md §6. Storage keeps epoch seconds everywhere; this is
/// purely a presentation helper used at the HTTP boundary.
pub fn to_rfc3339(epoch_secs: u64) -> String {
    OffsetDateTime::from_unix_timestamp(epoch_secs as i64)
        .expect("epoch seconds within time's supported range")
        .format(&Rfc3339)
        .expect("Rfc3339 formatting is infallible for a valid OffsetDateTime")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_zero_is_1970() {
        assert_eq!(to_rfc3339(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn known_timestamp_formats_correctly() {
        assert_eq!(to_rfc3339(1_704_067_200), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn now_secs_is_after_2024() {
        assert!(now_secs() > 1_704_067_200);
    }
}
