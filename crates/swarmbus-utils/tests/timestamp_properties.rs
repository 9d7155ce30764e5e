//! Property-based tests for ISO-8601 timestamp parsing: any timestamp this
//! crate formats must round-trip through its own parser, and arbitrary
//! non-timestamp strings must never be mistaken for one.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use proptest::prelude::*;
use swarmbus_utils::timestamps::{is_iso8601, parse_iso8601};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn formatted_instants_round_trip(secs in 0i64..4_102_444_800i64) {
        let instant: DateTime<Utc> = Utc.timestamp_opt(secs, 0).unwrap();
        let formatted = instant.to_rfc3339_opts(SecondsFormat::Secs, true);
        prop_assert!(is_iso8601(&formatted));
        prop_assert_eq!(parse_iso8601(&formatted), Some(instant));
    }

    #[test]
    fn arbitrary_non_timestamp_text_is_rejected(text in "[a-zA-Z0-9 _-]{0,40}") {
        prop_assume!(DateTime::parse_from_rfc3339(&text).is_err());
        prop_assert!(!is_iso8601(&text));
        prop_assert_eq!(parse_iso8601(&text), None);
    }
}
