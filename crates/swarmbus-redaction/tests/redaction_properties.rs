//! Property-based tests for secret redaction: across arbitrary surrounding
//! text, an embedded secret-shaped token must never survive redaction, and
//! redaction of the same input must be stable across repeated calls.

use proptest::prelude::*;
use swarmbus_redaction::SecretRedactor;

fn arb_surrounding_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 <>/=\"_.-]{0,60}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn embedded_bearer_token_never_survives_redaction(prefix in arb_surrounding_text(), suffix in arb_surrounding_text()) {
        let redactor = SecretRedactor::new().unwrap();
        let secret = "abcdefghijklmnopqrstuvwxyz0123456789";
        let input = format!("{prefix}Bearer {secret}{suffix}");
        let redacted = redactor.redact(&input);
        prop_assert!(!redacted.contains(secret));
    }

    #[test]
    fn redaction_is_stable_across_repeated_calls(text in arb_surrounding_text()) {
        let redactor = SecretRedactor::new().unwrap();
        let input = format!(r#"<auth token="Bearer abcdefghijklmnopqrstuvwx"/>{text}"#);
        let first = redactor.redact(&input);
        let second = redactor.redact(&input);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn text_with_no_secret_shape_passes_through_unchanged(text in arb_surrounding_text()) {
        prop_assume!(!text.contains("Bearer") && !text.contains("AKIA") && !text.contains("BEGIN"));
        let redactor = SecretRedactor::new().unwrap();
        prop_assert_eq!(redactor.redact(&text), text);
    }
}
