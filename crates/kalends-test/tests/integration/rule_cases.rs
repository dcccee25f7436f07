include!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/rule_cases_data/mod.rs"));

/// ## Summary
/// Integration-level validation of rule building and enumeration using shared cases.
#[test_log::test]
fn rule_cases_integration() {
    for case in rule_cases() {
        assert_case(&case);
    }
}
