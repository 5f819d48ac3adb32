use loggen_core::types::{GenKey, GenKeyParseError};

#[test]
fn display_joins_source_and_dataset() {
    let key = GenKey::new("nginx", "access");
    assert_eq!(key.to_string(), "nginx:access");
}

#[test]
fn parse_roundtrips_display() {
    let key: GenKey = "windows:security".parse().unwrap();
    assert_eq!(key, GenKey::new("windows", "security"));
}

#[test]
fn parse_trims_whitespace() {
    let key: GenKey = " cisco_asa : log ".parse().unwrap();
    assert_eq!(key, GenKey::new("cisco_asa", "log"));
}

#[test]
fn parse_rejects_missing_separator() {
    let err = "nginx".parse::<GenKey>().unwrap_err();
    assert_eq!(err, GenKeyParseError::MissingSeparator("nginx".to_string()));
}

#[test]
fn parse_rejects_empty_components() {
    assert_eq!(
        ":access".parse::<GenKey>().unwrap_err(),
        GenKeyParseError::EmptyComponent
    );
    assert_eq!(
        "nginx:".parse::<GenKey>().unwrap_err(),
        GenKeyParseError::EmptyComponent
    );
}
