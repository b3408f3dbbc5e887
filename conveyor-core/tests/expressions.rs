use conveyor_core::expressions::{parse_template, Binding, DocPath, Segment};
use serde_json::json;

#[test]
fn parse_simple_path() {
    let p = DocPath::parse("$.prepared.artifactKey").unwrap();
    assert_eq!(p.segments(), ["prepared", "artifactKey"]);
    assert_eq!(p.to_string(), "$.prepared.artifactKey");
    assert!(p.as_top_level_key().is_none());
}

#[test]
fn single_segment_path_is_a_top_level_key() {
    let p = DocPath::parse("$.inspect").unwrap();
    assert_eq!(p.as_top_level_key(), Some("inspect"));
}

#[test]
fn bare_dollar_is_rejected() {
    assert!(DocPath::parse("$").is_err());
}

#[test]
fn empty_segment_is_rejected() {
    assert!(DocPath::parse("$.a..b").is_err());
}

#[test]
fn segment_with_space_is_rejected() {
    assert!(DocPath::parse("$.a b").is_err());
}

#[test]
fn template_with_embedded_path() {
    let t = parse_template("Compression complete for {$.sourceKey}").unwrap();
    assert_eq!(t.segments.len(), 2);
    assert_eq!(
        t.segments[0],
        Segment::Literal("Compression complete for ".to_string())
    );
    assert!(matches!(&t.segments[1], Segment::Path(p) if p.to_string() == "$.sourceKey"));
}

#[test]
fn template_ignores_non_expression_braces() {
    let t = parse_template("{\"not\": \"an expr\"}").unwrap();
    assert!(t.is_plain());
}

#[test]
fn unclosed_template_expression_is_an_error() {
    assert!(parse_template("value is {$.sourceKey").is_err());
}

#[test]
fn classify_literal_path_and_template() {
    assert!(matches!(
        Binding::classify(&json!(42)).unwrap(),
        Binding::Literal(_)
    ));
    assert!(matches!(
        Binding::classify(&json!("plain text")).unwrap(),
        Binding::Literal(_)
    ));
    assert!(matches!(
        Binding::classify(&json!("$.stored")).unwrap(),
        Binding::Path(_)
    ));
    assert!(matches!(
        Binding::classify(&json!("done: {$.stored.outputKey}")).unwrap(),
        Binding::Template(_)
    ));
}

#[test]
fn classify_recurses_into_objects() {
    let b = Binding::classify(&json!({
        "compression": { "algorithm": "gzip", "level": 9 },
        "artifactKey": "$.prepared.artifactKey"
    }))
    .unwrap();
    let Binding::Object(fields) = b else {
        panic!("expected object binding");
    };
    assert!(fields
        .iter()
        .any(|(k, v)| k == "artifactKey" && matches!(v, Binding::Path(_))));
}

#[test]
fn classify_rejects_malformed_path_string() {
    assert!(Binding::classify(&json!("$.bad segment")).is_err());
}
