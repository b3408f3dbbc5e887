pub type AnyValue = serde_json::Value;
