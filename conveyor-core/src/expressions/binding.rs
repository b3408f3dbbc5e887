use crate::types::AnyValue;

use super::path::DocPath;
use super::template::{parse_template, Template, TemplateError};

/// The closed expression type a stage parameter value compiles into.
///
/// Classification rules, applied recursively through objects and arrays:
/// a string starting with `$` is a [`DocPath`]; a string with embedded
/// `{$.path}` expressions is a [`Template`]; everything else is a literal
/// passed through verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Literal(AnyValue),
    Path(DocPath),
    Template(Template),
    Object(Vec<(String, Binding)>),
    Array(Vec<Binding>),
}

impl Binding {
    pub fn classify(value: &AnyValue) -> Result<Self, TemplateError> {
        match value {
            AnyValue::Null | AnyValue::Bool(_) | AnyValue::Number(_) => {
                Ok(Binding::Literal(value.clone()))
            }
            AnyValue::String(s) => classify_string(s),
            AnyValue::Array(arr) => {
                let mut out = Vec::with_capacity(arr.len());
                for v in arr {
                    out.push(Binding::classify(v)?);
                }
                Ok(Binding::Array(out))
            }
            AnyValue::Object(map) => {
                let mut out = Vec::with_capacity(map.len());
                for (k, v) in map {
                    out.push((k.clone(), Binding::classify(v)?));
                }
                Ok(Binding::Object(out))
            }
        }
    }
}

fn classify_string(s: &str) -> Result<Binding, TemplateError> {
    let trimmed = s.trim();
    if trimmed.starts_with('$') {
        let path = DocPath::parse(trimmed)?;
        return Ok(Binding::Path(path));
    }

    let tpl = parse_template(s)?;
    if tpl.is_plain() {
        return Ok(Binding::Literal(AnyValue::String(s.to_string())));
    }
    Ok(Binding::Template(tpl))
}

/// Classify a whole parameter map in declaration order.
pub fn classify_parameters<'a, I>(params: I) -> Result<Vec<(String, Binding)>, TemplateError>
where
    I: IntoIterator<Item = (&'a String, &'a AnyValue)>,
{
    let mut out = Vec::new();
    for (name, value) in params {
        out.push((name.clone(), Binding::classify(value)?));
    }
    Ok(out)
}
