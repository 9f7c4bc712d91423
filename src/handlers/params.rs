//! Query-string validation shared by the track endpoints.

use crate::{
    errors::AppError,
    models::resource::{ResourceKey, ResourceKind, validate_segment},
};
use serde_json::Value;

/// What a query string said about one parameter.
#[derive(Debug, PartialEq, Eq)]
enum Param<'a> {
    Missing,
    One(&'a str),
    Repeated(Vec<&'a str>),
}

impl<'a> Param<'a> {
    fn find(pairs: &'a [(String, String)], name: &str) -> Self {
        let mut values: Vec<&str> = pairs
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .collect();
        match values.len() {
            0 => Param::Missing,
            1 => Param::One(values.remove(0)),
            _ => Param::Repeated(values),
        }
    }

    fn usable(&self) -> Option<&'a str> {
        match self {
            Param::One(value) if !value.is_empty() => Some(*value),
            _ => None,
        }
    }

    /// The received value as it is echoed back in a 400 body.
    fn echo(&self) -> Value {
        match self {
            Param::Missing => Value::Null,
            Param::One(value) => Value::String(value.to_string()),
            Param::Repeated(values) => values.iter().map(|v| Value::String(v.to_string())).collect(),
        }
    }
}

/// Build the key for `<author_param>=..&title=..`.
///
/// Both parameters must appear exactly once and be non-empty, and both must
/// pass key-segment validation. Failures are 400s echoing what was received.
pub fn track_key(
    pairs: &[(String, String)],
    kind: ResourceKind,
    author_param: &'static str,
) -> Result<ResourceKey, AppError> {
    let author = Param::find(pairs, author_param);
    let title = Param::find(pairs, "title");

    let invalid = |message: String| {
        AppError::bad_request(message)
            .with_detail(author_param, author.echo())
            .with_detail("title", title.echo())
    };

    match (author.usable(), title.usable()) {
        (Some(a), Some(t)) => validate_segment(author_param, a)
            .and_then(|()| ResourceKey::new(kind, a, t))
            .map_err(|err| invalid(err.to_string())),
        _ => Err(invalid(format!(
            "query parameters `{}` and `title` are required",
            author_param
        ))),
    }
}
