use serde_json::Value;

use crate::schema::TypedRecord;

/// Classification of one raw log line.
pub(crate) enum LineRecord {
    Typed(Box<TypedRecord>),
    /// Object with `id` and `timestamp` but no `type`: header-like. At line 0
    /// this is the legacy header; later it surfaces as a `meta` message.
    HeaderLike(Value),
    /// Parseable JSON of an unrecognized shape, preserved verbatim.
    Unknown(Value),
    /// Not valid JSON. Counted as a skipped line; never aborts the file.
    Malformed,
}

pub(crate) fn classify_line(line: &str) -> LineRecord {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(_) => return LineRecord::Malformed,
    };

    let Some(object) = value.as_object() else {
        return LineRecord::Unknown(value);
    };

    if object.get("type").is_some_and(|t| t.is_string()) {
        return match serde_json::from_value::<TypedRecord>(value.clone()) {
            Ok(record) => LineRecord::Typed(Box::new(record)),
            Err(_) => LineRecord::Unknown(value),
        };
    }

    if object.contains_key("id") && object.contains_key("timestamp") {
        return LineRecord::HeaderLike(value);
    }

    LineRecord::Unknown(value)
}
