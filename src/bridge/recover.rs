//! Best-effort extraction of JSON embedded in s9s text output.
//!
//! `--print-json` output is sometimes wrapped in banners or diagnostics. The
//! recovery is an ordered chain of independent attempts; the first one that
//! parses wins. Malformed JSON inside a candidate span is never repaired.

use serde_json::Value;

/// Outcome of [`recover`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recovery {
    Parsed(Value),
    Unrecoverable,
}

impl Recovery {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Recovery::Parsed(v) => Some(v),
            Recovery::Unrecoverable => None,
        }
    }

    /// Continue the chain: keep a parsed value, otherwise try `attempt`.
    fn or_attempt(self, text: &str, attempt: Attempt) -> Recovery {
        match self {
            Recovery::Parsed(_) => self,
            Recovery::Unrecoverable => attempt(text),
        }
    }
}

type Attempt = fn(&str) -> Recovery;

/// Attempts in priority order. Append new strategies here.
const ATTEMPTS: &[Attempt] = &[whole_document, object_span, array_span];

/// Recover a JSON value from `text`.
pub fn recover(text: &str) -> Recovery {
    let input = text.trim();
    ATTEMPTS
        .iter()
        .fold(Recovery::Unrecoverable, |acc, attempt| acc.or_attempt(input, *attempt))
}

fn parse(candidate: &str) -> Recovery {
    serde_json::from_str(candidate).map_or(Recovery::Unrecoverable, Recovery::Parsed)
}

fn whole_document(input: &str) -> Recovery {
    parse(input)
}

fn object_span(input: &str) -> Recovery {
    delimited(input, '{', '}')
}

fn array_span(input: &str) -> Recovery {
    delimited(input, '[', ']')
}

/// Parse from the first `open` to the last `close`, inclusive.
fn delimited(input: &str, open: char, close: char) -> Recovery {
    match (input.find(open), input.rfind(close)) {
        (Some(start), Some(end)) if end > start => parse(&input[start..=end]),
        _ => Recovery::Unrecoverable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_document() {
        assert_eq!(
            recover(r#"  {"clusters":[]}  "#),
            Recovery::Parsed(json!({"clusters": []}))
        );
        assert_eq!(recover("42"), Recovery::Parsed(json!(42)));
    }

    #[test]
    fn wrapped_equals_clean() {
        let doc = r#"{"jobs":[{"id":1,"status":"FAILED"}],"total":1}"#;
        let clean = recover(doc);
        for wrapped in [
            format!("noise... {doc} trailing"),
            format!("Connecting to controller\n{doc}\nDone."),
            format!("WARN: tls not verified {doc}"),
        ] {
            assert_eq!(recover(&wrapped), clean, "input: {wrapped}");
        }
    }

    #[test]
    fn array_span_after_object_fails() {
        let text = "hosts: [ {\"id\":1}, {\"id\":2} ] end";
        // the object span `{"id":1}, {"id":2}` is not valid JSON, the array span is
        assert_eq!(recover(text), Recovery::Parsed(json!([{"id": 1}, {"id": 2}])));
    }

    #[test]
    fn unbalanced_or_absent_brackets() {
        assert_eq!(recover("hello {world"), Recovery::Unrecoverable);
        assert_eq!(recover("} backwards {"), Recovery::Unrecoverable);
        assert_eq!(recover("plain text output"), Recovery::Unrecoverable);
        assert_eq!(recover(""), Recovery::Unrecoverable);
    }

    #[test]
    fn malformed_span_is_not_repaired() {
        assert_eq!(
            recover(r#"prefix {"a": 1,, "b": 2} suffix"#),
            Recovery::Unrecoverable
        );
    }

    #[test]
    fn into_value() {
        assert_eq!(recover("[1]").into_value(), Some(json!([1])));
        assert_eq!(recover("nope").into_value(), None);
    }
}
