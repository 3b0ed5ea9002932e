//! Structural check applied to every decoded frame before fan-out.
//!
//! A frame passes when it is exactly one JSON value. The check walks the
//! value without building it, so anything the grammar allows is accepted:
//! numbers beyond `f64` range and lone UTF-16 surrogate escapes included.

use serde::de::IgnoredAny;
use serde::Deserialize;
use thiserror::Error;

use crate::frame::Frame;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("frame is not a single JSON value: {0}")]
    Json(#[from] serde_json::Error),
}

/// A frame that parsed as one JSON value.
///
/// Subscribers receive `raw`, byte for byte; the relay never re-serializes.
#[derive(Debug, Clone)]
pub struct Telemetry {
    raw: Frame,
    kind: Option<String>,
}

impl Telemetry {
    pub fn raw(&self) -> &Frame {
        &self.raw
    }

    /// The record's `type` field, when it is an object carrying a string one.
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn into_raw(self) -> Frame {
        self.raw
    }
}

#[derive(Debug)]
pub enum Verdict {
    Valid(Telemetry),
    /// Empty or whitespace-only line; skipped without complaint.
    Blank,
    Invalid { frame: Frame, error: ValidationError },
}

/// Only the `type` field; every other member is skipped unparsed.
#[derive(Deserialize)]
struct KindField {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Best-effort `type` lookup for metrics. Anything unusual yields `None`.
fn extract_kind(text: &str) -> Option<String> {
    if !text.trim_start().starts_with('{') {
        return None;
    }
    serde_json::from_str::<KindField>(text).ok()?.kind
}

pub fn validate(frame: Frame) -> Verdict {
    if frame.is_blank() {
        return Verdict::Blank;
    }
    let checked = std::str::from_utf8(frame.as_bytes())
        .map_err(ValidationError::from)
        .and_then(|text| {
            serde_json::from_str::<IgnoredAny>(text)
                .map(|_| extract_kind(text))
                .map_err(ValidationError::from)
        });
    match checked {
        Ok(kind) => Verdict::Valid(Telemetry { raw: frame, kind }),
        Err(error) => Verdict::Invalid { frame, error },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(raw: &str) -> Option<String> {
        match validate(Frame::from(raw)) {
            Verdict::Valid(t) => t.kind().map(str::to_string),
            other => panic!("expected valid, got {other:?}"),
        }
    }

    #[test]
    fn accepts_object_and_keeps_raw_bytes() {
        let raw = r#"{ "type":"metrics",  "green":{"active":3} }"#;
        match validate(Frame::from(raw)) {
            Verdict::Valid(t) => {
                assert_eq!(t.raw().as_bytes(), raw.as_bytes());
                assert_eq!(t.kind(), Some("metrics"));
            }
            other => panic!("expected valid, got {other:?}"),
        }
    }

    #[test]
    fn accepts_scalar_values() {
        assert!(matches!(validate(Frame::from("42")), Verdict::Valid(_)));
        assert!(matches!(validate(Frame::from("[1,2]")), Verdict::Valid(_)));
    }

    #[test]
    fn kind_absent_for_non_objects() {
        assert_eq!(kind_of("[1]"), None);
        assert_eq!(kind_of(r#"["metrics"]"#), None);
        assert_eq!(kind_of(r#""metrics""#), None);
    }

    #[test]
    fn kind_absent_when_not_a_string() {
        assert_eq!(kind_of(r#"{"type":7}"#), None);
        assert_eq!(kind_of(r#"{"other":"x"}"#), None);
    }

    #[test]
    fn out_of_range_number_is_valid() {
        let raw = r#"{"type":"metrics","x":1e400}"#;
        let Verdict::Valid(t) = validate(Frame::from(raw)) else {
            panic!("expected valid");
        };
        assert_eq!(t.raw().as_bytes(), raw.as_bytes());
        assert_eq!(t.kind(), Some("metrics"));
    }

    #[test]
    fn lone_surrogate_escape_is_valid() {
        let raw = r#"{"name":"\ud800"}"#;
        let Verdict::Valid(t) = validate(Frame::from(raw)) else {
            panic!("expected valid");
        };
        assert_eq!(t.raw().as_bytes(), raw.as_bytes());
        assert_eq!(t.kind(), None);
    }

    #[test]
    fn lone_surrogate_in_type_falls_back_to_untyped() {
        assert_eq!(kind_of(r#"{"type":"\udc00"}"#), None);
    }

    #[test]
    fn trailing_carriage_return_is_tolerated() {
        let Verdict::Valid(t) = validate(Frame::from("{\"a\":1}\r")) else {
            panic!("expected valid");
        };
        assert_eq!(t.raw().as_bytes(), b"{\"a\":1}\r");
    }

    #[test]
    fn rejects_truncated_json() {
        match validate(Frame::from("{\"id\":2,\"sta")) {
            Verdict::Invalid { frame, error } => {
                assert_eq!(frame.as_str(), Some("{\"id\":2,\"sta"));
                assert!(matches!(error, ValidationError::Json(_)));
            }
            other => panic!("expected invalid, got {other:?}"),
        }
    }

    #[test]
    fn rejects_two_values_on_one_line() {
        assert!(matches!(
            validate(Frame::from("{} {}")),
            Verdict::Invalid { .. }
        ));
    }

    #[test]
    fn rejects_bad_escape() {
        assert!(matches!(
            validate(Frame::from(r#"{"a":"\q"}"#)),
            Verdict::Invalid { .. }
        ));
    }

    #[test]
    fn rejects_non_utf8() {
        match validate(Frame::from(vec![b'"', 0xff, b'"'])) {
            Verdict::Invalid { error, .. } => assert!(matches!(error, ValidationError::Utf8(_))),
            other => panic!("expected invalid, got {other:?}"),
        }
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(matches!(validate(Frame::from("")), Verdict::Blank));
        assert!(matches!(validate(Frame::from("  \t")), Verdict::Blank));
    }
}
