//! Parameters from a URL-encoded POST body.

use std::collections::HashMap;

use crate::error::{EssenError, EssenResult};

/// MIME type of a URL-encoded form body.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Immutable snapshot of a parsed `application/x-www-form-urlencoded` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSource {
    values: HashMap<String, String>,
}

impl FormSource {
    /// Parse `body` according to `content_type`.
    ///
    /// Bodies of any other content type produce an empty form.
    pub fn parse(content_type: Option<&str>, body: &[u8]) -> EssenResult<Self> {
        if !is_form_urlencoded(content_type) {
            return Ok(Self::default());
        }

        let text = std::str::from_utf8(body)
            .map_err(|e| EssenError::FormParseError(format!("form body is not UTF-8: {}", e)))?;
        validate_urlencoded(text).map_err(EssenError::FormParseError)?;

        let mut values = HashMap::new();
        for (k, v) in url::form_urlencoded::parse(text.as_bytes()) {
            values.entry(k.into_owned()).or_insert_with(|| v.into_owned());
        }
        Ok(Self { values })
    }

    /// Look up `name`. Missing and empty values are both `InvalidParam`.
    pub fn param(&self, name: &str) -> EssenResult<String> {
        match self.values.get(name) {
            Some(v) if !v.is_empty() => Ok(v.clone()),
            _ => Err(EssenError::invalid_param(name)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn is_form_urlencoded(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(FORM_URLENCODED))
        .unwrap_or(false)
}

/// Reject `;` separators and malformed percent escapes.
fn validate_urlencoded(text: &str) -> Result<(), String> {
    if text.contains(';') {
        return Err("invalid semicolon separator in form body".to_string());
    }

    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                let end = (i + 3).min(bytes.len());
                return Err(format!(
                    "invalid URL escape \"{}\"",
                    String::from_utf8_lossy(&bytes[i..end])
                ));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_urlencoded() {
        let form = FormSource::parse(Some(FORM_URLENCODED), b"user=alice&msg=hi%21").unwrap();
        assert_eq!(form.param("user").unwrap(), "alice");
        assert_eq!(form.param("msg").unwrap(), "hi!");
        assert_eq!(form.param("missing").unwrap_err().kind(), "InvalidParam");
    }

    #[test]
    fn test_content_type_parameters_ignored() {
        let form = FormSource::parse(
            Some("Application/X-WWW-Form-Urlencoded; charset=utf-8"),
            b"a=1",
        )
        .unwrap();
        assert_eq!(form.param("a").unwrap(), "1");
    }

    #[test]
    fn test_other_content_type_is_empty() {
        let form = FormSource::parse(Some("application/json"), br#"{"a":1}"#).unwrap();
        assert!(form.is_empty());
        let form = FormSource::parse(None, b"a=1").unwrap();
        assert!(form.is_empty());
    }

    #[test]
    fn test_empty_value_is_invalid() {
        let form = FormSource::parse(Some(FORM_URLENCODED), b"a=&b=2").unwrap();
        assert_eq!(form.param("a").unwrap_err(), EssenError::invalid_param("a"));
    }

    #[test]
    fn test_malformed_bodies() {
        for body in [&b"a=%zz"[..], b"a=1;b=2", b"a=%4", b"\xff\xfe"] {
            let err = FormSource::parse(Some(FORM_URLENCODED), body).unwrap_err();
            assert_eq!(err.kind(), "FormParseError");
        }
    }
}
