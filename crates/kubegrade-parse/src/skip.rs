//! Skip expressions - `path=regex` filters that exclude whole documents
//!
//! The path is a dotted lookup into the document (`metadata.name`,
//! `$.spec.schedule`); the value is a regular expression matched against the
//! scalar found there. Either side may be single- or double-quoted.

use crate::error::ParseError;
use regex::Regex;

#[derive(Debug)]
pub struct SkipExpression {
    raw_path: String,
    segments: Vec<String>,
    raw_value: String,
    value_regex: Regex,
}

impl SkipExpression {
    pub fn parse(expression: &str) -> Result<Self, ParseError> {
        let (raw_path, raw_value) = split_on_equals(expression).ok_or_else(|| {
            ParseError::InvalidSkipExpression {
                expression: expression.to_string(),
                message: "expected the form path=value".to_string(),
            }
        })?;
        let raw_path = unquote(&raw_path);
        let raw_value = unquote(&raw_value);

        let segments: Vec<String> = raw_path
            .strip_prefix("$.")
            .unwrap_or(&raw_path)
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        if segments.is_empty() {
            return Err(ParseError::InvalidSkipExpression {
                expression: expression.to_string(),
                message: format!("invalid path {raw_path:?}"),
            });
        }

        let value_regex =
            Regex::new(&raw_value).map_err(|err| ParseError::InvalidSkipExpression {
                expression: expression.to_string(),
                message: format!("invalid value pattern {raw_value:?}: {err}"),
            })?;

        Ok(Self {
            raw_path,
            segments,
            raw_value,
            value_regex,
        })
    }

    /// Does this expression select the given document? Missing paths and
    /// non-scalar values never match.
    pub fn matches(&self, document: &serde_yaml::Value) -> bool {
        let mut value = document;
        for segment in &self.segments {
            match value.get(segment.as_str()) {
                Some(next) => value = next,
                None => return false,
            }
        }

        let scalar = match value {
            serde_yaml::Value::String(s) => s.clone(),
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            _ => return false,
        };
        self.value_regex.is_match(scalar.trim())
    }
}

impl std::fmt::Display for SkipExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.raw_path, self.raw_value)
    }
}

/// Split on the first `=` that is not inside single quotes.
fn split_on_equals(expression: &str) -> Option<(String, String)> {
    let mut in_quotes = false;
    for (i, c) in expression.char_indices() {
        match c {
            '\'' => in_quotes = !in_quotes,
            '=' if !in_quotes => {
                return Some((
                    expression[..i].to_string(),
                    expression[i + 1..].to_string(),
                ));
            }
            _ => {}
        }
    }
    None
}

fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    for quote in ['\'', '"'] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> serde_yaml::Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_and_match() {
        let expr = SkipExpression::parse("metadata.name=^test-.*$").unwrap();
        assert!(expr.matches(&doc("metadata:\n  name: test-pod\n")));
        assert!(!expr.matches(&doc("metadata:\n  name: prod-pod\n")));
    }

    #[test]
    fn test_jsonpath_style_prefix() {
        let expr = SkipExpression::parse("$.kind=Job").unwrap();
        assert!(expr.matches(&doc("kind: Job\n")));
        assert!(!expr.matches(&doc("kind: CronJob\n")));
    }

    #[test]
    fn test_quoted_parts() {
        let expr = SkipExpression::parse("'metadata.name'='^db-.*'").unwrap();
        assert!(expr.matches(&doc("metadata:\n  name: db-main\n")));
    }

    #[test]
    fn test_quoted_equals_in_value() {
        let expr = SkipExpression::parse("metadata.name='a=b'").unwrap();
        assert!(expr.matches(&doc("metadata:\n  name: a=b\n")));
    }

    #[test]
    fn test_missing_path_never_matches() {
        let expr = SkipExpression::parse("metadata.name=.*").unwrap();
        assert!(!expr.matches(&doc("kind: Pod\n")));
    }

    #[test]
    fn test_non_scalar_never_matches() {
        let expr = SkipExpression::parse("metadata=.*").unwrap();
        assert!(!expr.matches(&doc("metadata:\n  name: x\n")));
    }

    #[test]
    fn test_invalid_expressions() {
        assert!(SkipExpression::parse("no-equals-sign").is_err());
        assert!(SkipExpression::parse("=value").is_err());
        assert!(SkipExpression::parse("metadata.name=([unclosed").is_err());
    }
}
