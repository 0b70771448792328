//! JSON deserialization that reports which field failed.

use anyhow::anyhow;
use serde::de::DeserializeOwned;

/// Deserializes `body` into `T`, naming the JSON path that failed.
///
/// serde's stock errors carry a line and column but not the path being
/// deserialized; for the catalog's deeply nested responses the path is the
/// part worth logging.
pub fn parse_json_with_context<T: DeserializeOwned>(body: &str) -> anyhow::Result<T> {
    let deserializer = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(deserializer).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        if path.is_empty() || path == "." {
            anyhow!(inner)
        } else {
            anyhow!("at `{path}`: {inner}")
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Outer {
        #[serde(rename = "Inner")]
        inner: Vec<Inner>,
    }

    #[derive(Debug, Deserialize)]
    struct Inner {
        #[serde(rename = "Count")]
        count: i32,
    }

    #[test]
    fn test_parse_valid_body() {
        let parsed: Outer = parse_json_with_context(r#"{"Inner": [{"Count": 3}]}"#)
            .expect("body should parse");
        assert_eq!(parsed.inner.len(), 1);
        assert_eq!(parsed.inner[0].count, 3);
    }

    #[test]
    fn test_error_names_failing_path() {
        let err = parse_json_with_context::<Outer>(r#"{"Inner": [{"Count": "three"}]}"#)
            .expect_err("mistyped field should fail");
        let message = err.to_string();
        assert!(
            message.contains("Inner[0].Count"),
            "expected path in message, got: {message}"
        );
    }

    #[test]
    fn test_error_on_malformed_json() {
        assert!(parse_json_with_context::<Outer>("{not json").is_err());
    }
}
