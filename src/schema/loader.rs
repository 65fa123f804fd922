use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{error, warn};

use crate::error::{IntentError, IntentResult};
use crate::utils::json_text::strip_json_comments;

/// Read a schema or template document.
///
/// Plain JSON is tried first; if that fails and the source carries comments,
/// parsing is retried on the comment-stripped text.
pub fn load_json(path: &Path) -> IntentResult<Value> {
    let raw = fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => IntentError::SchemaNotFound {
            path: path.to_path_buf(),
        },
        _ => IntentError::Decode {
            path: path.to_path_buf(),
            message: err.to_string(),
        },
    })?;
    parse_source(path, &raw)
}

fn parse_source(path: &Path, raw: &str) -> IntentResult<Value> {
    let direct = match serde_json::from_str::<Value>(raw) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    let stripped = strip_json_comments(raw);
    if stripped == raw {
        error!(path = %path.display(), "failed to parse JSON file");
        return Err(IntentError::Decode {
            path: path.to_path_buf(),
            message: direct.to_string(),
        });
    }

    warn!(path = %path.display(), "parsing JSON with comment stripping");
    serde_json::from_str(&stripped).map_err(|err| {
        error!(path = %path.display(), "failed to parse JSON after stripping comments");
        IntentError::Decode {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn commented_template_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.template.json");
        fs::write(
            &path,
            "{\n  // default fluid\n  \"materials\": {\"fluid\": {\"name\": \"water\"}} /* SI */\n}",
        )
        .unwrap();
        assert_eq!(
            load_json(&path).unwrap(),
            json!({"materials": {"fluid": {"name": "water"}}})
        );
    }

    #[test]
    fn missing_file_is_schema_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_json(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, IntentError::SchemaNotFound { .. }));
    }

    #[test]
    fn broken_json_without_comments_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"a\": }").unwrap();
        assert!(matches!(load_json(&path), Err(IntentError::Decode { .. })));
    }

    #[test]
    fn broken_json_after_stripping_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"a\": // no value\n}").unwrap();
        assert!(matches!(load_json(&path), Err(IntentError::Decode { .. })));
    }
}
