use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One schema violation, addressed by instance path (`$.a[0].b`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Validation outcome; `valid` is true exactly when `issues` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub valid: bool,
    pub issues: Vec<SchemaIssue>,
}

impl SchemaReport {
    pub fn from_issues(issues: Vec<SchemaIssue>) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
        }
    }

    pub fn passed() -> Self {
        Self::from_issues(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    Index(usize),
    Key(String),
}

/// Validate `instance` against a draft 2020-12 `schema`.
///
/// Issues come back ordered by instance path so that two reports over
/// related documents can be compared line by line. A schema that fails to
/// compile yields a single issue at `$`.
pub fn validate(instance: &Value, schema: &Value) -> SchemaReport {
    let validator = match jsonschema::draft202012::new(schema) {
        Ok(validator) => validator,
        Err(err) => {
            return SchemaReport::from_issues(vec![SchemaIssue {
                path: "$".to_string(),
                message: format!("invalid schema: {err}"),
            }])
        }
    };

    let mut located: Vec<(Vec<Segment>, SchemaIssue)> = validator
        .iter_errors(instance)
        .map(|error| {
            let segments = pointer_segments(instance, &error.instance_path.to_string());
            let issue = SchemaIssue {
                path: render_path(&segments),
                message: error.to_string(),
            };
            (segments, issue)
        })
        .collect();

    located.sort_by(|(a, _), (b, _)| a.cmp(b));
    SchemaReport::from_issues(located.into_iter().map(|(_, issue)| issue).collect())
}

/// Split a JSON pointer, typing each token by the value it addresses.
fn pointer_segments(instance: &Value, pointer: &str) -> Vec<Segment> {
    let mut current = Some(instance);
    let mut segments = Vec::new();
    for token in pointer.split('/').skip(1) {
        let token = token.replace("~1", "/").replace("~0", "~");
        let segment = match (current, token.parse::<usize>()) {
            (Some(Value::Array(_)), Ok(index)) => Segment::Index(index),
            _ => Segment::Key(token),
        };
        current = match (&segment, current) {
            (Segment::Index(index), Some(Value::Array(items))) => items.get(*index),
            (Segment::Key(key), Some(Value::Object(map))) => map.get(key),
            _ => None,
        };
        segments.push(segment);
    }
    segments
}

fn render_path(segments: &[Segment]) -> String {
    let mut path = String::from("$");
    for segment in segments {
        match segment {
            Segment::Index(index) => path.push_str(&format!("[{index}]")),
            Segment::Key(key) => {
                path.push('.');
                path.push_str(key);
            }
        }
    }
    path
}
