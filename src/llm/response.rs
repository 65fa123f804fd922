//! Typed generation responses
//!
//! Every stage expects exactly one response shape. A reply is accepted when
//! it is a JSON object carrying at least one of that shape's keys; anything
//! else is a [`LlmError::MalformedResponse`]. Field values are normalized
//! leniently: wrong-typed optional fields are dropped, list fields accept
//! strings, arrays or note objects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::LlmError;
use crate::utils::json_text::coerce_string_list;

const COLLECTOR_KEYS: &[&str] = &[
    "intent",
    "missing_parameters",
    "default_intent",
    "defaults_overview",
    "summary",
];
const REVIEWER_KEYS: &[&str] = &[
    "updated_intent",
    "physics_check",
    "expert_review",
    "auto_corrections",
];
const FAST_FILL_KEYS: &[&str] = &["intent", "defaults_used", "open_questions"];

pub const DEFAULT_PARAMETER_LABEL: &str = "Parameter";

fn recognize(value: Value, keys: &[&str]) -> Result<Map<String, Value>, LlmError> {
    match value {
        Value::Object(map) if keys.iter().any(|key| map.contains_key(*key)) => Ok(map),
        other => Err(LlmError::malformed(&other.to_string())),
    }
}

fn object(value: Option<&Value>) -> Option<Value> {
    value.filter(|value| value.is_object()).cloned()
}

/// A field rendered as trimmed text; numbers are stringified, everything else is empty.
fn text(map: &Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

/// First non-empty text among `keys`.
fn first_text(map: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| text(map, key))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

/// First present list among `keys`, flattened to strings.
fn first_list(map: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|key| map.get(*key).filter(|value| !value.is_null()))
        .map(|value| coerce_string_list(Some(value)))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub si: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Suggestion {
    fn from_value(value: &Value) -> Option<Self> {
        let suggestion = match value {
            Value::String(raw) => Self {
                text: non_empty(raw.trim()),
                ..Self::default()
            },
            Value::Object(map) => Self {
                text: non_empty(&text(map, "text")),
                value: map.get("value").and_then(number),
                si: map.get("si").and_then(number),
                unit: non_empty(&text(map, "unit")),
            },
            _ => return None,
        };
        (!suggestion.is_empty()).then_some(suggestion)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.value.is_none() && self.si.is_none() && self.unit.is_none()
    }
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

fn number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(number) => Some(number.clone()),
        _ => None,
    }
}

/// A field the collector could not fill from the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingParameter {
    pub label: String,
    pub detail: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested: Option<Suggestion>,
}

impl MissingParameter {
    /// Normalize a loosely typed `missing_parameters` value.
    ///
    /// Bare strings become the detail of a generic entry; objects take their
    /// label from `label`, then `group`. Other entries are skipped.
    pub fn normalize_list(value: Option<&Value>) -> Vec<Self> {
        let Some(Value::Array(items)) = value else {
            return Vec::new();
        };
        items.iter().filter_map(Self::from_value).collect()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(raw) => {
                let detail = raw.trim();
                (!detail.is_empty()).then(|| Self {
                    label: DEFAULT_PARAMETER_LABEL.to_string(),
                    detail: detail.to_string(),
                    path: String::new(),
                    suggested: None,
                })
            }
            Value::Object(map) => {
                let label = first_text(map, &["label", "group"]);
                Some(Self {
                    label: if label.is_empty() {
                        DEFAULT_PARAMETER_LABEL.to_string()
                    } else {
                        label
                    },
                    detail: text(map, "detail"),
                    path: text(map, "path"),
                    suggested: map.get("suggested").and_then(Suggestion::from_value),
                })
            }
            _ => None,
        }
    }
}

/// Parameter-collection reply.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorResponse {
    pub intent: Option<Value>,
    pub missing_parameters: Vec<MissingParameter>,
    pub default_intent: Option<Value>,
    pub defaults_overview: Option<Value>,
    pub summary: String,
}

impl TryFrom<Value> for CollectorResponse {
    type Error = LlmError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let map = recognize(value, COLLECTOR_KEYS)?;
        Ok(Self {
            intent: object(map.get("intent")),
            missing_parameters: MissingParameter::normalize_list(map.get("missing_parameters")),
            default_intent: object(map.get("default_intent")),
            defaults_overview: object(map.get("defaults_overview")),
            summary: text(&map, "summary"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicsCheck {
    pub status: String,
    pub summary: String,
    pub issues: Vec<String>,
    pub key_calculations: Vec<String>,
    pub suggested_fixes: Vec<String>,
}

impl PhysicsCheck {
    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            status: first_text(map, &["status", "level"]),
            summary: first_text(map, &["summary", "details", "analysis"]),
            issues: first_list(map, &["issues", "concerns"]),
            key_calculations: first_list(map, &["key_calculations"]),
            suggested_fixes: first_list(map, &["suggested_fixes"]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpertReview {
    pub summary: String,
    pub boundary_guidance: Vec<String>,
    pub numerics_guidance: Vec<String>,
    pub risk_alerts: Vec<String>,
    pub auto_fix_rules: Vec<String>,
}

impl ExpertReview {
    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            summary: first_text(map, &["summary", "guidance"]),
            boundary_guidance: first_list(map, &["boundary_guidance"]),
            numerics_guidance: first_list(map, &["numerics_guidance"]),
            risk_alerts: first_list(map, &["risk_alerts"]),
            auto_fix_rules: first_list(map, &["auto_fix_rules"]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoCorrections {
    pub applied: Vec<String>,
    pub rules: Vec<String>,
}

impl AutoCorrections {
    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            applied: first_list(map, &["applied"]),
            rules: first_list(map, &["rules"]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.rules.is_empty()
    }
}

/// Physics/expert review reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewerResponse {
    pub updated_intent: Option<Value>,
    pub physics: Option<PhysicsCheck>,
    pub expert: Option<ExpertReview>,
    pub auto_corrections: Option<AutoCorrections>,
}

impl TryFrom<Value> for ReviewerResponse {
    type Error = LlmError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let map = recognize(value, REVIEWER_KEYS)?;
        Ok(Self {
            updated_intent: object(map.get("updated_intent")),
            physics: map
                .get("physics_check")
                .and_then(Value::as_object)
                .map(PhysicsCheck::from_map),
            expert: map
                .get("expert_review")
                .and_then(Value::as_object)
                .map(ExpertReview::from_map),
            auto_corrections: map
                .get("auto_corrections")
                .and_then(Value::as_object)
                .map(AutoCorrections::from_map),
        })
    }
}

/// Single-call template fill reply.
#[derive(Debug, Clone, PartialEq)]
pub struct FastFillResponse {
    pub intent: Option<Value>,
    pub defaults_used: Vec<String>,
    pub open_questions: Vec<String>,
}

impl TryFrom<Value> for FastFillResponse {
    type Error = LlmError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let map = recognize(value, FAST_FILL_KEYS)?;
        Ok(Self {
            intent: object(map.get("intent")),
            defaults_used: coerce_string_list(map.get("defaults_used")),
            open_questions: coerce_string_list(map.get("open_questions")),
        })
    }
}
