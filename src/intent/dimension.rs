//! Dimension-mode normalization for blockMesh geometry.
//!
//! Enforcement is best effort: when the intent does not have the expected
//! shape the input comes back unchanged together with a warning. Nothing in
//! here returns an error.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::debug;

pub const DEFAULT_THICKNESS_M: f64 = 0.002;
const NZ_MAX: i64 = 10;
const ENFORCED_NZ_MIN: i64 = 1;
const TEMPLATE_NZ_MIN: i64 = 2;
const TEMPLATE_NZ_DEFAULT: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DimensionMode {
    #[serde(rename = "3D")]
    ThreeD,
    #[serde(rename = "2D_extruded")]
    TwoDExtruded,
}

impl DimensionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThreeD => "3D",
            Self::TwoDExtruded => "2D_extruded",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "3D" => Some(Self::ThreeD),
            "2D_extruded" => Some(Self::TwoDExtruded),
            _ => None,
        }
    }
}

impl fmt::Display for DimensionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only the two recognized modes survive; anything else means "leave as is".
pub fn normalize_dimension_mode(raw: Option<&str>) -> Option<DimensionMode> {
    raw.and_then(DimensionMode::parse)
}

/// Result of a best-effort normalization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Enforcement {
    pub intent: Value,
    pub warnings: Vec<String>,
}

impl Enforcement {
    fn unchanged(intent: &Value) -> Self {
        Self {
            intent: intent.clone(),
            warnings: Vec::new(),
        }
    }
}

/// Force `meshing.blockMesh.geometry.dimension_mode` on an intent and fill
/// the fields the mode depends on.
///
/// `2D_extruded` resolves `thickness_2d_m` from the intent, then the
/// template, then `height_m`, then [`DEFAULT_THICKNESS_M`], and clamps
/// `cells.nz` into `[1, 10]` (a non-integer takes the template's `nz`, then
/// 4). `3D` resolves `height_m` the same way with the roles swapped.
pub fn enforce_dimension_mode(
    intent: &Value,
    mode: Option<DimensionMode>,
    template: &Value,
) -> Enforcement {
    let Some(mode) = mode else {
        return Enforcement::unchanged(intent);
    };
    let mut candidate = intent.clone();
    match enforce_in_place(&mut candidate, mode, template) {
        Ok(()) => Enforcement {
            intent: candidate,
            warnings: Vec::new(),
        },
        Err(warning) => {
            debug!(%mode, %warning, "dimension mode enforcement skipped");
            Enforcement {
                intent: intent.clone(),
                warnings: vec![warning],
            }
        }
    }
}

/// Prepare a template before it is handed to the fast-fill model.
///
/// Same idea as [`enforce_dimension_mode`] with template-side defaults:
/// thickness falls back to `height_m` then [`DEFAULT_THICKNESS_M`], and
/// `nz` is clamped into `[2, 10]` with a default of 4.
pub fn prepare_template(template: &Value, mode: Option<DimensionMode>) -> Enforcement {
    let Some(mode) = mode else {
        return Enforcement::unchanged(template);
    };
    let mut candidate = template.clone();
    match prepare_in_place(&mut candidate, mode) {
        Ok(()) => Enforcement {
            intent: candidate,
            warnings: Vec::new(),
        },
        Err(warning) => {
            debug!(%mode, %warning, "template dimension preparation skipped");
            Enforcement {
                intent: template.clone(),
                warnings: vec![warning],
            }
        }
    }
}

fn enforce_in_place(intent: &mut Value, mode: DimensionMode, template: &Value) -> Result<(), String> {
    let empty = Map::new();
    let template_geometry = template
        .pointer("/meshing/blockMesh/geometry")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let template_cells = template
        .pointer("/meshing/blockMesh/cells")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let block = block_mesh(intent)?;
    let geometry = child_object(block, "geometry")?;
    geometry.insert("dimension_mode".into(), json!(mode.as_str()));

    let (target, sibling) = match mode {
        DimensionMode::TwoDExtruded => ("thickness_2d_m", "height_m"),
        DimensionMode::ThreeD => ("height_m", "thickness_2d_m"),
    };
    if !is_number(geometry.get(target)) {
        let fallback = [template_geometry.get(target), geometry.get(sibling)]
            .into_iter()
            .flatten()
            .find(|value| value.is_number())
            .cloned()
            .unwrap_or_else(|| json!(DEFAULT_THICKNESS_M));
        geometry.insert(target.into(), fallback);
    }

    if mode == DimensionMode::TwoDExtruded {
        let cells = child_object(block, "cells")?;
        let nz = integer(cells.get("nz"))
            .or_else(|| integer(template_cells.get("nz")))
            .unwrap_or(TEMPLATE_NZ_DEFAULT);
        cells.insert("nz".into(), json!(nz.clamp(ENFORCED_NZ_MIN, NZ_MAX)));
    } else {
        child_object(block, "cells")?;
    }
    Ok(())
}

fn prepare_in_place(template: &mut Value, mode: DimensionMode) -> Result<(), String> {
    let block = block_mesh(template)?;
    let geometry = child_object(block, "geometry")?;
    geometry.insert("dimension_mode".into(), json!(mode.as_str()));

    match mode {
        DimensionMode::TwoDExtruded => {
            if !is_number(geometry.get("thickness_2d_m")) {
                let fallback = geometry
                    .get("height_m")
                    .filter(|value| value.is_number())
                    .cloned()
                    .unwrap_or_else(|| json!(DEFAULT_THICKNESS_M));
                geometry.insert("thickness_2d_m".into(), fallback);
            }
            let cells = child_object(block, "cells")?;
            let nz = integer(cells.get("nz"))
                .map(|nz| nz.clamp(TEMPLATE_NZ_MIN, NZ_MAX))
                .unwrap_or(TEMPLATE_NZ_DEFAULT);
            cells.insert("nz".into(), json!(nz));
        }
        DimensionMode::ThreeD => {
            if !is_number(geometry.get("height_m")) {
                if let Some(thickness) = geometry.get("thickness_2d_m").filter(|v| v.is_number()).cloned() {
                    geometry.insert("height_m".into(), thickness);
                }
            }
            child_object(block, "cells")?;
        }
    }
    Ok(())
}

fn block_mesh(document: &mut Value) -> Result<&mut Map<String, Value>, String> {
    let root = document
        .as_object_mut()
        .ok_or_else(|| "document is not an object".to_string())?;
    let meshing = child_object(root, "meshing")?;
    child_object(meshing, "blockMesh")
}

/// Get `parent[key]` as an object, creating it when absent.
fn child_object<'a>(
    parent: &'a mut Map<String, Value>,
    key: &str,
) -> Result<&'a mut Map<String, Value>, String> {
    parent
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| format!("`{key}` is not an object"))
}

fn is_number(value: Option<&Value>) -> bool {
    value.is_some_and(Value::is_number)
}

fn integer(value: Option<&Value>) -> Option<i64> {
    value.and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn template() -> Value {
        json!({
            "meshing": {"mode": "blockMesh", "blockMesh": {
                "geometry": {"dimension_mode": "3D", "length_m": 0.2, "width_m": 0.1, "height_m": 0.005},
                "cells": {"nx": 80, "ny": 40, "nz": 6}
            }}
        })
    }

    #[test]
    fn only_recognized_modes_normalize() {
        assert_eq!(normalize_dimension_mode(Some(" 3D ")), Some(DimensionMode::ThreeD));
        assert_eq!(normalize_dimension_mode(Some("2D_extruded")), Some(DimensionMode::TwoDExtruded));
        assert_eq!(normalize_dimension_mode(Some("2D")), None);
        assert_eq!(normalize_dimension_mode(None), None);
    }

    #[test]
    fn two_d_without_fields_gets_numeric_thickness_and_bounded_nz() {
        let intent = json!({"profile": "p"});
        let result = enforce_dimension_mode(&intent, Some(DimensionMode::TwoDExtruded), &json!({}));
        let block = &result.intent["meshing"]["blockMesh"];
        assert_eq!(block["geometry"]["dimension_mode"], "2D_extruded");
        assert!(block["geometry"]["thickness_2d_m"].is_number());
        let nz = block["cells"]["nz"].as_i64().unwrap();
        assert!((1..=10).contains(&nz));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn two_d_thickness_prefers_template_then_height() {
        let template = json!({"meshing": {"blockMesh": {"geometry": {"thickness_2d_m": 0.004}, "cells": {"nz": 3}}}});
        let intent = json!({"meshing": {"blockMesh": {"geometry": {"height_m": 0.009}, "cells": {"nz": "many"}}}});
        let result = enforce_dimension_mode(&intent, Some(DimensionMode::TwoDExtruded), &template);
        assert_eq!(result.intent["meshing"]["blockMesh"]["geometry"]["thickness_2d_m"], 0.004);
        assert_eq!(result.intent["meshing"]["blockMesh"]["cells"]["nz"], 3);

        let result = enforce_dimension_mode(&intent, Some(DimensionMode::TwoDExtruded), &json!({}));
        assert_eq!(result.intent["meshing"]["blockMesh"]["geometry"]["thickness_2d_m"], 0.009);
    }

    #[test]
    fn two_d_clamps_integer_nz() {
        for (raw, expected) in [(0, 1), (7, 7), (40, 10), (-3, 1)] {
            let intent = json!({"meshing": {"blockMesh": {"cells": {"nz": raw}}}});
            let result = enforce_dimension_mode(&intent, Some(DimensionMode::TwoDExtruded), &template());
            assert_eq!(result.intent["meshing"]["blockMesh"]["cells"]["nz"], expected);
        }
    }

    #[test]
    fn three_d_fills_height_from_chain() {
        let intent = json!({"meshing": {"blockMesh": {"geometry": {"thickness_2d_m": 0.003}}}});
        let result = enforce_dimension_mode(&intent, Some(DimensionMode::ThreeD), &template());
        assert_eq!(result.intent["meshing"]["blockMesh"]["geometry"]["height_m"], 0.005);

        let result = enforce_dimension_mode(&intent, Some(DimensionMode::ThreeD), &json!({}));
        assert_eq!(result.intent["meshing"]["blockMesh"]["geometry"]["height_m"], 0.003);

        let result = enforce_dimension_mode(&json!({}), Some(DimensionMode::ThreeD), &json!({}));
        assert_eq!(result.intent["meshing"]["blockMesh"]["geometry"]["height_m"], DEFAULT_THICKNESS_M);
    }

    #[test]
    fn malformed_shape_is_a_no_op_with_warning() {
        let intent = json!({"meshing": {"blockMesh": ["not", "an", "object"]}});
        let result = enforce_dimension_mode(&intent, Some(DimensionMode::TwoDExtruded), &template());
        assert_eq!(result.intent, intent);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn missing_mode_leaves_intent_untouched() {
        let intent = json!({"meshing": {"blockMesh": {"geometry": {"dimension_mode": "3D"}}}});
        let result = enforce_dimension_mode(&intent, None, &template());
        assert_eq!(result.intent, intent);
    }

    #[test]
    fn prepared_template_uses_template_side_bounds() {
        let prepared = prepare_template(&template(), Some(DimensionMode::TwoDExtruded));
        let block = &prepared.intent["meshing"]["blockMesh"];
        assert_eq!(block["geometry"]["dimension_mode"], "2D_extruded");
        assert_eq!(block["geometry"]["thickness_2d_m"], 0.005);
        assert_eq!(block["cells"]["nz"], 6);

        let bare = json!({"meshing": {"blockMesh": {"cells": {"nz": 1}}}});
        let prepared = prepare_template(&bare, Some(DimensionMode::TwoDExtruded));
        assert_eq!(prepared.intent["meshing"]["blockMesh"]["cells"]["nz"], 2);
        assert_eq!(prepared.intent["meshing"]["blockMesh"]["geometry"]["thickness_2d_m"], DEFAULT_THICKNESS_M);

        let no_nz = prepare_template(&json!({}), Some(DimensionMode::TwoDExtruded));
        assert_eq!(no_nz.intent["meshing"]["blockMesh"]["cells"]["nz"], 4);
    }

    #[test]
    fn prepared_three_d_copies_thickness_into_height() {
        let template = json!({"meshing": {"blockMesh": {"geometry": {"thickness_2d_m": 0.001}}}});
        let prepared = prepare_template(&template, Some(DimensionMode::ThreeD));
        assert_eq!(prepared.intent["meshing"]["blockMesh"]["geometry"]["height_m"], 0.001);
    }
}
