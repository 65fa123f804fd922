//! Human-readable rendering of pipeline outcomes
//!
//! Everything here is a pure function of its inputs.

use serde_json::Value;

use crate::llm::MissingParameter;
use crate::pipeline::{PipelineStatus, ReviewPayload};
use crate::schema::SchemaReport;
use crate::storage::StorageRecord;

const MAX_LISTED_ISSUES: usize = 4;
const MAX_JOINED_ITEMS: usize = 3;

/// Summary shown while the collector is still waiting for parameters.
pub fn build_collection_summary(missing: &[MissingParameter], hint: &str) -> String {
    let mut lines = vec!["[Parameter collection]".to_string()];
    let hint = hint.trim();
    if !hint.is_empty() {
        lines.push(format!("· {hint}"));
    }

    if missing.is_empty() {
        lines.push("· Core parameters are complete; ready for validation.".to_string());
        return lines.join("\n");
    }

    lines.push(format!(
        "· {} key parameter(s) still missing; add them or accept the suggestions:",
        missing.len()
    ));
    for item in missing.iter().take(MAX_LISTED_ISSUES) {
        let mut bullet = format!("  - {}", item.label);
        if !item.detail.is_empty() {
            bullet.push_str(&format!(": {}", item.detail));
        }
        if let Some(text) = item.suggested.as_ref().and_then(|s| s.text.as_deref()) {
            bullet.push_str(&format!(" (suggested: {text})"));
        }
        lines.push(bullet);
    }
    lines.join("\n")
}

fn push_issues(lines: &mut Vec<String>, report: &SchemaReport) {
    for issue in report.issues.iter().take(MAX_LISTED_ISSUES) {
        lines.push(format!("  - {issue}"));
    }
}

fn join_items(items: &[String]) -> String {
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .take(MAX_JOINED_ITEMS)
        .collect::<Vec<_>>()
        .join("; ")
}

fn push_joined(lines: &mut Vec<String>, label: &str, items: &[String]) {
    let text = join_items(items);
    if !text.is_empty() {
        lines.push(format!("  - {label}: {text}"));
    }
}

/// Multi-layer validation report for the full-fill entry point.
///
/// `schema_final` is `None` when no post-review validation ran.
pub fn build_multilayer_summary(
    schema_initial: &SchemaReport,
    schema_final: Option<&SchemaReport>,
    review: &ReviewPayload,
    final_intent: &Value,
    status: PipelineStatus,
    storage: Option<&StorageRecord>,
) -> String {
    let mut lines = vec!["[Multi-layer validation]".to_string()];

    if !schema_initial.valid {
        lines.push("· Schema check: failed.".to_string());
        push_issues(&mut lines, schema_initial);
        lines.push("Fix the issues above in the intent JSON and generate again.".to_string());
        return lines.join("\n");
    }

    lines.push("· Schema check: passed.".to_string());
    match schema_final {
        Some(report) if report.valid => {
            lines.push("· Post-review schema check: passed (auto corrections included).".to_string())
        }
        Some(report) => {
            lines.push("· Post-review schema check: failed.".to_string());
            push_issues(&mut lines, report);
            lines.push(
                "The auto-corrected intent still fails schema validation; review it manually."
                    .to_string(),
            );
        }
        None if status == PipelineStatus::SchemaRegression => lines.push(
            "· Post-review schema check: failed; the model output is kept for reference."
                .to_string(),
        ),
        None => {}
    }

    let reviewer_failed = status == PipelineStatus::ReasonerFailed;

    match &review.physics {
        Some(physics) => {
            let physics_status = if physics.status.is_empty() { "info" } else { physics.status.as_str() };
            let summary = if physics.summary.is_empty() {
                "No details provided."
            } else {
                physics.summary.as_str()
            };
            lines.push(format!("· Physics check: [{physics_status}] {summary}"));
            push_joined(&mut lines, "Concerns", &physics.issues);
            push_joined(&mut lines, "Key calculations", &physics.key_calculations);
            push_joined(&mut lines, "Suggested fixes", &physics.suggested_fixes);
        }
        None if reviewer_failed => {
            lines.push("· Physics check: not executed (reviewer call failed).".to_string())
        }
        None => lines.push("· Physics check: no model feedback.".to_string()),
    }

    match &review.expert {
        Some(expert) => {
            let summary = if expert.summary.is_empty() {
                "No summary."
            } else {
                expert.summary.as_str()
            };
            lines.push(format!("· Expert review: {summary}"));
            push_joined(&mut lines, "Boundary setup", &expert.boundary_guidance);
            push_joined(&mut lines, "Numerics", &expert.numerics_guidance);
            push_joined(&mut lines, "Risks", &expert.risk_alerts);
            push_joined(&mut lines, "Auto-fix rules", &expert.auto_fix_rules);
        }
        None if reviewer_failed => lines.push("· Expert review: not executed.".to_string()),
        None => {}
    }

    if let Some(corrections) = &review.auto_corrections {
        let applied = join_items(&corrections.applied);
        if !applied.is_empty() {
            lines.push(format!("· Auto corrections: {applied}"));
        }
        push_joined(&mut lines, "Correction rules", &corrections.rules);
    }

    if let Some(record) = storage {
        lines.push(format!("· Saved to: {}", record.storage_path));
    }

    if reviewer_failed {
        if let Some(error) = review.reasoner_error.as_deref().filter(|e| !e.is_empty()) {
            lines.push(format!("· Reviewer: {error}"));
        }
    }

    lines.push("[Intent summary]".to_string());
    lines.push(summarize_intent(final_intent));
    lines.join("\n")
}

/// A JSON scalar as display text; `None` for null.
fn plain(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn plain_or(value: &Value, fallback: &str) -> String {
    plain(value)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// `{si} {unit}`, with the original expression when one was recorded.
fn quantity(value: &Value, fallback_unit: &str) -> String {
    if !value.is_object() {
        return String::new();
    }
    let Some(si) = plain(&value["si"]) else {
        return String::new();
    };
    let unit = plain_or(&value["unit"], fallback_unit);
    match plain(&value["original"]).filter(|original| !original.is_empty()) {
        Some(original) => format!("{si} {unit} (original {original})"),
        None => format!("{si} {unit}"),
    }
}

fn string_list(value: &Value) -> String {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(plain)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

fn mesh_line(intent: &Value, profile: &str) -> Option<String> {
    if profile.starts_with("CoolingPlate-OF-Intent") {
        let meshing = &intent["meshing"];
        let mode = plain(&meshing["mode"]).unwrap_or_default();
        if mode != "blockMesh" {
            let mode = if mode.is_empty() { "unspecified" } else { mode.as_str() };
            return Some(format!("OpenFOAM mesh mode: {mode}"));
        }
        let geometry = &meshing["blockMesh"]["geometry"];
        let dim = |key: &str| plain_or(&geometry[key], "unset");
        let two_d = matches!(
            geometry["dimension_mode"].as_str(),
            Some("2D_extruded") | Some("2D")
        );
        Some(if two_d {
            format!(
                "OpenFOAM automatic mesh: blockMesh (2D channel L={} m, W={} m, thickness={} m)",
                dim("length_m"),
                dim("width_m"),
                dim("thickness_2d_m")
            )
        } else {
            format!(
                "OpenFOAM automatic mesh: blockMesh (3D rectangular channel L={} m, W={} m, H={} m)",
                dim("length_m"),
                dim("width_m"),
                dim("height_m")
            )
        })
    } else if profile.starts_with("CoolingPlate-Intent@mesh") {
        Some(format!(
            "External mesh: Fluent .msh (units hint: {})",
            plain_or(&intent["mesh"]["units_hint"], "unknown")
        ))
    } else {
        None
    }
}

/// Render the key fields of an intent for either profile family.
pub fn summarize_intent(intent: &Value) -> String {
    let profile = intent["profile"].as_str().unwrap_or_default();
    let conditions = &intent["operating_conditions"];
    let accuracy = &intent["accuracy_pref"];
    let deliverables = &intent["deliverables"];

    let mut lines = vec!["[Cooling-plate flow & heat transfer: intent summary]".to_string()];
    if let Some(mesh) = mesh_line(intent, profile) {
        lines.push(format!("· {mesh}."));
    }

    let time_mode = if plain_or(&conditions["time_mode"], "steady") == "steady" {
        "steady"
    } else {
        "transient"
    };
    let regime = if plain_or(&conditions["flow_regime"], "incompressible") == "incompressible" {
        "incompressible"
    } else {
        "low-Mach"
    };
    let turbulence = if plain_or(&conditions["turbulence"], "RANS") == "laminar" {
        "laminar"
    } else {
        "RANS"
    };
    lines.push(format!(
        "· Conditions: {time_mode}, {regime}; {turbulence} (model hint: {}).",
        plain_or(&conditions["turb_model_hint"], "kOmegaSST")
    ));

    let inlet = &conditions["inlets"][0];
    let inlet_temperature = match &inlet["T_in"] {
        Value::Object(map) if !map.is_empty() => format!(
            "{} {}",
            plain(&inlet["T_in"]["si"]).unwrap_or_default(),
            plain(&inlet["T_in"]["unit"]).unwrap_or_default()
        ),
        _ => String::new(),
    };
    lines.push(format!(
        "· Inlet: specified by {}, value {}, inlet temperature {}.",
        plain(&inlet["quantity"]).unwrap_or_default(),
        quantity(&inlet["value"], ""),
        inlet_temperature
    ));
    lines.push(format!(
        "· Outlet: pressure outlet {}.",
        quantity(&conditions["outlets"][0]["p"], "Pa")
    ));

    let load = &intent["thermal_loads"][0];
    if load.is_object() {
        lines.push(format!(
            "· Heat load: {}: {} (region: {}).",
            plain(&load["type"]).unwrap_or_default(),
            quantity(&load["value"], ""),
            plain(&load["region_semantic"]).unwrap_or_default()
        ));
    }

    lines.push(format!(
        "· Fluid: {}.",
        plain_or(&intent["materials"]["fluid"]["name"], "water")
    ));

    let residuals = &accuracy["residual_targets"];
    lines.push(format!(
        "· Convergence targets: U {}, p {}, T {}; max iterations: {}.",
        plain(&residuals["U"]).unwrap_or_default(),
        plain(&residuals["p"]).unwrap_or_default(),
        plain(&residuals["T"]).unwrap_or_default(),
        plain_or(&accuracy["max_iter"], "1000")
    ));

    if profile.starts_with("CoolingPlate-OF-Intent") {
        let openfoam = &intent["openfoam"];
        let relaxation = match &openfoam["numerics"]["under_relaxation"] {
            Value::Null => "{}".to_string(),
            other => other.to_string(),
        };
        lines.push(format!(
            "· OpenFOAM: solver {}, under-relaxation: {relaxation}.",
            plain(&openfoam["solver"]).unwrap_or_default()
        ));
    }

    for (key, label) in [
        ("reports", "Reports"),
        ("plots", "Plots/monitors"),
        ("exports", "Exported fields"),
    ] {
        let joined = string_list(&deliverables[key]);
        if !joined.is_empty() {
            lines.push(format!("· {label}: {joined}."));
        }
    }

    lines.push(
        "(Intent-level settings only; mesh, dictionaries and scripts are generated in the next stage.)"
            .to_string(),
    );
    lines.join("\n")
}
