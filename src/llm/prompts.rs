use serde_json::Value;

use super::client::ChatMessage;
use crate::error::truncate_chars;
use crate::intent::DimensionMode;
use crate::profile::Profile;

/// Schema preview budget for the reviewer prompt.
pub const SCHEMA_PREVIEW_CHARS: usize = 2000;

/// Fields the collector must account for before validation can start.
pub const COLLECT_REQUIRED_NOTE: &str = "Key fields that must be covered:
1. Geometry: meshing.blockMesh.geometry.dimension_mode, length_m, width_m, and height_m (3D) or thickness_2d_m (2D).
2. Inlet: operating_conditions.inlets[0] quantity, value.si/unit and T_in.si.
3. Outlet pressure: operating_conditions.outlets[0].p.si/unit.
4. Heat load: thermal_loads[0].value.si/unit.
5. Fluid name: materials.fluid.name (suggest water when not given).";

const COLLECTOR_SYSTEM: &str = "You are a liquid cooling-plate CFD parameter collector. \
Read the user description together with the JSON template, identify which fields have explicit values and which are still missing. \
Only map stated values onto template fields and propose conservative defaults; do not infer flow, heat-transfer or numerical behaviour. \
Use SI units throughout and keep `profile` unchanged. \
Reply with one JSON object of the form \
{\"intent\": <template filled with known values>, \
\"missing_parameters\": [{\"label\": \"\", \"detail\": \"\", \"path\": \"\", \"suggested\": {\"text\": \"\", \"value\": 0, \"unit\": \"\"}}], \
\"default_intent\": <template filled with suggested defaults>, \
\"defaults_overview\": {\"geometry_text\": \"\", \"heat_text\": \"\", \"notes\": \"\"}, \
\"summary\": \"short summary\"}. \
When the description is complete, missing_parameters is an empty array and default_intent may equal intent. \
Output nothing but the JSON object.";

const REVIEWER_SYSTEM: &str = "You are a multi-layer CFD reviewer gating liquid cooling-plate heat-transfer setups. \
For the given CoolingPlate intent JSON, perform a Physics Check followed by an Expert Review. \
You may correct clear physical contradictions or omissions, but only through existing schema fields, and `profile` must stay unchanged.";

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Messages for the parameter-collection call.
pub fn collector_messages(user_request: &str, template: &Value) -> Vec<ChatMessage> {
    let user = format!(
        "[User description]\n{request}\n\n[Template JSON]\n{template}\n\n[Checklist]\n{note}\nReply with a JSON object of the structure above; unconfirmed fields may keep their template values.",
        request = user_request.trim(),
        template = pretty(template),
        note = COLLECT_REQUIRED_NOTE,
    );
    vec![ChatMessage::system(COLLECTOR_SYSTEM), ChatMessage::user(user)]
}

/// Messages for the physics/expert review call.
pub fn reviewer_messages(intent: &Value, schema: &Value) -> Vec<ChatMessage> {
    let schema_hint = truncate_chars(&schema.to_string(), SCHEMA_PREVIEW_CHARS);
    let user = format!(
        r#"[Input intent JSON]
{intent}

[Tasks]
1. Physics Check: from geometry, boundary conditions and materials, estimate key quantities (Reynolds number, volumetric flow, heat flux density), flag physical contradictions or gaps, and suggest fixes.
2. Expert Review: as a CFD expert, go through boundary setup, numerical strategy, convergence and monitoring, and risks; give executable auto-fix rules.
3. If the intent must change, adjust only the necessary fields, keep values consistent, and state the reason for any addition.
4. Reply with one strict JSON object:
{{
  "updated_intent": <corrected intent, identical to the input when unchanged>,
  "physics_check": {{"status": "pass/warn/fail", "summary": "", "issues": [], "key_calculations": [], "suggested_fixes": []}},
  "expert_review": {{"summary": "", "boundary_guidance": [], "numerics_guidance": [], "risk_alerts": [], "auto_fix_rules": []}},
  "auto_corrections": {{"applied": [], "rules": []}}
}}
5. Use empty arrays when there is nothing to report; keep numeric estimates brief.
[Schema reference (truncated preview)]
{schema_hint}
"#,
        intent = pretty(intent),
    );
    vec![ChatMessage::system(REVIEWER_SYSTEM), ChatMessage::user(user)]
}

fn fast_fill_system(profile: &Profile) -> String {
    if profile.is_openfoam() {
        format!(
            "You are a CFD intent normalizer. Map the user's liquid cooling-plate description onto {profile} JSON. \
Only perform field mapping and conservative default filling; do not reason about flow, heat transfer or numerical stability, \
and never compute Reynolds, CFL or Nusselt numbers. \
Reply exactly as {{\"intent\": {{...}}, \"defaults_used\": [...], \"open_questions\": [...]}}. \
The intent must cover the template structure in SI units, defaults_used lists the default assumptions, \
and open_questions lists only points the user must confirm (an empty array when there are none). \
Output strictly valid JSON with no extra commentary.",
            profile = profile.profile_identifier
        )
    } else {
        "You are a CFD intent normalizer. Quickly produce the intent JSON for the given profile from its template. \
Only field mapping and default filling are allowed; no physical inference or elaborate reasoning. \
Reply exactly as {\"intent\": {...}, \"defaults_used\": [...], \"open_questions\": [...]} and keep the JSON structure strict."
            .to_string()
    }
}

fn dimension_instruction(mode: Option<DimensionMode>) -> &'static str {
    match mode {
        Some(DimensionMode::TwoDExtruded) => {
            "Selected: 2D extruded. Set meshing.blockMesh.geometry.dimension_mode=\"2D_extruded\" and provide thickness_2d_m (m)."
        }
        Some(DimensionMode::ThreeD) => {
            "Selected: 3D channel. Set meshing.blockMesh.geometry.dimension_mode=\"3D\" and provide height_m (m)."
        }
        None => "Unless stated otherwise, keep the geometry dimension setting from the template.",
    }
}

/// Messages for the single-call fast fill.
pub fn fast_fill_messages(
    profile: &Profile,
    user_request: &str,
    template: &Value,
    mode: Option<DimensionMode>,
) -> Vec<ChatMessage> {
    let request = match user_request.trim() {
        "" => "(no additional description provided)",
        trimmed => trimmed,
    };
    let user = format!(
        "[User description]\n{request}\n\n[Geometry dimension]\n{dimension}\n\n[Template JSON]\n{template}\n\n[Instructions]\n\
- intent.profile must keep the template value;\n\
- use SI units for all numbers;\n\
- fill missing information with conservative defaults and list them in defaults_used;\n\
- fill open_questions only when user confirmation is really needed, otherwise return an empty array.\n\
Output only JSON that satisfies the required structure.",
        dimension = dimension_instruction(mode),
        template = pretty(template),
    );
    vec![ChatMessage::system(fast_fill_system(profile)), ChatMessage::user(user)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileRegistry;
    use serde_json::json;

    #[test]
    fn reviewer_schema_preview_is_truncated() {
        let schema = json!({"description": "s".repeat(5000)});
        let messages = reviewer_messages(&json!({"profile": "p"}), &schema);
        let user = &messages[1].content;
        let preview = user
            .split("[Schema reference (truncated preview)]\n")
            .nth(1)
            .unwrap();
        assert_eq!(preview.trim_end().chars().count(), SCHEMA_PREVIEW_CHARS);
        assert!(user.contains("\"profile\": \"p\""));
    }

    #[test]
    fn collector_prompt_embeds_request_template_and_checklist() {
        let messages = collector_messages("  200 W heater, water  ", &json!({"materials": {}}));
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("do not infer"));
        assert!(messages[1].content.contains("[User description]\n200 W heater, water\n"));
        assert!(messages[1].content.contains("\"materials\": {}"));
        assert!(messages[1].content.contains("materials.fluid.name"));
    }

    #[test]
    fn fast_fill_prompt_follows_profile_and_mode() {
        let registry = ProfileRegistry::new("/schemas");
        let openfoam = registry.by_slug("coolingplate-openfoam-bmesh-v1").unwrap();
        let messages = fast_fill_messages(openfoam, "", &json!({}), Some(DimensionMode::TwoDExtruded));
        assert!(messages[0]
            .content
            .contains("CoolingPlate-OF-Intent@blockMesh_v1.0"));
        assert!(messages[1].content.contains("(no additional description provided)"));
        assert!(messages[1].content.contains("thickness_2d_m"));

        let mesh = registry.by_slug("coolingplate-mesh-v1").unwrap();
        let messages = fast_fill_messages(mesh, "plate", &json!({}), None);
        assert!(!messages[0].content.contains("Reynolds"));
        assert!(messages[1].content.contains("keep the geometry dimension setting"));
    }
}
