use serde_json::{Map, Value};

/// Deep-merge `overrides` onto a copy of `template`.
///
/// Nested objects present on both sides are merged key by key; anything
/// else in `overrides` (arrays, scalars, objects replacing scalars) replaces
/// the template value wholesale. A non-object `overrides` yields an
/// unchanged copy, so `merge_with_template(t, &json!({})) == *t`.
pub fn merge_with_template(template: &Value, overrides: &Value) -> Value {
    let mut base = template.clone();
    if let (Value::Object(dst), Value::Object(src)) = (&mut base, overrides) {
        merge_into(dst, src);
    }
    base
}

fn merge_into(dst: &mut Map<String, Value>, src: &Map<String, Value>) {
    for (key, value) in src {
        match (dst.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge_into(existing, incoming),
            _ => {
                dst.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Overwrite `intent.profile`; the identifier is never trusted from input.
pub fn force_profile(intent: &mut Value, profile_identifier: &str) {
    if let Value::Object(map) = intent {
        map.insert(
            "profile".to_string(),
            Value::String(profile_identifier.to_string()),
        );
    }
}

/// Shallow-merge request `job_meta` into `intent.job_meta`.
pub fn merge_job_meta(intent: &mut Value, job_meta: &Map<String, Value>) {
    let Value::Object(map) = intent else {
        return;
    };
    let slot = map
        .entry("job_meta")
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(existing) = slot {
        for (key, value) in job_meta {
            existing.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn template() -> Value {
        json!({
            "profile": "CoolingPlate-OF-Intent@blockMesh_v1.0",
            "meshing": {"mode": "blockMesh", "blockMesh": {"geometry": {"length_m": 0.2, "width_m": 0.1}, "cells": {"nx": 80, "nz": 4}}},
            "deliverables": {"reports": ["pressure_drop", "max_temperature"]}
        })
    }

    #[test]
    fn empty_override_is_identity() {
        assert_eq!(merge_with_template(&template(), &json!({})), template());
    }

    #[test]
    fn non_object_override_is_ignored() {
        assert_eq!(merge_with_template(&template(), &json!(["x"])), template());
        assert_eq!(merge_with_template(&template(), &Value::Null), template());
    }

    #[test]
    fn nested_objects_merge_and_arrays_replace() {
        let merged = merge_with_template(
            &template(),
            &json!({
                "meshing": {"blockMesh": {"geometry": {"length_m": 0.3}}},
                "deliverables": {"reports": ["pressure_drop"]},
                "materials": {"fluid": {"name": "water"}}
            }),
        );
        assert_eq!(merged["meshing"]["blockMesh"]["geometry"], json!({"length_m": 0.3, "width_m": 0.1}));
        assert_eq!(merged["meshing"]["blockMesh"]["cells"]["nz"], 4);
        assert_eq!(merged["deliverables"]["reports"], json!(["pressure_drop"]));
        assert_eq!(merged["materials"]["fluid"]["name"], "water");
    }

    #[test]
    fn scalar_replaces_object_wholesale() {
        let merged = merge_with_template(&template(), &json!({"meshing": "external"}));
        assert_eq!(merged["meshing"], "external");
    }

    #[test]
    fn job_meta_replaces_non_object_slot() {
        let mut intent = json!({"job_meta": "legacy"});
        let meta = json!({"job_id": "plate-7", "owner": "lab"});
        merge_job_meta(&mut intent, meta.as_object().unwrap());
        assert_eq!(intent["job_meta"], meta);

        let extra = json!({"owner": "ops"});
        merge_job_meta(&mut intent, extra.as_object().unwrap());
        assert_eq!(intent["job_meta"], json!({"job_id": "plate-7", "owner": "ops"}));
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-z]{0,6}".prop_map(Value::String),
        ]
    }

    fn document() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
                prop::collection::btree_map("[a-d]", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn object_document() -> impl Strategy<Value = Value> {
        prop::collection::btree_map("[a-d]", document(), 0..4)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    }

    fn template_only_keys_survive(template: &Value, overrides: &Value, merged: &Value) {
        let (Value::Object(t), Value::Object(m)) = (template, merged) else {
            return;
        };
        let o = overrides.as_object();
        for (key, value) in t {
            let merged_value = m.get(key).expect("template key dropped");
            match o.and_then(|o| o.get(key)) {
                None => assert_eq!(merged_value, value),
                Some(sub) if value.is_object() && sub.is_object() => {
                    template_only_keys_survive(value, sub, merged_value)
                }
                Some(_) => {}
            }
        }
    }

    proptest! {
        #[test]
        fn merge_identity_law(t in object_document()) {
            prop_assert_eq!(merge_with_template(&t, &json!({})), t);
        }

        #[test]
        fn merge_keeps_template_only_keys(t in object_document(), o in object_document()) {
            let merged = merge_with_template(&t, &o);
            template_only_keys_survive(&t, &o, &merged);
        }
    }
}
