//! Shared fixtures for the integration tests: a scripted generation client
//! and a schema directory holding both built-in profiles.

#![allow(dead_code)]

use async_trait::async_trait;
use cfd_intent::llm::{ChatClient, ChatRequest, Stage};
use cfd_intent::{LlmError, Settings};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

pub const OPENFOAM_SLUG: &str = "coolingplate-openfoam-bmesh-v1";
pub const OPENFOAM_PROFILE: &str = "CoolingPlate-OF-Intent@blockMesh_v1.0";
pub const FLUENT_SLUG: &str = "coolingplate-mesh-v1";
pub const FLUENT_PROFILE: &str = "CoolingPlate-Intent@mesh_v1.0";

/// What the stub answers for one call.
pub enum Reply {
    Json(Value),
    Fail(LlmError),
    Hang,
}

/// Generation client that replays scripted replies per stage and records
/// every request it receives.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<Vec<(Stage, VecDeque<Reply>)>>,
    seen: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, stage: Stage, reply: Reply) -> Self {
        {
            let mut replies = self.replies.lock().unwrap();
            match replies.iter_mut().find(|(s, _)| *s == stage) {
                Some((_, queue)) => queue.push_back(reply),
                None => replies.push((stage, VecDeque::from([reply]))),
            }
        }
        self
    }

    pub fn calls(&self, stage: Stage) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.stage == stage)
            .count()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn complete_json(&self, request: ChatRequest) -> Result<Value, LlmError> {
        let stage = request.stage;
        self.seen.lock().unwrap().push(request);

        let next = {
            let mut replies = self.replies.lock().unwrap();
            replies
                .iter_mut()
                .find(|(s, _)| *s == stage)
                .and_then(|(_, queue)| queue.pop_front())
        };

        match next {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(LlmError::malformed("hung call finished"))
            }
            None => panic!("no scripted reply left for {}", stage.as_str()),
        }
    }
}

pub fn openfoam_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["profile", "geometry", "operating_conditions", "meshing"],
        "properties": {
            "profile": {"const": OPENFOAM_PROFILE},
            "geometry": {
                "type": "object",
                "required": ["channel_width_m"],
                "properties": {
                    "channel_width_m": {"type": "number", "exclusiveMinimum": 0}
                }
            },
            "operating_conditions": {
                "type": "object",
                "properties": {
                    "time_mode": {"enum": ["steady", "transient"]},
                    "inlets": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {"velocity_m_s": {"type": "number", "minimum": 0}}
                        }
                    }
                }
            },
            "meshing": {"type": "object"},
            "job_meta": {"type": "object"}
        }
    })
}

pub fn openfoam_template() -> Value {
    json!({
        "profile": OPENFOAM_PROFILE,
        "geometry": {"channel_width_m": 0.004},
        "operating_conditions": {
            "time_mode": "steady",
            "inlets": [{"velocity_m_s": 0.5}]
        },
        "meshing": {
            "mode": "blockMesh",
            "blockMesh": {
                "geometry": {"dimension_mode": "3D", "length_m": 0.2, "width_m": 0.1, "height_m": 0.005},
                "cells": {"nx": 80, "ny": 40, "nz": 6}
            }
        }
    })
}

pub fn fluent_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["profile", "mesh"],
        "properties": {
            "profile": {"const": FLUENT_PROFILE},
            "mesh": {
                "type": "object",
                "required": ["path"],
                "properties": {"path": {"type": "string", "minLength": 1}}
            }
        }
    })
}

pub fn fluent_template() -> Value {
    json!({
        "profile": FLUENT_PROFILE,
        "mesh": {"path": "plate.msh", "units": "mm"}
    })
}

/// A valid OpenFOAM intent with one overridden inlet velocity.
pub fn openfoam_intent(velocity: Value) -> Value {
    let mut intent = openfoam_template();
    intent["operating_conditions"]["inlets"][0]["velocity_m_s"] = velocity;
    intent
}

/// Schema and storage directories plus settings pointing at them.
pub struct Workspace {
    pub dir: TempDir,
    pub settings: Settings,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let schemas = dir.path().join("schemas");
        fs::create_dir_all(&schemas).unwrap();
        write(&schemas, "coolingplate_intent_openfoam_bmesh_v1.schema.json", &openfoam_schema());
        write(&schemas, "coolingplate_intent_openfoam_bmesh_v1.template.json", &openfoam_template());
        write(&schemas, "coolingplate_intent_mesh_v1.schema.json", &fluent_schema());
        write(&schemas, "coolingplate_intent_mesh_v1.template.json", &fluent_template());

        let settings = Settings {
            llm_base_url: "http://llm.invalid/v1".into(),
            llm_model: "chat".into(),
            llm_api_key: "test-key".into(),
            llm_timeout: 0.2,
            cfd_schema_dir: schemas,
            cfd_storage_dir: dir.path().join("storage"),
            ..Settings::default()
        };
        Self { dir, settings }
    }

    pub fn storage(&self) -> &Path {
        &self.settings.cfd_storage_dir
    }
}

fn write(dir: &Path, name: &str, document: &Value) {
    fs::write(dir.join(name), serde_json::to_string_pretty(document).unwrap()).unwrap();
}
