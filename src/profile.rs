//! Profile registry
//!
//! A profile pairs one schema with one template. Two cooling-plate profiles
//! are built in; their files are resolved under the configured schema
//! directory and re-read on every request.

use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{IntentError, IntentResult};
use crate::schema::load_json;

pub const DEFAULT_PROFILE_SLUG: &str = "coolingplate-openfoam-bmesh-v1";

/// Static description of a built-in profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileSpec {
    pub slug: &'static str,
    pub label: &'static str,
    pub family: &'static str,
    pub profile: &'static str,
    pub schema_file: &'static str,
    pub template_file: &'static str,
}

pub const BUILTIN_PROFILES: [ProfileSpec; 2] = [
    ProfileSpec {
        slug: "coolingplate-mesh-v1",
        label: "Fluent + external mesh (.msh)",
        family: "fluent",
        profile: "CoolingPlate-Intent@mesh_v1.0",
        schema_file: "coolingplate_intent_mesh_v1.schema.json",
        template_file: "coolingplate_intent_mesh_v1.template.json",
    },
    ProfileSpec {
        slug: "coolingplate-openfoam-bmesh-v1",
        label: "OpenFOAM + automatic blockMesh",
        family: "openfoam",
        profile: "CoolingPlate-OF-Intent@blockMesh_v1.0",
        schema_file: "coolingplate_intent_openfoam_bmesh_v1.schema.json",
        template_file: "coolingplate_intent_openfoam_bmesh_v1.template.json",
    },
];

/// A registry entry with its files resolved against the schema directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub slug: String,
    pub label: String,
    pub family: String,
    #[serde(rename = "profile")]
    pub profile_identifier: String,
    pub schema_location: PathBuf,
    pub template_location: PathBuf,
}

impl Profile {
    fn resolve(spec: &ProfileSpec, schema_dir: &Path) -> Self {
        Self {
            slug: spec.slug.to_string(),
            label: spec.label.to_string(),
            family: spec.family.to_string(),
            profile_identifier: spec.profile.to_string(),
            schema_location: schema_dir.join(spec.schema_file),
            template_location: schema_dir.join(spec.template_file),
        }
    }

    pub fn load_schema(&self) -> IntentResult<Value> {
        load_json(&self.schema_location)
    }

    /// Load the template; a non-object template is treated as empty.
    pub fn load_template(&self) -> IntentResult<Value> {
        let template = load_json(&self.template_location)?;
        Ok(if template.is_object() {
            template
        } else {
            Value::Object(Default::default())
        })
    }

    pub fn is_openfoam(&self) -> bool {
        self.family == "openfoam"
    }
}

/// Listing entry for the profile picker.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileListing {
    pub slug: String,
    pub label: String,
    pub family: String,
    pub profile: String,
    pub default: bool,
}

#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<Profile>,
    default_slug: String,
}

impl ProfileRegistry {
    pub fn new(schema_dir: impl AsRef<Path>) -> Self {
        let schema_dir = schema_dir.as_ref();
        Self {
            profiles: BUILTIN_PROFILES
                .iter()
                .map(|spec| Profile::resolve(spec, schema_dir))
                .collect(),
            default_slug: DEFAULT_PROFILE_SLUG.to_string(),
        }
    }

    pub fn by_slug(&self, slug: &str) -> Option<&Profile> {
        self.profiles.iter().find(|profile| profile.slug == slug)
    }

    pub fn by_identifier(&self, identifier: &str) -> Option<&Profile> {
        self.profiles
            .iter()
            .find(|profile| profile.profile_identifier == identifier)
    }

    pub fn require_slug(&self, slug: &str) -> IntentResult<&Profile> {
        self.by_slug(slug)
            .ok_or_else(|| IntentError::UnknownProfile(slug.to_string()))
    }

    /// Resolve the profile for an intent: an explicit slug wins, otherwise
    /// `intent.profile` is looked up by identifier.
    pub fn resolve_for_intent(&self, slug: Option<&str>, intent: &Value) -> IntentResult<&Profile> {
        if let Some(profile) = slug.and_then(|slug| self.by_slug(slug)) {
            return Ok(profile);
        }
        match intent.get("profile").and_then(Value::as_str) {
            Some(name) => self
                .by_identifier(name)
                .ok_or_else(|| IntentError::UnknownProfile(name.to_string())),
            None => match slug {
                Some(slug) => Err(IntentError::UnknownProfile(slug.to_string())),
                None => Err(IntentError::MissingProfile),
            },
        }
    }

    pub fn listings(&self) -> Vec<ProfileListing> {
        self.profiles
            .iter()
            .map(|profile| ProfileListing {
                slug: profile.slug.clone(),
                label: profile.label.clone(),
                family: profile.family.clone(),
                profile: profile.profile_identifier.clone(),
                default: profile.slug == self.default_slug,
            })
            .collect()
    }
}
