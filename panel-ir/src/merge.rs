//! Merge/override resolution of task parameters
//!
//! Combines partial parameter sources into one set. Precedence, highest
//! first:
//! 1. Explicit override for this call
//! 2. Accumulated session parameters
//! 3. Template defaults (label -> value)
//! 4. Hardcoded fallback defaults
//!
//! Top-level keys are replaced whole. The `panel_specs` and `circuits`
//! sub-maps are merged key by key. The session `task_id` can never be
//! overwritten: incoming `task_id` keys are dropped with a [`MergeWarning`]
//! and the session's own id is put back after merging.

use crate::schema::HeaderField;
use crate::value::Scalar;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Immutable task identifier key
pub const TASK_ID_KEY: &str = "task_id";
/// Header parameter sub-map key
pub const PANEL_SPECS_KEY: &str = "panel_specs";
/// Per-circuit sub-map key (circuit number -> circuit fields)
pub const CIRCUITS_KEY: &str = "circuits";
/// Top-level panel name key
pub const PANEL_NAME_KEY: &str = "panel_name";

const NESTED_KEYS: [&str; 2] = [PANEL_SPECS_KEY, CIRCUITS_KEY];

/// Template defaults keyed by printed header label
pub type TemplateDefaults = BTreeMap<String, Scalar>;

// ============================================================================
// Task parameters
// ============================================================================

/// In-progress parameter bag for one session
///
/// JSON-object shaped so the session store collaborator can persist it as
/// is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskParameters(Map<String, Value>);

impl TaskParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh parameter set with a newly generated `task_id`
    pub fn new_task() -> Self {
        let mut params = Self::new();
        params
            .0
            .insert(TASK_ID_KEY.to_string(), Value::String(Uuid::new_v4().to_string()));
        params
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Parameter set from a JSON value; `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        self.0.get(TASK_ID_KEY).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn panel_specs(&self) -> Option<&Map<String, Value>> {
        self.0.get(PANEL_SPECS_KEY).and_then(Value::as_object)
    }

    /// Header parameter by `panel_specs` key
    pub fn panel_spec(&self, key: &str) -> Scalar {
        self.panel_specs()
            .and_then(|specs| specs.get(key))
            .map(Scalar::from)
            .unwrap_or_default()
    }

    pub fn circuits(&self) -> Option<&Map<String, Value>> {
        self.0.get(CIRCUITS_KEY).and_then(Value::as_object)
    }

    pub fn panel_name(&self) -> Option<&str> {
        self.0
            .get(PANEL_NAME_KEY)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Set one `panel_specs` entry
    pub fn set_panel_spec(&mut self, key: &str, value: impl Into<Value>) {
        let mut specs = take_sub_map(&mut self.0, PANEL_SPECS_KEY);
        specs.insert(key.to_string(), value.into());
        self.0.insert(PANEL_SPECS_KEY.to_string(), Value::Object(specs));
    }

    /// Set one `circuits` entry
    pub fn set_circuit(&mut self, number: u32, fields: Map<String, Value>) {
        let mut circuits = take_sub_map(&mut self.0, CIRCUITS_KEY);
        circuits.insert(number.to_string(), Value::Object(fields));
        self.0.insert(CIRCUITS_KEY.to_string(), Value::Object(circuits));
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Remove and return the sub-map under `key` (empty if absent or not an object)
fn take_sub_map(map: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match map.remove(key) {
        Some(Value::Object(inner)) => inner,
        _ => Map::new(),
    }
}

// ============================================================================
// Merge outcome
// ============================================================================

/// Where a rejected key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeSource {
    Override,
    Update,
}

/// Key dropped during a merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeWarning {
    pub source: MergeSource,
    pub key: String,
    pub rejected_value: Value,
}

/// Merged parameters plus anything that was dropped on the way
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub params: TaskParameters,
    pub warnings: Vec<MergeWarning>,
}

/// Sources for a full resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeLayers<'a> {
    pub overrides: Option<&'a TaskParameters>,
    pub session: Option<&'a TaskParameters>,
    pub template: Option<&'a TemplateDefaults>,
}

// ============================================================================
// Resolver
// ============================================================================

/// Stateless precedence resolver
pub struct MergeResolver;

impl MergeResolver {
    /// Resolve all four layers into one parameter set
    ///
    /// **Algorithm:**
    /// 1. Seed `panel_specs` with every header field's fallback default
    /// 2. Overlay template values whose label names a header field
    /// 3. Overlay session parameters
    /// 4. Overlay the override, minus any `task_id`
    /// 5. Restore the session `task_id`, if the session has one
    pub fn resolve(layers: MergeLayers<'_>) -> MergeOutcome {
        let mut specs = Map::new();
        for field in HeaderField::all() {
            specs.insert(
                field.param_key().to_string(),
                Value::String(field.fallback_default().to_string()),
            );
        }

        if let Some(template) = layers.template {
            for (label, value) in template {
                match HeaderField::from_label(label) {
                    Some(field) if !value.is_blank() => {
                        specs.insert(field.param_key().to_string(), value.clone().into());
                    }
                    Some(_) => {}
                    None => debug!(label = %label, "Template label is not a header field"),
                }
            }
        }

        let mut merged = Map::new();
        merged.insert(PANEL_SPECS_KEY.to_string(), Value::Object(specs));

        let mut warnings = Vec::new();
        let task_id = layers.session.and_then(|s| s.get(TASK_ID_KEY)).cloned();

        if let Some(session) = layers.session {
            let mut own = session.0.clone();
            own.remove(TASK_ID_KEY);
            merge_into(&mut merged, own);
        }
        if let Some(overrides) = layers.overrides {
            let incoming = strip_task_id(overrides.0.clone(), MergeSource::Override, &mut warnings);
            merge_into(&mut merged, incoming);
        }

        if let Some(task_id) = task_id {
            merged.insert(TASK_ID_KEY.to_string(), task_id);
        }

        MergeOutcome {
            params: TaskParameters(merged),
            warnings,
        }
    }

    /// Apply an incremental update to accumulated session parameters
    ///
    /// # Arguments
    /// * `session` - Current session parameters
    /// * `update` - Newly recognised values; these win over the session
    ///
    /// # Returns
    /// Merged parameters with the session `task_id` unchanged
    pub fn apply_update(session: &TaskParameters, update: TaskParameters) -> MergeOutcome {
        let mut warnings = Vec::new();
        let incoming = strip_task_id(update.0, MergeSource::Update, &mut warnings);

        let mut merged = session.0.clone();
        let task_id = merged.remove(TASK_ID_KEY);
        merge_into(&mut merged, incoming);
        if let Some(task_id) = task_id {
            merged.insert(TASK_ID_KEY.to_string(), task_id);
        }

        MergeOutcome {
            params: TaskParameters(merged),
            warnings,
        }
    }
}

fn strip_task_id(
    mut incoming: Map<String, Value>,
    source: MergeSource,
    warnings: &mut Vec<MergeWarning>,
) -> Map<String, Value> {
    if let Some(rejected) = incoming.remove(TASK_ID_KEY) {
        warn!(source = ?source, rejected = %rejected, "Rejected attempt to overwrite task_id");
        warnings.push(MergeWarning {
            source,
            key: TASK_ID_KEY.to_string(),
            rejected_value: rejected,
        });
    }
    incoming
}

fn merge_into(target: &mut Map<String, Value>, layer: Map<String, Value>) {
    for (key, value) in layer {
        match value {
            Value::Object(entries) if NESTED_KEYS.contains(&key.as_str()) => {
                let mut nested = take_sub_map(target, &key);
                nested.extend(entries);
                target.insert(key, Value::Object(nested));
            }
            other => {
                target.insert(key, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> TaskParameters {
        TaskParameters::from_value(value).unwrap()
    }

    #[test]
    fn test_new_task_has_uuid() {
        let p = TaskParameters::new_task();
        let id = p.task_id().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_ne!(TaskParameters::new_task().task_id(), Some(id));
    }

    #[test]
    fn test_update_cannot_overwrite_task_id() {
        let session = params(json!({"task_id": "X", "panel_name": "LP-1"}));
        let outcome = MergeResolver::apply_update(&session, params(json!({"task_id": "Y", "panel_name": "LP-2"})));
        assert_eq!(outcome.params.task_id(), Some("X"));
        assert_eq!(outcome.params.panel_name(), Some("LP-2"));
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].rejected_value, json!("Y"));
        assert_eq!(outcome.warnings[0].source, MergeSource::Update);
    }

    #[test]
    fn test_update_without_session_id_does_not_invent_one() {
        let outcome = MergeResolver::apply_update(&TaskParameters::new(), params(json!({"task_id": "Y"})));
        assert_eq!(outcome.params.task_id(), None);
    }

    #[test]
    fn test_nested_maps_merge_key_by_key() {
        let session = params(json!({
            "panel_specs": {"voltage": "208Y/120V", "phase": "3"},
            "circuits": {"1": {"description": "LIGHTS"}},
            "notes": {"a": 1}
        }));
        let update = params(json!({
            "panel_specs": {"phase": "1"},
            "circuits": {"3": {"description": "RECEPT"}},
            "notes": {"b": 2}
        }));
        let merged = MergeResolver::apply_update(&session, update).params;
        assert_eq!(merged.panel_spec("voltage"), Scalar::text("208Y/120V"));
        assert_eq!(merged.panel_spec("phase"), Scalar::text("1"));
        assert_eq!(merged.circuits().unwrap().len(), 2);
        assert_eq!(merged.get("notes"), Some(&json!({"b": 2})));
    }

    #[test]
    fn test_resolve_precedence() {
        let template: TemplateDefaults = [
            ("VOLTAGE".to_string(), Scalar::text("208Y/120V")),
            ("MOUNTING".to_string(), Scalar::text("FLUSH")),
            ("WIRE".to_string(), Scalar::text("4W")),
            ("PANEL COLOR".to_string(), Scalar::text("GREY")),
        ]
        .into_iter()
        .collect();
        let session = params(json!({"task_id": "X", "panel_specs": {"mounting": "SURFACE", "wire": "3W"}}));
        let overrides = params(json!({"task_id": "Z", "panel_specs": {"wire": "4W+G"}}));

        let outcome = MergeResolver::resolve(MergeLayers {
            overrides: Some(&overrides),
            session: Some(&session),
            template: Some(&template),
        });
        let p = outcome.params;

        assert_eq!(p.panel_spec("voltage"), Scalar::text("208Y/120V"));
        assert_eq!(p.panel_spec("mounting"), Scalar::text("SURFACE"));
        assert_eq!(p.panel_spec("wire"), Scalar::text("4W+G"));
        assert_eq!(p.panel_spec("ground_conductor"), Scalar::text("#6 CU"));
        assert_eq!(p.task_id(), Some("X"));
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(p.panel_specs().unwrap().len(), 15);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let session = params(json!({"task_id": "X", "panel_specs": {"phase": "1"}}));
        let layers = MergeLayers {
            session: Some(&session),
            ..Default::default()
        };
        let first = MergeResolver::resolve(layers).params;
        let again = MergeResolver::resolve(MergeLayers {
            session: Some(&first),
            ..Default::default()
        })
        .params;
        assert_eq!(first, again);
    }
}
