//! State accumulated across the stages of a provisioning run.

use crate::id::{booking_reference, UniqueId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Flat key/value outputs published by one stage.
pub type StageOutputs = BTreeMap<String, Value>;

/// Outputs of a multi-stage provisioning run.
///
/// A stage (e.g. "create server") publishes outputs such as a public address
/// that later stages look up by key. The state is an immutable value: every
/// `store_*`/`with_*` call returns a new state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningState {
    provisioning_id: UniqueId,
    tag: String,
    stages: BTreeMap<String, StageOutputs>,
    platforms: BTreeMap<String, Value>,
}

impl ProvisioningState {
    /// Create an empty state with a fresh id and tag.
    pub fn new() -> Self {
        Self {
            provisioning_id: UniqueId::new(),
            tag: booking_reference(6),
            stages: BTreeMap::new(),
            platforms: BTreeMap::new(),
        }
    }

    /// The unique id of this provisioning run.
    pub fn provisioning_id(&self) -> &UniqueId {
        &self.provisioning_id
    }

    /// Short tag used to namespace resources created by the same run.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Copy with a different tag.
    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..self.clone()
        }
    }

    /// Names of the stored stages, sorted.
    pub fn stages(&self) -> Vec<&str> {
        self.stages.keys().map(String::as_str).collect()
    }

    /// Outputs of a stage (empty if the stage never stored any).
    pub fn outputs(&self, stage: &str) -> StageOutputs {
        self.stages.get(stage).cloned().unwrap_or_default()
    }

    /// Single output value of a stage.
    pub fn output(&self, stage: &str, key: &str) -> Option<&Value> {
        self.stages.get(stage)?.get(key)
    }

    /// Copy with the outputs of `stage` replaced.
    pub fn store_output(&self, stage: impl Into<String>, outputs: StageOutputs) -> Self {
        let mut next = self.clone();
        next.stages.insert(stage.into(), outputs);
        next
    }

    /// Platform information (connections, regions) stored under `name`.
    pub fn platform_context(&self, name: &str) -> Option<&Value> {
        self.platforms.get(name)
    }

    /// Copy with the platform context `name` replaced.
    pub fn store_platform_context(&self, name: impl Into<String>, context: Value) -> Self {
        let mut next = self.clone();
        next.platforms.insert(name.into(), context);
        next
    }
}

impl Default for ProvisioningState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "provisioningId = {}", self.provisioning_id)?;
        writeln!(f, "tag = {}", self.tag)?;
        writeln!(f, "stages:")?;
        for (stage, outputs) in &self.stages {
            writeln!(f, "  {stage}")?;
            for (key, value) in outputs {
                writeln!(f, "    {key} = {value}")?;
            }
        }
        writeln!(f, "platforms:")?;
        for (name, context) in &self.platforms {
            writeln!(f, "  {name}: {context}")?;
        }
        Ok(())
    }
}
