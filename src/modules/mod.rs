//! Resource modules
//!
//! One module per API Gateway resource type. Every module follows the
//! same reconciliation shape: look the object up by its natural key,
//! branch on desired state vs observed presence, and issue the minimal
//! create / patch / delete call. [`reconcile`] is that state machine;
//! the per-resource logic lives in each module's [`ResourceModule`]
//! implementation.

use crate::gateway::Gateway;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

pub mod api_key;
pub mod authorizer;
pub mod base_path_mapping;
pub mod domain_name;
pub mod model;
pub mod resource;
pub mod stage;
pub mod usage_plan;
pub mod usage_plan_key;

/// Desired lifecycle state of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TargetState {
    Present,
    Absent,
}

/// Result of one reconciliation: whether anything changed and the
/// resulting provider object (null when deleted, absent, or suppressed
/// by check mode).
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub changed: bool,
    pub object: Option<Value>,
}

impl ReconcileOutcome {
    pub fn changed(object: Option<Value>) -> Self {
        Self {
            changed: true,
            object,
        }
    }

    pub fn unchanged(object: Option<Value>) -> Self {
        Self {
            changed: false,
            object,
        }
    }

    /// Encode as the module output envelope `{changed, <kind>}`.
    pub fn into_json(self, kind: &str) -> Value {
        json!({
            "changed": self.changed,
            kind: self.object.unwrap_or(Value::Null),
        })
    }
}

/// Per-resource reconciliation behavior.
///
/// `create` and `update` receive the check-mode flag because their
/// outcomes differ per resource type (some re-fetch after updating, some
/// return the update response, the stage module refuses creation
/// outright); `delete` is uniform and gated by the driver.
#[async_trait]
pub trait ResourceModule: Sync {
    /// Output field name, e.g. `api_key`.
    fn kind(&self) -> &'static str;

    fn target_state(&self) -> TargetState;

    /// Fetch the observed object by natural key, or `None` if absent.
    async fn lookup(&self, gw: &dyn Gateway) -> Result<Option<Value>>;

    async fn create(&self, gw: &dyn Gateway, check_mode: bool) -> Result<ReconcileOutcome>;

    async fn update(
        &self,
        gw: &dyn Gateway,
        observed: Value,
        check_mode: bool,
    ) -> Result<ReconcileOutcome>;

    async fn delete(&self, gw: &dyn Gateway, observed: &Value) -> Result<()>;
}

/// Drive one reconciliation to its single terminal outcome.
pub async fn reconcile(
    module: &dyn ResourceModule,
    gw: &dyn Gateway,
    check_mode: bool,
) -> Result<ReconcileOutcome> {
    let observed = module.lookup(gw).await?;

    match (module.target_state(), observed) {
        (TargetState::Absent, Some(found)) => {
            if !check_mode {
                module.delete(gw, &found).await?;
            }
            Ok(ReconcileOutcome::changed(None))
        }
        (TargetState::Absent, None) => Ok(ReconcileOutcome::unchanged(None)),
        (TargetState::Present, None) => module.create(gw, check_mode).await,
        (TargetState::Present, Some(found)) => module.update(gw, found, check_mode).await,
    }
}

/// Select the single item from a listing whose field matches exactly.
/// Server-side filters can match on prefixes, so the client re-checks.
pub(crate) fn find_exact(listing: &Value, field: &str, wanted: &str) -> Option<Value> {
    listing
        .get("items")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|item| item.get(field).and_then(Value::as_str) == Some(wanted))
        .cloned()
}

/// Extract a required string identifier from an observed object.
pub(crate) fn observed_str<'a>(observed: &'a Value, field: &str) -> Result<&'a str> {
    observed
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("observed object is missing field '{field}'"))
}
