//! API key module
//!
//! Keys are looked up by name through the server-side `nameQuery` filter
//! with a client-side exact re-check. Updates patch `enabled` and
//! `description` only; renaming is unsupported because the name is the
//! lookup key.

use super::{find_exact, observed_str, ReconcileOutcome, ResourceModule, TargetState};
use crate::gateway::Gateway;
use crate::patch::{bool_str, stringify, PatchOp};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, Clone, clap::Args)]
pub struct ApiKeyParams {
    /// Name of the API key; also the lookup key
    #[arg(long)]
    pub name: String,

    /// Literal key value, used on create
    #[arg(long)]
    pub value: Option<String>,

    /// Key description
    #[arg(long)]
    pub description: Option<String>,

    /// Whether callers may use the key
    #[arg(long, default_value_t = false)]
    pub enabled: bool,

    /// Generate a key identifier distinct from the key value
    #[arg(long, default_value_t = false)]
    pub generate_distinct_id: bool,

    /// Desired lifecycle state
    #[arg(long, value_enum, default_value_t = TargetState::Present)]
    pub state: TargetState,
}

/// Create-call body: required fields plus only the non-empty optionals.
pub fn build_create_body(params: &ApiKeyParams) -> Value {
    let mut body = json!({
        "name": params.name,
        "enabled": params.enabled,
        "generateDistinctId": params.generate_distinct_id,
    });

    for (field, value) in [("description", &params.description), ("value", &params.value)] {
        if let Some(v) = value {
            if !v.is_empty() {
                body[field] = json!(v);
            }
        }
    }

    body
}

/// Patch list for the update path.
pub fn build_patches(params: &ApiKeyParams, observed: &Value) -> Vec<PatchOp> {
    let mut patches = Vec::new();

    let enabled = bool_str(params.enabled);
    match observed.get("enabled") {
        Some(current) if stringify(current) == enabled => {}
        _ => patches.push(PatchOp::replace("/enabled", enabled)),
    }

    if let Some(description) = &params.description {
        match observed.get("description") {
            // The provider drops empty descriptions from its
            // representation; patching "" onto an absent field would
            // diff forever.
            None if description.is_empty() => {}
            Some(current) if stringify(current) == *description => {}
            _ => patches.push(PatchOp::replace("/description", description.clone())),
        }
    }

    patches
}

pub struct ApiKeyModule<'a> {
    params: &'a ApiKeyParams,
}

impl<'a> ApiKeyModule<'a> {
    pub fn new(params: &'a ApiKeyParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl ResourceModule for ApiKeyModule<'_> {
    fn kind(&self) -> &'static str {
        "api_key"
    }

    fn target_state(&self) -> TargetState {
        self.params.state
    }

    async fn lookup(&self, gw: &dyn Gateway) -> Result<Option<Value>> {
        let listing = gw
            .get_api_keys(&self.params.name, true)
            .await
            .context("get_api_keys failed")?;
        Ok(find_exact(&listing, "name", &self.params.name))
    }

    async fn create(&self, gw: &dyn Gateway, check_mode: bool) -> Result<ReconcileOutcome> {
        if check_mode {
            return Ok(ReconcileOutcome::changed(None));
        }
        let created = gw
            .create_api_key(build_create_body(self.params))
            .await
            .context("create_api_key failed")?;
        Ok(ReconcileOutcome::changed(Some(created)))
    }

    async fn update(
        &self,
        gw: &dyn Gateway,
        observed: Value,
        check_mode: bool,
    ) -> Result<ReconcileOutcome> {
        let patches = build_patches(self.params, &observed);
        if patches.is_empty() {
            return Ok(ReconcileOutcome::unchanged(Some(observed)));
        }
        if check_mode {
            return Ok(ReconcileOutcome::changed(Some(observed)));
        }

        let id = observed_str(&observed, "id")?;
        gw.update_api_key(id, &patches)
            .await
            .context("update_api_key failed")?;

        // Re-fetch for authoritative post-update values.
        let refreshed = self.lookup(gw).await?;
        Ok(ReconcileOutcome::changed(refreshed))
    }

    async fn delete(&self, gw: &dyn Gateway, observed: &Value) -> Result<()> {
        let id = observed_str(observed, "id")?;
        gw.delete_api_key(id).await.context("delete_api_key failed")?;
        Ok(())
    }
}
