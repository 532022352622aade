//! Usage plan key module
//!
//! Associates an API key with a usage plan. The association has no
//! mutable attributes, so reconciliation is pure create/delete: present
//! and found is always a no-op.

use super::{find_exact, ReconcileOutcome, ResourceModule, TargetState};
use crate::gateway::Gateway;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

/// The only association type the provider currently supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum KeyType {
    #[value(name = "API_KEY")]
    ApiKey,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKey => "API_KEY",
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct UsagePlanKeyParams {
    /// Identifier of the usage plan
    #[arg(long)]
    pub usage_plan_id: String,

    /// Identifier of the API key to associate
    #[arg(long)]
    pub api_key_id: String,

    /// Association type
    #[arg(long, value_enum, default_value_t = KeyType::ApiKey)]
    pub key_type: KeyType,

    /// Desired lifecycle state
    #[arg(long, value_enum, default_value_t = TargetState::Present)]
    pub state: TargetState,
}

pub struct UsagePlanKeyModule<'a> {
    params: &'a UsagePlanKeyParams,
}

impl<'a> UsagePlanKeyModule<'a> {
    pub fn new(params: &'a UsagePlanKeyParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl ResourceModule for UsagePlanKeyModule<'_> {
    fn kind(&self) -> &'static str {
        "usage_plan_key"
    }

    fn target_state(&self) -> TargetState {
        self.params.state
    }

    async fn lookup(&self, gw: &dyn Gateway) -> Result<Option<Value>> {
        let listing = gw
            .get_usage_plan_keys(&self.params.usage_plan_id)
            .await
            .context("get_usage_plan_keys failed")?;
        Ok(find_exact(&listing, "id", &self.params.api_key_id))
    }

    async fn create(&self, gw: &dyn Gateway, check_mode: bool) -> Result<ReconcileOutcome> {
        if check_mode {
            return Ok(ReconcileOutcome::changed(None));
        }
        let created = gw
            .create_usage_plan_key(
                &self.params.usage_plan_id,
                &self.params.api_key_id,
                self.params.key_type.as_str(),
            )
            .await
            .context("create_usage_plan_key failed")?;
        Ok(ReconcileOutcome::changed(Some(created)))
    }

    async fn update(
        &self,
        _gw: &dyn Gateway,
        observed: Value,
        _check_mode: bool,
    ) -> Result<ReconcileOutcome> {
        // Nothing on the association can change.
        Ok(ReconcileOutcome::unchanged(Some(observed)))
    }

    async fn delete(&self, gw: &dyn Gateway, _observed: &Value) -> Result<()> {
        gw.delete_usage_plan_key(&self.params.usage_plan_id, &self.params.api_key_id)
            .await
            .context("delete_usage_plan_key failed")?;
        Ok(())
    }
}
