//! Model module
//!
//! Models are addressed directly by `{rest_api_id}/{name}`, so lookup is
//! a single get that treats a 404 as absence. Updates patch `/schema`
//! and `/description` and return the update response as-is.

use super::{ReconcileOutcome, ResourceModule, TargetState};
use crate::gateway::{optional, Gateway};
use crate::patch::PatchOp;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, Clone, clap::Args)]
pub struct ModelParams {
    /// Identifier of the REST API owning the model
    #[arg(long)]
    pub rest_api_id: String,

    /// Model name; also the lookup key
    #[arg(long)]
    pub name: String,

    /// Content type of the model, e.g. `application/json`
    #[arg(long)]
    pub content_type: Option<String>,

    /// JSON schema body for the model
    #[arg(long)]
    pub schema: Option<String>,

    /// Model description; an empty value clears an existing description
    #[arg(long, default_value = "")]
    pub description: String,

    /// Desired lifecycle state
    #[arg(long, value_enum, default_value_t = TargetState::Present)]
    pub state: TargetState,
}

pub fn build_create_body(params: &ModelParams) -> Value {
    let mut body = json!({
        "name": params.name,
        "description": params.description,
    });
    if let Some(content_type) = &params.content_type {
        body["contentType"] = json!(content_type);
    }
    if let Some(schema) = &params.schema {
        body["schema"] = json!(schema);
    }
    body
}

pub fn build_patches(params: &ModelParams, observed: &Value) -> Vec<PatchOp> {
    let mut patches = Vec::new();

    if let Some(schema) = &params.schema {
        if observed.get("schema").and_then(Value::as_str) != Some(schema) {
            patches.push(PatchOp::replace("/schema", schema.clone()));
        }
    }
    match observed.get("description") {
        // Empty descriptions never appear on the observed model, so
        // patching "" onto an absent field would never converge.
        None if params.description.is_empty() => {}
        Some(current) if current.as_str() == Some(params.description.as_str()) => {}
        _ => patches.push(PatchOp::replace("/description", params.description.clone())),
    }

    patches
}

pub struct ModelModule<'a> {
    params: &'a ModelParams,
}

impl<'a> ModelModule<'a> {
    pub fn new(params: &'a ModelParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl ResourceModule for ModelModule<'_> {
    fn kind(&self) -> &'static str {
        "model"
    }

    fn target_state(&self) -> TargetState {
        self.params.state
    }

    async fn lookup(&self, gw: &dyn Gateway) -> Result<Option<Value>> {
        optional(gw.get_model(&self.params.rest_api_id, &self.params.name).await)
            .context("get_model failed")
    }

    async fn create(&self, gw: &dyn Gateway, check_mode: bool) -> Result<ReconcileOutcome> {
        if check_mode {
            return Ok(ReconcileOutcome::changed(None));
        }
        let created = gw
            .create_model(&self.params.rest_api_id, build_create_body(self.params))
            .await
            .context("create_model failed")?;
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
            return Ok(ReconcileOutcome::unchanged(None));
        }
        if check_mode {
            return Ok(ReconcileOutcome::changed(None));
        }

        let updated = gw
            .update_model(&self.params.rest_api_id, &self.params.name, &patches)
            .await
            .context("update_model failed")?;
        Ok(ReconcileOutcome::changed(Some(updated)))
    }

    async fn delete(&self, gw: &dyn Gateway, _observed: &Value) -> Result<()> {
        gw.delete_model(&self.params.rest_api_id, &self.params.name)
            .await
            .context("delete_model failed")?;
        Ok(())
    }
}
