//! Provider seam
//!
//! One trait method per API Gateway operation the modules use. The
//! production implementation is the signed HTTP client in [`crate::aws`];
//! unit tests script responses through a mock. Responses stay as raw
//! `serde_json::Value` so module output mirrors the provider exactly.

use crate::patch::PatchOp;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by the provider client.
///
/// `NotFound` is expected and drives state-machine branching; everything
/// else is fatal for the invocation.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("API Gateway returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse response JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request signing failed: {0}")]
    Signing(String),

    #[error("invalid request: {0}")]
    Request(String),
}

/// Map a not-found response to the absent sentinel, keeping every other
/// error fatal.
pub fn optional(result: Result<Value, GatewayError>) -> Result<Option<Value>, GatewayError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(GatewayError::NotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

/// API Gateway operations used by the resource modules.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn get_api_keys(
        &self,
        name_query: &str,
        include_values: bool,
    ) -> Result<Value, GatewayError>;
    async fn create_api_key(&self, body: Value) -> Result<Value, GatewayError>;
    async fn update_api_key(
        &self,
        api_key_id: &str,
        patches: &[PatchOp],
    ) -> Result<Value, GatewayError>;
    async fn delete_api_key(&self, api_key_id: &str) -> Result<Value, GatewayError>;

    async fn get_model(&self, rest_api_id: &str, name: &str) -> Result<Value, GatewayError>;
    async fn create_model(&self, rest_api_id: &str, body: Value) -> Result<Value, GatewayError>;
    async fn update_model(
        &self,
        rest_api_id: &str,
        name: &str,
        patches: &[PatchOp],
    ) -> Result<Value, GatewayError>;
    async fn delete_model(&self, rest_api_id: &str, name: &str) -> Result<Value, GatewayError>;

    async fn get_authorizers(&self, rest_api_id: &str) -> Result<Value, GatewayError>;
    async fn create_authorizer(
        &self,
        rest_api_id: &str,
        body: Value,
    ) -> Result<Value, GatewayError>;
    async fn update_authorizer(
        &self,
        rest_api_id: &str,
        authorizer_id: &str,
        patches: &[PatchOp],
    ) -> Result<Value, GatewayError>;
    async fn delete_authorizer(
        &self,
        rest_api_id: &str,
        authorizer_id: &str,
    ) -> Result<Value, GatewayError>;

    async fn get_stage(&self, rest_api_id: &str, name: &str) -> Result<Value, GatewayError>;
    async fn update_stage(
        &self,
        rest_api_id: &str,
        name: &str,
        patches: &[PatchOp],
    ) -> Result<Value, GatewayError>;
    async fn delete_stage(&self, rest_api_id: &str, name: &str) -> Result<Value, GatewayError>;

    async fn get_resources(&self, rest_api_id: &str, limit: u32) -> Result<Value, GatewayError>;
    async fn create_resource(
        &self,
        rest_api_id: &str,
        parent_id: &str,
        path_part: &str,
    ) -> Result<Value, GatewayError>;
    async fn delete_resource(
        &self,
        rest_api_id: &str,
        resource_id: &str,
    ) -> Result<Value, GatewayError>;

    async fn get_usage_plans(&self) -> Result<Value, GatewayError>;
    async fn create_usage_plan(&self, body: Value) -> Result<Value, GatewayError>;
    async fn update_usage_plan(
        &self,
        usage_plan_id: &str,
        patches: &[PatchOp],
    ) -> Result<Value, GatewayError>;
    async fn delete_usage_plan(&self, usage_plan_id: &str) -> Result<Value, GatewayError>;

    async fn get_usage_plan_keys(&self, usage_plan_id: &str) -> Result<Value, GatewayError>;
    async fn create_usage_plan_key(
        &self,
        usage_plan_id: &str,
        key_id: &str,
        key_type: &str,
    ) -> Result<Value, GatewayError>;
    async fn delete_usage_plan_key(
        &self,
        usage_plan_id: &str,
        key_id: &str,
    ) -> Result<Value, GatewayError>;

    async fn get_domain_name(&self, domain_name: &str) -> Result<Value, GatewayError>;
    async fn create_domain_name(&self, body: Value) -> Result<Value, GatewayError>;
    async fn update_domain_name(
        &self,
        domain_name: &str,
        patches: &[PatchOp],
    ) -> Result<Value, GatewayError>;
    async fn delete_domain_name(&self, domain_name: &str) -> Result<Value, GatewayError>;

    async fn get_base_path_mappings(&self, domain_name: &str) -> Result<Value, GatewayError>;
    async fn create_base_path_mapping(
        &self,
        domain_name: &str,
        body: Value,
    ) -> Result<Value, GatewayError>;
    async fn update_base_path_mapping(
        &self,
        domain_name: &str,
        base_path: &str,
        patches: &[PatchOp],
    ) -> Result<Value, GatewayError>;
    async fn delete_base_path_mapping(
        &self,
        domain_name: &str,
        base_path: &str,
    ) -> Result<Value, GatewayError>;
}
