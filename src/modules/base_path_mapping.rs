//! Base path mapping module
//!
//! Mappings hang off a custom domain and are keyed by base path, with
//! `(none)` standing in for the domain root. Only the target stage can
//! be patched; moving a mapping to another API means delete and
//! recreate. `rest_api_id` is required on the create path only.

use super::{find_exact, ReconcileOutcome, ResourceModule, TargetState};
use crate::gateway::Gateway;
use crate::patch::PatchOp;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Base path the provider uses for the domain root.
pub const ROOT_BASE_PATH: &str = "(none)";

#[derive(Debug, Clone, clap::Args)]
pub struct BasePathMappingParams {
    /// Custom domain name owning the mapping
    #[arg(long, alias = "domain-name")]
    pub name: String,

    /// Base path under the domain; `(none)` maps the domain root
    #[arg(long, default_value = ROOT_BASE_PATH)]
    pub base_path: String,

    /// Identifier of the mapped REST API; required to create
    #[arg(long)]
    pub rest_api_id: Option<String>,

    /// Stage the mapping points at
    #[arg(long)]
    pub stage: Option<String>,

    /// Desired lifecycle state
    #[arg(long, value_enum, default_value_t = TargetState::Present)]
    pub state: TargetState,
}

/// Patch `/stage` only when a stage was supplied, is non-empty, and
/// differs from the observed mapping.
pub fn build_patches(params: &BasePathMappingParams, observed: &Value) -> Vec<PatchOp> {
    match &params.stage {
        Some(stage)
            if !stage.is_empty()
                && observed.get("stage").and_then(Value::as_str) != Some(stage) =>
        {
            vec![PatchOp::replace("/stage", stage.clone())]
        }
        _ => Vec::new(),
    }
}

pub struct BasePathMappingModule<'a> {
    params: &'a BasePathMappingParams,
}

impl<'a> BasePathMappingModule<'a> {
    pub fn new(params: &'a BasePathMappingParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl ResourceModule for BasePathMappingModule<'_> {
    fn kind(&self) -> &'static str {
        "base_path_mapping"
    }

    fn target_state(&self) -> TargetState {
        self.params.state
    }

    async fn lookup(&self, gw: &dyn Gateway) -> Result<Option<Value>> {
        let listing = gw
            .get_base_path_mappings(&self.params.name)
            .await
            .context("get_base_path_mappings failed")?;
        Ok(find_exact(&listing, "basePath", &self.params.base_path))
    }

    async fn create(&self, gw: &dyn Gateway, check_mode: bool) -> Result<ReconcileOutcome> {
        let Some(rest_api_id) = &self.params.rest_api_id else {
            bail!("rest_api_id is required to create a base path mapping");
        };

        if check_mode {
            return Ok(ReconcileOutcome::changed(None));
        }

        let mut body = json!({
            "restApiId": rest_api_id,
            "basePath": self.params.base_path,
        });
        if let Some(stage) = &self.params.stage {
            if !stage.is_empty() {
                body["stage"] = json!(stage);
            }
        }

        let created = gw
            .create_base_path_mapping(&self.params.name, body)
            .await
            .context("create_base_path_mapping failed")?;
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

        gw.update_base_path_mapping(&self.params.name, &self.params.base_path, &patches)
            .await
            .context("update_base_path_mapping failed")?;

        let refreshed = self.lookup(gw).await?;
        Ok(ReconcileOutcome::changed(refreshed))
    }

    async fn delete(&self, gw: &dyn Gateway, _observed: &Value) -> Result<()> {
        gw.delete_base_path_mapping(&self.params.name, &self.params.base_path)
            .await
            .context("delete_base_path_mapping failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::MockGateway;
    use crate::modules::reconcile;

    fn params() -> BasePathMappingParams {
        BasePathMappingParams {
            name: "api.example.com".into(),
            base_path: ROOT_BASE_PATH.into(),
            rest_api_id: None,
            stage: None,
            state: TargetState::Present,
        }
    }

    fn listing() -> Value {
        json!({"items": [
            {"basePath": "(none)", "restApiId": "abc123", "stage": "live"},
            {"basePath": "v2", "restApiId": "abc123", "stage": "test"},
        ]})
    }

    #[tokio::test]
    async fn mapping_is_matched_by_base_path() {
        let gw = MockGateway::new().returning("get_base_path_mappings", listing());

        let p = BasePathMappingParams {
            base_path: "v2".into(),
            ..params()
        };
        let outcome = reconcile(&BasePathMappingModule::new(&p), &gw, false)
            .await
            .unwrap();

        assert!(!outcome.changed);
        assert_eq!(outcome.object.unwrap()["stage"], "test");
    }

    #[tokio::test]
    async fn create_requires_rest_api_id() {
        let gw = MockGateway::new().returning("get_base_path_mappings", json!({"items": []}));

        let p = params();
        let err = reconcile(&BasePathMappingModule::new(&p), &gw, false)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("rest_api_id"));
        assert!(gw.calls_for("create_base_path_mapping").is_empty());
    }

    #[tokio::test]
    async fn missing_mapping_is_created_with_optional_stage() {
        let gw = MockGateway::new()
            .returning("get_base_path_mappings", json!({"items": []}))
            .returning(
                "create_base_path_mapping",
                json!({"basePath": "(none)", "stage": "live"}),
            );

        let p = BasePathMappingParams {
            rest_api_id: Some("abc123".into()),
            stage: Some("live".into()),
            ..params()
        };
        let outcome = reconcile(&BasePathMappingModule::new(&p), &gw, false)
            .await
            .unwrap();

        assert!(outcome.changed);
        assert_eq!(
            gw.calls_for("create_base_path_mapping"),
            vec![json!({
                "domainName": "api.example.com",
                "body": {"restApiId": "abc123", "basePath": "(none)", "stage": "live"},
            })]
        );
    }

    #[tokio::test]
    async fn drifted_stage_is_patched() {
        let after = json!({"basePath": "(none)", "restApiId": "abc123", "stage": "next"});
        let gw = MockGateway::new()
            .returning("get_base_path_mappings", listing())
            .returning("update_base_path_mapping", Value::Null)
            .returning("get_base_path_mappings", json!({"items": [after.clone()]}));

        let p = BasePathMappingParams {
            stage: Some("next".into()),
            ..params()
        };
        let outcome = reconcile(&BasePathMappingModule::new(&p), &gw, false)
            .await
            .unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.object.unwrap(), after);
        assert_eq!(
            gw.calls_for("update_base_path_mapping"),
            vec![json!({
                "domainName": "api.example.com",
                "basePath": "(none)",
                "patchOperations": [
                    {"op": "replace", "path": "/stage", "value": "next"},
                ],
            })]
        );
    }

    #[test]
    fn empty_stage_is_never_patched() {
        let observed = json!({"basePath": "(none)", "stage": "live"});
        let p = BasePathMappingParams {
            stage: Some(String::new()),
            ..params()
        };
        assert!(build_patches(&p, &observed).is_empty());

        let p = params();
        assert!(build_patches(&p, &observed).is_empty());
    }

    #[tokio::test]
    async fn absent_mapping_is_deleted_by_base_path() {
        let gw = MockGateway::new().returning("get_base_path_mappings", listing());

        let p = BasePathMappingParams {
            state: TargetState::Absent,
            ..params()
        };
        let outcome = reconcile(&BasePathMappingModule::new(&p), &gw, false)
            .await
            .unwrap();

        assert!(outcome.changed);
        assert_eq!(
            gw.calls_for("delete_base_path_mapping"),
            vec![json!({"domainName": "api.example.com", "basePath": "(none)"})]
        );
    }
}
