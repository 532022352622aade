//! Stage module
//!
//! Stages are created by deployments, not by this tool, so the present
//! path only ever patches. When the stage is missing the diff runs
//! against an empty object: with no settings supplied that is a no-op,
//! otherwise the patch call is issued and the provider decides whether
//! the stage exists.

use super::{ReconcileOutcome, ResourceModule, TargetState};
use crate::gateway::{optional, Gateway};
use crate::patch::{bool_str, escape_path, stringify, PatchOp};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::str::FromStr;

/// Per-method caching override, supplied as `PATH:VERB[:BOOL]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSetting {
    pub method_name: String,
    pub method_verb: String,
    pub caching_enabled: bool,
}

impl MethodSetting {
    /// Key used by the provider's `methodSettings` map, with slashes in
    /// the resource path escaped as `~1`.
    pub fn settings_key(&self) -> String {
        format!("{}/{}", escape_path(&self.method_name), self.method_verb)
    }
}

impl FromStr for MethodSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, rest) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected PATH:VERB[:BOOL], got '{s}'"))?;

        // The trailing piece is either the verb or an on/off flag.
        let (method_name, method_verb, caching_enabled) = match rest.parse::<bool>() {
            Ok(enabled) => {
                let (name, verb) = path
                    .rsplit_once(':')
                    .ok_or_else(|| format!("expected PATH:VERB[:BOOL], got '{s}'"))?;
                (name, verb, enabled)
            }
            Err(_) => (path, rest, false),
        };

        if method_name.is_empty() || method_verb.is_empty() {
            return Err(format!("expected PATH:VERB[:BOOL], got '{s}'"));
        }

        Ok(Self {
            method_name: method_name.to_string(),
            method_verb: method_verb.to_uppercase(),
            caching_enabled,
        })
    }
}

/// Valid cache cluster sizes, in gigabytes, as the provider spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CacheClusterSize {
    #[value(name = "0.5")]
    Half,
    #[value(name = "1.6")]
    OnePointSix,
    #[value(name = "6.1")]
    SixPointOne,
    #[value(name = "13.5")]
    ThirteenPointFive,
    #[value(name = "28.4")]
    TwentyEightPointFour,
    #[value(name = "58.2")]
    FiftyEightPointTwo,
    #[value(name = "118")]
    OneEighteen,
    #[value(name = "237")]
    TwoThirtySeven,
}

impl CacheClusterSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Half => "0.5",
            Self::OnePointSix => "1.6",
            Self::SixPointOne => "6.1",
            Self::ThirteenPointFive => "13.5",
            Self::TwentyEightPointFour => "28.4",
            Self::FiftyEightPointTwo => "58.2",
            Self::OneEighteen => "118",
            Self::TwoThirtySeven => "237",
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct StageParams {
    /// Identifier of the REST API owning the stage
    #[arg(long)]
    pub rest_api_id: String,

    /// Stage name; also the lookup key
    #[arg(long, alias = "stage-name")]
    pub name: String,

    /// Stage description
    #[arg(long)]
    pub description: Option<String>,

    /// Whether a cache cluster is enabled for the stage
    #[arg(long)]
    pub cache_cluster_enabled: Option<bool>,

    /// Cache cluster size in gigabytes
    #[arg(long, value_enum)]
    pub cache_cluster_size: Option<CacheClusterSize>,

    /// Per-method caching overrides as `PATH:VERB[:BOOL]`, repeatable
    #[arg(long = "method-setting")]
    pub method_settings: Vec<MethodSetting>,

    /// Desired lifecycle state
    #[arg(long, value_enum, default_value_t = TargetState::Present)]
    pub state: TargetState,
}

/// Diff the desired settings against an observed stage (or an empty
/// object when the stage does not exist yet).
pub fn build_patches(params: &StageParams, observed: &Value) -> Vec<PatchOp> {
    let mut patches = Vec::new();

    if let Some(description) = &params.description {
        match observed.get("description") {
            // Empty descriptions never appear in the observed stage, so
            // patching "" onto an absent field would never converge.
            None if description.is_empty() => {}
            Some(current) if stringify(current) == *description => {}
            _ => patches.push(PatchOp::replace("/description", description.clone())),
        }
    }

    if let Some(enabled) = params.cache_cluster_enabled {
        let wanted = bool_str(enabled);
        match observed.get("cacheClusterEnabled") {
            Some(current) if stringify(current) == wanted => {}
            _ => patches.push(PatchOp::replace("/cacheClusterEnabled", wanted)),
        }
    }

    if let Some(size) = params.cache_cluster_size {
        match observed.get("cacheClusterSize") {
            Some(current) if stringify(current) == size.as_str() => {}
            _ => patches.push(PatchOp::replace("/cacheClusterSize", size.as_str())),
        }
    }

    for setting in &params.method_settings {
        let key = setting.settings_key();
        let wanted = bool_str(setting.caching_enabled);
        let current = observed
            .get("methodSettings")
            .and_then(|settings| settings.get(&key))
            .and_then(|entry| entry.get("cachingEnabled"));
        match current {
            Some(current) if stringify(current) == wanted => {}
            _ => patches.push(PatchOp::replace(format!("/{key}/caching/enabled"), wanted)),
        }
    }

    patches
}

pub struct StageModule<'a> {
    params: &'a StageParams,
}

impl<'a> StageModule<'a> {
    pub fn new(params: &'a StageParams) -> Self {
        Self { params }
    }

    async fn apply(
        &self,
        gw: &dyn Gateway,
        observed: &Value,
        check_mode: bool,
    ) -> Result<ReconcileOutcome> {
        let patches = build_patches(self.params, observed);
        if patches.is_empty() {
            return Ok(ReconcileOutcome::unchanged(None));
        }
        if check_mode {
            return Ok(ReconcileOutcome::changed(None));
        }

        gw.update_stage(&self.params.rest_api_id, &self.params.name, &patches)
            .await
            .context("update_stage failed")?;

        let refreshed = self.lookup(gw).await?;
        Ok(ReconcileOutcome::changed(refreshed))
    }
}

#[async_trait]
impl ResourceModule for StageModule<'_> {
    fn kind(&self) -> &'static str {
        "stage"
    }

    fn target_state(&self) -> TargetState {
        self.params.state
    }

    async fn lookup(&self, gw: &dyn Gateway) -> Result<Option<Value>> {
        optional(gw.get_stage(&self.params.rest_api_id, &self.params.name).await)
            .context("get_stage failed")
    }

    async fn create(&self, gw: &dyn Gateway, check_mode: bool) -> Result<ReconcileOutcome> {
        // No create call exists for stages; diff against nothing and let
        // the patch call carry the settings.
        self.apply(gw, &json!({}), check_mode).await
    }

    async fn update(
        &self,
        gw: &dyn Gateway,
        observed: Value,
        check_mode: bool,
    ) -> Result<ReconcileOutcome> {
        self.apply(gw, &observed, check_mode).await
    }

    async fn delete(&self, gw: &dyn Gateway, _observed: &Value) -> Result<()> {
        gw.delete_stage(&self.params.rest_api_id, &self.params.name)
            .await
            .context("delete_stage failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::MockGateway;
    use crate::modules::reconcile;

    fn params() -> StageParams {
        StageParams {
            rest_api_id: "rest_id".into(),
            name: "live".into(),
            description: None,
            cache_cluster_enabled: None,
            cache_cluster_size: None,
            method_settings: Vec::new(),
            state: TargetState::Present,
        }
    }

    fn observed() -> Value {
        json!({
            "stageName": "live",
            "description": "awesome stage",
            "cacheClusterEnabled": true,
            "cacheClusterSize": "0.5",
            "methodSettings": {
                "~1test/PUT": {"cachingEnabled": true},
            },
        })
    }

    #[test]
    fn method_setting_parses_path_verb_and_flag() {
        let setting: MethodSetting = "/test:put:true".parse().unwrap();
        assert_eq!(setting.method_name, "/test");
        assert_eq!(setting.method_verb, "PUT");
        assert!(setting.caching_enabled);
        assert_eq!(setting.settings_key(), "~1test/PUT");

        let setting: MethodSetting = "/a/b:GET".parse().unwrap();
        assert!(!setting.caching_enabled);
        assert_eq!(setting.settings_key(), "~1a~1b/GET");

        assert!("noverb".parse::<MethodSetting>().is_err());
    }

    #[test]
    fn method_setting_patch_path_escapes_slashes() {
        let p = StageParams {
            method_settings: vec!["/test:PUT:false".parse().unwrap()],
            ..params()
        };
        assert_eq!(
            build_patches(&p, &observed()),
            vec![PatchOp::replace("/~1test/PUT/caching/enabled", "False")]
        );
    }

    #[test]
    fn matching_settings_produce_no_patches() {
        let p = StageParams {
            description: Some("awesome stage".into()),
            cache_cluster_enabled: Some(true),
            cache_cluster_size: Some(CacheClusterSize::Half),
            method_settings: vec!["/test:PUT:true".parse().unwrap()],
            ..params()
        };
        assert!(build_patches(&p, &observed()).is_empty());
    }

    #[test]
    fn empty_description_against_missing_stage_is_suppressed() {
        let p = StageParams {
            description: Some(String::new()),
            ..params()
        };
        assert!(build_patches(&p, &json!({})).is_empty());
    }

    #[tokio::test]
    async fn missing_stage_with_no_settings_is_a_no_op() {
        let gw = MockGateway::new().not_found("get_stage");

        let p = params();
        let outcome = reconcile(&StageModule::new(&p), &gw, false).await.unwrap();

        assert!(!outcome.changed);
        assert!(outcome.object.is_none());
        assert!(gw.calls_for("update_stage").is_empty());
    }

    #[tokio::test]
    async fn missing_stage_with_settings_is_patched_from_scratch() {
        let gw = MockGateway::new()
            .not_found("get_stage")
            .returning("update_stage", Value::Null)
            .returning("get_stage", observed());

        let p = StageParams {
            cache_cluster_enabled: Some(true),
            cache_cluster_size: Some(CacheClusterSize::Half),
            ..params()
        };
        let outcome = reconcile(&StageModule::new(&p), &gw, false).await.unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.object.unwrap()["stageName"], "live");
        assert_eq!(
            gw.calls_for("update_stage"),
            vec![json!({
                "restApiId": "rest_id",
                "stageName": "live",
                "patchOperations": [
                    {"op": "replace", "path": "/cacheClusterEnabled", "value": "True"},
                    {"op": "replace", "path": "/cacheClusterSize", "value": "0.5"},
                ],
            })]
        );
    }

    #[tokio::test]
    async fn drifted_stage_is_patched_and_refetched() {
        let gw = MockGateway::new()
            .returning("get_stage", observed())
            .returning("update_stage", Value::Null)
            .returning("get_stage", json!({"stageName": "live", "description": "new"}));

        let p = StageParams {
            description: Some("new".into()),
            ..params()
        };
        let outcome = reconcile(&StageModule::new(&p), &gw, false).await.unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.object.unwrap()["description"], "new");
    }

    #[tokio::test]
    async fn check_mode_reports_changed_without_patching() {
        let gw = MockGateway::new().returning("get_stage", observed());

        let p = StageParams {
            cache_cluster_enabled: Some(false),
            ..params()
        };
        let outcome = reconcile(&StageModule::new(&p), &gw, true).await.unwrap();

        assert!(outcome.changed);
        assert!(outcome.object.is_none());
        assert!(gw.calls_for("update_stage").is_empty());
    }

    #[tokio::test]
    async fn absent_stage_is_deleted() {
        let gw = MockGateway::new().returning("get_stage", observed());

        let p = StageParams {
            state: TargetState::Absent,
            ..params()
        };
        let outcome = reconcile(&StageModule::new(&p), &gw, false).await.unwrap();

        assert!(outcome.changed);
        assert_eq!(
            gw.calls_for("delete_stage"),
            vec![json!({"restApiId": "rest_id", "stageName": "live"})]
        );
    }
}
