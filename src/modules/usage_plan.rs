//! Usage plan module
//!
//! Plans are looked up by name over the full listing. Throttle and quota
//! settings use sentinel defaults (negative numbers, empty period) to
//! mean "unset": when a group is unset but present on the observed plan
//! the whole group is removed, otherwise individual children are added
//! or replaced. Stage associations diff as `apiId:stage` keys. Renaming
//! is unsupported because the name is the lookup key.

use super::{find_exact, observed_str, ReconcileOutcome, ResourceModule, TargetState};
use crate::gateway::Gateway;
use crate::patch::{float_str, stringify, PatchOp};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::str::FromStr;

/// A plan-to-stage association, supplied as `REST_API_ID:STAGE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiStage {
    pub rest_api_id: String,
    pub stage: String,
}

impl ApiStage {
    /// The provider's composite key form.
    pub fn key(&self) -> String {
        format!("{}:{}", self.rest_api_id, self.stage)
    }
}

impl FromStr for ApiStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((rest_api_id, stage)) if !rest_api_id.is_empty() && !stage.is_empty() => {
                Ok(Self {
                    rest_api_id: rest_api_id.to_string(),
                    stage: stage.to_string(),
                })
            }
            _ => Err(format!("expected REST_API_ID:STAGE, got '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum QuotaPeriod {
    #[value(name = "DAY")]
    Day,
    #[value(name = "WEEK")]
    Week,
    #[value(name = "MONTH")]
    Month,
}

impl QuotaPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "DAY",
            Self::Week => "WEEK",
            Self::Month => "MONTH",
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct UsagePlanParams {
    /// Plan name; also the lookup key
    #[arg(long)]
    pub name: String,

    /// Plan description
    #[arg(long)]
    pub description: Option<String>,

    /// Associated stages as `REST_API_ID:STAGE`, repeatable
    #[arg(long = "api-stage")]
    pub api_stages: Vec<ApiStage>,

    /// Request burst limit; negative means unset
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub throttle_burst_limit: i64,

    /// Steady-state request rate limit; negative means unset
    #[arg(long, default_value_t = -1.0, allow_hyphen_values = true)]
    pub throttle_rate_limit: f64,

    /// Maximum requests per quota period; negative means unset
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub quota_limit: i64,

    /// Requests subtracted from the limit in the first period; negative means unset
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub quota_offset: i64,

    /// Quota period; omitted means unset
    #[arg(long, value_enum)]
    pub quota_period: Option<QuotaPeriod>,

    /// Desired lifecycle state
    #[arg(long, value_enum, default_value_t = TargetState::Present)]
    pub state: TargetState,
}

impl UsagePlanParams {
    fn throttle_unset(&self) -> bool {
        self.throttle_burst_limit < 0 || self.throttle_rate_limit < 0.0
    }

    fn quota_unset(&self) -> bool {
        self.quota_limit < 0 || self.quota_offset < 0 || self.quota_period.is_none()
    }
}

fn set_nested(body: &mut Value, parent: &str, child: &str, value: Value) {
    if body.get(parent).is_none() {
        body[parent] = json!({});
    }
    body[parent][child] = value;
}

pub fn build_create_body(params: &UsagePlanParams) -> Value {
    let mut body = json!({"name": params.name});

    if let Some(description) = &params.description {
        if !description.is_empty() {
            body["description"] = json!(description);
        }
    }
    if params.throttle_burst_limit >= 0 {
        set_nested(&mut body, "throttle", "burstLimit", json!(params.throttle_burst_limit));
    }
    if params.throttle_rate_limit >= 0.0 {
        set_nested(&mut body, "throttle", "rateLimit", json!(params.throttle_rate_limit));
    }
    if params.quota_limit >= 0 {
        set_nested(&mut body, "quota", "limit", json!(params.quota_limit));
    }
    if params.quota_offset >= 0 {
        set_nested(&mut body, "quota", "offset", json!(params.quota_offset));
    }
    if let Some(period) = params.quota_period {
        set_nested(&mut body, "quota", "period", json!(period.as_str()));
    }
    if !params.api_stages.is_empty() {
        body["apiStages"] = params
            .api_stages
            .iter()
            .map(|s| json!({"apiId": s.rest_api_id, "stage": s.stage}))
            .collect();
    }

    body
}

/// One `remove /apiStages` patch per association on the observed plan.
fn api_stage_remove_patches(observed: &Value) -> Vec<PatchOp> {
    observed
        .get("apiStages")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let api_id = entry.get("apiId").and_then(Value::as_str)?;
            let stage = entry.get("stage").and_then(Value::as_str)?;
            Some(PatchOp::remove_value("/apiStages", format!("{api_id}:{stage}")))
        })
        .collect()
}

/// Add the child when absent from the observed group, replace when it
/// differs.
fn nested_patch(patches: &mut Vec<PatchOp>, observed: &Value, parent: &str, child: &str, wanted: String) {
    let path = format!("/{parent}/{child}");
    match observed.get(parent).and_then(|group| group.get(child)) {
        None => patches.push(PatchOp::add(path, wanted)),
        Some(current) if stringify(current) != wanted => {
            patches.push(PatchOp::replace(path, wanted))
        }
        _ => {}
    }
}

pub fn build_patches(params: &UsagePlanParams, observed: &Value) -> Vec<PatchOp> {
    let mut patches = Vec::new();

    // Group removals come first so a later add cannot race a remove.
    if observed.get("throttle").is_some() && params.throttle_unset() {
        patches.push(PatchOp::remove("/throttle"));
    }
    if observed.get("quota").is_some() && params.quota_unset() {
        patches.push(PatchOp::remove("/quota"));
    }
    if observed.get("apiStages").is_some() && params.api_stages.is_empty() {
        patches.extend(api_stage_remove_patches(observed));
    }

    if let Some(description) = &params.description {
        match observed.get("description") {
            None if description.is_empty() => {}
            Some(current) if stringify(current) == *description => {}
            _ => patches.push(PatchOp::replace("/description", description.clone())),
        }
    }

    if params.throttle_rate_limit >= 0.0 {
        nested_patch(
            &mut patches,
            observed,
            "throttle",
            "rateLimit",
            float_str(params.throttle_rate_limit),
        );
    }
    if params.throttle_burst_limit >= 0 {
        nested_patch(
            &mut patches,
            observed,
            "throttle",
            "burstLimit",
            params.throttle_burst_limit.to_string(),
        );
    }
    if params.quota_limit >= 0 {
        nested_patch(
            &mut patches,
            observed,
            "quota",
            "limit",
            params.quota_limit.to_string(),
        );
    }
    if params.quota_offset >= 0 {
        nested_patch(
            &mut patches,
            observed,
            "quota",
            "offset",
            params.quota_offset.to_string(),
        );
    }
    if let Some(period) = params.quota_period {
        nested_patch(
            &mut patches,
            observed,
            "quota",
            "period",
            period.as_str().to_string(),
        );
    }

    let observed_keys: Vec<String> = observed
        .get("apiStages")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let api_id = entry.get("apiId").and_then(Value::as_str)?;
            let stage = entry.get("stage").and_then(Value::as_str)?;
            Some(format!("{api_id}:{stage}"))
        })
        .collect();
    for desired in &params.api_stages {
        let key = desired.key();
        if !observed_keys.contains(&key) {
            patches.push(PatchOp::add("/apiStages", key));
        }
    }

    patches
}

pub struct UsagePlanModule<'a> {
    params: &'a UsagePlanParams,
}

impl<'a> UsagePlanModule<'a> {
    pub fn new(params: &'a UsagePlanParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl ResourceModule for UsagePlanModule<'_> {
    fn kind(&self) -> &'static str {
        "usage_plan"
    }

    fn target_state(&self) -> TargetState {
        self.params.state
    }

    async fn lookup(&self, gw: &dyn Gateway) -> Result<Option<Value>> {
        let listing = gw.get_usage_plans().await.context("get_usage_plans failed")?;
        Ok(find_exact(&listing, "name", &self.params.name))
    }

    async fn create(&self, gw: &dyn Gateway, check_mode: bool) -> Result<ReconcileOutcome> {
        if check_mode {
            return Ok(ReconcileOutcome::changed(None));
        }
        let created = gw
            .create_usage_plan(build_create_body(self.params))
            .await
            .context("create_usage_plan failed")?;
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
        gw.update_usage_plan(id, &patches)
            .await
            .context("update_usage_plan failed")?;

        let refreshed = self.lookup(gw).await?;
        Ok(ReconcileOutcome::changed(refreshed))
    }

    async fn delete(&self, gw: &dyn Gateway, observed: &Value) -> Result<()> {
        let id = observed_str(observed, "id")?;

        // A plan cannot be deleted while stages are attached.
        let detach = api_stage_remove_patches(observed);
        if !detach.is_empty() {
            gw.update_usage_plan(id, &detach)
                .await
                .context("update_usage_plan failed while detaching stages")?;
        }

        gw.delete_usage_plan(id)
            .await
            .context("delete_usage_plan failed")?;
        Ok(())
    }
}
