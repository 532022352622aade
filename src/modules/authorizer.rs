//! Authorizer module
//!
//! Authorizers are matched by name within the listing for their REST
//! API. The provider compares patch values as strings and without
//! regard to case, so the diff builder does the same. Provider ARNs are
//! diffed as a set and patched per entry.

use super::{find_exact, observed_str, ReconcileOutcome, ResourceModule, TargetState};
use crate::gateway::Gateway;
use crate::patch::{stringify, PatchOp};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AuthorizerType {
    #[value(name = "TOKEN")]
    Token,
    #[value(name = "REQUEST")]
    Request,
    #[value(name = "COGNITO_USER_POOLS")]
    CognitoUserPools,
}

impl AuthorizerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Token => "TOKEN",
            Self::Request => "REQUEST",
            Self::CognitoUserPools => "COGNITO_USER_POOLS",
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct AuthorizerParams {
    /// Identifier of the REST API owning the authorizer
    #[arg(long)]
    pub rest_api_id: String,

    /// Authorizer name; also the lookup key
    #[arg(long, alias = "authorizer")]
    pub name: String,

    /// Kind of authorizer; required to create
    #[arg(long = "type", value_enum)]
    pub authorizer_type: Option<AuthorizerType>,

    /// URI the provider invokes to authorize, e.g. a Lambda invocation ARN
    #[arg(long)]
    pub uri: Option<String>,

    /// Request field carrying the caller identity; required to create
    #[arg(long)]
    pub identity_source: Option<String>,

    /// Regex the incoming identity must match
    #[arg(long, default_value = "")]
    pub identity_validation_expression: String,

    /// Cognito user pool ARN, repeatable
    #[arg(long = "provider-arn")]
    pub provider_arns: Vec<String>,

    /// Customer-defined authorization type label; informational only
    #[arg(long)]
    pub auth_type: Option<String>,

    /// IAM role the provider assumes to invoke the authorizer
    #[arg(long)]
    pub credentials: Option<String>,

    /// TTL of cached authorizer results in seconds
    #[arg(long, default_value_t = 0)]
    pub result_ttl_seconds: i64,

    /// Desired lifecycle state
    #[arg(long, value_enum, default_value_t = TargetState::Present)]
    pub state: TargetState,
}

/// Diff the desired settings against an observed authorizer. Scalar
/// fields compare case-insensitively; empty desired values against an
/// absent field are suppressed, like descriptions elsewhere.
pub fn build_patches(params: &AuthorizerParams, observed: &Value) -> Vec<PatchOp> {
    let mut patches = Vec::new();

    let fields: [(&str, Option<String>); 7] = [
        ("type", params.authorizer_type.map(|t| t.as_str().to_string())),
        ("authorizerUri", params.uri.clone()),
        ("identitySource", params.identity_source.clone()),
        (
            "identityValidationExpression",
            Some(params.identity_validation_expression.clone()),
        ),
        ("authType", params.auth_type.clone()),
        ("authorizerCredentials", params.credentials.clone()),
        (
            "authorizerResultTtlInSeconds",
            Some(params.result_ttl_seconds.to_string()),
        ),
    ];

    for (field, wanted) in fields {
        let Some(wanted) = wanted else { continue };
        match observed.get(field).map(stringify) {
            None if wanted.is_empty() => {}
            Some(current) if current.eq_ignore_ascii_case(&wanted) => {}
            _ => patches.push(PatchOp::replace(format!("/{field}"), wanted)),
        }
    }

    match observed.get("providerARNs").and_then(Value::as_array) {
        Some(_) if params.provider_arns.is_empty() => {
            patches.push(PatchOp::remove("/providerARNs"));
        }
        Some(current) => {
            let current: BTreeSet<&str> = current.iter().filter_map(Value::as_str).collect();
            let wanted: BTreeSet<&str> =
                params.provider_arns.iter().map(String::as_str).collect();
            for arn in current.difference(&wanted) {
                patches.push(PatchOp::remove_value("/providerARNs", *arn));
            }
            for arn in wanted.difference(&current) {
                patches.push(PatchOp::add("/providerARNs", *arn));
            }
        }
        None => {
            for arn in &params.provider_arns {
                patches.push(PatchOp::add("/providerARNs", arn.clone()));
            }
        }
    }

    patches
}

pub struct AuthorizerModule<'a> {
    params: &'a AuthorizerParams,
}

impl<'a> AuthorizerModule<'a> {
    pub fn new(params: &'a AuthorizerParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl ResourceModule for AuthorizerModule<'_> {
    fn kind(&self) -> &'static str {
        "authorizer"
    }

    fn target_state(&self) -> TargetState {
        self.params.state
    }

    async fn lookup(&self, gw: &dyn Gateway) -> Result<Option<Value>> {
        let listing = gw
            .get_authorizers(&self.params.rest_api_id)
            .await
            .context("get_authorizers failed")?;
        Ok(find_exact(&listing, "name", &self.params.name))
    }

    async fn create(&self, gw: &dyn Gateway, check_mode: bool) -> Result<ReconcileOutcome> {
        let (Some(authorizer_type), Some(identity_source)) =
            (self.params.authorizer_type, &self.params.identity_source)
        else {
            bail!("type and identity_source are required to create an authorizer");
        };

        if check_mode {
            return Ok(ReconcileOutcome::changed(None));
        }

        let mut body = json!({
            "name": self.params.name,
            "type": authorizer_type.as_str(),
            "identitySource": identity_source,
        });
        if !self.params.provider_arns.is_empty() {
            body["providerArns"] = json!(self.params.provider_arns);
        }
        if let Some(auth_type) = &self.params.auth_type {
            body["authType"] = json!(auth_type);
        }
        if let Some(uri) = &self.params.uri {
            body["authorizerUri"] = json!(uri);
        }
        if let Some(credentials) = &self.params.credentials {
            body["authorizerCredentials"] = json!(credentials);
        }
        if !self.params.identity_validation_expression.is_empty() {
            body["identityValidationExpression"] =
                json!(self.params.identity_validation_expression);
        }
        if self.params.result_ttl_seconds != 0 {
            body["authorizerResultTtlInSeconds"] = json!(self.params.result_ttl_seconds);
        }

        let created = gw
            .create_authorizer(&self.params.rest_api_id, body)
            .await
            .context("create_authorizer failed")?;
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

        let authorizer_id = observed_str(&observed, "id")?;
        gw.update_authorizer(&self.params.rest_api_id, authorizer_id, &patches)
            .await
            .context("update_authorizer failed")?;

        let refreshed = self.lookup(gw).await?;
        Ok(ReconcileOutcome::changed(refreshed))
    }

    async fn delete(&self, gw: &dyn Gateway, observed: &Value) -> Result<()> {
        let authorizer_id = observed_str(observed, "id")?;
        gw.delete_authorizer(&self.params.rest_api_id, authorizer_id)
            .await
            .context("delete_authorizer failed")?;
        Ok(())
    }
}
