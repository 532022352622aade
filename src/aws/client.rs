//! API Gateway client
//!
//! Maps the [`Gateway`] operations onto the service's REST endpoints.
//! Patch-style updates go through the `patchOperations` envelope; path
//! segments are percent-encoded.

use super::auth::AwsCredentials;
use super::http::SignedHttpClient;
use crate::gateway::{Gateway, GatewayError};
use crate::patch::{to_wire_ops, PatchOp};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Signed client for the API Gateway control plane.
#[derive(Clone)]
pub struct ApiGatewayClient {
    http: SignedHttpClient,
    base: String,
}

impl ApiGatewayClient {
    /// Resolve credentials and connect to the regional endpoint (or an
    /// explicit override).
    pub async fn new(region: Option<&str>, endpoint_url: Option<&str>) -> Result<Self> {
        let credentials = AwsCredentials::resolve(region).await?;
        Self::with_credentials(credentials, endpoint_url)
    }

    pub fn with_credentials(
        credentials: AwsCredentials,
        endpoint_url: Option<&str>,
    ) -> Result<Self> {
        let base = match endpoint_url {
            Some(endpoint) => {
                let parsed = url::Url::parse(endpoint)
                    .with_context(|| format!("Invalid endpoint URL: {endpoint}"))?;
                parsed.as_str().trim_end_matches('/').to_string()
            }
            None => format!(
                "https://apigateway.{}.amazonaws.com",
                credentials.region()
            ),
        };

        Ok(Self {
            http: SignedHttpClient::new(credentials)?,
            base,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn patch_call(
        &self,
        path: &str,
        patches: &[PatchOp],
    ) -> Result<Value, GatewayError> {
        let body = json!({ "patchOperations": to_wire_ops(patches) });
        self.http.patch(&self.url(path), &body).await
    }
}

/// Percent-encode a single path segment.
fn enc(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[async_trait]
impl Gateway for ApiGatewayClient {
    async fn get_api_keys(
        &self,
        name_query: &str,
        include_values: bool,
    ) -> Result<Value, GatewayError> {
        let url = self.url(&format!(
            "/apikeys?nameQuery={}&includeValues={}",
            enc(name_query),
            include_values
        ));
        self.http.get(&url).await
    }

    async fn create_api_key(&self, body: Value) -> Result<Value, GatewayError> {
        self.http.post(&self.url("/apikeys"), &body).await
    }

    async fn update_api_key(
        &self,
        api_key_id: &str,
        patches: &[PatchOp],
    ) -> Result<Value, GatewayError> {
        self.patch_call(&format!("/apikeys/{}", enc(api_key_id)), patches)
            .await
    }

    async fn delete_api_key(&self, api_key_id: &str) -> Result<Value, GatewayError> {
        self.http
            .delete(&self.url(&format!("/apikeys/{}", enc(api_key_id))))
            .await
    }

    async fn get_model(&self, rest_api_id: &str, name: &str) -> Result<Value, GatewayError> {
        let url = self.url(&format!(
            "/restapis/{}/models/{}?flatten=true",
            enc(rest_api_id),
            enc(name)
        ));
        self.http.get(&url).await
    }

    async fn create_model(&self, rest_api_id: &str, body: Value) -> Result<Value, GatewayError> {
        self.http
            .post(&self.url(&format!("/restapis/{}/models", enc(rest_api_id))), &body)
            .await
    }

    async fn update_model(
        &self,
        rest_api_id: &str,
        name: &str,
        patches: &[PatchOp],
    ) -> Result<Value, GatewayError> {
        self.patch_call(
            &format!("/restapis/{}/models/{}", enc(rest_api_id), enc(name)),
            patches,
        )
        .await
    }

    async fn delete_model(&self, rest_api_id: &str, name: &str) -> Result<Value, GatewayError> {
        self.http
            .delete(&self.url(&format!(
                "/restapis/{}/models/{}",
                enc(rest_api_id),
                enc(name)
            )))
            .await
    }

    async fn get_authorizers(&self, rest_api_id: &str) -> Result<Value, GatewayError> {
        self.http
            .get(&self.url(&format!("/restapis/{}/authorizers", enc(rest_api_id))))
            .await
    }

    async fn create_authorizer(
        &self,
        rest_api_id: &str,
        body: Value,
    ) -> Result<Value, GatewayError> {
        let url = self.url(&format!("/restapis/{}/authorizers", enc(rest_api_id)));
        self.http.post(&url, &body).await
    }

    async fn update_authorizer(
        &self,
        rest_api_id: &str,
        authorizer_id: &str,
        patches: &[PatchOp],
    ) -> Result<Value, GatewayError> {
        self.patch_call(
            &format!(
                "/restapis/{}/authorizers/{}",
                enc(rest_api_id),
                enc(authorizer_id)
            ),
            patches,
        )
        .await
    }

    async fn delete_authorizer(
        &self,
        rest_api_id: &str,
        authorizer_id: &str,
    ) -> Result<Value, GatewayError> {
        self.http
            .delete(&self.url(&format!(
                "/restapis/{}/authorizers/{}",
                enc(rest_api_id),
                enc(authorizer_id)
            )))
            .await
    }

    async fn get_stage(&self, rest_api_id: &str, name: &str) -> Result<Value, GatewayError> {
        self.http
            .get(&self.url(&format!(
                "/restapis/{}/stages/{}",
                enc(rest_api_id),
                enc(name)
            )))
            .await
    }

    async fn update_stage(
        &self,
        rest_api_id: &str,
        name: &str,
        patches: &[PatchOp],
    ) -> Result<Value, GatewayError> {
        self.patch_call(
            &format!("/restapis/{}/stages/{}", enc(rest_api_id), enc(name)),
            patches,
        )
        .await
    }

    async fn delete_stage(&self, rest_api_id: &str, name: &str) -> Result<Value, GatewayError> {
        self.http
            .delete(&self.url(&format!(
                "/restapis/{}/stages/{}",
                enc(rest_api_id),
                enc(name)
            )))
            .await
    }

    async fn get_resources(&self, rest_api_id: &str, limit: u32) -> Result<Value, GatewayError> {
        let url = self.url(&format!(
            "/restapis/{}/resources?limit={}",
            enc(rest_api_id),
            limit
        ));
        self.http.get(&url).await
    }

    async fn create_resource(
        &self,
        rest_api_id: &str,
        parent_id: &str,
        path_part: &str,
    ) -> Result<Value, GatewayError> {
        let url = self.url(&format!(
            "/restapis/{}/resources/{}",
            enc(rest_api_id),
            enc(parent_id)
        ));
        self.http.post(&url, &json!({ "pathPart": path_part })).await
    }

    async fn delete_resource(
        &self,
        rest_api_id: &str,
        resource_id: &str,
    ) -> Result<Value, GatewayError> {
        self.http
            .delete(&self.url(&format!(
                "/restapis/{}/resources/{}",
                enc(rest_api_id),
                enc(resource_id)
            )))
            .await
    }

    async fn get_usage_plans(&self) -> Result<Value, GatewayError> {
        self.http.get(&self.url("/usageplans")).await
    }

    async fn create_usage_plan(&self, body: Value) -> Result<Value, GatewayError> {
        self.http.post(&self.url("/usageplans"), &body).await
    }

    async fn update_usage_plan(
        &self,
        usage_plan_id: &str,
        patches: &[PatchOp],
    ) -> Result<Value, GatewayError> {
        self.patch_call(&format!("/usageplans/{}", enc(usage_plan_id)), patches)
            .await
    }

    async fn delete_usage_plan(&self, usage_plan_id: &str) -> Result<Value, GatewayError> {
        self.http
            .delete(&self.url(&format!("/usageplans/{}", enc(usage_plan_id))))
            .await
    }

    async fn get_usage_plan_keys(&self, usage_plan_id: &str) -> Result<Value, GatewayError> {
        self.http
            .get(&self.url(&format!("/usageplans/{}/keys", enc(usage_plan_id))))
            .await
    }

    async fn create_usage_plan_key(
        &self,
        usage_plan_id: &str,
        key_id: &str,
        key_type: &str,
    ) -> Result<Value, GatewayError> {
        let url = self.url(&format!("/usageplans/{}/keys", enc(usage_plan_id)));
        self.http
            .post(&url, &json!({ "keyId": key_id, "keyType": key_type }))
            .await
    }

    async fn delete_usage_plan_key(
        &self,
        usage_plan_id: &str,
        key_id: &str,
    ) -> Result<Value, GatewayError> {
        self.http
            .delete(&self.url(&format!(
                "/usageplans/{}/keys/{}",
                enc(usage_plan_id),
                enc(key_id)
            )))
            .await
    }

    async fn get_domain_name(&self, domain_name: &str) -> Result<Value, GatewayError> {
        self.http
            .get(&self.url(&format!("/domainnames/{}", enc(domain_name))))
            .await
    }

    async fn create_domain_name(&self, body: Value) -> Result<Value, GatewayError> {
        self.http.post(&self.url("/domainnames"), &body).await
    }

    async fn update_domain_name(
        &self,
        domain_name: &str,
        patches: &[PatchOp],
    ) -> Result<Value, GatewayError> {
        self.patch_call(&format!("/domainnames/{}", enc(domain_name)), patches)
            .await
    }

    async fn delete_domain_name(&self, domain_name: &str) -> Result<Value, GatewayError> {
        self.http
            .delete(&self.url(&format!("/domainnames/{}", enc(domain_name))))
            .await
    }

    async fn get_base_path_mappings(&self, domain_name: &str) -> Result<Value, GatewayError> {
        self.http
            .get(&self.url(&format!(
                "/domainnames/{}/basepathmappings",
                enc(domain_name)
            )))
            .await
    }

    async fn create_base_path_mapping(
        &self,
        domain_name: &str,
        body: Value,
    ) -> Result<Value, GatewayError> {
        let url = self.url(&format!("/domainnames/{}/basepathmappings", enc(domain_name)));
        self.http.post(&url, &body).await
    }

    async fn update_base_path_mapping(
        &self,
        domain_name: &str,
        base_path: &str,
        patches: &[PatchOp],
    ) -> Result<Value, GatewayError> {
        self.patch_call(
            &format!(
                "/domainnames/{}/basepathmappings/{}",
                enc(domain_name),
                enc(base_path)
            ),
            patches,
        )
        .await
    }

    async fn delete_base_path_mapping(
        &self,
        domain_name: &str,
        base_path: &str,
    ) -> Result<Value, GatewayError> {
        self.http
            .delete(&self.url(&format!(
                "/domainnames/{}/basepathmappings/{}",
                enc(domain_name),
                enc(base_path)
            )))
            .await
    }
}
