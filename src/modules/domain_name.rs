//! Domain name module
//!
//! Custom domains are fetched directly by name. Creation needs the full
//! certificate bundle; afterwards only the certificate name can be
//! patched.

use super::{ReconcileOutcome, ResourceModule, TargetState};
use crate::gateway::{optional, Gateway};
use crate::patch::PatchOp;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, Clone, clap::Args)]
pub struct DomainNameParams {
    /// Custom domain name; also the lookup key
    #[arg(long, alias = "domain-name")]
    pub name: String,

    /// Certificate display name
    #[arg(long)]
    pub cert_name: Option<String>,

    /// PEM-encoded certificate body
    #[arg(long)]
    pub cert_body: Option<String>,

    /// PEM-encoded certificate private key
    #[arg(long)]
    pub cert_private_key: Option<String>,

    /// PEM-encoded certificate chain
    #[arg(long)]
    pub cert_chain: Option<String>,

    /// Desired lifecycle state
    #[arg(long, value_enum, default_value_t = TargetState::Present)]
    pub state: TargetState,
}

/// Patch `/certificateName` only when supplied, non-empty, and
/// different from the observed value.
pub fn build_patches(params: &DomainNameParams, observed: &Value) -> Vec<PatchOp> {
    match &params.cert_name {
        Some(cert_name)
            if !cert_name.is_empty()
                && observed.get("certificateName").and_then(Value::as_str) != Some(cert_name) =>
        {
            vec![PatchOp::replace("/certificateName", cert_name.clone())]
        }
        _ => Vec::new(),
    }
}

pub struct DomainNameModule<'a> {
    params: &'a DomainNameParams,
}

impl<'a> DomainNameModule<'a> {
    pub fn new(params: &'a DomainNameParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl ResourceModule for DomainNameModule<'_> {
    fn kind(&self) -> &'static str {
        "domain_name"
    }

    fn target_state(&self) -> TargetState {
        self.params.state
    }

    async fn lookup(&self, gw: &dyn Gateway) -> Result<Option<Value>> {
        optional(gw.get_domain_name(&self.params.name).await).context("get_domain_name failed")
    }

    async fn create(&self, gw: &dyn Gateway, check_mode: bool) -> Result<ReconcileOutcome> {
        let (Some(cert_name), Some(cert_body), Some(cert_private_key), Some(cert_chain)) = (
            &self.params.cert_name,
            &self.params.cert_body,
            &self.params.cert_private_key,
            &self.params.cert_chain,
        ) else {
            bail!("all certificate parameters are required to create a domain name");
        };

        if check_mode {
            return Ok(ReconcileOutcome::changed(None));
        }

        let created = gw
            .create_domain_name(json!({
                "domainName": self.params.name,
                "certificateName": cert_name,
                "certificateBody": cert_body,
                "certificatePrivateKey": cert_private_key,
                "certificateChain": cert_chain,
            }))
            .await
            .context("create_domain_name failed")?;
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

        gw.update_domain_name(&self.params.name, &patches)
            .await
            .context("update_domain_name failed")?;

        let refreshed = self.lookup(gw).await?;
        Ok(ReconcileOutcome::changed(refreshed))
    }

    async fn delete(&self, gw: &dyn Gateway, _observed: &Value) -> Result<()> {
        gw.delete_domain_name(&self.params.name)
            .await
            .context("delete_domain_name failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::MockGateway;
    use crate::gateway::GatewayError;
    use crate::modules::reconcile;

    fn params() -> DomainNameParams {
        DomainNameParams {
            name: "api.example.com".into(),
            cert_name: None,
            cert_body: None,
            cert_private_key: None,
            cert_chain: None,
            state: TargetState::Present,
        }
    }

    fn with_certs() -> DomainNameParams {
        DomainNameParams {
            cert_name: Some("cert".into()),
            cert_body: Some("BODY".into()),
            cert_private_key: Some("KEY".into()),
            cert_chain: Some("CHAIN".into()),
            ..params()
        }
    }

    fn observed() -> Value {
        json!({"domainName": "api.example.com", "certificateName": "cert"})
    }

    #[tokio::test]
    async fn create_fails_without_the_full_certificate_bundle() {
        let gw = MockGateway::new().not_found("get_domain_name");

        let p = DomainNameParams {
            cert_name: Some("cert".into()),
            ..params()
        };
        let err = reconcile(&DomainNameModule::new(&p), &gw, false)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("certificate parameters"));
        assert!(gw.calls_for("create_domain_name").is_empty());
    }

    #[tokio::test]
    async fn missing_domain_is_created_with_all_cert_fields() {
        let gw = MockGateway::new()
            .not_found("get_domain_name")
            .returning("create_domain_name", observed());

        let p = with_certs();
        let outcome = reconcile(&DomainNameModule::new(&p), &gw, false)
            .await
            .unwrap();

        assert!(outcome.changed);
        assert_eq!(
            gw.calls_for("create_domain_name"),
            vec![json!({
                "domainName": "api.example.com",
                "certificateName": "cert",
                "certificateBody": "BODY",
                "certificatePrivateKey": "KEY",
                "certificateChain": "CHAIN",
            })]
        );
    }

    #[tokio::test]
    async fn non_404_lookup_errors_are_fatal() {
        let gw = MockGateway::new().failing(
            "get_domain_name",
            GatewayError::Api {
                status: 403,
                message: "denied".into(),
            },
        );

        let p = with_certs();
        assert!(reconcile(&DomainNameModule::new(&p), &gw, false)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn matching_certificate_name_is_a_no_op() {
        let gw = MockGateway::new().returning("get_domain_name", observed());

        let p = with_certs();
        let outcome = reconcile(&DomainNameModule::new(&p), &gw, false)
            .await
            .unwrap();

        assert!(!outcome.changed);
        assert!(gw.calls_for("update_domain_name").is_empty());
    }

    #[tokio::test]
    async fn drifted_certificate_name_is_patched() {
        let after = json!({"domainName": "api.example.com", "certificateName": "newcert"});
        let gw = MockGateway::new()
            .returning("get_domain_name", observed())
            .returning("update_domain_name", Value::Null)
            .returning("get_domain_name", after.clone());

        let p = DomainNameParams {
            cert_name: Some("newcert".into()),
            ..params()
        };
        let outcome = reconcile(&DomainNameModule::new(&p), &gw, false)
            .await
            .unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.object.unwrap(), after);
        assert_eq!(
            gw.calls_for("update_domain_name"),
            vec![json!({
                "domainName": "api.example.com",
                "patchOperations": [
                    {"op": "replace", "path": "/certificateName", "value": "newcert"},
                ],
            })]
        );
    }

    #[tokio::test]
    async fn check_mode_update_returns_pre_change_object() {
        let gw = MockGateway::new().returning("get_domain_name", observed());

        let p = DomainNameParams {
            cert_name: Some("newcert".into()),
            ..params()
        };
        let outcome = reconcile(&DomainNameModule::new(&p), &gw, true)
            .await
            .unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.object.unwrap(), observed());
        assert!(gw.calls_for("update_domain_name").is_empty());
    }

    #[tokio::test]
    async fn absent_domain_is_deleted_by_name() {
        let gw = MockGateway::new().returning("get_domain_name", observed());

        let p = DomainNameParams {
            state: TargetState::Absent,
            ..params()
        };
        let outcome = reconcile(&DomainNameModule::new(&p), &gw, false)
            .await
            .unwrap();

        assert!(outcome.changed);
        assert_eq!(
            gw.calls_for("delete_domain_name"),
            vec![json!({"domainName": "api.example.com"})]
        );
    }
}
