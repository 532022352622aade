//! AWS Authentication
//!
//! Resolves credentials through the default provider chain (environment,
//! shared config files, container/instance metadata) and signs outgoing
//! requests with Signature Version 4.

use anyhow::{Context, Result};
use aws_credential_types::provider::ProvideCredentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use std::time::SystemTime;

/// Signing name of the API Gateway control-plane service.
pub const SERVICE: &str = "apigateway";

/// Fallback region when neither the CLI flag nor the AWS config chain
/// provides one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Resolved AWS credentials plus the region requests are signed for.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    credentials: aws_credential_types::Credentials,
    region: String,
}

impl AwsCredentials {
    /// Resolve credentials from the default provider chain.
    pub async fn resolve(region_override: Option<&str>) -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        let region = region_override
            .map(str::to_string)
            .or_else(|| config.region().map(|r| r.to_string()))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let provider = config.credentials_provider().context(
            "No AWS credentials configured. Set AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY \
             or configure a profile",
        )?;
        let credentials = provider
            .provide_credentials()
            .await
            .context("Failed to resolve AWS credentials")?;

        Ok(Self {
            credentials,
            region,
        })
    }

    /// Build credentials from a static key pair, bypassing the provider
    /// chain. Useful against local endpoints and in integration tests.
    pub fn from_static(access_key_id: &str, secret_access_key: &str, region: &str) -> Self {
        Self {
            credentials: aws_credential_types::Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "static",
            ),
            region: region.to_string(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Sign a request in place, adding the SigV4 authorization headers.
    pub fn sign_request(&self, request: &mut http::Request<Vec<u8>>) -> Result<()> {
        let identity = self.credentials.clone().into();
        let params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(SERVICE)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .context("Failed to build signing parameters")?;

        let signable = SignableRequest::new(
            request.method().as_str(),
            request.uri().to_string(),
            request
                .headers()
                .iter()
                .map(|(k, v)| (k.as_str(), std::str::from_utf8(v.as_bytes()).unwrap_or(""))),
            SignableBody::Bytes(request.body()),
        )
        .context("Failed to build signable request")?;

        let (instructions, _signature) = sign(signable, &params.into())
            .context("Failed to sign request")?
            .into_parts();
        instructions.apply_to_request_http1x(request);

        Ok(())
    }
}
