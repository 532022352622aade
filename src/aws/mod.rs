//! AWS provider layer
//!
//! Credential resolution and SigV4 signing ([`auth`]), the signed HTTP
//! wrapper ([`http`]), and the API Gateway REST client ([`client`]).

pub mod auth;
pub mod client;
pub mod http;

pub use auth::AwsCredentials;
pub use client::ApiGatewayClient;
