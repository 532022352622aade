//! Declarative management of AWS API Gateway resources.
//!
//! Each resource module compares desired parameters against the live
//! object fetched from the provider and issues the minimal create,
//! patch, or delete calls to converge, reporting `{changed, object}`.

pub mod aws;
pub mod gateway;
pub mod modules;
pub mod patch;
