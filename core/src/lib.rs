//! gtfo-core: GitHub Token Factory (OIDC)
//!
//! Exchanges workload identity tokens for short-lived, scoped GitHub App
//! installation tokens. Requests are authorized by Rego policies kept in the
//! owner's policy repository and, optionally, in each requested repository.
//!
//! The crate talks to the outside world only through the traits in
//! [`platform`]; the server binary supplies the implementations.

pub mod config;
pub mod error;
pub mod github;
pub mod oidc;
pub mod platform;
pub mod policy;
pub mod sts;

#[cfg(test)]
pub mod test_support;
