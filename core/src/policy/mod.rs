//! Rego token policies
//!
//! Policies live at `.github/tokens.rego` in the owner policy repository and,
//! optionally, in every requested repository.

mod document;
mod engine;
mod location;
mod resolve;

pub use document::{PolicyDocument, ALLOW_QUERY};
pub use engine::{decide, AuthorizationEngine};
pub use location::{PolicyLocation, POLICY_PATH};
pub use resolve::{PolicyResolver, PolicySource, ResolvedPolicies};
