//! Prepared Rego policy documents

use serde_json::json;

use super::location::{PolicyLocation, POLICY_PATH};
use crate::error::{ApiError, Result};
use crate::oidc::Claims;
use crate::sts::TokenRequest;

/// Rule every policy document must define
pub const ALLOW_QUERY: &str = "data.tokens.allow";

/// A parsed policy ready for evaluation
#[derive(Clone)]
pub struct PolicyDocument {
    location: PolicyLocation,
    engine: regorus::Engine,
}

impl PolicyDocument {
    /// Parse the Rego source fetched from `location`
    pub fn compile(location: PolicyLocation, source: &str) -> Result<Self> {
        let mut engine = regorus::Engine::new();
        engine
            .add_policy(
                format!("{}/{}", location.full_name(), POLICY_PATH),
                source.to_string(),
            )
            .map_err(|e| {
                ApiError::policy_eval_failed(format!("parsing policy in {}: {}", location, e))
            })?;
        Ok(Self { location, engine })
    }

    pub fn location(&self) -> &PolicyLocation {
        &self.location
    }

    /// Evaluate `data.tokens.allow` for a request
    ///
    /// An undefined result denies, including a policy with no `allow` rule
    /// at all. A non-boolean result is an error.
    pub fn evaluate(&self, claims: &Claims, request: &TokenRequest) -> Result<bool> {
        let input = json!({
            "claims": claims,
            "repositories": request.repositories,
            "permissions": request.permissions,
        });
        let input = regorus::Value::from_json_str(&input.to_string())
            .map_err(|e| ApiError::internal(format!("building policy input: {}", e)))?;

        // Evaluation mutates engine state
        let mut engine = self.engine.clone();
        engine.set_input(input);

        let results = engine.eval_query(ALLOW_QUERY.to_string(), false).map_err(|e| {
            ApiError::policy_eval_failed(format!("evaluating policy in {}: {}", self.location, e))
        })?;
        let result = results
            .result
            .into_iter()
            .next()
            .and_then(|r| r.expressions.into_iter().next())
            .map(|expression| expression.value)
            .unwrap_or(regorus::Value::Undefined);

        match result {
            regorus::Value::Bool(allowed) => Ok(allowed),
            regorus::Value::Undefined => Ok(false),
            other => Err(ApiError::policy_eval_failed(format!(
                "policy in {} returned non-boolean allow: {:?}",
                self.location, other
            ))),
        }
    }
}

impl std::fmt::Debug for PolicyDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyDocument")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}
