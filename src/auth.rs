//! # Organization Context
//!
//! Requests reach the catalog through a gateway that has already validated the
//! caller's identity. The gateway forwards the organization in `X-Org-Id` and,
//! when known, the acting user in `X-User`.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::error::{ApiError, validation_error};

pub const ORG_ID_HEADER: &str = "X-Org-Id";
pub const USER_HEADER: &str = "X-User";

/// Caller identity extracted from the gateway headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgContext {
    pub org_id: String,
    /// Audit name of the acting user
    pub user: Option<String>,
}

/// OpenAPI header parameters identifying the caller
#[derive(Debug, Serialize, Deserialize, IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Header)]
pub struct OrgHeaders {
    /// Organization the request acts on
    #[serde(rename = "X-Org-Id")]
    #[param(rename = "X-Org-Id")]
    pub org_id: String,
    /// Acting user recorded on writes
    #[serde(rename = "X-User")]
    #[param(rename = "X-User")]
    pub user: Option<String>,
}

impl<S> FromRequestParts<S> for OrgContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let org_id = parts
            .headers
            .get(ORG_ID_HEADER)
            .ok_or_else(|| {
                validation_error(
                    "Missing required header",
                    serde_json::json!({ ORG_ID_HEADER: "Required header is missing" }),
                )
            })?
            .to_str()
            .map_err(|_| {
                validation_error(
                    "Invalid organization header",
                    serde_json::json!({ ORG_ID_HEADER: "Header must be valid UTF-8" }),
                )
            })?
            .trim()
            .to_string();

        if org_id.is_empty() {
            return Err(validation_error(
                "Invalid organization header",
                serde_json::json!({ ORG_ID_HEADER: "Header must not be empty" }),
            ));
        }

        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(Self { org_id, user })
    }
}
