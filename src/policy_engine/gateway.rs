//! HTTP gateway to the policy engine API.
//!
//! Each logical route maps to one GET request. The gateway performs exactly
//! one call per `send`; retrying is the fetcher's job.

use crate::config::PolicyEngineSettings;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Route parameter carrying the policy type name.
pub const POLICY_MODEL_NAME: &str = "policyModelName";
/// Route parameter carrying the policy type version.
pub const POLICY_MODEL_VERSION: &str = "policyModelVersion";

const POLICY_TYPES_PATH: &str = "/policy/api/v1/policytypes";

/// Logical routes exposed by the policy engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyRoute {
    ListAllPolicyTypes,
    GetOnePolicyModel,
}

impl PolicyRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyRoute::ListAllPolicyTypes => "list-all-policy-types",
            PolicyRoute::GetOnePolicyModel => "get-one-policy-model",
        }
    }
}

impl fmt::Display for PolicyRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named parameters attached to an outgoing request.
pub type RouteParams = BTreeMap<String, String>;

/// Status code and body of one policy engine response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: String,
}

impl GatewayResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request to policy engine failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("route {route} requires parameter {name}")]
    MissingParameter {
        route: PolicyRoute,
        name: &'static str,
    },

    #[error("response body could not be read: {0}")]
    MalformedBody(String),
}

/// A transport able to deliver one request to the policy engine.
pub trait PolicyEngineGateway: Send + Sync {
    fn send(
        &self,
        route: PolicyRoute,
        params: &RouteParams,
    ) -> Result<GatewayResponse, GatewayError>;
}

struct BasicAuth {
    user: String,
    password: String,
}

/// Blocking reqwest implementation of [`PolicyEngineGateway`].
pub struct HttpPolicyEngineGateway {
    client: Client,
    base_url: String,
    auth: Option<BasicAuth>,
}

impl HttpPolicyEngineGateway {
    /// Create a gateway for the engine at `base_url`.
    ///
    /// Must not be called from within an async runtime: the blocking client
    /// owns its own runtime.
    pub fn new(base_url: &str, settings: &PolicyEngineSettings) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_sec))
            .build()?;

        let auth = match (&settings.user, &settings.password) {
            (Some(user), Some(password)) => Some(BasicAuth {
                user: user.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn route_url(&self, route: PolicyRoute, params: &RouteParams) -> Result<String, GatewayError> {
        match route {
            PolicyRoute::ListAllPolicyTypes => Ok(format!("{}{}", self.base_url, POLICY_TYPES_PATH)),
            PolicyRoute::GetOnePolicyModel => {
                let name = required_param(route, params, POLICY_MODEL_NAME)?;
                let version = required_param(route, params, POLICY_MODEL_VERSION)?;
                Ok(format!(
                    "{}{}/{}/versions/{}",
                    self.base_url,
                    POLICY_TYPES_PATH,
                    urlencoding::encode(name),
                    urlencoding::encode(version)
                ))
            }
        }
    }
}

fn required_param<'a>(
    route: PolicyRoute,
    params: &'a RouteParams,
    name: &'static str,
) -> Result<&'a str, GatewayError> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or(GatewayError::MissingParameter { route, name })
}

impl PolicyEngineGateway for HttpPolicyEngineGateway {
    fn send(
        &self,
        route: PolicyRoute,
        params: &RouteParams,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = self.route_url(route, params)?;
        debug!("Policy engine request {} -> GET {}", route, url);

        let mut request = self.client.get(&url).header(ACCEPT, "application/yaml");
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.user, Some(&auth.password));
        }

        let response = request.send()?;
        let status = response.status().as_u16();
        if status != 200 {
            // The body of a failed call is only kept for diagnostics
            return Ok(GatewayResponse::new(
                status,
                response.text().unwrap_or_default(),
            ));
        }

        let body = response
            .text()
            .map_err(|e| GatewayError::MalformedBody(e.to_string()))?;
        Ok(GatewayResponse::new(status, body))
    }
}
