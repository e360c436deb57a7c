use serde::{Deserialize, Serialize};
use std::fmt;

/// OIDC client-credentials
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

// secret 不进日志
impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// `obsctl context switch` 的目标格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchTarget {
    /// `<context>/<tenant>`
    #[default]
    ApiTenant,

    /// `<tenant>/<tenant>`
    TenantTenant,
}

impl SwitchTarget {
    pub fn render(&self, context_name: &str, tenant: &str) -> String {
        match self {
            SwitchTarget::ApiTenant => format!("{}/{}", context_name, tenant),
            SwitchTarget::TenantTenant => format!("{}/{}", tenant, tenant),
        }
    }
}

impl std::str::FromStr for SwitchTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api_tenant" => Ok(SwitchTarget::ApiTenant),
            "tenant_tenant" => Ok(SwitchTarget::TenantTenant),
            other => Err(format!(
                "unknown switch target `{}`; expected api_tenant or tenant_tenant",
                other
            )),
        }
    }
}
