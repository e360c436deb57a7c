pub mod bundle;
pub mod context;
pub mod resource;

pub use bundle::{TenantBundle, TenantRules};
pub use context::{ClientCredentials, SwitchTarget};
pub use resource::{ObjectMeta, RuleGroup, RuleResource, TENANT_LABEL};
