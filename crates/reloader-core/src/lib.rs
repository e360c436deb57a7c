pub mod aggregator;
pub mod command;
pub mod error;
pub mod publisher;
pub mod session;
pub mod source;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::{aggregate_by_tenant, TenantAggregator};
pub use command::{CommandError, CommandOutput, CommandRunner, Invocation, ProcessRunner};
pub use error::{ReloaderError, Result};
pub use publisher::{CredentialStore, ObsctlClient, ObsctlPublisher, ObsctlSettings, TenantPublisher};
pub use session::TenantSession;
pub use source::{parse_rule_list, CliRuleSource, RuleSource};
pub use sync::{CycleReport, Reconciler, RunMode, Schedule, SyncLoop, TenantFailure};
