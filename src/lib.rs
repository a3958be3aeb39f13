//! Core library for the Tarmac ephemeral CI runner tool.
//!
//! The crate exposes a five-operation provider abstraction for cloud compute
//! and an AWS EC2 implementation that powers the runner lifecycle
//! (provision → wait for running → terminate).

pub mod config;
pub mod ec2;
pub mod provider;
pub mod runner;
pub mod user_data;

pub use config::{ConfigError, RunnerConfig};
pub use ec2::{Ec2Provider, Ec2ProviderError};
pub use provider::{
    AddressAllocation, ComputeProvider, LaunchRequest, LaunchRequestBuilder, NetworkInterfaceSpec,
    ProviderFuture, RequestError, ResourceTag,
};
pub use runner::{ASSOCIATION_ATTEMPTS, ASSOCIATION_RETRY_DELAY, LifecycleError, RunnerLifecycle};
pub use user_data::{BootScript, BootScriptError, RunnerRegistration};
