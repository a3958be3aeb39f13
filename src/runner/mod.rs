//! Orchestrates the ephemeral runner lifecycle.
//!
//! The lifecycle is externally driven and strictly sequential: a caller
//! provisions an instance, waits for it to reach a running state, runs its
//! workload, then terminates the instance. The three operations share no
//! state beyond the instance identifier the caller carries between them, and
//! none of them is safe to retry blindly — re-provisioning creates a second
//! instance.

use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::{ConfigError, RunnerConfig};
use crate::provider::{AddressAllocation, ComputeProvider};
use crate::user_data::{BootScript, BootScriptError, RunnerRegistration};

/// Total elastic-IP association attempts before giving up.
pub const ASSOCIATION_ATTEMPTS: u32 = 10;
/// Fixed pause between elastic-IP association attempts.
pub const ASSOCIATION_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Errors surfaced while driving the runner lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError<ProviderError>
where
    ProviderError: std::error::Error + 'static,
{
    /// Raised when the boot script cannot be assembled from the inputs.
    #[error("invalid runner registration: {0}")]
    BootScript(#[from] BootScriptError),
    /// Raised when configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Raised when the create-instance call fails; no instance was created.
    #[error("failed to start instance: {0}")]
    Provision(#[source] ProviderError),
    /// Raised when the elastic-IP allocation state cannot be queried.
    #[error("failed to query elastic IP allocations: {0}")]
    AddressLookup(#[source] ProviderError),
    /// Raised when every allocation in the pool is already bound.
    #[error("no free elastic IP among allocation ids: {}", pool.join(", "))]
    NoFreeAddress {
        /// Allocation ids that were considered.
        pool: Vec<String>,
    },
    /// Raised when every association attempt failed. The instance was
    /// already created and keeps running as an orphan; cleanup is the
    /// caller's responsibility.
    #[error("failed to associate elastic IP after {attempts} attempts: {source}")]
    AssociationFailed {
        /// Number of attempts made.
        attempts: u32,
        /// Error returned by the final attempt.
        #[source]
        source: ProviderError,
    },
    /// Raised when the instance did not reach a running state in time.
    #[error("instance {instance_id} initialization error: {source}")]
    Initialization {
        /// Provider instance identifier.
        instance_id: String,
        /// Provider-specific error.
        #[source]
        source: ProviderError,
    },
    /// Raised when the terminate request fails; the instance may still
    /// exist.
    #[error("instance {instance_id} termination error: {source}")]
    Terminate {
        /// Provider instance identifier.
        instance_id: String,
        /// Provider-specific error.
        #[source]
        source: ProviderError,
    },
    /// Raised when termination is requested but no instance id is
    /// configured.
    #[error("no instance id configured for termination")]
    MissingInstanceId,
}

/// Drives provisioning, readiness, and termination against a provider.
#[derive(Debug)]
pub struct RunnerLifecycle<P> {
    provider: P,
    config: RunnerConfig,
    association_attempts: u32,
    association_retry_delay: Duration,
}

impl<P> RunnerLifecycle<P>
where
    P: ComputeProvider,
{
    /// Creates a new lifecycle over the given provider and configuration.
    #[must_use]
    pub const fn new(provider: P, config: RunnerConfig) -> Self {
        Self {
            provider,
            config,
            association_attempts: ASSOCIATION_ATTEMPTS,
            association_retry_delay: ASSOCIATION_RETRY_DELAY,
        }
    }

    /// Overrides the association attempt budget.
    ///
    /// This is primarily used by tests to keep retry scenarios fast.
    #[must_use]
    pub const fn with_association_attempts(mut self, attempts: u32) -> Self {
        self.association_attempts = attempts;
        self
    }

    /// Overrides the pause between association attempts.
    ///
    /// This is primarily used by tests to keep retry scenarios fast.
    #[must_use]
    pub const fn with_association_retry_delay(mut self, delay: Duration) -> Self {
        self.association_retry_delay = delay;
        self
    }

    /// Provisions one runner instance and returns its identifier.
    ///
    /// The boot script embeds `label` and `token` verbatim (see
    /// [`crate::user_data`] for the trust boundary). When an elastic-IP pool
    /// is configured, the first free allocation is associated with the new
    /// instance; an association failure propagates even though the instance
    /// is already running, leaving it for external cleanup.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] when input validation, instance creation,
    /// or elastic-IP association fails.
    pub async fn provision(
        &self,
        label: &str,
        token: &str,
    ) -> Result<String, LifecycleError<P::Error>> {
        let registration = RunnerRegistration {
            owner: self.config.github_owner.clone(),
            token: token.to_owned(),
            label: label.to_owned(),
        };
        let script = BootScript::build(&registration, self.config.update_runner)?;
        let request = self.config.as_launch_request(script.encoded())?;

        info!(label, "starting runner instance");
        let instance_id = self
            .provider
            .create_instance(&request)
            .await
            .map_err(|err| {
                error!(error = %err, "instance creation failed");
                LifecycleError::Provision(err)
            })?;
        info!(%instance_id, "instance started");

        if let Some(pool) = self.config.allocation_pool() {
            self.associate_elastic_ip(&pool, &instance_id).await?;
        }

        Ok(instance_id)
    }

    /// Blocks until the instance reports a running state.
    ///
    /// This is a synchronisation barrier: success carries no data, and on
    /// failure the instance is left as-is for the caller to clean up.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Initialization`] carrying the instance id
    /// when the provider wait times out or errors.
    pub async fn await_ready(&self, instance_id: &str) -> Result<(), LifecycleError<P::Error>> {
        info!(%instance_id, "waiting for instance to become ready");
        self.provider
            .wait_until_running(instance_id)
            .await
            .map_err(|source| {
                error!(%instance_id, error = %source, "instance initialization failed");
                LifecycleError::Initialization {
                    instance_id: instance_id.to_owned(),
                    source,
                }
            })?;
        info!(%instance_id, "instance is up and running");
        Ok(())
    }

    /// Requests termination of the configured instance.
    ///
    /// The instance id comes from configuration state, not a parameter.
    /// Termination is fire-and-forget: the call returns once the provider
    /// accepts the request.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::MissingInstanceId`] when no instance id is
    /// configured, or [`LifecycleError::Terminate`] when the provider call
    /// fails.
    pub async fn terminate(&self) -> Result<(), LifecycleError<P::Error>> {
        let instance_id = self
            .config
            .instance_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(LifecycleError::MissingInstanceId)?;

        info!(%instance_id, "terminating instance");
        self.provider
            .terminate_instance(instance_id)
            .await
            .map_err(|source| {
                error!(%instance_id, error = %source, "instance termination failed");
                LifecycleError::Terminate {
                    instance_id: instance_id.to_owned(),
                    source,
                }
            })?;
        info!(%instance_id, "instance termination requested");
        Ok(())
    }

    async fn associate_elastic_ip(
        &self,
        pool: &[String],
        instance_id: &str,
    ) -> Result<(), LifecycleError<P::Error>> {
        info!("searching for a free elastic IP");
        let allocations = self
            .provider
            .describe_addresses(pool)
            .await
            .map_err(|err| {
                error!(error = %err, "elastic IP lookup failed");
                LifecycleError::AddressLookup(err)
            })?;

        let free = allocations
            .into_iter()
            .find(AddressAllocation::is_free)
            .ok_or_else(|| {
                error!("no free elastic IP in the configured pool");
                LifecycleError::NoFreeAddress {
                    pool: pool.to_vec(),
                }
            })?;
        info!(
            allocation_id = %free.allocation_id,
            public_ip = free.public_ip.as_deref().unwrap_or("unknown"),
            "free elastic IP found"
        );

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .provider
                .associate_address(&free.allocation_id, instance_id)
                .await
            {
                Ok(association_id) => {
                    info!(%association_id, "elastic IP associated with instance");
                    return Ok(());
                }
                Err(err) if attempt >= self.association_attempts => {
                    error!(attempt, error = %err, "elastic IP association failed");
                    return Err(LifecycleError::AssociationFailed {
                        attempts: attempt,
                        source: err,
                    });
                }
                Err(err) => {
                    warn!(attempt, error = %err, "could not associate elastic IP, retrying");
                    sleep(self.association_retry_delay).await;
                }
            }
        }
    }
}
