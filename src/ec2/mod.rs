//! AWS EC2 implementation of the compute provider capability.

mod address;
mod create;
mod error;
mod wait;

use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_sdk_ec2::Client;
use aws_types::region::Region;

use crate::provider::{AddressAllocation, ComputeProvider, LaunchRequest, ProviderFuture};

pub use error::Ec2ProviderError;

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const WAIT_TIMEOUT: Duration = Duration::from_secs(240);

/// Provider that provisions runner instances through the EC2 API.
#[derive(Clone, Debug)]
pub struct Ec2Provider {
    client: Client,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl Ec2Provider {
    /// Constructs a provider from ambient AWS credentials for the given
    /// region.
    pub async fn from_env(region: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.into()))
            .load()
            .await;
        Self::with_client(Client::new(&config))
    }

    /// Constructs a provider over an existing EC2 client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            poll_interval: POLL_INTERVAL,
            wait_timeout: WAIT_TIMEOUT,
        }
    }

    /// Overrides the readiness poll interval.
    ///
    /// This is primarily used by tests to keep timeout scenarios fast.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides the overall readiness wait bound.
    ///
    /// This is primarily used by tests to keep timeout scenarios fast.
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }
}

impl ComputeProvider for Ec2Provider {
    type Error = Ec2ProviderError;

    fn create_instance<'a>(
        &'a self,
        request: &'a LaunchRequest,
    ) -> ProviderFuture<'a, String, Self::Error> {
        Box::pin(async move { self.run_one_instance(request).await })
    }

    fn describe_addresses<'a>(
        &'a self,
        allocation_ids: &'a [String],
    ) -> ProviderFuture<'a, Vec<AddressAllocation>, Self::Error> {
        Box::pin(async move { self.describe_address_pool(allocation_ids).await })
    }

    fn associate_address<'a>(
        &'a self,
        allocation_id: &'a str,
        instance_id: &'a str,
    ) -> ProviderFuture<'a, String, Self::Error> {
        Box::pin(async move { self.associate(allocation_id, instance_id).await })
    }

    fn wait_until_running<'a>(&'a self, instance_id: &'a str) -> ProviderFuture<'a, (), Self::Error> {
        Box::pin(async move { self.poll_until_running(instance_id).await })
    }

    fn terminate_instance<'a>(&'a self, instance_id: &'a str) -> ProviderFuture<'a, (), Self::Error> {
        Box::pin(async move {
            self.client
                .terminate_instances()
                .instance_ids(instance_id)
                .send()
                .await
                .map_err(Ec2ProviderError::from_sdk)?;
            Ok(())
        })
    }
}
