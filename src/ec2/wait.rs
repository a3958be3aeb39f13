//! Readiness wait helpers for the EC2 provider.

use std::time::Instant;

use aws_sdk_ec2::types::InstanceStateName;
use tokio::time::sleep;

use super::{Ec2Provider, Ec2ProviderError};

impl Ec2Provider {
    /// Fetches the current state of an instance. A just-created instance can
    /// be briefly invisible to describe calls, so absence is reported as
    /// `None` rather than an error and the wait loop keeps polling.
    pub(in crate::ec2) async fn fetch_instance_state(
        &self,
        instance_id: &str,
    ) -> Result<Option<InstanceStateName>, Ec2ProviderError> {
        let response = self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(Ec2ProviderError::from_sdk)?;

        Ok(response
            .reservations()
            .iter()
            .flat_map(|reservation| reservation.instances())
            .find(|instance| instance.instance_id() == Some(instance_id))
            .and_then(|instance| instance.state())
            .and_then(|state| state.name())
            .cloned())
    }

    /// Polls until the instance reports a running state, bounded by the
    /// provider's wait timeout.
    pub(in crate::ec2) async fn poll_until_running(
        &self,
        instance_id: &str,
    ) -> Result<(), Ec2ProviderError> {
        let deadline = Instant::now() + self.wait_timeout;
        while Instant::now() <= deadline {
            match self.fetch_instance_state(instance_id).await? {
                Some(InstanceStateName::Running) => return Ok(()),
                Some(state) if is_terminal(&state) => {
                    return Err(Ec2ProviderError::UnexpectedState {
                        instance_id: instance_id.to_owned(),
                        state: state.as_str().to_owned(),
                    });
                }
                _ => sleep(self.poll_interval).await,
            }
        }

        Err(Ec2ProviderError::Timeout {
            action: "wait_until_running".to_owned(),
            instance_id: instance_id.to_owned(),
        })
    }
}

fn is_terminal(state: &InstanceStateName) -> bool {
    matches!(
        state,
        InstanceStateName::Terminated | InstanceStateName::ShuttingDown
    )
}
