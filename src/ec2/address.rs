//! Elastic-IP lookup and association for the EC2 provider.

use crate::provider::AddressAllocation;

use super::{Ec2Provider, Ec2ProviderError};

impl Ec2Provider {
    /// Reports the live binding state of the given allocation ids.
    pub(in crate::ec2) async fn describe_address_pool(
        &self,
        allocation_ids: &[String],
    ) -> Result<Vec<AddressAllocation>, Ec2ProviderError> {
        let response = self
            .client
            .describe_addresses()
            .set_allocation_ids(Some(allocation_ids.to_vec()))
            .send()
            .await
            .map_err(Ec2ProviderError::from_sdk)?;

        Ok(response
            .addresses()
            .iter()
            .filter_map(|address| {
                address.allocation_id().map(|id| AddressAllocation {
                    allocation_id: id.to_owned(),
                    public_ip: address.public_ip().map(ToOwned::to_owned),
                    instance_id: address.instance_id().map(ToOwned::to_owned),
                })
            })
            .collect())
    }

    /// Binds one allocation to one instance. Despite the idempotent-looking
    /// name, the provider call mutates allocation state and can fail while
    /// the instance is still attaching its interface; the caller retries.
    pub(in crate::ec2) async fn associate(
        &self,
        allocation_id: &str,
        instance_id: &str,
    ) -> Result<String, Ec2ProviderError> {
        let response = self
            .client
            .associate_address()
            .allocation_id(allocation_id)
            .instance_id(instance_id)
            .send()
            .await
            .map_err(Ec2ProviderError::from_sdk)?;

        response
            .association_id()
            .map(ToOwned::to_owned)
            .ok_or_else(|| Ec2ProviderError::MissingAssociationId {
                allocation_id: allocation_id.to_owned(),
            })
    }
}
