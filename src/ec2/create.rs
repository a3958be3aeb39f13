//! Instance creation for the EC2 provider.
//!
//! The run-instances request pins min/max count to one: each provisioning
//! call leases exactly one runner instance, and the caller keeps the
//! returned identifier.

use aws_sdk_ec2::types::{
    IamInstanceProfileSpecification, InstanceNetworkInterfaceSpecification, InstanceType,
    ResourceType, Tag, TagSpecification,
};

use crate::provider::{LaunchRequest, NetworkInterfaceSpec, ResourceTag};

use super::{Ec2Provider, Ec2ProviderError};

impl Ec2Provider {
    /// Submits a run-instances request and returns the created instance's
    /// identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Ec2ProviderError::Api`] when the request fails and
    /// [`Ec2ProviderError::EmptyReservation`] when the provider accepts the
    /// request but reports no instance.
    pub(in crate::ec2) async fn run_one_instance(
        &self,
        request: &LaunchRequest,
    ) -> Result<String, Ec2ProviderError> {
        let mut call = self
            .client
            .run_instances()
            .image_id(&request.image_id)
            .instance_type(InstanceType::from(request.instance_type.as_str()))
            .min_count(1)
            .max_count(1)
            .user_data(&request.user_data)
            .iam_instance_profile(
                IamInstanceProfileSpecification::builder()
                    .name(&request.iam_profile)
                    .build(),
            )
            .network_interfaces(network_interface(&request.network));

        if let Some(tags) = tag_specifications(&request.tags) {
            call = call.tag_specifications(tags);
        }

        let response = call.send().await.map_err(Ec2ProviderError::from_sdk)?;
        response
            .instances()
            .first()
            .and_then(|instance| instance.instance_id().map(ToOwned::to_owned))
            .ok_or(Ec2ProviderError::EmptyReservation)
    }
}

fn network_interface(spec: &NetworkInterfaceSpec) -> InstanceNetworkInterfaceSpecification {
    InstanceNetworkInterfaceSpecification::builder()
        .device_index(spec.device_index)
        .delete_on_termination(spec.delete_on_termination)
        .associate_public_ip_address(spec.associate_public_ip)
        .set_groups(Some(spec.security_group_ids.clone()))
        .set_subnet_id(spec.subnet_id.clone())
        .build()
}

fn tag_specifications(tags: &[ResourceTag]) -> Option<TagSpecification> {
    if tags.is_empty() {
        return None;
    }
    Some(
        TagSpecification::builder()
            .resource_type(ResourceType::Instance)
            .set_tags(Some(
                tags.iter()
                    .map(|tag| Tag::builder().key(&tag.key).value(&tag.value).build())
                    .collect(),
            ))
            .build(),
    )
}
