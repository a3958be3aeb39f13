//! Provider abstraction for provisioning disposable CI runner instances.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Device index of the primary network interface.
pub const PRIMARY_DEVICE_INDEX: i32 = 0;

/// Parameters required to launch a new runner instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LaunchRequest {
    /// Machine image identifier (for example an AMI id).
    pub image_id: String,
    /// Instance size class to request (for example `t3.medium`).
    pub instance_type: String,
    /// Base64-encoded boot script delivered as provider user data.
    pub user_data: String,
    /// Instance-profile name granting the runner its IAM role.
    pub iam_profile: String,
    /// Resource tags applied to the created instance.
    pub tags: Vec<ResourceTag>,
    /// Descriptor for the instance's single network interface.
    pub network: NetworkInterfaceSpec,
}

impl LaunchRequest {
    /// Starts a builder for a [`LaunchRequest`].
    #[must_use]
    pub fn builder() -> LaunchRequestBuilder {
        LaunchRequestBuilder::new()
    }

    /// Validates the request, returning a descriptive error when a required
    /// field is missing.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] when any required field is empty.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.image_id.is_empty() {
            return Err(RequestError::Validation("image_id".to_owned()));
        }
        if self.instance_type.is_empty() {
            return Err(RequestError::Validation("instance_type".to_owned()));
        }
        if self.user_data.is_empty() {
            return Err(RequestError::Validation("user_data".to_owned()));
        }
        if self.iam_profile.is_empty() {
            return Err(RequestError::Validation("iam_profile".to_owned()));
        }
        if self.network.security_group_ids.is_empty() {
            return Err(RequestError::Validation("security_group_ids".to_owned()));
        }
        Ok(())
    }
}

/// Builder for [`LaunchRequest`] that defers trimming and validation to
/// construction.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LaunchRequestBuilder {
    image_id: String,
    instance_type: String,
    user_data: String,
    iam_profile: String,
    tags: Vec<ResourceTag>,
    security_group_ids: Vec<String>,
    subnet_id: Option<String>,
}

impl LaunchRequestBuilder {
    /// Creates an empty builder; fields must be populated before build.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the machine image identifier.
    #[must_use]
    pub fn image_id(mut self, value: impl Into<String>) -> Self {
        self.image_id = value.into();
        self
    }

    /// Sets the instance size class.
    #[must_use]
    pub fn instance_type(mut self, value: impl Into<String>) -> Self {
        self.instance_type = value.into();
        self
    }

    /// Sets the base64-encoded boot script.
    #[must_use]
    pub fn user_data(mut self, value: impl Into<String>) -> Self {
        self.user_data = value.into();
        self
    }

    /// Sets the instance-profile name.
    #[must_use]
    pub fn iam_profile(mut self, value: impl Into<String>) -> Self {
        self.iam_profile = value.into();
        self
    }

    /// Sets the resource tags.
    #[must_use]
    pub fn tags(mut self, value: Vec<ResourceTag>) -> Self {
        self.tags = value;
        self
    }

    /// Adds a security group to the primary interface.
    #[must_use]
    pub fn security_group(mut self, value: impl Into<String>) -> Self {
        self.security_group_ids.push(value.into());
        self
    }

    /// Sets the optional subnet binding on the primary interface.
    #[must_use]
    pub fn subnet_id(mut self, value: Option<String>) -> Self {
        self.subnet_id = value;
        self
    }

    /// Builds and validates the [`LaunchRequest`], trimming string inputs.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] when any required field is empty.
    pub fn build(self) -> Result<LaunchRequest, RequestError> {
        let request = LaunchRequest {
            image_id: self.image_id.trim().to_owned(),
            instance_type: self.instance_type.trim().to_owned(),
            user_data: self.user_data.trim().to_owned(),
            iam_profile: self.iam_profile.trim().to_owned(),
            tags: self.tags,
            network: NetworkInterfaceSpec::primary(
                self.security_group_ids
                    .into_iter()
                    .map(|id| id.trim().to_owned())
                    .filter(|id| !id.is_empty())
                    .collect(),
                self.subnet_id.map(|id| id.trim().to_owned()),
            ),
        };
        request.validate()?;
        Ok(request)
    }
}

/// Key/value tag applied to created provider resources.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ResourceTag {
    /// Tag key.
    #[serde(alias = "Key")]
    pub key: String,
    /// Tag value.
    #[serde(alias = "Value")]
    pub value: String,
}

/// Descriptor for the single network interface attached at launch.
///
/// Exactly one interface is requested, always at device index 0, always
/// deleted with the instance, always with a public IP association. Only the
/// group membership and the optional subnet binding vary per deployment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkInterfaceSpec {
    /// Attachment index; always [`PRIMARY_DEVICE_INDEX`].
    pub device_index: i32,
    /// Whether the interface is deleted when the instance terminates.
    pub delete_on_termination: bool,
    /// Whether the provider assigns a public IP at launch.
    pub associate_public_ip: bool,
    /// Security groups the interface joins.
    pub security_group_ids: Vec<String>,
    /// Explicit subnet binding; `None` lets the provider pick its default
    /// subnet.
    pub subnet_id: Option<String>,
}

impl NetworkInterfaceSpec {
    /// Builds the primary-interface descriptor used by every launch.
    #[must_use]
    pub const fn primary(security_group_ids: Vec<String>, subnet_id: Option<String>) -> Self {
        Self {
            device_index: PRIMARY_DEVICE_INDEX,
            delete_on_termination: true,
            associate_public_ip: true,
            security_group_ids,
            subnet_id,
        }
    }
}

/// Live state of one floating-IP allocation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AddressAllocation {
    /// Provider allocation identifier.
    pub allocation_id: String,
    /// Public address held by the allocation, when reported.
    pub public_ip: Option<String>,
    /// Instance currently bound to the allocation, if any.
    pub instance_id: Option<String>,
}

impl AddressAllocation {
    /// Returns true when the allocation is not bound to any instance.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.instance_id.is_none()
    }
}

/// Errors raised while assembling a [`LaunchRequest`].
#[derive(Debug, Error, Eq, PartialEq)]
pub enum RequestError {
    /// Raised when a request is missing a required field.
    #[error("missing or empty field: {0}")]
    Validation(String),
}

/// Future returned by provider operations.
pub type ProviderFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Capability interface implemented by cloud compute providers.
///
/// These five operations are the adapter's entire outbound surface; any
/// provider with equivalent primitives satisfies the contract, and tests
/// substitute fakes.
pub trait ComputeProvider {
    /// Provider specific error type returned by each operation.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Creates exactly one instance and returns its identifier.
    fn create_instance<'a>(
        &'a self,
        request: &'a LaunchRequest,
    ) -> ProviderFuture<'a, String, Self::Error>;

    /// Reports the current binding state of the given floating-IP
    /// allocations.
    fn describe_addresses<'a>(
        &'a self,
        allocation_ids: &'a [String],
    ) -> ProviderFuture<'a, Vec<AddressAllocation>, Self::Error>;

    /// Binds one allocation to one instance and returns the association
    /// identifier.
    fn associate_address<'a>(
        &'a self,
        allocation_id: &'a str,
        instance_id: &'a str,
    ) -> ProviderFuture<'a, String, Self::Error>;

    /// Blocks until the instance reaches a running state, bounded by the
    /// provider's wait timeout.
    fn wait_until_running<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> ProviderFuture<'a, (), Self::Error>;

    /// Requests deletion of the instance. Fire-and-forget: returns once the
    /// provider accepts the request, without waiting for the instance to be
    /// gone.
    fn terminate_instance<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> ProviderFuture<'a, (), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> LaunchRequestBuilder {
        LaunchRequest::builder()
            .image_id("ami-0abc")
            .instance_type("t3.medium")
            .user_data("IyEvYmluL2Jhc2g=")
            .iam_profile("ci-runner")
            .security_group("sg-123")
    }

    #[test]
    fn build_produces_primary_interface_invariants() {
        let request = base_builder()
            .build()
            .unwrap_or_else(|err| panic!("build: {err}"));

        assert_eq!(request.network.device_index, PRIMARY_DEVICE_INDEX);
        assert!(request.network.delete_on_termination);
        assert!(request.network.associate_public_ip);
        assert_eq!(request.network.security_group_ids, vec!["sg-123"]);
        assert_eq!(request.network.subnet_id, None);
    }

    #[test]
    fn build_carries_subnet_binding_when_given() {
        let request = base_builder()
            .subnet_id(Some(String::from(" subnet-9 ")))
            .build()
            .unwrap_or_else(|err| panic!("build: {err}"));

        assert_eq!(request.network.subnet_id.as_deref(), Some("subnet-9"));
    }

    #[test]
    fn build_rejects_missing_image() {
        let err = base_builder()
            .image_id("  ")
            .build()
            .expect_err("blank image id should fail validation");

        assert_eq!(err, RequestError::Validation(String::from("image_id")));
    }

    #[test]
    fn build_rejects_missing_security_groups() {
        let err = LaunchRequest::builder()
            .image_id("ami-0abc")
            .instance_type("t3.medium")
            .user_data("IyEvYmluL2Jhc2g=")
            .iam_profile("ci-runner")
            .build()
            .expect_err("no security group should fail validation");

        assert_eq!(
            err,
            RequestError::Validation(String::from("security_group_ids"))
        );
    }

    #[test]
    fn free_allocation_has_no_bound_instance() {
        let free = AddressAllocation {
            allocation_id: String::from("eipalloc-1"),
            public_ip: Some(String::from("203.0.113.7")),
            instance_id: None,
        };
        let bound = AddressAllocation {
            instance_id: Some(String::from("i-1")),
            ..free.clone()
        };

        assert!(free.is_free());
        assert!(!bound.is_free());
    }
}
