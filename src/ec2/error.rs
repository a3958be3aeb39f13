//! Error types for the EC2 provider.

use thiserror::Error;

/// Errors raised by the EC2 provider.
#[derive(Debug, Error)]
pub enum Ec2ProviderError {
    /// Wrapper for EC2 API failures.
    #[error("EC2 API error: {0}")]
    Api(#[from] aws_sdk_ec2::Error),
    /// Raised when a create request returns without any instance.
    #[error("create-instance response contained no instances")]
    EmptyReservation,
    /// Raised when an association succeeds without reporting an id.
    #[error("association response for allocation {allocation_id} carried no association id")]
    MissingAssociationId {
        /// Allocation that was being associated.
        allocation_id: String,
    },
    /// Raised when an instance reaches a terminal state while waiting for
    /// it to start running.
    #[error("instance {instance_id} entered state {state} while waiting for running")]
    UnexpectedState {
        /// Provider instance identifier.
        instance_id: String,
        /// State reported by the provider.
        state: String,
    },
    /// Raised when the readiness wait exceeds its bound.
    #[error("timeout waiting for {action} on instance {instance_id}")]
    Timeout {
        /// Action being waited on.
        action: String,
        /// Provider instance identifier.
        instance_id: String,
    },
}

impl Ec2ProviderError {
    /// Converts any per-operation SDK error into the unified API variant.
    pub(in crate::ec2) fn from_sdk<E>(err: E) -> Self
    where
        aws_sdk_ec2::Error: From<E>,
    {
        Self::Api(aws_sdk_ec2::Error::from(err))
    }
}
