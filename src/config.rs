//! Configuration loading via `ortho-config`.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::provider::{LaunchRequest, ResourceTag};

/// Runner provisioning configuration derived from environment variables,
/// configuration files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "TARMAC")]
pub struct RunnerConfig {
    /// Machine image (AMI) used to boot runner instances. Docker and git are
    /// expected to be pre-installed on the image.
    pub image_id: String,
    /// Instance size class for new runners.
    pub instance_type: String,
    /// AWS region the runner is provisioned in. Defaults to `us-east-1`.
    #[ortho_config(default = "us-east-1".to_owned())]
    pub region: String,
    /// IAM role attached to the instance via its instance profile.
    pub iam_role_name: String,
    /// Security group the runner's network interface joins.
    pub security_group_id: String,
    /// Explicit subnet for the runner's network interface. Only consulted
    /// when [`with_subnet`](Self::with_subnet) is set; otherwise the provider
    /// picks its default subnet.
    pub subnet_id: Option<String>,
    /// Whether to bind the network interface to [`subnet_id`](Self::subnet_id).
    #[ortho_config(default = false)]
    pub with_subnet: bool,
    /// Comma-separated pool of elastic-IP allocation ids. When set, the first
    /// unbound allocation is associated with the new instance.
    pub elastic_ip: Option<String>,
    /// Whether the boot script installs the latest runner agent release
    /// instead of reusing the agent pre-installed on the image.
    #[ortho_config(default = false)]
    pub update_runner: bool,
    /// Resource tags as a JSON array of key/value objects (both `key`/`value`
    /// and `Key`/`Value` spellings are accepted).
    pub resource_tags: Option<String>,
    /// Owner or organisation the runner registers under.
    pub github_owner: String,
    /// Identifier of a previously created instance, consumed by termination.
    pub instance_id: Option<String>,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl RunnerConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to tarmac.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("tarmac")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Returns the elastic-IP allocation pool, parsed from the
    /// comma-separated configuration value. `None` when no pool is
    /// configured or every entry is blank.
    #[must_use]
    pub fn allocation_pool(&self) -> Option<Vec<String>> {
        let raw = self.elastic_ip.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        let pool: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        if pool.is_empty() { None } else { Some(pool) }
    }

    /// Parses the configured resource tags.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTags`] when the value is not a JSON
    /// array of key/value objects.
    pub fn parsed_tags(&self) -> Result<Vec<ResourceTag>, ConfigError> {
        let Some(raw) = self.resource_tags.as_deref() else {
            return Ok(Vec::new());
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(trimmed).map_err(|err| ConfigError::InvalidTags(err.to_string()))
    }

    /// Builds a [`LaunchRequest`] from the configured values and an encoded
    /// boot script. The subnet binding is included only when
    /// [`with_subnet`](Self::with_subnet) is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation or tag parsing fails.
    pub fn as_launch_request(&self, user_data: String) -> Result<LaunchRequest, ConfigError> {
        self.validate()?;
        let subnet_id = if self.with_subnet {
            self.subnet_id.clone()
        } else {
            None
        };
        LaunchRequest::builder()
            .image_id(&self.image_id)
            .instance_type(&self.instance_type)
            .user_data(user_data)
            .iam_profile(&self.iam_role_name)
            .tags(self.parsed_tags()?)
            .security_group(&self.security_group_id)
            .subnet_id(subnet_id)
            .build()
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on required fields. Error messages include
    /// guidance on how to provide missing values via environment variables or
    /// configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.image_id,
            &FieldMetadata::new("machine image id", "TARMAC_IMAGE_ID", "image_id"),
        )?;
        Self::require_field(
            &self.instance_type,
            &FieldMetadata::new("instance type", "TARMAC_INSTANCE_TYPE", "instance_type"),
        )?;
        Self::require_field(
            &self.region,
            &FieldMetadata::new("AWS region", "TARMAC_REGION", "region"),
        )?;
        Self::require_field(
            &self.iam_role_name,
            &FieldMetadata::new("IAM role name", "TARMAC_IAM_ROLE_NAME", "iam_role_name"),
        )?;
        Self::require_field(
            &self.security_group_id,
            &FieldMetadata::new(
                "security group id",
                "TARMAC_SECURITY_GROUP_ID",
                "security_group_id",
            ),
        )?;
        Self::require_field(
            &self.github_owner,
            &FieldMetadata::new(
                "GitHub owner or organisation",
                "TARMAC_GITHUB_OWNER",
                "github_owner",
            ),
        )?;
        if self.with_subnet {
            Self::require_field(
                self.subnet_id.as_deref().unwrap_or_default(),
                &FieldMetadata::new("subnet id", "TARMAC_SUBNET_ID", "subnet_id"),
            )?;
        }
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// Indicates the resource-tag JSON could not be parsed.
    #[error("invalid resource tags: {0}")]
    InvalidTags(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
