//! Boot-script templating for runner instances.
//!
//! The boot script runs as root on the instance's first boot and registers
//! the machine as a CI runner. Registration values (owner, token, label) are
//! interpolated into the script verbatim: no escaping is applied, so callers
//! must guarantee the values contain no shell metacharacters. The script is
//! exposed line-by-line so tests can verify it structurally instead of
//! matching one concatenated command line.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Working directory the runner agent is installed into.
const RUNNER_HOME: &str = "/actions-runner";

/// Identity used to register a runner with the orchestration service.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunnerRegistration {
    /// Owner or organisation the runner registers under; forms the
    /// registration URL `https://github.com/<owner>`.
    pub owner: String,
    /// One-time registration token binding the runner to a job run.
    pub token: String,
    /// Label used to target the runner from a workflow.
    pub label: String,
}

impl RunnerRegistration {
    /// Validates that every registration value is present.
    ///
    /// # Errors
    ///
    /// Returns [`BootScriptError`] naming the first empty value.
    pub fn validate(&self) -> Result<(), BootScriptError> {
        if self.owner.trim().is_empty() {
            return Err(BootScriptError::EmptyOwner);
        }
        if self.token.trim().is_empty() {
            return Err(BootScriptError::EmptyToken);
        }
        if self.label.trim().is_empty() {
            return Err(BootScriptError::EmptyLabel);
        }
        Ok(())
    }

    fn register_and_start(&self) -> Vec<String> {
        vec![
            String::from("export RUNNER_ALLOW_RUNASROOT=1"),
            format!(
                "./config.sh --url https://github.com/{} --token {} --labels {}",
                self.owner, self.token, self.label
            ),
            String::from("./run.sh"),
        ]
    }
}

/// Shell program delivered to the provider as instance user data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BootScript {
    lines: Vec<String>,
}

impl BootScript {
    /// Assembles the boot script for a registration.
    ///
    /// With `update_runner` set, the script installs the latest runner agent
    /// release before registering; otherwise it clears prior registration
    /// state and reuses the agent pre-installed on the image.
    ///
    /// # Errors
    ///
    /// Returns [`BootScriptError`] when any registration value is empty.
    pub fn build(
        registration: &RunnerRegistration,
        update_runner: bool,
    ) -> Result<Self, BootScriptError> {
        registration.validate()?;

        let mut lines = vec![String::from("#!/bin/bash")];
        if update_runner {
            lines.push(format!(
                "mkdir -p {RUNNER_HOME} && cd {RUNNER_HOME} && rm -f .runner"
            ));
            lines.push(String::from("apt-get -y update && apt-get install -y jq"));
            lines.push(String::from(
                "case $(uname -m) in aarch64) ARCH=\"arm64\" ;; amd64|x86_64) ARCH=\"x64\" ;; esac && export RUNNER_ARCH=${ARCH}",
            ));
            lines.push(String::from(
                "export RUNNER_VERSION=$(curl -s -X GET 'https://api.github.com/repos/actions/runner/releases/latest' | jq -r '.tag_name' | sed s/v//)",
            ));
            lines.push(String::from(
                "curl -O -L https://github.com/actions/runner/releases/download/v${RUNNER_VERSION}/actions-runner-linux-${RUNNER_ARCH}-${RUNNER_VERSION}.tar.gz",
            ));
            lines.push(String::from(
                "tar xzf ./actions-runner-linux-${RUNNER_ARCH}-${RUNNER_VERSION}.tar.gz",
            ));
        } else {
            lines.push(format!("cd {RUNNER_HOME} && rm -f .runner"));
        }
        lines.extend(registration.register_and_start());

        Ok(Self { lines })
    }

    /// Returns the script's shell directives in execution order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Renders the script as a newline-joined shell program.
    #[must_use]
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    /// Returns the base64 transport form required by the provider.
    #[must_use]
    pub fn encoded(&self) -> String {
        STANDARD.encode(self.render())
    }
}

/// Errors raised while assembling a boot script.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum BootScriptError {
    /// Raised when the owner/organisation identity is empty.
    #[error("runner registration owner must not be empty")]
    EmptyOwner,
    /// Raised when the registration token is empty.
    #[error("runner registration token must not be empty")]
    EmptyToken,
    /// Raised when the runner label is empty.
    #[error("runner label must not be empty")]
    EmptyLabel,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn registration() -> RunnerRegistration {
        RunnerRegistration {
            owner: String::from("acme"),
            token: String::from("AARGH123"),
            label: String::from("job-42"),
        }
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn script_registers_with_exact_label_and_token(#[case] update_runner: bool) {
        let script = BootScript::build(&registration(), update_runner)
            .unwrap_or_else(|err| panic!("build: {err}"));

        let register_line = "./config.sh --url https://github.com/acme --token AARGH123 --labels job-42";
        assert!(
            script.lines().iter().any(|line| line == register_line),
            "registration line missing from: {script:?}"
        );
        assert_eq!(script.lines().first().map(String::as_str), Some("#!/bin/bash"));
        assert_eq!(script.lines().last().map(String::as_str), Some("./run.sh"));
    }

    #[test]
    fn update_variant_installs_the_agent() {
        let script = BootScript::build(&registration(), true)
            .unwrap_or_else(|err| panic!("build: {err}"));
        let rendered = script.render();

        assert!(rendered.contains("apt-get install -y jq"));
        assert!(rendered.contains("export RUNNER_ARCH=${ARCH}"));
        assert!(rendered.contains("actions-runner-linux-${RUNNER_ARCH}-${RUNNER_VERSION}.tar.gz"));
        assert!(rendered.contains("mkdir -p /actions-runner"));
    }

    #[test]
    fn reuse_variant_only_reregisters() {
        let script = BootScript::build(&registration(), false)
            .unwrap_or_else(|err| panic!("build: {err}"));
        let rendered = script.render();

        assert!(rendered.contains("cd /actions-runner && rm -f .runner"));
        assert!(!rendered.contains("apt-get"));
        assert!(!rendered.contains("curl"));
        assert!(!rendered.contains("tar xzf"));
    }

    #[test]
    fn values_are_embedded_verbatim() {
        let tricky = RunnerRegistration {
            owner: String::from("acme"),
            token: String::from("tok_en-1.2=3"),
            label: String::from("gpu,large"),
        };
        let script =
            BootScript::build(&tricky, false).unwrap_or_else(|err| panic!("build: {err}"));

        assert!(
            script
                .render()
                .contains("--token tok_en-1.2=3 --labels gpu,large")
        );
    }

    #[rstest]
    #[case(RunnerRegistration { owner: String::new(), ..registration() }, BootScriptError::EmptyOwner)]
    #[case(RunnerRegistration { token: String::from("  "), ..registration() }, BootScriptError::EmptyToken)]
    #[case(RunnerRegistration { label: String::new(), ..registration() }, BootScriptError::EmptyLabel)]
    fn empty_values_are_rejected(
        #[case] invalid: RunnerRegistration,
        #[case] expected: BootScriptError,
    ) {
        let err = BootScript::build(&invalid, true).expect_err("empty value should fail");
        assert_eq!(err, expected);
    }

    #[test]
    fn encoded_form_is_base64_of_rendered_script() {
        let script = BootScript::build(&registration(), false)
            .unwrap_or_else(|err| panic!("build: {err}"));
        let decoded = STANDARD
            .decode(script.encoded())
            .unwrap_or_else(|err| panic!("decode: {err}"));

        assert_eq!(decoded, script.render().into_bytes());
    }
}
