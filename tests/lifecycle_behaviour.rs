//! Behavioural tests driving the full provision → ready → terminate flow
//! through the crate's public surface with a fake provider.

use std::sync::{Arc, Mutex, MutexGuard};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rstest::{fixture, rstest};
use thiserror::Error;

use tarmac::{
    AddressAllocation, ComputeProvider, LaunchRequest, ProviderFuture, RunnerConfig,
    RunnerLifecycle,
};

#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{0}")]
struct StubError(String);

#[derive(Default)]
struct RecordingState {
    launch_requests: Mutex<Vec<LaunchRequest>>,
    waited: Mutex<Vec<String>>,
    terminated: Mutex<Vec<String>>,
}

/// Provider double where every operation succeeds and is recorded.
#[derive(Clone, Default)]
struct RecordingProvider {
    state: Arc<RecordingState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| panic!("poisoned lock: {err}"))
}

impl ComputeProvider for RecordingProvider {
    type Error = StubError;

    fn create_instance<'a>(
        &'a self,
        request: &'a LaunchRequest,
    ) -> ProviderFuture<'a, String, Self::Error> {
        Box::pin(async move {
            lock(&self.state.launch_requests).push(request.clone());
            Ok(String::from("i-777"))
        })
    }

    fn describe_addresses<'a>(
        &'a self,
        allocation_ids: &'a [String],
    ) -> ProviderFuture<'a, Vec<AddressAllocation>, Self::Error> {
        Box::pin(async move {
            Ok(allocation_ids
                .iter()
                .map(|id| AddressAllocation {
                    allocation_id: id.clone(),
                    public_ip: Some(String::from("203.0.113.7")),
                    instance_id: None,
                })
                .collect())
        })
    }

    fn associate_address<'a>(
        &'a self,
        _allocation_id: &'a str,
        _instance_id: &'a str,
    ) -> ProviderFuture<'a, String, Self::Error> {
        Box::pin(async move { Ok(String::from("eipassoc-1")) })
    }

    fn wait_until_running<'a>(&'a self, instance_id: &'a str) -> ProviderFuture<'a, (), Self::Error> {
        Box::pin(async move {
            lock(&self.state.waited).push(instance_id.to_owned());
            Ok(())
        })
    }

    fn terminate_instance<'a>(&'a self, instance_id: &'a str) -> ProviderFuture<'a, (), Self::Error> {
        Box::pin(async move {
            lock(&self.state.terminated).push(instance_id.to_owned());
            Ok(())
        })
    }
}

#[fixture]
fn config() -> RunnerConfig {
    RunnerConfig {
        image_id: String::from("ami-0abc"),
        instance_type: String::from("t3.medium"),
        region: String::from("us-east-1"),
        iam_role_name: String::from("ci-runner"),
        security_group_id: String::from("sg-123"),
        subnet_id: Some(String::from("subnet-9")),
        with_subnet: true,
        elastic_ip: Some(String::from("eipalloc-1,eipalloc-2")),
        update_runner: true,
        resource_tags: Some(String::from(r#"[{"Key": "Team", "Value": "ci"}]"#)),
        github_owner: String::from("acme"),
        instance_id: Some(String::from("i-777")),
    }
}

#[rstest]
#[tokio::test]
async fn full_flow_provisions_waits_and_terminates(config: RunnerConfig) {
    let provider = RecordingProvider::default();
    let lifecycle = RunnerLifecycle::new(provider.clone(), config);

    let instance_id = lifecycle
        .provision("gpu-large", "tok-1")
        .await
        .unwrap_or_else(|err| panic!("provision: {err}"));
    lifecycle
        .await_ready(&instance_id)
        .await
        .unwrap_or_else(|err| panic!("await_ready: {err}"));
    lifecycle
        .terminate()
        .await
        .unwrap_or_else(|err| panic!("terminate: {err}"));

    assert_eq!(instance_id, "i-777");
    assert_eq!(*lock(&provider.state.waited), vec![String::from("i-777")]);
    assert_eq!(*lock(&provider.state.terminated), vec![String::from("i-777")]);
}

#[rstest]
#[tokio::test]
async fn launch_request_carries_the_configured_deployment(config: RunnerConfig) {
    let provider = RecordingProvider::default();
    let lifecycle = RunnerLifecycle::new(provider.clone(), config);

    lifecycle
        .provision("gpu-large", "tok-1")
        .await
        .unwrap_or_else(|err| panic!("provision: {err}"));

    let requests = lock(&provider.state.launch_requests);
    let request = requests.first().unwrap_or_else(|| panic!("one launch request"));

    assert_eq!(request.image_id, "ami-0abc");
    assert_eq!(request.network.subnet_id.as_deref(), Some("subnet-9"));
    assert_eq!(request.network.security_group_ids, vec!["sg-123"]);
    assert_eq!(
        request.tags.first().map(|tag| tag.key.as_str()),
        Some("Team")
    );

    let decoded = STANDARD
        .decode(&request.user_data)
        .unwrap_or_else(|err| panic!("user data should be base64: {err}"));
    let script = String::from_utf8(decoded).unwrap_or_else(|err| panic!("utf8: {err}"));

    assert!(script.starts_with("#!/bin/bash"));
    assert!(script.contains("apt-get install -y jq"));
    assert!(
        script.contains("./config.sh --url https://github.com/acme --token tok-1 --labels gpu-large")
    );
}
