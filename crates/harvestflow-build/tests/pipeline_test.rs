mod common;

use async_trait::async_trait;
use common::{FakeClient, RecordingSink, URL, settings};
use harvestflow_build::{
    BuildError, Orchestrator, ProvisionHook, ProvisionTarget, ReconcileFailure, Stage,
};
use harvestflow_cloud::{CancelToken, ResourceKind, cancel_pair};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn orchestrator(client: &Arc<FakeClient>, sink: &Arc<RecordingSink>) -> Orchestrator {
    Orchestrator::new(client.clone()).with_sink(sink.clone())
}

/// Image absent, URL without checksum: create, download, boot, tear down
#[tokio::test(start_paused = true)]
async fn test_scenario_a_creates_everything() {
    let client = Arc::new(FakeClient::new());
    let sink = Arc::new(RecordingSink::default());

    let artifact = assert_ok!(
        orchestrator(&client, &sink)
            .run(&settings(Some(URL), None), CancelToken::never())
            .await
    );

    assert!(!artifact.image.reused);
    assert_eq!(artifact.image.name, "img1");
    assert_eq!(artifact.volume, "packer-vol01");
    assert_eq!(artifact.vm, "packer-vm01");
    assert_eq!(artifact.namespace, "build");
    assert!(artifact.teardown.is_success());

    assert_eq!(
        client.mutations(),
        vec![
            "create_image",
            "create_volume",
            "create_vm",
            "delete_vm",
            "delete_volume"
        ]
    );
    // Volume is bound to the image's storage class, VM to the volume
    assert!(client.calls().contains(&"create_volume build longhorn-img1".to_string()));
    assert!(client.calls().contains(&"create_vm build packer-vol01".to_string()));

    // Download progress was observed before completion
    let progress = sink.progress.lock().unwrap().clone();
    assert!(progress.contains(&(Stage::Image, Some(40))));
    assert!(sink.errors().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_scenario_a_with_cleanup_deletes_image_last() {
    let client = Arc::new(FakeClient::new());
    let sink = Arc::new(RecordingSink::default());
    let mut s = settings(Some(URL), None);
    s.cleanup_image = true;

    let artifact = assert_ok!(orchestrator(&client, &sink).run(&s, CancelToken::never()).await);

    assert_eq!(artifact.teardown.succeeded.len(), 3);
    assert_eq!(
        client.mutations(),
        vec![
            "create_image",
            "create_volume",
            "create_vm",
            "delete_vm",
            "delete_volume",
            "delete_image"
        ]
    );
    assert!(client.state().images.is_empty());
}

/// Matching checksum: reuse the image and go straight to volume and VM
#[tokio::test(start_paused = true)]
async fn test_scenario_b_reuses_matching_image() {
    let client = Arc::new(FakeClient::new().with_image("img1", Some("c")));
    let sink = Arc::new(RecordingSink::default());
    let mut s = settings(Some(URL), Some("c"));
    s.cleanup_image = true;

    let artifact = assert_ok!(orchestrator(&client, &sink).run(&s, CancelToken::never()).await);

    assert!(artifact.image.reused);
    assert_eq!(client.count("create_image"), 0);
    assert_eq!(
        client.mutations(),
        vec!["create_volume", "create_vm", "delete_vm", "delete_volume"]
    );
    // Reused images survive teardown even with cleanup on
    assert!(client.state().images.contains_key("img1"));
    assert_eq!(artifact.summary().to_string(), "2 created, 1 reused, 2 deleted");
}

/// Checksum mismatch halts right after reconciliation
#[tokio::test(start_paused = true)]
async fn test_scenario_c_checksum_mismatch_halts() {
    let client = Arc::new(FakeClient::new().with_image("img1", Some("c2")));
    let sink = Arc::new(RecordingSink::default());

    let err = assert_err!(
        orchestrator(&client, &sink)
            .run(&settings(Some(URL), Some("c1")), CancelToken::never())
            .await
    );

    assert!(matches!(
        err,
        BuildError::Reconcile(ReconcileFailure::ChecksumMismatch { .. })
    ));
    assert_eq!(err.stage(), Stage::Image);
    assert_eq!(client.calls(), vec!["read_image img1"]);
    assert_eq!(sink.errors().len(), 1);
}

/// VM never reaches Running: timeout, then VM and volume are removed
#[tokio::test(start_paused = true)]
async fn test_scenario_d_vm_timeout_tears_down() {
    let client = Arc::new(FakeClient::new());
    client.state().vm_phases = [Some("Scheduling".to_string())].into();
    let sink = Arc::new(RecordingSink::default());
    let started = tokio::time::Instant::now();

    let err = assert_err!(
        orchestrator(&client, &sink)
            .run(&settings(Some(URL), None), CancelToken::never())
            .await
    );

    assert!(err.is_timeout());
    assert_eq!(err.stage(), Stage::VirtualMachine);
    assert_eq!(client.count("delete_vm"), 1);
    assert_eq!(client.count("delete_volume"), 1);
    assert_eq!(
        client.mutations(),
        vec![
            "create_image",
            "create_volume",
            "create_vm",
            "delete_vm",
            "delete_volume"
        ]
    );
    assert!(client.state().vms.is_empty());
    assert!(client.state().volumes.is_empty());

    // Grace delay plus the full readiness deadline
    assert!(started.elapsed() >= Duration::from_secs(123));

    let errors = sink.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_input_makes_no_remote_calls() {
    let client = Arc::new(FakeClient::new());
    let sink = Arc::new(RecordingSink::default());

    let err = assert_err!(
        orchestrator(&client, &sink)
            .run(&settings(None, Some("c")), CancelToken::never())
            .await
    );

    assert!(matches!(err, BuildError::InvalidInput(_)));
    assert!(client.calls().is_empty());
    assert_eq!(sink.errors().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_image_without_url() {
    let client = Arc::new(FakeClient::new());
    let sink = Arc::new(RecordingSink::default());

    let err = assert_err!(
        orchestrator(&client, &sink)
            .run(&settings(None, None), CancelToken::never())
            .await
    );

    assert!(matches!(
        err,
        BuildError::Reconcile(ReconcileFailure::NothingToCreate { .. })
    ));
    assert!(client.mutations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_image_import_failure_is_fatal() {
    let client = Arc::new(FakeClient::new());
    {
        let mut state = client.state();
        state.download = [Some(10)].into();
        state.import_failure = Some("source returned 404".to_string());
    }
    let sink = Arc::new(RecordingSink::default());
    let mut s = settings(Some(URL), None);
    s.cleanup_image = true;

    let err = assert_err!(orchestrator(&client, &sink).run(&s, CancelToken::never()).await);

    match &err {
        BuildError::FatalStatus { stage, detail } => {
            assert_eq!(*stage, Stage::Image);
            assert!(detail.contains("source returned 404"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(client.mutations(), vec!["create_image", "delete_image"]);
}

#[tokio::test(start_paused = true)]
async fn test_image_download_timeout() {
    let client = Arc::new(FakeClient::new());
    client.state().download = [Some(5)].into();
    let sink = Arc::new(RecordingSink::default());

    let err = assert_err!(
        orchestrator(&client, &sink)
            .run(&settings(Some(URL), None), CancelToken::never())
            .await
    );

    assert!(err.is_timeout());
    assert_eq!(err.stage(), Stage::Image);
    assert_eq!(client.count("create_volume"), 0);
}

/// A create that returns no name is fatal and reported at teardown
#[tokio::test(start_paused = true)]
async fn test_unnamed_volume_is_fatal() {
    let client = Arc::new(FakeClient::new());
    client.state().volume_name = String::new();
    let sink = Arc::new(RecordingSink::default());

    let err = assert_err!(
        orchestrator(&client, &sink)
            .run(&settings(Some(URL), None), CancelToken::never())
            .await
    );

    assert!(matches!(
        err,
        BuildError::MissingIdentifier {
            stage: Stage::Volume,
            kind: ResourceKind::Volume
        }
    ));
    assert_eq!(client.count("create_vm"), 0);
    // One message for the build failure, one for the untrackable volume
    assert_eq!(sink.errors().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unnamed_vm_still_removes_volume() {
    let client = Arc::new(FakeClient::new());
    client.state().vm_name = String::new();
    let sink = Arc::new(RecordingSink::default());

    let err = assert_err!(
        orchestrator(&client, &sink)
            .run(&settings(Some(URL), None), CancelToken::never())
            .await
    );

    assert!(matches!(err, BuildError::MissingIdentifier { .. }));
    assert_eq!(client.count("delete_volume"), 1);
    assert!(client.state().volumes.is_empty());
}

/// A failed VM delete neither stops volume teardown nor masks the cause
#[tokio::test(start_paused = true)]
async fn test_teardown_failure_does_not_mask_error() {
    let client = Arc::new(FakeClient::new());
    {
        let mut state = client.state();
        state.vm_phases = [Some("Failed".to_string())].into();
        state.fail_delete.insert(ResourceKind::VirtualMachine);
    }
    let sink = Arc::new(RecordingSink::default());

    let err = assert_err!(
        orchestrator(&client, &sink)
            .run(&settings(Some(URL), None), CancelToken::never())
            .await
    );

    match &err {
        BuildError::FatalStatus { stage, detail } => {
            assert_eq!(*stage, Stage::VirtualMachine);
            assert!(detail.contains("Failed"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(client.count("delete_volume"), 1);
    assert!(sink.errors().iter().any(|e| e.contains("delete refused")));
}

/// Reads said absent, so the create was chosen; a conflict means someone raced us
#[tokio::test(start_paused = true)]
async fn test_image_create_conflict_is_fatal() {
    let client = Arc::new(FakeClient::new());
    client.state().conflict_on_create = true;
    let sink = Arc::new(RecordingSink::default());

    let err = assert_err!(
        orchestrator(&client, &sink)
            .run(&settings(Some(URL), None), CancelToken::never())
            .await
    );

    match &err {
        BuildError::Remote { stage, source } => {
            assert_eq!(*stage, Stage::Image);
            assert!(source.is_conflict());
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(client.count("create_image"), 1);
    assert_eq!(client.count("create_volume"), 0);
    assert_eq!(client.mutations(), vec!["create_image"]);
    assert_eq!(sink.errors().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hung_delete_is_bounded_by_teardown_timeout() {
    let client = Arc::new(FakeClient::new());
    client.state().hang_delete.insert(ResourceKind::VirtualMachine);
    let sink = Arc::new(RecordingSink::default());
    let started = tokio::time::Instant::now();

    let artifact = assert_ok!(
        orchestrator(&client, &sink)
            .run(&settings(Some(URL), None), CancelToken::never())
            .await
    );

    assert!(!artifact.teardown.is_success());
    assert_eq!(artifact.teardown.failed.len(), 1);
    assert_eq!(artifact.teardown.failed[0].kind, ResourceKind::VirtualMachine);
    assert!(
        artifact.teardown.failed[0]
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("not acknowledged")
    );

    // The volume is still removed after the VM delete gives up
    assert_eq!(client.count("delete_volume"), 1);
    assert!(artifact.teardown.succeeded.iter().any(|r| r.kind == ResourceKind::Volume));

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(120));
    assert!(elapsed < Duration::from_secs(200));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_vm_wait_still_tears_down() {
    let client = Arc::new(FakeClient::new());
    client.state().vm_phases = [Some("Scheduling".to_string())].into();
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = orchestrator(&client, &sink);
    let s = settings(Some(URL), None);
    let (handle, token) = cancel_pair();
    let started = tokio::time::Instant::now();

    let (result, _) = tokio::join!(orchestrator.run(&s, token), async {
        tokio::time::sleep(Duration::from_secs(20)).await;
        handle.cancel();
    });

    let err = assert_err!(result);
    assert!(err.is_cancelled());
    assert_eq!(err.stage(), Stage::VirtualMachine);
    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(client.count("delete_vm"), 1);
    assert_eq!(client.count("delete_volume"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_start() {
    let client = Arc::new(FakeClient::new());
    let sink = Arc::new(RecordingSink::default());
    let (handle, token) = cancel_pair();
    handle.cancel();

    let err = assert_err!(
        orchestrator(&client, &sink)
            .run(&settings(Some(URL), None), token)
            .await
    );

    assert!(err.is_cancelled());
    assert!(client.calls().is_empty());
}

struct RecordingHook {
    seen: Mutex<Vec<ProvisionTarget>>,
    fail: bool,
}

#[async_trait]
impl ProvisionHook for RecordingHook {
    async fn provision(&self, target: &ProvisionTarget) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(target.clone());
        if self.fail {
            anyhow::bail!("provisioner exited with status 2");
        }
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_hook_runs_before_teardown() {
    let client = Arc::new(FakeClient::new().with_image("img1", Some("c")));
    let sink = Arc::new(RecordingSink::default());
    let hook = Arc::new(RecordingHook {
        seen: Mutex::new(Vec::new()),
        fail: false,
    });

    assert_ok!(
        orchestrator(&client, &sink)
            .with_hook(hook.clone())
            .run(&settings(Some(URL), Some("c")), CancelToken::never())
            .await
    );

    let seen = hook.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].vm.name, "packer-vm01");
    assert_eq!(seen[0].volume.name, "packer-vol01");
    assert_eq!(seen[0].export.namespace, "build");
}

#[tokio::test(start_paused = true)]
async fn test_hook_failure_is_fatal() {
    let client = Arc::new(FakeClient::new());
    let sink = Arc::new(RecordingSink::default());
    let hook = Arc::new(RecordingHook {
        seen: Mutex::new(Vec::new()),
        fail: true,
    });

    let err = assert_err!(
        orchestrator(&client, &sink)
            .with_hook(hook)
            .run(&settings(Some(URL), None), CancelToken::never())
            .await
    );

    assert_eq!(err.stage(), Stage::Provision);
    assert!(err.to_string().contains("status 2"));
    assert_eq!(client.count("delete_vm"), 1);
    assert_eq!(client.count("delete_volume"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_artifact_serializes() {
    let client = Arc::new(FakeClient::new());
    let sink = Arc::new(RecordingSink::default());

    let artifact = assert_ok!(
        orchestrator(&client, &sink)
            .run(&settings(Some(URL), None), CancelToken::never())
            .await
    );

    let json = serde_json::to_value(&artifact).unwrap();
    assert_eq!(json["vm"], "packer-vm01");
    assert_eq!(json["image"]["reused"], false);
    assert_eq!(json["actions"][0]["action_type"], "create");
    assert!(json["teardown"]["failed"].as_array().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_every_stage_is_announced() {
    let client = Arc::new(FakeClient::new());
    let sink = Arc::new(RecordingSink::default());

    assert_ok!(
        orchestrator(&client, &sink)
            .run(&settings(Some(URL), None), CancelToken::never())
            .await
    );

    let said = sink.said();
    for expected in [
        "Reconciling image",
        "Creating image",
        "Creating 100Gi volume",
        "Creating builder VM",
        "Tearing down",
    ] {
        assert_eq!(
            said.iter().filter(|m| m.starts_with(expected)).count(),
            1,
            "{}",
            expected
        );
    }
}
