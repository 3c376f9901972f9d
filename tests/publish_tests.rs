use staged_image_release::{
    ConfigError, Credential, DryRunRegistry, ImageRef, OutputManager, PublishPlan, Publisher,
    RegistryError, RegistryOperations, ReleaseError, ReleaseParameters, Result, SpecialArtifact,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Login(String, String),
    Pull(String),
    Tag(String, String),
    Push(String),
    CreateManifest(String, Vec<String>),
    PushManifest(String),
}

/// In-memory registry that records calls and keeps track of pushed tags, so a
/// manifest amending a tag that was never pushed fails like the real thing.
#[derive(Default)]
struct RecordingRegistry {
    calls: Mutex<Vec<Call>>,
    pushed: Mutex<HashSet<String>>,
    fail_login: bool,
    fail_push: Option<String>,
}

impl RecordingRegistry {
    fn failing_push(image: &str) -> Self {
        Self {
            fail_push: Some(image.to_string()),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn has_tag(&self, image: &str) -> bool {
        self.pushed.lock().unwrap().contains(image)
    }

    fn failure(operation: &str, image: &ImageRef, reason: &str) -> ReleaseError {
        RegistryError::OperationFailed {
            operation: operation.to_string(),
            image: image.to_string(),
            reason: reason.to_string(),
        }
        .into()
    }
}

impl RegistryOperations for RecordingRegistry {
    async fn login(&self, registry: &str, identity: &str, _credential: &Credential) -> Result<()> {
        self.record(Call::Login(registry.to_string(), identity.to_string()));
        if self.fail_login {
            return Err(RegistryError::AuthenticationFailed {
                registry: registry.to_string(),
                identity: identity.to_string(),
                reason: "denied".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn pull(&self, image: &ImageRef) -> Result<()> {
        self.record(Call::Pull(image.short_name()));
        Ok(())
    }

    async fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<()> {
        self.record(Call::Tag(source.short_name(), target.short_name()));
        Ok(())
    }

    async fn push(&self, image: &ImageRef) -> Result<()> {
        self.record(Call::Push(image.short_name()));
        if self.fail_push.as_deref() == Some(image.short_name().as_str()) {
            return Err(Self::failure("push", image, "connection reset"));
        }
        self.pushed.lock().unwrap().insert(image.short_name());
        Ok(())
    }

    async fn create_manifest(&self, manifest: &ImageRef, members: &[ImageRef]) -> Result<()> {
        let names: Vec<String> = members.iter().map(ImageRef::short_name).collect();
        self.record(Call::CreateManifest(manifest.short_name(), names.clone()));
        if let Some(missing) = names.iter().find(|name| !self.has_tag(name)) {
            return Err(Self::failure(
                "manifest create",
                manifest,
                &format!("no such manifest: {missing}"),
            ));
        }
        Ok(())
    }

    async fn push_manifest(&self, manifest: &ImageRef) -> Result<()> {
        self.record(Call::PushManifest(manifest.short_name()));
        self.pushed.lock().unwrap().insert(manifest.short_name());
        Ok(())
    }
}

fn params() -> ReleaseParameters {
    ReleaseParameters {
        identity: "release-bot".to_string(),
        credential: Credential::new("ghp_secret"),
        source_reference: "abcd123".to_string(),
        release_tag: "v1.2.0".to_string(),
    }
}

fn quiet() -> OutputManager {
    OutputManager::new(false, true)
}

fn strings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn plan(
    artifacts: &[(&str, &str)],
    prefixes: &[(&str, &str)],
    latest: Option<&[&str]>,
    special: Option<SpecialArtifact>,
) -> PublishPlan {
    PublishPlan::new(
        "ghcr.io".to_string(),
        "confidential-containers".to_string(),
        vec!["x86_64".to_string(), "s390x".to_string()],
        strings(artifacts),
        strings(prefixes),
        latest.map(|names| names.iter().map(|n| n.to_string()).collect::<BTreeSet<_>>()),
        special,
    )
    .unwrap()
}

fn pos(calls: &[Call], call: &Call) -> usize {
    calls
        .iter()
        .position(|c| c == call)
        .unwrap_or_else(|| panic!("missing call {call:?}"))
}

#[tokio::test]
async fn example_release_pulls_tags_pushes_then_manifests() {
    let plan = plan(
        &[("staged-images/kbs", "key-broker-service")],
        &[("staged-images/kbs", "built-in-as-")],
        Some(&[]),
        None,
    );
    let registry = RecordingRegistry::default();
    let (params, output) = (params(), quiet());

    let summary = Publisher::new(&registry, &plan, &params, &output)
        .run()
        .await
        .unwrap();

    let s = |v: &str| v.to_string();
    assert_eq!(
        registry.calls(),
        vec![
            Call::Login(s("ghcr.io"), s("release-bot")),
            Call::Pull(s("staged-images/kbs:abcd123-x86_64")),
            Call::Tag(
                s("staged-images/kbs:abcd123-x86_64"),
                s("key-broker-service:built-in-as-v1.2.0-x86_64")
            ),
            Call::Push(s("key-broker-service:built-in-as-v1.2.0-x86_64")),
            Call::Pull(s("staged-images/kbs:abcd123-s390x")),
            Call::Tag(
                s("staged-images/kbs:abcd123-s390x"),
                s("key-broker-service:built-in-as-v1.2.0-s390x")
            ),
            Call::Push(s("key-broker-service:built-in-as-v1.2.0-s390x")),
            Call::CreateManifest(
                s("key-broker-service:built-in-as-v1.2.0"),
                vec![
                    s("key-broker-service:built-in-as-v1.2.0-x86_64"),
                    s("key-broker-service:built-in-as-v1.2.0-s390x"),
                ]
            ),
            Call::PushManifest(s("key-broker-service:built-in-as-v1.2.0")),
        ]
    );
    assert_eq!(summary.tags.len(), 2);
    assert_eq!(
        summary.manifests[0].to_string(),
        "ghcr.io/confidential-containers/key-broker-service:built-in-as-v1.2.0"
    );
}

#[tokio::test]
async fn default_plan_publishes_every_pair_and_architecture() {
    let plan = PublishPlan::default();
    let registry = RecordingRegistry::default();
    let (params, output) = (params(), quiet());

    let summary = Publisher::new(&registry, &plan, &params, &output)
        .run()
        .await
        .unwrap();
    let calls = registry.calls();

    for (staged, release) in plan.artifacts() {
        let tag = plan.full_release_tag(staged, "v1.2.0");
        for arch in plan.architectures() {
            let source = format!("{staged}:abcd123-{arch}");
            let target = format!("{release}:{tag}-{arch}");
            assert!(calls.contains(&Call::Pull(source.clone())));
            assert!(calls.contains(&Call::Tag(source, target.clone())));
            assert!(registry.has_tag(&target), "{target}");
        }
        assert!(registry.has_tag(&format!("{release}:{tag}")));
    }

    // 6 pairs x 2 architectures, plus the special artifact twice
    assert_eq!(summary.tags.len(), 14);
    // 6 pair manifests plus 3 latest manifests
    assert_eq!(summary.manifests.len(), 9);
}

#[tokio::test]
async fn failed_architecture_push_stops_before_manifest() {
    let plan = PublishPlan::default();
    let registry =
        RecordingRegistry::failing_push("attestation-service:v1.2.0-s390x");
    let (params, output) = (params(), quiet());

    let err = Publisher::new(&registry, &plan, &params, &output)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReleaseError::Registry(RegistryError::OperationFailed { ref operation, .. }) if operation == "push"
    ));

    let calls = registry.calls();
    assert_eq!(
        calls.last(),
        Some(&Call::Push("attestation-service:v1.2.0-s390x".to_string()))
    );
    assert!(!calls.iter().any(|c| matches!(
        c,
        Call::CreateManifest(name, _) if name == "attestation-service:v1.2.0"
    )));
}

#[tokio::test]
async fn manifest_follows_all_architecture_pushes() {
    let plan = PublishPlan::default();
    let registry = RecordingRegistry::default();
    let (params, output) = (params(), quiet());
    Publisher::new(&registry, &plan, &params, &output)
        .run()
        .await
        .unwrap();
    let calls = registry.calls();

    for (staged, release) in plan.artifacts() {
        let tag = plan.full_release_tag(staged, "v1.2.0");
        let manifest = calls
            .iter()
            .position(|c| matches!(c, Call::CreateManifest(name, _) if *name == format!("{release}:{tag}")))
            .unwrap();
        for arch in plan.architectures() {
            let push = pos(&calls, &Call::Push(format!("{release}:{tag}-{arch}")));
            assert!(push < manifest);
        }
        let push_manifest = pos(&calls, &Call::PushManifest(format!("{release}:{tag}")));
        assert!(manifest < push_manifest);
    }
}

#[tokio::test]
async fn shared_release_name_keeps_both_tag_sets() {
    let plan = plan(
        &[
            ("staged-images/coco-as-grpc", "attestation-service"),
            ("staged-images/coco-as-restful", "attestation-service"),
        ],
        &[("staged-images/coco-as-restful", "rest-")],
        None,
        None,
    );
    let registry = RecordingRegistry::default();
    let (params, output) = (params(), quiet());
    Publisher::new(&registry, &plan, &params, &output)
        .run()
        .await
        .unwrap();

    for arch in ["x86_64", "s390x"] {
        assert!(registry.has_tag(&format!("attestation-service:v1.2.0-{arch}")));
        assert!(registry.has_tag(&format!("attestation-service:rest-v1.2.0-{arch}")));
    }
    assert!(registry.has_tag("attestation-service:v1.2.0"));
    assert!(registry.has_tag("attestation-service:rest-v1.2.0"));
}

#[tokio::test]
async fn latest_uses_unprefixed_tag() {
    let plan = PublishPlan::default();
    let registry = RecordingRegistry::default();
    let (params, output) = (params(), quiet());
    Publisher::new(&registry, &plan, &params, &output)
        .run()
        .await
        .unwrap();

    let calls = registry.calls();
    let members = calls
        .iter()
        .find_map(|c| match c {
            Call::CreateManifest(name, members) if name == "key-broker-service:latest" => {
                Some(members.clone())
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(
        members,
        [
            "key-broker-service:v1.2.0-x86_64",
            "key-broker-service:v1.2.0-s390x"
        ]
    );
    assert!(registry.has_tag("key-broker-service:latest"));
}

#[tokio::test]
async fn latest_fails_for_prefixed_only_release() {
    let plan = plan(
        &[("staged-images/kbs", "key-broker-service")],
        &[("staged-images/kbs", "built-in-as-")],
        None,
        None,
    );
    let registry = RecordingRegistry::default();
    let (params, output) = (params(), quiet());

    let err = Publisher::new(&registry, &plan, &params, &output)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReleaseError::Registry(RegistryError::OperationFailed { ref operation, .. })
            if operation == "manifest create"
    ));
    assert!(!registry.has_tag("key-broker-service:latest"));
}

#[tokio::test]
async fn special_artifact_is_tagged_with_and_without_arch() {
    let special = SpecialArtifact::default();
    let plan = plan(
        &[("staged-images/rvps", "reference-value-provider-service")],
        &[],
        None,
        Some(special),
    );
    let registry = RecordingRegistry::default();
    let (params, output) = (params(), quiet());
    Publisher::new(&registry, &plan, &params, &output)
        .run()
        .await
        .unwrap();

    let calls = registry.calls();
    assert!(calls.contains(&Call::Pull(
        "staged-images/kbs-client:abcd123-x86_64".to_string()
    )));
    assert!(registry.has_tag("kbs-client:sample_only-v1.2.0-x86_64"));
    assert!(registry.has_tag("kbs-client:sample_only-v1.2.0"));
    assert!(!calls.iter().any(|c| matches!(
        c,
        Call::CreateManifest(name, _) if name.starts_with("kbs-client:")
    )));
    assert!(!calls.iter().any(|c| matches!(
        c,
        Call::Pull(name) if name.starts_with("staged-images/kbs-client:") && name.ends_with("s390x")
    )));
}

#[tokio::test]
async fn rejected_login_aborts_everything() {
    let registry = RecordingRegistry {
        fail_login: true,
        ..RecordingRegistry::default()
    };
    let plan = PublishPlan::default();
    let (params, output) = (params(), quiet());

    let err = Publisher::new(&registry, &plan, &params, &output)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReleaseError::Registry(RegistryError::AuthenticationFailed { .. })
    ));
    assert_eq!(registry.calls().len(), 1);
}

#[tokio::test]
async fn dry_run_reports_full_plan() {
    let plan = PublishPlan::default();
    let (params, output) = (params(), quiet());
    let registry = DryRunRegistry::new(&output);

    let summary = Publisher::new(&registry, &plan, &params, &output)
        .run()
        .await
        .unwrap();
    assert_eq!(summary.tags.len(), 14);
    assert_eq!(summary.manifests.len(), 9);
}

#[test]
fn unmapped_prefix_is_a_config_error() {
    let err = PublishPlan::new(
        "ghcr.io".to_string(),
        "confidential-containers".to_string(),
        vec!["x86_64".to_string()],
        strings(&[("staged-images/kbs", "key-broker-service")]),
        strings(&[("staged-images/other", "rest-")]),
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ReleaseError::Config(ConfigError::UnmappedArtifact { .. })
    ));
}

#[tokio::test]
async fn unmapped_staged_name_fails_before_any_pull() {
    let plan = PublishPlan::default();
    let registry = RecordingRegistry::default();
    let (params, output) = (params(), quiet());
    let mut summary = Default::default();

    let err = Publisher::new(&registry, &plan, &params, &output)
        .publish_artifact("staged-images/unknown", &mut summary)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReleaseError::Config(ConfigError::UnmappedArtifact { ref name }) if name == "staged-images/unknown"
    ));
    assert!(registry.calls().is_empty());
}
