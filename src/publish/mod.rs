//! Release publishing: republish staged images under their release names.
//!
//! Phases run strictly in order and every failure aborts the run:
//!
//! 1. Registry login
//! 2. Per staged artifact: pull, tag and push every architecture, then the
//!    multi-architecture manifest
//! 3. `latest` manifests over the unprefixed release tag
//! 4. The single-architecture special artifact
//!
//! Nothing already pushed is rolled back on failure.

use crate::cli::OutputManager;
use crate::error::Result;
use crate::plan::{LATEST_TAG, PublishPlan};
use crate::registry::{Credential, ImageRef, RegistryOperations};

/// Per-run parameters, fixed for the whole run
#[derive(Debug, Clone)]
pub struct ReleaseParameters {
    /// Registry user name
    pub identity: String,
    /// Registry token or password
    pub credential: Credential,
    /// Commit the staged images were built from
    pub source_reference: String,
    /// Version tag to publish, e.g. `v1.2.0`
    pub release_tag: String,
}

/// What a run pushed, in push order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishSummary {
    /// Per-architecture and single-architecture tags
    pub tags: Vec<ImageRef>,
    /// Multi-architecture manifests
    pub manifests: Vec<ImageRef>,
}

/// Drives a release against a registry backend
pub struct Publisher<'a, R> {
    registry: &'a R,
    plan: &'a PublishPlan,
    params: &'a ReleaseParameters,
    output: &'a OutputManager,
}

impl<'a, R: RegistryOperations> Publisher<'a, R> {
    /// Create a publisher
    pub fn new(
        registry: &'a R,
        plan: &'a PublishPlan,
        params: &'a ReleaseParameters,
        output: &'a OutputManager,
    ) -> Self {
        Self {
            registry,
            plan,
            params,
            output,
        }
    }

    /// Run every phase
    pub async fn run(&self) -> Result<PublishSummary> {
        let mut summary = PublishSummary::default();

        self.authenticate().await?;

        self.output.section("Tag and publish");
        for staged in self.plan.staged_names() {
            self.publish_artifact(staged, &mut summary).await?;
        }

        self.output.section("Latest manifests");
        self.publish_latest(&mut summary).await?;

        if self.plan.special().is_some() {
            self.output.section("Single-architecture artifacts");
            self.publish_special(&mut summary).await?;
        }

        Ok(summary)
    }

    /// Log in to the plan's registry
    pub async fn authenticate(&self) -> Result<()> {
        self.output.progress(&format!(
            "Logging in to {} as {}",
            self.plan.registry(),
            self.params.identity
        ));
        self.registry
            .login(
                self.plan.registry(),
                &self.params.identity,
                &self.params.credential,
            )
            .await?;
        self.output.success("Login succeeded");
        Ok(())
    }

    /// Publish every architecture of one staged artifact, then its manifest
    pub async fn publish_artifact(&self, staged: &str, summary: &mut PublishSummary) -> Result<()> {
        let release = self.plan.release_name(staged)?;
        let release_tag = self.plan.full_release_tag(staged, &self.params.release_tag);
        let mut members = Vec::with_capacity(self.plan.architectures().len());

        for arch in self.plan.architectures() {
            let source = self
                .plan
                .image(staged, format!("{}-{arch}", self.params.source_reference));
            let target = self.plan.image(release, format!("{release_tag}-{arch}"));
            self.republish(&source, &target).await?;
            summary.tags.push(target.clone());
            members.push(target);
        }

        let manifest = self.plan.image(release, release_tag.as_str());
        self.publish_manifest(&manifest, &members).await?;
        summary.manifests.push(manifest);

        self.output.success(&format!(
            "Tagged {staged}@{} as {release}:{release_tag} ({})",
            self.params.source_reference,
            self.plan.architectures().join(", ")
        ));
        Ok(())
    }

    /// Publish `{release}:latest` for every release name, over the
    /// unprefixed release tag. A release name that only has prefixed tags
    /// makes the manifest step fail.
    pub async fn publish_latest(&self, summary: &mut PublishSummary) -> Result<()> {
        for release in self.plan.latest_release_names() {
            let members: Vec<ImageRef> = self
                .plan
                .architectures()
                .iter()
                .map(|arch| {
                    self.plan
                        .image(release, format!("{}-{arch}", self.params.release_tag))
                })
                .collect();

            let manifest = self.plan.image(release, LATEST_TAG);
            self.publish_manifest(&manifest, &members).await?;
            summary.manifests.push(manifest);

            self.output.success(&format!(
                "Published {release}:{LATEST_TAG} -> {}",
                self.params.release_tag
            ));
        }
        Ok(())
    }

    /// Publish the single-architecture artifact with and without the
    /// architecture suffix. No manifest is created for it.
    pub async fn publish_special(&self, summary: &mut PublishSummary) -> Result<()> {
        let Some(special) = self.plan.special() else {
            return Ok(());
        };

        let release_tag = format!("{}{}", special.tag_prefix, self.params.release_tag);
        let source = self.plan.image(
            &special.staged,
            format!("{}-{}", self.params.source_reference, special.architecture),
        );

        self.output
            .progress(&format!("Pulling {}", source.short_name()));
        self.registry.pull(&source).await?;

        for tag in [
            format!("{release_tag}-{}", special.architecture),
            release_tag.clone(),
        ] {
            let target = self.plan.image(&special.release, tag);
            self.output.verbose(&format!("tag {source} {target}"));
            self.registry.tag(&source, &target).await?;
            self.output.verbose(&format!("push {target}"));
            self.registry.push(&target).await?;
            summary.tags.push(target);
        }

        self.output.success(&format!(
            "Tagged {}@{} as {}:{release_tag} ({})",
            special.staged, self.params.source_reference, special.release, special.architecture
        ));
        Ok(())
    }

    async fn republish(&self, source: &ImageRef, target: &ImageRef) -> Result<()> {
        self.output.progress(&format!(
            "{} -> {}",
            source.short_name(),
            target.short_name()
        ));
        self.output.verbose(&format!("pull {source}"));
        self.registry.pull(source).await?;
        self.output.verbose(&format!("tag {source} {target}"));
        self.registry.tag(source, target).await?;
        self.output.verbose(&format!("push {target}"));
        self.registry.push(target).await
    }

    async fn publish_manifest(&self, manifest: &ImageRef, members: &[ImageRef]) -> Result<()> {
        self.output.verbose(&format!("manifest create {manifest}"));
        self.registry.create_manifest(manifest, members).await?;
        self.output.verbose(&format!("manifest push {manifest}"));
        self.registry.push_manifest(manifest).await
    }
}
