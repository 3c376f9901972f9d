//! Registry backend that only reports what it would do.

use super::{Credential, ImageRef, RegistryOperations};
use crate::cli::OutputManager;
use crate::error::Result;

/// Prints each operation instead of executing it. Always succeeds.
#[derive(Debug)]
pub struct DryRunRegistry<'a> {
    output: &'a OutputManager,
}

impl<'a> DryRunRegistry<'a> {
    /// Report through `output`
    pub fn new(output: &'a OutputManager) -> Self {
        Self { output }
    }

    fn report(&self, line: String) {
        log::debug!("dry run: {line}");
        self.output.indent(&format!("[dry-run] {line}"));
    }
}

impl RegistryOperations for DryRunRegistry<'_> {
    async fn login(&self, registry: &str, identity: &str, _credential: &Credential) -> Result<()> {
        self.report(format!("login {registry} -u {identity} --password-stdin"));
        Ok(())
    }

    async fn pull(&self, image: &ImageRef) -> Result<()> {
        self.report(format!("pull {image}"));
        Ok(())
    }

    async fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<()> {
        self.report(format!("tag {source} {target}"));
        Ok(())
    }

    async fn push(&self, image: &ImageRef) -> Result<()> {
        self.report(format!("push {image}"));
        Ok(())
    }

    async fn create_manifest(&self, manifest: &ImageRef, members: &[ImageRef]) -> Result<()> {
        let members: Vec<String> = members.iter().map(ToString::to_string).collect();
        self.report(format!(
            "manifest create --amend {manifest} {}",
            members.join(" ")
        ));
        Ok(())
    }

    async fn push_manifest(&self, manifest: &ImageRef) -> Result<()> {
        self.report(format!("manifest push {manifest}"));
        Ok(())
    }
}
