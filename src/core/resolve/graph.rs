use std::future::Future;
use std::pin::Pin;

use tracing::{debug, info, warn};

use super::index::ProjectIdIndex;
use crate::core::error::{UpdaterError, UpdaterResult};
use crate::core::manifest::{DependencySpec, QualifiedProjectId, ServerSpec};
use crate::core::registry::{resolve_version, ArtifactFile, ProjectDescriptor, RegistrySet};
use crate::core::transfer::is_safe_file_name;

/// Deepest dependency chain followed below a manifest entry.
pub const MAX_RESOLVE_DEPTH: usize = 32;

/// A declaration with everything needed to place its artifact.
#[derive(Debug, Clone)]
pub struct ResolvedDependency {
    pub declaration: DependencySpec,
    pub project: ProjectDescriptor,
    pub version: String,
    /// Canonical file name, see [`DependencySpec::canonical_file_name`].
    pub file_name: String,
    pub file_hash: Option<String>,
    pub download_url: String,
    /// Extension jars shipped inside the same version.
    pub extensions: Vec<ArtifactFile>,
    /// Required dependencies in registry order, minus deduplicated ones.
    pub children: Vec<ResolvedDependency>,
}

impl ResolvedDependency {
    /// This node followed by its descendants, depth first.
    pub fn pre_order(&self) -> Vec<&ResolvedDependency> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.pre_order());
        }
        nodes
    }
}

/// State shared by every resolution in one run.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    pub server: ServerSpec,
    pub index: ProjectIdIndex,
}

impl ResolveContext {
    pub fn new(server: ServerSpec, index: ProjectIdIndex) -> Self {
        Self { server, index }
    }
}

/// Expands declarations into trees of resolved dependencies.
pub struct GraphBuilder<'a> {
    registries: &'a RegistrySet,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(registries: &'a RegistrySet) -> Self {
        Self { registries }
    }

    /// Resolve `entry` and its required dependencies.
    ///
    /// Returns `Ok(None)` when the entry itself cannot be resolved for a
    /// reason local to it; the cause is logged. Registry failures abort.
    pub async fn resolve(
        &self,
        entry: &DependencySpec,
        ctx: &mut ResolveContext,
    ) -> UpdaterResult<Option<ResolvedDependency>> {
        let mut walk = Walk {
            registries: self.registries,
            ctx,
            ancestors: Vec::new(),
        };
        walk.resolve_or_skip(entry).await
    }
}

struct Walk<'a> {
    registries: &'a RegistrySet,
    ctx: &'a mut ResolveContext,
    ancestors: Vec<QualifiedProjectId>,
}

impl<'a> Walk<'a> {
    async fn resolve_or_skip(
        &mut self,
        entry: &DependencySpec,
    ) -> UpdaterResult<Option<ResolvedDependency>> {
        match self.node(entry).await {
            Ok(node) => Ok(node),
            Err(e) if e.is_recoverable() => {
                warn!("Skipping {}: {}", entry.label(), e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn node<'s>(
        &'s mut self,
        entry: &'s DependencySpec,
    ) -> Pin<Box<dyn Future<Output = UpdaterResult<Option<ResolvedDependency>>> + Send + 's>> {
        Box::pin(async move {
        let label = entry.label();
        let source = entry.source()?;
        let qualified = source.qualified_id();

        if self.ancestors.contains(&qualified) {
            let mut chain: Vec<String> = self.ancestors.iter().map(ToString::to_string).collect();
            chain.push(qualified.to_string());
            return Err(UpdaterError::DependencyCycle {
                chain: chain.join(" -> "),
            });
        }
        if self.ancestors.len() >= MAX_RESOLVE_DEPTH {
            return Err(UpdaterError::DepthExceeded {
                entry: label,
                limit: MAX_RESOLVE_DEPTH,
            });
        }

        let registries = self.registries;
        let registry = registries.get(source.provider())?;
        let server = &self.ctx.server;

        info!("Processing {} ({})", label, qualified);

        // 1. Project and candidate versions
        let project = registry.project(source.reference()).await?;

        // A dependency may name a project by id that the manifest declared by slug
        if !self.ancestors.is_empty() {
            if let Some(id) = project
                .qualified_ids()
                .into_iter()
                .find(|id| self.ctx.index.contains(id))
            {
                debug!("Skipping {}: already accounted for as {}", label, id);
                return Ok(None);
            }
        }

        let versions = registry
            .versions(&project, server, entry.download_incompatible)
            .await?;
        if versions.is_empty() {
            return Err(UpdaterError::NoCompatibleVersions { entry: label });
        }

        // 2. Wanted version and its artifact
        let version = resolve_version(&versions, &entry.wanted_version).ok_or_else(|| {
            UpdaterError::VersionNotFound {
                entry: label.clone(),
                wanted: entry.wanted_version.to_string(),
            }
        })?;
        let primary = registry
            .primary_file(&project, version, server)
            .ok_or_else(|| UpdaterError::NoPrimaryFile {
                entry: label.clone(),
            })?;
        debug!(
            "{} resolved to {} (version id {})",
            project.title, version.version_number, version.id
        );

        let file_name = entry.canonical_file_name(&version.version_number, &primary.file_name);
        if !is_safe_file_name(&file_name) {
            return Err(UpdaterError::UnsafeFileName {
                entry: label,
                file_name,
            });
        }

        let mut extensions = Vec::new();
        for name in entry.typewriter_extensions() {
            let wanted = format!("{}.jar", name);
            match version.file_named(&wanted) {
                Some(file) if is_safe_file_name(&file.file_name) => extensions.push(file.clone()),
                Some(file) => warn!("Extension file '{}' has an unsafe name", file.file_name),
                None => warn!("Extension '{}' not found for {}", name, project.title),
            }
        }

        // 3. Claim the project before looking at its dependencies
        self.ctx.index.insert(qualified.clone());
        for id in project.qualified_ids() {
            self.ctx.index.insert(id);
        }

        // 4. Required dependencies, depth first
        let declared = registry
            .required_dependencies(&project, version, server, entry.download_incompatible)
            .await?;

        let mut children = Vec::new();
        if !declared.is_empty() {
            debug!("{} declares {} required dependencies", project.title, declared.len());
            self.ancestors.push(qualified);

            for dep in &declared {
                if let Ok(dep_source) = dep.source() {
                    let dep_id = dep_source.qualified_id();
                    if self.ctx.index.contains(&dep_id) {
                        debug!(
                            "Skipping dependency {} of {}: already accounted for",
                            dep_id, project.title
                        );
                        continue;
                    }
                }

                let mut dep = dep.clone();
                dep.download_incompatible = entry.download_incompatible;
                if let Some(child) = self.resolve_or_skip(&dep).await? {
                    children.push(child);
                }
            }

            self.ancestors.pop();
        }

        Ok(Some(ResolvedDependency {
            declaration: entry.clone(),
            version: version.version_number.clone(),
            file_name,
            file_hash: primary.hash,
            download_url: primary.url,
            extensions,
            children,
            project,
        }))
        }) // end Box::pin
    }
}
