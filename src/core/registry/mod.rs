mod hangar;
mod modrinth;
mod version;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::error::{UpdaterError, UpdaterResult};
use crate::core::manifest::{DependencySpec, Provider, QualifiedProjectId, ServerSpec};

pub use hangar::{HangarClient, HANGAR_API_URL};
pub use modrinth::{ModrinthClient, MODRINTH_API_URL, MODRINTH_STAGING_API_URL};
pub use version::resolve_version;

/// Project as reported by a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub provider: Provider,
    /// Canonical identifier; also the project part of cache keys.
    pub id: String,
    pub slug: String,
    pub title: String,
}

impl ProjectDescriptor {
    /// Every identifier a declaration may use to refer to this project.
    pub fn qualified_ids(&self) -> Vec<QualifiedProjectId> {
        let mut ids = vec![QualifiedProjectId::new(self.provider, &self.id)];
        if !self.slug.is_empty() && self.slug != self.id {
            ids.push(QualifiedProjectId::new(self.provider, &self.slug));
        }
        ids
    }
}

/// One published version, in the order the registry listed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryVersion {
    pub id: String,
    pub version_number: String,
    pub files: Vec<ArtifactFile>,
    pub dependencies: Vec<VersionDependency>,
}

impl RegistryVersion {
    pub fn primary_file(&self) -> Option<&ArtifactFile> {
        self.files.iter().find(|f| f.primary)
    }

    pub fn file_named(&self, name: &str) -> Option<&ArtifactFile> {
        self.files
            .iter()
            .find(|f| f.file_name.eq_ignore_ascii_case(name))
    }
}

/// A downloadable file belonging to a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    pub file_name: String,
    pub url: String,
    /// Recorded for reference only, never verified.
    pub hash: Option<String>,
    pub primary: bool,
}

/// Dependency edge declared by a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDependency {
    pub project_id: Option<String>,
    pub required: bool,
}

/// Client for one package registry.
#[async_trait]
pub trait Registry: Send + Sync {
    fn provider(&self) -> Provider;

    async fn project(&self, reference: &str) -> UpdaterResult<ProjectDescriptor>;

    /// Versions newest first. Filtered by loader and game version unless
    /// `include_incompatible` is set.
    async fn versions(
        &self,
        project: &ProjectDescriptor,
        server: &ServerSpec,
        include_incompatible: bool,
    ) -> UpdaterResult<Vec<RegistryVersion>>;

    /// The file that should be installed for `version` on `server`.
    fn primary_file(
        &self,
        project: &ProjectDescriptor,
        version: &RegistryVersion,
        server: &ServerSpec,
    ) -> Option<ArtifactFile>;

    /// Required (never optional) dependencies of `version`, as declarations
    /// that inherit `include_incompatible`.
    async fn required_dependencies(
        &self,
        project: &ProjectDescriptor,
        version: &RegistryVersion,
        server: &ServerSpec,
        include_incompatible: bool,
    ) -> UpdaterResult<Vec<DependencySpec>>;
}

/// One client per provider.
#[derive(Clone, Default)]
pub struct RegistrySet {
    registries: HashMap<Provider, Arc<dyn Registry>>,
}

impl RegistrySet {
    /// Modrinth and Hangar clients sharing one HTTP client.
    pub fn with_defaults(client: reqwest::Client) -> Self {
        Self::default()
            .with(ModrinthClient::from_env(client.clone()))
            .with(HangarClient::new(client))
    }

    pub fn with(self, registry: impl Registry + 'static) -> Self {
        self.with_shared(Arc::new(registry))
    }

    pub fn with_shared(mut self, registry: Arc<dyn Registry>) -> Self {
        self.registries.insert(registry.provider(), registry);
        self
    }

    pub fn get(&self, provider: Provider) -> UpdaterResult<&dyn Registry> {
        self.registries
            .get(&provider)
            .map(|r| &**r)
            .ok_or_else(|| UpdaterError::Other(format!("No registry client for {}", provider)))
    }
}

/// Decode a JSON response, turning non-2xx statuses into errors.
pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> UpdaterResult<T> {
    tracing::debug!("GET {}", url);

    let resp = client.get(url).send().await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(UpdaterError::RegistryStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(resp.json::<T>().await?)
}
