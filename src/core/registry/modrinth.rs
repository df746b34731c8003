// ─── Modrinth ───
// Project, version and dependency lookups against the Modrinth v2 API.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{get_json, ArtifactFile, ProjectDescriptor, Registry, RegistryVersion, VersionDependency};
use crate::core::error::{UpdaterError, UpdaterResult};
use crate::core::manifest::{DependencySpec, ProjectSource, Provider, ServerSpec};

pub const MODRINTH_API_URL: &str = "https://api.modrinth.com/v2";
pub const MODRINTH_STAGING_API_URL: &str = "https://staging-api.modrinth.com/v2";

const STAGING_ENV_VAR: &str = "MODRINTH_STAGING";
const HASH_ALGORITHM: &str = "sha512";

#[derive(Debug, Deserialize)]
pub struct ModrinthProject {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub project_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ModrinthVersion {
    pub id: String,
    pub version_number: String,
    #[serde(default)]
    pub dependencies: Vec<ModrinthDependency>,
    #[serde(default)]
    pub files: Vec<ModrinthFile>,
}

#[derive(Debug, Deserialize)]
pub struct ModrinthFile {
    #[serde(default)]
    pub hashes: HashMap<String, String>,
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Deserialize)]
pub struct ModrinthDependency {
    pub project_id: Option<String>,
    pub dependency_type: String,
}

impl From<ModrinthVersion> for RegistryVersion {
    fn from(v: ModrinthVersion) -> Self {
        RegistryVersion {
            id: v.id,
            version_number: v.version_number,
            files: v
                .files
                .into_iter()
                .map(|mut f| ArtifactFile {
                    hash: f.hashes.remove(HASH_ALGORITHM),
                    file_name: f.filename,
                    url: f.url,
                    primary: f.primary,
                })
                .collect(),
            dependencies: v
                .dependencies
                .into_iter()
                .map(|d| VersionDependency {
                    required: d.dependency_type == "required",
                    project_id: d.project_id,
                })
                .collect(),
        }
    }
}

pub struct ModrinthClient {
    client: Client,
    base_url: String,
}

impl ModrinthClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Production API, or staging when `MODRINTH_STAGING=true`.
    pub fn from_env(client: Client) -> Self {
        let staging = std::env::var(STAGING_ENV_VAR).is_ok_and(|v| v == "true");
        Self::new(client, if staging { MODRINTH_STAGING_API_URL } else { MODRINTH_API_URL })
    }

    fn versions_url(
        &self,
        project_id: &str,
        server: &ServerSpec,
        include_incompatible: bool,
    ) -> UpdaterResult<String> {
        let base = format!("{}/project/{}/version", self.base_url, project_id);
        if include_incompatible {
            return Ok(base);
        }

        let loaders = format!("[\"{}\"]", server.loader);
        let game_versions = format!("[\"{}\"]", server.minecraft_version);
        let url = Url::parse_with_params(
            &base,
            &[("loaders", loaders.as_str()), ("game_versions", game_versions.as_str())],
        )
        .map_err(|e| UpdaterError::Other(format!("Invalid Modrinth URL {}: {}", base, e)))?;

        Ok(url.to_string())
    }
}

#[async_trait]
impl Registry for ModrinthClient {
    fn provider(&self) -> Provider {
        Provider::Modrinth
    }

    async fn project(&self, reference: &str) -> UpdaterResult<ProjectDescriptor> {
        let url = format!("{}/project/{}", self.base_url, reference);
        let project: ModrinthProject = get_json(&self.client, &url).await?;

        debug!("Modrinth project {} ({}) is a {}", project.title, project.id, project.project_type);
        Ok(ProjectDescriptor {
            provider: Provider::Modrinth,
            id: project.id,
            slug: project.slug,
            title: project.title,
        })
    }

    async fn versions(
        &self,
        project: &ProjectDescriptor,
        server: &ServerSpec,
        include_incompatible: bool,
    ) -> UpdaterResult<Vec<RegistryVersion>> {
        let url = self.versions_url(&project.id, server, include_incompatible)?;
        let versions: Vec<ModrinthVersion> = get_json(&self.client, &url).await?;

        debug!("Found {} Modrinth versions for {}", versions.len(), project.title);
        Ok(versions.into_iter().map(RegistryVersion::from).collect())
    }

    fn primary_file(
        &self,
        _project: &ProjectDescriptor,
        version: &RegistryVersion,
        _server: &ServerSpec,
    ) -> Option<ArtifactFile> {
        version.primary_file().cloned()
    }

    async fn required_dependencies(
        &self,
        project: &ProjectDescriptor,
        version: &RegistryVersion,
        _server: &ServerSpec,
        include_incompatible: bool,
    ) -> UpdaterResult<Vec<DependencySpec>> {
        let mut deps = Vec::new();
        for dep in version.dependencies.iter().filter(|d| d.required) {
            let Some(project_id) = &dep.project_id else {
                warn!(
                    "Skipping dependency of {} {} with no project ID",
                    project.title, version.version_number
                );
                continue;
            };

            let source = ProjectSource::Modrinth {
                project_id: project_id.clone(),
            };
            deps.push(DependencySpec::transitive(&source, include_incompatible));
        }
        Ok(deps)
    }
}
