// ─── Hangar ───
// PaperMC's plugin repository. Versions carry no file list, so the download
// URL and file name are derived from the project, version and platform.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{get_json, ArtifactFile, ProjectDescriptor, Registry, RegistryVersion};
use crate::core::error::{UpdaterError, UpdaterResult};
use crate::core::manifest::{DependencySpec, Provider, ServerSpec};

pub const HANGAR_API_URL: &str = "https://hangar.papermc.io/api/v1";

/// Page size requested from the versions endpoint.
const VERSIONS_PAGE_LIMIT: u32 = 25;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HangarProject {
    #[serde(alias = "id", default)]
    pub project_id: i64,
    pub name: String,
    pub namespace: HangarNamespace,
}

#[derive(Debug, Deserialize)]
pub struct HangarNamespace {
    #[serde(default)]
    pub owner: String,
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct HangarVersionsResponse {
    #[serde(default)]
    pub result: Vec<HangarVersion>,
}

#[derive(Debug, Deserialize)]
pub struct HangarVersion {
    pub name: String,
}

/// Hangar platform a server loader runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HangarPlatform {
    Paper,
    Velocity,
    Waterfall,
}

impl HangarPlatform {
    pub fn for_loader(loader: &str) -> Option<Self> {
        match loader.to_ascii_lowercase().as_str() {
            "paper" | "spigot" | "bukkit" => Some(Self::Paper),
            "velocity" => Some(Self::Velocity),
            "waterfall" | "bungeecord" => Some(Self::Waterfall),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paper => "PAPER",
            Self::Velocity => "VELOCITY",
            Self::Waterfall => "WATERFALL",
        }
    }
}

pub struct HangarClient {
    client: Client,
    base_url: String,
}

impl HangarClient {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, HANGAR_API_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn versions_url(
        &self,
        project: &ProjectDescriptor,
        server: &ServerSpec,
        include_incompatible: bool,
    ) -> UpdaterResult<String> {
        let base = format!("{}/projects/{}/versions", self.base_url, project.slug);

        let mut params: Vec<(&str, String)> = Vec::new();
        if !include_incompatible {
            if let Some(platform) = HangarPlatform::for_loader(&server.loader) {
                params.push(("platform", platform.as_str().to_string()));
                params.push(("platformVersion", server.minecraft_version.clone()));
            }
        }
        params.push(("limit", VERSIONS_PAGE_LIMIT.to_string()));
        params.push(("offset", "0".to_string()));

        let url = Url::parse_with_params(&base, &params)
            .map_err(|e| UpdaterError::Other(format!("Invalid Hangar URL {}: {}", base, e)))?;
        Ok(url.to_string())
    }
}

#[async_trait]
impl Registry for HangarClient {
    fn provider(&self) -> Provider {
        Provider::Hangar
    }

    async fn project(&self, reference: &str) -> UpdaterResult<ProjectDescriptor> {
        let url = format!("{}/projects/{}", self.base_url, reference);
        let project: HangarProject = get_json(&self.client, &url).await?;

        debug!(
            "Hangar project {}/{} has id {}",
            project.namespace.owner, project.namespace.slug, project.project_id
        );
        Ok(ProjectDescriptor {
            provider: Provider::Hangar,
            id: project.project_id.to_string(),
            slug: project.namespace.slug,
            title: project.name,
        })
    }

    async fn versions(
        &self,
        project: &ProjectDescriptor,
        server: &ServerSpec,
        include_incompatible: bool,
    ) -> UpdaterResult<Vec<RegistryVersion>> {
        let url = self.versions_url(project, server, include_incompatible)?;
        let response: HangarVersionsResponse = get_json(&self.client, &url).await?;

        debug!("Found {} Hangar versions for {}", response.result.len(), project.title);
        Ok(response
            .result
            .into_iter()
            .map(|v| RegistryVersion {
                id: v.name.clone(),
                version_number: v.name,
                files: Vec::new(),
                dependencies: Vec::new(),
            })
            .collect())
    }

    fn primary_file(
        &self,
        project: &ProjectDescriptor,
        version: &RegistryVersion,
        server: &ServerSpec,
    ) -> Option<ArtifactFile> {
        let Some(platform) = HangarPlatform::for_loader(&server.loader) else {
            warn!("Hangar has no platform for loader '{}'", server.loader);
            return None;
        };

        let url = format!(
            "{}/projects/{}/versions/{}/{}/download",
            self.base_url,
            project.slug,
            version.version_number,
            platform.as_str()
        );
        let file_name = format!("{}-{}.jar", project.title, version.version_number).replace(' ', "-");

        Some(ArtifactFile {
            file_name,
            url,
            hash: None,
            primary: true,
        })
    }

    async fn required_dependencies(
        &self,
        _project: &ProjectDescriptor,
        _version: &RegistryVersion,
        _server: &ServerSpec,
        _include_incompatible: bool,
    ) -> UpdaterResult<Vec<DependencySpec>> {
        // Hangar's platformDependencies list game versions, not plugins.
        Ok(Vec::new())
    }
}
