use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::source::ProjectSource;
use crate::core::error::{UpdaterError, UpdaterResult};

/// Sentinel wanted-version meaning "whatever the registry lists first".
pub const LATEST_VERSION: &str = "@latest";

/// Placeholder substituted by the resolved version in `saveAs`.
pub const VERSION_PLACEHOLDER: &str = "{version}";

const TYPEWRITER_METADATA_KEY: &str = "plugin.typewriter";

/// Full manifest as read from `server_manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub ftp: Option<FtpSettings>,
    pub server: ServerSpec,
    #[serde(default)]
    pub plugins: Vec<DependencySpec>,
    #[serde(default)]
    pub mods: Vec<DependencySpec>,
}

/// The server the artifacts are meant for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    pub loader: String,
    pub minecraft_version: String,
}

/// Remote placement target.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpSettings {
    pub host: String,
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remote_path: String,
}

fn default_ftp_port() -> u16 {
    21
}

impl fmt::Debug for FtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("remote_path", &self.remote_path)
            .finish()
    }
}

/// Version constraint of a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WantedVersion {
    #[default]
    Latest,
    Exact(String),
}

impl From<String> for WantedVersion {
    fn from(raw: String) -> Self {
        if raw == LATEST_VERSION {
            WantedVersion::Latest
        } else {
            WantedVersion::Exact(raw)
        }
    }
}

impl From<WantedVersion> for String {
    fn from(wanted: WantedVersion) -> Self {
        match wanted {
            WantedVersion::Latest => LATEST_VERSION.to_string(),
            WantedVersion::Exact(v) => v,
        }
    }
}

impl fmt::Display for WantedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WantedVersion::Latest => f.write_str(LATEST_VERSION),
            WantedVersion::Exact(v) => f.write_str(v),
        }
    }
}

/// A dependency declaration, either written in the manifest or reported by a
/// registry as a required dependency of something else.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencySpec {
    /// File name template. `None` keeps the artifact's published file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_as: Option<String>,
    #[serde(default, rename = "version", alias = "wantedVersion")]
    pub wanted_version: WantedVersion,
    #[serde(default)]
    pub download_incompatible: bool,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DependencySpec {
    /// Declaration for a dependency discovered through a registry.
    pub fn transitive(source: &ProjectSource, download_incompatible: bool) -> Self {
        Self {
            save_as: None,
            wanted_version: WantedVersion::Latest,
            download_incompatible,
            metadata: source.to_metadata(),
        }
    }

    pub fn source(&self) -> UpdaterResult<ProjectSource> {
        ProjectSource::from_metadata(&self.label(), &self.metadata)
    }

    /// Human readable name used in log lines.
    pub fn label(&self) -> String {
        if let Some(save_as) = &self.save_as {
            return save_as.clone();
        }
        match ProjectSource::from_metadata("", &self.metadata) {
            Ok(source) => source.qualified_id().to_string(),
            Err(_) => "<unnamed dependency>".to_string(),
        }
    }

    /// Name on disk once `version` has been resolved; `published` is used
    /// when no template was given.
    pub fn canonical_file_name(&self, version: &str, published: &str) -> String {
        match &self.save_as {
            Some(template) => template.replace(VERSION_PLACEHOLDER, version),
            None => published.to_string(),
        }
    }

    /// Whether the canonical file name changes with the resolved version.
    /// Published names are assumed to; a `saveAs` needs the placeholder.
    pub fn has_versioned_name(&self) -> bool {
        self.save_as
            .as_deref()
            .map_or(true, |template| template.contains(VERSION_PLACEHOLDER))
    }

    /// Extension jars requested through `plugin.typewriter.extensions`.
    /// Malformed entries are reported and skipped.
    pub fn typewriter_extensions(&self) -> Vec<String> {
        let Some(meta) = self.metadata.get(TYPEWRITER_METADATA_KEY) else {
            return Vec::new();
        };

        let Some(extensions) = meta.get("extensions").and_then(Value::as_array) else {
            warn!("Invalid 'extensions' format in {} metadata", TYPEWRITER_METADATA_KEY);
            return Vec::new();
        };

        extensions
            .iter()
            .filter_map(|ext| match ext.as_str() {
                Some(name) => Some(name.to_string()),
                None => {
                    warn!("Invalid extension name in {} metadata", TYPEWRITER_METADATA_KEY);
                    None
                }
            })
            .collect()
    }
}

impl Manifest {
    /// Read and validate a manifest file. Any failure here aborts the run.
    pub async fn load(path: &Path) -> UpdaterResult<Self> {
        info!("Reading manifest {:?}", path);

        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| UpdaterError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let manifest: Manifest =
            serde_json::from_str(&raw).map_err(|e| UpdaterError::Manifest {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        manifest.validate().map_err(|reason| UpdaterError::Manifest {
            path: path.to_path_buf(),
            reason,
        })?;

        info!(
            "Manifest parsed: {} plugin(s), {} mod(s)",
            manifest.plugins.len(),
            manifest.mods.len()
        );
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), String> {
        if self.server.loader.trim().is_empty() {
            return Err("server.loader must not be empty".into());
        }
        if self.server.minecraft_version.trim().is_empty() {
            return Err("server.minecraftVersion must not be empty".into());
        }

        for (list, entries) in [("plugins", &self.plugins), ("mods", &self.mods)] {
            for (i, dep) in entries.iter().enumerate() {
                match &dep.save_as {
                    Some(name) if !name.trim().is_empty() => {}
                    _ => return Err(format!("{}[{}] is missing saveAs", list, i)),
                }
            }
        }

        if let Some(ftp) = &self.ftp {
            if ftp.host.trim().is_empty() {
                return Err("ftp.host must not be empty".into());
            }
        }

        Ok(())
    }

    pub fn has_plugins(&self) -> bool {
        !self.plugins.is_empty()
    }

    pub fn has_mods(&self) -> bool {
        !self.mods.is_empty()
    }

    /// Every top-level declaration, plugins first.
    pub fn entries(&self) -> impl Iterator<Item = &DependencySpec> {
        self.plugins.iter().chain(self.mods.iter())
    }
}
