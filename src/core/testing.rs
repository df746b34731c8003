//! In-memory registry and fetcher used by unit tests.

use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::core::error::{UpdaterError, UpdaterResult};
use crate::core::manifest::{DependencySpec, ProjectSource, Provider, ServerSpec};
use crate::core::registry::{
    ArtifactFile, ProjectDescriptor, Registry, RegistryVersion, VersionDependency,
};
use crate::core::transfer::{ArtifactFetcher, PlacementTarget, StagedFile};

struct FakeProject {
    descriptor: ProjectDescriptor,
    versions: Vec<RegistryVersion>,
    incompatible: HashSet<String>,
}

/// Scripted registry. Versions are listed in insertion order, which the
/// tests treat as newest first.
pub struct FakeRegistry {
    provider: Provider,
    projects: Vec<FakeProject>,
    lookups: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            projects: Vec::new(),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn modrinth() -> Self {
        Self::new(Provider::Modrinth)
    }

    /// Add a project with id `id` and slug `slug`.
    pub fn project(mut self, id: &str, slug: &str) -> Self {
        self.projects.push(FakeProject {
            descriptor: ProjectDescriptor {
                provider: self.provider,
                id: id.to_string(),
                slug: slug.to_string(),
                title: slug.to_string(),
            },
            versions: Vec::new(),
            incompatible: HashSet::new(),
        });
        self
    }

    /// Append a version to the last added project. Each listed dependency
    /// is a required dependency on that project id.
    pub fn version(self, number: &str, requires: &[&str]) -> Self {
        self.version_with_files(number, requires, &[])
    }

    /// Like [`FakeRegistry::version`] with additional non-primary files.
    pub fn version_with_files(mut self, number: &str, requires: &[&str], extra_files: &[&str]) -> Self {
        let project = self.projects.last_mut().expect("add a project first");
        let slug = project.descriptor.slug.clone();

        let mut files = vec![ArtifactFile {
            file_name: format!("{}-{}.jar", slug, number),
            url: format!("https://cdn.test/{}/{}.jar", slug, number),
            hash: Some(format!("hash-{}-{}", slug, number)),
            primary: true,
        }];
        files.extend(extra_files.iter().map(|name| ArtifactFile {
            file_name: name.to_string(),
            url: format!("https://cdn.test/{}/{}/{}", slug, number, name),
            hash: None,
            primary: false,
        }));

        project.versions.push(RegistryVersion {
            id: format!("{}-{}", slug, number),
            version_number: number.to_string(),
            files,
            dependencies: requires
                .iter()
                .map(|id| VersionDependency {
                    project_id: Some(id.to_string()),
                    required: true,
                })
                .collect(),
        });
        self
    }

    /// Append a version without a primary file to the last added project.
    pub fn version_without_files(mut self, number: &str) -> Self {
        let project = self.projects.last_mut().expect("add a project first");
        project.versions.push(RegistryVersion {
            id: number.to_string(),
            version_number: number.to_string(),
            files: Vec::new(),
            dependencies: Vec::new(),
        });
        self
    }

    /// Hide the last added version of the last project from filtered lookups.
    pub fn incompatible(mut self) -> Self {
        let project = self.projects.last_mut().expect("add a project first");
        if let Some(last) = project.versions.last() {
            project.incompatible.insert(last.version_number.clone());
        }
        self
    }

    /// Every reference passed to `project`, in call order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    fn find(&self, reference: &str) -> Option<&FakeProject> {
        self.projects
            .iter()
            .find(|p| p.descriptor.id == reference || p.descriptor.slug == reference)
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn project(&self, reference: &str) -> UpdaterResult<ProjectDescriptor> {
        self.lookups.lock().unwrap().push(reference.to_string());
        self.find(reference)
            .map(|p| p.descriptor.clone())
            .ok_or_else(|| UpdaterError::RegistryStatus {
                url: format!("fake://{}/{}", self.provider, reference),
                status: 404,
            })
    }

    async fn versions(
        &self,
        project: &ProjectDescriptor,
        _server: &ServerSpec,
        include_incompatible: bool,
    ) -> UpdaterResult<Vec<RegistryVersion>> {
        let Some(p) = self.find(&project.id) else {
            return Ok(Vec::new());
        };
        Ok(p.versions
            .iter()
            .filter(|v| include_incompatible || !p.incompatible.contains(&v.version_number))
            .cloned()
            .collect())
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
        _project: &ProjectDescriptor,
        version: &RegistryVersion,
        _server: &ServerSpec,
        include_incompatible: bool,
    ) -> UpdaterResult<Vec<DependencySpec>> {
        Ok(version
            .dependencies
            .iter()
            .filter(|d| d.required)
            .filter_map(|d| d.project_id.clone())
            .map(|id| {
                let source = match self.provider {
                    Provider::Modrinth => ProjectSource::Modrinth { project_id: id },
                    Provider::Hangar => ProjectSource::Hangar { project_slug: id },
                };
                DependencySpec::transitive(&source, include_incompatible)
            })
            .collect())
    }
}

/// Ordered log of side effects shared between fakes.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, line: String) {
        self.0.lock().unwrap().push(line);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Writes the URL itself as the artifact body and remembers every fetch.
#[derive(Default)]
pub struct CountingFetcher {
    fetched: Mutex<Vec<String>>,
    journal: Option<Journal>,
}

impl CountingFetcher {
    /// Also log each fetch as `fetch <url>` into `journal`.
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            fetched: Mutex::new(Vec::new()),
            journal: Some(journal),
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactFetcher for CountingFetcher {
    async fn fetch(&self, url: &str) -> UpdaterResult<StagedFile> {
        self.fetched.lock().unwrap().push(url.to_string());
        if let Some(journal) = &self.journal {
            journal.record(format!("fetch {}", url));
        }
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(url.as_bytes())?;
        Ok(StagedFile::new(file.into_temp_path()))
    }
}

/// Parse a manifest entry from JSON.
pub fn entry(value: serde_json::Value) -> DependencySpec {
    serde_json::from_value(value).unwrap()
}

pub fn server() -> ServerSpec {
    ServerSpec {
        loader: "paper".into(),
        minecraft_version: "1.21.1".into(),
    }
}

/// A Modrinth manifest entry.
pub fn modrinth_entry(save_as: &str, project_id: &str, version: &str) -> DependencySpec {
    entry(serde_json::json!({
        "saveAs": save_as,
        "version": version,
        "metadata": { "source.modrinth": { "projectId": project_id } }
    }))
}

/// In-memory placement target that logs every operation into a journal.
pub struct RecordingTarget {
    pub files: BTreeMap<String, Vec<u8>>,
    journal: Journal,
}

impl RecordingTarget {
    pub fn new(journal: Journal) -> Self {
        Self {
            files: BTreeMap::new(),
            journal,
        }
    }

    pub fn with_file(mut self, path: &str, contents: &[u8]) -> Self {
        self.files.insert(path.to_string(), contents.to_vec());
        self
    }
}

#[async_trait]
impl PlacementTarget for RecordingTarget {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn place(&mut self, relative: &str, staged: StagedFile) -> UpdaterResult<()> {
        self.journal.record(format!("place {}", relative));
        let contents = std::fs::read(staged.path())?;
        self.files.insert(relative.to_string(), contents);
        Ok(())
    }

    async fn remove(&mut self, relative: &str) -> UpdaterResult<()> {
        self.journal.record(format!("remove {}", relative));
        self.files
            .remove(relative)
            .map(|_| ())
            .ok_or_else(|| UpdaterError::Other(format!("{} does not exist", relative)))
    }

    async fn read_document(&mut self, name: &str) -> UpdaterResult<Option<Vec<u8>>> {
        self.journal.record(format!("read {}", name));
        Ok(self.files.get(name).cloned())
    }

    async fn write_document(&mut self, name: &str, contents: &[u8]) -> UpdaterResult<()> {
        self.journal.record(format!("write {}", name));
        self.files.insert(name.to_string(), contents.to_vec());
        Ok(())
    }
}
