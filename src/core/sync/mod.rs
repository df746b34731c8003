// ─── Sync ───
// One full update run: resolve every manifest entry, place what changed and
// write the fresh placement cache.

use std::fmt;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::core::cache::{cache_key, PlacementCache, PlacementDecision};
use crate::core::downloader::Downloader;
use crate::core::error::UpdaterResult;
use crate::core::http::build_http_client;
use crate::core::manifest::{DependencySpec, Manifest};
use crate::core::registry::{ArtifactFile, RegistrySet};
use crate::core::resolve::{GraphBuilder, ProjectIdIndex, ResolveContext, ResolvedDependency};
use crate::core::transfer::{join_relative, ArtifactFetcher, FtpTarget, LocalTarget, PlacementTarget};

pub const PLUGINS_DIR: &str = "plugins";
pub const MODS_DIR: &str = "mods";
/// Below a list directory.
pub const TYPEWRITER_EXTENSIONS_DIR: &str = "Typewriter/extensions";

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub placed: usize,
    pub skipped: usize,
    pub purged: usize,
    pub failed_removals: usize,
    /// Top-level entries that could not be resolved.
    pub unresolved: usize,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} placed, {} up to date, {} purged, {} failed removals, {} unresolved",
            self.placed, self.skipped, self.purged, self.failed_removals, self.unresolved
        )
    }
}

pub struct SyncOrchestrator<'a> {
    registries: &'a RegistrySet,
    fetcher: &'a dyn ArtifactFetcher,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(registries: &'a RegistrySet, fetcher: &'a dyn ArtifactFetcher) -> Self {
        Self { registries, fetcher }
    }

    /// Bring `target` in line with `manifest`.
    ///
    /// The cache is only written once every entry has been processed, so an
    /// aborted run leaves the previous cache in place.
    pub async fn run(
        &self,
        manifest: &Manifest,
        target: &mut dyn PlacementTarget,
    ) -> UpdaterResult<SyncReport> {
        info!("Syncing into {}", target.describe());

        let mut cache = PlacementCache::load(target).await?;
        let mut ctx = ResolveContext::new(
            manifest.server.clone(),
            ProjectIdIndex::from_manifest(manifest),
        );
        let mut report = SyncReport::default();

        let lists: [(&str, &[DependencySpec]); 2] = [
            (PLUGINS_DIR, manifest.plugins.as_slice()),
            (MODS_DIR, manifest.mods.as_slice()),
        ];

        let builder = GraphBuilder::new(self.registries);
        for (dir, entries) in lists {
            if entries.is_empty() {
                continue;
            }
            info!("Processing {} {}", entries.len(), dir);

            for entry in entries {
                let Some(tree) = builder.resolve(entry, &mut ctx).await? else {
                    report.unresolved += 1;
                    continue;
                };

                for node in tree.pre_order() {
                    self.sync_node(node, dir, &mut cache, target, &mut report)
                        .await?;
                }
            }
        }

        cache.persist(target).await?;
        Ok(report)
    }

    async fn sync_node(
        &self,
        node: &ResolvedDependency,
        dir: &str,
        cache: &mut PlacementCache,
        target: &mut dyn PlacementTarget,
        report: &mut SyncReport,
    ) -> UpdaterResult<()> {
        let key = cache_key(&node.project.id, &node.file_name);
        let path = join_relative(dir, &node.file_name);
        let placed = self
            .sync_artifact(&key, &path, &node.download_url, cache, target, report)
            .await?;
        if !placed && !node.declaration.has_versioned_name() {
            debug!(
                "{} has a fixed file name; {} {} is not installed over it",
                path, node.project.title, node.version
            );
        }

        if node.extensions.is_empty() {
            return Ok(());
        }
        let ext_dir = join_relative(dir, TYPEWRITER_EXTENSIONS_DIR);
        for ArtifactFile { file_name, url, .. } in &node.extensions {
            let key = cache_key(&node.project.id, file_name);
            let path = join_relative(&ext_dir, file_name);
            self.sync_artifact(&key, &path, url, cache, target, report)
                .await?;
        }
        Ok(())
    }

    /// Returns whether the artifact was fetched and placed.
    async fn sync_artifact(
        &self,
        key: &str,
        path: &str,
        url: &str,
        cache: &mut PlacementCache,
        target: &mut dyn PlacementTarget,
        report: &mut SyncReport,
    ) -> UpdaterResult<bool> {
        match cache.decide(key, path) {
            PlacementDecision::Skip => {
                debug!("{} is up to date", path);
                report.skipped += 1;
                return Ok(false);
            }
            PlacementDecision::Duplicate(first) => {
                warn!("{} is already placed at {} this run, not placing it again", key, first);
                report.skipped += 1;
                return Ok(false);
            }
            PlacementDecision::PurgeThenPlace(old) => {
                info!("Removing outdated {}", old);
                match target.remove(&old).await {
                    Ok(()) => report.purged += 1,
                    Err(e) => {
                        warn!("Failed to remove {}: {}", old, e);
                        report.failed_removals += 1;
                    }
                }
            }
            PlacementDecision::Place => {}
        }

        info!("Downloading {}", path);
        let staged = self.fetcher.fetch(url).await?;
        target.place(path, staged).await?;
        report.placed += 1;
        Ok(true)
    }
}

/// Load the manifest at `manifest_path` and sync it into `root`, or into the
/// FTP server the manifest names.
pub async fn run_update(root: &Path, manifest_path: &Path) -> UpdaterResult<SyncReport> {
    let manifest = Manifest::load(manifest_path).await?;
    if !manifest.has_plugins() && !manifest.has_mods() {
        warn!("{} lists no plugins or mods", manifest_path.display());
    }

    let client = build_http_client()?;
    let registries = RegistrySet::with_defaults(client.clone());
    let downloader = Downloader::new(client);
    let orchestrator = SyncOrchestrator::new(&registries, &downloader);

    let mut target: Box<dyn PlacementTarget> = match &manifest.ftp {
        Some(settings) => Box::new(FtpTarget::connect(settings).await?),
        None => Box::new(LocalTarget::open(root).await?),
    };

    let result = orchestrator.run(&manifest, target.as_mut()).await;
    if let Err(e) = target.close().await {
        warn!("Failed to close {}: {}", target.describe(), e);
    }
    result
}
