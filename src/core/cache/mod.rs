// ─── Placement cache ───
// Remembers where each artifact was put last run so unchanged files are left
// alone and changed ones are purged before being replaced.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::core::error::UpdaterResult;
use crate::core::transfer::PlacementTarget;

/// Stored at the root of the placement target.
pub const CACHE_FILE_NAME: &str = "updater_cache.json";

/// `<projectId>:<canonicalFileName>`
pub fn cache_key(project_id: &str, file_name: &str) -> String {
    format!("{}:{}", project_id, file_name)
}

/// What to do with one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementDecision {
    /// Already at the wanted path.
    Skip,
    /// Tracked at another path: remove that one first.
    PurgeThenPlace(String),
    /// Not tracked yet.
    Place,
    /// The same key was already placed at this other path earlier in the
    /// run; the later declaration is ignored.
    Duplicate(String),
}

/// Previous run's placements (read only) and this run's, built from scratch.
///
/// Only the new table is ever persisted, so entries the manifest stopped
/// referencing disappear without being purged.
#[derive(Debug, Default)]
pub struct PlacementCache {
    previous: HashMap<String, String>,
    current: BTreeMap<String, String>,
    /// Paths recorded in `current`; never purged.
    claimed: HashSet<String>,
}

impl PlacementCache {
    pub fn new(previous: HashMap<String, String>) -> Self {
        Self {
            previous,
            current: BTreeMap::new(),
            claimed: HashSet::new(),
        }
    }

    /// Read the cache document from `target`. A missing or unreadable
    /// document starts an empty cache.
    pub async fn load(target: &mut dyn PlacementTarget) -> UpdaterResult<Self> {
        let Some(raw) = target.read_document(CACHE_FILE_NAME).await? else {
            info!("No placement cache found on {}", target.describe());
            return Ok(Self::default());
        };

        match serde_json::from_slice::<HashMap<String, String>>(&raw) {
            Ok(previous) => {
                debug!("Loaded {} cache entries", previous.len());
                Ok(Self::new(previous))
            }
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", CACHE_FILE_NAME, e);
                Ok(Self::default())
            }
        }
    }

    /// Decide how to place `key` at `new_path` and record it for this run.
    ///
    /// A key keeps the first path it was given in a run. A path this run
    /// already claimed is never handed out for purging.
    pub fn decide(&mut self, key: &str, new_path: &str) -> PlacementDecision {
        if let Some(claimed) = self.current.get(key) {
            return if claimed == new_path {
                PlacementDecision::Skip
            } else {
                PlacementDecision::Duplicate(claimed.clone())
            };
        }

        self.current.insert(key.to_string(), new_path.to_string());
        self.claimed.insert(new_path.to_string());

        match self.previous.get(key) {
            Some(old) if old == new_path => PlacementDecision::Skip,
            Some(old) if self.claimed.contains(old) => {
                debug!("Not purging {}: placed again this run", old);
                PlacementDecision::Place
            }
            Some(old) => PlacementDecision::PurgeThenPlace(old.clone()),
            None => PlacementDecision::Place,
        }
    }

    pub fn previous(&self) -> &HashMap<String, String> {
        &self.previous
    }

    pub fn current(&self) -> &BTreeMap<String, String> {
        &self.current
    }

    /// Write this run's table over the stored document.
    pub async fn persist(&self, target: &mut dyn PlacementTarget) -> UpdaterResult<()> {
        let json = serde_json::to_vec_pretty(&self.current)?;
        target.write_document(CACHE_FILE_NAME, &json).await?;

        info!(
            "Saved {} cache entries ({} dropped)",
            self.current.len(),
            self.previous
                .keys()
                .filter(|k| !self.current.contains_key(*k))
                .count()
        );
        Ok(())
    }
}
