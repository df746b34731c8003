use std::collections::HashSet;

use crate::core::manifest::{Manifest, QualifiedProjectId};

/// Projects already accounted for in this run.
///
/// Seeded with every top-level manifest declaration and grown as nodes
/// resolve. There is no removal: a project that entered the index stays
/// there until the run ends.
#[derive(Debug, Clone, Default)]
pub struct ProjectIdIndex {
    ids: HashSet<QualifiedProjectId>,
}

impl ProjectIdIndex {
    /// Declarations whose source cannot be parsed are left out; they are
    /// reported when the entry itself is resolved.
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut index = Self::default();
        for entry in manifest.entries() {
            if let Ok(source) = entry.source() {
                index.insert(source.qualified_id());
            }
        }
        index
    }

    /// Returns `true` when the id was not present yet.
    pub fn insert(&mut self, id: QualifiedProjectId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: &QualifiedProjectId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::Provider;
    use serde_json::json;

    #[test]
    fn seeds_from_both_lists_and_skips_broken_entries() {
        let manifest: Manifest = serde_json::from_value(json!({
            "server": { "loader": "paper", "minecraftVersion": "1.21.1" },
            "plugins": [
                { "saveAs": "a.jar", "metadata": { "source.hangar": { "projectSlug": "ViaVersion" } } },
                { "saveAs": "b.jar", "metadata": {} }
            ],
            "mods": [
                { "saveAs": "c.jar", "metadata": { "source.modrinth": { "projectId": "AANobbMI" } } }
            ]
        }))
        .unwrap();

        let index = ProjectIdIndex::from_manifest(&manifest);
        assert_eq!(index.len(), 2);
        assert!(index.contains(&QualifiedProjectId::new(Provider::Hangar, "ViaVersion")));
        assert!(index.contains(&QualifiedProjectId::new(Provider::Modrinth, "AANobbMI")));
    }

    #[test]
    fn ids_are_scoped_by_provider() {
        let mut index = ProjectIdIndex::default();
        assert!(index.insert(QualifiedProjectId::new(Provider::Modrinth, "luckperms")));
        assert!(!index.insert(QualifiedProjectId::new(Provider::Modrinth, "luckperms")));
        assert!(!index.contains(&QualifiedProjectId::new(Provider::Hangar, "luckperms")));
    }
}
