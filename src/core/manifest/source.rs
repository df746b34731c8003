use std::fmt;

use serde_json::{Map, Value};

use crate::core::error::{UpdaterError, UpdaterResult};

/// Metadata keys with this prefix name the registry an entry comes from.
pub const SOURCE_TAG_PREFIX: &str = "source.";

/// Supported registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Provider {
    Modrinth,
    Hangar,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Modrinth, Provider::Hangar];

    pub fn tag(self) -> &'static str {
        match self {
            Provider::Modrinth => "modrinth",
            Provider::Hangar => "hangar",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.tag() == tag)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Where a dependency is published, parsed from its `source.<provider>` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSource {
    Modrinth { project_id: String },
    Hangar { project_slug: String },
}

impl ProjectSource {
    pub fn provider(&self) -> Provider {
        match self {
            ProjectSource::Modrinth { .. } => Provider::Modrinth,
            ProjectSource::Hangar { .. } => Provider::Hangar,
        }
    }

    /// The identifier handed to the registry (id or slug).
    pub fn reference(&self) -> &str {
        match self {
            ProjectSource::Modrinth { project_id } => project_id,
            ProjectSource::Hangar { project_slug } => project_slug,
        }
    }

    pub fn qualified_id(&self) -> QualifiedProjectId {
        QualifiedProjectId::new(self.provider(), self.reference())
    }

    /// Parse the single `source.*` tag of a metadata map.
    ///
    /// Keys outside the `source.` namespace are ignored. Zero tags, more than
    /// one tag, an unknown provider or a tag without its identifier are all
    /// rejected rather than guessed at.
    pub fn from_metadata(entry: &str, metadata: &Map<String, Value>) -> UpdaterResult<Self> {
        let tags: Vec<&String> = metadata
            .keys()
            .filter(|key| key.starts_with(SOURCE_TAG_PREFIX))
            .collect();

        if tags.len() > 1 {
            return Err(UpdaterError::AmbiguousSource {
                entry: entry.to_string(),
                tags: tags.into_iter().cloned().collect(),
            });
        }
        let key = tags
            .first()
            .copied()
            .ok_or_else(|| UpdaterError::MissingSource {
                entry: entry.to_string(),
            })?;

        let tag = &key[SOURCE_TAG_PREFIX.len()..];
        let provider = Provider::from_tag(tag).ok_or_else(|| UpdaterError::UnknownSource {
            entry: entry.to_string(),
            tag: tag.to_string(),
        })?;

        let invalid = |reason: &str| UpdaterError::InvalidSource {
            entry: entry.to_string(),
            tag: tag.to_string(),
            reason: reason.to_string(),
        };

        let fields = metadata[key]
            .as_object()
            .ok_or_else(|| invalid("expected an object"))?;

        match provider {
            Provider::Modrinth => {
                let project_id = lookup_string(fields, &["projectId"])
                    .ok_or_else(|| invalid("projectId missing or not a string"))?;
                Ok(ProjectSource::Modrinth { project_id })
            }
            Provider::Hangar => {
                let project_slug = lookup_string(fields, &["projectSlug", "projectId"])
                    .ok_or_else(|| invalid("projectSlug missing or not a string"))?;
                Ok(ProjectSource::Hangar { project_slug })
            }
        }
    }

    /// Inverse of [`ProjectSource::from_metadata`].
    pub fn to_metadata(&self) -> Map<String, Value> {
        let (field, value) = match self {
            ProjectSource::Modrinth { project_id } => ("projectId", project_id),
            ProjectSource::Hangar { project_slug } => ("projectSlug", project_slug),
        };

        let mut fields = Map::new();
        fields.insert(field.to_string(), Value::String(value.clone()));

        let mut metadata = Map::new();
        metadata.insert(
            format!("{}{}", SOURCE_TAG_PREFIX, self.provider().tag()),
            Value::Object(fields),
        );
        metadata
    }
}

/// Field names are matched case-insensitively, first listed name wins.
fn lookup_string(fields: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}

/// A project identifier scoped to the registry that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedProjectId {
    pub provider: Provider,
    pub id: String,
}

impl QualifiedProjectId {
    pub fn new(provider: Provider, id: impl Into<String>) -> Self {
        Self {
            provider,
            id: id.into(),
        }
    }
}

impl fmt::Display for QualifiedProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.id)
    }
}
