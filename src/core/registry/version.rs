// ─── Version selection ───
// Picks one version out of the list a registry returned.

use super::RegistryVersion;
use crate::core::manifest::WantedVersion;

/// Select the version matching `wanted`.
///
/// `@latest` takes the first candidate: registries list newest first and no
/// re-sorting happens here. A literal version must match a candidate's
/// version number exactly.
pub fn resolve_version<'a>(
    candidates: &'a [RegistryVersion],
    wanted: &WantedVersion,
) -> Option<&'a RegistryVersion> {
    match wanted {
        WantedVersion::Latest => candidates.first(),
        WantedVersion::Exact(number) => candidates.iter().find(|v| &v.version_number == number),
    }
}
