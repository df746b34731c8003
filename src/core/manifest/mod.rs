mod model;
mod source;

pub use model::{
    DependencySpec, FtpSettings, Manifest, ServerSpec, WantedVersion, LATEST_VERSION,
    VERSION_PLACEHOLDER,
};
pub use source::{Provider, ProjectSource, QualifiedProjectId, SOURCE_TAG_PREFIX};
