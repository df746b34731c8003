// ─── Dependency resolution ───
// Turns manifest declarations into trees of concrete artifacts. Required
// dependencies reported by a registry are followed depth first; projects
// already accounted for (declared at top level or resolved earlier in the
// run) are never resolved twice.

mod graph;
mod index;

pub use graph::{GraphBuilder, ResolveContext, ResolvedDependency, MAX_RESOLVE_DEPTH};
pub use index::ProjectIdIndex;
