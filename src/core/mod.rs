// ─── Server Updater Core ───
// Keeps a Minecraft server's plugins and mods in line with a manifest.
//
// Architecture:
//   core/
//     manifest/   — Manifest model + provider source parsing
//     registry/   — Modrinth and Hangar clients, version selection
//     resolve/    — Dependency graph builder + project id index
//     cache/      — Placement cache (skip / purge / place)
//     downloader/ — Streaming artifact downloads
//     transfer/   — Local directory and FTP placement targets
//     sync/       — One full update run

pub mod cache;
pub mod downloader;
pub mod error;
pub mod http;
pub mod manifest;
pub mod registry;
pub mod resolve;
pub mod sync;
pub mod transfer;

#[cfg(test)]
pub mod testing;
