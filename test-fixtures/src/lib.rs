//! Test fixtures for the explore workspace: an in-memory backend, a static
//! embedder, and explore definitions under `explores/`.

pub mod connector;
pub mod embedder;
pub mod record;

use std::path::PathBuf;

use explore_core::config::RetrievalConfig;

pub use connector::InMemoryConnector;
pub use embedder::StaticEmbedder;
pub use record::Record;

/// Root directory of the explore fixture files.
pub fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("explores")
}

pub fn fixture_path(relative_path: &str) -> PathBuf {
    fixtures_root().join(relative_path)
}

/// Load and validate an explore definition.
///
/// # Panics
/// Panics if the file doesn't exist or isn't a valid explore.
pub fn load_explore(relative_path: &str) -> RetrievalConfig {
    let path = fixture_path(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    RetrievalConfig::from_toml_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

/// All `.toml` files under `explores/`.
pub fn list_explores() -> Vec<PathBuf> {
    let dir = fixtures_root();
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            path.extension().is_some_and(|ext| ext == "toml").then_some(path)
        })
        .collect();
    paths.sort();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_root_exists() {
        assert!(fixtures_root().exists(), "explores directory not found");
    }

    #[test]
    fn every_explore_fixture_loads() {
        let paths = list_explores();
        assert!(paths.len() >= 3);
        for path in paths {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap();
            let config = load_explore(name);
            assert_eq!(format!("{}.toml", config.name), name);
        }
    }
}
