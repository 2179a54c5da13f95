use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

const CACHE_DIR: &str = ".build-cache";
const CACHE_FILE: &str = ".build-cache/cache.json";

#[derive(Debug, Serialize, Deserialize)]
pub struct BuildCache {
    pub version: String,
    /// Keyed by post slug
    pub entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Hash of everything the post page is rendered from
    pub file_hash: String,
    /// Hash of templates, config, and shared assets
    pub template_hash: String,
    pub output_path: String,
    pub built_at: String,
}

impl BuildCache {
    /// Load cache from disk. A cache written by another version, or one that
    /// fails to parse, is discarded.
    pub fn load() -> Self {
        let content = match fs::read_to_string(CACHE_FILE) {
            Ok(content) => content,
            Err(_) => return Self::new(),
        };

        match serde_json::from_str::<Self>(&content) {
            Ok(cache) if cache.version == env!("CARGO_PKG_VERSION") => cache,
            Ok(_) => {
                log::info!("Build cache is from another version, starting fresh");
                Self::new()
            }
            Err(e) => {
                log::warn!("Ignoring unreadable build cache: {}", e);
                Self::new()
            }
        }
    }

    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            entries: HashMap::new(),
        }
    }

    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(CACHE_DIR).context("Failed to create build cache directory")?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(CACHE_FILE, json).context("Failed to write build cache")?;
        Ok(())
    }

    /// A post is rebuilt when its inputs or the shared inputs changed, or
    /// when its output went missing.
    pub fn needs_rebuild(&self, key: &str, file_hash: &str, template_hash: &str) -> bool {
        match self.entries.get(key) {
            None => true,
            Some(entry) => {
                entry.file_hash != file_hash
                    || entry.template_hash != template_hash
                    || !Path::new(&entry.output_path).exists()
            }
        }
    }

    pub fn update_entry(&mut self, key: &str, hash: String, template_hash: String, output: String) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                file_hash: hash,
                template_hash,
                output_path: output,
                built_at: chrono::Utc::now().to_rfc3339(),
            },
        );
    }

    /// Drop entries for posts that no longer exist.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.entries.retain(|key, _| keep(key));
    }
}

impl Default for BuildCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental Blake3 hash over several inputs.
#[derive(Default)]
pub struct Fingerprint {
    hasher: blake3::Hasher,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, bytes: &[u8]) -> &mut Self {
        // Length prefix keeps ("ab", "c") apart from ("a", "bc").
        self.hasher.update(&(bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
        self
    }

    pub fn add_file(&mut self, path: &Path) -> Result<&mut Self> {
        let content =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        self.add(path.to_string_lossy().as_bytes());
        Ok(self.add(&content))
    }

    pub fn finish(&self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}

/// Hash every file under `dir` that `include` accepts, in a stable order.
/// A missing directory hashes like an empty one.
pub fn hash_directory(dir: &Path, include: impl Fn(&Path) -> bool) -> Result<String> {
    let mut fingerprint = Fingerprint::new();

    if dir.exists() {
        for entry in WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| include(e.path()))
        {
            fingerprint.add_file(entry.path())?;
        }
    }

    Ok(fingerprint.finish())
}
