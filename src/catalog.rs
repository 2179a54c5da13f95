use crate::i18n::{LangMap, ORIGINAL};
use crate::parser::Parser;
use crate::types::{Catalog, Post, Version};
use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Scan `posts_dir` for `*.md` files and assemble the catalog.
///
/// `file_prefix` is the path under which post files are published
/// (`posts` gives `posts/<file>.md` in each version's `file`).
pub fn build_catalog(posts_dir: &Path, file_prefix: &str) -> Result<Catalog> {
    let mut languages = BTreeSet::new();

    if !posts_dir.exists() {
        log::warn!("{} does not exist", posts_dir.display());
        return Ok(Catalog {
            languages: vec![ORIGINAL.to_string()],
            generated_at: Some(chrono::Utc::now().to_rfc3339()),
            ..Catalog::default()
        });
    }

    let mut posts: Vec<Post> = Vec::new();
    let mut index_by_slug: HashMap<String, usize> = HashMap::new();
    let mut all_tags = BTreeSet::new();

    for entry in WalkDir::new(posts_dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
    {
        let path = entry.path();
        let source = match Parser::parse_file(path) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("Skipping {}: {:#}", path.display(), e);
                continue;
            }
        };

        log::info!("Processing {}", source.file_name);

        let idx = *index_by_slug
            .entry(source.slug.clone())
            .or_insert_with(|| {
                posts.push(Post {
                    slug: source.slug.clone(),
                    date: String::new(),
                    tags: Vec::new(),
                    versions: LangMap::new(),
                });
                posts.len() - 1
            });
        let post = &mut posts[idx];

        let date = source
            .frontmatter
            .date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

        if source.lang == ORIGINAL || post.date.is_empty() {
            post.date = date;
            post.tags = source.frontmatter.tags.clone();
        }

        post.versions.insert(
            source.lang.clone(),
            Version {
                title: source.frontmatter.title,
                summary: source.frontmatter.summary,
                file: format!("{}/{}", file_prefix.trim_end_matches('/'), source.file_name),
            },
        );

        all_tags.extend(source.frontmatter.tags);
        if source.lang != ORIGINAL {
            languages.insert(source.lang);
        }
    }

    posts.sort_by(|a, b| b.date.cmp(&a.date));

    Ok(Catalog {
        posts,
        languages: std::iter::once(ORIGINAL.to_string())
            .chain(languages)
            .collect(),
        tags: all_tags.into_iter().collect(),
        generated_at: Some(chrono::Utc::now().to_rfc3339()),
    })
}

/// Load a published catalog. A missing or malformed file yields an empty
/// catalog so callers can still render an empty state.
pub fn load_catalog(path: &Path) -> Catalog {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("Failed to load {}: {}", path.display(), e);
            return Catalog::default();
        }
    };

    serde_json::from_str(&content).unwrap_or_else(|e| {
        log::warn!("Failed to parse {}: {}", path.display(), e);
        Catalog::default()
    })
}

pub fn save_catalog(catalog: &Catalog, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(catalog).context("Failed to serialize catalog")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
