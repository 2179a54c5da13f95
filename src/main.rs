mod autocomplete;
mod blocks;
mod cache;
mod catalog;
mod chart_svg;
mod charts;
mod citation;
mod config;
mod debounce;
mod diagrams;
mod dom;
mod generator;
mod i18n;
mod math;
mod parser;
mod renderer;
mod search;
mod server;
mod svg;
mod syntax_highlighter;
mod types;
mod views;

use anyhow::Result;
use clap::{Parser as ClapParser, Subcommand};
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::autocomplete::{Key, KeyOutcome};
use crate::cache::{hash_directory, BuildCache, Fingerprint};
use crate::catalog::build_catalog;
use crate::charts::FsSource;
use crate::config::{load_config, SiteConfig};
use crate::debounce::Debouncer;
use crate::diagrams::DiagramAssets;
use crate::generator::Generator;
use crate::i18n::KNOWN_LANGS;
use crate::renderer::{MountContext, Renderer};
use crate::search::{SearchSession, SearchState};
use crate::server::DevServer;
use crate::types::{Catalog, Post, Version};
use crate::views::{list_view, post_view, resolve_post, PostTarget, LOAD_FAILED, POST_NOT_FOUND};

/// Path prefix recorded in each version's `file`; post sources are published
/// under `<output>/posts/`.
const PUBLISHED_POSTS_DIR: &str = "posts";
const IDLE_POLL: Duration = Duration::from_secs(1);

#[derive(ClapParser)]
#[command(name = "folio")]
#[command(about = "Static renderer for a multilingual portfolio blog")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site
    Build {
        /// Build only changed posts (incremental build)
        #[arg(short, long)]
        incremental: bool,
    },

    /// Watch for changes, rebuild, and serve the output
    Watch {
        /// Port for dev server
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Create a new post
    New {
        /// Post slug (file name without extension)
        slug: String,

        /// Post title
        title: String,

        /// Write a translation (en, zh, ja) instead of the original
        #[arg(short, long)]
        lang: Option<String>,
    },

    /// Filter the catalog the way the home page search box does
    Search {
        /// Free text; `#tag` tokens select tags
        query: Vec<String>,

        /// Language titles and summaries are matched in
        #[arg(short, long)]
        lang: Option<String>,

        /// Active tag button
        #[arg(short, long)]
        tag: Option<String>,

        /// Read input lines from stdin; `:up`, `:down`, `:tab`, `:enter`,
        /// `:esc`, and `:tag <name>` act like the search box keys and tag
        /// buttons
        #[arg(short, long)]
        interactive: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { incremental } => {
            if incremental {
                println!("Note: Incremental build uses cache to skip unchanged posts");
            }
            build_all(incremental)?;
        }
        Commands::Watch { port } => watch_mode(port)?,
        Commands::New { slug, title, lang } => create_new_post(&slug, &title, lang.as_deref())?,
        Commands::Search {
            query,
            lang,
            tag,
            interactive,
        } => {
            let config = load_config()?;
            let catalog = build_catalog(Path::new(&config.build.posts_dir), PUBLISHED_POSTS_DIR)?;
            let lang = lang.unwrap_or_else(|| config.default_lang().to_string());

            if interactive {
                interactive_search(&catalog, &config, &lang)?;
            } else {
                run_search(&catalog, &config, &lang, tag.as_deref(), &query.join(" "));
            }
        }
    }

    Ok(())
}

fn source_path(posts_dir: &Path, version: &Version) -> PathBuf {
    posts_dir.join(Path::new(&version.file).file_name().unwrap_or_default())
}

/// Everything a post's pages are rendered from besides templates and
/// shared assets: its catalog entry and every version's source.
fn post_hash(post: &Post, posts_dir: &Path) -> Result<String> {
    let mut fingerprint = Fingerprint::new();
    fingerprint.add(&serde_json::to_vec(post)?);
    for (_, version) in post.versions.iter() {
        fingerprint.add_file(&source_path(posts_dir, version))?;
    }
    Ok(fingerprint.finish())
}

/// Templates, config, and chart data or images next to the posts.
fn shared_hash(generator: &Generator, posts_dir: &Path) -> Result<String> {
    let mut fingerprint = Fingerprint::new();
    fingerprint.add(generator.template_hash().as_bytes());

    let config_path = Path::new("config.yaml");
    if config_path.exists() {
        fingerprint.add_file(config_path)?;
    }

    let assets = hash_directory(posts_dir, |path| {
        path.extension().map_or(true, |ext| ext != "md")
    })?;
    fingerprint.add(assets.as_bytes());

    Ok(fingerprint.finish())
}

struct BuildContext<'a> {
    config: &'a SiteConfig,
    catalog: &'a Catalog,
    renderer: &'a Renderer,
    generator: &'a Generator,
    mount: MountContext<'a>,
    posts_dir: &'a Path,
}

/// Write `posts/<slug>/<lang>/` for every version and `posts/<slug>/` for
/// the default language. Returns the default page's path.
fn build_post(post: &Post, ctx: &BuildContext) -> Result<PathBuf> {
    for (lang, version) in post.versions.iter() {
        let path = ctx.generator.post_path(&post.slug, Some(lang));
        let source = source_path(ctx.posts_dir, version);

        let markdown = match fs::read_to_string(&source) {
            Ok(markdown) => markdown,
            Err(e) => {
                log::warn!("Failed to read {}: {}", source.display(), e);
                ctx.generator.generate_message(LOAD_FAILED, &path)?;
                continue;
            }
        };

        let rendered = ctx.renderer.render_post(&markdown, &ctx.mount);
        log::info!(
            "{}/{}: {} math, {} citations, {} chart groups, {} diagrams",
            post.slug,
            lang,
            rendered.math_spans,
            rendered.citations,
            rendered.charts,
            rendered.diagrams
        );

        let target = PostTarget {
            post,
            version,
            lang,
        };
        let site_title = ctx.config.site.title.resolve(lang);
        let view = post_view(&target, site_title, ctx.generator.urls(), rendered.html);
        ctx.generator.generate_post(&view, &path)?;
    }

    let default_page = ctx.generator.post_path(&post.slug, None);
    match resolve_post(ctx.catalog, Some(&post.slug), ctx.config.default_lang()) {
        Ok(target) => {
            fs::copy(
                ctx.generator.post_path(&post.slug, Some(target.lang)),
                &default_page,
            )?;
        }
        Err(message) => ctx.generator.generate_message(message, &default_page)?,
    }

    Ok(default_page)
}

fn build_all(use_cache: bool) -> Result<()> {
    println!("Building site...\n");

    let config = load_config()?;
    let posts_dir = PathBuf::from(&config.build.posts_dir);
    let catalog = build_catalog(&posts_dir, PUBLISHED_POSTS_DIR)?;
    let generator = Generator::new(config.clone())?;
    let renderer = Renderer::new()?;
    let output_dir = generator.output_dir().to_path_buf();

    let assets = generator.copy_post_assets(&posts_dir)?;
    generator.copy_static_assets()?;

    let source = FsSource::new(
        vec![output_dir.clone(), PathBuf::from(".")],
        &config.build.base_path,
    );
    let ctx = BuildContext {
        config: &config,
        catalog: &catalog,
        renderer: &renderer,
        generator: &generator,
        mount: MountContext {
            source: &source,
            scale: config.build.chart_scale,
            assets: DiagramAssets::new(&config.build.base_path),
        },
        posts_dir: &posts_dir,
    };

    let shared = shared_hash(&generator, &posts_dir)?;
    let mut cache = if use_cache {
        BuildCache::load()
    } else {
        BuildCache::new()
    };

    let mut built_count = 0;
    let mut skipped_count = 0;

    for post in &catalog.posts {
        let file_hash = post_hash(post, &posts_dir)?;

        if use_cache && !cache.needs_rebuild(&post.slug, &file_hash, &shared) {
            println!("⏭  Skipping (unchanged): {}", post.slug);
            skipped_count += 1;
            continue;
        }

        println!("🔨 Building: {}", post.slug);
        let output_path = build_post(post, &ctx)?;

        cache.update_entry(
            &post.slug,
            file_hash,
            shared.clone(),
            output_path.to_string_lossy().to_string(),
        );
        built_count += 1;
    }

    cache.retain(|slug| catalog.find(slug).is_some());
    cache.save()?;

    let homes = generator.generate_homes(&catalog)?;
    generator.generate_message(POST_NOT_FOUND, &output_dir.join("404.html"))?;
    generator.write_data_files(&catalog)?;

    println!("\n✅ Build complete!");
    println!("   Built: {}", built_count);
    if use_cache {
        println!("   Skipped: {}", skipped_count);
    }
    println!("   Pages: {}", homes);
    println!("   Tags: {}", catalog.tags.len());
    println!("   Assets: {}", assets);

    Ok(())
}

fn slugify(text: &str) -> String {
    let slug: String = text
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '_' { '-' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect();

    slug.split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn create_new_post(slug: &str, title: &str, lang: Option<&str>) -> Result<()> {
    let config = load_config()?;

    let slug = slugify(slug);
    if slug.is_empty() {
        anyhow::bail!("Slug must contain at least one letter or digit");
    }

    let file_name = match lang {
        Some(lang) if KNOWN_LANGS.contains(&lang) => format!("{}.{}.md", slug, lang),
        Some(lang) => anyhow::bail!(
            "Unknown language '{}' (expected one of: {})",
            lang,
            KNOWN_LANGS.join(", ")
        ),
        None => format!("{}.md", slug),
    };

    let posts_dir = Path::new(&config.build.posts_dir);
    let path = posts_dir.join(&file_name);

    if path.exists() {
        anyhow::bail!("Post already exists: {}", path.display());
    }

    let content = format!(
        r#"---
title: "{}"
date: {}
tags: []
summary: ""
---

Write your post here...
"#,
        title.replace('"', "\\\""),
        chrono::Local::now().format("%Y-%m-%d")
    );

    fs::create_dir_all(posts_dir)?;
    fs::write(&path, content)?;

    println!("✅ Created: {}", path.display());
    println!("   Title: {}", title);
    println!("   Slug: {}", slug);

    Ok(())
}

fn run_search(catalog: &Catalog, config: &SiteConfig, lang: &str, tag: Option<&str>, query: &str) {
    let mut state = SearchState::new();
    state.click_tag(tag);
    state.apply_input(query);

    let urls = views::Urls::new(&config.build.base_path, config.default_lang());
    let view = list_view(catalog, &state, lang, &urls);

    if let Some(message) = view.empty_message {
        println!("{}", message);
        return;
    }

    for post in &view.posts {
        println!("{}\t{}\t{}", post.display_date, post.title, post.url);
    }
}

fn print_results(posts: &[&Post], lang: &str) {
    if posts.is_empty() {
        println!("{}", views::EMPTY_LIST_MESSAGE);
        return;
    }

    println!("{} result(s)", posts.len());
    for post in posts {
        let title = post.version_for(lang).map(|v| v.title.as_str()).unwrap_or("");
        println!("  {}\t{}", post.slug, title);
    }
}

fn parse_key(command: &str) -> Option<Key> {
    match command {
        ":up" => Some(Key::Up),
        ":down" => Some(Key::Down),
        ":tab" => Some(Key::Tab),
        ":enter" => Some(Key::Enter),
        ":esc" => Some(Key::Escape),
        _ => None,
    }
}

/// Drive a search session from stdin. Each plain line replaces the input
/// text; results re-render once input has been quiet for the debounce delay.
fn interactive_search(catalog: &Catalog, config: &SiteConfig, lang: &str) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let debouncer = Debouncer::from_millis(config.build.search_debounce_ms);
    let mut session = SearchSession::new(catalog, lang, debouncer);
    let print_lang = lang.to_string();
    session.subscribe(move |posts| print_results(posts, &print_lang));

    print_results(&session.results(), lang);

    loop {
        let timeout = session.pending_delay(Instant::now()).unwrap_or(IDLE_POLL);

        let line = match rx.recv_timeout(timeout) {
            Ok(line) => line,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                session.tick(Instant::now());
                continue;
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                if session.has_pending() {
                    session.flush();
                }
                return Ok(());
            }
        };

        let line = line.trim_end();
        if let Some(key) = parse_key(line) {
            match session.press(key) {
                KeyOutcome::Committed(tag) => println!("> {} (#{})", session.input(), tag),
                KeyOutcome::Moved => print_suggestions(&session),
                KeyOutcome::Dismissed | KeyOutcome::Ignored => {}
            }
        } else if let Some(tag) = line.strip_prefix(":tag") {
            session.click_tag(Some(tag.trim()));
        } else if line == ":all" {
            session.click_tag(None);
        } else {
            session.type_text(line, Instant::now());
            print_suggestions(&session);
        }
    }
}

fn print_suggestions(session: &SearchSession) {
    if !session.popup_open() {
        return;
    }

    let highlighted = session.highlighted();
    let items: Vec<String> = session
        .suggestions()
        .iter()
        .map(|tag| {
            if Some(tag.as_str()) == highlighted {
                format!("[#{}]", tag)
            } else {
                format!("#{}", tag)
            }
        })
        .collect();
    println!("  suggestions: {}", items.join(" "));
}

fn watch_mode(port: u16) -> Result<()> {
    use notify::{Event, RecursiveMode, Result as NotifyResult, Watcher};

    let config = load_config()?;
    let output_dir = PathBuf::from(&config.build.output_dir);

    println!("🔍 Watch mode starting...");
    println!("   Watching for changes in:");
    println!("   - {}/", config.build.posts_dir);
    println!("   - {}/", config.build.templates_dir);
    println!("   - config.yaml");
    println!("\n   Serving on http://localhost:{}", port);
    println!("   Press Ctrl+C to stop\n");

    println!("📦 Initial build...");
    build_all(true)?;
    println!();

    let server = DevServer::new(&output_dir, &config.build.base_path, config.default_lang());
    let server_thread = std::thread::spawn(move || {
        if let Err(e) = server.run(port) {
            eprintln!("Dev server error: {}", e);
        }
    });

    let (tx, rx) = mpsc::channel();

    let mut watcher = notify::recommended_watcher(move |res: NotifyResult<Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;

    watcher.watch(Path::new(&config.build.posts_dir), RecursiveMode::Recursive)?;
    for optional in [config.build.templates_dir.as_str(), "static", "config.yaml"] {
        let path = Path::new(optional);
        if path.exists() {
            watcher.watch(path, RecursiveMode::Recursive)?;
        }
    }

    // Editors emit bursts of events per save; rebuild once the burst is over.
    let mut debouncer = Debouncer::from_millis(config.build.search_debounce_ms);

    loop {
        let timeout = debouncer.remaining(Instant::now()).unwrap_or(IDLE_POLL);

        match rx.recv_timeout(timeout) {
            Ok(event) => {
                if should_rebuild(&event, &output_dir) {
                    debouncer.schedule(Instant::now());
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if debouncer.poll(Instant::now()) {
                    println!("📝 File changed, rebuilding...");
                    match build_all(true) {
                        Ok(_) => println!("✅ Rebuild complete!\n"),
                        Err(e) => eprintln!("❌ Build error: {:#}\n", e),
                    }
                }
                if server_thread.is_finished() {
                    anyhow::bail!("Dev server stopped unexpectedly");
                }
            }
            Err(e) => {
                anyhow::bail!("Watch error: {}", e);
            }
        }
    }
}

fn should_rebuild(event: &notify::Event, output_dir: &Path) -> bool {
    use notify::EventKind;

    match event.kind {
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_) => {
            event.paths.iter().all(|path| {
                !path.components().any(|c| c.as_os_str() == ".build-cache")
                    && !path.starts_with(output_dir)
                    && !output_dir
                        .file_name()
                        .is_some_and(|name| path.components().any(|c| c.as_os_str() == name))
            })
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, EventKind};

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("How to Read"), "how-to-read");
        assert_eq!(slugify("  JEPA_vs SimSiam!! "), "jepa-vs-simsiam");
        assert_eq!(slugify("--"), "");
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key(":tab"), Some(Key::Tab));
        assert_eq!(parse_key(":esc"), Some(Key::Escape));
        assert_eq!(parse_key("tab"), None);
    }

    #[test]
    fn test_should_rebuild_ignores_output() {
        let output = Path::new("dist");
        let event = |path: &str| {
            notify::Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from(path))
        };

        assert!(should_rebuild(&event("posts/a.md"), output));
        assert!(!should_rebuild(&event("dist/index.html"), output));
        assert!(!should_rebuild(&event(".build-cache/cache.json"), output));
        assert!(!should_rebuild(
            &notify::Event::new(EventKind::Access(notify::event::AccessKind::Any)),
            output
        ));
    }
}
