use crate::cache::Fingerprint;
use crate::catalog::save_catalog;
use crate::config::SiteConfig;
use crate::dom::escape_html;
use crate::search::SearchState;
use crate::types::Catalog;
use crate::views::{
    about_view, list_view, search_index, site_languages, tag_dir, PostView, Urls,
    EMPTY_LIST_MESSAGE,
};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};
use walkdir::WalkDir;

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("post.html", include_str!("../templates/post.html")),
    ("message.html", include_str!("../templates/message.html")),
];

pub struct Generator {
    tera: Tera,
    config: SiteConfig,
    urls: Urls,
    output_dir: PathBuf,
    template_hash: String,
}

/// Built-in templates, replaced by same-named files from `dir` when it exists.
fn collect_templates(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut templates: BTreeMap<String, String> = BUILTIN_TEMPLATES
        .iter()
        .map(|(name, content)| (name.to_string(), content.to_string()))
        .collect();

    if !dir.exists() {
        return Ok(templates);
    }

    for entry in WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "html"))
    {
        let path = entry.path();
        let name = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        templates.insert(name, content);
    }

    Ok(templates)
}

impl Generator {
    pub fn new(config: SiteConfig) -> Result<Self> {
        let templates = collect_templates(Path::new(&config.build.templates_dir))?;

        let mut fingerprint = Fingerprint::new();
        for (name, content) in &templates {
            fingerprint.add(name.as_bytes()).add(content.as_bytes());
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates).context("Failed to load templates")?;
        tera.set_escape_fn(escape_html);

        Ok(Self {
            tera,
            urls: Urls::new(&config.build.base_path, config.default_lang()),
            output_dir: PathBuf::from(&config.build.output_dir),
            template_hash: fingerprint.finish(),
            config,
        })
    }

    pub fn urls(&self) -> &Urls {
        &self.urls
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Hash of every template in use.
    pub fn template_hash(&self) -> &str {
        &self.template_hash
    }

    fn base_context(&self, lang: &str) -> TeraContext {
        let mut context = TeraContext::new();
        context.insert("lang", lang);
        context.insert("base_path", self.urls.base());
        context.insert("home_url", &self.urls.home(lang));
        context.insert("site_title", self.config.site.title.resolve(lang));
        context
    }

    fn write_page(&self, template: &str, context: &TeraContext, path: &Path) -> Result<()> {
        let html = self
            .tera
            .render(template, context)
            .with_context(|| format!("Failed to render {}", template))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, html).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Output directory of a home page. The default language sits at the root.
    fn home_dir(&self, lang: &str) -> PathBuf {
        if lang == self.config.default_lang() {
            self.output_dir.clone()
        } else {
            self.output_dir.join(lang)
        }
    }

    /// Home page for `lang`, optionally with a tag pre-selected.
    pub fn generate_home(&self, catalog: &Catalog, lang: &str, tag: Option<&str>) -> Result<PathBuf> {
        let mut state = SearchState::new();
        state.click_tag(tag);

        let mut context = self.base_context(lang);
        context.insert("about", &about_view(&self.config, lang));
        context.insert("list", &list_view(catalog, &state, lang, &self.urls));
        context.insert("languages", &site_languages(catalog, lang, &self.urls));
        context.insert("search_debounce_ms", &self.config.build.search_debounce_ms);
        context.insert("empty_list_message", EMPTY_LIST_MESSAGE);

        let mut path = self.home_dir(lang);
        if let Some(tag) = state.active_tag.as_deref() {
            path = path.join("tags").join(tag_dir(tag));
        }
        let path = path.join("index.html");

        self.write_page("index.html", &context, &path)?;
        Ok(path)
    }

    /// Home pages for every language, plus one page per tag.
    pub fn generate_homes(&self, catalog: &Catalog) -> Result<usize> {
        let default_lang = self.config.default_lang();
        let mut languages = vec![default_lang.to_string()];
        languages.extend(catalog.languages.iter().filter(|l| *l != default_lang).cloned());

        let mut count = 0;
        for lang in &languages {
            self.generate_home(catalog, lang, None)?;
            count += 1;
            for tag in &catalog.tags {
                self.generate_home(catalog, lang, Some(tag))?;
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn post_path(&self, slug: &str, lang: Option<&str>) -> PathBuf {
        let dir = self.output_dir.join("posts").join(slug);
        match lang {
            Some(lang) => dir.join(lang).join("index.html"),
            None => dir.join("index.html"),
        }
    }

    pub fn generate_post(&self, view: &PostView, path: &Path) -> Result<()> {
        let mut context = self.base_context(&view.lang);
        context.insert("post", view);
        self.write_page("post.html", &context, path)
    }

    /// A page showing only `message`, e.g. for a post that cannot be shown.
    pub fn generate_message(&self, message: &str, path: &Path) -> Result<()> {
        let lang = self.config.default_lang();
        let mut context = self.base_context(lang);
        context.insert("message", message);
        context.insert("page_title", self.config.site.title.resolve(lang));
        self.write_page("message.html", &context, path)
    }

    /// posts.json, config.json, and search-index.json.
    pub fn write_data_files(&self, catalog: &Catalog) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        save_catalog(catalog, &self.output_dir.join("posts.json"))?;
        self.config.write_json(&self.output_dir.join("config.json"))?;

        let index = search_index(catalog, &self.urls);
        let json = serde_json::to_string(&index).context("Failed to serialize search index")?;
        fs::write(self.output_dir.join("search-index.json"), json)
            .context("Failed to write search-index.json")?;
        Ok(())
    }

    /// Copy the posts directory (sources, chart data, images) to
    /// `<output>/posts/` so published `file` paths and chart sources resolve.
    pub fn copy_post_assets(&self, posts_dir: &Path) -> Result<usize> {
        if !posts_dir.exists() {
            return Ok(0);
        }
        copy_dir_all(posts_dir, &self.output_dir.join("posts"))
    }

    /// Copy static assets from static/ to the output directory
    pub fn copy_static_assets(&self) -> Result<()> {
        let src = Path::new("static");

        if !src.exists() {
            return Ok(());
        }

        copy_dir_all(src, &self.output_dir)?;
        println!("Copied static assets");

        Ok(())
    }
}

/// Recursively copy a directory. Returns the number of files copied.
fn copy_dir_all(src: &Path, dst: &Path) -> Result<usize> {
    fs::create_dir_all(dst)?;
    let mut copied = 0;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copied += copy_dir_all(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)
                .with_context(|| format!("Failed to copy {}", src_path.display()))?;
            copied += 1;
        }
    }

    Ok(copied)
}
