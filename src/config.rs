use crate::charts::AxisScale;
use crate::i18n::{LocalizedText, ORIGINAL};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// `site:` section of config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSection {
    #[serde(default = "default_site_title")]
    pub title: LocalizedText,
    #[serde(default = "default_lang")]
    pub default_lang: String,
}

/// `profile:` section, shown in the home page about block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Links {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_scholar: Option<String>,
}

/// Build configuration from config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_posts_dir")]
    pub posts_dir: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Overrides the built-in templates when the directory exists
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,
    /// URL prefix the site is served under (default: "/")
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Scale chart groups start in (default: log)
    #[serde(default)]
    pub chart_scale: AxisScale,
    /// Delay before a search re-render, in milliseconds
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
}

/// Complete config.yaml structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SiteConfig {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub links: Links,
    #[serde(default, skip_serializing)]
    pub build: BuildConfig,
}

impl SiteConfig {
    /// Language used when nothing else was asked for.
    pub fn default_lang(&self) -> &str {
        &self.site.default_lang
    }

    /// Publish the client-facing part (`site`, `profile`, `links`) as config.json.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            title: default_site_title(),
            default_lang: default_lang(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            posts_dir: default_posts_dir(),
            output_dir: default_output_dir(),
            templates_dir: default_templates_dir(),
            base_path: default_base_path(),
            chart_scale: AxisScale::default(),
            search_debounce_ms: default_search_debounce_ms(),
        }
    }
}

fn default_site_title() -> LocalizedText {
    LocalizedText::from("Portfolio")
}

fn default_lang() -> String {
    ORIGINAL.to_string()
}

fn default_posts_dir() -> String {
    "posts".to_string()
}

fn default_output_dir() -> String {
    "dist".to_string()
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

fn default_base_path() -> String {
    "/".to_string()
}

fn default_search_debounce_ms() -> u64 {
    200
}

pub fn load_config() -> Result<SiteConfig> {
    load_config_from(Path::new("config.yaml"))
}

pub fn load_config_from(config_path: &Path) -> Result<SiteConfig> {
    let mut config: SiteConfig = if config_path.exists() {
        let content = fs::read_to_string(config_path).context("Failed to read config.yaml")?;
        serde_yaml::from_str(&content).context("Failed to parse config.yaml")?
    } else {
        log::warn!("{} not found, using defaults", config_path.display());
        SiteConfig::default()
    };

    if !config.build.base_path.ends_with('/') {
        config.build.base_path.push('/');
    }

    Ok(config)
}
