use crate::config::SiteConfig;
use crate::i18n::{lang_label, resolve};
use crate::search::{filter, SearchState};
use crate::types::{format_date, format_long_date, Catalog, Post, Version};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;

pub const EMPTY_LIST_MESSAGE: &str = "No posts found.";
pub const NO_SLUG: &str = "No post specified.";
pub const POST_NOT_FOUND: &str = "Post not found.";
pub const NO_VERSION: &str = "No version available.";
pub const LOAD_FAILED: &str = "Failed to load post content.";
pub const ALL_TAGS_LABEL: &str = "all";

const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Directory a tag page is written to. Never escapes its parent.
pub fn tag_dir(tag: &str) -> String {
    let name = tag.trim().replace(['/', '\\'], "-");
    if name.is_empty() || name.chars().all(|c| c == '.') {
        name.replace('.', "-") + "-"
    } else {
        name
    }
}

/// Page URLs under the site's base path. The default language lives at the
/// root; every other language gets its own prefix.
#[derive(Debug, Clone)]
pub struct Urls {
    base: String,
    default_lang: String,
}

impl Urls {
    pub fn new(base: &str, default_lang: &str) -> Self {
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        Self {
            base,
            default_lang: default_lang.to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn home(&self, lang: &str) -> String {
        if lang == self.default_lang {
            self.base.clone()
        } else {
            format!("{}{}/", self.base, encode_segment(lang))
        }
    }

    pub fn tag(&self, lang: &str, tag: &str) -> String {
        format!("{}tags/{}/", self.home(lang), encode_segment(&tag_dir(tag)))
    }

    pub fn post(&self, slug: &str, lang: Option<&str>) -> String {
        match lang {
            Some(lang) => format!(
                "{}posts/{}/{}/",
                self.base,
                encode_segment(slug),
                encode_segment(lang)
            ),
            None => format!("{}posts/{}/", self.base, encode_segment(slug)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub date: String,
    pub display_date: String,
    pub tags: Vec<String>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagButton {
    /// Empty for the "all" button
    pub tag: String,
    pub label: String,
    pub url: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LangLink {
    pub lang: String,
    pub label: String,
    pub url: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListView {
    pub lang: String,
    pub posts: Vec<PostCard>,
    pub tags: Vec<TagButton>,
    pub empty_message: Option<&'static str>,
    pub active_tag: Option<String>,
    pub query: String,
}

fn card(post: &Post, lang: &str, urls: &Urls) -> PostCard {
    let (title, summary) = post
        .version_for(lang)
        .map(|v| (v.title.clone(), v.summary.clone()))
        .unwrap_or_default();

    PostCard {
        slug: post.slug.clone(),
        title,
        summary,
        date: post.date.clone(),
        display_date: post.display_date(),
        tags: post.tags.clone(),
        url: urls.post(&post.slug, post.resolved_lang(lang)),
    }
}

/// Tag buttons: "all" first, then every catalog tag. No tags, no buttons.
pub fn tag_buttons(catalog: &Catalog, active: Option<&str>, lang: &str, urls: &Urls) -> Vec<TagButton> {
    if catalog.tags.is_empty() {
        return Vec::new();
    }

    std::iter::once(TagButton {
        tag: String::new(),
        label: ALL_TAGS_LABEL.to_string(),
        url: urls.home(lang),
        active: active.is_none(),
    })
    .chain(catalog.tags.iter().map(|tag| TagButton {
        tag: tag.clone(),
        label: tag.clone(),
        url: urls.tag(lang, tag),
        active: active == Some(tag.as_str()),
    }))
    .collect()
}

pub fn list_view(catalog: &Catalog, state: &SearchState, lang: &str, urls: &Urls) -> ListView {
    let posts: Vec<PostCard> = filter(catalog, state, lang)
        .into_iter()
        .map(|post| card(post, lang, urls))
        .collect();

    ListView {
        lang: lang.to_string(),
        empty_message: posts.is_empty().then_some(EMPTY_LIST_MESSAGE),
        posts,
        tags: tag_buttons(catalog, state.active_tag.as_deref(), lang, urls),
        active_tag: state.active_tag.clone(),
        query: state.query.clone(),
    }
}

/// Site language switcher for the home pages.
pub fn site_languages(catalog: &Catalog, lang: &str, urls: &Urls) -> Vec<LangLink> {
    catalog
        .languages
        .iter()
        .map(|l| LangLink {
            lang: l.clone(),
            label: lang_label(l),
            url: urls.home(l),
            active: l == lang,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct SocialLink {
    pub label: &'static str,
    pub url: String,
    pub external: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AboutView {
    pub site_title: String,
    pub name: String,
    pub tagline: String,
    pub bio: String,
    pub photo: Option<String>,
    /// Avatar text when there is no photo
    pub initial: String,
    pub links: Vec<SocialLink>,
}

pub fn about_view(config: &SiteConfig, lang: &str) -> AboutView {
    let profile = &config.profile;
    let name = resolve(profile.name.as_ref(), lang);
    let initial: String = name.chars().next().map(|c| c.to_uppercase().collect()).unwrap_or_default();

    let links = &config.links;
    let external = |label, url: &Option<String>| {
        url.as_ref().map(|url| SocialLink {
            label,
            url: url.clone(),
            external: true,
        })
    };
    let links: Vec<SocialLink> = [
        external("GitHub", &links.github),
        external("LinkedIn", &links.linkedin),
        links.email.as_ref().map(|email| SocialLink {
            label: "Email",
            url: format!("mailto:{}", email),
            external: false,
        }),
        external("Scholar", &links.google_scholar),
    ]
    .into_iter()
    .flatten()
    .collect();

    AboutView {
        site_title: config.site.title.resolve(lang).to_string(),
        name,
        tagline: resolve(profile.tagline.as_ref(), lang),
        bio: resolve(profile.bio.as_ref(), lang),
        photo: profile.photo.clone(),
        initial,
        links,
    }
}

/// A post and the version that will be shown for a requested language.
#[derive(Debug, Clone, Copy)]
pub struct PostTarget<'a> {
    pub post: &'a Post,
    pub version: &'a Version,
    pub lang: &'a str,
}

/// Find what a post page shows. The error is the message the page shows
/// instead.
pub fn resolve_post<'a>(
    catalog: &'a Catalog,
    slug: Option<&str>,
    lang: &str,
) -> Result<PostTarget<'a>, &'static str> {
    let slug = slug.filter(|s| !s.is_empty()).ok_or(NO_SLUG)?;
    let post = catalog.find(slug).ok_or(POST_NOT_FOUND)?;
    let lang = post.resolved_lang(lang).ok_or(NO_VERSION)?;
    let version = post.versions.get(lang).ok_or(NO_VERSION)?;

    Ok(PostTarget {
        post,
        version,
        lang,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub slug: String,
    pub lang: String,
    pub title: String,
    pub summary: String,
    pub date: String,
    pub display_date: String,
    pub tags: Vec<String>,
    /// Empty when the post has a single version
    pub languages: Vec<LangLink>,
    pub page_title: String,
    pub content: String,
}

pub fn post_view(target: &PostTarget, site_title: &str, urls: &Urls, content: String) -> PostView {
    let post = target.post;
    let languages = if post.versions.len() > 1 {
        post.versions
            .keys()
            .map(|lang| LangLink {
                lang: lang.to_string(),
                label: lang_label(lang),
                url: urls.post(&post.slug, Some(lang)),
                active: lang == target.lang,
            })
            .collect()
    } else {
        Vec::new()
    };

    PostView {
        slug: post.slug.clone(),
        lang: target.lang.to_string(),
        title: target.version.title.clone(),
        summary: target.version.summary.clone(),
        date: post.date.clone(),
        display_date: format_long_date(&post.date),
        tags: post.tags.clone(),
        languages,
        page_title: page_title(&target.version.title, site_title),
        content,
    }
}

pub fn page_title(title: &str, site_title: &str) -> String {
    if site_title.is_empty() {
        title.to_string()
    } else {
        format!("{} | {}", title, site_title)
    }
}

/// One row per post version, for client-side search over static output.
#[derive(Debug, Clone, Serialize)]
pub struct SearchEntry {
    pub slug: String,
    pub lang: String,
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub date: String,
    pub url: String,
}

pub fn search_index(catalog: &Catalog, urls: &Urls) -> Vec<SearchEntry> {
    catalog
        .posts
        .iter()
        .flat_map(|post| {
            post.versions.iter().map(move |(lang, version)| SearchEntry {
                slug: post.slug.clone(),
                lang: lang.to_string(),
                title: version.title.clone(),
                summary: version.summary.clone(),
                tags: post.tags.clone(),
                date: format_date(&post.date),
                url: urls.post(&post.slug, Some(lang)),
            })
        })
        .collect()
}
