use crate::catalog::load_catalog;
use crate::dom::escape_html;
use crate::views::{resolve_post, POST_NOT_FOUND};
use anyhow::{Context, Result};
use percent_encoding::percent_decode_str;
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Component, Path, PathBuf};

const DEV_SERVER_BUFFER_SIZE: usize = 4096;
const POST_PAGE: &str = "post.html";

/// What a request resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    File(PathBuf),
    /// Post page that cannot be shown, with the message to show
    Message(&'static str),
    NotFound,
}

/// Serves the output directory, and answers `post.html?slug=..&lang=..`
/// with the matching generated post page.
pub struct DevServer {
    root: PathBuf,
    base_path: String,
    default_lang: String,
}

/// Split a request target into its decoded path and query pairs.
pub fn parse_target(target: &str) -> (String, Vec<(String, String)>) {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let path = percent_decode_str(path).decode_utf8_lossy().to_string();

    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect();

    (path, params)
}

fn decode_component(text: &str) -> String {
    percent_decode_str(&text.replace('+', " "))
        .decode_utf8_lossy()
        .to_string()
}

pub fn query_param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

impl DevServer {
    pub fn new(root: impl Into<PathBuf>, base_path: &str, default_lang: &str) -> Self {
        Self {
            root: root.into(),
            base_path: base_path.to_string(),
            default_lang: default_lang.to_string(),
        }
    }

    pub fn route(&self, target: &str) -> Route {
        let (path, params) = parse_target(target);

        let Some(relative) = path
            .strip_prefix(&self.base_path)
            .or_else(|| path.strip_prefix(self.base_path.trim_end_matches('/')))
        else {
            return Route::NotFound;
        };
        let relative = relative.trim_start_matches('/');

        if relative == POST_PAGE {
            return self.route_post(&params);
        }

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Route::NotFound;
        }

        let file = self.root.join(relative);
        let file = if file.is_dir() {
            file.join("index.html")
        } else {
            file
        };

        if file.is_file() {
            Route::File(file)
        } else {
            Route::NotFound
        }
    }

    fn route_post(&self, params: &[(String, String)]) -> Route {
        let catalog = load_catalog(&self.root.join("posts.json"));
        let lang = query_param(params, "lang")
            .filter(|lang| !lang.is_empty())
            .unwrap_or(self.default_lang.as_str());

        let target = match resolve_post(&catalog, query_param(params, "slug"), lang) {
            Ok(target) => target,
            Err(message) => return Route::Message(message),
        };

        let page = self
            .root
            .join("posts")
            .join(&target.post.slug)
            .join(target.lang)
            .join("index.html");

        if page.is_file() {
            Route::File(page)
        } else {
            log::warn!("{} is in posts.json but was not generated", page.display());
            Route::Message(POST_NOT_FOUND)
        }
    }

    /// Status, content type, and body for a request target.
    pub fn respond(&self, target: &str) -> (&'static str, &'static str, Vec<u8>) {
        match self.route(target) {
            Route::File(path) => match fs::read(&path) {
                Ok(contents) => ("200 OK", get_content_type(&path), contents),
                Err(_) => ("404 NOT FOUND", "text/plain", b"404 Not Found".to_vec()),
            },
            Route::Message(message) => ("404 NOT FOUND", "text/html", self.message_page(message)),
            Route::NotFound => ("404 NOT FOUND", "text/plain", b"404 Not Found".to_vec()),
        }
    }

    fn message_page(&self, message: &str) -> Vec<u8> {
        if message == POST_NOT_FOUND {
            if let Ok(page) = fs::read(self.root.join("404.html")) {
                return page;
            }
        }

        format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"UTF-8\"><title>{0}</title></head>\
             <body><div class=\"error-message\">{0}</div></body></html>\n",
            escape_html(message)
        )
        .into_bytes()
    }

    pub fn run(&self, port: u16) -> Result<()> {
        let listener = TcpListener::bind(format!("127.0.0.1:{}", port))
            .context("Failed to bind dev server")?;

        println!("🌐 Dev server listening on http://localhost:{}{}", port, self.base_path);

        for stream in listener.incoming() {
            let mut stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    log::warn!("Connection error: {}", e);
                    continue;
                }
            };

            let mut buffer = [0; DEV_SERVER_BUFFER_SIZE];
            if stream.read(&mut buffer).is_err() {
                continue;
            }

            let request = String::from_utf8_lossy(&buffer);
            let request_line = request.lines().next().unwrap_or("");
            let target = request_line.split_whitespace().nth(1).unwrap_or("/");

            self.serve(&mut stream, target);
        }

        Ok(())
    }

    fn serve(&self, stream: &mut TcpStream, target: &str) {
        let (status, content_type, body) = self.respond(target);
        log::debug!("{} {}", status, target);

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
            status,
            content_type,
            body.len()
        );

        let _ = stream.write_all(response.as_bytes());
        let _ = stream.write_all(&body);
        let _ = stream.flush();
    }
}

fn get_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("csv") => "text/csv; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::save_catalog;
    use crate::i18n::LangMap;
    use crate::types::{Catalog, Post, Version};
    use crate::views::{NO_SLUG, NO_VERSION};
    use tempfile::TempDir;

    fn write(root: &Path, path: &str, content: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        let mut versions = LangMap::new();
        for lang in ["original", "en"] {
            versions.insert(
                lang,
                Version {
                    title: format!("Hello {}", lang),
                    summary: String::new(),
                    file: "posts/hello.md".to_string(),
                },
            );
        }
        let catalog = Catalog {
            posts: vec![
                Post {
                    slug: "hello".to_string(),
                    date: "2024-01-05".to_string(),
                    tags: vec![],
                    versions,
                },
                Post {
                    slug: "empty".to_string(),
                    date: "2024-01-01".to_string(),
                    tags: vec![],
                    versions: LangMap::new(),
                },
            ],
            ..Catalog::default()
        };
        save_catalog(&catalog, &dir.path().join("posts.json")).unwrap();

        write(dir.path(), "index.html", "home");
        write(dir.path(), "404.html", "<p>Post not found.</p>");
        write(dir.path(), "posts/hello/original/index.html", "original page");
        write(dir.path(), "posts/hello/en/index.html", "english page");
        write(dir.path(), "posts/data/loss.csv", "step,loss\n");
        dir
    }

    #[test]
    fn test_parse_target() {
        let (path, params) = parse_target("/tags/deep%20learning/?slug=a%2Bb&lang=zh&q=x+y&flag");
        assert_eq!(path, "/tags/deep learning/");
        assert_eq!(query_param(&params, "slug"), Some("a+b"));
        assert_eq!(query_param(&params, "lang"), Some("zh"));
        assert_eq!(query_param(&params, "q"), Some("x y"));
        assert_eq!(query_param(&params, "flag"), Some(""));
        assert_eq!(query_param(&params, "missing"), None);
    }

    #[test]
    fn test_static_routes() {
        let site = site();
        let server = DevServer::new(site.path(), "/", "original");

        assert_eq!(server.route("/"), Route::File(site.path().join("index.html")));
        assert_eq!(
            server.route("/posts/hello/en/"),
            Route::File(site.path().join("posts/hello/en/index.html"))
        );
        assert_eq!(
            server.route("/posts/hello/en"),
            Route::File(site.path().join("posts/hello/en/index.html"))
        );
        assert_eq!(server.route("/nope.html"), Route::NotFound);
        assert_eq!(server.route("/../secret"), Route::NotFound);
    }

    #[test]
    fn test_post_page_routes() {
        let site = site();
        let server = DevServer::new(site.path(), "/", "original");

        assert_eq!(
            server.route("/post.html?slug=hello&lang=en"),
            Route::File(site.path().join("posts/hello/en/index.html"))
        );
        assert_eq!(
            server.route("/post.html?slug=hello&lang=ja"),
            Route::File(site.path().join("posts/hello/original/index.html"))
        );
        assert_eq!(
            server.route("/post.html?slug=hello"),
            Route::File(site.path().join("posts/hello/original/index.html"))
        );
        assert_eq!(server.route("/post.html"), Route::Message(NO_SLUG));
        assert_eq!(server.route("/post.html?slug=gone"), Route::Message(POST_NOT_FOUND));
        assert_eq!(server.route("/post.html?slug=empty"), Route::Message(NO_VERSION));
    }

    #[test]
    fn test_base_path() {
        let site = site();
        let server = DevServer::new(site.path(), "/blog/", "en");

        assert_eq!(server.route("/blog"), Route::File(site.path().join("index.html")));
        assert_eq!(
            server.route("/blog/post.html?slug=hello"),
            Route::File(site.path().join("posts/hello/en/index.html"))
        );
        assert_eq!(server.route("/index.html"), Route::NotFound);
    }

    #[test]
    fn test_respond() {
        let site = site();
        let server = DevServer::new(site.path(), "/", "original");

        let (status, content_type, body) = server.respond("/posts/data/loss.csv");
        assert_eq!(status, "200 OK");
        assert_eq!(content_type, "text/csv; charset=utf-8");
        assert_eq!(body, b"step,loss\n");

        let (status, _, body) = server.respond("/post.html?slug=gone");
        assert_eq!(status, "404 NOT FOUND");
        assert_eq!(body, b"<p>Post not found.</p>");

        let (_, content_type, body) = server.respond("/post.html");
        assert_eq!(content_type, "text/html");
        assert!(String::from_utf8(body).unwrap().contains("No post specified."));
    }
}
