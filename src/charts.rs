use crate::chart_svg::render_chart;
use crate::dom::{attribute, escape_html};
use lol_html::errors::RewritingError;
use lol_html::html_content::ContentType;
use lol_html::{element, rewrite_str, RewriteStrSettings};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

pub const DEFAULT_GROUP_TITLE: &str = "Charts";
pub const DEFAULT_CHART_TITLE: &str = "Chart";
pub const DEFAULT_CHART_COLOR: &str = "#4a9eff";
pub const CHART_ERROR_HTML: &str = "<p class=\"chart-error\">Failed to load charts</p>";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisScale {
    #[default]
    Log,
    Linear,
}

impl AxisScale {
    pub const ALL: [AxisScale; 2] = [AxisScale::Log, AxisScale::Linear];

    pub fn as_str(&self) -> &'static str {
        match self {
            AxisScale::Log => "log",
            AxisScale::Linear => "linear",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AxisScale::Log => "Log",
            AxisScale::Linear => "Linear",
        }
    }
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("failed to load {src}: {message}")]
    Load { src: String, message: String },
    #[error("invalid chart list: {0}")]
    Spec(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub src: String,
    #[serde(default = "default_chart_title")]
    pub title: String,
    #[serde(default = "default_chart_color")]
    pub color: String,
}

fn default_chart_title() -> String {
    DEFAULT_CHART_TITLE.to_string()
}

fn default_chart_color() -> String {
    DEFAULT_CHART_COLOR.to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartGroupSpec {
    pub title: String,
    pub charts: Vec<ChartSpec>,
}

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(\w+)\s*=\s*"([^"]+)""#).unwrap())
}

fn parse_attributes(line: &str) -> HashMap<String, String> {
    attribute_regex()
        .captures_iter(line)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

impl ChartGroupSpec {
    /// Read a chart block: one `src="…" title="…" color="…"` line per chart,
    /// and optionally a `title="…"` line without `src` naming the group.
    /// Returns `None` for text that is not a chart block.
    pub fn parse_block(text: &str) -> Option<Self> {
        if !text.contains("src=\"") || !text.contains(".csv\"") {
            return None;
        }

        let mut title = DEFAULT_GROUP_TITLE.to_string();
        let mut charts = Vec::new();

        for line in text.trim().lines() {
            let mut attrs = parse_attributes(line);
            match attrs.remove("src") {
                Some(src) => charts.push(ChartSpec {
                    src,
                    title: attrs
                        .remove("title")
                        .unwrap_or_else(default_chart_title),
                    color: attrs
                        .remove("color")
                        .unwrap_or_else(default_chart_color),
                }),
                None => {
                    if let Some(group_title) = attrs.remove("title") {
                        title = group_title;
                    }
                }
            }
        }

        (!charts.is_empty()).then_some(Self { title, charts })
    }

    /// Empty container the chart group is later mounted into.
    pub fn container_html(&self, id: &str) -> String {
        let charts = serde_json::to_string(&self.charts).unwrap_or_else(|_| "[]".to_string());
        format!(
            "<div class=\"chart-group\" id=\"{}\" data-title=\"{}\" data-charts=\"{}\"></div>",
            escape_html(id),
            escape_html(&self.title),
            escape_html(&charts)
        )
    }

    /// Rebuild a group from a container's decoded `data-title` and
    /// `data-charts` attributes.
    pub fn from_attributes(title: Option<&str>, charts: Option<&str>) -> Result<Self, ChartError> {
        let charts = serde_json::from_str(charts.unwrap_or("[]"))?;
        Ok(Self {
            title: title
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_GROUP_TITLE)
                .to_string(),
            charts,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub spec: ChartSpec,
    pub points: Vec<Point>,
}

/// Parse `step,value` CSV. The header line is skipped, quotes are stripped,
/// and lines with fewer than two columns are ignored. Rows whose step or
/// value is empty or not a number are logged and dropped.
pub fn parse_csv(src: &str, text: &str) -> Vec<Point> {
    let mut points = Vec::new();

    for (i, line) in text.trim().lines().enumerate().skip(1) {
        let cols: Vec<String> = line
            .split(',')
            .map(|col| col.replace('"', "").trim().to_string())
            .collect();
        if cols.len() < 2 {
            continue;
        }

        match (cols[0].parse::<f64>(), cols[1].parse::<f64>()) {
            (Ok(x), Ok(y)) => points.push(Point { x, y }),
            _ => log::warn!("{} line {}: skipping non-numeric row {:?}", src, i + 1, line),
        }
    }

    points
}

/// Where chart CSV text comes from.
pub trait ChartSource: Sync {
    fn load(&self, src: &str) -> Result<String, ChartError>;
}

/// Reads chart files from disk, trying each root in order.
pub struct FsSource {
    roots: Vec<PathBuf>,
    base_path: String,
}

impl FsSource {
    pub fn new(roots: Vec<PathBuf>, base_path: &str) -> Self {
        Self {
            roots,
            base_path: base_path.to_string(),
        }
    }

    fn relative_path(&self, src: &str) -> Option<PathBuf> {
        let trimmed = src
            .strip_prefix(self.base_path.as_str())
            .unwrap_or(src)
            .trim_start_matches('/');
        let path = Path::new(trimmed);
        path.components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
            .then(|| path.to_path_buf())
    }
}

impl ChartSource for FsSource {
    fn load(&self, src: &str) -> Result<String, ChartError> {
        let load_error = |message: String| ChartError::Load {
            src: src.to_string(),
            message,
        };

        if src.contains("://") {
            return Err(load_error("remote sources are not supported".to_string()));
        }
        let relative = self
            .relative_path(src)
            .ok_or_else(|| load_error("path leaves the site root".to_string()))?;

        let path = self
            .roots
            .iter()
            .map(|root| root.join(&relative))
            .find(|path| path.is_file())
            .ok_or_else(|| load_error("file not found".to_string()))?;

        fs::read_to_string(&path).map_err(|e| load_error(e.to_string()))
    }
}

/// Chart files held in memory, keyed by `src`.
#[derive(Debug, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, src: &str, content: &str) -> Self {
        self.files.insert(src.to_string(), content.to_string());
        self
    }
}

impl ChartSource for MemorySource {
    fn load(&self, src: &str) -> Result<String, ChartError> {
        self.files.get(src).cloned().ok_or_else(|| ChartError::Load {
            src: src.to_string(),
            message: "not found".to_string(),
        })
    }
}

fn load_series(source: &dyn ChartSource, spec: &ChartSpec) -> Result<Series, ChartError> {
    let text = source.load(&spec.src)?;
    Ok(Series {
        spec: spec.clone(),
        points: parse_csv(&spec.src, &text),
    })
}

/// A loaded chart group sharing one scale toggle.
#[derive(Debug, Clone)]
pub struct ChartGroup {
    pub id: String,
    pub title: String,
    pub scale: AxisScale,
    pub series: Vec<Series>,
}

impl ChartGroup {
    /// Load every chart in the group. Loads run concurrently; any failure
    /// fails the whole group.
    pub fn load(
        id: &str,
        spec: &ChartGroupSpec,
        source: &dyn ChartSource,
        scale: AxisScale,
    ) -> Result<Self, ChartError> {
        let results: Vec<Result<Series, ChartError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = spec
                .charts
                .iter()
                .map(|chart| (chart, scope.spawn(move || load_series(source, chart))))
                .collect();

            handles
                .into_iter()
                .map(|(chart, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(ChartError::Load {
                            src: chart.src.clone(),
                            message: "loader panicked".to_string(),
                        })
                    })
                })
                .collect()
        });

        Ok(Self {
            id: id.to_string(),
            title: spec.title.clone(),
            scale,
            series: results.into_iter().collect::<Result<_, _>>()?,
        })
    }

    /// Switch every chart in the group. Returns false if already on `scale`.
    pub fn set_scale(&mut self, scale: AxisScale) -> bool {
        if self.scale == scale {
            return false;
        }
        self.scale = scale;
        true
    }

    /// Header with title and Log/Linear toggle, then one chart per series.
    /// Both renderings of each chart are emitted; the checked radio input
    /// decides which one is shown.
    pub fn render(&self) -> String {
        let name = format!("{}-scale", self.id);
        let mut html = String::from("<div class=\"charts-container\">");

        for scale in AxisScale::ALL {
            html.push_str(&format!(
                "<input type=\"radio\" class=\"scale-input scale-{}\" name=\"{}\" id=\"{}-{}\"{}>",
                scale.as_str(),
                escape_html(&name),
                escape_html(&self.id),
                scale.as_str(),
                if scale == self.scale { " checked" } else { "" }
            ));
        }

        html.push_str(&format!(
            "<div class=\"charts-header\"><span class=\"charts-title\">{}</span><div class=\"chart-scale-toggle\">",
            escape_html(&self.title)
        ));
        for scale in AxisScale::ALL {
            html.push_str(&format!(
                "<label class=\"toggle-option\" for=\"{}-{}\" data-scale=\"{}\">{}</label>",
                escape_html(&self.id),
                scale.as_str(),
                scale.as_str(),
                scale.label()
            ));
        }
        html.push_str("</div></div><div class=\"charts-grid\">");

        for series in &self.series {
            html.push_str("<div class=\"chart-wrapper\">");
            for scale in AxisScale::ALL {
                html.push_str(&format!(
                    "<div class=\"chart-scale chart-scale-{}\">{}</div>",
                    scale.as_str(),
                    render_chart(series, scale)
                ));
            }
            html.push_str("</div>");
        }

        html.push_str("</div></div>");
        html
    }
}

/// Load and render every `.chart-group` container in `html`. A group that
/// fails shows an error message in place; other groups are unaffected.
/// Returns the rewritten HTML and the number of groups mounted successfully.
pub fn mount_charts(
    html: &str,
    source: &dyn ChartSource,
    scale: AxisScale,
) -> Result<(String, usize), RewritingError> {
    let mut mounted = 0;

    let html = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("div.chart-group", |el| {
                let Some(id) = attribute(el, "id") else {
                    log::warn!("Chart group without id skipped");
                    return Ok(());
                };

                let loaded = ChartGroupSpec::from_attributes(
                    attribute(el, "data-title").as_deref(),
                    attribute(el, "data-charts").as_deref(),
                )
                .and_then(|spec| {
                    if spec.charts.is_empty() {
                        return Ok(None);
                    }
                    ChartGroup::load(&id, &spec, source, scale).map(Some)
                });

                let content = match loaded {
                    Ok(Some(group)) => {
                        mounted += 1;
                        group.render()
                    }
                    Ok(None) => return Ok(()),
                    Err(e) => {
                        log::warn!("Chart group {} failed: {}", id, e);
                        CHART_ERROR_HTML.to_string()
                    }
                };

                el.set_inner_content(&content, ContentType::Html);
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )?;

    Ok((html, mounted))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOSS: &str = "step,loss\n1,0.5\n10,0.2\n100,0.05\n";

    #[test]
    fn test_parse_csv_skips_short_lines() {
        let points = parse_csv("a.csv", "step,loss\n1,0.5\nbad\n2,0.4");
        assert_eq!(
            points,
            vec![Point { x: 1.0, y: 0.5 }, Point { x: 2.0, y: 0.4 }]
        );
    }

    #[test]
    fn test_parse_csv_strips_quotes() {
        let points = parse_csv("a.csv", "\"step\",\"acc\"\n\"3\", \"0.9\"\n");
        assert_eq!(points, vec![Point { x: 3.0, y: 0.9 }]);
    }

    #[test]
    fn test_parse_csv_drops_non_numeric_rows() {
        let points = parse_csv("a.csv", "step,loss\n1,abc\n2,\n3,0.7\n,0.1\n");
        assert_eq!(points, vec![Point { x: 3.0, y: 0.7 }]);
    }

    #[test]
    fn test_group_with_blank_value_still_mounts() {
        let spec = ChartGroupSpec::parse_block("src=\"loss.csv\" title=\"Loss\"").unwrap();
        let source = MemorySource::new().with("loss.csv", "step,loss\n1,0.5\n2,\n10,0.2\n");
        let group = ChartGroup::load("g", &spec, &source, AxisScale::Log).unwrap();
        assert_eq!(
            group.series[0].points,
            vec![Point { x: 1.0, y: 0.5 }, Point { x: 10.0, y: 0.2 }]
        );
    }

    #[test]
    fn test_parse_block_defaults() {
        let spec = ChartGroupSpec::parse_block("src=\"data/loss.csv\"").unwrap();
        assert_eq!(spec.title, "Charts");
        assert_eq!(spec.charts[0].title, "Chart");
        assert_eq!(spec.charts[0].color, "#4a9eff");
    }

    #[test]
    fn test_parse_block_group_title_and_charts() {
        let spec = ChartGroupSpec::parse_block(
            "title=\"Training\"\nsrc=\"a.csv\" title=\"Loss\" color=\"#ff6b6b\"\nsrc=\"b.csv\" title=\"Acc\"\n",
        )
        .unwrap();
        assert_eq!(spec.title, "Training");
        assert_eq!(spec.charts.len(), 2);
        assert_eq!(spec.charts[0].color, "#ff6b6b");
        assert_eq!(spec.charts[1].title, "Acc");
    }

    #[test]
    fn test_parse_block_requires_csv_source() {
        assert!(ChartGroupSpec::parse_block("let src=\"a.png\";").is_none());
        assert!(ChartGroupSpec::parse_block("fn main() {}").is_none());
    }

    #[test]
    fn test_container_round_trips_through_attributes() {
        let spec = ChartGroupSpec::parse_block("title=\"A 'q' & b\"\nsrc=\"x.csv\"").unwrap();
        let mut read = None;
        rewrite_str(
            &spec.container_html("chart-group-0"),
            RewriteStrSettings {
                element_content_handlers: vec![element!("div.chart-group", |el| {
                    read = Some(ChartGroupSpec::from_attributes(
                        attribute(el, "data-title").as_deref(),
                        attribute(el, "data-charts").as_deref(),
                    ));
                    Ok(())
                })],
                ..RewriteStrSettings::default()
            },
        )
        .unwrap();
        assert_eq!(read.unwrap().unwrap(), spec);
    }

    #[test]
    fn test_set_scale_reports_change() {
        let mut group = ChartGroup {
            id: "g".to_string(),
            title: "T".to_string(),
            scale: AxisScale::Log,
            series: Vec::new(),
        };
        assert!(!group.set_scale(AxisScale::Log));
        assert!(group.set_scale(AxisScale::Linear));
        assert_eq!(group.scale, AxisScale::Linear);
    }

    #[test]
    fn test_mount_isolates_failing_group() {
        let ok = ChartGroupSpec::parse_block("src=\"loss.csv\" title=\"Loss\"").unwrap();
        let bad = ChartGroupSpec::parse_block("src=\"missing.csv\"").unwrap();
        let html = format!(
            "{}<p>between</p>{}",
            ok.container_html("chart-group-0"),
            bad.container_html("chart-group-1")
        );
        let source = MemorySource::new().with("loss.csv", LOSS);

        let (html, mounted) = mount_charts(&html, &source, AxisScale::Log).unwrap();

        assert_eq!(mounted, 1);
        assert!(html.contains("charts-container"));
        assert!(html.contains("<p>between</p>"));
        assert_eq!(html.matches(CHART_ERROR_HTML).count(), 1);
        let (first, second) = html.split_once("<p>between</p>").unwrap();
        assert!(!first.contains("chart-error"));
        assert!(second.contains("chart-error"));
    }

    #[test]
    fn test_mount_ignores_comments_and_reads_single_quoted_json() {
        let html = concat!(
            "<!-- <div class=\"chart-group\" id=\"fake\" data-charts=\"[]\"></div> -->",
            "<div data-title=\"Raw\" class='wide chart-group' id=g data-charts='[{\"src\":\"loss.csv\"}]'></div>",
            "<p>after</p>"
        );
        let source = MemorySource::new().with("loss.csv", LOSS);

        let (out, mounted) = mount_charts(html, &source, AxisScale::Linear).unwrap();

        assert_eq!(mounted, 1);
        assert!(out.starts_with("<!-- <div class=\"chart-group\" id=\"fake\" data-charts=\"[]\"></div> -->"));
        assert!(out.contains("<span class=\"charts-title\">Raw</span>"));
        assert!(out.contains("id=\"g-linear\" checked"));
        assert!(out.ends_with("</div><p>after</p>"));
    }

    #[test]
    fn test_rendered_group_has_one_toggle_and_both_scales() {
        let spec = ChartGroupSpec::parse_block(
            "title=\"Run\"\nsrc=\"loss.csv\" title=\"Loss\"\nsrc=\"loss.csv\" title=\"Again\"",
        )
        .unwrap();
        let source = MemorySource::new().with("loss.csv", LOSS);
        let group = ChartGroup::load("chart-group-0", &spec, &source, AxisScale::Log).unwrap();
        let html = group.render();

        assert_eq!(html.matches("class=\"chart-scale-toggle\"").count(), 1);
        assert_eq!(html.matches("class=\"chart-wrapper\"").count(), 2);
        assert_eq!(html.matches("data-scale=\"log\"").count(), 3);
        assert!(html.contains("id=\"chart-group-0-log\" checked"));
        assert!(!html.contains("id=\"chart-group-0-linear\" checked"));
    }

    #[test]
    fn test_fs_source_resolves_under_roots() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("posts/data")).unwrap();
        fs::write(dir.path().join("posts/data/loss.csv"), LOSS).unwrap();
        let source = FsSource::new(vec![dir.path().to_path_buf()], "/blog/");

        assert_eq!(source.load("posts/data/loss.csv").unwrap(), LOSS);
        assert_eq!(source.load("/blog/posts/data/loss.csv").unwrap(), LOSS);
        assert!(source.load("../secret.csv").is_err());
        assert!(source.load("https://example.com/a.csv").is_err());
        assert!(source.load("posts/data/none.csv").is_err());
    }
}
