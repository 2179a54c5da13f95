use crate::dom::{attribute, escape_html};
use lol_html::errors::RewritingError;
use lol_html::html_content::ContentType;
use lol_html::{element, rewrite_str, RewriteStrSettings};
use crate::svg::{self, fmt_num, Tag, SVG_NS};
use std::fmt;

const BG: &str = "#0a0c0a";
const BOX: &str = "#1a1c1a";
const STROKE: &str = "#444";
const TEXT: &str = "#eee";
const MUTED: &str = "#888";
const ACCENT: &str = "#4a9eff";
const GREEN: &str = "#1a3a1a";
const LOSS: &str = "#2a1a1a";
const ORANGE: &str = "#3a2a1a";
const RED: &str = "#3a1a1a";
const GLOBAL_CROP: &str = "#4a9eff";
const LOCAL_CROP: &str = "#51cf66";
const STOP_GRAD: &str = "#ff6b6b";
const EMA: &str = "#ffa94d";

const FADE_MS: u32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramKind {
    /// Multi-view joint-embedding architecture
    Jepa,
    /// Stop-gradient vs EMA comparison
    SimSiam,
}

impl DiagramKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "jepa" => Some(Self::Jepa),
            "simsiam" => Some(Self::SimSiam),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jepa => "jepa",
            Self::SimSiam => "simsiam",
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where diagram images are served from.
#[derive(Debug, Clone)]
pub struct DiagramAssets {
    /// URL prefix ending in `/`, e.g. `/posts/images/`
    pub image_base: String,
}

impl DiagramAssets {
    pub fn new(base_path: &str) -> Self {
        Self {
            image_base: format!("{}posts/images/", base_path),
        }
    }

    fn image(&self, name: &str) -> String {
        format!("{}{}", self.image_base, name)
    }
}

/// Replace the contents of `container_id` with the diagram. Rendering again
/// gives the same markup. The flag is false, and `html` comes back
/// unchanged, when the container does not exist.
pub fn render_diagram(
    html: &str,
    container_id: &str,
    kind: DiagramKind,
    assets: &DiagramAssets,
) -> Result<(String, bool), RewritingError> {
    let mut found = false;

    let html = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("[id]", |el| {
                if found || attribute(el, "id").as_deref() != Some(container_id) {
                    return Ok(());
                }
                found = true;
                el.set_inner_content(&render_svg(kind, container_id, assets), ContentType::Html);
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )?;

    if !found {
        log::warn!("Diagram container #{} not found", container_id);
    }
    Ok((html, found))
}

/// Render every `.diagram-container` by its `data-diagram` type. Unknown
/// types get a visible error message. Returns the rewritten HTML and the
/// number rendered.
pub fn mount_diagrams(html: &str, assets: &DiagramAssets) -> Result<(String, usize), RewritingError> {
    let mut rendered = 0;

    let html = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("div.diagram-container", |el| {
                let Some(id) = attribute(el, "id") else {
                    log::warn!("Diagram container without id skipped");
                    return Ok(());
                };
                let name = attribute(el, "data-diagram").unwrap_or_default();

                let content = match DiagramKind::parse(&name) {
                    Some(kind) => {
                        rendered += 1;
                        render_svg(kind, &id, assets)
                    }
                    None => {
                        log::warn!("Unknown diagram type {:?} in #{}", name, id);
                        format!(
                            "<p class=\"diagram-error\">Unknown diagram: {}</p>",
                            escape_html(&name)
                        )
                    }
                };

                el.set_inner_content(&content, ContentType::Html);
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )?;

    Ok((html, rendered))
}

pub fn render_svg(kind: DiagramKind, id: &str, assets: &DiagramAssets) -> String {
    match kind {
        DiagramKind::Jepa => jepa(id, assets).render(),
        DiagramKind::SimSiam => simsiam(id).render(),
    }
}

fn canvas(width: f64, height: f64) -> Tag {
    Tag::new("svg")
        .attr("xmlns", SVG_NS)
        .class("diagram")
        .attr("width", "100%")
        .num("height", height)
        .attr("viewBox", format!("0 0 {} {}", fmt_num(width), fmt_num(height)))
        .attr(
            "style",
            format!("background:{};border-radius:6px;display:block;margin:0 auto", BG),
        )
}

fn marker(id: &str, color: &str) -> Tag {
    Tag::new("marker")
        .attr("id", id)
        .attr("viewBox", "0 0 10 10")
        .attr("refX", 9)
        .attr("refY", 5)
        .attr("markerWidth", 5)
        .attr("markerHeight", 5)
        .attr("orient", "auto")
        .child(
            Tag::new("path")
                .attr("d", "M 0 0 L 10 5 L 0 10 z")
                .attr("fill", color),
        )
}

fn label(x: f64, y: f64, content: &str, color: &str, size: &str) -> Tag {
    svg::text(x, y, content)
        .attr("text-anchor", "middle")
        .attr("fill", color)
        .attr("font-size", size)
}

fn rounded_rect(x: f64, y: f64, w: f64, h: f64, fill: &str, stroke: &str) -> Tag {
    svg::rect(x - w / 2.0, y - h / 2.0, w, h)
        .attr("rx", 4)
        .attr("fill", fill)
        .attr("stroke", stroke)
}

struct Jepa<'a> {
    root: Tag,
    arrow_id: String,
    assets: &'a DiagramAssets,
}

impl Jepa<'_> {
    fn add(&mut self, tag: Tag) {
        self.root.push(tag);
    }

    fn boxed(&mut self, x: f64, y: f64, w: f64, h: f64, title: &str, sub: &str, fill: &str) {
        let mut g = Tag::new("g")
            .child(rounded_rect(x, y, w, h, fill, STROKE))
            .child(label(x, if sub.is_empty() { y + 4.0 } else { y - 3.0 }, title, TEXT, "12px"));
        if !sub.is_empty() {
            g.push(label(x, y + 10.0, sub, MUTED, "9px"));
        }
        self.add(g);
    }

    fn arrow(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let tag = svg::line(x1, y1, x2, y2)
            .attr("stroke", MUTED)
            .attr("stroke-width", 1.5)
            .attr("marker-end", format!("url(#{})", self.arrow_id));
        self.add(tag);
    }

    /// Framed image with an optional caption. `hover` adds a transparent
    /// hit area with that class on top.
    fn image(&mut self, x: f64, y: f64, size: f64, file: &str, caption: &str, hover: Option<&str>) {
        let half = size / 2.0;
        let mut g = Tag::new("g")
            .child(
                svg::rect(x - half - 2.0, y - half - 2.0, size + 4.0, size + 4.0)
                    .attr("rx", 3)
                    .attr("fill", "none")
                    .attr("stroke", STROKE)
                    .attr("stroke-width", 1),
            )
            .child(
                Tag::new("image")
                    .num("x", x - half)
                    .num("y", y - half)
                    .num("width", size)
                    .num("height", size)
                    .attr("href", self.assets.image(file))
                    .attr("preserveAspectRatio", "xMidYMid slice")
                    .attr("style", "image-rendering:pixelated"),
            );
        if !caption.is_empty() {
            g.push(label(x, y + half + 14.0, caption, MUTED, "10px"));
        }
        if let Some(class) = hover {
            g.push(
                svg::rect(x - half - 2.0, y - half - 2.0, size + 4.0, size + 4.0)
                    .class(class)
                    .attr("fill", "transparent")
                    .attr("style", "cursor:pointer"),
            );
        }
        self.add(g);
    }

    fn embedding(&mut self, x: f64, y: f64, name: &str, color: &str) {
        let g = Tag::new("g")
            .child(
                Tag::new("circle")
                    .num("cx", x)
                    .num("cy", y)
                    .attr("r", 12)
                    .attr("fill", format!("{}22", color))
                    .attr("stroke", color)
                    .attr("stroke-width", 2),
            )
            .child(label(x, y + 4.0, name, TEXT, "10px").attr("font-weight", "bold"));
        self.add(g);
    }
}

struct Crop {
    x: f64,
    y: f64,
    size: f64,
    color: &'static str,
    dashed: bool,
}

const CROPS: [Crop; 5] = [
    Crop { x: 2.0, y: 2.0, size: 50.0, color: GLOBAL_CROP, dashed: false },
    Crop { x: 10.0, y: 8.0, size: 46.0, color: GLOBAL_CROP, dashed: false },
    Crop { x: 0.0, y: 0.0, size: 24.0, color: LOCAL_CROP, dashed: true },
    Crop { x: 38.0, y: 4.0, size: 22.0, color: LOCAL_CROP, dashed: true },
    Crop { x: 20.0, y: 40.0, size: 20.0, color: LOCAL_CROP, dashed: true },
];

/// Hover styles: the generation stage reveals every crop, a thumbnail
/// reveals its own.
fn crop_css(id: &str) -> String {
    let mut css = format!(
        "#{id} .crop{{opacity:0;pointer-events:none;transition:opacity {ms}ms}}\
         #{id} svg:has(.hover-all:hover) .crop{{opacity:1}}",
        id = id,
        ms = FADE_MS
    );
    for i in 0..CROPS.len() {
        css.push_str(&format!(
            "#{id} svg:has(.hover-crop-{i}:hover) .crop-{i}{{opacity:1}}",
            id = id,
            i = i
        ));
    }
    css
}

fn jepa(id: &str, assets: &DiagramAssets) -> Tag {
    let width = 620.0;
    let height = 580.0;
    let arrow_id = format!("{}-arrow", id);

    let root = canvas(width, height)
        .child(Tag::new("style").text(crop_css(id)))
        .child(Tag::new("defs").child(marker(&arrow_id, MUTED)));
    let mut d = Jepa {
        root,
        arrow_id,
        assets,
    };

    let cx = width / 2.0;
    let y1 = 55.0;
    let y2 = 140.0;
    let y3 = 240.0;
    let y4 = 340.0;
    let y5 = 420.0;
    let y6 = 500.0;
    let y7 = 555.0;

    let img_size = 64.0;
    d.image(cx, y1, img_size, "jepa_original.png", "Image x", None);

    let img_left = cx - img_size / 2.0;
    let img_top = y1 - img_size / 2.0;
    for (i, crop) in CROPS.iter().enumerate() {
        d.add(
            svg::rect(img_left + crop.x, img_top + crop.y, crop.size, crop.size)
                .class(&format!("crop crop-{}", i))
                .attr("fill", format!("{}33", crop.color))
                .attr("stroke", crop.color)
                .attr("stroke-width", 2.5)
                .attr("stroke-dasharray", if crop.dashed { "4,2" } else { "none" }),
        );
    }

    d.arrow(cx, y1 + 40.0, cx, y2 - 22.0);

    d.boxed(cx, y2, 400.0, 40.0, "View Generation", "hover to see crop regions", BOX);
    d.add(
        svg::rect(cx - 200.0, y2 - 20.0, 400.0, 40.0)
            .class("hover-all")
            .attr("fill", "transparent")
            .attr("style", "cursor:pointer"),
    );

    let global_size = 44.0;
    let local_size = 32.0;
    let spacing = 85.0;
    let views = [
        (cx - spacing * 2.0, global_size, "jepa_global_1.png", "Global₁"),
        (cx - spacing, global_size, "jepa_global_2.png", "Global₂"),
        (cx + spacing * 0.3, local_size, "jepa_local_1.png", "Local₁"),
        (cx + spacing * 1.1, local_size, "jepa_local_2.png", "Local₂"),
        (cx + spacing * 1.9, local_size, "jepa_local_3.png", "Local₃"),
    ];

    for (i, &(x, size, file, caption)) in views.iter().enumerate() {
        let hover = format!("hover-crop-{}", i);
        d.image(x, y3, size, file, caption, Some(&hover));
    }

    let generation_out = [cx - 100.0, cx - 50.0, cx + 30.0, cx + 80.0, cx + 130.0];
    for (&from_x, &(x, size, _, _)) in generation_out.iter().zip(views.iter()) {
        d.arrow(from_x, y2 + 22.0, x, y3 - size / 2.0 - 8.0);
    }

    d.boxed(cx, y4, 380.0, 40.0, "Shared Encoder (ViT)", "same weights for all views", GREEN);

    let encoder_in = [cx - 150.0, cx - 80.0, cx + 20.0, cx + 80.0, cx + 140.0];
    for (&(x, size, _, _), &to_x) in views.iter().zip(encoder_in.iter()) {
        d.arrow(x, y3 + size / 2.0 + 18.0, to_x, y4 - 22.0);
    }

    let emb_spacing = 55.0;
    let emb_start = cx - emb_spacing * 2.0;
    let emb_colors = [GLOBAL_CROP, GLOBAL_CROP, LOCAL_CROP, LOCAL_CROP, LOCAL_CROP];
    let emb_labels = ["z₁", "z₂", "z₃", "z₄", "..."];
    for i in 0..5 {
        let ex = emb_start + i as f64 * emb_spacing;
        d.embedding(ex, y5, emb_labels[i], emb_colors[i]);
        d.arrow(encoder_in[i], y4 + 22.0, ex, y5 - 16.0);
    }

    d.add(
        svg::rect(cx - 250.0, y6 - 22.0, 500.0, 44.0)
            .attr("rx", 4)
            .attr("fill", "#1a1a2a")
            .attr("stroke", "#3a3a5a"),
    );
    d.add(
        label(cx, y6 - 4.0, "Key Insight: Global = Mean of Locals", "#aaf", "11px")
            .attr("font-weight", "bold"),
    );
    d.add(label(
        cx,
        y6 + 12.0,
        "z_global ≈ mean(z_local) → each patch ≈ its corresponding local crop",
        MUTED,
        "10px",
    ));

    for i in 0..5 {
        let ex = emb_start + i as f64 * emb_spacing;
        d.arrow(ex, y5 + 14.0, cx - 60.0 + i as f64 * 30.0, y6 - 24.0);
    }

    d.add(rounded_rect(cx, y7, 360.0, 32.0, LOSS, STROKE));
    d.add(label(
        cx,
        y7 + 4.0,
        "ℒ_inv = Σ ‖zᵥ − z̄‖²  →  minimize variance across views",
        TEXT,
        "12px",
    ));

    d.root
}

struct SimSiam {
    root: Tag,
    id: String,
}

impl SimSiam {
    fn marker_id(&self, color_key: &str) -> String {
        format!("{}-arrow-{}", self.id, color_key)
    }

    fn add(&mut self, tag: Tag) {
        self.root.push(tag);
    }

    fn boxed(&mut self, x: f64, y: f64, w: f64, h: f64, title: &str, fill: &str, text_color: &str) {
        let g = Tag::new("g")
            .child(rounded_rect(x, y, w, h, fill, STROKE))
            .child(label(x, y + 4.0, title, text_color, "11px"));
        self.add(g);
    }

    fn arrow(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color_key: &str, dashed: bool) {
        let tag = svg::line(x1, y1, x2, y2)
            .attr("stroke", arrow_color(color_key))
            .attr("stroke-width", 1.5)
            .attr("stroke-dasharray", if dashed { "4,3" } else { "none" })
            .attr("marker-end", format!("url(#{})", self.marker_id(color_key)));
        self.add(tag);
    }

    fn plain(&mut self, x1: f64, x2: f64, y: f64) {
        self.add(
            svg::line(x1, y, x2, y)
                .attr("stroke", MUTED)
                .attr("stroke-width", 1),
        );
    }
}

const ARROW_COLORS: [(&str, &str); 4] = [
    ("muted", MUTED),
    ("accent", ACCENT),
    ("stopgrad", STOP_GRAD),
    ("ema", EMA),
];

fn arrow_color(key: &str) -> &'static str {
    ARROW_COLORS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, color)| *color)
        .unwrap_or(MUTED)
}

fn simsiam(id: &str) -> Tag {
    let width = 580.0;
    let height = 280.0;

    let mut defs = Tag::new("defs");
    for (key, color) in ARROW_COLORS {
        defs.push(marker(&format!("{}-arrow-{}", id, key), color));
    }
    let mut d = SimSiam {
        root: canvas(width, height).child(defs),
        id: id.to_string(),
    };

    let left = 145.0;
    let right = 435.0;
    let spread = 55.0;

    let y0 = 28.0;
    let y1 = 58.0;
    let y2 = 105.0;
    let y3 = 160.0;
    let y4 = 210.0;
    let y5 = 255.0;

    // Stop-gradient column
    d.add(label(left, y0, "SimSiam (Stop-Gradient)", TEXT, "12px"));
    d.add(label(left - spread, y1, "x₁", MUTED, "11px"));
    d.add(label(left + spread, y1, "x₂", MUTED, "11px"));
    d.arrow(left - spread, y1 + 8.0, left - spread, y2 - 14.0, "muted", false);
    d.arrow(left + spread, y1 + 8.0, left + spread, y2 - 14.0, "muted", false);

    d.boxed(left - spread, y2, 70.0, 26.0, "Encoder f", GREEN, TEXT);
    d.boxed(left + spread, y2, 70.0, 26.0, "Encoder f", GREEN, TEXT);
    d.add(
        svg::line(left - 15.0, y2, left + 15.0, y2)
            .attr("stroke", ACCENT)
            .attr("stroke-dasharray", "3,2"),
    );

    d.arrow(left - spread, y2 + 15.0, left - spread, y3 - 14.0, "muted", false);
    d.boxed(left - spread, y3, 70.0, 26.0, "Predictor h", BOX, TEXT);
    d.arrow(left + spread, y2 + 15.0, left + spread, y3 - 14.0, "muted", false);
    d.boxed(left + spread, y3, 50.0, 26.0, "sg( )", RED, STOP_GRAD);

    d.arrow(left - spread, y3 + 15.0, left - spread, y4 - 8.0, "muted", false);
    d.add(label(left - spread, y4, "p₁", ACCENT, "11px"));
    d.arrow(left + spread, y3 + 15.0, left + spread, y4 - 8.0, "stopgrad", true);
    d.add(label(left + spread, y4, "sg(z₂)", STOP_GRAD, "11px"));

    d.plain(left - 30.0, left + 30.0, y4);
    d.boxed(left, y5, 120.0, 24.0, "ℒ = ‖p₁ − sg(z₂)‖²", RED, TEXT);
    d.add(label(left - spread, y3 + 28.0, "grad ↑", ACCENT, "8px"));
    d.add(label(left + spread, y3 + 28.0, "no grad", STOP_GRAD, "8px"));

    // EMA column
    d.add(label(right, y0, "BYOL / MoCo (EMA)", TEXT, "12px"));
    d.add(label(right - spread, y1, "x₁", MUTED, "11px"));
    d.add(label(right + spread, y1, "x₂", MUTED, "11px"));
    d.arrow(right - spread, y1 + 8.0, right - spread, y2 - 14.0, "muted", false);
    d.arrow(right + spread, y1 + 8.0, right + spread, y2 - 14.0, "muted", false);

    d.boxed(right - spread, y2, 70.0, 26.0, "Online f_θ", GREEN, TEXT);
    d.boxed(right + spread, y2, 70.0, 26.0, "Target f_ξ", ORANGE, TEXT);

    let ema_marker = d.marker_id("ema");
    d.add(
        Tag::new("path")
            .attr(
                "d",
                format!(
                    "M {} {} Q {} {} {} {}",
                    fmt_num(right - 15.0),
                    fmt_num(y2 - 16.0),
                    fmt_num(right),
                    fmt_num(y2 - 32.0),
                    fmt_num(right + 15.0),
                    fmt_num(y2 - 16.0)
                ),
            )
            .attr("fill", "none")
            .attr("stroke", EMA)
            .attr("stroke-width", 1.5)
            .attr("stroke-dasharray", "4,2")
            .attr("marker-end", format!("url(#{})", ema_marker)),
    );
    d.add(label(right, y2 - 40.0, "ξ ← mξ + (1-m)θ", EMA, "8px"));

    d.arrow(right - spread, y2 + 15.0, right - spread, y3 - 14.0, "muted", false);
    d.boxed(right - spread, y3, 70.0, 26.0, "Predictor h", BOX, TEXT);
    d.arrow(right + spread, y2 + 15.0, right + spread, y4 - 8.0, "ema", false);

    d.arrow(right - spread, y3 + 15.0, right - spread, y4 - 8.0, "muted", false);
    d.add(label(right - spread, y4, "p₁", ACCENT, "11px"));
    d.add(label(right + spread, y4, "z₂", EMA, "11px"));

    d.plain(right - 30.0, right + 30.0, y4);
    d.boxed(right, y5, 100.0, 24.0, "ℒ = ‖p₁ − z₂‖²", ORANGE, TEXT);
    d.add(label(right - spread, y3 + 28.0, "grad ↑", ACCENT, "8px"));
    d.add(label(right + spread, y3, "no grad", EMA, "8px"));

    d.add(
        svg::line(width / 2.0, y0 + 10.0, width / 2.0, y5 + 15.0)
            .attr("stroke", STROKE)
            .attr("stroke-dasharray", "5,5"),
    );

    d.root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets() -> DiagramAssets {
        DiagramAssets::new("/")
    }

    fn container(id: &str, kind: &str) -> String {
        format!(
            "<div class=\"diagram-container\" id=\"{}\" data-diagram=\"{}\"></div>",
            id, kind
        )
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(DiagramKind::parse("jepa"), Some(DiagramKind::Jepa));
        assert_eq!(DiagramKind::parse(" simsiam "), Some(DiagramKind::SimSiam));
        assert_eq!(DiagramKind::parse("byol"), None);
    }

    #[test]
    fn test_jepa_layout() {
        let svg = render_svg(DiagramKind::Jepa, "diagram-0", &assets());
        assert!(svg.contains("viewBox=\"0 0 620 580\""));
        assert_eq!(svg.matches("class=\"crop crop-").count(), 5);
        assert_eq!(svg.matches("stroke-dasharray=\"4,2\"").count(), 3);
        assert_eq!(svg.matches("class=\"hover-crop-").count(), 5);
        assert_eq!(svg.matches("class=\"hover-all\"").count(), 1);
        assert_eq!(svg.matches("<circle").count(), 5);
        assert!(svg.contains("href=\"/posts/images/jepa_original.png\""));
        assert!(svg.contains("transition:opacity 150ms"));
        // first crop sits at the image's top-left corner plus (2, 2)
        assert!(svg.contains("<rect x=\"280\" y=\"25\" width=\"50\" height=\"50\" class=\"crop crop-0\""));
    }

    #[test]
    fn test_simsiam_layout() {
        let svg = render_svg(DiagramKind::SimSiam, "d1", &assets());
        assert!(svg.contains("viewBox=\"0 0 580 280\""));
        assert!(svg.contains("ξ ← mξ + (1-m)θ"));
        assert!(svg.contains("d=\"M 420 89 Q 435 73 450 89\""));
        assert_eq!(svg.matches("stroke-dasharray=\"4,3\"").count(), 1);
        assert!(svg.contains("x1=\"290\" y1=\"38\" x2=\"290\" y2=\"270\""));
        assert_eq!(svg.matches("<marker").count(), 4);
    }

    #[test]
    fn test_render_is_idempotent() {
        let html = format!("<p>before</p>{}", container("diagram-0", "jepa"));
        let (once, found) = render_diagram(&html, "diagram-0", DiagramKind::Jepa, &assets()).unwrap();
        assert!(found);
        assert!(once.starts_with("<p>before</p><div class=\"diagram-container\""));
        let (twice, found) = render_diagram(&once, "diagram-0", DiagramKind::Jepa, &assets()).unwrap();
        assert!(found);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_missing_container_is_noop() {
        let (html, found) =
            render_diagram("<p>no diagrams</p>", "diagram-9", DiagramKind::SimSiam, &assets()).unwrap();
        assert!(!found);
        assert_eq!(html, "<p>no diagrams</p>");
    }

    #[test]
    fn test_mount_marks_unknown_types() {
        let html = format!(
            "{}{}",
            container("diagram-0", "simsiam"),
            container("diagram-1", "&lt;b&gt;")
        );
        let (html, rendered) = mount_diagrams(&html, &assets()).unwrap();
        assert_eq!(rendered, 1);
        assert!(html.contains("SimSiam (Stop-Gradient)"));
        assert!(html.contains("<p class=\"diagram-error\">Unknown diagram: &lt;b&gt;</p>"));
    }

    #[test]
    fn test_mount_skips_diagram_markup_inside_comments() {
        let html = format!(
            "<!-- {} -->{}",
            container("diagram-0", "jepa"),
            container("diagram-1", "simsiam")
        );
        let (out, rendered) = mount_diagrams(&html, &assets()).unwrap();
        assert_eq!(rendered, 1);
        assert!(out.starts_with(&format!("<!-- {} -->", container("diagram-0", "jepa"))));
    }
}
