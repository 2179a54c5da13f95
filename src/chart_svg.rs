use crate::charts::{AxisScale, Point, Series};
use crate::svg::{self, fmt_num, Tag};

const WIDTH: f64 = 480.0;
const HEIGHT: f64 = 300.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 36.0;
const MARGIN_BOTTOM: f64 = 44.0;
const MAX_X_TICKS: usize = 6;
const MAX_Y_TICKS: usize = 6;

const GRID_COLOR: &str = "rgba(255,255,255,0.08)";
const AXIS_TEXT: &str = "#888";
const LEGEND_TEXT: &str = "#ccc";

/// One axis mapped onto a pixel range, in log10 space for log scales.
#[derive(Debug, Clone, Copy)]
struct Axis {
    scale: AxisScale,
    lo: f64,
    hi: f64,
    px_lo: f64,
    px_hi: f64,
}

impl Axis {
    fn new(values: impl Iterator<Item = f64>, scale: AxisScale, px_lo: f64, px_hi: f64) -> Self {
        let (mut lo, mut hi) = values
            .map(|v| transform(v, scale))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });

        if lo == hi {
            let pad = match scale {
                AxisScale::Log => 0.5,
                AxisScale::Linear => lo.abs().max(1.0) * 0.1,
            };
            lo -= pad;
            hi += pad;
        }

        Self {
            scale,
            lo,
            hi,
            px_lo,
            px_hi,
        }
    }

    fn project(&self, value: f64) -> f64 {
        let t = (transform(value, self.scale) - self.lo) / (self.hi - self.lo);
        self.px_lo + t * (self.px_hi - self.px_lo)
    }

    /// Log axes tick on whole decades; a range spanning fewer than two
    /// decades falls back to nice linear values inside it.
    fn ticks(&self, max_ticks: usize) -> Vec<f64> {
        match self.scale {
            AxisScale::Log => {
                let first = self.lo.ceil() as i32;
                let last = self.hi.floor() as i32;
                let count = (last - first + 1).max(0) as usize;
                if count < 2 {
                    return linear_ticks(10f64.powf(self.lo), 10f64.powf(self.hi), max_ticks)
                        .into_iter()
                        .filter(|v| *v > 0.0)
                        .collect();
                }
                let stride = count.div_ceil(max_ticks).max(1);
                (first..=last)
                    .step_by(stride)
                    .map(|exp| 10f64.powi(exp))
                    .collect()
            }
            AxisScale::Linear => linear_ticks(self.lo, self.hi, max_ticks),
        }
    }
}

fn linear_ticks(lo: f64, hi: f64, max_ticks: usize) -> Vec<f64> {
    let step = nice_step(hi - lo, max_ticks - 1);
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

fn transform(value: f64, scale: AxisScale) -> f64 {
    match scale {
        AxisScale::Log => value.log10(),
        AxisScale::Linear => value,
    }
}

fn nice_step(range: f64, target: usize) -> f64 {
    let raw = range / target.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

pub fn format_tick(value: f64) -> String {
    let abs = value.abs();
    if abs != 0.0 && !(1e-3..1e5).contains(&abs) {
        format!("{:e}", value)
    } else if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.3}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Points drawable on `scale`: log axes drop non-positive values.
fn plottable(points: &[Point], scale: AxisScale) -> Vec<Point> {
    points
        .iter()
        .copied()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .filter(|p| scale == AxisScale::Linear || (p.x > 0.0 && p.y > 0.0))
        .collect()
}

/// A filled line chart of one series, with step on x and value on y.
pub fn render_chart(series: &Series, scale: AxisScale) -> String {
    let plot_left = MARGIN_LEFT;
    let plot_right = WIDTH - MARGIN_RIGHT;
    let plot_top = MARGIN_TOP;
    let plot_bottom = HEIGHT - MARGIN_BOTTOM;

    let mut root = svg::svg(WIDTH, HEIGHT)
        .class("line-chart")
        .attr("data-scale", scale.as_str())
        .attr("role", "img")
        .attr("aria-label", &series.spec.title);

    root.push(legend(&series.spec.title, &series.spec.color));

    let points = plottable(&series.points, scale);
    if points.is_empty() {
        root.push(
            svg::text(WIDTH / 2.0, HEIGHT / 2.0, "No data")
                .attr("fill", AXIS_TEXT)
                .attr("font-size", 12)
                .attr("text-anchor", "middle"),
        );
        return root.render();
    }

    let x_axis = Axis::new(points.iter().map(|p| p.x), scale, plot_left, plot_right);
    let y_axis = Axis::new(points.iter().map(|p| p.y), scale, plot_bottom, plot_top);

    let mut grid = Tag::new("g").class("chart-grid");
    for tick in x_axis.ticks(MAX_X_TICKS) {
        let x = x_axis.project(tick);
        grid.push(svg::line(x, plot_top, x, plot_bottom).attr("stroke", GRID_COLOR));
        grid.push(
            svg::text(x, plot_bottom + 16.0, &format_tick(tick))
                .attr("fill", AXIS_TEXT)
                .attr("font-size", 10)
                .attr("text-anchor", "middle"),
        );
    }
    for tick in y_axis.ticks(MAX_Y_TICKS) {
        let y = y_axis.project(tick);
        grid.push(svg::line(plot_left, y, plot_right, y).attr("stroke", GRID_COLOR));
        grid.push(
            svg::text(plot_left - 6.0, y + 3.0, &format_tick(tick))
                .attr("fill", AXIS_TEXT)
                .attr("font-size", 10)
                .attr("text-anchor", "end"),
        );
    }
    root.push(grid);

    root.push(
        svg::text((plot_left + plot_right) / 2.0, HEIGHT - 8.0, "Step")
            .attr("fill", AXIS_TEXT)
            .attr("font-size", 11)
            .attr("text-anchor", "middle"),
    );
    let y_label_x = 14.0;
    let y_label_y = (plot_top + plot_bottom) / 2.0;
    root.push(
        svg::text(y_label_x, y_label_y, &series.spec.title)
            .attr("fill", AXIS_TEXT)
            .attr("font-size", 11)
            .attr("text-anchor", "middle")
            .attr(
                "transform",
                format!("rotate(-90 {} {})", fmt_num(y_label_x), fmt_num(y_label_y)),
            ),
    );

    let coords: Vec<(f64, f64)> = points
        .iter()
        .map(|p| (x_axis.project(p.x), y_axis.project(p.y)))
        .collect();
    let line_path = coords
        .iter()
        .enumerate()
        .map(|(i, (x, y))| format!("{}{} {}", if i == 0 { "M" } else { "L" }, fmt_num(*x), fmt_num(*y)))
        .collect::<Vec<_>>()
        .join(" ");

    if let (Some(first), Some(last)) = (coords.first(), coords.last()) {
        let area = format!(
            "{} L{} {} L{} {} Z",
            line_path,
            fmt_num(last.0),
            fmt_num(plot_bottom),
            fmt_num(first.0),
            fmt_num(plot_bottom)
        );
        root.push(
            Tag::new("path")
                .class("chart-area")
                .attr("d", area)
                .attr("fill", &series.spec.color)
                .attr("fill-opacity", "0.125")
                .attr("stroke", "none"),
        );
    }

    root.push(
        Tag::new("path")
            .class("chart-line")
            .attr("d", line_path)
            .attr("fill", "none")
            .attr("stroke", &series.spec.color)
            .attr("stroke-width", 2)
            .attr("stroke-linejoin", "round"),
    );

    root.render()
}

fn legend(title: &str, color: &str) -> Tag {
    let x = WIDTH / 2.0;
    Tag::new("g")
        .class("chart-legend")
        .child(
            svg::rect(x - 60.0, 10.0, 28.0, 10.0)
                .attr("fill", color)
                .attr("fill-opacity", "0.125")
                .attr("stroke", color)
                .attr("stroke-width", 2),
        )
        .child(
            svg::text(x - 26.0, 19.0, title)
                .attr("fill", LEGEND_TEXT)
                .attr("font-size", 12),
        )
}
