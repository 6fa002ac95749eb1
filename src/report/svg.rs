use crate::dashboard::{Chart, Panel, Trace, TraceKind};
use maud::{Markup, html};

const PANEL_WIDTH: f64 = 560.0;
const MARGIN_LEFT: f64 = 72.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 16.0;
const MARGIN_BOTTOM: f64 = 52.0;
const BAR_GROUP_FRACTION: f64 = 0.7;
const TARGET_TICKS: f64 = 4.0;

struct Frame {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
    lo: f64,
    hi: f64,
    points: usize,
}

impl Frame {
    fn band(&self) -> f64 {
        (self.right - self.left) / slots(self.points.max(1))
    }

    fn x(&self, index: usize) -> f64 {
        self.left + self.band() * (slots(index) + 0.5)
    }

    fn y(&self, value: f64) -> f64 {
        self.bottom - (value - self.lo) / (self.hi - self.lo) * (self.bottom - self.top)
    }
}

#[allow(
    clippy::cast_precision_loss,
    reason = "panel, trace and point counts are tiny"
)]
const fn slots(count: usize) -> f64 {
    count as f64
}

fn px(value: f64) -> String {
    format!("{value:.1}")
}

pub(crate) fn nice_step(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }
    let magnitude = 10_f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

pub(crate) fn ticks(lo: f64, hi: f64) -> Vec<f64> {
    if !(lo.is_finite() && hi.is_finite()) {
        return vec![0.0];
    }
    let lo = lo.min(0.0);
    let hi = hi.max(0.0);
    let span = if hi > lo { hi - lo } else { 1.0 };
    let step = nice_step(span / TARGET_TICKS);
    let last = (hi / step).ceil();
    std::iter::successors(Some((lo / step).floor()), |k| Some(k + 1.0))
        .take_while(|&k| k <= last)
        .map(|k| k * step)
        .collect()
}

fn tick_label(value: f64, step: f64) -> String {
    if step.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

pub(crate) fn render_chart(chart: &Chart) -> Markup {
    let height = f64::from(chart.height);
    let width = PANEL_WIDTH * slots(chart.panels.len().max(1));
    let view_box = format!("0 0 {} {}", px(width), px(height));
    html! {
        svg.chart viewBox=(view_box) role="img" preserveAspectRatio="xMidYMid meet" {
            @for (index, panel) in chart.panels.iter().enumerate() {
                (render_panel(panel, PANEL_WIDTH * slots(index), height))
            }
        }
        @if chart.show_legend {
            div.legend {
                @for trace in chart.traces() {
                    span.legend-item {
                        span.swatch style=(format!("background:{}", trace.color.primary())) {}
                        (trace.name)
                    }
                }
            }
        }
    }
}

fn render_panel(panel: &Panel, offset: f64, height: f64) -> Markup {
    let values = panel.traces.iter().flat_map(|trace| trace.y.iter().copied());
    let (min, max) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let tick_values = ticks(min, max);
    let step = if tick_values.len() > 1 {
        tick_values[1] - tick_values[0]
    } else {
        1.0
    };
    let years = panel.traces.first().map_or(&[][..], |trace| trace.x.as_slice());
    let frame = Frame {
        left: offset + MARGIN_LEFT,
        right: offset + PANEL_WIDTH - MARGIN_RIGHT,
        top: MARGIN_TOP,
        bottom: height - MARGIN_BOTTOM,
        lo: tick_values.first().copied().unwrap_or(0.0),
        hi: tick_values.last().copied().unwrap_or(1.0).max(step),
        points: years.len(),
    };
    let bars: Vec<&Trace> = panel
        .traces
        .iter()
        .filter(|trace| trace.kind == TraceKind::Bar)
        .collect();
    let lines = panel
        .traces
        .iter()
        .filter(|trace| trace.kind == TraceKind::LinesMarkers);
    let mid_y = (frame.top + frame.bottom) / 2.0;
    let y_title_x = offset + 16.0;

    html! {
        g.panel {
            @for tick in &tick_values {
                line.grid x1=(px(frame.left)) x2=(px(frame.right)) y1=(px(frame.y(*tick))) y2=(px(frame.y(*tick))) {}
                text.tick x=(px(frame.left - 8.0)) y=(px(frame.y(*tick) + 4.0)) text-anchor="end" {
                    (tick_label(*tick, step))
                }
            }
            @if frame.lo < 0.0 {
                line.zero x1=(px(frame.left)) x2=(px(frame.right)) y1=(px(frame.y(0.0))) y2=(px(frame.y(0.0))) {}
            }
            @for (index, year) in years.iter().enumerate() {
                text.tick x=(px(frame.x(index))) y=(px(frame.bottom + 18.0)) text-anchor="middle" {
                    (year)
                }
            }
            (render_bars(&frame, &bars))
            @for trace in lines {
                (render_line(&frame, trace))
            }
            @if let Some(title) = &panel.x_title {
                text.axis-title x=(px((frame.left + frame.right) / 2.0)) y=(px(height - 10.0)) text-anchor="middle" {
                    (title)
                }
            }
            @if let Some(title) = &panel.y_title {
                text.axis-title x=(px(y_title_x)) y=(px(mid_y)) text-anchor="middle"
                    transform=(format!("rotate(-90 {} {})", px(y_title_x), px(mid_y))) {
                    (title)
                }
            }
        }
    }
}

fn render_bars(frame: &Frame, bars: &[&Trace]) -> Markup {
    if bars.is_empty() {
        return html! {};
    }
    let group = frame.band() * BAR_GROUP_FRACTION;
    let width = group / slots(bars.len());
    let baseline = frame.y(0.0);
    html! {
        @for (slot, trace) in bars.iter().enumerate() {
            @for (index, value) in trace.y.iter().enumerate() {
                @let top = frame.y(*value);
                @let x = frame.x(index) - group / 2.0 + width * slots(slot);
                rect.bar x=(px(x)) y=(px(top.min(baseline))) width=(px(width)) height=(px((top - baseline).abs()))
                    fill=(trace.color.at(index)) {
                    title { (trace.name) " " (trace.x[index]) ": " (px(*value)) }
                }
            }
        }
    }
}

fn render_line(frame: &Frame, trace: &Trace) -> Markup {
    let points = trace
        .y
        .iter()
        .enumerate()
        .map(|(index, value)| format!("{},{}", px(frame.x(index)), px(frame.y(*value))))
        .collect::<Vec<_>>()
        .join(" ");
    let color = trace.color.primary();
    html! {
        polyline.series points=(points) fill="none" stroke=(color) stroke-width="3" {}
        @for (index, value) in trace.y.iter().enumerate() {
            circle cx=(px(frame.x(index))) cy=(px(frame.y(*value))) r="4" fill=(trace.color.at(index)) {
                title { (trace.name) " " (trace.x[index]) ": " (px(*value)) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{build_fcff_chart, build_financial_chart};
    use crate::dataset::Dataset;

    #[test]
    fn nice_steps() {
        assert_eq!(nice_step(33_000.0), 50_000.0);
        assert_eq!(nice_step(3.2), 5.0);
        assert_eq!(nice_step(1.0), 1.0);
        assert_eq!(nice_step(0.0), 1.0);
    }

    #[test]
    fn ticks_include_zero_and_cover_range() {
        let values = ticks(-2798.56, 13040.62);
        assert!(values.contains(&0.0));
        assert!(values.first().copied().unwrap() <= -2798.56);
        assert!(values.last().copied().unwrap() >= 13040.62);
    }

    #[test]
    fn fcff_chart_draws_zero_line_and_colored_bars() {
        let dataset = Dataset::titan();
        let chart = build_fcff_chart(&dataset.financials.years, &dataset.financials.fcff).unwrap();
        let svg = render_chart(&chart).into_string();
        assert!(svg.contains("class=\"zero\""));
        assert_eq!(svg.matches("<rect").count(), 11);
        assert!(svg.contains("fill=\"#e74c3c\""));
        assert!(!svg.contains("class=\"legend\""));
    }

    #[test]
    fn subplot_chart_has_two_panels_and_legend() {
        let chart = build_financial_chart(&Dataset::titan()).unwrap();
        let svg = render_chart(&chart).into_string();
        assert_eq!(svg.matches("class=\"panel\"").count(), 2);
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(svg.contains("viewBox=\"0 0 1120.0 400.0\""));
        assert!(svg.contains("Net Profit"));
    }
}
