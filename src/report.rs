mod svg;

use crate::dashboard::{Block, Dashboard, MetricCard, Row, Section, Surface, Table};
use crate::export::write_output_file;
use anyhow::Result;
use chrono::{DateTime, Local};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use minify_html::{Cfg, minify};
use std::path::Path;
use tracing::info;

pub struct HtmlSurface<'a> {
    output_path: &'a Path,
    run_started_at: DateTime<Local>,
}

impl<'a> HtmlSurface<'a> {
    pub fn new(output_path: &'a Path, run_started_at: DateTime<Local>) -> Self {
        Self {
            output_path,
            run_started_at,
        }
    }
}

impl Surface for HtmlSurface<'_> {
    fn render(&mut self, dashboard: &Dashboard) -> Result<()> {
        let generated_at = self
            .run_started_at
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string();
        let html = render_html_report(dashboard, &generated_at);
        let mut cfg = Cfg::new();
        cfg.minify_css = true;
        cfg.keep_closing_tags = true;
        let bytes = minify(html.as_bytes(), &cfg);
        write_output_file(self.output_path, &bytes)?;
        info!(path = %self.output_path.display(), bytes = bytes.len(), "wrote HTML report");
        Ok(())
    }
}

pub fn render_html_report(dashboard: &Dashboard, generated_at: &str) -> String {
    let sidebar = &dashboard.sidebar;
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                meta name="color-scheme" content="light";
                title { (dashboard.title) }
                style { (PreEscaped(REPORT_STYLE)) }
            }
            body {
                div.layout {
                    aside.sidebar {
                        h2 { (sidebar.title) }
                        div.sidebar-metrics {
                            @for card in &sidebar.metrics {
                                (metric_card(card))
                            }
                        }
                        h3 { (sidebar.assumptions_title) }
                        ul.assumptions {
                            @for assumption in &sidebar.assumptions {
                                li { (assumption) }
                            }
                        }
                        @for caption in &sidebar.captions {
                            p.caption { (caption) }
                        }
                    }
                    main.page {
                        header.hero {
                            div.pill { "dcfboard v" (env!("CARGO_PKG_VERSION")) }
                            h1.header { (dashboard.title) }
                            p.subtitle { (dashboard.tagline) }
                            div.meta {
                                span.label { "Generated" }
                                span.value.mono { (generated_at) }
                            }
                        }
                        section.cards {
                            @for card in &dashboard.cards {
                                (metric_card(card))
                            }
                        }
                        @for row in &dashboard.rows {
                            @match row {
                                Row::Full(section) => {
                                    (render_section(section))
                                },
                                Row::Columns(sections) => {
                                    div.columns {
                                        @for section in sections {
                                            (render_section(section))
                                        }
                                    }
                                },
                            }
                        }
                        footer.footer { (dashboard.footer) }
                    }
                }
            }
        }
    };
    markup.into_string()
}

fn metric_card(card: &MetricCard) -> Markup {
    html! {
        div.metric-card {
            div.metric-title { (card.title) }
            div.metric-value { (card.value) }
            @if let Some(subtitle) = &card.subtitle {
                div.metric-sub { (subtitle) }
            }
        }
    }
}

fn render_section(section: &Section) -> Markup {
    html! {
        section.block {
            div.section-title { (section.title) }
            @match &section.block {
                Block::Chart(chart) => {
                    div.chart-wrap { (svg::render_chart(chart)) }
                },
                Block::Table(table) => {
                    (render_table(table))
                },
            }
            @if let Some(caption) = &section.caption {
                p.caption { (caption) }
            }
        }
    }
}

fn render_table(table: &Table) -> Markup {
    html! {
        div.table-wrap {
            table {
                thead {
                    tr {
                        @if table.show_index {
                            th {}
                        }
                        @for header in table.headers() {
                            th { (header) }
                        }
                    }
                }
                tbody {
                    @for index in 0..table.row_count() {
                        tr {
                            @if table.show_index {
                                td.num { (index) }
                            }
                            @for (column, cell) in table.row(index).into_iter().enumerate() {
                                @if column == 0 {
                                    td.label-cell { (cell) }
                                } @else {
                                    td.num { (cell) }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

const REPORT_STYLE: &str = r#"
:root {
  color-scheme: light;
  --ink: #2c3e50;
  --muted: #7f8c8d;
  --faint: #95a5a6;
  --accent: #3498db;
  --rule: #ecf0f1;
  --card: #f8f9fa;
  --shadow: 0 4px 6px rgba(0, 0, 0, 0.1);
}

* {
  box-sizing: border-box;
}

body {
  margin: 0;
  font-family: "Arial", "Segoe UI", sans-serif;
  color: var(--ink);
  background: #ffffff;
}

.layout {
  display: grid;
  grid-template-columns: 280px 1fr;
  min-height: 100vh;
}

.sidebar {
  background: #f0f2f6;
  padding: 32px 24px;
  border-right: 1px solid var(--rule);
}

.sidebar h2 {
  margin: 0 0 16px;
  font-size: 1.5rem;
}

.sidebar h3 {
  margin: 24px 0 8px;
  font-size: 1.1rem;
}

.sidebar-metrics {
  display: grid;
  grid-template-columns: 1fr 1fr;
  gap: 12px;
}

.assumptions {
  padding-left: 18px;
  line-height: 1.5;
  font-size: 14px;
}

.caption {
  color: var(--muted);
  font-size: 12px;
  margin: 8px 0;
}

.page {
  max-width: 1200px;
  width: 100%;
  margin: 0 auto;
  padding: 40px 32px 64px;
}

.pill {
  display: inline-flex;
  padding: 4px 12px;
  border-radius: 999px;
  background: rgba(52, 152, 219, 0.12);
  color: var(--accent);
  font-size: 12px;
  font-weight: 600;
  text-transform: uppercase;
  letter-spacing: 0.08em;
}

.header {
  font-family: "Arial", sans-serif;
  color: var(--ink);
  border-bottom: 2px solid var(--accent);
  padding-bottom: 10px;
  margin: 16px 0 8px;
}

.subtitle {
  margin: 0 0 12px;
  font-weight: 700;
}

.meta .label {
  font-size: 12px;
  text-transform: uppercase;
  letter-spacing: 0.1em;
  color: var(--muted);
  margin-right: 8px;
}

.mono {
  font-family: "SFMono-Regular", ui-monospace, monospace;
}

.cards {
  display: grid;
  grid-template-columns: repeat(auto-fit, minmax(220px, 1fr));
  gap: 16px;
  margin: 28px 0 8px;
}

.metric-card {
  background-color: var(--card);
  border-radius: 10px;
  padding: 15px;
  box-shadow: var(--shadow);
  margin-bottom: 20px;
}

.metric-title {
  font-size: 14px;
  color: var(--muted);
  margin-bottom: 5px;
}

.metric-value {
  font-size: 24px;
  font-weight: 700;
  color: var(--ink);
}

.metric-sub {
  font-size: 12px;
  color: var(--faint);
}

.section-title {
  font-size: 20px;
  font-weight: 700;
  color: var(--ink);
  margin: 25px 0 15px 0;
  padding-bottom: 8px;
  border-bottom: 1px solid var(--rule);
}

.columns {
  display: grid;
  grid-template-columns: 1fr 1fr;
  gap: 24px;
}

.chart {
  width: 100%;
  height: auto;
}

.chart .grid {
  stroke: var(--rule);
  stroke-width: 1;
}

.chart .zero {
  stroke: var(--faint);
  stroke-width: 1.5;
}

.chart .tick {
  font-size: 12px;
  fill: var(--muted);
}

.chart .axis-title {
  font-size: 13px;
  fill: var(--ink);
}

.legend {
  display: flex;
  justify-content: flex-end;
  gap: 16px;
  font-size: 13px;
}

.legend-item {
  display: inline-flex;
  align-items: center;
  gap: 6px;
}

.swatch {
  display: inline-block;
  width: 12px;
  height: 12px;
  border-radius: 3px;
}

.table-wrap {
  border-radius: 10px;
  overflow: auto;
  box-shadow: var(--shadow);
}

table {
  width: 100%;
  border-collapse: collapse;
}

thead th {
  background: var(--card);
  color: var(--muted);
  text-align: left;
  font-size: 12px;
  text-transform: uppercase;
  letter-spacing: 0.06em;
  padding: 12px 14px;
}

tbody td {
  padding: 10px 14px;
  border-bottom: 1px solid var(--rule);
  font-size: 14px;
}

.num {
  text-align: right;
  font-variant-numeric: tabular-nums;
}

.label-cell {
  font-weight: 600;
}

.footer {
  margin-top: 32px;
  padding-top: 16px;
  border-top: 1px solid var(--rule);
  color: var(--muted);
  font-size: 12px;
}

@media (max-width: 900px) {
  .layout,
  .columns {
    grid-template-columns: 1fr;
  }
}
"#;
