use crate::dashboard::{Block, Chart, Dashboard, MetricCard, Section, Surface, Table, TraceKind};
use crate::formatting::format_value;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::{ColoredString, Colorize};
use std::io::{self, Write};
use std::path::Path;

const BANNER_WIDTH: usize = 61;
const BAR_WIDTH: u32 = 24;
const COMPACT_CHART_ROWS: usize = 6;

pub struct SummaryPaths<'a> {
    pub html: Option<&'a Path>,
    pub csv: Option<&'a Path>,
    pub json: Option<&'a Path>,
}

pub struct TerminalSurface<'a, W> {
    out: W,
    run_started_at: DateTime<Local>,
    full_output: bool,
    paths: SummaryPaths<'a>,
}

impl<'a, W: Write> TerminalSurface<'a, W> {
    pub fn new(
        out: W,
        run_started_at: DateTime<Local>,
        full_output: bool,
        paths: SummaryPaths<'a>,
    ) -> Self {
        Self {
            out,
            run_started_at,
            full_output,
            paths,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn print_summary(&mut self, dashboard: &Dashboard) -> io::Result<()> {
        writeln!(self.out)?;
        self.print_header(dashboard)?;
        self.print_paths()?;
        self.print_sidebar(dashboard)?;
        writeln!(self.out)?;
        print_cards(&mut self.out, &dashboard.cards)?;
        for section in dashboard.sections() {
            writeln!(self.out)?;
            self.print_section(section)?;
        }
        writeln!(self.out)?;
        writeln!(self.out, "{}", dashboard.footer.bright_black())?;
        writeln!(self.out, "{}", "=".repeat(BANNER_WIDTH).bright_cyan())
    }

    fn print_header(&mut self, dashboard: &Dashboard) -> io::Result<()> {
        let title = format!(" {} ", dashboard.title);
        writeln!(
            self.out,
            "{}",
            format!("{title:=^BANNER_WIDTH$}").bold().bright_cyan()
        )?;
        writeln!(self.out, "{}", dashboard.tagline.bright_white())?;
        writeln!(
            self.out,
            "{} {}",
            "Generated".bright_yellow().bold(),
            self.run_started_at
                .format("%Y-%m-%d %H:%M:%S %Z")
                .to_string()
                .bright_white()
        )
    }

    fn print_paths(&mut self) -> io::Result<()> {
        let entries = [
            ("HTML Report", self.paths.html, "not saved (use --save-html)"),
            ("CSV Tables", self.paths.csv, "not saved (use --save-csv)"),
            ("JSON Dashboard", self.paths.json, "not saved (use --save-json)"),
        ];
        for (label, path, hint) in entries {
            let label_colored = label.bright_yellow().bold();
            match path {
                Some(path) => writeln!(
                    self.out,
                    "{} {}",
                    label_colored,
                    path.display().to_string().bright_white()
                )?,
                None => writeln!(self.out, "{} {}", label_colored, hint.bright_black())?,
            }
        }
        Ok(())
    }

    fn print_sidebar(&mut self, dashboard: &Dashboard) -> io::Result<()> {
        let sidebar = &dashboard.sidebar;
        writeln!(self.out)?;
        writeln!(self.out, "{}", sidebar.title.bold().bright_magenta())?;
        let metrics = sidebar
            .metrics
            .iter()
            .map(|card| format!("{}: {}", card.title, card.value).bright_white().to_string())
            .collect::<Vec<_>>()
            .join(" | ");
        writeln!(self.out, "{metrics}")?;
        writeln!(self.out, "{}", sidebar.assumptions_title.bright_yellow().bold())?;
        for assumption in &sidebar.assumptions {
            writeln!(self.out, "  - {assumption}")?;
        }
        for caption in &sidebar.captions {
            writeln!(self.out, "{}", caption.bright_black())?;
        }
        Ok(())
    }

    fn print_section(&mut self, section: &Section) -> io::Result<()> {
        writeln!(self.out, "{}", section.title.bold().bright_magenta())?;
        match &section.block {
            Block::Table(table) => print_table(&mut self.out, table)?,
            Block::Chart(chart) => print_chart(&mut self.out, chart, self.full_output)?,
        }
        if let Some(caption) = &section.caption {
            writeln!(self.out, "{}", caption.bright_black())?;
        }
        Ok(())
    }
}

impl<W: Write> Surface for TerminalSurface<'_, W> {
    fn render(&mut self, dashboard: &Dashboard) -> Result<()> {
        self.print_summary(dashboard)
            .context("failed to write terminal summary")?;
        self.out.flush().context("failed to flush terminal summary")
    }
}

fn print_cards(out: &mut impl Write, cards: &[MetricCard]) -> io::Result<()> {
    let width = cards
        .iter()
        .map(|card| card.title.chars().count())
        .max()
        .unwrap_or(0);
    for card in cards {
        let subtitle = card
            .subtitle
            .as_deref()
            .map_or_else(String::new, |sub| format!("  ({sub})"));
        writeln!(
            out,
            "{} {}{}",
            format!("{:<width$}", card.title).bright_yellow().bold(),
            card.value.bold().bright_white(),
            subtitle.bright_black()
        )?;
    }
    Ok(())
}

fn column_widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            rows.iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect()
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(idx, (cell, &width))| {
            if idx == 0 {
                format!("{cell:<width$}")
            } else {
                format!("{cell:>width$}")
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

fn separator(widths: &[usize]) -> String {
    widths
        .iter()
        .map(|&width| "-".repeat(width))
        .collect::<Vec<_>>()
        .join("-+-")
}

fn print_grid(out: &mut impl Write, headers: &[String], rows: &[Vec<String>]) -> io::Result<()> {
    let widths = column_widths(headers, rows);
    writeln!(out, "{}", format_line(headers, &widths).bold().bright_white())?;
    writeln!(out, "{}", separator(&widths).bright_black())?;
    for row in rows {
        writeln!(out, "{}", format_line(row, &widths).bright_green())?;
    }
    Ok(())
}

pub(crate) fn print_table(out: &mut impl Write, table: &Table) -> io::Result<()> {
    if table.row_count() == 0 {
        return writeln!(out, "{}", "No rows available.".bright_black());
    }
    let mut headers: Vec<String> = table.headers().map(str::to_string).collect();
    let mut rows: Vec<Vec<String>> = (0..table.row_count())
        .map(|idx| table.row(idx).into_iter().map(str::to_string).collect())
        .collect();
    if table.show_index {
        headers.insert(0, String::new());
        for (idx, row) in rows.iter_mut().enumerate() {
            row.insert(0, idx.to_string());
        }
    }
    print_grid(out, &headers, &rows)
}

pub(crate) fn print_chart(out: &mut impl Write, chart: &Chart, full_output: bool) -> io::Result<()> {
    let years = chart.x();
    let traces: Vec<_> = chart.traces().collect();
    let bar_scale = traces
        .iter()
        .filter(|trace| trace.kind == TraceKind::Bar)
        .flat_map(|trace| trace.y.iter())
        .fold(0.0_f64, |acc, value| acc.max(value.abs()));

    let mut headers = vec!["Year".to_string()];
    headers.extend(traces.iter().map(|trace| trace.name.clone()));
    let limit = if full_output {
        years.len()
    } else {
        years.len().min(COMPACT_CHART_ROWS)
    };
    let rows: Vec<Vec<String>> = years
        .iter()
        .take(limit)
        .enumerate()
        .map(|(idx, year)| {
            let mut row = vec![year.to_string()];
            row.extend(traces.iter().map(|trace| format_value(trace.y[idx])));
            row
        })
        .collect();

    let widths = column_widths(&headers, &rows);
    writeln!(out, "{}", format_line(&headers, &widths).bold().bright_white())?;
    writeln!(out, "{}", separator(&widths).bright_black())?;
    for (idx, row) in rows.iter().enumerate() {
        let mut line = format_line(row, &widths).bright_green().to_string();
        for trace in traces.iter().filter(|trace| trace.kind == TraceKind::Bar) {
            line.push_str("  ");
            line.push_str(&bar(trace.y[idx], bar_scale, trace.color.at(idx)).to_string());
        }
        writeln!(out, "{line}")?;
    }
    if years.len() > limit {
        writeln!(
            out,
            "{}",
            format!(
                "... {} more years (use --full-output to display all).",
                years.len() - limit
            )
            .bright_black()
        )?;
    }
    Ok(())
}

fn bar(value: f64, scale: f64, color: &str) -> ColoredString {
    let target = if scale > 0.0 {
        (value.abs() / scale).min(1.0) * f64::from(BAR_WIDTH)
    } else {
        0.0
    };
    let filled = (1..=BAR_WIDTH)
        .take_while(|&cells| f64::from(cells) - 0.5 <= target)
        .count();
    let glyphs = "█".repeat(filled.max(1));
    match parse_hex(color) {
        Some((r, g, b)) => glyphs.truecolor(r, g, b),
        None => glyphs.normal(),
    }
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{assemble, build_dcf_table, build_fcff_chart};
    use crate::dataset::Dataset;

    fn plain<F: FnOnce(&mut Vec<u8>) -> io::Result<()>>(f: F) -> String {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn bars_scale_to_the_largest_value() {
        colored::control::set_override(false);
        let cells = |value: f64, scale: f64| bar(value, scale, "#27ae60").to_string().chars().count();
        assert_eq!(cells(100.0, 100.0), 24);
        assert_eq!(cells(-50.0, 100.0), 12);
        assert_eq!(cells(1.0, 1000.0), 1);
        assert_eq!(cells(5.0, 0.0), 1);
        assert_eq!(cells(500.0, 100.0), 24);
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex("#27ae60"), Some((0x27, 0xae, 0x60)));
        assert_eq!(parse_hex("27ae60"), None);
        assert_eq!(parse_hex("#fff"), None);
    }

    #[test]
    fn table_columns_align() {
        let table = build_dcf_table(&Dataset::titan().dcf_components).unwrap();
        let text = plain(|out| print_table(out, &table));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Component        | Value (₹ Cr)");
        assert_eq!(lines[2], "Terminal Value   |    ₹3,85,728");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn compact_chart_truncates() {
        let years: Vec<i32> = (2020..=2030).collect();
        let chart = build_fcff_chart(&years, &[1.0; 11]).unwrap();
        let text = plain(|out| print_chart(out, &chart, false));
        assert!(text.contains("... 5 more years"));
        let full = plain(|out| print_chart(out, &chart, true));
        assert!(full.contains("2030"));
        assert!(!full.contains("more years"));
    }

    #[test]
    fn summary_lists_every_section() {
        let dashboard = assemble(&Dataset::titan()).unwrap();
        colored::control::set_override(false);
        let mut surface = TerminalSurface::new(
            Vec::new(),
            Local::now(),
            true,
            SummaryPaths {
                html: None,
                csv: None,
                json: None,
            },
        );
        surface.render(&dashboard).unwrap();
        let text = String::from_utf8(surface.into_inner()).unwrap();
        for section in dashboard.sections() {
            assert!(text.contains(&section.title), "missing {}", section.title);
        }
        assert!(text.contains("₹2,83,867.75 Cr"));
        assert!(text.contains("not saved (use --save-html)"));
        assert!(text.contains("- Depreciation at 1.1% of revenue"));
    }
}
