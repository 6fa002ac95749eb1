use crate::dashboard::{Chart, Dashboard, Surface, Table};
use crate::formatting::format_exact;
use anyhow::{Context, Result};
use csv::Writer;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub(crate) fn write_output_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;

    Ok(())
}

fn finalize_writer(mut writer: Writer<Vec<u8>>, label: &str) -> Result<Vec<u8>> {
    writer
        .flush()
        .with_context(|| format!("failed to flush {label}"))?;
    writer
        .into_inner()
        .with_context(|| format!("failed to finalize {label}"))
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .context("failed to compress CSV output")?;
    encoder.finish().context("failed to finish gzip stream")
}

pub fn serialize_table(table: &Table) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer
        .write_record(table.headers())
        .with_context(|| format!("failed to write header of table {}", table.name))?;
    for index in 0..table.row_count() {
        writer
            .write_record(table.row(index))
            .with_context(|| format!("failed to write row {index} of table {}", table.name))?;
    }
    finalize_writer(writer, "table CSV writer")
}

pub fn serialize_chart(chart: &Chart) -> Result<Vec<u8>> {
    let traces: Vec<_> = chart.traces().collect();
    let mut writer = Writer::from_writer(Vec::new());
    writer
        .write_record(std::iter::once("Year").chain(traces.iter().map(|trace| trace.name.as_str())))
        .context("failed to write chart CSV header")?;
    for (index, year) in chart.x().iter().enumerate() {
        let mut record = vec![year.to_string()];
        record.extend(traces.iter().map(|trace| format_exact(trace.y[index])));
        writer
            .write_record(&record)
            .context("failed to write chart CSV row")?;
    }
    finalize_writer(writer, "chart CSV writer")
}

pub(crate) fn slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

pub struct CsvSurface<'a> {
    dir: &'a Path,
    archive: bool,
    written: Vec<PathBuf>,
}

impl<'a> CsvSurface<'a> {
    pub fn new(dir: &'a Path, archive: bool) -> Self {
        Self {
            dir,
            archive,
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn save(&mut self, stem: &str, bytes: Vec<u8>) -> Result<()> {
        let (name, bytes) = if self.archive {
            (format!("{stem}.csv.gz"), gzip(&bytes)?)
        } else {
            (format!("{stem}.csv"), bytes)
        };
        let path = self.dir.join(name);
        write_output_file(&path, &bytes)?;
        info!(path = %path.display(), "wrote CSV export");
        self.written.push(path);
        Ok(())
    }
}

impl Surface for CsvSurface<'_> {
    fn render(&mut self, dashboard: &Dashboard) -> Result<()> {
        for table in dashboard.tables() {
            self.save(&table.name, serialize_table(table)?)?;
        }
        for (title, chart) in dashboard.charts() {
            self.save(&format!("chart_{}", slug(title)), serialize_chart(chart)?)?;
        }
        Ok(())
    }
}

pub struct JsonSurface<'a> {
    path: &'a Path,
}

impl<'a> JsonSurface<'a> {
    pub fn new(path: &'a Path) -> Self {
        Self { path }
    }
}

impl Surface for JsonSurface<'_> {
    fn render(&mut self, dashboard: &Dashboard) -> Result<()> {
        write_json(self.path, dashboard)?;
        info!(path = %self.path.display(), "wrote JSON dashboard");
        Ok(())
    }
}

pub fn to_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value).context("failed to serialize JSON")?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_output_file(path, &to_json_bytes(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{assemble, build_fcff_chart, build_ratio_table};
    use crate::dataset::Dataset;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn slugs_are_file_safe() {
        assert_eq!(slug("Free Cash Flow Projection"), "free_cash_flow_projection");
        assert_eq!(slug("  Share Price (₹) "), "share_price");
    }

    #[test]
    fn table_csv_keeps_display_strings() {
        let table = build_ratio_table(&Dataset::titan().ratios).unwrap();
        let text = String::from_utf8(serialize_table(&table).unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Ratio,2020,2025,2030"));
        assert_eq!(lines.next(), Some("Current Ratio,0.70x,0.32x,0.29x"));
        assert_eq!(text.lines().count(), 7);
    }

    #[test]
    fn chart_csv_has_year_column() {
        let chart = build_fcff_chart(&[2020, 2021], &[506.73, -2798.56]).unwrap();
        let text = String::from_utf8(serialize_chart(&chart).unwrap()).unwrap();
        assert_eq!(text, "Year,FCFF\n2020,506.73\n2021,-2798.56\n");
    }

    #[test]
    fn chart_csv_keeps_full_precision() {
        let chart = build_fcff_chart(&[2020, 2021], &[0.125, 1_234.0]).unwrap();
        let text = String::from_utf8(serialize_chart(&chart).unwrap()).unwrap();
        assert_eq!(text, "Year,FCFF\n2020,0.125\n2021,1234\n");
    }

    #[test]
    fn archived_csv_round_trips_through_gzip() {
        let dir = std::env::temp_dir().join(format!("dcfboard-csv-{}", std::process::id()));
        let dashboard = assemble(&Dataset::titan()).unwrap();
        let mut surface = CsvSurface::new(&dir, true);
        surface.render(&dashboard).unwrap();
        assert_eq!(surface.written().len(), 6);

        let path = dir.join("sensitivity.csv.gz");
        let mut decoder = GzDecoder::new(fs::File::open(&path).unwrap());
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        assert!(text.starts_with("Growth Rate,7.5% WACC,8.0% WACC"));
        fs::remove_dir_all(&dir).unwrap();
    }
}
