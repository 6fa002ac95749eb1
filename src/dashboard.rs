use crate::error::{DashboardError, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCard {
    pub title: String,
    pub value: String,
    pub subtitle: Option<String>,
}

impl MetricCard {
    pub fn new(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            subtitle: None,
        }
    }

    #[must_use]
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Bar,
    LinesMarkers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceColor {
    Uniform(String),
    PerPoint(Vec<String>),
}

impl TraceColor {
    pub fn at(&self, index: usize) -> &str {
        match self {
            Self::Uniform(color) => color,
            Self::PerPoint(colors) => colors.get(index).map_or("#7f8c8d", String::as_str),
        }
    }

    pub fn primary(&self) -> &str {
        self.at(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub name: String,
    pub kind: TraceKind,
    pub x: Vec<i32>,
    pub y: Vec<f64>,
    pub color: TraceColor,
}

impl Trace {
    pub fn new(
        name: impl Into<String>,
        kind: TraceKind,
        x: Vec<i32>,
        y: Vec<f64>,
        color: TraceColor,
    ) -> Result<Self> {
        let name = name.into();
        if x.len() != y.len() {
            return Err(DashboardError::shape(
                format!("trace '{name}'"),
                x.len(),
                y.len(),
            ));
        }
        if let TraceColor::PerPoint(colors) = &color {
            if colors.len() != y.len() {
                return Err(DashboardError::shape(
                    format!("colors of trace '{name}'"),
                    y.len(),
                    colors.len(),
                ));
            }
        }
        Ok(Self {
            name,
            kind,
            x,
            y,
            color,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub x_title: Option<String>,
    pub y_title: Option<String>,
    pub traces: Vec<Trace>,
}

impl Panel {
    pub fn new(traces: Vec<Trace>) -> Self {
        Self {
            x_title: None,
            y_title: None,
            traces,
        }
    }

    #[must_use]
    pub fn titled(mut self, x_title: Option<&str>, y_title: Option<&str>) -> Self {
        self.x_title = x_title.map(str::to_string);
        self.y_title = y_title.map(str::to_string);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub panels: Vec<Panel>,
    pub height: u32,
    pub show_legend: bool,
}

impl Chart {
    pub fn new(panels: Vec<Panel>, height: u32, show_legend: bool) -> Result<Self> {
        let mut traces = panels.iter().flat_map(|panel| panel.traces.iter());
        let Some(first) = traces.next() else {
            return Err(DashboardError::shape("chart traces", 1, 0));
        };
        for trace in traces {
            if trace.x != first.x {
                return Err(DashboardError::shape(
                    format!("x values of trace '{}'", trace.name),
                    first.x.len(),
                    trace.x.len(),
                ));
            }
        }
        Ok(Self {
            panels,
            height,
            show_legend,
        })
    }

    pub fn x(&self) -> &[i32] {
        self.traces()
            .next()
            .map(|trace| trace.x.as_slice())
            .unwrap_or_default()
    }

    pub fn traces(&self) -> impl Iterator<Item = &Trace> {
        self.panels.iter().flat_map(|panel| panel.traces.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<String>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub show_index: bool,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>, show_index: bool) -> Result<Self> {
        let name = name.into();
        if let Some(first) = columns.first() {
            let rows = first.cells.len();
            if let Some(column) = columns.iter().find(|column| column.cells.len() != rows) {
                return Err(DashboardError::shape(
                    format!("column '{}' of table '{name}'", column.name),
                    rows,
                    column.cells.len(),
                ));
            }
        }
        Ok(Self {
            name,
            columns,
            show_index,
        })
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |column| column.cells.len())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    pub fn row(&self, index: usize) -> Vec<&str> {
        self.columns
            .iter()
            .map(|column| column.cells.get(index).map_or("", String::as_str))
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Chart(Chart),
    Table(Table),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub block: Block,
    pub caption: Option<String>,
}

impl Section {
    pub fn new(title: impl Into<String>, block: Block) -> Self {
        Self {
            title: title.into(),
            block,
            caption: None,
        }
    }

    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layout", content = "sections", rename_all = "snake_case")]
pub enum Row {
    Full(Section),
    Columns(Vec<Section>),
}

impl Row {
    pub fn sections(&self) -> &[Section] {
        match self {
            Self::Full(section) => std::slice::from_ref(section),
            Self::Columns(sections) => sections,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sidebar {
    pub title: String,
    pub metrics: Vec<MetricCard>,
    pub assumptions_title: String,
    pub assumptions: Vec<String>,
    pub captions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub title: String,
    pub tagline: String,
    pub sidebar: Sidebar,
    pub cards: Vec<MetricCard>,
    pub rows: Vec<Row>,
    pub footer: String,
}

impl Dashboard {
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.rows.iter().flat_map(Row::sections)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.sections().filter_map(|section| match &section.block {
            Block::Table(table) => Some(table),
            Block::Chart(_) => None,
        })
    }

    pub fn charts(&self) -> impl Iterator<Item = (&str, &Chart)> {
        self.sections().filter_map(|section| match &section.block {
            Block::Chart(chart) => Some((section.title.as_str(), chart)),
            Block::Table(_) => None,
        })
    }
}

pub trait Surface {
    fn render(&mut self, dashboard: &Dashboard) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(color: &str) -> TraceColor {
        TraceColor::Uniform(color.to_string())
    }

    #[test]
    fn table_rejects_ragged_columns() {
        let err = Table::new(
            "t",
            vec![
                Column::new("a", vec!["1".into(), "2".into()]),
                Column::new("b", vec!["1".into()]),
            ],
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::ShapeMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn table_rows_read_across_columns() {
        let table = Table::new(
            "t",
            vec![
                Column::new("a", vec!["1".into(), "2".into()]),
                Column::new("b", vec!["x".into(), "y".into()]),
            ],
            false,
        )
        .unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.row(1), vec!["2", "y"]);
        assert_eq!(table.headers().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn trace_rejects_length_mismatch() {
        let err = Trace::new(
            "t",
            TraceKind::Bar,
            vec![2020, 2021],
            vec![1.0],
            uniform("#000"),
        )
        .unwrap_err();
        assert!(matches!(err, DashboardError::ShapeMismatch { .. }));
    }

    #[test]
    fn trace_rejects_short_point_colors() {
        let colors = TraceColor::PerPoint(vec!["#000".to_string()]);
        let err = Trace::new("t", TraceKind::Bar, vec![1, 2], vec![1.0, 2.0], colors);
        assert!(err.is_err());
    }

    #[test]
    fn chart_requires_shared_years() {
        let a = Trace::new("a", TraceKind::Bar, vec![1, 2], vec![1.0, 2.0], uniform("#1")).unwrap();
        let b = Trace::new(
            "b",
            TraceKind::LinesMarkers,
            vec![1, 3],
            vec![1.0, 2.0],
            uniform("#2"),
        )
        .unwrap();
        let err = Chart::new(vec![Panel::new(vec![a]), Panel::new(vec![b])], 300, true);
        assert!(matches!(err, Err(DashboardError::ShapeMismatch { .. })));
    }

    #[test]
    fn chart_rejects_empty() {
        assert!(Chart::new(vec![Panel::new(Vec::new())], 300, true).is_err());
    }
}
