use crate::dashboard::{
    Block, Chart, Column, Dashboard, MetricCard, Panel, Row, Section, Sidebar, Table, Trace,
    TraceColor, TraceKind,
};
use crate::dataset::{DcfComponent, Dataset, Metric, RatioTable, YearSeries};
use crate::error::{DashboardError, Result};
use crate::formatting::{
    Grouping, cagr, derive_named_margin, format_currency, format_currency_with, format_multiple,
    format_percentage, format_price,
};
use ndarray::Array2;
use tracing::debug;

pub const BLUE: &str = "#3498db";
pub const RED: &str = "#e74c3c";
pub const GREEN: &str = "#27ae60";

const CRORES_AXIS: &str = "₹ Crores";
const CAGR_SPAN_YEARS: u32 = 5;

pub const SENSITIVITY_CAPTION: &str =
    "Sensitivity analysis shows intrinsic share price under different WACC and terminal growth assumptions";

#[derive(Debug, Clone, PartialEq)]
pub struct Margins {
    pub ebit: Vec<f64>,
    pub net: Vec<f64>,
}

pub fn derive_margins(dataset: &Dataset) -> Result<Margins> {
    let financials = &dataset.financials;
    let ebit = derive_named_margin("EBIT margin", &financials.revenue, &financials.ebit)?;
    let net = derive_named_margin("net margin", &financials.revenue, &financials.net_profit)?;
    debug!(?ebit, ?net, "derived margin series");
    Ok(Margins { ebit, net })
}

pub fn assemble(dataset: &Dataset) -> Result<Dashboard> {
    let margins = derive_margins(dataset)?;
    let financials = &dataset.financials;
    let company = &dataset.company;

    let performance = Section::new(
        "Financial Performance",
        Block::Chart(build_financial_chart(dataset)?),
    );
    let profitability = Section::new(
        "Profitability Metrics",
        Block::Chart(build_margin_chart(
            &financials.years,
            &margins.ebit,
            &margins.net,
            &financials.roe,
        )?),
    );
    let breakdown = Section::new(
        "DCF Valuation Breakdown",
        Block::Table(build_dcf_table(&dataset.dcf_components)?),
    );
    let cash_flow = Section::new(
        "Free Cash Flow Projection",
        Block::Chart(build_fcff_chart(&financials.years, &financials.fcff)?),
    );

    let grid = dataset.sensitivity.to_array()?;
    let growth_labels = percent_labels(&dataset.sensitivity.growth_rates, "")?;
    let wacc_labels = percent_labels(&dataset.sensitivity.waccs, " WACC")?;
    let sensitivity = Section::new(
        "Share Price Sensitivity Table",
        Block::Table(build_sensitivity_table(&growth_labels, &wacc_labels, &grid)?),
    )
    .with_caption(SENSITIVITY_CAPTION);
    let ratios = Section::new(
        "Key Financial Ratios",
        Block::Table(build_ratio_table(&dataset.ratios)?),
    );

    Ok(Dashboard {
        title: format!("{} DCF Valuation", company.name),
        tagline: std::iter::once(company.tagline.as_str())
            .chain(company.facts.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" • "),
        sidebar: sidebar(dataset)?,
        cards: headline_cards(dataset, &margins.net)?,
        rows: vec![
            Row::Full(performance),
            Row::Full(profitability),
            Row::Columns(vec![breakdown, cash_flow]),
            Row::Full(sensitivity),
            Row::Full(ratios),
        ],
        footer: company.footer.clone(),
    })
}

fn percent_labels(values: &[f64], suffix: &str) -> Result<Vec<String>> {
    values
        .iter()
        .map(|&value| Ok(format!("{}{suffix}", format_percentage(value, 1)?)))
        .collect()
}

pub fn sidebar(dataset: &Dataset) -> Result<Sidebar> {
    let parameters = &dataset.parameters;
    Ok(Sidebar {
        title: "DCF Parameters".to_string(),
        metrics: vec![
            MetricCard::new("WACC", format_percentage(parameters.wacc, 2)?),
            MetricCard::new(
                "Terminal Growth",
                format_percentage(parameters.terminal_growth, 1)?,
            ),
        ],
        assumptions_title: "Key Assumptions".to_string(),
        assumptions: parameters.assumptions.clone(),
        captions: dataset.company.credits.clone(),
    })
}

pub fn revenue_cagr(series: &YearSeries, end_year: i32, span: u32) -> Result<f64> {
    let start_year = i32::try_from(span)
        .ok()
        .and_then(|span| end_year.checked_sub(span))
        .ok_or_else(|| {
            DashboardError::InvalidDataset(format!(
                "{span}-year span before {end_year} is out of range"
            ))
        })?;
    let missing = |year: i32| {
        DashboardError::InvalidDataset(format!("{} has no value for {year}", series.name))
    };
    let start = series.value_at(start_year).ok_or_else(|| missing(start_year))?;
    let end = series.value_at(end_year).ok_or_else(|| missing(end_year))?;
    cagr(start, end, span)
}

pub fn headline_cards(dataset: &Dataset, net_margin: &[f64]) -> Result<Vec<MetricCard>> {
    let valuation = &dataset.valuation;
    let financials = &dataset.financials;
    let latest = valuation.latest_actual_year;
    let missing =
        || DashboardError::InvalidDataset(format!("no financials for fiscal year {latest}"));

    let latest_index = financials
        .years
        .iter()
        .position(|&year| year == latest)
        .ok_or_else(missing)?;
    let at = |context: &str, values: &[f64]| {
        values.get(latest_index).copied().ok_or_else(|| {
            DashboardError::shape(context, financials.years.len(), values.len())
        })
    };
    let revenue = at("Revenue series", financials.revenue.as_slice())?;
    let net_profit = at("Net Profit series", financials.net_profit.as_slice())?;
    let margin = at("net margin series", net_margin)?;
    let growth = revenue_cagr(&financials.series(Metric::Revenue), latest, CAGR_SPAN_YEARS)?;

    Ok(vec![
        MetricCard::new(
            "Enterprise Value",
            format!(
                "{} Cr",
                format_currency_with(valuation.enterprise_value, 2, Grouping::Indian)?
            ),
        )
        .with_subtitle(format!(
            "Market Cap: {} Cr",
            format_currency(valuation.market_cap)?
        )),
        MetricCard::new(
            "Intrinsic Share Price",
            format_currency_with(valuation.intrinsic_share_price, 2, Grouping::Indian)?,
        )
        .with_subtitle(format!(
            "Current: {}",
            format_currency(valuation.current_share_price)?
        )),
        MetricCard::new(
            format!("Revenue (FY{latest})"),
            format!("{} Cr", format_currency(revenue)?),
        )
        .with_subtitle(format!(
            "{CAGR_SPAN_YEARS}-Year CAGR: {}",
            format_percentage(growth, 1)?
        )),
        MetricCard::new(
            format!("Net Profit (FY{latest})"),
            format!("{} Cr", format_currency(net_profit)?),
        )
        .with_subtitle(format!("Margin: {}", format_percentage(margin, 2)?)),
    ])
}

pub fn build_financial_chart(dataset: &Dataset) -> Result<Chart> {
    let financials = &dataset.financials;
    let years = &financials.years;
    let revenue = Trace::new(
        Metric::Revenue.label(),
        TraceKind::Bar,
        years.clone(),
        financials.revenue.clone(),
        TraceColor::Uniform(BLUE.to_string()),
    )?;
    let ebit = Trace::new(
        Metric::Ebit.label(),
        TraceKind::LinesMarkers,
        years.clone(),
        financials.ebit.clone(),
        TraceColor::Uniform(RED.to_string()),
    )?;
    let net_profit = Trace::new(
        Metric::NetProfit.label(),
        TraceKind::LinesMarkers,
        years.clone(),
        financials.net_profit.clone(),
        TraceColor::Uniform(GREEN.to_string()),
    )?;

    Chart::new(
        vec![
            Panel::new(vec![revenue]).titled(Some("Year"), Some(CRORES_AXIS)),
            Panel::new(vec![ebit, net_profit]).titled(Some("Year"), Some(CRORES_AXIS)),
        ],
        400,
        true,
    )
}

pub fn build_margin_chart(
    years: &[i32],
    ebit_margin: &[f64],
    net_margin: &[f64],
    roe: &[f64],
) -> Result<Chart> {
    let line = |name: &str, values: &[f64], color: &str| {
        Trace::new(
            name,
            TraceKind::LinesMarkers,
            years.to_vec(),
            values.to_vec(),
            TraceColor::Uniform(color.to_string()),
        )
    };
    let traces = vec![
        line("EBIT Margin", ebit_margin, BLUE)?,
        line("Net Margin", net_margin, RED)?,
        line(Metric::Roe.label(), roe, GREEN)?,
    ];
    Chart::new(
        vec![Panel::new(traces).titled(None, Some("Percentage (%)"))],
        300,
        true,
    )
}

pub fn build_fcff_chart(years: &[i32], fcff: &[f64]) -> Result<Chart> {
    let colors = fcff
        .iter()
        .map(|&value| (if value < 0.0 { RED } else { GREEN }).to_string())
        .collect();
    let trace = Trace::new(
        Metric::Fcff.label(),
        TraceKind::Bar,
        years.to_vec(),
        fcff.to_vec(),
        TraceColor::PerPoint(colors),
    )?;
    Chart::new(
        vec![Panel::new(vec![trace]).titled(None, Some(CRORES_AXIS))],
        300,
        false,
    )
}

pub fn build_dcf_table(components: &[DcfComponent]) -> Result<Table> {
    let labels = components.iter().map(|c| c.label.clone()).collect();
    let values = components
        .iter()
        .map(|c| format_currency(c.value))
        .collect::<Result<Vec<_>>>()?;
    Table::new(
        "dcf_breakdown",
        vec![
            Column::new("Component", labels),
            Column::new("Value (₹ Cr)", values),
        ],
        false,
    )
}

pub fn build_sensitivity_table(
    rows: &[String],
    cols: &[String],
    grid: &Array2<f64>,
) -> Result<Table> {
    let (grid_rows, grid_cols) = grid.dim();
    if grid_rows != rows.len() {
        return Err(DashboardError::shape("sensitivity row labels", grid_rows, rows.len()));
    }
    if grid_cols != cols.len() {
        return Err(DashboardError::shape(
            "sensitivity column labels",
            grid_cols,
            cols.len(),
        ));
    }

    let mut columns = Vec::with_capacity(cols.len() + 1);
    columns.push(Column::new("Growth Rate", rows.to_vec()));
    for (label, prices) in cols.iter().zip(grid.columns()) {
        let cells = prices
            .iter()
            .map(|&price| format_price(price))
            .collect::<Result<Vec<_>>>()?;
        columns.push(Column::new(label.clone(), cells));
    }
    Table::new("sensitivity", columns, false)
}

pub fn build_ratio_table(ratios: &RatioTable) -> Result<Table> {
    let mut columns = Vec::with_capacity(ratios.snapshots.len() + 1);
    columns.push(Column::new(
        "Ratio",
        ratios.rows.iter().map(|row| row.name.clone()).collect(),
    ));
    for (index, snapshot) in ratios.snapshots.iter().enumerate() {
        let cells = ratios
            .rows
            .iter()
            .map(|row| {
                let value = row.values.get(index).copied().ok_or_else(|| {
                    DashboardError::shape(
                        format!("ratio '{}'", row.name),
                        ratios.snapshots.len(),
                        row.values.len(),
                    )
                })?;
                format_multiple(value)
            })
            .collect::<Result<Vec<_>>>()?;
        columns.push(Column::new(snapshot.clone(), cells));
    }
    Table::new("ratios", columns, false)
}
