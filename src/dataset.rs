use crate::error::{DashboardError, Result};
use crate::formatting::format_percentage;
use ndarray::Array2;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub company: CompanyProfile,
    pub parameters: DcfParameters,
    pub valuation: Valuation,
    pub financials: Financials,
    pub dcf_components: Vec<DcfComponent>,
    pub sensitivity: SensitivityGrid,
    pub ratios: RatioTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub tagline: String,
    pub facts: Vec<String>,
    pub credits: Vec<String>,
    pub footer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfParameters {
    // Percent, e.g. `8.55`.
    pub wacc: f64,
    pub terminal_growth: f64,
    pub assumptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub enterprise_value: f64,
    pub market_cap: f64,
    pub intrinsic_share_price: f64,
    pub current_share_price: f64,
    // Last fiscal year with reported figures; later years are projections.
    pub latest_actual_year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Financials {
    pub years: Vec<i32>,
    pub revenue: Vec<f64>,
    pub ebit: Vec<f64>,
    pub net_profit: Vec<f64>,
    pub roe: Vec<f64>,
    pub fcff: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Revenue,
    Ebit,
    NetProfit,
    Roe,
    Fcff,
}

impl Metric {
    pub const ALL: [Self; 5] = [
        Self::Revenue,
        Self::Ebit,
        Self::NetProfit,
        Self::Roe,
        Self::Fcff,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Revenue => "Revenue",
            Self::Ebit => "EBIT",
            Self::NetProfit => "Net Profit",
            Self::Roe => "ROE",
            Self::Fcff => "FCFF",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearSeries {
    pub name: &'static str,
    pub points: Vec<(i32, f64)>,
}

impl YearSeries {
    pub fn years(&self) -> Vec<i32> {
        self.points.iter().map(|&(year, _)| year).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|&(_, value)| value).collect()
    }

    pub fn value_at(&self, year: i32) -> Option<f64> {
        self.points
            .iter()
            .find(|&&(y, _)| y == year)
            .map(|&(_, value)| value)
    }
}

impl Financials {
    pub fn values(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Revenue => &self.revenue,
            Metric::Ebit => &self.ebit,
            Metric::NetProfit => &self.net_profit,
            Metric::Roe => &self.roe,
            Metric::Fcff => &self.fcff,
        }
    }

    pub fn series(&self, metric: Metric) -> YearSeries {
        YearSeries {
            name: metric.label(),
            points: self
                .years
                .iter()
                .copied()
                .zip(self.values(metric).iter().copied())
                .collect(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.years.is_empty() {
            return Err(DashboardError::InvalidDataset(
                "financials contain no years".to_string(),
            ));
        }
        for pair in self.years.windows(2) {
            if pair[0].checked_add(1) != Some(pair[1]) {
                return Err(DashboardError::InvalidDataset(format!(
                    "years must be consecutive, found {} followed by {}",
                    pair[0], pair[1]
                )));
            }
        }
        for metric in Metric::ALL {
            let values = self.values(metric);
            if values.len() != self.years.len() {
                return Err(DashboardError::shape(
                    format!("{} series", metric.label()),
                    self.years.len(),
                    values.len(),
                ));
            }
            if let Some(&value) = values.iter().find(|value| !value.is_finite()) {
                return Err(DashboardError::Format { value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfComponent {
    pub label: String,
    // Crores.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub growth_rates: Vec<f64>,
    pub waccs: Vec<f64>,
    // Row-major, one row per growth rate.
    pub prices: Vec<Vec<f64>>,
}

impl SensitivityGrid {
    pub fn to_array(&self) -> Result<Array2<f64>> {
        let rows = self.growth_rates.len();
        let cols = self.waccs.len();
        if self.prices.len() != rows {
            return Err(DashboardError::shape(
                "sensitivity rows",
                rows,
                self.prices.len(),
            ));
        }
        if let Some(row) = self.prices.iter().find(|row| row.len() != cols) {
            return Err(DashboardError::shape("sensitivity columns", cols, row.len()));
        }
        let flat: Vec<f64> = self.prices.iter().flatten().copied().collect();
        Array2::from_shape_vec((rows, cols), flat)
            .map_err(|_| DashboardError::shape("sensitivity grid", rows * cols, self.prices.len()))
    }

    fn validate(&self) -> Result<()> {
        ensure_ascending("growth rates", &self.growth_rates)?;
        ensure_ascending("WACC values", &self.waccs)?;
        ensure_distinct_labels("growth rates", &self.growth_rates)?;
        ensure_distinct_labels("WACC values", &self.waccs)?;
        let grid = self.to_array()?;
        if let Some(&value) = grid.iter().find(|value| !value.is_finite()) {
            return Err(DashboardError::Format { value });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioTable {
    pub snapshots: Vec<String>,
    pub rows: Vec<RatioRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioRow {
    pub name: String,
    pub values: Vec<f64>,
}

impl RatioTable {
    fn validate(&self) -> Result<()> {
        ensure_unique("ratio snapshots", self.snapshots.iter().map(String::as_str))?;
        ensure_unique("ratio names", self.rows.iter().map(|row| row.name.as_str()))?;
        for row in &self.rows {
            if row.values.len() != self.snapshots.len() {
                return Err(DashboardError::shape(
                    format!("ratio '{}'", row.name),
                    self.snapshots.len(),
                    row.values.len(),
                ));
            }
        }
        Ok(())
    }
}

fn ensure_ascending(label: &str, values: &[f64]) -> Result<()> {
    if values.is_empty() {
        return Err(DashboardError::InvalidDataset(format!("{label} are empty")));
    }
    if values.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(DashboardError::InvalidDataset(format!(
            "{label} must be strictly ascending"
        )));
    }
    Ok(())
}

// Axis labels render at one decimal, so distinct values can still collide.
fn ensure_distinct_labels(label: &str, values: &[f64]) -> Result<()> {
    let labels = values
        .iter()
        .map(|&value| format_percentage(value, 1))
        .collect::<Result<Vec<_>>>()?;
    ensure_unique(label, labels.iter().map(String::as_str))
}

fn ensure_unique<'a>(label: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = FxHashSet::default();
    for name in names {
        if !seen.insert(name) {
            return Err(DashboardError::InvalidDataset(format!(
                "duplicate entry '{name}' in {label}"
            )));
        }
    }
    Ok(())
}

impl Dataset {
    pub fn from_json(bytes: &[u8]) -> anyhow::Result<Self> {
        let dataset: Self = serde_json::from_slice(bytes)?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn validate(&self) -> Result<()> {
        self.financials.validate()?;
        self.sensitivity.validate()?;
        self.ratios.validate()?;
        ensure_unique(
            "DCF components",
            self.dcf_components.iter().map(|c| c.label.as_str()),
        )?;

        let latest = self.valuation.latest_actual_year;
        if !self.financials.years.contains(&latest) {
            return Err(DashboardError::InvalidDataset(format!(
                "latest actual year {latest} is outside the financial series"
            )));
        }
        Ok(())
    }

    pub fn titan() -> Self {
        Self {
            company: CompanyProfile {
                name: "Titan Company".to_string(),
                tagline: "Flagship enterprise of Tata Group".to_string(),
                facts: strings(&[
                    "Founded in 1984",
                    "Bengaluru HQ",
                    "Jewelry, Watches, Eyewear",
                ]),
                credits: strings(&[
                    "Valuation by Yash Pandit (IIT Kanpur) - 231183",
                    "Data Sources: Screener.in, Yahoo Finance",
                ]),
                footer: "Note: This valuation is based on historical data from FY2020-FY2025 and projections through FY2030. All figures in Indian Rupees Crores.".to_string(),
            },
            parameters: DcfParameters {
                wacc: 8.55,
                terminal_growth: 5.0,
                assumptions: strings(&[
                    "Depreciation at 1.1% of revenue",
                    "Tax rate fixed at 25% for forecast years",
                    "Debt reduction: ₹1,000 Cr/year",
                    "Equity Share Capital is assumed constant at ₹89 Cr",
                    "Borrowings are forecasted with a ₹1,000 Cr annual decline for forecast years",
                    "Forecasted CapEx is assumed to be 2% of forecasted revenue",
                ]),
            },
            valuation: Valuation {
                enterprise_value: 283_867.75,
                market_cap: 325_480.0,
                intrinsic_share_price: 3_038.66,
                current_share_price: 3_666.0,
                latest_actual_year: 2025,
            },
            financials: Financials {
                years: (2020..=2030).collect(),
                revenue: vec![
                    21052.0, 21644.0, 28799.0, 40575.0, 51084.0, 60456.0, 75087.0, 90593.0,
                    106086.0, 120462.0, 132508.0,
                ],
                ebit: vec![
                    2463.0, 1725.0, 3344.0, 4882.0, 5292.0, 5694.0, 8935.0, 11233.0, 13685.0,
                    15539.0, 17093.0,
                ],
                net_profit: vec![
                    1493.0, 974.0, 2198.0, 3274.0, 3496.0, 3337.0, 6026.0, 7750.0, 9588.0,
                    10979.0, 12145.0,
                ],
                roe: vec![
                    22.39, 12.99, 23.63, 27.63, 37.22, 28.71, 34.14, 30.51, 27.40, 23.88, 20.90,
                ],
                fcff: vec![
                    506.73, 1083.25, -2798.56, 765.68, 701.92, 3900.56, 1950.87, 4737.71,
                    7360.97, 10695.53, 13040.62,
                ],
            },
            dcf_components: vec![
                component("Terminal Value", 385_728.07),
                component("Enterprise Value", 283_867.75),
                component("Net Debt", 14_248.0),
                component("Equity Value", 269_620.25),
            ],
            sensitivity: SensitivityGrid {
                growth_rates: vec![4.0, 4.5, 5.0, 5.5, 6.0],
                waccs: vec![7.5, 8.0, 8.5, 9.0, 9.5],
                prices: vec![
                    vec![2881.37, 2440.08, 2098.34, 1826.25, 1604.77],
                    vec![3405.42, 2825.89, 2392.93, 2057.62, 1790.64],
                    vec![4139.10, 3340.31, 2771.67, 2346.83, 2017.81],
                    vec![5239.61, 4060.49, 3276.67, 2718.68, 2301.78],
                    vec![7073.79, 5140.76, 3983.67, 3214.48, 2666.88],
                ],
            },
            ratios: RatioTable {
                snapshots: strings(&["2020", "2025", "2030"]),
                rows: vec![
                    ratio("Current Ratio", [0.7, 0.32, 0.29]),
                    ratio("Quick Ratio", [0.16, 0.22, 0.12]),
                    ratio("Debt to Equity", [0.53, 1.12, 0.13]),
                    ratio("Interest Coverage", [14.8, 6.0, 18.99]),
                    ratio("ROCE", [0.24, 0.23, 0.25]),
                    ratio("Asset Turnover", [4.19, 5.03, 6.07]),
                ],
            },
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

fn component(label: &str, value: f64) -> DcfComponent {
    DcfComponent {
        label: label.to_string(),
        value,
    }
}

fn ratio(name: &str, values: [f64; 3]) -> RatioRow {
    RatioRow {
        name: name.to_string(),
        values: values.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_dataset_is_valid() {
        let dataset = Dataset::titan();
        assert!(dataset.validate().is_ok());
        assert_eq!(dataset.financials.years.len(), 11);
        assert_eq!(dataset.sensitivity.to_array().unwrap().dim(), (5, 5));
    }

    #[test]
    fn series_pairs_years_with_values() {
        let dataset = Dataset::titan();
        let revenue = dataset.financials.series(Metric::Revenue);
        assert_eq!(revenue.name, "Revenue");
        assert_eq!(revenue.points.first(), Some(&(2020, 21052.0)));
        assert_eq!(revenue.value_at(2025), Some(60456.0));
        assert_eq!(revenue.value_at(2031), None);
    }

    #[test]
    fn grid_rows_follow_growth_rates() {
        let grid = Dataset::titan().sensitivity.to_array().unwrap();
        assert_eq!(grid[[0, 0]], 2881.37);
        assert_eq!(grid[[4, 0]], 7073.79);
        assert_eq!(grid[[0, 4]], 1604.77);
    }

    #[test]
    fn rejects_overflowing_years() {
        let mut dataset = Dataset::titan();
        dataset.financials.years = vec![i32::MAX; 11];
        assert!(matches!(
            dataset.validate(),
            Err(DashboardError::InvalidDataset(_))
        ));

        let bytes = serde_json::to_vec(&dataset).unwrap();
        assert!(Dataset::from_json(&bytes).is_err());
    }

    #[test]
    fn rejects_axis_values_with_colliding_labels() {
        let mut dataset = Dataset::titan();
        dataset.sensitivity.waccs = vec![7.51, 7.54, 8.0, 8.5, 9.0];
        let err = dataset.validate().unwrap_err();
        assert_eq!(
            err,
            DashboardError::InvalidDataset(
                "duplicate entry '7.5%' in WACC values".to_string()
            )
        );
    }

    #[test]
    fn rejects_year_gap() {
        let mut dataset = Dataset::titan();
        dataset.financials.years[3] = 2024;
        assert!(matches!(
            dataset.validate(),
            Err(DashboardError::InvalidDataset(_))
        ));
    }

    #[test]
    fn rejects_short_series() {
        let mut dataset = Dataset::titan();
        dataset.financials.fcff.pop();
        assert!(matches!(
            dataset.validate(),
            Err(DashboardError::ShapeMismatch {
                expected: 11,
                found: 10,
                ..
            })
        ));
    }

    #[test]
    fn rejects_unsorted_sensitivity_axis() {
        let mut dataset = Dataset::titan();
        dataset.sensitivity.waccs.swap(0, 1);
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn rejects_ragged_grid() {
        let mut dataset = Dataset::titan();
        dataset.sensitivity.prices[2].pop();
        assert!(matches!(
            dataset.sensitivity.to_array(),
            Err(DashboardError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_ratio() {
        let mut dataset = Dataset::titan();
        dataset.ratios.rows[1].name = "Current Ratio".to_string();
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn json_round_trip_keeps_dataset() {
        let dataset = Dataset::titan();
        let json = serde_json::to_vec(&dataset).unwrap();
        assert_eq!(Dataset::from_json(&json).unwrap(), dataset);
    }

    #[test]
    fn json_loader_validates() {
        let mut dataset = Dataset::titan();
        dataset.valuation.latest_actual_year = 2040;
        let json = serde_json::to_vec(&dataset).unwrap();
        assert!(Dataset::from_json(&json).is_err());
    }
}
