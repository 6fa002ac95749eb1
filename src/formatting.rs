use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};

pub const RUPEE: &str = "₹";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    #[default]
    Indian,
    Western,
}

fn ensure_finite(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DashboardError::Format { value })
    }
}

pub fn round_to(value: f64, decimals: usize) -> Result<f64> {
    let value = ensure_finite(value)?;
    format!("{value:.decimals$}")
        .parse::<f64>()
        .map_err(|_| DashboardError::Format { value })
}

pub fn derive_margin_series(revenue: &[f64], metric: &[f64]) -> Result<Vec<f64>> {
    derive_named_margin("margin", revenue, metric)
}

pub(crate) fn derive_named_margin(name: &str, revenue: &[f64], metric: &[f64]) -> Result<Vec<f64>> {
    if revenue.len() != metric.len() {
        return Err(DashboardError::shape(
            format!("{name} derivation"),
            revenue.len(),
            metric.len(),
        ));
    }

    revenue
        .iter()
        .zip(metric)
        .enumerate()
        .map(|(index, (&rev, &value))| {
            ensure_finite(rev)?;
            ensure_finite(value)?;
            if rev == 0.0 {
                return Err(DashboardError::DivideByZero {
                    metric: name.to_string(),
                    index,
                });
            }
            round_to(value / rev * 100.0, 2)
        })
        .collect()
}

pub fn cagr(start: f64, end: f64, years: u32) -> Result<f64> {
    let start = ensure_finite(start)?;
    let end = ensure_finite(end)?;
    if start == 0.0 {
        return Err(DashboardError::DivideByZero {
            metric: "cagr".to_string(),
            index: 0,
        });
    }
    if years == 0 || end / start <= 0.0 {
        return Err(DashboardError::InvalidDataset(format!(
            "cannot compute growth from {start} to {end} over {years} years"
        )));
    }
    ensure_finite(((end / start).powf(1.0 / f64::from(years)) - 1.0) * 100.0)
}

pub fn format_currency(value: f64) -> Result<String> {
    format_currency_with(value, 0, Grouping::Indian)
}

pub fn format_currency_with(value: f64, decimals: usize, grouping: Grouping) -> Result<String> {
    rupees(value, decimals, Some(grouping))
}

fn rupees(value: f64, decimals: usize, grouping: Option<Grouping>) -> Result<String> {
    let value = ensure_finite(value)?;
    let rendered = format!("{:.decimals$}", value.abs());
    let (integer, fraction) = rendered
        .split_once('.')
        .map_or((rendered.as_str(), None), |(int, frac)| (int, Some(frac)));
    let negative = value < 0.0 && rendered.bytes().any(|b| matches!(b, b'1'..=b'9'));

    let mut out = String::with_capacity(rendered.len() + 8);
    if negative {
        out.push('-');
    }
    out.push_str(RUPEE);
    match grouping {
        Some(grouping) => out.push_str(&group_digits(integer, grouping)),
        None => out.push_str(integer),
    }
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    Ok(out)
}

pub fn format_price(value: f64) -> Result<String> {
    rupees(value, 0, None)
}

pub fn format_percentage(value: f64, decimals: usize) -> Result<String> {
    let value = ensure_finite(value)?;
    Ok(format!("{value:.decimals$}%"))
}

pub fn format_multiple(value: f64) -> Result<String> {
    let value = ensure_finite(value)?;
    if value > 1.0 {
        Ok(format!("{value:.1}x"))
    } else {
        Ok(format!("{value:.2}x"))
    }
}

pub fn format_value(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

pub fn format_exact(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        "-".to_string()
    }
}

fn group_digits(digits: &str, grouping: Grouping) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let step = match grouping {
        Grouping::Indian => 2,
        Grouping::Western => 3,
    };

    let mut groups = Vec::with_capacity(head.len() / step + 1);
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(step);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{tail}", groups.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margin_series_matches_pointwise_ratio() {
        let margins = derive_margin_series(&[100.0, 200.0], &[10.0, 50.0]).unwrap();
        assert_eq!(margins, vec![10.0, 25.0]);
    }

    #[test]
    fn margin_series_rounds_to_two_places() {
        let revenue = [21052.0, 21644.0, 60456.0];
        let ebit = [2463.0, 1725.0, 5694.0];
        let margins = derive_margin_series(&revenue, &ebit).unwrap();
        assert_eq!(margins, vec![11.7, 7.97, 9.42]);
    }

    #[test]
    fn margin_series_rejects_zero_revenue() {
        let err = derive_margin_series(&[100.0, 0.0], &[10.0, 5.0]).unwrap_err();
        assert_eq!(
            err,
            DashboardError::DivideByZero {
                metric: "margin".to_string(),
                index: 1
            }
        );
    }

    #[test]
    fn margin_series_rejects_length_mismatch() {
        let err = derive_margin_series(&[100.0, 200.0], &[10.0]).unwrap_err();
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
    fn margin_series_rejects_nan() {
        let err = derive_margin_series(&[100.0], &[f64::NAN]).unwrap_err();
        assert!(matches!(err, DashboardError::Format { .. }));
    }

    #[test]
    fn currency_uses_lakh_grouping() {
        assert_eq!(format_currency(283867.75).unwrap(), "₹2,83,868");
        assert_eq!(format_currency(14248.0).unwrap(), "₹14,248");
        assert_eq!(format_currency(385728.07).unwrap(), "₹3,85,728");
        assert_eq!(format_currency(999.0).unwrap(), "₹999");
        assert_eq!(format_currency(12_345_678.0).unwrap(), "₹1,23,45,678");
    }

    #[test]
    fn currency_with_decimals_and_western_grouping() {
        assert_eq!(
            format_currency_with(283867.75, 2, Grouping::Indian).unwrap(),
            "₹2,83,867.75"
        );
        assert_eq!(
            format_currency_with(3038.66, 2, Grouping::Indian).unwrap(),
            "₹3,038.66"
        );
        assert_eq!(
            format_currency_with(283867.75, 0, Grouping::Western).unwrap(),
            "₹283,868"
        );
        assert_eq!(
            format_currency_with(1_234_567.0, 0, Grouping::Western).unwrap(),
            "₹1,234,567"
        );
    }

    #[test]
    fn currency_handles_sign() {
        assert_eq!(format_currency(-2798.56).unwrap(), "-₹2,799");
        assert_eq!(format_currency(-0.4).unwrap(), "₹0");
    }

    #[test]
    fn currency_rejects_non_finite() {
        assert!(matches!(
            format_currency(f64::INFINITY),
            Err(DashboardError::Format { .. })
        ));
        assert!(format_currency(f64::NAN).is_err());
    }

    #[test]
    fn multiple_threshold_is_strict() {
        assert_eq!(format_multiple(1.0).unwrap(), "1.00x");
        assert_eq!(format_multiple(1.01).unwrap(), "1.0x");
        assert_eq!(format_multiple(0.16).unwrap(), "0.16x");
        assert_eq!(format_multiple(14.8).unwrap(), "14.8x");
        assert_eq!(format_multiple(18.99).unwrap(), "19.0x");
        assert!(format_multiple(f64::NAN).is_err());
    }

    #[test]
    fn percentage_and_price() {
        assert_eq!(format_percentage(8.55, 2).unwrap(), "8.55%");
        assert_eq!(format_percentage(5.0, 1).unwrap(), "5.0%");
        assert_eq!(format_price(7073.79).unwrap(), "₹7074");
        assert_eq!(format_price(2881.37).unwrap(), "₹2881");
    }

    #[test]
    fn price_sign_matches_currency() {
        assert_eq!(format_price(-5.2).unwrap(), "-₹5");
        assert_eq!(format_price(-12345.0).unwrap(), "-₹12345");
        assert_eq!(format_price(-0.3).unwrap(), "₹0");
        assert!(format_price(f64::NAN).is_err());
    }

    #[test]
    fn exact_values_keep_every_digit() {
        assert_eq!(format_exact(0.125), "0.125");
        assert_eq!(format_exact(2020.0), "2020");
        assert_eq!(format_exact(-2798.56), "-2798.56");
        assert_eq!(format_exact(f64::NAN), "-");
        assert_eq!(format_value(0.125), "0.12");
    }

    #[test]
    fn cagr_over_five_years() {
        let growth = cagr(21052.0, 60456.0, 5).unwrap();
        assert_eq!(format_percentage(growth, 1).unwrap(), "23.5%");
        assert!(cagr(0.0, 10.0, 5).is_err());
        assert!(cagr(10.0, 20.0, 0).is_err());
    }
}
