use chrono::NaiveDate;
use serde::Serialize;

use super::types::MonthlySummary;

// The underlying simulation compounds inflation once per completed
// year, so the index must not advance inside a year: it steps only at
// 12-month boundaries since the simulation start.
pub fn inflation_index(
    year: i32,
    month: u32,
    start_year: i32,
    start_month: u32,
    factor: f64,
) -> f64 {
    if !factor.is_finite() || factor <= 0.0 {
        return 1.0;
    }
    if !(1..=12).contains(&month) || !(1..=12).contains(&start_month) {
        return 1.0;
    }

    let months_since =
        (i64::from(year) - i64::from(start_year)) * 12 + i64::from(month) - i64::from(start_month);
    let completed_years = months_since.max(0) / 12;
    factor.powi(completed_years as i32)
}

pub fn real_view_available(start_date: Option<NaiveDate>, factor: Option<f64>) -> bool {
    let Some(factor) = factor else {
        return false;
    };
    start_date.is_some() && factor.is_finite() && factor > 0.0 && (factor - 1.0).abs() > 1e-12
}

// Monetary fields deflated back to start-date currency; labels, the
// growth rate and the failure rate stay untouched.
pub fn real_monthly_summary(
    nominal: &MonthlySummary,
    start_year: i32,
    start_month: u32,
    factor: f64,
) -> MonthlySummary {
    let index = inflation_index(nominal.year, nominal.month, start_year, start_month, factor);
    MonthlySummary {
        phase_name: nominal.phase_name.clone(),
        year: nominal.year,
        month: nominal.month,
        year_month: nominal.year_month.clone(),
        average_capital: nominal.average_capital / index,
        median_capital: nominal.median_capital / index,
        min_capital: nominal.min_capital / index,
        max_capital: nominal.max_capital / index,
        std_dev_capital: nominal.std_dev_capital / index,
        cumulative_growth_rate: nominal.cumulative_growth_rate,
        quantile5: nominal.quantile5 / index,
        quantile25: nominal.quantile25 / index,
        quantile75: nominal.quantile75 / index,
        quantile95: nominal.quantile95 / index,
        var: nominal.var / index,
        cvar: nominal.cvar / index,
        negative_capital_percentage: nominal.negative_capital_percentage,
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Nominal,
    Real,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BandView {
    Nominal,
    Real {
        start_year: i32,
        start_month: u32,
        factor: f64,
    },
}

impl BandView {
    pub fn mode(self) -> ViewMode {
        match self {
            BandView::Nominal => ViewMode::Nominal,
            BandView::Real { .. } => ViewMode::Real,
        }
    }
}

// Stacked-area deltas: the renderer draws lower5, then band5_95 on
// top of it, and likewise for the inner band. Each point carries its
// view mode so a stateless tooltip can recover it from the data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandPoint {
    pub year_month: String,
    pub mode: ViewMode,
    pub lower5: f64,
    #[serde(rename = "band5_95")]
    pub band5_95: f64,
    pub lower25: f64,
    #[serde(rename = "band25_75")]
    pub band25_75: f64,
    pub median: f64,
}

pub fn build_band_series(months: &[MonthlySummary], view: BandView) -> Vec<BandPoint> {
    months.iter().map(|month| band_point(month, view)).collect()
}

fn band_point(month: &MonthlySummary, view: BandView) -> BandPoint {
    let values = match view {
        BandView::Nominal => month.clone(),
        BandView::Real {
            start_year,
            start_month,
            factor,
        } => real_monthly_summary(month, start_year, start_month, factor),
    };

    BandPoint {
        year_month: values.year_month.clone(),
        mode: view.mode(),
        lower5: values.quantile5,
        band5_95: values.quantile95 - values.quantile5,
        lower25: values.quantile25,
        band25_75: values.quantile75 - values.quantile25,
        median: values.median_capital,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calendar::month_key;
    use proptest::prelude::{prop_assert, proptest};

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn monthly(year: i32, month: u32, value: f64) -> MonthlySummary {
        MonthlySummary {
            phase_name: "PASSIVE".to_string(),
            year,
            month,
            year_month: month_key(year, month),
            average_capital: value,
            median_capital: value,
            min_capital: value,
            max_capital: value,
            std_dev_capital: 10.0,
            cumulative_growth_rate: 0.05,
            quantile5: value * 0.5,
            quantile25: value * 0.8,
            quantile75: value * 1.2,
            quantile95: value * 1.5,
            var: value * 0.1,
            cvar: value * 0.15,
            negative_capital_percentage: 3.0,
        }
    }

    #[test]
    fn index_is_one_for_invalid_factors() {
        assert_approx(inflation_index(2030, 6, 2025, 1, f64::NAN), 1.0);
        assert_approx(inflation_index(2030, 6, 2025, 1, f64::INFINITY), 1.0);
        assert_approx(inflation_index(2030, 6, 2025, 1, 0.0), 1.0);
        assert_approx(inflation_index(2030, 6, 2025, 1, -1.02), 1.0);
    }

    #[test]
    fn index_is_one_for_invalid_months() {
        assert_approx(inflation_index(2030, 0, 2025, 1, 1.02), 1.0);
        assert_approx(inflation_index(2030, 13, 2025, 1, 1.02), 1.0);
        assert_approx(inflation_index(2030, 6, 2025, 0, 1.02), 1.0);
    }

    #[test]
    fn index_is_one_before_the_start() {
        assert_approx(inflation_index(2024, 12, 2025, 1, 1.05), 1.0);
        assert_approx(inflation_index(2020, 1, 2025, 1, 1.05), 1.0);
    }

    #[test]
    fn index_steps_only_at_twelve_month_boundaries() {
        let factor: f64 = 1.05;
        for offset in 0_i64..48 {
            let year = 2025 + ((offset + 6) / 12) as i32;
            let month = (((offset + 6) % 12) + 1) as u32;
            let expected = factor.powi((offset / 12) as i32);
            assert_approx(
                inflation_index(year, month, 2025, 7, factor),
                expected,
            );
        }
    }

    #[test]
    fn index_compounds_per_completed_year() {
        assert_approx(inflation_index(2025, 1, 2025, 1, 1.02), 1.0);
        assert_approx(inflation_index(2025, 12, 2025, 1, 1.02), 1.0);
        assert_approx(inflation_index(2026, 1, 2025, 1, 1.02), 1.02);
        assert_approx(inflation_index(2027, 1, 2025, 1, 1.02), 1.02 * 1.02);
    }

    #[test]
    fn real_view_requires_a_usable_start_and_factor() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1);
        assert!(real_view_available(start, Some(1.02)));
        assert!(real_view_available(start, Some(0.98)));
        assert!(!real_view_available(None, Some(1.02)));
        assert!(!real_view_available(start, None));
        assert!(!real_view_available(start, Some(1.0)));
        assert!(!real_view_available(start, Some(1.0 + 1e-13)));
        assert!(!real_view_available(start, Some(0.0)));
        assert!(!real_view_available(start, Some(-1.02)));
        assert!(!real_view_available(start, Some(f64::NAN)));
    }

    #[test]
    fn real_summary_deflates_monetary_fields_only() {
        let nominal = monthly(2027, 3, 1_000.0);
        let real = real_monthly_summary(&nominal, 2025, 1, 1.10);

        let index = 1.10 * 1.10;
        assert_approx(real.average_capital, 1_000.0 / index);
        assert_approx(real.median_capital, 1_000.0 / index);
        assert_approx(real.quantile5, 500.0 / index);
        assert_approx(real.quantile95, 1_500.0 / index);
        assert_approx(real.std_dev_capital, 10.0 / index);
        assert_approx(real.var, 100.0 / index);
        assert_approx(real.cvar, 150.0 / index);
        assert_approx(real.cumulative_growth_rate, 0.05);
        assert_approx(real.negative_capital_percentage, 3.0);
        assert_eq!(real.year_month, "2027-03");
    }

    #[test]
    fn nominal_bands_stack_the_quantile_deltas() {
        let points = build_band_series(&[monthly(2025, 6, 1_000.0)], BandView::Nominal);
        assert_eq!(points.len(), 1);

        let point = &points[0];
        assert_eq!(point.mode, ViewMode::Nominal);
        assert_eq!(point.year_month, "2025-06");
        assert_approx(point.lower5, 500.0);
        assert_approx(point.band5_95, 1_000.0);
        assert_approx(point.lower25, 800.0);
        assert_approx(point.band25_75, 400.0);
        assert_approx(point.median, 1_000.0);
    }

    #[test]
    fn real_bands_divide_by_the_month_index() {
        let view = BandView::Real {
            start_year: 2025,
            start_month: 1,
            factor: 1.10,
        };
        let points = build_band_series(&[monthly(2026, 6, 1_000.0)], view);

        let point = &points[0];
        assert_eq!(point.mode, ViewMode::Real);
        assert_approx(point.lower5, 500.0 / 1.10);
        assert_approx(point.band5_95, 1_000.0 / 1.10);
        assert_approx(point.lower25, 800.0 / 1.10);
        assert_approx(point.band25_75, 400.0 / 1.10);
        assert_approx(point.median, 1_000.0 / 1.10);
    }

    #[test]
    fn band_mode_serializes_lowercase() {
        let points = build_band_series(&[monthly(2025, 6, 1_000.0)], BandView::Nominal);
        let json = serde_json::to_string(&points[0]).expect("serializable");
        assert!(json.contains("\"mode\":\"nominal\""));
        assert!(json.contains("\"band5_95\""));
        assert!(json.contains("\"band25_75\""));
        assert!(json.contains("\"yearMonth\":\"2025-06\""));
    }

    proptest! {
        #[test]
        fn prop_index_is_constant_inside_a_completed_year(
            completed_years in 0i64..50,
            month_in_year in 0i64..12,
            factor in 1.0001..1.25f64,
        ) {
            let offset = completed_years * 12 + month_in_year;
            let year = 2025 + (offset / 12) as i32;
            let month = ((offset % 12) + 1) as u32;

            let index = inflation_index(year, month, 2025, 1, factor);
            let bucket_start = inflation_index(2025 + completed_years as i32, 1, 2025, 1, factor);
            prop_assert!((index - bucket_start).abs() <= 1e-9 * bucket_start);
        }

        #[test]
        fn prop_index_never_decreases_over_time(
            offset in 0i64..240,
            factor in 1.0001..1.25f64,
        ) {
            let year = 2025 + (offset / 12) as i32;
            let month = ((offset % 12) + 1) as u32;
            let next_year = 2025 + ((offset + 1) / 12) as i32;
            let next_month = (((offset + 1) % 12) + 1) as u32;

            let here = inflation_index(year, month, 2025, 1, factor);
            let next = inflation_index(next_year, next_month, 2025, 1, factor);
            prop_assert!(next + 1e-12 >= here);
        }
    }
}
