use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use super::calendar::{add_months_clamped, month_key, parse_iso_date};
use super::types::{
    Anchor, MonthlySummary, PhaseBlock, PhaseBlockSeries, PhaseRequest, PhaseType, YearlySummary,
};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PhaseRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct InterpolationOptions {
    pub start_month: u32,
    pub range: Option<PhaseRange>,
    pub anchor: Option<Anchor>,
}

impl Default for InterpolationOptions {
    fn default() -> Self {
        Self {
            start_month: 1,
            range: None,
            anchor: None,
        }
    }
}

pub fn interpolate_monthly(
    rows: &[YearlySummary],
    options: &InterpolationOptions,
) -> Vec<MonthlySummary> {
    let mut sorted = rows.to_vec();
    sorted.sort_by_key(|row| row.year);
    // The last row in input order wins for a duplicated year.
    sorted.reverse();
    sorted.dedup_by_key(|row| row.year);
    sorted.reverse();

    if sorted.is_empty() {
        return Vec::new();
    }

    let start_month = options.start_month.clamp(1, 12);
    let index_by_year: HashMap<i32, usize> = sorted
        .iter()
        .enumerate()
        .map(|(idx, row)| (row.year, idx))
        .collect();

    let mut out = Vec::new();
    for (idx, row) in sorted.iter().enumerate() {
        let first = idx == 0;
        // Each year's months run from the year's entry value toward the
        // year's own row: the anchor for the first year, the previous
        // year's row afterwards, or the row itself when neither exists
        // (the flat no-next-point boundary artifact).
        let entry = if first {
            match &options.anchor {
                Some(anchor) => &anchor.values,
                None => row,
            }
        } else {
            match index_by_year.get(&(row.year - 1)) {
                Some(&prev) => &sorted[prev],
                None => row,
            }
        };

        let first_emitted_month = if first { start_month } else { 1 };
        for month in first_emitted_month..=12 {
            if let Some(range) = &options.range {
                let ordinal = month_ordinal(row.year, month);
                if ordinal < month_ordinal(range.start.year(), range.start.month()) {
                    continue;
                }
                // The end month itself is emitted: the next block
                // anchors on it.
                if ordinal > month_ordinal(range.end.year(), range.end.month()) {
                    return out;
                }
            }
            let t = f64::from(month - first_emitted_month) / 12.0;
            out.push(interpolated_month(entry, row, month, t));
        }
    }
    out
}

fn month_ordinal(year: i32, month: u32) -> i64 {
    i64::from(year) * 12 + i64::from(month) - 1
}

fn interpolated_month(
    from: &YearlySummary,
    to: &YearlySummary,
    month: u32,
    t: f64,
) -> MonthlySummary {
    let lerp = |a: f64, b: f64| a + (b - a) * t;
    let mut summary = MonthlySummary {
        phase_name: to.phase_name.clone(),
        year: to.year,
        month,
        year_month: month_key(to.year, month),
        average_capital: lerp(from.average_capital, to.average_capital),
        median_capital: lerp(from.median_capital, to.median_capital),
        min_capital: lerp(from.min_capital, to.min_capital),
        max_capital: lerp(from.max_capital, to.max_capital),
        std_dev_capital: lerp(from.std_dev_capital, to.std_dev_capital),
        cumulative_growth_rate: lerp(from.cumulative_growth_rate, to.cumulative_growth_rate),
        quantile5: lerp(from.quantile5, to.quantile5),
        quantile25: lerp(from.quantile25, to.quantile25),
        quantile75: lerp(from.quantile75, to.quantile75),
        quantile95: lerp(from.quantile95, to.quantile95),
        var: lerp(from.var, to.var),
        cvar: lerp(from.cvar, to.cvar),
        negative_capital_percentage: lerp(
            from.negative_capital_percentage,
            to.negative_capital_percentage,
        ),
    };
    apply_failure_consistency(&mut summary);
    summary
}

fn apply_failure_consistency(summary: &mut MonthlySummary) {
    let failure = summary.negative_capital_percentage.clamp(0.0, 100.0);
    summary.negative_capital_percentage = failure;
    summary.quantile5 = floored_percentile(summary.quantile5, 5.0, failure);
    summary.quantile25 = floored_percentile(summary.quantile25, 25.0, failure);
    summary.median_capital = floored_percentile(summary.median_capital, 50.0, failure);
    summary.quantile75 = floored_percentile(summary.quantile75, 75.0, failure);
    summary.quantile95 = floored_percentile(summary.quantile95, 95.0, failure);
}

// A percentile rank overtaken by the failure fraction is zero by
// definition. Below the rank the value blends linearly toward zero
// across [rank/2, rank) so the crossing arrives as a trend, not a
// cliff at the crossing month.
fn floored_percentile(value: f64, rank: f64, failure: f64) -> f64 {
    if failure >= rank {
        return 0.0;
    }
    let blend_start = rank * 0.5;
    if failure <= blend_start {
        return value;
    }
    value * ((rank - failure) / (rank - blend_start))
}

#[derive(Debug, Clone, Default)]
struct BlockContinuity {
    last_yearly: Option<YearlySummary>,
    monthly_index: HashMap<String, MonthlySummary>,
}

#[derive(Debug, Clone)]
struct MergedBlock {
    phase_type: PhaseType,
    duration_months: u32,
    first_phase: usize,
    last_phase: usize,
}

fn merge_phases(phases: &[PhaseRequest]) -> Vec<MergedBlock> {
    let mut merged: Vec<MergedBlock> = Vec::new();
    for (idx, phase) in phases.iter().enumerate() {
        match merged.last_mut() {
            Some(block) if block.phase_type == phase.phase_type => {
                block.duration_months += phase.duration_months;
                block.last_phase = idx + 1;
            }
            _ => merged.push(MergedBlock {
                phase_type: phase.phase_type,
                duration_months: phase.duration_months,
                first_phase: idx + 1,
                last_phase: idx + 1,
            }),
        }
    }
    merged
}

fn block_label(block: &MergedBlock) -> String {
    if block.first_phase == block.last_phase {
        format!("Phase {} ({})", block.first_phase, block.phase_type.name())
    } else {
        format!(
            "Phases {}-{} ({})",
            block.first_phase,
            block.last_phase,
            block.phase_type.name()
        )
    }
}

pub fn resolve_phase_blocks(
    phases: &[PhaseRequest],
    start_date_iso: &str,
    initial_deposit: f64,
    summaries: &[YearlySummary],
) -> Vec<PhaseBlockSeries> {
    let Some(simulation_start) = parse_iso_date(start_date_iso) else {
        // Fail soft: callers fall back to plain per-phase grouping.
        return Vec::new();
    };

    let merged = merge_phases(phases);
    let mut blocks = Vec::with_capacity(merged.len());
    let mut continuity = BlockContinuity::default();
    let mut offset = 0_u32;

    for (idx, block) in merged.iter().enumerate() {
        let (series, next) = resolve_block(
            block,
            idx == 0,
            simulation_start,
            offset,
            initial_deposit,
            summaries,
            &continuity,
        );
        offset = series.block.end_offset_months;
        continuity = next;
        blocks.push(series);
    }

    blocks
}

fn resolve_block(
    merged: &MergedBlock,
    is_first: bool,
    simulation_start: NaiveDate,
    start_offset: u32,
    initial_deposit: f64,
    summaries: &[YearlySummary],
    continuity: &BlockContinuity,
) -> (PhaseBlockSeries, BlockContinuity) {
    let end_offset = start_offset + merged.duration_months;
    let start_date = add_months_clamped(simulation_start, start_offset as i32);
    let end_date = add_months_clamped(simulation_start, end_offset as i32);

    let anchor = if is_first && merged.phase_type == PhaseType::Deposit {
        Some(Anchor::from_initial_deposit(
            merged.phase_type,
            start_date.year(),
            initial_deposit,
        ))
    } else {
        let boundary_key = month_key(start_date.year(), start_date.month());
        continuity
            .monthly_index
            .get(&boundary_key)
            .map(|month| Anchor::from_monthly(month, merged.phase_type))
            .or_else(|| {
                continuity
                    .last_yearly
                    .as_ref()
                    .map(|yearly| Anchor::from_yearly(yearly, merged.phase_type))
            })
    };

    // The year+1 bound admits the January-of-next-year row needed for
    // continuity through the block's final boundary month.
    let rows: Vec<YearlySummary> = summaries
        .iter()
        .filter(|row| merged.phase_type.matches_name(&row.phase_name))
        .filter(|row| row.year >= start_date.year() && row.year <= end_date.year() + 1)
        .cloned()
        .collect();

    let options = InterpolationOptions {
        start_month: start_date.month(),
        range: Some(PhaseRange {
            start: start_date,
            end: end_date,
        }),
        anchor,
    };
    let months = interpolate_monthly(&rows, &options);

    let monthly_index = months
        .iter()
        .map(|month| (month.year_month.clone(), month.clone()))
        .collect();
    let last_yearly = rows
        .iter()
        .max_by_key(|row| row.year)
        .cloned()
        .or_else(|| continuity.last_yearly.clone());

    let series = PhaseBlockSeries {
        block: PhaseBlock {
            phase_type: merged.phase_type,
            label: block_label(merged),
            start_offset_months: start_offset,
            end_offset_months: end_offset,
            start_date,
            end_date,
        },
        months,
    };

    (
        series,
        BlockContinuity {
            last_yearly,
            monthly_index,
        },
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSeries {
    pub phase_name: String,
    pub months: Vec<MonthlySummary>,
}

// The degraded grouping used when the start date is unusable: one
// series per phase name in first-seen order, no cross-block
// continuity.
pub fn per_phase_series(summaries: &[YearlySummary]) -> Vec<PhaseSeries> {
    let mut order: Vec<String> = Vec::new();
    for row in summaries {
        if !order.iter().any(|name| name == &row.phase_name) {
            order.push(row.phase_name.clone());
        }
    }

    order
        .into_iter()
        .map(|phase_name| {
            let rows: Vec<YearlySummary> = summaries
                .iter()
                .filter(|row| row.phase_name == phase_name)
                .cloned()
                .collect();
            let months = interpolate_monthly(&rows, &InterpolationOptions::default());
            PhaseSeries { phase_name, months }
        })
        .collect()
}
