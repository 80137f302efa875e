mod calendar;
mod engine;
mod projection;
mod types;

pub use calendar::{add_months_clamped, month_key, parse_iso_date, to_iso_date};
pub use engine::{
    InterpolationOptions, PhaseRange, PhaseSeries, interpolate_monthly, per_phase_series,
    resolve_phase_blocks,
};
pub use projection::{
    BandPoint, BandView, ViewMode, build_band_series, inflation_index, real_monthly_summary,
    real_view_available,
};
pub use types::{
    Anchor, MonthlySummary, PhaseBlock, PhaseBlockSeries, PhaseRequest, PhaseType,
    RawYearlySummary, YearlySummary,
};
