use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhaseType {
    Deposit,
    Passive,
    Withdraw,
}

impl PhaseType {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "DEPOSIT" => Some(PhaseType::Deposit),
            "PASSIVE" => Some(PhaseType::Passive),
            "WITHDRAW" => Some(PhaseType::Withdraw),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PhaseType::Deposit => "DEPOSIT",
            PhaseType::Passive => "PASSIVE",
            PhaseType::Withdraw => "WITHDRAW",
        }
    }

    pub fn matches_name(self, phase_name: &str) -> bool {
        phase_name.trim().eq_ignore_ascii_case(self.name())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PhaseRequest {
    pub phase_type: PhaseType,
    pub duration_months: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawYearlySummary {
    pub phase_name: String,
    pub year: i32,
    pub average_capital: Option<f64>,
    pub median_capital: Option<f64>,
    pub min_capital: Option<f64>,
    pub max_capital: Option<f64>,
    pub std_dev_capital: Option<f64>,
    pub cumulative_growth_rate: Option<f64>,
    pub quantile5: Option<f64>,
    pub quantile25: Option<f64>,
    pub quantile75: Option<f64>,
    pub quantile95: Option<f64>,
    pub var: Option<f64>,
    pub cvar: Option<f64>,
    pub negative_capital_percentage: Option<f64>,
}

impl RawYearlySummary {
    // The single normalization point: everything downstream assumes
    // finite floats, an upper-cased phase name and a failure rate
    // inside [0, 100].
    pub fn normalize(&self) -> YearlySummary {
        YearlySummary {
            phase_name: self.phase_name.trim().to_ascii_uppercase(),
            year: self.year,
            average_capital: finite_or_zero(self.average_capital),
            median_capital: finite_or_zero(self.median_capital),
            min_capital: finite_or_zero(self.min_capital),
            max_capital: finite_or_zero(self.max_capital),
            std_dev_capital: finite_or_zero(self.std_dev_capital),
            cumulative_growth_rate: finite_or_zero(self.cumulative_growth_rate),
            quantile5: finite_or_zero(self.quantile5),
            quantile25: finite_or_zero(self.quantile25),
            quantile75: finite_or_zero(self.quantile75),
            quantile95: finite_or_zero(self.quantile95),
            var: finite_or_zero(self.var),
            cvar: finite_or_zero(self.cvar),
            negative_capital_percentage: finite_or_zero(self.negative_capital_percentage)
                .clamp(0.0, 100.0),
        }
    }
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearlySummary {
    pub phase_name: String,
    pub year: i32,
    pub average_capital: f64,
    pub median_capital: f64,
    pub min_capital: f64,
    pub max_capital: f64,
    pub std_dev_capital: f64,
    pub cumulative_growth_rate: f64,
    pub quantile5: f64,
    pub quantile25: f64,
    pub quantile75: f64,
    pub quantile95: f64,
    pub var: f64,
    pub cvar: f64,
    pub negative_capital_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub phase_name: String,
    pub year: i32,
    pub month: u32,
    pub year_month: String,
    pub average_capital: f64,
    pub median_capital: f64,
    pub min_capital: f64,
    pub max_capital: f64,
    pub std_dev_capital: f64,
    pub cumulative_growth_rate: f64,
    pub quantile5: f64,
    pub quantile25: f64,
    pub quantile75: f64,
    pub quantile95: f64,
    pub var: f64,
    pub cvar: f64,
    pub negative_capital_percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseBlock {
    pub phase_type: PhaseType,
    pub label: String,
    pub start_offset_months: u32,
    pub end_offset_months: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseBlockSeries {
    pub block: PhaseBlock,
    pub months: Vec<MonthlySummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub values: YearlySummary,
}

impl Anchor {
    pub fn from_initial_deposit(phase_type: PhaseType, year: i32, deposit: f64) -> Self {
        let deposit = if deposit.is_finite() { deposit } else { 0.0 };
        Anchor {
            values: YearlySummary {
                phase_name: phase_type.name().to_string(),
                year,
                average_capital: deposit,
                median_capital: deposit,
                min_capital: deposit,
                max_capital: deposit,
                std_dev_capital: 0.0,
                cumulative_growth_rate: 0.0,
                quantile5: deposit,
                quantile25: deposit,
                quantile75: deposit,
                quantile95: deposit,
                var: 0.0,
                cvar: 0.0,
                negative_capital_percentage: 0.0,
            },
        }
    }

    pub fn from_monthly(month: &MonthlySummary, phase_type: PhaseType) -> Self {
        Anchor {
            values: YearlySummary {
                phase_name: phase_type.name().to_string(),
                year: month.year,
                average_capital: month.average_capital,
                median_capital: month.median_capital,
                min_capital: month.min_capital,
                max_capital: month.max_capital,
                std_dev_capital: month.std_dev_capital,
                cumulative_growth_rate: month.cumulative_growth_rate,
                quantile5: month.quantile5,
                quantile25: month.quantile25,
                quantile75: month.quantile75,
                quantile95: month.quantile95,
                var: month.var,
                cvar: month.cvar,
                negative_capital_percentage: month.negative_capital_percentage,
            },
        }
    }

    pub fn from_yearly(yearly: &YearlySummary, phase_type: PhaseType) -> Self {
        let mut values = yearly.clone();
        values.phase_name = phase_type.name().to_string();
        Anchor { values }
    }
}
