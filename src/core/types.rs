use serde::Serialize;
use thiserror::Error;

/// Parameters of a single projection. Rates are annualised percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct Inputs {
    pub current_savings: f64,
    pub annual_contribution: f64,
    pub current_age: u32,
    pub retirement_age: u32,
    pub expected_return_percent: f64,
    pub expected_inflation_percent: f64,
    pub expected_annual_costs: f64,
}

impl Inputs {
    pub fn return_rate(&self) -> f64 {
        self.expected_return_percent / 100.0
    }

    pub fn inflation_rate(&self) -> f64 {
        self.expected_inflation_percent / 100.0
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Contribution,
    Deduction,
}

/// One simulated year. `delta` is positive for contributions and negative
/// for post-retirement deductions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub age: u32,
    pub start_balance: f64,
    pub delta: f64,
    pub growth: f64,
    pub end_balance: f64,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub retirement_age: u32,
    pub savings_at_retirement: Option<f64>,
    pub depletion_age: Option<u32>,
    pub final_balance: f64,
    pub years: usize,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("Retirement age must be greater than current age.")]
    InvalidInput { current_age: u32, retirement_age: u32 },
}
