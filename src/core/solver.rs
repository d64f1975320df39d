use serde::Serialize;
use thiserror::Error;

use super::engine::{project, summarize};
use super::types::{Inputs, ProjectionError};

/// Upper bound on bisection steps accepted by `solve_goal`.
pub const MAX_ITERATIONS: u32 = 1_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalType {
    RequiredContribution,
    MaxAnnualCosts,
}

#[derive(Debug, Clone, Copy)]
pub struct GoalSolveConfig {
    pub goal_type: GoalType,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub sustainable: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveResult {
    pub goal_type: GoalType,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_value: Option<f64>,
    pub depletion_age: Option<u32>,
    pub final_balance: Option<f64>,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum SolveError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error("search bounds must be finite")]
    NonFiniteBounds,
    #[error("search max must be greater than search min")]
    EmptySearchRange,
    #[error("tolerance must be > 0")]
    InvalidTolerance,
    #[error("max iterations must be > 0")]
    NoIterations,
    #[error("max iterations must be <= {MAX_ITERATIONS}")]
    TooManyIterations,
}

#[derive(Debug, Clone, Copy)]
struct CandidateEval {
    sustainable: bool,
    depletion_age: Option<u32>,
    final_balance: f64,
}

/// Bisection over a single input. A candidate is sustainable when its
/// projection reaches the age ceiling without depleting.
pub fn solve_goal(inputs: &Inputs, config: GoalSolveConfig) -> Result<GoalSolveResult, SolveError> {
    validate_config(config)?;

    // Contributions make a plan easier as they grow, costs make it harder.
    let (easy_bound, hard_bound) = match config.goal_type {
        GoalType::RequiredContribution => (config.search_max, config.search_min),
        GoalType::MaxAnnualCosts => (config.search_min, config.search_max),
    };

    let mut iterations = Vec::with_capacity(config.max_iterations.min(64) as usize);
    let hard_eval = evaluate_candidate(inputs, config.goal_type, hard_bound)?;
    let easy_eval = evaluate_candidate(inputs, config.goal_type, easy_bound)?;

    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    if hard_eval.sustainable {
        solved_value = Some(hard_bound);
        converged = true;
        feasible = true;
        message = match config.goal_type {
            GoalType::RequiredContribution => {
                "Already sustainable at the lower contribution bound.".to_string()
            }
            GoalType::MaxAnnualCosts => {
                "Upper cost bound is still sustainable; increase search max for a higher target."
                    .to_string()
            }
        };
    } else if !easy_eval.sustainable {
        feasible = false;
        message = match config.goal_type {
            GoalType::RequiredContribution => {
                "No sustainable contribution found within the search bounds.".to_string()
            }
            GoalType::MaxAnnualCosts => {
                "No sustainable annual costs found within the search bounds.".to_string()
            }
        };
    } else {
        // `good` always holds a sustainable value, `bad` an unsustainable one.
        let mut good = easy_bound;
        let mut bad = hard_bound;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (good + bad) * 0.5;
            let eval = evaluate_candidate(inputs, config.goal_type, mid)?;
            iterations.push(GoalSolveIteration {
                iteration: it,
                lower_bound: good.min(bad),
                upper_bound: good.max(bad),
                candidate_value: mid,
                sustainable: eval.sustainable,
            });

            if eval.sustainable {
                good = mid;
            } else {
                bad = mid;
            }

            if (good - bad).abs() <= config.tolerance {
                converged = true;
                break;
            }
        }
        solved_value = Some(good);
        feasible = true;
        message = if converged {
            match config.goal_type {
                GoalType::RequiredContribution => "Solved required contribution.".to_string(),
                GoalType::MaxAnnualCosts => "Solved maximum sustainable annual costs.".to_string(),
            }
        } else {
            "Reached max iterations before tolerance was met; returning best estimate."
                .to_string()
        };
    }

    let mut depletion_age = None;
    let mut final_balance = None;
    if let Some(value) = solved_value {
        let eval = evaluate_candidate(inputs, config.goal_type, value)?;
        depletion_age = eval.depletion_age;
        final_balance = Some(eval.final_balance);
    }

    Ok(GoalSolveResult {
        goal_type: config.goal_type,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_value,
        depletion_age,
        final_balance,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn evaluate_candidate(
    base_inputs: &Inputs,
    goal_type: GoalType,
    candidate_value: f64,
) -> Result<CandidateEval, ProjectionError> {
    let mut inputs = base_inputs.clone();
    match goal_type {
        GoalType::RequiredContribution => inputs.annual_contribution = candidate_value,
        GoalType::MaxAnnualCosts => inputs.expected_annual_costs = candidate_value,
    }

    let records = project(&inputs)?;
    let summary = summarize(&inputs, &records);
    Ok(CandidateEval {
        sustainable: summary.depletion_age.is_none(),
        depletion_age: summary.depletion_age,
        final_balance: summary.final_balance,
    })
}

fn validate_config(config: GoalSolveConfig) -> Result<(), SolveError> {
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err(SolveError::NonFiniteBounds);
    }
    if config.search_max <= config.search_min {
        return Err(SolveError::EmptySearchRange);
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(SolveError::InvalidTolerance);
    }
    if config.max_iterations == 0 {
        return Err(SolveError::NoIterations);
    }
    if config.max_iterations > MAX_ITERATIONS {
        return Err(SolveError::TooManyIterations);
    }
    Ok(())
}
