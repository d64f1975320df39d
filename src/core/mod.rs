mod engine;
mod solver;
mod types;

pub use engine::{MAX_AGE, Projection, compound_savings, project, projection, summarize};
pub use solver::{
    GoalSolveConfig, GoalSolveIteration, GoalSolveResult, GoalType, MAX_ITERATIONS, SolveError,
    solve_goal,
};
pub use types::{EntryKind, Inputs, ProjectionError, ProjectionSummary, YearRecord};
