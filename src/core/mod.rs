mod engine;
mod solver;
mod types;

pub use engine::project;
pub use solver::{SolveConfig, SolveGoal, SolveIteration, SolveResult, solve_goal};
pub use types::{Assumptions, MonthlyRecord, PackagePrices, Projection};
