//! # kt-engines
//!
//! Search engines and regression helpers used by the knobtune worker.
//!
//! Every engine implements [`SearchEngine`] and minimizes an [`Objective`]
//! over a list of [`kt_types::Dimension`]s. Engines never talk to the
//! controller directly; the worker supplies an objective that does.

mod abtest;
mod bayesian;
mod lhs;
mod objective;
mod random;
mod regression;
mod sampling;
mod tpe;

#[cfg(test)]
mod testing;

pub use abtest::{split_values, AbTest};
pub use bayesian::BayesianSearch;
pub use lhs::LatinHypercube;
pub use objective::{EngineOutcome, Objective, SearchEngine, SearchProblem, Seeds};
pub use random::RandomSearch;
pub use regression::{Lasso, StandardScaler};
pub use sampling::{linspace, rng_from_seed, sample_point};
pub use tpe::TreeParzen;
