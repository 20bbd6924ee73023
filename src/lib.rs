//! Propagation-based local-search decision procedure for quantifier-free
//! fixed-width bit-vector formulas.
//!
//! The crate provides a hash-consed expression DAG with inversion folded
//! into tagged edges, a memoized model layer with cone-of-influence updates,
//! and a stochastic propagation engine that repairs violated assertions by
//! walking from a root down to a variable through per-operator inverse- and
//! consistent-value functions. The engine is sound but incomplete: it
//! answers `Sat` with a model, `Unsat` when the simplifier derives a
//! contradiction, and `Unknown` when the move budget or the termination hook
//! gives out.

pub mod solver;

pub use solver::bv::BitVector;
pub use solver::node::{Edge, NodeId, NodeKind};
pub use solver::sorts::{Sort, SortId};
pub use solver::{Engine, OptionKey, PathSelection, PropStats, SatResult, Solver, SolverConfig};
