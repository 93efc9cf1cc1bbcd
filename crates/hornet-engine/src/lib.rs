//! Hornet fixpoint engine.
//!
//! A worklist-driven predicate-abstraction loop over the constraint
//! dependency graph: each step recomputes a constraint's antecedent under
//! the current solution, filters its κ qualifier candidates through the
//! validity oracle, and shrinks the solution until nothing changes. The
//! result builder then classifies target constraints and materialises the
//! per-κ conjunctions.

pub mod fixpoint;
pub mod lhs;
pub mod refine;
pub mod result;
pub mod rhs;
pub mod solution;
pub mod worklist;

pub use fixpoint::{solve_with_oracle, solve_with_session, FixConfig, FixError, FixStats};
pub use result::{FixResult, FixStatus};
pub use solution::{QualifierBind, Solution};
pub use worklist::Worklist;
