//! Hornet intermediate representation.
//!
//! This crate defines the first-order expression language the solver works
//! over (sorts, symbols, expressions with κ-variable holes, substitutions,
//! qualifier templates), the simplified Horn constraints consumed from the
//! front-end, and the constraint dependency graph with SCC ranks.

pub mod constraints;
pub mod deps;
pub mod expr;
pub mod qualifiers;
pub mod sorts;
pub mod subst;
pub mod symbols;

pub use constraints::{BindEnv, BindId, Binding, KVarDecl, Query, SimpC};
pub use deps::SolverInfo;
pub use expr::{Expr, KVar};
pub use qualifiers::{BoundQual, Qualifier};
pub use sorts::Sort;
pub use subst::Subst;
pub use symbols::Symbol;
