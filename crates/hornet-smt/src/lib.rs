//! SMT-LIB2 integration for the hornet solver.
//!
//! One long-lived solver subprocess per solve: commands are serialised as
//! canonical S-expressions, responses are parsed incrementally, and scoping
//! is push/pop with a bracket combinator. The [`oracle::Oracle`] trait is
//! the narrow validity interface the fixpoint engine consumes.

pub mod error;
pub mod oracle;
pub mod printer;
pub mod response;
pub mod session;

pub use error::SmtError;
pub use oracle::{Oracle, SmtOracle};
pub use response::Response;
pub use session::{SatResult, SessionConfig, SmtSession, SolverKind};
