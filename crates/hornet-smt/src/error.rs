use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmtError {
    #[error("SMT I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to spawn `{cmd}`: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },
    /// The response stream no longer matches the grammar; the conversation
    /// has desynchronised and the session is unusable.
    #[error("cannot parse SMT solver response: {0}")]
    Parse(String),
    /// The solver answered `(error "…")` where a verdict was expected.
    #[error("SMT solver error: {0}")]
    Solver(String),
    #[error("unsupported configuration: {0}")]
    Unsupported(String),
    /// A κ application reached the wire; the engine must expand κs first.
    #[error("cannot serialise unsolved κ-variable {0}")]
    UnexpectedKVar(String),
}
