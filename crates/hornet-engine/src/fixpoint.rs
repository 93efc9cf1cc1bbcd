use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

use hornet_ir::constraints::IrError;
use hornet_ir::{Sort, SolverInfo};
use hornet_smt::{Oracle, SmtError, SmtOracle, SmtSession};

use crate::refine::refine_c;
use crate::result::{build_result, FixResult};
use crate::solution::Solution;
use crate::worklist::Worklist;

#[derive(Debug, Error)]
pub enum FixError {
    #[error("SMT error: {0}")]
    Smt(#[from] SmtError),
    #[error("ill-formed query: {0}")]
    Ir(#[from] IrError),
    #[error(
        "iteration budget exhausted after {ticks} ticks (budget {budget}); \
         worklist scheduling did not converge"
    )]
    IterationBudget { ticks: usize, budget: usize },
    #[error("gradual solving is delegated to an external engine")]
    Gradual,
    #[error("constraint {0} reached the classifier but is not a target")]
    MalformedConstraint(usize),
}

/// Options consumed by the fixpoint core.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixConfig {
    /// Minimise each κ's conjunction after solving.
    pub minimal_sol: bool,
    /// Attach worklist/constraint statistics to the result.
    pub solver_stats: bool,
    /// Delegate the whole solve to an external gradual engine.
    pub gradual: bool,
    /// The caller ran the external κ-elimination pre-processor on the
    /// query; absent it, the constraint graph is used as-is.
    pub use_elim: bool,
}

/// Counters from one fixpoint run.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixStats {
    /// SCC sweeps: bumped each time a new SCC is entered.
    pub iterations: usize,
    pub pops: usize,
    pub pushes: usize,
    pub refines: usize,
    pub elapsed_ms: u128,
}

/// Run the worklist fixpoint against an already-prepared oracle.
///
/// Constraints are visited in SCC rank order; whenever a refinement shrinks
/// a κ's bind, the readers of that κ are requeued. Total ticks are capped
/// at a multiple of the rank count as a scheduling-bug backstop; absent the
/// cap, termination already follows from bind monotonicity.
pub fn solve_with_oracle<O: Oracle>(
    info: &SolverInfo,
    cfg: &FixConfig,
    oracle: &mut O,
) -> Result<FixResult, FixError> {
    if cfg.gradual {
        return Err(FixError::Gradual);
    }
    if cfg.use_elim {
        debug!(target: "hornet::fix", "κ-elimination assumed done by the caller");
    }

    let started = Instant::now();
    let mut sol = Solution::bottom(info);
    let mut w = Worklist::init(info);
    let mut stats = FixStats::default();
    let budget = 64 * w.num_ranks().max(1) * info.constraints().len().max(1);

    let mut ticks = 0usize;
    while let Some((pos, new_scc, rank)) = w.pop() {
        ticks += 1;
        if ticks > budget {
            return Err(FixError::IterationBudget { ticks, budget });
        }
        if new_scc {
            stats.iterations += 1;
        }
        stats.pops += 1;

        let c = info.constraint(pos);
        debug!(target: "hornet::fix", cid = c.id, rank, "popped");
        let changed = refine_c(stats.iterations, &mut sol, c, info, oracle)?;
        stats.refines += 1;
        if changed {
            for k in c.writes() {
                for &reader in info.readers_of(k) {
                    w.push(reader);
                    stats.pushes += 1;
                }
            }
        }
    }

    stats.elapsed_ms = started.elapsed().as_millis();
    info!(
        target: "hornet::fix",
        iterations = stats.iterations,
        pops = stats.pops,
        pushes = stats.pushes,
        elapsed_ms = stats.elapsed_ms,
        "fixpoint reached"
    );
    build_result(info, cfg, &sol, &w, oracle, stats)
}

/// Solve against a live SMT session: declare every binding symbol once,
/// then run the fixpoint through the session-backed oracle. The session
/// outlives the loop; the caller closes it after consuming the result.
pub fn solve_with_session(
    info: &SolverInfo,
    cfg: &FixConfig,
    session: &mut SmtSession,
) -> Result<FixResult, FixError> {
    declare_all(info, session)?;
    let mut oracle = SmtOracle::new(session);
    solve_with_oracle(info, cfg, &mut oracle)
}

/// One-shot declaration pass over the binding environment. Uninterpreted
/// functions appear as bindings with functional sorts; shadowed re-entries
/// of a symbol are declared once.
fn declare_all(info: &SolverInfo, session: &mut SmtSession) -> Result<(), SmtError> {
    let mut seen = std::collections::HashSet::new();
    for (_, binding) in info.query.binds.iter() {
        if !seen.insert(binding.sym.clone()) {
            continue;
        }
        match &binding.sort {
            Sort::Func(args, ret) => session.declare_fun(&binding.sym, args, ret)?,
            sort => session.declare_fun(&binding.sym, &[], sort)?,
        }
    }
    Ok(())
}
