use std::collections::VecDeque;
use std::fmt;

use indexmap::IndexMap;
use tracing::warn;

use hornet_ir::expr::p_and;
use hornet_ir::{Expr, KVar, SolverInfo, Subst, Symbol};
use hornet_smt::printer::to_smtlib;
use hornet_smt::Oracle;

use crate::fixpoint::{FixConfig, FixError, FixStats};
use crate::lhs::lhs_pred;
use crate::solution::Solution;
use crate::worklist::Worklist;

/// Overall verdict of a solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixStatus {
    /// Every target constraint is valid under the inferred solution.
    Safe,
    /// The listed target constraints (id, user tag) are refutable.
    Unsafe(Vec<(usize, Option<String>)>),
    /// The solve aborted; carried for result surfaces that must not raise.
    Crash { reason: String },
}

impl FixStatus {
    /// Stable verdict label for machine-readable consumers.
    pub fn verdict_class(&self) -> &'static str {
        match self {
            FixStatus::Safe => "safe",
            FixStatus::Unsafe(_) => "unsafe",
            FixStatus::Crash { .. } => "crash",
        }
    }
}

/// The result of one solve: the verdict, the materialised κ assignment,
/// and any warnings gathered along the way.
#[derive(Debug, Clone)]
pub struct FixResult {
    pub status: FixStatus,
    pub solution: IndexMap<KVar, Expr>,
    pub warnings: Vec<String>,
    pub stats: Option<FixStats>,
}

impl FixResult {
    pub fn crashed(reason: String) -> Self {
        FixResult {
            status: FixStatus::Crash { reason },
            solution: IndexMap::new(),
            warnings: Vec::new(),
            stats: None,
        }
    }
}

impl fmt::Display for FixResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            FixStatus::Safe => writeln!(f, "RESULT: SAFE")?,
            FixStatus::Unsafe(cs) => {
                writeln!(f, "RESULT: UNSAFE ({} constraints)", cs.len())?;
                for (id, tag) in cs {
                    match tag {
                        Some(tag) => writeln!(f, "  constraint {id}: {tag}")?,
                        None => writeln!(f, "  constraint {id}")?,
                    }
                }
            }
            FixStatus::Crash { reason } => {
                writeln!(f, "RESULT: CRASH")?;
                writeln!(f, "Reason: {reason}")?;
            }
        }
        for (k, p) in &self.solution {
            let text = to_smtlib(p).unwrap_or_else(|_| format!("{p:?}"));
            writeln!(f, "  {k} := {text}")?;
        }
        for w in &self.warnings {
            writeln!(f, "  warning: {w}")?;
        }
        if let Some(stats) = &self.stats {
            writeln!(
                f,
                "  stats: iterations={} pops={} pushes={} refines={} elapsed_ms={}",
                stats.iterations, stats.pops, stats.pushes, stats.refines, stats.elapsed_ms
            )?;
        }
        Ok(())
    }
}

/// Build the final result once the worklist has drained.
///
/// Phase 1 classifies the residual target constraints; phase 2 materialises
/// each κ's bind into one tidied conjunction; phase 3 optionally minimises
/// that conjunction through the oracle.
pub fn build_result<O: Oracle>(
    info: &SolverInfo,
    cfg: &FixConfig,
    sol: &Solution,
    w: &Worklist,
    oracle: &mut O,
    stats: FixStats,
) -> Result<FixResult, FixError> {
    let mut failed = Vec::new();
    for &pos in w.unsat_candidates() {
        let c = info.constraint(pos);
        if !c.is_target || c.rhs.has_kvars() {
            return Err(FixError::MalformedConstraint(c.id));
        }
        let lp = lhs_pred(&info.query.binds, sol, c)?;
        if !oracle.is_valid(&lp, &c.rhs)? {
            failed.push((c.id, c.tag.clone()));
        }
    }

    let mut warnings = Vec::new();
    let mut solution = IndexMap::new();
    for (k, bind) in sol.iter() {
        if bind.is_empty() {
            warnings.push(format!("{k} retained no qualifiers; it is vacuously true"));
            warn!(target: "hornet::fix", kvar = %k, "empty qualifier bind");
        }
        let mut preds: Vec<Expr> = bind.quals().iter().map(|bq| bq.pred()).collect();
        if cfg.minimal_sol {
            preds = minimize_conjuncts(oracle, preds)?;
        }
        solution.insert(k.clone(), tidy_expr(&p_and(preds)));
    }

    let status = if failed.is_empty() {
        FixStatus::Safe
    } else {
        FixStatus::Unsafe(failed)
    };
    Ok(FixResult {
        status,
        solution,
        warnings,
        stats: cfg.solver_stats.then_some(stats),
    })
}

/// Drop every conjunct implied by the remaining ones.
///
/// Scans in input order: a conjunct implied by the kept ones plus the not
/// yet examined rest is dropped, otherwise it moves into the kept set. The
/// output has no conjunct implied by the others, so a second pass is a
/// no-op.
pub fn minimize_conjuncts<O: Oracle>(
    oracle: &mut O,
    ps: Vec<Expr>,
) -> Result<Vec<Expr>, FixError> {
    let mut keep: Vec<Expr> = Vec::new();
    let mut rest: VecDeque<Expr> = ps.into();
    while let Some(p) = rest.pop_front() {
        let mut others = keep.clone();
        others.extend(rest.iter().cloned());
        if oracle.is_valid(&p_and(others), &p)? {
            continue;
        }
        keep.push(p);
    }
    Ok(keep)
}

/// Rename every free variable to its tidied form, so internal κ-argument
/// names are reported as the originals from the well-formedness
/// declarations.
pub fn tidy_expr(e: &Expr) -> Expr {
    let renames: Vec<(Symbol, Expr)> = e
        .free_vars()
        .into_iter()
        .filter_map(|s| {
            let t = s.tidy();
            (t != s).then(|| (s, Expr::Var(t)))
        })
        .collect();
    if renames.is_empty() {
        return e.clone();
    }
    Subst::from_pairs(renames).apply(e)
}
