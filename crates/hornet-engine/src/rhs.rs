use hornet_ir::{BoundQual, Expr, KVar, SimpC};

use crate::solution::Solution;

/// A candidate implication target: the instantiated predicate to check,
/// tagged with the (κ, qualifier) pair that survives if it is valid.
pub type Candidate = (Expr, (KVar, BoundQual));

/// Enumerate the RHS candidates of a constraint under the current solution.
///
/// For each κ application in the top-level conjunction of the RHS, every
/// qualifier of its current bind is instantiated through the application's
/// substitution. Non-κ conjuncts contribute nothing here; they belong to
/// target constraints and are classified by the result builder. The first
/// component lists the κs whose binds this constraint can shrink.
pub fn rhs_cands(sol: &Solution, c: &SimpC) -> (Vec<KVar>, Vec<Candidate>) {
    let mut ks = Vec::new();
    let mut cands = Vec::new();
    for conjunct in c.rhs.conjuncts() {
        let Expr::KVar(k, su) = conjunct else {
            continue;
        };
        if !ks.contains(k) {
            ks.push(k.clone());
        }
        for bq in sol.get(k) {
            cands.push((su.apply(&bq.pred()), (k.clone(), bq.clone())));
        }
    }
    (ks, cands)
}
