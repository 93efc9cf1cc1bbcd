use tracing::debug;

use hornet_ir::{KVar, SimpC, SolverInfo};
use hornet_smt::Oracle;

use crate::fixpoint::FixError;
use crate::lhs::lhs_pred;
use crate::rhs::rhs_cands;
use crate::solution::Solution;

/// One refinement step for one constraint.
///
/// Computes the antecedent under the current solution, offers every
/// qualifier candidate on the RHS to the oracle, and restricts the touched
/// κ binds to the survivors. Returns whether any bind shrank.
///
/// Only qualifiers already in a bind can survive, so binds only ever
/// shrink; the candidate lattice has finite height, which bounds the
/// number of changing steps.
pub fn refine_c<O: Oracle>(
    iter: usize,
    sol: &mut Solution,
    c: &SimpC,
    info: &SolverInfo,
    oracle: &mut O,
) -> Result<bool, FixError> {
    let (ks, cands) = rhs_cands(sol, c);
    if cands.is_empty() {
        return Ok(false);
    }
    let lhs = lhs_pred(&info.query.binds, sol, c)?;
    let offered = cands.len();
    let valid = oracle.filter_valid(&lhs, cands)?;
    let kqs: Vec<(KVar, hornet_ir::BoundQual)> =
        valid.into_iter().map(|(_, tag)| tag).collect();
    let changed = sol.update(&ks, &kqs);
    debug!(
        target: "hornet::fix",
        iter,
        cid = c.id,
        offered,
        kept = kqs.len(),
        changed,
        "refined constraint"
    );
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::Solution;
    use hornet_ir::{
        BindEnv, BoundQual, Expr, KVarDecl, Qualifier, Query, Sort, Subst, Symbol,
    };
    use hornet_smt::SmtError;

    /// Oracle that keeps candidates whose printed form contains a marker.
    struct MarkerOracle(&'static str);

    impl Oracle for MarkerOracle {
        fn filter_valid<T>(
            &mut self,
            _lhs: &Expr,
            cands: Vec<(Expr, T)>,
        ) -> Result<Vec<(Expr, T)>, SmtError> {
            Ok(cands
                .into_iter()
                .filter(|(p, _)| format!("{p:?}").contains(self.0))
                .collect())
        }
    }

    fn ge(bound: i64) -> Qualifier {
        Qualifier::new(
            format!("QGe{bound}"),
            vec![(Symbol::new("v"), Sort::Int)],
            Expr::var("v").ge(Expr::int(bound)),
        )
    }

    fn info_with_constraint(c: SimpC, quals: Vec<Qualifier>) -> SolverInfo {
        let query = Query {
            binds: BindEnv::new(),
            constraints: vec![c],
            kvar_decls: vec![KVarDecl {
                kvar: KVar::new("k0"),
                params: vec![(Symbol::karg("v", 0), Sort::Int)],
            }],
            qualifiers: quals,
        };
        SolverInfo::build(query).expect("well-formed")
    }

    fn kvar_rhs() -> Expr {
        Expr::kvar(
            KVar::new("k0"),
            Subst::single(Symbol::karg("v", 0), Expr::var("x")),
        )
    }

    #[test]
    fn surviving_candidates_shrink_the_bind() {
        let c = SimpC {
            id: 0,
            env: vec![],
            lhs: Expr::var("x").eq(Expr::int(2)),
            rhs: kvar_rhs(),
            tag: None,
            is_target: false,
        };
        let info = info_with_constraint(c.clone(), vec![ge(0), ge(5)]);
        let mut sol = Solution::bottom(&info);
        // Keep only the candidate mentioning 0.
        let mut oracle = MarkerOracle("IntLit(0)");
        let changed = refine_c(1, &mut sol, &c, &info, &mut oracle).expect("refines");
        assert!(changed);
        let bind: Vec<&BoundQual> = sol.get(&KVar::new("k0")).iter().collect();
        assert_eq!(bind.len(), 1);
        assert_eq!(bind[0].qual.name, Symbol::new("QGe0"));
    }

    #[test]
    fn no_candidates_means_no_change() {
        let c = SimpC {
            id: 0,
            env: vec![],
            lhs: Expr::var("x").eq(Expr::int(0)),
            rhs: Expr::var("x").ge(Expr::int(0)),
            tag: None,
            is_target: true,
        };
        let info = info_with_constraint(c.clone(), vec![ge(0)]);
        let mut sol = Solution::bottom(&info);
        let mut oracle = MarkerOracle("never");
        let changed = refine_c(1, &mut sol, &c, &info, &mut oracle).expect("refines");
        assert!(!changed);
        assert_eq!(sol.get(&KVar::new("k0")).len(), 1);
    }

    #[test]
    fn refinement_is_monotone_under_repeated_steps() {
        let c = SimpC {
            id: 0,
            env: vec![],
            lhs: Expr::var("x").eq(Expr::int(2)),
            rhs: kvar_rhs(),
            tag: None,
            is_target: false,
        };
        let info = info_with_constraint(c.clone(), vec![ge(0), ge(5)]);
        let mut sol = Solution::bottom(&info);
        let mut oracle = MarkerOracle("IntLit(0)");

        let mut sizes = vec![sol.get(&KVar::new("k0")).len()];
        for iter in 1..=3 {
            refine_c(iter, &mut sol, &c, &info, &mut oracle).expect("refines");
            sizes.push(sol.get(&KVar::new("k0")).len());
        }
        assert!(sizes.windows(2).all(|w| w[1] <= w[0]));
        // A second identical step is a no-op.
        let changed = refine_c(4, &mut sol, &c, &info, &mut oracle).expect("refines");
        assert!(!changed);
    }
}
