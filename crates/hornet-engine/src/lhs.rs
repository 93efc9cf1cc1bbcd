use hornet_ir::constraints::IrError;
use hornet_ir::expr::p_and;
use hornet_ir::{BindEnv, Expr, SimpC};

use crate::solution::Solution;

/// Replace every κ application with its current solution: the conjunction
/// of the κ's bound qualifiers, instantiated through the application's
/// substitution. An empty bind expands to `true`.
pub fn expand_kvars(sol: &Solution, e: &Expr) -> Expr {
    match e {
        Expr::KVar(k, su) => p_and(
            sol.get(k)
                .iter()
                .map(|bq| su.apply(&bq.pred()))
                .collect(),
        ),
        Expr::Var(_) | Expr::IntLit(_) | Expr::BoolLit(_) => e.clone(),
        Expr::Add(a, b) => expand_kvars(sol, a).add(expand_kvars(sol, b)),
        Expr::Sub(a, b) => expand_kvars(sol, a).sub(expand_kvars(sol, b)),
        Expr::Mul(a, b) => expand_kvars(sol, a).mul(expand_kvars(sol, b)),
        Expr::Neg(a) => expand_kvars(sol, a).neg(),
        Expr::Eq(a, b) => expand_kvars(sol, a).eq(expand_kvars(sol, b)),
        Expr::Ne(a, b) => expand_kvars(sol, a).ne(expand_kvars(sol, b)),
        Expr::Lt(a, b) => expand_kvars(sol, a).lt(expand_kvars(sol, b)),
        Expr::Le(a, b) => expand_kvars(sol, a).le(expand_kvars(sol, b)),
        Expr::Gt(a, b) => expand_kvars(sol, a).gt(expand_kvars(sol, b)),
        Expr::Ge(a, b) => expand_kvars(sol, a).ge(expand_kvars(sol, b)),
        Expr::And(ps) => Expr::And(ps.iter().map(|p| expand_kvars(sol, p)).collect()),
        Expr::Or(ps) => Expr::Or(ps.iter().map(|p| expand_kvars(sol, p)).collect()),
        Expr::Not(a) => expand_kvars(sol, a).not(),
        Expr::Implies(a, b) => expand_kvars(sol, a).implies(expand_kvars(sol, b)),
        Expr::Iff(a, b) => expand_kvars(sol, a).iff(expand_kvars(sol, b)),
        Expr::App(f, args) => Expr::App(
            f.clone(),
            args.iter().map(|a| expand_kvars(sol, a)).collect(),
        ),
        Expr::Ite(c, t, e2) => Expr::ite(
            expand_kvars(sol, c),
            expand_kvars(sol, t),
            expand_kvars(sol, e2),
        ),
        Expr::Forall(binders, body) => Expr::Forall(
            binders.clone(),
            Box::new(expand_kvars(sol, body)),
        ),
        Expr::Exists(binders, body) => Expr::Exists(
            binders.clone(),
            Box::new(expand_kvars(sol, body)),
        ),
    }
}

/// Assemble a constraint's antecedent under the current solution: the
/// environment refinements in binding order, then the constraint's own LHS,
/// all with κ applications expanded. The conjunct order is deterministic so
/// repeated runs produce identical SMT transcripts.
pub fn lhs_pred(binds: &BindEnv, sol: &Solution, c: &SimpC) -> Result<Expr, IrError> {
    let mut parts = Vec::with_capacity(c.env.len() + 1);
    for bid in &c.env {
        let binding = binds.lookup(*bid)?;
        parts.push(expand_kvars(sol, &binding.refinement));
    }
    parts.push(expand_kvars(sol, &c.lhs));
    Ok(p_and(parts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::QualifierBind;
    use hornet_ir::{KVar, Qualifier, Sort, Subst, Symbol};

    fn kvar_formals() -> Vec<(Symbol, Sort)> {
        vec![(Symbol::karg("v", 0), Sort::Int)]
    }

    fn sol_with(k: &KVar, bounds: &[i64]) -> Solution {
        let quals = bounds
            .iter()
            .map(|b| {
                Qualifier::new(
                    format!("QGe{b}"),
                    vec![(Symbol::new("v"), Sort::Int)],
                    Expr::var("v").ge(Expr::int(*b)),
                )
                .instantiate_for(&kvar_formals())
                .expect("sorts match")
            })
            .collect();
        let mut s = Solution::default();
        s.set(k.clone(), QualifierBind::new(quals));
        s
    }

    #[test]
    fn kvar_expands_to_instantiated_conjunction() {
        let k = KVar::new("k0");
        let sol = sol_with(&k, &[0, 5]);
        let app = Expr::kvar(
            k.clone(),
            Subst::single(Symbol::karg("v", 0), Expr::var("x")),
        );
        let out = expand_kvars(&sol, &app);
        assert_eq!(
            out,
            Expr::And(vec![
                Expr::var("x").ge(Expr::int(0)),
                Expr::var("x").ge(Expr::int(5)),
            ])
        );
    }

    #[test]
    fn empty_bind_expands_to_true() {
        let k = KVar::new("k0");
        let sol = sol_with(&k, &[]);
        let app = Expr::kvar(k, Subst::empty());
        assert_eq!(expand_kvars(&sol, &app), Expr::BoolLit(true));
    }

    #[test]
    fn lhs_pred_conjoins_env_then_lhs() {
        let mut binds = BindEnv::new();
        let b0 = binds.insert(
            Symbol::new("x"),
            Sort::Int,
            Expr::var("x").ge(Expr::int(0)),
        );
        let b1 = binds.insert(
            Symbol::new("y"),
            Sort::Int,
            Expr::var("y").gt(Expr::var("x")),
        );
        let c = SimpC {
            id: 0,
            env: vec![b0, b1],
            lhs: Expr::var("y").lt(Expr::int(10)),
            rhs: Expr::bool(true),
            tag: None,
            is_target: true,
        };
        let out = lhs_pred(&binds, &Solution::default(), &c).expect("env resolves");
        assert_eq!(
            out,
            Expr::And(vec![
                Expr::var("x").ge(Expr::int(0)),
                Expr::var("y").gt(Expr::var("x")),
                Expr::var("y").lt(Expr::int(10)),
            ])
        );
    }

    #[test]
    fn lhs_kvars_are_expanded_through_their_substitution() {
        let k = KVar::new("k0");
        let sol = sol_with(&k, &[0]);
        let c = SimpC {
            id: 0,
            env: vec![],
            lhs: Expr::kvar(
                k,
                Subst::single(Symbol::karg("v", 0), Expr::var("z")),
            ),
            rhs: Expr::bool(true),
            tag: None,
            is_target: true,
        };
        let out = lhs_pred(&BindEnv::new(), &sol, &c).expect("no env");
        assert_eq!(out, Expr::var("z").ge(Expr::int(0)));
    }
}
