use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::sorts::Sort;
use crate::symbols::Symbol;

/// A finite mapping from symbols to expressions, applied capture-avoidingly.
///
/// Iteration order is insertion order, so repeated runs produce identical
/// output. Composition via [`Subst::then`] is associative and the empty
/// substitution is its identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subst(IndexMap<Symbol, Expr>);

impl Subst {
    pub fn empty() -> Self {
        Subst(IndexMap::new())
    }

    pub fn single(sym: Symbol, img: Expr) -> Self {
        let mut m = IndexMap::new();
        m.insert(sym, img);
        Subst(m)
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (Symbol, Expr)>) -> Self {
        Subst(pairs.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, sym: &Symbol) -> Option<&Expr> {
        self.0.get(sym)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Expr)> {
        self.0.iter()
    }

    /// Compose: `a.then(b)` behaves as applying `a` first, then `b`.
    pub fn then(&self, after: &Subst) -> Subst {
        let mut out = IndexMap::new();
        for (sym, img) in &self.0 {
            out.insert(sym.clone(), after.apply(img));
        }
        for (sym, img) in &after.0 {
            if !out.contains_key(sym) {
                out.insert(sym.clone(), img.clone());
            }
        }
        Subst(out)
    }

    /// Apply to an expression. Bound occurrences shadow; quantifier binders
    /// that would capture a free variable of an image are renamed. The
    /// substitution distributes into `KVar(k, σ)` by composing onto `σ`.
    pub fn apply(&self, e: &Expr) -> Expr {
        if self.0.is_empty() {
            return e.clone();
        }
        match e {
            Expr::Var(s) => match self.0.get(s) {
                Some(img) => img.clone(),
                None => e.clone(),
            },
            Expr::IntLit(_) | Expr::BoolLit(_) => e.clone(),
            Expr::Add(a, b) => self.apply(a).add(self.apply(b)),
            Expr::Sub(a, b) => self.apply(a).sub(self.apply(b)),
            Expr::Mul(a, b) => self.apply(a).mul(self.apply(b)),
            Expr::Neg(a) => self.apply(a).neg(),
            Expr::Eq(a, b) => self.apply(a).eq(self.apply(b)),
            Expr::Ne(a, b) => self.apply(a).ne(self.apply(b)),
            Expr::Lt(a, b) => self.apply(a).lt(self.apply(b)),
            Expr::Le(a, b) => self.apply(a).le(self.apply(b)),
            Expr::Gt(a, b) => self.apply(a).gt(self.apply(b)),
            Expr::Ge(a, b) => self.apply(a).ge(self.apply(b)),
            Expr::And(ps) => Expr::And(ps.iter().map(|p| self.apply(p)).collect()),
            Expr::Or(ps) => Expr::Or(ps.iter().map(|p| self.apply(p)).collect()),
            Expr::Not(a) => self.apply(a).not(),
            Expr::Implies(a, b) => self.apply(a).implies(self.apply(b)),
            Expr::Iff(a, b) => self.apply(a).iff(self.apply(b)),
            Expr::App(f, args) => {
                Expr::App(f.clone(), args.iter().map(|a| self.apply(a)).collect())
            }
            Expr::Ite(c, t, e2) => {
                Expr::ite(self.apply(c), self.apply(t), self.apply(e2))
            }
            Expr::Forall(binders, body) => {
                let (binders, body) = self.apply_under_binders(binders, body);
                Expr::Forall(binders, Box::new(body))
            }
            Expr::Exists(binders, body) => {
                let (binders, body) = self.apply_under_binders(binders, body);
                Expr::Exists(binders, Box::new(body))
            }
            Expr::KVar(k, su) => Expr::KVar(k.clone(), su.then(self)),
        }
    }

    fn apply_under_binders(
        &self,
        binders: &[(Symbol, Sort)],
        body: &Expr,
    ) -> (Vec<(Symbol, Sort)>, Expr) {
        // Shadowed entries are dropped from the inner substitution.
        let mut inner = Subst(
            self.0
                .iter()
                .filter(|(sym, _)| !binders.iter().any(|(b, _)| b == *sym))
                .map(|(sym, img)| (sym.clone(), img.clone()))
                .collect(),
        );
        let image_fvs: std::collections::BTreeSet<Symbol> = inner
            .0
            .values()
            .flat_map(|img| img.free_vars())
            .collect();
        let mut out_binders = Vec::with_capacity(binders.len());
        for (sym, sort) in binders {
            if image_fvs.contains(sym) {
                let fresh = fresh_symbol(sym, &image_fvs, body);
                inner
                    .0
                    .insert(sym.clone(), Expr::Var(fresh.clone()));
                out_binders.push((fresh, sort.clone()));
            } else {
                out_binders.push((sym.clone(), sort.clone()));
            }
        }
        let body = inner.apply(body);
        (out_binders, body)
    }
}

/// Deterministic fresh name: `base~1`, `base~2`, … avoiding the image free
/// variables and the body's own free variables.
fn fresh_symbol(
    base: &Symbol,
    avoid: &std::collections::BTreeSet<Symbol>,
    body: &Expr,
) -> Symbol {
    let body_fvs = body.free_vars();
    let mut n = 1usize;
    loop {
        let cand = Symbol::new(format!("{base}~{n}"));
        if !avoid.contains(&cand) && !body_fvs.contains(&cand) {
            return cand;
        }
        n += 1;
    }
}

impl FromIterator<(Symbol, Expr)> for Subst {
    fn from_iter<T: IntoIterator<Item = (Symbol, Expr)>>(iter: T) -> Self {
        Subst(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::KVar;
    use proptest::prelude::*;

    fn x() -> Symbol {
        Symbol::new("x")
    }

    fn y() -> Symbol {
        Symbol::new("y")
    }

    #[test]
    fn apply_replaces_free_variables() {
        let su = Subst::single(x(), Expr::int(3));
        let e = Expr::var("x").add(Expr::var("y"));
        assert_eq!(su.apply(&e), Expr::int(3).add(Expr::var("y")));
    }

    #[test]
    fn empty_subst_is_identity() {
        let e = Expr::var("x").ge(Expr::var("y").mul(Expr::int(2)));
        assert_eq!(Subst::empty().apply(&e), e);
    }

    #[test]
    fn bound_occurrences_shadow() {
        let su = Subst::single(x(), Expr::int(1));
        let e = Expr::Forall(
            vec![(x(), Sort::Int)],
            Box::new(Expr::var("x").ge(Expr::int(0))),
        );
        assert_eq!(su.apply(&e), e);
    }

    #[test]
    fn capture_is_avoided_by_renaming() {
        // [x := y] applied to (forall y. x <= y) must not capture the image.
        let su = Subst::single(x(), Expr::var("y"));
        let e = Expr::Forall(
            vec![(y(), Sort::Int)],
            Box::new(Expr::var("x").le(Expr::var("y"))),
        );
        let out = su.apply(&e);
        match out {
            Expr::Forall(binders, body) => {
                let fresh = binders[0].0.clone();
                assert_ne!(fresh, y());
                assert_eq!(*body, Expr::var("y").le(Expr::Var(fresh)));
            }
            other => panic!("expected forall, got {other:?}"),
        }
    }

    #[test]
    fn subst_distributes_into_kvar() {
        let inner = Subst::single(Symbol::new("karg$v#0"), Expr::var("x"));
        let outer = Subst::single(x(), Expr::int(5));
        let e = Expr::kvar(KVar::new("k"), inner.clone());
        match outer.apply(&e) {
            Expr::KVar(_, su) => {
                assert_eq!(
                    su.get(&Symbol::new("karg$v#0")),
                    Some(&Expr::int(5))
                );
            }
            other => panic!("expected kvar, got {other:?}"),
        }
    }

    #[test]
    fn then_matches_sequential_application() {
        let a = Subst::single(x(), Expr::var("y"));
        let b = Subst::single(y(), Expr::int(7));
        let e = Expr::var("x").add(Expr::var("y"));
        assert_eq!(a.then(&b).apply(&e), b.apply(&a.apply(&e)));
    }

    fn arb_leaf() -> impl Strategy<Value = Expr> {
        prop_oneof![
            (-4i64..=4).prop_map(Expr::int),
            prop_oneof![Just("x"), Just("y"), Just("z"), Just("w")]
                .prop_map(|s| Expr::var(s)),
        ]
    }

    fn arb_expr() -> impl Strategy<Value = Expr> {
        arb_leaf().prop_recursive(3, 16, 3, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(a, b)| a.add(b)),
                (inner.clone(), inner.clone()).prop_map(|(a, b)| a.ge(b)),
                proptest::collection::vec(inner, 0..3).prop_map(Expr::And),
            ]
        })
    }

    fn arb_subst() -> impl Strategy<Value = Subst> {
        proptest::collection::vec(
            (
                prop_oneof![Just("x"), Just("y"), Just("z")].prop_map(|s| Symbol::new(s)),
                arb_leaf(),
            ),
            0..3,
        )
        .prop_map(Subst::from_pairs)
    }

    proptest! {
        #[test]
        fn composition_is_associative(
            a in arb_subst(),
            b in arb_subst(),
            c in arb_subst(),
            e in arb_expr(),
        ) {
            let left = a.then(&b).then(&c);
            let right = a.then(&b.then(&c));
            prop_assert_eq!(left.apply(&e), right.apply(&e));
        }

        #[test]
        fn identity_laws(a in arb_subst(), e in arb_expr()) {
            let id = Subst::empty();
            prop_assert_eq!(a.then(&id).apply(&e), a.apply(&e));
            prop_assert_eq!(id.then(&a).apply(&e), a.apply(&e));
        }
    }
}
