use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::sorts::Sort;
use crate::subst::Subst;
use crate::symbols::Symbol;

/// A κ-variable: an unknown refinement predicate to be solved for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KVar(pub Symbol);

impl KVar {
    pub fn new(name: impl Into<String>) -> Self {
        KVar(Symbol::new(name))
    }
}

impl std::fmt::Display for KVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Solver-agnostic first-order expressions, with κ-variable holes.
///
/// Conjunction is explicitly n-ary; [`Expr::conjuncts`] flattens nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// Variable reference by symbol.
    Var(Symbol),
    /// Integer literal.
    IntLit(i64),
    /// Boolean literal.
    BoolLit(bool),

    // Arithmetic
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),

    // Comparison
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Le(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Ge(Box<Expr>, Box<Expr>),

    // Boolean logic
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Implies(Box<Expr>, Box<Expr>),
    Iff(Box<Expr>, Box<Expr>),

    /// Uninterpreted function application.
    App(Symbol, Vec<Expr>),

    /// If-then-else.
    Ite(Box<Expr>, Box<Expr>, Box<Expr>),

    // Quantifiers
    Forall(Vec<(Symbol, Sort)>, Box<Expr>),
    Exists(Vec<(Symbol, Sort)>, Box<Expr>),

    /// A κ application under a pending substitution.
    KVar(KVar, Subst),
}

#[allow(clippy::should_implement_trait)]
impl Expr {
    pub fn var(name: impl Into<Symbol>) -> Self {
        Expr::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        Expr::IntLit(n)
    }

    pub fn bool(b: bool) -> Self {
        Expr::BoolLit(b)
    }

    pub fn kvar(k: KVar, su: Subst) -> Self {
        Expr::KVar(k, su)
    }

    pub fn add(self, other: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: Expr) -> Self {
        Expr::Sub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: Expr) -> Self {
        Expr::Mul(Box::new(self), Box::new(other))
    }

    pub fn neg(self) -> Self {
        Expr::Neg(Box::new(self))
    }

    pub fn eq(self, other: Expr) -> Self {
        Expr::Eq(Box::new(self), Box::new(other))
    }

    pub fn ne(self, other: Expr) -> Self {
        Expr::Ne(Box::new(self), Box::new(other))
    }

    pub fn lt(self, other: Expr) -> Self {
        Expr::Lt(Box::new(self), Box::new(other))
    }

    pub fn le(self, other: Expr) -> Self {
        Expr::Le(Box::new(self), Box::new(other))
    }

    pub fn gt(self, other: Expr) -> Self {
        Expr::Gt(Box::new(self), Box::new(other))
    }

    pub fn ge(self, other: Expr) -> Self {
        Expr::Ge(Box::new(self), Box::new(other))
    }

    pub fn and(ps: Vec<Expr>) -> Self {
        Expr::And(ps)
    }

    pub fn or(ps: Vec<Expr>) -> Self {
        Expr::Or(ps)
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn implies(self, other: Expr) -> Self {
        Expr::Implies(Box::new(self), Box::new(other))
    }

    pub fn iff(self, other: Expr) -> Self {
        Expr::Iff(Box::new(self), Box::new(other))
    }

    pub fn app(f: impl Into<Symbol>, args: Vec<Expr>) -> Self {
        Expr::App(f.into(), args)
    }

    pub fn ite(cond: Expr, then: Expr, els: Expr) -> Self {
        Expr::Ite(Box::new(cond), Box::new(then), Box::new(els))
    }

    /// Flatten nested `And`s into the list of top-level conjuncts.
    ///
    /// A non-`And` expression is its own single conjunct.
    pub fn conjuncts(&self) -> Vec<&Expr> {
        fn go<'a>(e: &'a Expr, out: &mut Vec<&'a Expr>) {
            match e {
                Expr::And(ps) => {
                    for p in ps {
                        go(p, out);
                    }
                }
                other => out.push(other),
            }
        }
        let mut out = Vec::new();
        go(self, &mut out);
        out
    }

    /// Free variables, quantifier-aware. κ applications contribute the free
    /// variables of their substitution images.
    pub fn free_vars(&self) -> BTreeSet<Symbol> {
        fn go(e: &Expr, bound: &mut Vec<Symbol>, out: &mut BTreeSet<Symbol>) {
            match e {
                Expr::Var(s) => {
                    if !bound.contains(s) {
                        out.insert(s.clone());
                    }
                }
                Expr::IntLit(_) | Expr::BoolLit(_) => {}
                Expr::Add(a, b)
                | Expr::Sub(a, b)
                | Expr::Mul(a, b)
                | Expr::Eq(a, b)
                | Expr::Ne(a, b)
                | Expr::Lt(a, b)
                | Expr::Le(a, b)
                | Expr::Gt(a, b)
                | Expr::Ge(a, b)
                | Expr::Implies(a, b)
                | Expr::Iff(a, b) => {
                    go(a, bound, out);
                    go(b, bound, out);
                }
                Expr::Neg(a) | Expr::Not(a) => go(a, bound, out),
                Expr::And(ps) | Expr::Or(ps) => {
                    for p in ps {
                        go(p, bound, out);
                    }
                }
                Expr::App(_, args) => {
                    for a in args {
                        go(a, bound, out);
                    }
                }
                Expr::Ite(c, t, e2) => {
                    go(c, bound, out);
                    go(t, bound, out);
                    go(e2, bound, out);
                }
                Expr::Forall(binders, body) | Expr::Exists(binders, body) => {
                    let n = bound.len();
                    bound.extend(binders.iter().map(|(s, _)| s.clone()));
                    go(body, bound, out);
                    bound.truncate(n);
                }
                Expr::KVar(_, su) => {
                    for (_, img) in su.iter() {
                        go(img, bound, out);
                    }
                }
            }
        }
        let mut out = BTreeSet::new();
        go(self, &mut Vec::new(), &mut out);
        out
    }

    /// All κ occurrences, with their pending substitutions, left to right.
    pub fn kvars(&self) -> Vec<(&KVar, &Subst)> {
        fn go<'a>(e: &'a Expr, out: &mut Vec<(&'a KVar, &'a Subst)>) {
            match e {
                Expr::KVar(k, su) => out.push((k, su)),
                Expr::Var(_) | Expr::IntLit(_) | Expr::BoolLit(_) => {}
                Expr::Add(a, b)
                | Expr::Sub(a, b)
                | Expr::Mul(a, b)
                | Expr::Eq(a, b)
                | Expr::Ne(a, b)
                | Expr::Lt(a, b)
                | Expr::Le(a, b)
                | Expr::Gt(a, b)
                | Expr::Ge(a, b)
                | Expr::Implies(a, b)
                | Expr::Iff(a, b) => {
                    go(a, out);
                    go(b, out);
                }
                Expr::Neg(a) | Expr::Not(a) => go(a, out),
                Expr::And(ps) | Expr::Or(ps) => {
                    for p in ps {
                        go(p, out);
                    }
                }
                Expr::App(_, args) => {
                    for a in args {
                        go(a, out);
                    }
                }
                Expr::Ite(c, t, e2) => {
                    go(c, out);
                    go(t, out);
                    go(e2, out);
                }
                Expr::Forall(_, body) | Expr::Exists(_, body) => go(body, out),
            }
        }
        let mut out = Vec::new();
        go(self, &mut out);
        out
    }

    pub fn has_kvars(&self) -> bool {
        !self.kvars().is_empty()
    }

    /// Uninterpreted application heads with their arities, in first-seen order.
    pub fn app_symbols(&self) -> Vec<(Symbol, usize)> {
        fn go(e: &Expr, out: &mut Vec<(Symbol, usize)>) {
            match e {
                Expr::App(f, args) => {
                    if !out.iter().any(|(g, _)| g == f) {
                        out.push((f.clone(), args.len()));
                    }
                    for a in args {
                        go(a, out);
                    }
                }
                Expr::Var(_) | Expr::IntLit(_) | Expr::BoolLit(_) => {}
                Expr::Add(a, b)
                | Expr::Sub(a, b)
                | Expr::Mul(a, b)
                | Expr::Eq(a, b)
                | Expr::Ne(a, b)
                | Expr::Lt(a, b)
                | Expr::Le(a, b)
                | Expr::Gt(a, b)
                | Expr::Ge(a, b)
                | Expr::Implies(a, b)
                | Expr::Iff(a, b) => {
                    go(a, out);
                    go(b, out);
                }
                Expr::Neg(a) | Expr::Not(a) => go(a, out),
                Expr::And(ps) | Expr::Or(ps) => {
                    for p in ps {
                        go(p, out);
                    }
                }
                Expr::Ite(c, t, e2) => {
                    go(c, out);
                    go(t, out);
                    go(e2, out);
                }
                Expr::Forall(_, body) | Expr::Exists(_, body) => go(body, out),
                Expr::KVar(_, su) => {
                    for (_, img) in su.iter() {
                        go(img, out);
                    }
                }
            }
        }
        let mut out = Vec::new();
        go(self, &mut out);
        out
    }
}

/// Smart n-ary conjunction: flattens nested `And`s and drops `true`.
///
/// Empty input yields `true`; a single remaining conjunct is unwrapped.
pub fn p_and(ps: Vec<Expr>) -> Expr {
    let mut flat = Vec::new();
    for p in ps {
        match p {
            Expr::BoolLit(true) => {}
            Expr::And(inner) => match p_and(inner) {
                Expr::BoolLit(true) => {}
                Expr::And(qs) => flat.extend(qs),
                q => flat.push(q),
            },
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 => Expr::BoolLit(true),
        1 => flat.pop().unwrap_or(Expr::BoolLit(true)),
        _ => Expr::And(flat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_create_expected_nodes() {
        assert_eq!(Expr::var("x"), Expr::Var(Symbol::new("x")));
        assert_eq!(Expr::int(7), Expr::IntLit(7));
        assert_eq!(Expr::bool(true), Expr::BoolLit(true));
        assert!(matches!(
            Expr::var("x").ge(Expr::int(0)),
            Expr::Ge(_, _)
        ));
    }

    #[test]
    fn conjuncts_flattens_nested_ands() {
        let e = Expr::and(vec![
            Expr::var("a"),
            Expr::and(vec![Expr::var("b"), Expr::and(vec![Expr::var("c")])]),
            Expr::var("d"),
        ]);
        let cs: Vec<String> = e
            .conjuncts()
            .iter()
            .map(|c| format!("{c:?}"))
            .collect();
        assert_eq!(cs.len(), 4);
        assert_eq!(e.conjuncts()[0], &Expr::var("a"));
        assert_eq!(e.conjuncts()[3], &Expr::var("d"));
    }

    #[test]
    fn conjuncts_of_non_and_is_singleton() {
        let e = Expr::var("x").ge(Expr::int(0));
        assert_eq!(e.conjuncts(), vec![&e]);
    }

    #[test]
    fn p_and_drops_trues_and_unwraps_singletons() {
        let p = Expr::var("x").ge(Expr::int(0));
        assert_eq!(p_and(vec![]), Expr::BoolLit(true));
        assert_eq!(p_and(vec![Expr::bool(true)]), Expr::BoolLit(true));
        assert_eq!(p_and(vec![Expr::bool(true), p.clone()]), p);
    }

    #[test]
    fn p_and_flattens_nested_ands() {
        let a = Expr::var("a");
        let b = Expr::var("b");
        let c = Expr::var("c");
        let e = p_and(vec![
            Expr::and(vec![a.clone(), b.clone()]),
            c.clone(),
        ]);
        assert_eq!(e, Expr::And(vec![a, b, c]));
    }

    #[test]
    fn free_vars_respects_quantifier_binders() {
        let body = Expr::var("x").le(Expr::var("y"));
        let e = Expr::Forall(
            vec![(Symbol::new("x"), Sort::Int)],
            Box::new(body),
        );
        let fv = e.free_vars();
        assert!(fv.contains(&Symbol::new("y")));
        assert!(!fv.contains(&Symbol::new("x")));
    }

    #[test]
    fn free_vars_of_kvar_come_from_subst_images() {
        let su = Subst::single(Symbol::new("karg$v#0"), Expr::var("z"));
        let e = Expr::kvar(KVar::new("k0"), su);
        let fv = e.free_vars();
        assert_eq!(fv.into_iter().collect::<Vec<_>>(), vec![Symbol::new("z")]);
    }

    #[test]
    fn kvars_collects_occurrences_left_to_right() {
        let k0 = KVar::new("k0");
        let k1 = KVar::new("k1");
        let e = Expr::and(vec![
            Expr::kvar(k0.clone(), Subst::empty()),
            Expr::var("x").gt(Expr::int(0)),
            Expr::kvar(k1.clone(), Subst::empty()),
        ]);
        let ks: Vec<&KVar> = e.kvars().into_iter().map(|(k, _)| k).collect();
        assert_eq!(ks, vec![&k0, &k1]);
        assert!(e.has_kvars());
        assert!(!Expr::var("x").has_kvars());
    }

    #[test]
    fn app_symbols_dedupes_by_head() {
        let e = Expr::app("f", vec![Expr::app("g", vec![Expr::var("x")])])
            .eq(Expr::app("f", vec![Expr::int(1)]));
        let apps = e.app_symbols();
        assert_eq!(
            apps,
            vec![(Symbol::new("f"), 1), (Symbol::new("g"), 1)]
        );
    }

    #[test]
    fn kvar_displays_with_dollar_prefix() {
        assert_eq!(KVar::new("k3").to_string(), "$k3");
    }
}
