use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::sorts::Sort;
use crate::subst::Subst;
use crate::symbols::Symbol;

/// A closed, parameterised predicate template.
///
/// Instantiating `params` against a κ's formal arguments yields a concrete
/// candidate predicate for that κ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualifier {
    pub name: Symbol,
    pub params: Vec<(Symbol, Sort)>,
    pub body: Expr,
}

impl Qualifier {
    pub fn new(
        name: impl Into<Symbol>,
        params: Vec<(Symbol, Sort)>,
        body: Expr,
    ) -> Self {
        Qualifier {
            name: name.into(),
            params,
            body,
        }
    }

    /// Bind this qualifier positionally against a κ's formal arguments.
    ///
    /// Returns `None` when the arities or parameter sorts do not line up;
    /// such qualifiers are simply not candidates for that κ.
    pub fn instantiate_for(&self, kvar_params: &[(Symbol, Sort)]) -> Option<BoundQual> {
        if self.params.len() > kvar_params.len() {
            return None;
        }
        let mut pairs = Vec::with_capacity(self.params.len());
        for ((p, psort), (formal, fsort)) in self.params.iter().zip(kvar_params) {
            if psort != fsort {
                return None;
            }
            pairs.push((p.clone(), Expr::Var(formal.clone())));
        }
        Some(BoundQual {
            qual: self.clone(),
            su: Subst::from_pairs(pairs),
        })
    }
}

/// A qualifier bound to a κ: the template plus the substitution mapping its
/// parameters to the κ's formal arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundQual {
    pub qual: Qualifier,
    pub su: Subst,
}

impl BoundQual {
    /// The concrete predicate this bound qualifier stands for, phrased over
    /// the κ's formal arguments.
    pub fn pred(&self) -> Expr {
        self.su.apply(&self.qual.body)
    }
}
