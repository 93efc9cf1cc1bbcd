use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expr::{Expr, KVar};
use crate::qualifiers::Qualifier;
use crate::sorts::Sort;
use crate::symbols::Symbol;

#[derive(Debug, Error)]
pub enum IrError {
    #[error("unknown binding id {0}")]
    UnknownBind(usize),
    #[error("constraint {cid}: κ {kvar} has no well-formedness declaration")]
    UndeclaredKVar { cid: usize, kvar: KVar },
    #[error("duplicate constraint id {0}")]
    DuplicateConstraint(usize),
}

/// Index into the shared binding environment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BindId(pub usize);

/// One entry of the binding environment: a symbol, its sort, and the
/// refinement known to hold for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub sym: Symbol,
    pub sort: Sort,
    pub refinement: Expr,
}

/// Persistent indexed table of bindings shared across constraints.
///
/// Constraints carry only index lists into it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindEnv {
    binds: Vec<Binding>,
}

impl BindEnv {
    pub fn new() -> Self {
        BindEnv::default()
    }

    pub fn insert(&mut self, sym: Symbol, sort: Sort, refinement: Expr) -> BindId {
        self.binds.push(Binding {
            sym,
            sort,
            refinement,
        });
        BindId(self.binds.len() - 1)
    }

    pub fn lookup(&self, id: BindId) -> Result<&Binding, IrError> {
        self.binds.get(id.0).ok_or(IrError::UnknownBind(id.0))
    }

    pub fn len(&self) -> usize {
        self.binds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BindId, &Binding)> {
        self.binds.iter().enumerate().map(|(i, b)| (BindId(i), b))
    }
}

/// A simplified Horn constraint.
///
/// The RHS is syntactically either a conjunction of κ applications (a
/// refining constraint) or a concrete proposition (a target constraint,
/// whose refutation is a user-visible error).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpC {
    pub id: usize,
    pub env: Vec<BindId>,
    pub lhs: Expr,
    pub rhs: Expr,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub is_target: bool,
}

impl SimpC {
    /// κs this constraint assigns to (top-level RHS conjuncts only).
    pub fn writes(&self) -> Vec<&KVar> {
        self.rhs
            .conjuncts()
            .into_iter()
            .filter_map(|c| match c {
                Expr::KVar(k, _) => Some(k),
                _ => None,
            })
            .collect()
    }

    /// κs this constraint reads on its LHS (environment κs are resolved by
    /// the caller, which owns the bind environment).
    pub fn lhs_reads(&self) -> Vec<&KVar> {
        self.lhs.kvars().into_iter().map(|(k, _)| k).collect()
    }
}

/// Well-formedness declaration for a κ: its formal arguments and sorts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KVarDecl {
    pub kvar: KVar,
    pub params: Vec<(Symbol, Sort)>,
}

/// The whole problem as handed over by a front-end: binding environment,
/// constraints, κ declarations, and the qualifier pool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    pub binds: BindEnv,
    pub constraints: Vec<SimpC>,
    pub kvar_decls: Vec<KVarDecl>,
    pub qualifiers: Vec<Qualifier>,
}
