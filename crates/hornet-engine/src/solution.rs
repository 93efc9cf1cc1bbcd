use indexmap::IndexMap;

use hornet_ir::{BoundQual, KVar, SolverInfo};

/// The ordered qualifier candidates currently believed to hold for one κ.
///
/// The κ's predicate is the conjunction of the instantiated candidates; an
/// empty bind denotes `true` (a κ that lost every candidate is vacuously
/// true, and its consumer constraints become refutable).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualifierBind(Vec<BoundQual>);

impl QualifierBind {
    pub fn new(quals: Vec<BoundQual>) -> Self {
        QualifierBind(quals)
    }

    pub fn quals(&self) -> &[BoundQual] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The candidate solution: one qualifier bind per κ.
///
/// The key set equals the κ set of the problem and never changes;
/// refinement only ever shrinks binds, which is what makes the fixpoint
/// terminate. The store is threaded by value through the refinement loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Solution {
    binds: IndexMap<KVar, QualifierBind>,
}

impl Solution {
    /// The initial solution: every sort-correct qualifier instantiation is
    /// a candidate for every κ.
    pub fn bottom(info: &SolverInfo) -> Self {
        let binds = info
            .initial_binds()
            .iter()
            .map(|(k, quals)| (k.clone(), QualifierBind::new(quals.clone())))
            .collect();
        Solution { binds }
    }

    pub fn get(&self, k: &KVar) -> &[BoundQual] {
        self.binds.get(k).map(|b| b.quals()).unwrap_or(&[])
    }

    pub fn set(&mut self, k: KVar, bind: QualifierBind) {
        self.binds.insert(k, bind);
    }

    /// Restrict each `k ∈ ks` to exactly the qualifiers listed for it in
    /// `kqs`. Contracting: a bind only ever loses candidates. Returns
    /// whether any bind shrank.
    pub fn update(&mut self, ks: &[KVar], kqs: &[(KVar, BoundQual)]) -> bool {
        let mut changed = false;
        for k in ks {
            let Some(bind) = self.binds.get_mut(k) else {
                continue;
            };
            let before = bind.0.len();
            bind.0
                .retain(|bq| kqs.iter().any(|(k2, bq2)| k2 == k && bq2 == bq));
            changed |= bind.0.len() != before;
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KVar, &QualifierBind)> {
        self.binds.iter()
    }

    pub fn kvars(&self) -> impl Iterator<Item = &KVar> {
        self.binds.keys()
    }
}
