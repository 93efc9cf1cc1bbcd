use std::collections::BTreeSet;

use hornet_ir::SolverInfo;

/// Worklist over constraint positions, keyed by `(SCC rank, generation,
/// position)`.
///
/// Constraints are visited in increasing SCC rank, dependencies before
/// dependants. Re-pushing a constraint gives it a fresh generation, which
/// places it behind its SCC peers and bounds re-visits per sweep. The
/// queue is empty exactly when no change remains to propagate.
#[derive(Debug)]
pub struct Worklist {
    queue: BTreeSet<(usize, u64, usize)>,
    queued: Vec<bool>,
    next_gen: u64,
    last_scc: Option<usize>,
    targets: Vec<usize>,
    ranks: Vec<usize>,
    sccs: Vec<usize>,
    num_ranks: usize,
}

impl Worklist {
    pub fn init(info: &SolverInfo) -> Self {
        let n = info.constraints().len();
        let mut queue = BTreeSet::new();
        let mut ranks = Vec::with_capacity(n);
        let mut sccs = Vec::with_capacity(n);
        let mut targets = Vec::new();
        for pos in 0..n {
            ranks.push(info.rank_of(pos));
            sccs.push(info.scc_of(pos));
            queue.insert((info.rank_of(pos), 0, pos));
            if info.constraint(pos).is_target {
                targets.push(pos);
            }
        }
        Worklist {
            queue,
            queued: vec![true; n],
            next_gen: 0,
            last_scc: None,
            targets,
            ranks,
            sccs,
            num_ranks: info.num_ranks(),
        }
    }

    /// Next constraint position, with a flag marking the first pop from a
    /// new SCC and the SCC rank. `None` means fixpoint.
    pub fn pop(&mut self) -> Option<(usize, bool, usize)> {
        let key = *self.queue.iter().next()?;
        self.queue.remove(&key);
        let (rank, _, pos) = key;
        self.queued[pos] = false;
        let scc = self.sccs[pos];
        let new_scc = self.last_scc != Some(scc);
        self.last_scc = Some(scc);
        Some((pos, new_scc, rank))
    }

    /// Requeue a dependant behind its SCC peers. Already-queued constraints
    /// stay where they are.
    pub fn push(&mut self, pos: usize) {
        if self.queued[pos] {
            return;
        }
        self.next_gen += 1;
        self.queue.insert((self.ranks[pos], self.next_gen, pos));
        self.queued[pos] = true;
    }

    /// Target constraint positions: the candidates for `Unsafe` once their
    /// ancestors have converged.
    pub fn unsat_candidates(&self) -> &[usize] {
        &self.targets
    }

    /// Number of distinct SCC ranks, used as the iteration-budget hint.
    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hornet_ir::{BindEnv, Expr, KVar, KVarDecl, Query, SimpC, Sort, Subst, Symbol};

    fn kapp(name: &str) -> Expr {
        Expr::kvar(
            KVar::new(name),
            Subst::single(Symbol::karg("v", 0), Expr::var("x")),
        )
    }

    fn kdecl(name: &str) -> KVarDecl {
        KVarDecl {
            kvar: KVar::new(name),
            params: vec![(Symbol::karg("v", 0), Sort::Int)],
        }
    }

    fn simpc(id: usize, lhs: Expr, rhs: Expr, target: bool) -> SimpC {
        SimpC {
            id,
            env: vec![],
            lhs,
            rhs,
            tag: None,
            is_target: target,
        }
    }

    fn chain_info() -> SolverInfo {
        // c0 writes k0; c1 reads k0, writes k1; c2 reads k1 (target).
        let query = Query {
            binds: BindEnv::new(),
            constraints: vec![
                simpc(0, Expr::bool(true), kapp("k0"), false),
                simpc(1, kapp("k0"), kapp("k1"), false),
                simpc(2, kapp("k1"), Expr::var("x").ge(Expr::int(0)), true),
            ],
            kvar_decls: vec![kdecl("k0"), kdecl("k1")],
            qualifiers: vec![],
        };
        SolverInfo::build(query).expect("well-formed")
    }

    #[test]
    fn pops_in_rank_order_and_flags_new_sccs() {
        let info = chain_info();
        let mut w = Worklist::init(&info);
        let order: Vec<(usize, bool)> = std::iter::from_fn(|| w.pop())
            .map(|(pos, new_scc, _)| (pos, new_scc))
            .collect();
        assert_eq!(order, vec![(0, true), (1, true), (2, true)]);
        assert!(w.is_empty());
    }

    #[test]
    fn push_requeues_behind_peers() {
        let info = chain_info();
        let mut w = Worklist::init(&info);
        let (first, _, _) = w.pop().expect("non-empty");
        assert_eq!(first, 0);
        // Requeued dependant c1 is still popped before the later-rank c2.
        let (second, _, _) = w.pop().expect("non-empty");
        assert_eq!(second, 1);
        w.push(1);
        let (third, new_scc, _) = w.pop().expect("non-empty");
        assert_eq!(third, 1);
        assert!(!new_scc);
        let (fourth, _, _) = w.pop().expect("non-empty");
        assert_eq!(fourth, 2);
        assert!(w.pop().is_none());
    }

    #[test]
    fn double_push_is_idempotent_while_queued() {
        let info = chain_info();
        let mut w = Worklist::init(&info);
        while w.pop().is_some() {}
        w.push(1);
        w.push(1);
        assert_eq!(w.pop().map(|(pos, _, _)| pos), Some(1));
        assert!(w.pop().is_none());
    }

    #[test]
    fn unsat_candidates_are_the_targets() {
        let info = chain_info();
        let w = Worklist::init(&info);
        assert_eq!(w.unsat_candidates(), &[2]);
        assert_eq!(w.num_ranks(), 3);
    }
}
