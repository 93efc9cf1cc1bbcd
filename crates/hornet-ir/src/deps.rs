use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::constraints::{IrError, Query, SimpC};
use crate::expr::KVar;
use crate::qualifiers::BoundQual;
use crate::sorts::Sort;
use crate::symbols::Symbol;

/// The solved-for problem after dependency analysis.
///
/// Nodes of the dependency graph are constraint ids; there is an edge
/// `c → c'` when `c` assigns to a κ that appears on the LHS (or in the
/// environment refinements) of `c'`. Constraints are grouped into strongly
/// connected components and ranked topologically, dependencies before
/// dependants.
#[derive(Debug, Clone)]
pub struct SolverInfo {
    pub query: Query,
    /// Per-constraint SCC id, indexed by position in `query.constraints`.
    scc: Vec<usize>,
    /// Per-constraint topological rank (rank of its SCC).
    rank: Vec<usize>,
    /// Constraint positions reading each κ.
    readers: HashMap<KVar, Vec<usize>>,
    /// Initial qualifier candidates per κ, in declaration order.
    initial: IndexMap<KVar, Vec<BoundQual>>,
    num_ranks: usize,
}

impl SolverInfo {
    pub fn build(query: Query) -> Result<Self, IrError> {
        let n = query.constraints.len();

        let mut seen_ids = HashMap::new();
        for (pos, c) in query.constraints.iter().enumerate() {
            if seen_ids.insert(c.id, pos).is_some() {
                return Err(IrError::DuplicateConstraint(c.id));
            }
        }

        let decls: HashMap<&KVar, &[(Symbol, Sort)]> = query
            .kvar_decls
            .iter()
            .map(|d| (&d.kvar, d.params.as_slice()))
            .collect();

        // Read/write sets per constraint; environment refinements count as
        // reads because the LHS assembler expands them.
        let mut writes: Vec<Vec<KVar>> = Vec::with_capacity(n);
        let mut reads: Vec<Vec<KVar>> = Vec::with_capacity(n);
        for c in &query.constraints {
            let ws: Vec<KVar> = c.writes().into_iter().cloned().collect();
            for k in &ws {
                if !decls.contains_key(k) {
                    return Err(IrError::UndeclaredKVar {
                        cid: c.id,
                        kvar: k.clone(),
                    });
                }
            }
            let mut rs: Vec<KVar> = c.lhs_reads().into_iter().cloned().collect();
            for bid in &c.env {
                let binding = query.binds.lookup(*bid)?;
                rs.extend(
                    binding
                        .refinement
                        .kvars()
                        .into_iter()
                        .map(|(k, _)| k.clone()),
                );
            }
            for k in &rs {
                if !decls.contains_key(k) {
                    return Err(IrError::UndeclaredKVar {
                        cid: c.id,
                        kvar: k.clone(),
                    });
                }
            }
            writes.push(ws);
            reads.push(rs);
        }

        let mut readers: HashMap<KVar, Vec<usize>> = HashMap::new();
        for (pos, rs) in reads.iter().enumerate() {
            for k in rs {
                let entry = readers.entry(k.clone()).or_default();
                if !entry.contains(&pos) {
                    entry.push(pos);
                }
            }
        }

        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..n).map(|pos| graph.add_node(pos)).collect();
        for (pos, ws) in writes.iter().enumerate() {
            for k in ws {
                if let Some(rds) = readers.get(k) {
                    for &r in rds {
                        graph.update_edge(nodes[pos], nodes[r], ());
                    }
                }
            }
        }

        // Tarjan emits SCCs in postorder (sinks first); invert so
        // dependencies get the low ranks.
        let sccs = tarjan_scc(&graph);
        let scc_count = sccs.len();
        let mut scc = vec![0usize; n];
        let mut rank = vec![0usize; n];
        for (i, component) in sccs.iter().enumerate() {
            for &node in component {
                let pos = graph[node];
                scc[pos] = i;
                rank[pos] = scc_count - 1 - i;
            }
        }

        let mut initial: IndexMap<KVar, Vec<BoundQual>> = IndexMap::new();
        for decl in &query.kvar_decls {
            let cands: Vec<BoundQual> = query
                .qualifiers
                .iter()
                .filter_map(|q| q.instantiate_for(&decl.params))
                .collect();
            initial.insert(decl.kvar.clone(), cands);
        }

        Ok(SolverInfo {
            query,
            scc,
            rank,
            readers,
            initial,
            num_ranks: scc_count,
        })
    }

    pub fn constraints(&self) -> &[SimpC] {
        &self.query.constraints
    }

    pub fn constraint(&self, pos: usize) -> &SimpC {
        &self.query.constraints[pos]
    }

    pub fn rank_of(&self, pos: usize) -> usize {
        self.rank[pos]
    }

    pub fn scc_of(&self, pos: usize) -> usize {
        self.scc[pos]
    }

    /// Positions of the constraints whose LHS reads `k`.
    pub fn readers_of(&self, k: &KVar) -> &[usize] {
        self.readers.get(k).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct SCC ranks; the worklist iteration-budget hint.
    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    /// Initial candidate binds: every qualifier instantiation that
    /// sort-checks against each κ's formals.
    pub fn initial_binds(&self) -> &IndexMap<KVar, Vec<BoundQual>> {
        &self.initial
    }

    pub fn kvar_params(&self, k: &KVar) -> Option<&[(Symbol, Sort)]> {
        self.query
            .kvar_decls
            .iter()
            .find(|d| &d.kvar == k)
            .map(|d| d.params.as_slice())
    }
}
