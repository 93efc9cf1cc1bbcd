use hornet_ir::Expr;

use crate::error::SmtError;
use crate::session::{SatResult, SmtSession};

/// The narrow validity interface between the fixpoint engine and the SMT
/// session. `filter_valid(lhs, cands)` keeps exactly the candidates `p`
/// with `lhs ⇒ p` valid; `is_valid` is the single-candidate special case.
pub trait Oracle {
    fn filter_valid<T>(
        &mut self,
        lhs: &Expr,
        cands: Vec<(Expr, T)>,
    ) -> Result<Vec<(Expr, T)>, SmtError>;

    fn is_valid(&mut self, p: &Expr, q: &Expr) -> Result<bool, SmtError> {
        let kept = self.filter_valid(p, vec![(q.clone(), ())])?;
        Ok(!kept.is_empty())
    }
}

/// The production oracle: one outer bracket per call asserting the LHS,
/// one inner bracket per candidate asserting its negation. A candidate is
/// valid iff the combined query is unsatisfiable.
pub struct SmtOracle<'a> {
    session: &'a mut SmtSession,
}

impl<'a> SmtOracle<'a> {
    pub fn new(session: &'a mut SmtSession) -> Self {
        SmtOracle { session }
    }

    pub fn session(&mut self) -> &mut SmtSession {
        self.session
    }
}

impl Oracle for SmtOracle<'_> {
    fn filter_valid<T>(
        &mut self,
        lhs: &Expr,
        cands: Vec<(Expr, T)>,
    ) -> Result<Vec<(Expr, T)>, SmtError> {
        if cands.is_empty() {
            return Ok(Vec::new());
        }
        self.session.bracket("filter-valid", |s| {
            s.assert_pred(lhs)?;
            let mut kept = Vec::with_capacity(cands.len());
            for (p, tag) in cands {
                let unsat = s.bracket("candidate", |s| {
                    s.assert_pred(&p.clone().not())?;
                    Ok(s.check_sat()? == SatResult::Unsat)
                })?;
                if unsat {
                    kept.push((p, tag));
                }
            }
            Ok(kept)
        })
    }
}
