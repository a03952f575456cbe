use super::{candidate_moves, BestSeen, Evaluator, SearchOutcome, SearchStrategy, IMPROVEMENT_EPS};
use crate::diagnostics::CostLog;

/// Steepest descent: apply the best strictly improving move until none is left.
#[derive(Clone, Debug)]
pub struct LocalSearch {
    pub use_replace_moves: bool,
}

impl SearchStrategy for LocalSearch {
    fn name(&self) -> &'static str {
        "local_search"
    }

    fn optimize(
        &mut self,
        eval: &mut dyn Evaluator,
        max_iterations: usize,
        log: &mut CostLog,
    ) -> SearchOutcome {
        let mut best = BestSeen::new(eval);
        let mut moves = Vec::new();
        let mut iterations = 0;
        let mut evaluations = 0;

        while iterations < max_iterations {
            candidate_moves(eval, self.use_replace_moves, &mut moves);
            let mut chosen = None;
            let mut chosen_delta = -IMPROVEMENT_EPS;
            for &mv in &moves {
                let d = eval.delta(mv);
                evaluations += 1;
                if d.is_finite() && d < chosen_delta {
                    chosen = Some(mv);
                    chosen_delta = d;
                }
            }
            let Some(mv) = chosen else {
                break;
            };
            eval.apply(mv);
            iterations += 1;
            log.record(iterations, eval.cost(), mv.primary());
            best.offer(eval);
        }

        log::debug!(
            "LocalSearch finished iterations={} evaluations={} cost={:.4}",
            iterations,
            evaluations,
            best.cost()
        );
        SearchOutcome {
            best: best.into_solution(),
            iterations,
            evaluations,
        }
    }
}
