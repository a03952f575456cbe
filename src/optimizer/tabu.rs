use super::{candidate_moves, BestSeen, Evaluator, SearchOutcome, SearchStrategy, IMPROVEMENT_EPS};
use crate::diagnostics::CostLog;
use std::collections::VecDeque;

/// Tabu search over single flips, optionally extended with replace moves.
///
/// Every iteration applies the best admissible move even when it worsens the
/// cost. Hypotheses touched by the last `tenure` moves are tabu unless the
/// move would beat the best cost seen so far (aspiration). The run ends after
/// `max_iterations` moves, after `stall_iterations` moves without a new best,
/// or when no admissible move is left.
#[derive(Clone, Debug)]
pub struct TabuSearch {
    pub use_replace_moves: bool,
    pub tenure: usize,
    pub stall_iterations: usize,
    tabu: VecDeque<usize>,
}

impl TabuSearch {
    pub fn new(use_replace_moves: bool, tenure: usize, stall_iterations: usize) -> Self {
        Self {
            use_replace_moves,
            tenure,
            stall_iterations,
            tabu: VecDeque::with_capacity(tenure + 2),
        }
    }

    fn is_tabu(&self, h: usize) -> bool {
        self.tabu.contains(&h)
    }

    fn push_tabu(&mut self, h: usize) {
        self.tabu.push_back(h);
        while self.tabu.len() > self.tenure {
            self.tabu.pop_front();
        }
    }
}

impl SearchStrategy for TabuSearch {
    fn name(&self) -> &'static str {
        if self.use_replace_moves {
            "tabu_search_replace"
        } else {
            "tabu_search"
        }
    }

    fn optimize(
        &mut self,
        eval: &mut dyn Evaluator,
        max_iterations: usize,
        log: &mut CostLog,
    ) -> SearchOutcome {
        self.tabu.clear();
        let mut best = BestSeen::new(eval);
        let mut moves = Vec::new();
        let mut iterations = 0;
        let mut evaluations = 0;
        let mut stall = 0;

        while iterations < max_iterations && stall < self.stall_iterations {
            candidate_moves(eval, self.use_replace_moves, &mut moves);
            let current = eval.cost();
            let mut chosen = None;
            let mut chosen_delta = f64::INFINITY;
            for &mv in &moves {
                let d = eval.delta(mv);
                evaluations += 1;
                if !d.is_finite() {
                    continue;
                }
                let aspiration = current + d < best.cost() - IMPROVEMENT_EPS;
                if mv.hypotheses().any(|h| self.is_tabu(h)) && !aspiration {
                    continue;
                }
                if d < chosen_delta {
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
            for h in mv.hypotheses() {
                self.push_tabu(h);
            }
            if best.offer(eval) {
                stall = 0;
            } else {
                stall += 1;
            }
        }

        log::debug!(
            "{} finished iterations={} evaluations={} cost={:.4}",
            self.name(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{CostModel, CostWeights};
    use crate::optimizer::{testing, Move};

    #[test]
    fn accepts_worsening_moves_but_returns_best_seen() {
        let problem = testing::good_bad_twin();
        let mut model = CostModel::new(&problem, CostWeights::default());
        let mut tabu = TabuSearch::new(false, 5, 50);
        let mut log = CostLog::new(0, true);
        let out = tabu.optimize(&mut model, 100, &mut log);
        assert!(out.iterations > 1, "tabu should keep moving past the first optimum");
        assert!((out.best.cost + 8.0).abs() < 1e-12);
        assert_eq!(out.best.active.iter().filter(|a| **a).count(), 1);
        assert!(!out.best.active[1]);
        // the log records worsening steps too
        assert!(log.entries().iter().any(|e| e.cost > -8.0 + 1e-9));
    }

    #[test]
    fn replace_variant_escapes_trap() {
        let problem = testing::replace_trap();
        let mut model = CostModel::new(&problem, CostWeights::default());
        model.apply(Move::Activate(0));
        let mut tabu = TabuSearch::new(true, 1, 10);
        let out = tabu.optimize(&mut model, 100, &mut CostLog::disabled());
        assert_eq!(out.best.active, vec![false, true]);
        assert_eq!(tabu.name(), "tabu_search_replace");
    }

    #[test]
    fn stops_after_stall_limit() {
        let problem = testing::good_bad_twin();
        let mut model = CostModel::new(&problem, CostWeights::default());
        let mut tabu = TabuSearch::new(false, 0, 3);
        let out = tabu.optimize(&mut model, 1000, &mut CostLog::disabled());
        assert!(out.iterations <= 1 + 3 + 1);
        assert!((out.best.cost + 8.0).abs() < 1e-12);
    }
}
