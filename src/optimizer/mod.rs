//! Move-based search over the activation vector of one conflict component.
//!
//! Overview
//! - [`Evaluator`] is the only view a strategy has of the problem: cost,
//!   read-only move deltas, move application and snapshot / restore.
//! - [`SearchStrategy`] implementations are interchangeable:
//!   [`LocalSearch`], [`TabuSearch`] (with or without replace moves) and
//!   [`SimulatedAnnealing`].
//! - [`run_component`] seeds the initial state, short-circuits components
//!   with fewer than two hypotheses, runs the strategy and leaves the
//!   evaluator in the best state seen.
//!
//! Notes
//! - Moves with a non-finite delta are never applied.
//! - `best_seen` only changes on a strictly lower cost.

mod annealing;
mod local_search;
mod tabu;

pub use annealing::SimulatedAnnealing;
pub use local_search::LocalSearch;
pub use tabu::TabuSearch;

use crate::cost::CostTotals;
use crate::diagnostics::CostLog;
use crate::verifier::GhvParams;
use serde::{Deserialize, Serialize};

/// Minimum decrease treated as an improvement by the greedy strategies.
pub(crate) const IMPROVEMENT_EPS: f64 = 1e-9;

/// Elementary change of the activation vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
    Activate(usize),
    Deactivate(usize),
    /// Swap an active hypothesis for a conflicting inactive one in one step.
    Replace { deactivate: usize, activate: usize },
}

impl Move {
    /// Flip of `h` given its current state.
    pub fn toggle(h: usize, active: bool) -> Self {
        if active {
            Move::Deactivate(h)
        } else {
            Move::Activate(h)
        }
    }

    /// Hypothesis reported in the cost log.
    pub fn primary(self) -> usize {
        match self {
            Move::Activate(h) | Move::Deactivate(h) => h,
            Move::Replace { activate, .. } => activate,
        }
    }

    pub fn involves(self, h: usize) -> bool {
        match self {
            Move::Activate(x) | Move::Deactivate(x) => x == h,
            Move::Replace {
                deactivate,
                activate,
            } => deactivate == h || activate == h,
        }
    }

    pub fn hypotheses(self) -> impl Iterator<Item = usize> {
        let (a, b) = match self {
            Move::Activate(h) | Move::Deactivate(h) => (h, None),
            Move::Replace {
                deactivate,
                activate,
            } => (deactivate, Some(activate)),
        };
        std::iter::once(a).chain(b)
    }
}

/// Owned copy of an activation state and its cost.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    pub active: Vec<bool>,
    pub totals: CostTotals,
    pub cost: f64,
}

/// Cost oracle driven by the search strategies.
pub trait Evaluator {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_active(&self, h: usize) -> bool;

    fn cost(&self) -> f64;

    /// Cost change `move` would cause. Leaves the observable state unchanged.
    fn delta(&mut self, mv: Move) -> f64;

    fn apply(&mut self, mv: Move);

    fn snapshot(&self) -> Solution;

    fn restore(&mut self, solution: &Solution);

    /// Hypotheses that compete with `h` for scene points or occupancy cells.
    fn conflicts(&self, h: usize) -> &[usize];
}

/// Result of one strategy run.
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    pub best: Solution,
    pub iterations: usize,
    pub evaluations: usize,
}

/// A search strategy over the activation vector.
pub trait SearchStrategy {
    fn name(&self) -> &'static str;

    fn optimize(
        &mut self,
        eval: &mut dyn Evaluator,
        max_iterations: usize,
        log: &mut CostLog,
    ) -> SearchOutcome;
}

/// Strategy selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerType {
    #[default]
    LocalSearch,
    TabuSearch,
    TabuSearchReplace,
    SimulatedAnnealing,
}

/// Build the configured strategy for component `component`.
pub fn strategy_for(params: &GhvParams, component: usize) -> Box<dyn SearchStrategy + Send> {
    match params.optimizer {
        OptimizerType::LocalSearch => Box::new(LocalSearch {
            use_replace_moves: params.use_replace_moves,
        }),
        OptimizerType::TabuSearch => Box::new(TabuSearch::new(
            false,
            params.tabu_tenure,
            params.tabu_stall_iterations,
        )),
        OptimizerType::TabuSearchReplace => Box::new(TabuSearch::new(
            true,
            params.tabu_tenure,
            params.tabu_stall_iterations,
        )),
        OptimizerType::SimulatedAnnealing => Box::new(SimulatedAnnealing {
            initial_temperature: params.initial_temperature,
            cooling_rate: params.cooling_rate,
            seed: params.seed.wrapping_add(component as u64),
        }),
    }
}

/// Lowest-cost state observed during a run.
pub struct BestSeen {
    solution: Solution,
}

impl BestSeen {
    pub fn new(eval: &dyn Evaluator) -> Self {
        Self {
            solution: eval.snapshot(),
        }
    }

    /// Record the current state if it is strictly better.
    pub fn offer(&mut self, eval: &dyn Evaluator) -> bool {
        let cost = eval.cost();
        if cost < self.solution.cost {
            self.solution = eval.snapshot();
            true
        } else {
            false
        }
    }

    pub fn cost(&self) -> f64 {
        self.solution.cost
    }

    pub fn into_solution(self) -> Solution {
        self.solution
    }
}

/// Flips of every hypothesis plus, optionally, replace moves between an
/// active hypothesis and each inactive conflicting one.
pub fn candidate_moves(eval: &dyn Evaluator, use_replace: bool, out: &mut Vec<Move>) {
    out.clear();
    for h in 0..eval.len() {
        out.push(Move::toggle(h, eval.is_active(h)));
    }
    if use_replace {
        for h in 0..eval.len() {
            if !eval.is_active(h) {
                continue;
            }
            for &j in eval.conflicts(h) {
                if !eval.is_active(j) {
                    out.push(Move::Replace {
                        deactivate: h,
                        activate: j,
                    });
                }
            }
        }
    }
}

/// Summary of a component optimization.
#[derive(Clone, Debug)]
pub struct ComponentRun {
    pub solution: Solution,
    pub initial_cost: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

/// Optimize one component and leave `eval` in the best state found.
pub fn run_component(
    eval: &mut dyn Evaluator,
    strategy: &mut dyn SearchStrategy,
    initial_status: bool,
    max_iterations: usize,
    log: &mut CostLog,
) -> ComponentRun {
    if initial_status {
        for h in 0..eval.len() {
            eval.apply(Move::Activate(h));
        }
    }
    let initial_cost = eval.cost();

    match eval.len() {
        0 => ComponentRun {
            solution: eval.snapshot(),
            initial_cost,
            iterations: 0,
            evaluations: 0,
        },
        1 => {
            let active = eval.is_active(0);
            let d = eval.delta(Move::toggle(0, active));
            let (cost_on, cost_off) = if active {
                (initial_cost, initial_cost + d)
            } else {
                (initial_cost + d, initial_cost)
            };
            let want_on = cost_on < cost_off;
            let mut iterations = 0;
            if want_on != active {
                eval.apply(Move::toggle(0, active));
                iterations = 1;
                log.record(1, eval.cost(), 0);
            }
            ComponentRun {
                solution: eval.snapshot(),
                initial_cost,
                iterations,
                evaluations: 1,
            }
        }
        _ => {
            let outcome = strategy.optimize(eval, max_iterations, log);
            eval.restore(&outcome.best);
            ComponentRun {
                solution: outcome.best,
                initial_cost,
                iterations: outcome.iterations,
                evaluations: outcome.evaluations,
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{CostModel, CostWeights};

    #[test]
    fn single_hypothesis_component_compares_both_states() {
        let mut problem = testing::good_bad_twin();
        problem.hypotheses.truncate(1);
        problem.conflicts = vec![vec![]];
        let mut model = CostModel::new(&problem, CostWeights::default());
        let mut strategy = LocalSearch {
            use_replace_moves: false,
        };
        let run = run_component(&mut model, &mut strategy, false, 10, &mut CostLog::disabled());
        assert_eq!(run.solution.active, vec![true]);
        assert!((run.solution.cost + 8.0).abs() < 1e-12);

        // a hypothesis that only adds cost is switched off from an all-active start
        let mut problem = testing::good_bad_twin();
        problem.hypotheses.swap(0, 1);
        problem.hypotheses.truncate(1);
        problem.conflicts = vec![vec![]];
        let mut model = CostModel::new(&problem, CostWeights::default());
        let run = run_component(&mut model, &mut strategy, true, 10, &mut CostLog::disabled());
        assert_eq!(run.solution.active, vec![false]);
    }

    #[test]
    fn replace_moves_only_pair_active_with_inactive_conflicts() {
        let problem = testing::good_bad_twin();
        let mut model = CostModel::new(&problem, CostWeights::default());
        model.apply(Move::Activate(0));
        let mut moves = Vec::new();
        candidate_moves(&model, true, &mut moves);
        assert_eq!(moves.len(), 3 + 2);
        assert!(moves.contains(&Move::Replace {
            deactivate: 0,
            activate: 2
        }));
        candidate_moves(&model, false, &mut moves);
        assert_eq!(moves.len(), 3);
    }

    #[test]
    fn move_helpers() {
        let mv = Move::Replace {
            deactivate: 3,
            activate: 7,
        };
        assert_eq!(mv.primary(), 7);
        assert!(mv.involves(3) && mv.involves(7) && !mv.involves(1));
        assert_eq!(mv.hypotheses().collect::<Vec<_>>(), vec![3, 7]);
        assert_eq!(Move::toggle(2, true), Move::Deactivate(2));
    }
}
