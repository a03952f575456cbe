use super::{BestSeen, Evaluator, Move, SearchOutcome, SearchStrategy};
use crate::diagnostics::CostLog;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MIN_TEMPERATURE: f64 = 1e-12;

/// Simulated annealing with random single-flip proposals and geometric
/// cooling. A worsening move is accepted with probability `exp(-Δ/T)`.
#[derive(Clone, Debug)]
pub struct SimulatedAnnealing {
    pub initial_temperature: f64,
    pub cooling_rate: f64,
    pub seed: u64,
}

impl SearchStrategy for SimulatedAnnealing {
    fn name(&self) -> &'static str {
        "simulated_annealing"
    }

    fn optimize(
        &mut self,
        eval: &mut dyn Evaluator,
        max_iterations: usize,
        log: &mut CostLog,
    ) -> SearchOutcome {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best = BestSeen::new(eval);
        let mut temperature = self.initial_temperature.max(MIN_TEMPERATURE);
        let mut evaluations = 0;
        let n = eval.len();

        for iteration in 1..=max_iterations {
            if n == 0 {
                break;
            }
            let h = rng.gen_range(0..n);
            let mv = Move::toggle(h, eval.is_active(h));
            let d = eval.delta(mv);
            evaluations += 1;
            if d.is_finite() {
                let accept = d <= 0.0 || rng.gen::<f64>() < (-d / temperature).exp();
                if accept {
                    eval.apply(mv);
                    log.record(iteration, eval.cost(), mv.primary());
                    best.offer(eval);
                }
            }
            temperature = (temperature * self.cooling_rate).max(MIN_TEMPERATURE);
        }

        log::debug!(
            "SimulatedAnnealing finished seed={} evaluations={} final_temperature={:.3e} cost={:.4}",
            self.seed,
            evaluations,
            temperature,
            best.cost()
        );
        SearchOutcome {
            best: best.into_solution(),
            iterations: evaluations,
            evaluations,
        }
    }
}
