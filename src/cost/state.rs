use super::{CostProblem, CostTotals, CostWeights};
use crate::optimizer::{Evaluator, Move, Solution};
use smallvec::SmallVec;

/// Mutable counters of one local scene point.
#[derive(Clone, Debug, Default, PartialEq)]
struct PointState {
    count: u32,
    /// Active explainers with their scores.
    explainers: SmallVec<[(u32, f64); 4]>,
    sum: f64,
    /// Number of active hypotheses with this point in their clutter set.
    clutter_count: u32,
    unexplained: f64,
}

#[derive(Clone, Copy, Debug, Default)]
struct PointTerms {
    explained: f64,
    duplicity: f64,
    clutter: f64,
}

impl PointState {
    fn best(&self) -> f64 {
        self.best_without(None)
    }

    /// Highest score among active explainers, optionally ignoring one.
    fn best_without(&self, skip: Option<u32>) -> f64 {
        self.explainers
            .iter()
            .filter(|(o, _)| Some(*o) != skip)
            .fold(0.0_f64, |acc, &(_, s)| acc.max(s))
    }

    fn terms(&self, dup_weight: f64, w: &CostWeights) -> PointTerms {
        point_terms(self.count, self.best(), self.sum, self.unexplained, dup_weight, w)
    }

    /// Terms after toggling hypothesis `h` with `score`, without mutating.
    fn terms_after(&self, h: u32, score: f64, on: bool, dup_weight: f64, w: &CostWeights) -> PointTerms {
        let (count, best, sum) = if on {
            (self.count + 1, self.best().max(score), self.sum + score)
        } else {
            (self.count.saturating_sub(1), self.best_without(Some(h)), self.sum - score)
        };
        point_terms(count, best, sum, self.unexplained, dup_weight, w)
    }
}

fn point_terms(count: u32, best: f64, sum: f64, unexplained: f64, dup_weight: f64, w: &CostWeights) -> PointTerms {
    if count == 0 {
        return PointTerms {
            clutter: unexplained,
            ..Default::default()
        };
    }
    let multiplicity = if w.penalize_duplicates_once { 1.0 } else { (count - 1) as f64 };
    PointTerms {
        explained: w.aggregation.combine(best, sum),
        duplicity: if count > 1 { dup_weight * multiplicity } else { 0.0 },
        clutter: 0.0,
    }
}

fn cell_excess(occupancy: u32) -> f64 {
    occupancy.saturating_sub(1) as f64
}

/// Incremental cost evaluator of one component.
pub struct CostModel<'a> {
    problem: &'a CostProblem,
    weights: CostWeights,
    points: Vec<PointState>,
    occupancy: Vec<u32>,
    active: Vec<bool>,
    totals: CostTotals,
}

impl<'a> CostModel<'a> {
    /// All hypotheses start inactive with zero totals.
    pub fn new(problem: &'a CostProblem, weights: CostWeights) -> Self {
        Self {
            problem,
            weights,
            points: vec![PointState::default(); problem.num_points()],
            occupancy: vec![0; problem.num_cells],
            active: vec![false; problem.hypotheses.len()],
            totals: CostTotals::default(),
        }
    }

    pub fn totals(&self) -> CostTotals {
        self.totals
    }

    pub fn weights(&self) -> &CostWeights {
        &self.weights
    }

    pub fn active(&self) -> &[bool] {
        &self.active
    }

    pub fn explained_count(&self, point: usize) -> u32 {
        self.points[point].count
    }

    pub fn explained_counts(&self) -> Vec<u32> {
        self.points.iter().map(|p| p.count).collect()
    }

    pub fn occupancy(&self) -> &[u32] {
        &self.occupancy
    }

    fn toggle(&mut self, h: usize, on: bool) {
        if self.active[h] == on {
            return;
        }
        self.update_explained(h, on);
        self.update_unexplained(h, on);
        self.update_cm_duplicity(h, on);
        let terms = &self.problem.hypotheses[h];
        if on {
            self.totals.bad_info += terms.bad_info;
            self.totals.active += 1;
        } else {
            self.totals.bad_info -= terms.bad_info;
            self.totals.active -= 1;
        }
        self.active[h] = on;
    }

    fn update_explained(&mut self, h: usize, on: bool) {
        let problem = self.problem;
        let w = self.weights;
        for &(p, score) in &problem.hypotheses[h].explained {
            let dup_weight = problem.duplicity_weights[p as usize];
            let st = &mut self.points[p as usize];
            let before = st.terms(dup_weight, &w);
            if on {
                st.count += 1;
                st.explainers.push((h as u32, score));
                st.sum += score;
            } else {
                st.count = st.count.saturating_sub(1);
                st.explainers.retain(|(o, _)| *o != h as u32);
                st.sum -= score;
                if st.count == 0 {
                    st.sum = 0.0;
                }
            }
            let after = st.terms(dup_weight, &w);
            self.totals.explained += after.explained - before.explained;
            self.totals.duplicity += after.duplicity - before.duplicity;
            self.totals.clutter += after.clutter - before.clutter;
        }
    }

    fn update_unexplained(&mut self, h: usize, on: bool) {
        let problem = self.problem;
        for &(p, weight) in &problem.hypotheses[h].clutter {
            let st = &mut self.points[p as usize];
            let before = if st.count == 0 { st.unexplained } else { 0.0 };
            if on {
                st.clutter_count += 1;
                st.unexplained += weight;
            } else {
                st.clutter_count = st.clutter_count.saturating_sub(1);
                st.unexplained -= weight;
                if st.clutter_count == 0 {
                    st.unexplained = 0.0;
                }
            }
            let after = if st.count == 0 { st.unexplained } else { 0.0 };
            self.totals.clutter += after - before;
        }
    }

    fn update_cm_duplicity(&mut self, h: usize, on: bool) {
        let problem = self.problem;
        for &c in &problem.hypotheses[h].cells {
            let occ = &mut self.occupancy[c as usize];
            let before = cell_excess(*occ);
            if on {
                *occ += 1;
            } else {
                *occ = occ.saturating_sub(1);
            }
            self.totals.cm_duplicity += cell_excess(*occ) - before;
        }
    }

    /// Cost change of toggling `h`, computed without touching any state.
    fn toggle_delta(&self, h: usize, on: bool) -> f64 {
        if self.active[h] == on {
            return 0.0;
        }
        let w = &self.weights;
        let terms = &self.problem.hypotheses[h];
        let (mut d_explained, mut d_duplicity, mut d_clutter, mut d_cells) = (0.0, 0.0, 0.0, 0.0);

        for &(p, score) in &terms.explained {
            let dup_weight = self.problem.duplicity_weights[p as usize];
            let st = &self.points[p as usize];
            let before = st.terms(dup_weight, w);
            let after = st.terms_after(h as u32, score, on, dup_weight, w);
            d_explained += after.explained - before.explained;
            d_duplicity += after.duplicity - before.duplicity;
            d_clutter += after.clutter - before.clutter;
        }
        for &(p, weight) in &terms.clutter {
            if self.points[p as usize].count == 0 {
                d_clutter += if on { weight } else { -weight };
            }
        }
        for &c in &terms.cells {
            let occ = self.occupancy[c as usize];
            let after = if on { occ + 1 } else { occ.saturating_sub(1) };
            d_cells += cell_excess(after) - cell_excess(occ);
        }

        let sign = if on { 1.0 } else { -1.0 };
        -d_explained
            + w.regularizer * d_duplicity
            + w.clutter_regularizer * d_clutter
            + sign * terms.bad_info
            + sign * w.active_hypothesis_penalty
            + w.cm_duplicity_weight * d_cells
    }

    /// Totals rebuilt from the activation vector alone.
    pub fn recompute(&self) -> CostTotals {
        let problem = self.problem;
        let mut points = vec![PointState::default(); problem.num_points()];
        let mut occupancy = vec![0u32; problem.num_cells];
        let mut totals = CostTotals::default();

        for (h, terms) in problem.hypotheses.iter().enumerate() {
            if !self.active[h] {
                continue;
            }
            for &(p, score) in &terms.explained {
                let st = &mut points[p as usize];
                st.count += 1;
                st.explainers.push((h as u32, score));
                st.sum += score;
            }
            for &(p, weight) in &terms.clutter {
                points[p as usize].unexplained += weight;
            }
            for &c in &terms.cells {
                occupancy[c as usize] += 1;
            }
            totals.bad_info += terms.bad_info;
            totals.active += 1;
        }

        for (p, st) in points.iter().enumerate() {
            let t = st.terms(problem.duplicity_weights[p], &self.weights);
            totals.explained += t.explained;
            totals.duplicity += t.duplicity;
            totals.clutter += t.clutter;
        }
        totals.cm_duplicity = occupancy.iter().map(|&o| cell_excess(o)).sum();
        totals
    }
}

impl Evaluator for CostModel<'_> {
    fn len(&self) -> usize {
        self.active.len()
    }

    fn is_active(&self, h: usize) -> bool {
        self.active[h]
    }

    fn cost(&self) -> f64 {
        self.totals.cost(&self.weights)
    }

    fn delta(&mut self, mv: Move) -> f64 {
        match mv {
            Move::Activate(h) => self.toggle_delta(h, true),
            Move::Deactivate(h) => self.toggle_delta(h, false),
            Move::Replace {
                deactivate,
                activate,
            } => {
                if !self.active[deactivate] || self.active[activate] {
                    return f64::INFINITY;
                }
                let saved = self.totals;
                let before = self.cost();
                self.toggle(deactivate, false);
                let after = self.cost() + self.toggle_delta(activate, true);
                self.toggle(deactivate, true);
                self.totals = saved;
                after - before
            }
        }
    }

    fn apply(&mut self, mv: Move) {
        match mv {
            Move::Activate(h) => self.toggle(h, true),
            Move::Deactivate(h) => self.toggle(h, false),
            Move::Replace {
                deactivate,
                activate,
            } => {
                self.toggle(deactivate, false);
                self.toggle(activate, true);
            }
        }
    }

    fn snapshot(&self) -> Solution {
        Solution {
            active: self.active.clone(),
            totals: self.totals,
            cost: self.cost(),
        }
    }

    fn restore(&mut self, solution: &Solution) {
        for h in 0..self.active.len() {
            if self.active[h] && !solution.active[h] {
                self.toggle(h, false);
            }
        }
        for h in 0..self.active.len() {
            if !self.active[h] && solution.active[h] {
                self.toggle(h, true);
            }
        }
        self.totals = solution.totals;
    }

    fn conflicts(&self, h: usize) -> &[usize] {
        &self.problem.conflicts[h]
    }
}
