//! Conflict graph over hypotheses and its connected components.
//!
//! Two hypotheses are linked when they explain a common scene point, when
//! one explains a point that lies in the other's clutter neighbourhood, or
//! when they are instances of the same model covering a common occupancy
//! cell. Components never influence each other's cost and are optimized
//! independently.
use crate::cost::{CostProblem, HypothesisTerms};
use crate::model::RecognitionModel;
use crate::scene::SceneModel;
use std::collections::HashMap;

/// Disjoint-set forest with path halving and union by size.
#[derive(Clone, Debug)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }
}

/// Connected components of the conflict graph. Members are sorted and
/// components are ordered by their smallest member.
pub fn conflict_components(models: &[RecognitionModel], num_scene_points: usize, num_cells: usize) -> Vec<Vec<usize>> {
    let mut uf = UnionFind::new(models.len());

    let mut first_explainer: Vec<Option<usize>> = vec![None; num_scene_points];
    for (h, m) in models.iter().enumerate() {
        for &p in &m.explained {
            match first_explainer[p as usize] {
                Some(other) => {
                    uf.union(h, other);
                }
                None => first_explainer[p as usize] = Some(h),
            }
        }
    }
    for (h, m) in models.iter().enumerate() {
        for &p in &m.clutter {
            if let Some(other) = first_explainer[p as usize] {
                uf.union(h, other);
            }
        }
    }
    let mut first_occupant: Vec<Option<usize>> = vec![None; num_cells];
    for (h, m) in models.iter().enumerate() {
        for &c in &m.occupied_cells {
            match first_occupant[c as usize] {
                Some(other) => {
                    uf.union(h, other);
                }
                None => first_occupant[c as usize] = Some(h),
            }
        }
    }

    let mut by_root: HashMap<usize, usize> = HashMap::new();
    let mut components: Vec<Vec<usize>> = Vec::new();
    for h in 0..models.len() {
        let root = uf.find(h);
        let slot = *by_root.entry(root).or_insert_with(|| {
            components.push(Vec::new());
            components.len() - 1
        });
        components[slot].push(h);
    }
    components
}

/// Cost problem of one component with its own dense copy of the scene
/// points and cells it touches.
pub struct LocalProblem {
    /// Global hypothesis id per local hypothesis.
    pub members: Vec<usize>,
    /// Scene index per local point.
    pub scene_points: Vec<u32>,
    pub cost: CostProblem,
}

pub fn extract_problem(members: &[usize], models: &[RecognitionModel], scene: &SceneModel) -> LocalProblem {
    let mut point_ids: HashMap<u32, u32> = HashMap::new();
    let mut scene_points: Vec<u32> = Vec::new();
    let mut cell_ids: HashMap<u32, u32> = HashMap::new();

    let mut local = |p: u32, point_ids: &mut HashMap<u32, u32>| -> u32 {
        *point_ids.entry(p).or_insert_with(|| {
            scene_points.push(p);
            (scene_points.len() - 1) as u32
        })
    };

    let mut hypotheses = Vec::with_capacity(members.len());
    for &g in members {
        let m = &models[g];
        let explained = m
            .explained
            .iter()
            .zip(&m.explained_scores)
            .map(|(&p, &s)| (local(p, &mut point_ids), s))
            .collect();
        let clutter = m
            .clutter
            .iter()
            .zip(&m.clutter_weights)
            .map(|(&p, &w)| (local(p, &mut point_ids), w))
            .collect();
        let cells = m
            .occupied_cells
            .iter()
            .map(|&c| {
                let next = cell_ids.len() as u32;
                *cell_ids.entry(c).or_insert(next)
            })
            .collect();
        hypotheses.push(HypothesisTerms {
            explained,
            clutter,
            bad_info: m.bad_info_cost(),
            cells,
        });
    }

    let duplicity_weights = scene_points
        .iter()
        .map(|&p| scene.records[p as usize].duplicity_weight)
        .collect();
    let conflicts = local_adjacency(&hypotheses, scene_points.len(), cell_ids.len());

    LocalProblem {
        members: members.to_vec(),
        scene_points,
        cost: CostProblem {
            hypotheses,
            duplicity_weights,
            num_cells: cell_ids.len(),
            conflicts,
        },
    }
}

/// Index-based adjacency: hypotheses sharing an explained point or an
/// occupancy cell compete directly.
fn local_adjacency(hypotheses: &[HypothesisTerms], num_points: usize, num_cells: usize) -> Vec<Vec<usize>> {
    let mut by_point: Vec<Vec<usize>> = vec![Vec::new(); num_points];
    let mut by_cell: Vec<Vec<usize>> = vec![Vec::new(); num_cells];
    for (h, terms) in hypotheses.iter().enumerate() {
        for &(p, _) in &terms.explained {
            by_point[p as usize].push(h);
        }
        for &c in &terms.cells {
            by_cell[c as usize].push(h);
        }
    }
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); hypotheses.len()];
    for group in by_point.iter().chain(&by_cell) {
        for (i, &a) in group.iter().enumerate() {
            for &b in &group[i + 1..] {
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
        }
    }
    for list in &mut adjacency {
        list.sort_unstable();
        list.dedup();
    }
    adjacency
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HypothesisKind;

    fn model(explained: &[u32], clutter: &[u32], cells: &[u32]) -> RecognitionModel {
        RecognitionModel {
            model_id: "m".into(),
            kind: HypothesisKind::Object,
            explained: explained.to_vec(),
            explained_scores: vec![1.0; explained.len()],
            clutter: clutter.to_vec(),
            clutter_weights: vec![0.5; clutter.len()],
            outlier_points: Vec::new(),
            bad_information: 0.0,
            outlier_weight: 1.0,
            occupied_cells: cells.to_vec(),
            visible_points: explained.len(),
        }
    }

    #[test]
    fn union_find_merges_sets() {
        let mut uf = UnionFind::new(4);
        assert!(uf.union(0, 1));
        assert!(uf.union(2, 3));
        assert!(!uf.union(1, 0));
        assert_eq!(uf.find(0), uf.find(1));
        assert_ne!(uf.find(1), uf.find(2));
    }

    #[test]
    fn components_follow_shared_points_clutter_and_cells() {
        let models = vec![
            model(&[0, 1], &[], &[]),
            model(&[1, 2], &[], &[]),
            model(&[5], &[6], &[]),
            model(&[6], &[], &[]),
            model(&[8], &[], &[0]),
            model(&[9], &[], &[0]),
            model(&[10], &[], &[]),
        ];
        let comps = conflict_components(&models, 11, 1);
        assert_eq!(comps, vec![vec![0, 1], vec![2, 3], vec![4, 5], vec![6]]);
    }

    #[test]
    fn clutter_without_explainer_does_not_link() {
        let models = vec![model(&[0], &[3], &[]), model(&[1], &[3], &[])];
        let comps = conflict_components(&models, 4, 0);
        assert_eq!(comps.len(), 2);
    }

    #[test]
    fn local_adjacency_links_direct_competitors() {
        let terms = |e: &[u32], c: &[u32]| HypothesisTerms {
            explained: e.iter().map(|&p| (p, 1.0)).collect(),
            clutter: vec![],
            bad_info: 0.0,
            cells: c.to_vec(),
        };
        let hyps = vec![terms(&[0, 1], &[]), terms(&[1], &[]), terms(&[2], &[0]), terms(&[3], &[0])];
        let adj = local_adjacency(&hyps, 4, 1);
        assert_eq!(adj[0], vec![1]);
        assert_eq!(adj[1], vec![0]);
        assert_eq!(adj[2], vec![3]);
    }
}
