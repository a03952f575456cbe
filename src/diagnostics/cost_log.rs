use serde::Serialize;

/// One accepted move of a search strategy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostLogEntry {
    pub component: usize,
    pub iteration: usize,
    /// Cost of the component after the move. The global cost is the sum
    /// over components and is reported as `final_cost`.
    pub cost: f64,
    /// Toggled hypothesis; local to the component until the verifier remaps it.
    pub toggled: usize,
}

/// Per-component recorder of accepted moves. Disabled logs drop everything.
#[derive(Clone, Debug, Default)]
pub struct CostLog {
    component: usize,
    enabled: bool,
    entries: Vec<CostLogEntry>,
}

impl CostLog {
    pub fn new(component: usize, enabled: bool) -> Self {
        Self {
            component,
            enabled,
            entries: Vec::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(&mut self, iteration: usize, cost: f64, toggled: usize) {
        if self.enabled {
            self.entries.push(CostLogEntry {
                component: self.component,
                iteration,
                cost,
                toggled,
            });
        }
    }

    pub fn entries(&self) -> &[CostLogEntry] {
        &self.entries
    }

    /// Entries with `toggled` mapped through `members` (local to global ids).
    pub fn into_global(self, members: &[usize]) -> Vec<CostLogEntry> {
        self.entries
            .into_iter()
            .map(|e| CostLogEntry {
                toggled: members[e.toggled],
                ..e
            })
            .collect()
    }
}
