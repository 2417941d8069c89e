// ===========================================================================
// Route partition: future / pending / established views of the route graph
// ===========================================================================
//
// Every undirected route is stored once and tagged with its phase. A per-node
// index lists the routes touching each airport, so all lookups are
// O(degree). Airports that may be admitted next ("candidates") sit in an
// ordered queue keyed by how many admitted neighbours they have.
use super::DatasetIx;
use log::warn;
use std::cmp::Reverse;
use std::collections::BTreeSet;

pub type RouteId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Airport: not promoted yet. Route: neither end admitted.
    #[default]
    Future,
    /// Airport: promoted, its routes are visible to admission.
    /// Route: exactly one end admitted.
    Pending,
    /// Admitted. Never reverts.
    Established,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub ends: [DatasetIx; 2],
    pub distance: f64,
    pub phase: Phase,
}

impl Route {
    pub fn other(&self, node: DatasetIx) -> DatasetIx {
        if self.ends[0] == node {
            self.ends[1]
        } else {
            self.ends[0]
        }
    }
}

#[derive(Debug, Clone, Default)]
struct NodeEntry {
    phase: Phase,
    routes: Vec<RouteId>,
    established_neighbours: usize,
    /// Order in which the airport became a candidate, set while pending
    candidacy: Option<u64>,
}

/// Orders candidates by most admitted neighbours first, then by who became a
/// candidate first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct CandidateKey {
    established_neighbours: Reverse<usize>,
    candidacy: u64,
    node: DatasetIx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseCounts {
    pub future: usize,
    pub pending: usize,
    pub established: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RoutePartition {
    routes: Vec<Route>,
    nodes: Vec<NodeEntry>,
    candidates: BTreeSet<CandidateKey>,
    next_candidacy: u64,
}

impl RoutePartition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_routes<I>(routes: I) -> Self
    where
        I: IntoIterator<Item = (DatasetIx, DatasetIx, f64)>,
    {
        let mut partition = Self::new();
        for (a, b, distance) in routes {
            partition.add_future_edge(a, b, distance);
        }
        partition
    }

    /// Inserts an undirected route, once per route (not per direction).
    pub fn add_future_edge(&mut self, a: DatasetIx, b: DatasetIx, distance: f64) {
        if a == b {
            warn!("Ignoring route from airport {} to itself", a);
            return;
        }

        let needed = a.max(b) + 1;
        if self.nodes.len() < needed {
            self.nodes.resize_with(needed, NodeEntry::default);
        }

        let route_id = self.routes.len();
        let a_established = self.nodes[a].phase == Phase::Established;
        let b_established = self.nodes[b].phase == Phase::Established;
        let phase = match (a_established, b_established) {
            (true, true) => Phase::Established,
            (false, false) => Phase::Future,
            (true, false) => {
                self.bump_established_neighbours(b);
                Phase::Pending
            }
            (false, true) => {
                self.bump_established_neighbours(a);
                Phase::Pending
            }
        };

        self.routes.push(Route {
            ends: [a, b],
            distance,
            phase,
        });
        self.nodes[a].routes.push(route_id);
        self.nodes[b].routes.push(route_id);
    }

    /// Makes the routes of `node` visible to admission. Returns false, and
    /// changes nothing, if the airport is already pending or admitted, or has
    /// no routes at all.
    pub fn promote(&mut self, node: DatasetIx) -> bool {
        let Some(entry) = self.nodes.get_mut(node) else {
            return false;
        };
        if entry.phase != Phase::Future || entry.routes.is_empty() {
            return false;
        }

        let candidacy = self.next_candidacy;
        self.next_candidacy += 1;

        entry.phase = Phase::Pending;
        entry.candidacy = Some(candidacy);
        self.candidates.insert(CandidateKey {
            established_neighbours: Reverse(entry.established_neighbours),
            candidacy,
            node,
        });
        true
    }

    /// Marks `node` as admitted and moves its routes along: routes whose other
    /// end is already admitted become established and are returned as
    /// `(other, distance)` in insertion order; the rest become pending.
    pub fn establish(&mut self, node: DatasetIx) -> Vec<(DatasetIx, f64)> {
        match self.nodes.get(node) {
            Some(entry) if entry.phase != Phase::Established => {}
            _ => return Vec::new(),
        }

        self.withdraw_candidate(node);
        self.nodes[node].phase = Phase::Established;

        let mut established = Vec::new();
        for k in 0..self.nodes[node].routes.len() {
            let route_id = self.nodes[node].routes[k];
            let other = self.routes[route_id].other(node);

            if self.nodes[other].phase == Phase::Established {
                self.routes[route_id].phase = Phase::Established;
                established.push((other, self.routes[route_id].distance));
            } else {
                self.routes[route_id].phase = Phase::Pending;
                self.bump_established_neighbours(other);
            }
        }
        established
    }

    /// The candidate with the most admitted neighbours, ties going to the
    /// earliest candidate. `None` if no candidate has an admitted neighbour.
    pub fn best_candidate(&self) -> Option<(DatasetIx, usize)> {
        let key = self.candidates.first()?;
        let count = key.established_neighbours.0;
        (count > 0).then_some((key.node, count))
    }

    pub fn phase(&self, node: DatasetIx) -> Option<Phase> {
        self.nodes
            .get(node)
            .filter(|entry| !entry.routes.is_empty())
            .map(|entry| entry.phase)
    }

    pub fn is_pending(&self, node: DatasetIx) -> bool {
        self.phase(node) == Some(Phase::Pending)
    }

    /// The pending entry of `node`: every route it has, as
    /// `(other, distance)`. `None` unless the airport is pending.
    pub fn pending_routes(&self, node: DatasetIx) -> Option<Vec<(DatasetIx, f64)>> {
        if !self.is_pending(node) {
            return None;
        }
        Some(
            self.nodes[node]
                .routes
                .iter()
                .map(|&route_id| {
                    let route = &self.routes[route_id];
                    (route.other(node), route.distance)
                })
                .collect(),
        )
    }

    pub fn neighbours(&self, node: DatasetIx) -> impl Iterator<Item = DatasetIx> + '_ {
        self.nodes
            .get(node)
            .into_iter()
            .flat_map(|entry| entry.routes.iter())
            .map(move |&route_id| self.routes[route_id].other(node))
    }

    pub fn established_neighbours(&self, node: DatasetIx) -> usize {
        self.nodes
            .get(node)
            .map_or(0, |entry| entry.established_neighbours)
    }

    pub fn degree(&self, node: DatasetIx) -> usize {
        self.nodes.get(node).map_or(0, |entry| entry.routes.len())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Airports with at least one route, ascending.
    pub fn nodes_with_routes(&self) -> Vec<DatasetIx> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.routes.is_empty())
            .map(|(ix, _)| ix)
            .collect()
    }

    /// Number of airports in the pending set.
    pub fn pending_len(&self) -> usize {
        self.candidates.len()
    }

    /// Number of airports with routes that have not been promoted.
    pub fn future_len(&self) -> usize {
        self.nodes
            .iter()
            .filter(|entry| entry.phase == Phase::Future && !entry.routes.is_empty())
            .count()
    }

    pub fn route_counts(&self) -> PhaseCounts {
        let mut counts = PhaseCounts::default();
        for route in &self.routes {
            match route.phase {
                Phase::Future => counts.future += 1,
                Phase::Pending => counts.pending += 1,
                Phase::Established => counts.established += 1,
            }
        }
        counts
    }

    fn withdraw_candidate(&mut self, node: DatasetIx) {
        let entry = &mut self.nodes[node];
        if let Some(candidacy) = entry.candidacy.take() {
            self.candidates.remove(&CandidateKey {
                established_neighbours: Reverse(entry.established_neighbours),
                candidacy,
                node,
            });
        }
    }

    fn bump_established_neighbours(&mut self, node: DatasetIx) {
        let entry = &mut self.nodes[node];
        let old = entry.established_neighbours;
        entry.established_neighbours += 1;

        if let Some(candidacy) = entry.candidacy {
            self.candidates.remove(&CandidateKey {
                established_neighbours: Reverse(old),
                candidacy,
                node,
            });
            self.candidates.insert(CandidateKey {
                established_neighbours: Reverse(old + 1),
                candidacy,
                node,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_with_chord() -> RoutePartition {
        // 0-1, 1-2, 2-3, 3-0, 0-2
        RoutePartition::from_routes([
            (0, 1, 1.0),
            (1, 2, 2.0),
            (2, 3, 3.0),
            (3, 0, 4.0),
            (0, 2, 5.0),
        ])
    }

    #[test]
    fn test_add_future_edge_indexes_both_ends() {
        let partition = square_with_chord();
        assert_eq!(partition.degree(0), 3);
        assert_eq!(partition.degree(1), 2);
        assert_eq!(partition.neighbours(0).collect::<Vec<_>>(), vec![1, 3, 2]);
        assert_eq!(partition.future_len(), 4);
        assert_eq!(
            partition.route_counts(),
            PhaseCounts {
                future: 5,
                pending: 0,
                established: 0
            }
        );
    }

    #[test]
    fn test_self_loop_ignored() {
        let mut partition = RoutePartition::new();
        partition.add_future_edge(4, 4, 1.0);
        assert!(partition.routes().is_empty());
        assert_eq!(partition.phase(4), None);
    }

    #[test]
    fn test_promote_is_idempotent() {
        let mut partition = square_with_chord();
        assert!(partition.promote(1));
        assert!(!partition.promote(1));
        assert_eq!(partition.pending_len(), 1);
        assert_eq!(
            partition.pending_routes(1),
            Some(vec![(0, 1.0), (2, 2.0)])
        );
        assert_eq!(partition.pending_routes(0), None);
    }

    #[test]
    fn test_promote_unknown_node_is_noop() {
        let mut partition = square_with_chord();
        assert!(!partition.promote(42));
        assert_eq!(partition.pending_len(), 0);
    }

    #[test]
    fn test_establish_moves_route_phases() {
        let mut partition = square_with_chord();
        assert!(partition.establish(0).is_empty());
        assert_eq!(partition.phase(0), Some(Phase::Established));
        assert_eq!(partition.route_counts().pending, 3);
        assert_eq!(partition.established_neighbours(2), 1);

        partition.promote(2);
        let connected = partition.establish(2);
        assert_eq!(connected, vec![(0, 5.0)]);
        assert_eq!(partition.pending_len(), 0);
        assert_eq!(
            partition.route_counts(),
            PhaseCounts {
                future: 0,
                pending: 4,
                established: 1
            }
        );

        // establishing twice changes nothing
        assert!(partition.establish(2).is_empty());
        assert_eq!(partition.route_counts().established, 1);
    }

    #[test]
    fn test_best_candidate_prefers_count_then_candidacy() {
        let mut partition = square_with_chord();
        partition.establish(0);
        for n in [1, 3, 2] {
            partition.promote(n);
        }
        // all three have one admitted neighbour, 1 was promoted first
        assert_eq!(partition.best_candidate(), Some((1, 1)));

        partition.establish(1);
        // 2 now touches both 0 and 1
        assert_eq!(partition.best_candidate(), Some((2, 2)));
    }

    #[test]
    fn test_best_candidate_requires_admitted_neighbour() {
        let mut partition = square_with_chord();
        partition.promote(3);
        assert_eq!(partition.pending_len(), 1);
        assert_eq!(partition.best_candidate(), None);
    }

    #[test]
    fn test_promoting_everything_empties_future() {
        let mut partition = square_with_chord();
        for node in partition.nodes_with_routes() {
            partition.promote(node);
        }
        assert_eq!(partition.future_len(), 0);
        assert_eq!(partition.pending_len(), 4);
    }
}
