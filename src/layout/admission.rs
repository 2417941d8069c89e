use super::route_partition::RoutePartition;
use super::{DatasetIx, EdgeRef, LiveIx, SimNode, SimulationError};
use crate::geometry::Vec3;
use ahash::AHashMap;
use log::{debug, warn};
use rand::Rng;
use rand::seq::IndexedRandom;

/// Grows the live simulation array one airport at a time.
#[derive(Debug, Clone, Default)]
pub struct Admission {
    partition: RoutePartition,
    nodes: Vec<SimNode>,
    live_index: AHashMap<DatasetIx, LiveIx>,
}

impl Admission {
    pub fn new(partition: RoutePartition) -> Self {
        Self {
            partition,
            nodes: Vec::new(),
            live_index: AHashMap::new(),
        }
    }

    pub fn from_routes<I>(routes: I) -> Self
    where
        I: IntoIterator<Item = (DatasetIx, DatasetIx, f64)>,
    {
        Self::new(RoutePartition::from_routes(routes))
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [SimNode] {
        &mut self.nodes
    }

    pub fn partition(&self) -> &RoutePartition {
        &self.partition
    }

    pub fn partition_mut(&mut self) -> &mut RoutePartition {
        &mut self.partition
    }

    pub fn live_ix(&self, dataset_ix: DatasetIx) -> Option<LiveIx> {
        self.live_index.get(&dataset_ix).copied()
    }

    pub fn is_started(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Admits a random airport that has routes, at the origin.
    pub fn admit_first<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<LiveIx, SimulationError> {
        if self.is_started() {
            return Err(SimulationError::AlreadyStarted);
        }

        let dataset_ix = *self
            .partition
            .nodes_with_routes()
            .choose(rng)
            .ok_or(SimulationError::NoRoutes)?;

        self.admit_first_at(dataset_ix)
    }

    /// Starts the layout from a chosen airport, at the origin.
    pub fn admit_first_at(&mut self, dataset_ix: DatasetIx) -> Result<LiveIx, SimulationError> {
        if self.is_started() {
            return Err(SimulationError::AlreadyStarted);
        }
        if self.partition.degree(dataset_ix) == 0 {
            return Err(SimulationError::AirportWithoutRoutes(dataset_ix));
        }

        let connected = self.partition.establish(dataset_ix);
        debug_assert!(connected.is_empty());

        let live_ix = self.push_node(dataset_ix, Vec3::ZERO);
        self.promote_neighbours(dataset_ix);

        debug!(
            "Admitted first airport {} ({} routes)",
            dataset_ix,
            self.partition.degree(dataset_ix)
        );

        Ok(live_ix)
    }

    /// Admits the pending airport with the most admitted neighbours and wires
    /// up its springs. `Ok(None)` when no candidate touches the layout yet.
    pub fn admit_next(&mut self) -> Result<Option<LiveIx>, SimulationError> {
        let Some((dataset_ix, count)) = self.partition.best_candidate() else {
            return Ok(None);
        };

        let connected = self.partition.establish(dataset_ix);
        if connected.is_empty() {
            return Err(SimulationError::NoEstablishedNeighbours(dataset_ix));
        }
        if connected.len() != count {
            warn!(
                "Airport {} expected {} admitted neighbours, found {}",
                dataset_ix,
                count,
                connected.len()
            );
        }

        let mut edges = Vec::with_capacity(connected.len());
        let mut neighbour_positions = Vec::with_capacity(connected.len());
        for &(other, distance) in &connected {
            let Some(other_ix) = self.live_ix(other) else {
                warn!("Admitted airport {} has no live node", other);
                continue;
            };
            edges.push(EdgeRef {
                ix: other_ix,
                distance,
            });
            neighbour_positions.push(self.nodes[other_ix].position);
        }

        let position = Vec3::centroid(neighbour_positions).unwrap_or(Vec3::ZERO);
        let live_ix = self.push_node(dataset_ix, position);

        for edge in &edges {
            self.nodes[edge.ix].edges.push(EdgeRef {
                ix: live_ix,
                distance: edge.distance,
            });
        }
        self.nodes[live_ix].edges = edges;

        self.promote_neighbours(dataset_ix);

        debug!(
            "Admitted airport {} as node {} with {} springs",
            dataset_ix,
            live_ix,
            self.nodes[live_ix].edges.len()
        );

        Ok(Some(live_ix))
    }

    fn push_node(&mut self, dataset_ix: DatasetIx, position: Vec3) -> LiveIx {
        let live_ix = self.nodes.len();
        self.nodes.push(SimNode::new(dataset_ix, position));
        self.live_index.insert(dataset_ix, live_ix);
        live_ix
    }

    fn promote_neighbours(&mut self, dataset_ix: DatasetIx) {
        let neighbours: Vec<DatasetIx> = self.partition.neighbours(dataset_ix).collect();
        for neighbour in neighbours {
            self.partition.promote(neighbour);
        }
    }
}
