//! Incremental spring layout of the route graph.
//!
//! Airports are admitted one at a time, most-connected first, and every tick
//! the springs between admitted airports pull the point cloud toward the
//! target geometry.

pub mod admission;
pub mod relaxation;
pub mod route_partition;
pub mod simulation;

#[cfg(test)]
mod scenario_tests;

use crate::geometry::Vec3;
use serde::Serialize;
use thiserror::Error;

/// Index of an airport in the dataset.
pub type DatasetIx = usize;

/// Index of a node in the live simulation array.
pub type LiveIx = usize;

/// One direction of an established spring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeRef {
    pub ix: LiveIx,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimNode {
    pub dataset_ix: DatasetIx,
    pub position: Vec3,
    pub edges: Vec<EdgeRef>,
}

impl SimNode {
    pub fn new(dataset_ix: DatasetIx, position: Vec3) -> Self {
        Self {
            dataset_ix,
            position,
            edges: Vec::new(),
        }
    }
}

/// Faults that mean the dataset broke its connectivity contract. None of
/// these can be recovered from inside the layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    #[error("The dataset has no routes to start the layout from")]
    NoRoutes,
    #[error("Airport {0} has no routes and cannot start the layout")]
    AirportWithoutRoutes(DatasetIx),
    #[error("The first airport was already admitted")]
    AlreadyStarted,
    #[error("Airport {0} was selected for admission without any admitted neighbour")]
    NoEstablishedNeighbours(DatasetIx),
}
