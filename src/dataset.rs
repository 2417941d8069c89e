//! The route dataset shipped to the layout: airport coordinates plus an
//! undirected route list referencing airports by index.

use crate::geometry::{DistanceFunction, LatLonDeg, PositionFunction, Vec3, deg_to_rad};
use crate::layout::DatasetIx;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// [ix, ix]
pub type DatasetRoute = [DatasetIx; 2];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// [latDeg, lonDeg]
    pub airports: Vec<LatLonDeg>,
    pub routes: Vec<DatasetRoute>,
}

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("I/O error accessing dataset '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid dataset JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Route {route} references airport {airport}, but only {count} airports exist")]
    RouteOutOfRange {
        route: usize,
        airport: DatasetIx,
        count: usize,
    },
    #[error("Route {route} starts and ends at airport {airport}")]
    SelfLoop { route: usize, airport: DatasetIx },
    #[error("The graph is not connected: {reached} of {count} airports reached from airport {start}")]
    NotConnected {
        start: DatasetIx,
        reached: usize,
        count: usize,
    },
}

impl Dataset {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset: Dataset =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| DatasetError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(
            "Loaded dataset {}: {} airports, {} routes",
            path.display(),
            dataset.airports.len(),
            dataset.routes.len()
        );

        Ok(dataset)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer(BufWriter::new(file), self).map_err(|source| DatasetError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn num_airports(&self) -> usize {
        self.airports.len()
    }

    /// Target position of every airport, in dataset order.
    pub fn positions(&self, position_function: PositionFunction) -> Vec<Vec3> {
        self.airports
            .iter()
            .map(|&lat_lon| position_function(deg_to_rad(lat_lon)))
            .collect()
    }

    /// `(a, b, target distance)` for every route. Routes must be in range,
    /// see [`Dataset::validate`].
    pub fn distances(
        &self,
        distance_function: DistanceFunction,
    ) -> Vec<(DatasetIx, DatasetIx, f64)> {
        self.routes
            .iter()
            .map(|&[a, b]| {
                let distance = distance_function(
                    deg_to_rad(self.airports[a]),
                    deg_to_rad(self.airports[b]),
                );
                (a, b, distance)
            })
            .collect()
    }

    /// Checks the contract the layout relies on: routes reference existing
    /// airports, no route is a loop, and every airport can reach every other.
    pub fn validate(&self) -> Result<(), DatasetError> {
        let count = self.airports.len();
        let mut adjacency: Vec<Vec<DatasetIx>> = vec![Vec::new(); count];

        for (route, &[a, b]) in self.routes.iter().enumerate() {
            for airport in [a, b] {
                if airport >= count {
                    return Err(DatasetError::RouteOutOfRange {
                        route,
                        airport,
                        count,
                    });
                }
            }
            if a == b {
                return Err(DatasetError::SelfLoop { route, airport: a });
            }
            adjacency[a].push(b);
            adjacency[b].push(a);
        }

        if count == 0 {
            return Ok(());
        }

        let start = 0;
        let mut visited = vec![false; count];
        let mut queue = VecDeque::from([start]);
        let mut reached = 0;

        while let Some(ix) = queue.pop_front() {
            if visited[ix] {
                continue;
            }
            visited[ix] = true;
            reached += 1;
            queue.extend(adjacency[ix].iter().copied().filter(|&other| !visited[other]));
        }

        if reached != count {
            return Err(DatasetError::NotConnected {
                start,
                reached,
                count,
            });
        }

        Ok(())
    }
}
