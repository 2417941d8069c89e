use crate::openflights::{self, OpenFlightsAirport, OpenFlightsRoute};
use ahash::{AHashMap, AHashSet};
use anyhow::{Result, bail};
use flightweb::dataset::{Dataset, DatasetRoute};
use log::{debug, info};
use std::collections::VecDeque;
use std::path::Path;

/// Fewer routes than this cannot hold an airport on the surface in the spring
/// layout.
pub const MIN_ROUTES: usize = 3;

type Icao = String;

#[derive(Debug, Clone)]
struct Airport {
    /// OpenFlights internal ID
    id: i64,
    iata: Option<String>,
    icao: Icao,
    lat: f64,
    lon: f64,
    /// Not distinguishing between incoming and outgoing, in the order first
    /// seen
    routes: Vec<Icao>,
}

impl Airport {
    fn add_route(&mut self, other: &str) {
        if !self.routes.iter().any(|icao| icao == other) {
            self.routes.push(other.to_string());
        }
    }

    fn remove_route(&mut self, other: &str) -> bool {
        match self.routes.iter().position(|icao| icao == other) {
            Some(pos) => {
                self.routes.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Airports keep the order of airports.dat, which fixes the dataset indices.
#[derive(Debug, Default)]
pub struct DatasetGen {
    id_icao: AHashMap<i64, Icao>,
    iata_icao: AHashMap<String, Icao>,
    icao_slot: AHashMap<Icao, usize>,
    /// Pruned airports leave a `None` behind
    airports: Vec<Option<Airport>>,
}

impl DatasetGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse, prune, check and index the OpenFlights files in `directory`.
    pub fn run(mut self, directory: &Path) -> Result<Dataset> {
        self.parse(directory)?;
        self.prune()?;
        self.ensure_connected()?;
        Ok(self.generate())
    }

    fn parse(&mut self, directory: &Path) -> Result<()> {
        let skipped_airports = openflights::parse_file(
            &directory.join("airports.dat"),
            openflights::parse_airport,
            |airport| self.add_airport(airport),
        )?;

        let mut rejected_routes = 0;
        let skipped_routes = openflights::parse_file(
            &directory.join("routes.dat"),
            openflights::parse_route,
            |route| {
                if !self.add_route(&route) {
                    rejected_routes += 1;
                }
            },
        )?;

        info!(
            "Parse: Added {} airports, {} routes ({} airport rows and {} route rows skipped)",
            self.count_airports(),
            self.count_routes(),
            skipped_airports,
            skipped_routes + rejected_routes
        );
        Ok(())
    }

    fn airport(&self, icao: &str) -> Option<&Airport> {
        let slot = *self.icao_slot.get(icao)?;
        self.airports[slot].as_ref()
    }

    fn airport_mut(&mut self, icao: &str) -> Option<&mut Airport> {
        let slot = *self.icao_slot.get(icao)?;
        self.airports[slot].as_mut()
    }

    fn remove_airport(&mut self, icao: &str) -> Option<Airport> {
        let slot = self.icao_slot.remove(icao)?;
        self.airports[slot].take()
    }

    fn live_airports(&self) -> impl Iterator<Item = &Airport> {
        self.airports.iter().flatten()
    }

    /// A repeated ICAO code replaces the earlier row but keeps its position.
    pub fn add_airport(&mut self, airport: OpenFlightsAirport) {
        let OpenFlightsAirport {
            id,
            iata,
            icao,
            lat,
            lon,
        } = airport;

        self.id_icao.insert(id, icao.clone());
        if let Some(iata) = &iata {
            self.iata_icao.insert(iata.clone(), icao.clone());
        }

        let airport = Airport {
            id,
            iata,
            icao: icao.clone(),
            lat,
            lon,
            routes: Vec::new(),
        };
        match self.icao_slot.get(&icao) {
            Some(&slot) => self.airports[slot] = Some(airport),
            None => {
                self.icao_slot.insert(icao, self.airports.len());
                self.airports.push(Some(airport));
            }
        }
    }

    /// Records a direct route in both directions. Returns false if the route
    /// was skipped.
    pub fn add_route(&mut self, route: &OpenFlightsRoute) -> bool {
        if route.stops != 0 {
            debug!("Skipping non-direct route: {:?}", route);
            return false;
        }

        let Some(src) = self.find_airport(route.src_airport_id, &route.src_airport_code) else {
            debug!(
                "Skipping route: no airport found matching id: {:?} code: {} route: {:?}",
                route.src_airport_id, route.src_airport_code, route
            );
            return false;
        };
        let Some(dst) = self.find_airport(route.dst_airport_id, &route.dst_airport_code) else {
            debug!(
                "Skipping route: no airport found matching id: {:?} code: {} route: {:?}",
                route.dst_airport_id, route.dst_airport_code, route
            );
            return false;
        };

        if src == dst {
            debug!("Skipping route with the same source and destination: {:?}", route);
            return false;
        }

        if let Some(airport) = self.airport_mut(&src) {
            airport.add_route(&dst);
        }
        if let Some(airport) = self.airport_mut(&dst) {
            airport.add_route(&src);
        }
        true
    }

    /// Resolves an airport by OpenFlights id, then IATA code, then the code
    /// taken as ICAO.
    fn find_airport(&self, id: Option<i64>, code: &str) -> Option<Icao> {
        let icao = id
            .and_then(|id| self.id_icao.get(&id))
            .or_else(|| self.iata_icao.get(code))
            .map(String::as_str)
            .unwrap_or(code);

        self.airport(icao).map(|airport| airport.icao.clone())
    }

    /// Removes airports with fewer than [`MIN_ROUTES`] routes until none
    /// are left.
    pub fn prune(&mut self) -> Result<()> {
        let mut check_queue: VecDeque<Icao> =
            self.live_airports().map(|airport| airport.icao.clone()).collect();
        let mut queued: AHashSet<Icao> = check_queue.iter().cloned().collect();

        while let Some(icao) = check_queue.pop_front() {
            queued.remove(&icao);

            let Some(airport) = self.airport(&icao) else {
                continue;
            };
            if airport.routes.len() >= MIN_ROUTES {
                continue;
            }

            debug!("Pruning airport: fewer than {} routes: {:?}", MIN_ROUTES, airport);

            let Some(airport) = self.remove_airport(&icao) else {
                continue;
            };
            for other_icao in &airport.routes {
                let Some(other) = self.airport_mut(other_icao) else {
                    bail!(
                        "Assertion failure: {} has a route to unknown airport {}",
                        icao,
                        other_icao
                    );
                };
                if !other.remove_route(&icao) {
                    bail!(
                        "Assertion failure: The airport {:?} does not have {} in its routes",
                        other,
                        icao
                    );
                }
                if other.routes.len() < MIN_ROUTES && queued.insert(other_icao.clone()) {
                    check_queue.push_back(other_icao.clone());
                }
            }

            self.id_icao.remove(&airport.id);
            if let Some(iata) = &airport.iata {
                self.iata_icao.remove(iata);
            }
        }

        info!(
            "Prune: Have {} airports, {} routes",
            self.count_airports(),
            self.count_routes()
        );
        Ok(())
    }

    pub fn ensure_connected(&self) -> Result<()> {
        let Some(start) = self.live_airports().next() else {
            bail!("No airports left to build a dataset from");
        };

        let mut visited: AHashSet<&str> = AHashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([start.icao.as_str()]);

        while let Some(icao) = queue.pop_front() {
            if !visited.insert(icao) {
                continue;
            }
            if let Some(airport) = self.airport(icao) {
                queue.extend(airport.routes.iter().map(String::as_str));
            }
        }

        if visited.len() != self.count_airports() {
            bail!(
                "The graph is not connected: {} of {} reached starting from {:?}",
                visited.len(),
                self.count_airports(),
                start.icao
            );
        }
        Ok(())
    }

    /// Index airports in airports.dat order and emit each route once, lower
    /// index first.
    pub fn generate(&self) -> Dataset {
        let airport_indices: AHashMap<&str, usize> = self
            .live_airports()
            .enumerate()
            .map(|(ix, airport)| (airport.icao.as_str(), ix))
            .collect();

        let airports = self
            .live_airports()
            .map(|airport| [airport.lat, airport.lon])
            .collect();

        let mut routes: Vec<DatasetRoute> = Vec::new();
        for (src_ix, airport) in self.live_airports().enumerate() {
            for other_icao in &airport.routes {
                let Some(&dst_ix) = airport_indices.get(other_icao.as_str()) else {
                    continue;
                };
                if src_ix < dst_ix {
                    routes.push([src_ix, dst_ix]);
                }
            }
        }

        Dataset { airports, routes }
    }

    pub fn count_airports(&self) -> usize {
        self.icao_slot.len()
    }

    pub fn count_routes(&self) -> usize {
        let count: usize = self
            .live_airports()
            .map(|airport| airport.routes.len())
            .sum();
        // Routes are counted once for each direction.
        count / 2
    }
}
