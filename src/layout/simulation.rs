use super::admission::Admission;
use super::relaxation::{SpringRelaxation, mean_absolute_strain};
use super::route_partition::RoutePartition;
use super::{DatasetIx, LiveIx, SimNode, SimulationError};
use crate::config::SimulationConfig;
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Owns the whole layout. The caller drives it: one [`Simulation::step`] per
/// frame, or [`Simulation::maybe_admit_next`] and [`Simulation::tick`]
/// separately.
#[derive(Debug, Clone)]
pub struct Simulation {
    admission: Admission,
    relaxation: SpringRelaxation,
    rng: StdRng,
    admission_interval: u64,
    ticks: u64,
    /// Tick of the latest admission, at most one per tick
    last_admission_tick: Option<u64>,
    exhausted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationStats {
    pub ticks: u64,
    pub admitted: usize,
    pub candidates: usize,
    pub mean_strain: Option<f64>,
}

impl Simulation {
    pub fn new<I>(routes: I, config: &SimulationConfig) -> Self
    where
        I: IntoIterator<Item = (DatasetIx, DatasetIx, f64)>,
    {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(RoutePartition::from_routes(routes), config, rng)
    }

    pub fn with_rng(partition: RoutePartition, config: &SimulationConfig, rng: StdRng) -> Self {
        Self {
            admission: Admission::new(partition),
            relaxation: SpringRelaxation::new(config.step_size, config.spin_angle),
            rng,
            admission_interval: config.admission_interval.max(1),
            ticks: 0,
            last_admission_tick: None,
            exhausted: false,
        }
    }

    /// Admits the first airport. Must be called once before stepping.
    pub fn start(&mut self) -> Result<LiveIx, SimulationError> {
        self.admission.admit_first(&mut self.rng)
    }

    /// Like [`Simulation::start`], from a chosen airport.
    pub fn start_at(&mut self, dataset_ix: DatasetIx) -> Result<LiveIx, SimulationError> {
        self.admission.admit_first_at(dataset_ix)
    }

    /// One relaxation pass over every live node.
    pub fn tick(&mut self) {
        self.relaxation
            .relax(self.admission.nodes_mut(), &mut self.rng);
        self.ticks += 1;
    }

    /// Admits the next airport if this tick falls on the admission cadence
    /// and nothing was admitted on it yet.
    pub fn maybe_admit_next(&mut self) -> Result<Option<LiveIx>, SimulationError> {
        if self.exhausted
            || self.ticks % self.admission_interval != 0
            || self.last_admission_tick == Some(self.ticks)
        {
            return Ok(None);
        }

        let admitted = self.admission.admit_next()?;
        if admitted.is_some() {
            self.last_admission_tick = Some(self.ticks);
        } else if self.admission.is_started() {
            self.exhausted = true;
            info!(
                "Admission finished after {} ticks with {} airports",
                self.ticks,
                self.admission.nodes().len()
            );
        }
        Ok(admitted)
    }

    /// Admission (when due) strictly before relaxation, so a tick never sees
    /// a half-admitted node.
    pub fn step(&mut self) -> Result<Option<LiveIx>, SimulationError> {
        let admitted = self.maybe_admit_next()?;
        self.tick();
        if let Some(live_ix) = admitted {
            debug!("Tick {}: node {} joined", self.ticks, live_ix);
        }
        Ok(admitted)
    }

    pub fn nodes(&self) -> &[SimNode] {
        self.admission.nodes()
    }

    pub fn admission(&self) -> &Admission {
        &self.admission
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// True once no airport is left to admit.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn stats(&self) -> SimulationStats {
        SimulationStats {
            ticks: self.ticks,
            admitted: self.admission.nodes().len(),
            candidates: self.admission.partition().pending_len(),
            mean_strain: mean_absolute_strain(self.admission.nodes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(admission_interval: u64) -> SimulationConfig {
        SimulationConfig {
            admission_interval,
            seed: Some(5),
            ..SimulationConfig::default()
        }
    }

    fn ring(n: usize) -> Vec<(DatasetIx, DatasetIx, f64)> {
        (0..n).map(|i| (i, (i + 1) % n, 10.0)).collect()
    }

    #[test]
    fn test_admission_follows_interval() {
        let mut simulation = Simulation::new(ring(6), &config(3));
        simulation.start().unwrap();

        // tick 0 admits, ticks 1 and 2 do not
        assert!(simulation.step().unwrap().is_some());
        assert!(simulation.step().unwrap().is_none());
        assert!(simulation.step().unwrap().is_none());
        assert!(simulation.step().unwrap().is_some());
        assert_eq!(simulation.nodes().len(), 3);
        assert_eq!(simulation.ticks(), 4);
    }

    #[test]
    fn test_one_admission_per_tick() {
        let mut simulation = Simulation::new(ring(6), &config(1));
        simulation.start_at(0).unwrap();

        assert!(simulation.maybe_admit_next().unwrap().is_some());
        assert_eq!(simulation.maybe_admit_next(), Ok(None));
        assert_eq!(simulation.nodes().len(), 2);
        assert!(!simulation.is_exhausted());

        simulation.tick();
        assert!(simulation.maybe_admit_next().unwrap().is_some());
        assert_eq!(simulation.nodes().len(), 3);
    }

    #[test]
    fn test_runs_until_exhausted() {
        let mut simulation = Simulation::new(ring(5), &config(1));
        simulation.start().unwrap();
        for _ in 0..20 {
            simulation.step().unwrap();
        }
        assert!(simulation.is_exhausted());
        assert_eq!(simulation.nodes().len(), 5);

        let stats = simulation.stats();
        assert_eq!(stats.admitted, 5);
        assert_eq!(stats.candidates, 0);
        assert!(stats.mean_strain.unwrap().is_finite());
    }

    #[test]
    fn test_same_seed_same_layout() {
        let run = || {
            let mut simulation = Simulation::new(ring(8), &config(2));
            simulation.start().unwrap();
            for _ in 0..50 {
                simulation.step().unwrap();
            }
            simulation
                .nodes()
                .iter()
                .map(|node| (node.dataset_ix, node.position))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_stepping_before_start_only_ticks() {
        let mut simulation = Simulation::new(ring(4), &config(1));
        assert_eq!(simulation.step(), Ok(None));
        assert!(simulation.nodes().is_empty());
        assert!(!simulation.is_exhausted());
    }
}
