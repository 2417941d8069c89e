use super::admission::Admission;
use super::relaxation::SpringRelaxation;
use super::route_partition::{Phase, PhaseCounts};
use super::simulation::Simulation;
use super::{DatasetIx, SimNode};
use crate::config::SimulationConfig;
use crate::geometry::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn admit_all(admission: &mut Admission) {
    while admission.admit_next().unwrap().is_some() {}
}

fn admission_starting_at(routes: &[(DatasetIx, DatasetIx, f64)], first: DatasetIx) -> Admission {
    let mut admission = Admission::from_routes(routes.iter().copied());
    admission.admit_first_at(first).unwrap();
    admission
}

fn assert_edges_symmetric(nodes: &[SimNode]) {
    for (i, node) in nodes.iter().enumerate() {
        for edge in &node.edges {
            let matching = nodes[edge.ix]
                .edges
                .iter()
                .filter(|back| back.ix == i && back.distance == edge.distance)
                .count();
            assert_eq!(matching, 1, "edge {} -> {} has no mirror", i, edge.ix);
        }
    }
}

#[test]
fn test_square_with_chord_admits_every_route_once() {
    // A=0, B=1, C=2, D=3: A-B, B-C, C-D, D-A, A-C
    let routes = [
        (0, 1, 1.0),
        (1, 2, 1.0),
        (2, 3, 1.0),
        (3, 0, 1.0),
        (0, 2, 1.4),
    ];
    let mut admission = Admission::from_routes(routes);
    let mut rng = StdRng::seed_from_u64(21);
    admission.admit_first(&mut rng).unwrap();
    admit_all(&mut admission);

    assert_eq!(admission.nodes().len(), 4);
    let directed: usize = admission.nodes().iter().map(|n| n.edges.len()).sum();
    assert_eq!(directed, 10);
    assert_edges_symmetric(admission.nodes());

    let partition = admission.partition();
    assert_eq!(partition.pending_len(), 0);
    assert_eq!(partition.future_len(), 0);
    assert_eq!(
        partition.route_counts(),
        PhaseCounts {
            future: 0,
            pending: 0,
            established: 5
        }
    );
}

#[test]
fn test_pentagon_with_chord_admission_order() {
    let routes = [
        (0, 1, 1.0),
        (1, 2, 1.0),
        (2, 3, 1.0),
        (3, 4, 1.0),
        (4, 0, 1.0),
        (0, 2, 1.0),
    ];
    let mut admission = admission_starting_at(&routes, 0);

    // 1, 4 and 2 all touch 0 once; 1 became a candidate first
    let second = admission.admit_next().unwrap().unwrap();
    assert_eq!(admission.nodes()[second].dataset_ix, 1);

    // 2 now touches 0 and 1
    let third = admission.admit_next().unwrap().unwrap();
    assert_eq!(admission.nodes()[third].dataset_ix, 2);
    assert_eq!(admission.nodes()[third].edges.len(), 2);

    admit_all(&mut admission);
    assert_eq!(admission.nodes().len(), 5);
    assert_edges_symmetric(admission.nodes());
}

#[test]
fn test_first_admission_promotes_neighbours() {
    let routes = [(0, 1, 1.0), (0, 2, 1.0), (2, 3, 1.0)];
    let admission = admission_starting_at(&routes, 0);

    assert_eq!(admission.nodes().len(), 1);
    let partition = admission.partition();
    assert_eq!(partition.phase(1), Some(Phase::Pending));
    assert_eq!(partition.phase(2), Some(Phase::Pending));
    // two hops away, still future
    assert_eq!(partition.phase(3), Some(Phase::Future));
}

#[test]
fn test_pending_without_admitted_neighbour_is_not_admitted() {
    let mut admission = Admission::from_routes([(0, 1, 1.0), (2, 3, 1.0)]);
    assert!(admission.partition_mut().promote(2));

    assert_eq!(admission.admit_next(), Ok(None));
    assert!(admission.nodes().is_empty());
    assert_eq!(admission.partition().pending_len(), 1);
}

#[test]
fn test_centroid_stays_at_origin_while_growing() {
    let routes: Vec<_> = (0..12)
        .flat_map(|i| [(i, (i + 1) % 12, 30.0), (i, (i + 5) % 12, 80.0)])
        .collect();
    let config = SimulationConfig {
        admission_interval: 2,
        seed: Some(99),
        ..SimulationConfig::default()
    };
    let mut simulation = Simulation::new(routes, &config);
    simulation.start().unwrap();

    for _ in 0..200 {
        simulation.step().unwrap();
        let centre = Vec3::centroid(simulation.nodes().iter().map(|n| n.position)).unwrap();
        assert!(centre.length() < 1e-6);
        for node in simulation.nodes() {
            assert!(node.position.is_finite());
        }
    }
    assert!(simulation.is_exhausted());
    assert_edges_symmetric(simulation.nodes());
}

#[test]
fn test_newly_admitted_coincident_nodes_separate() {
    // the second airport is seeded on top of the first
    let mut admission = Admission::from_routes([(0, 1, 25.0)]);
    let mut rng = StdRng::seed_from_u64(4);
    admission.admit_first(&mut rng).unwrap();
    admission.admit_next().unwrap().unwrap();

    let nodes = admission.nodes_mut();
    assert_eq!(nodes[0].position, nodes[1].position);

    SpringRelaxation::default().relax(nodes, &mut rng);
    assert!(nodes[0].position.is_finite());
    assert!(nodes[1].position.is_finite());
    assert!(nodes[0].position.distance(nodes[1].position) > 0.0);
}
