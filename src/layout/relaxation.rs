use super::SimNode;
use crate::geometry::Vec3;
use rand::Rng;

pub const DEFAULT_STEP_SIZE: f64 = 0.001;
pub const DEFAULT_SPIN_ANGLE: f64 = 0.001;

/// One relaxation pass per tick: springs, recentre, spin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringRelaxation {
    /// Fraction of the way each spring moves its node toward rest length
    pub step_size: f64,
    /// Rotation per tick in the X/Z plane, radians
    pub spin_angle: f64,
}

impl Default for SpringRelaxation {
    fn default() -> Self {
        Self {
            step_size: DEFAULT_STEP_SIZE,
            spin_angle: DEFAULT_SPIN_ANGLE,
        }
    }
}

impl SpringRelaxation {
    pub fn new(step_size: f64, spin_angle: f64) -> Self {
        Self {
            step_size,
            spin_angle,
        }
    }

    pub fn relax<R: Rng + ?Sized>(&self, nodes: &mut [SimNode], rng: &mut R) {
        if nodes.is_empty() {
            return;
        }

        self.apply_springs(nodes, rng);

        let Some(centre) = Vec3::centroid(nodes.iter().map(|node| node.position)) else {
            return;
        };
        for node in nodes.iter_mut() {
            node.position = (node.position - centre).rotate_xz(self.spin_angle);
        }
    }

    /// Moves nodes in live order; each spring sees its neighbour's position as
    /// already updated earlier in the same pass.
    fn apply_springs<R: Rng + ?Sized>(&self, nodes: &mut [SimNode], rng: &mut R) {
        for p in 0..nodes.len() {
            for e in 0..nodes[p].edges.len() {
                let edge = nodes[p].edges[e];
                if edge.ix == p {
                    continue;
                }

                let here = nodes[p].position;
                let there = nodes[edge.ix].position;

                // coincident nodes have no direction, pick one
                let direction = (here - there)
                    .normalized()
                    .unwrap_or_else(|| Vec3::random_unit(rng));

                let rest = there + direction * edge.distance;
                nodes[p].position = here.lerp(rest, self.step_size);
            }
        }
    }
}

/// Mean of `|actual - target|` over every spring, counting each once.
pub fn mean_absolute_strain(nodes: &[SimNode]) -> Option<f64> {
    let mut total = 0.0;
    let mut count = 0usize;
    for (ix, node) in nodes.iter().enumerate() {
        for edge in node.edges.iter().filter(|edge| edge.ix > ix) {
            let actual = node.position.distance(nodes[edge.ix].position);
            total += (actual - edge.distance).abs();
            count += 1;
        }
    }
    (count > 0).then(|| total / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::EdgeRef;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pair(a: Vec3, b: Vec3, distance: f64) -> Vec<SimNode> {
        let mut first = SimNode::new(0, a);
        first.edges.push(EdgeRef { ix: 1, distance });
        let mut second = SimNode::new(1, b);
        second.edges.push(EdgeRef { ix: 0, distance });
        vec![first, second]
    }

    #[test]
    fn test_pair_at_rest_keeps_separation() {
        let mut nodes = pair(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0), 10.0);
        let mut rng = StdRng::seed_from_u64(0);
        SpringRelaxation::default().relax(&mut nodes, &mut rng);

        let separation = nodes[0].position.distance(nodes[1].position);
        assert!((separation - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_stretched_pair_contracts() {
        let mut nodes = pair(Vec3::new(-10.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0), 10.0);
        let mut rng = StdRng::seed_from_u64(0);
        let relaxation = SpringRelaxation::new(0.1, 0.0);
        relaxation.relax(&mut nodes, &mut rng);

        let separation = nodes[0].position.distance(nodes[1].position);
        assert!(separation < 20.0);
        assert!(separation > 10.0);
    }

    #[test]
    fn test_coincident_pair_separates() {
        let mut nodes = pair(Vec3::ZERO, Vec3::ZERO, 10.0);
        let mut rng = StdRng::seed_from_u64(11);
        SpringRelaxation::default().relax(&mut nodes, &mut rng);

        for node in &nodes {
            assert!(node.position.is_finite());
        }
        let separation = nodes[0].position.distance(nodes[1].position);
        assert!(separation > 0.0);
    }

    #[test]
    fn test_centroid_returns_to_origin() {
        let mut nodes = pair(Vec3::new(3.0, 7.0, 1.0), Vec3::new(9.0, 1.0, -4.0), 2.0);
        nodes.push(SimNode::new(2, Vec3::new(100.0, 100.0, 100.0)));
        let mut rng = StdRng::seed_from_u64(0);
        SpringRelaxation::default().relax(&mut nodes, &mut rng);

        let centre = Vec3::centroid(nodes.iter().map(|n| n.position)).unwrap();
        assert!(centre.length() < 1e-9);
    }

    #[test]
    fn test_spin_rotates_xz_only() {
        let mut nodes = vec![
            SimNode::new(0, Vec3::new(1.0, 2.0, 0.0)),
            SimNode::new(1, Vec3::new(-1.0, -2.0, 0.0)),
        ];
        let mut rng = StdRng::seed_from_u64(0);
        SpringRelaxation::new(0.001, std::f64::consts::FRAC_PI_2).relax(&mut nodes, &mut rng);

        let p = nodes[0].position;
        assert!(p.x.abs() < 1e-9);
        assert!((p.y - 2.0).abs() < 1e-9);
        assert!((p.z - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mean_absolute_strain() {
        let nodes = pair(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0), 10.0);
        assert_eq!(mean_absolute_strain(&nodes), Some(6.0));
        assert_eq!(mean_absolute_strain(&[]), None);
    }
}
