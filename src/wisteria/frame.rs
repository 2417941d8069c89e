use flightweb::config::FrameConfig;
use flightweb::geometry::Vec3;
use flightweb::layout::{DatasetIx, LiveIx, SimNode};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::cmp::Reverse;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectedNode {
    pub live_ix: LiveIx,
    pub dataset_ix: DatasetIx,
    pub x: f64,
    pub y: f64,
    /// Depth before projection, larger is further away
    pub z: f64,
    pub scale: f64,
    /// Where the airport sits in the target geometry, unrotated
    pub target: Option<Vec3>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub from: LiveIx,
    pub to: LiveIx,
    pub from_xy: [f64; 2],
    pub to_xy: [f64; 2],
    pub strain: f64,
    pub rgb: [u8; 3],
    pub alpha: f64,
}

/// One rendered view of the layout. Nodes are ordered back to front and
/// segments follow that order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub width: f64,
    pub height: f64,
    pub tick: u64,
    pub nodes: Vec<ProjectedNode>,
    pub segments: Vec<Segment>,
}

// ===========================================================================
// Projection
// ===========================================================================

pub fn projection_distance(config: &FrameConfig) -> f64 {
    config.height / (2.0 * (config.fov_degrees.to_radians() / 2.0).tan())
}

fn project_point(
    live_ix: LiveIx,
    node: &SimNode,
    target: Option<Vec3>,
    pd: f64,
    config: &FrameConfig,
) -> ProjectedNode {
    let Vec3 { x, y, z } = node.position;
    let scale = pd / (pd + z);
    ProjectedNode {
        live_ix,
        dataset_ix: node.dataset_ix,
        x: config.width / 2.0 + x * scale,
        y: config.height / 2.0 + y * scale,
        z,
        scale,
        target,
    }
}

impl Frame {
    /// `targets` is indexed by dataset index, see `Dataset::positions`.
    pub fn project(nodes: &[SimNode], targets: &[Vec3], tick: u64, config: &FrameConfig) -> Self {
        let pd = projection_distance(config);

        let projected: Vec<ProjectedNode> = nodes
            .iter()
            .enumerate()
            .map(|(live_ix, node)| {
                let target = targets.get(node.dataset_ix).copied();
                project_point(live_ix, node, target, pd, config)
            })
            .collect();

        let sorted: Vec<ProjectedNode> = projected
            .iter()
            .copied()
            .sorted_by_key(|point| Reverse(OrderedFloat(point.z)))
            .collect();

        let mut segments = Vec::new();
        for point in &sorted {
            let node = &nodes[point.live_ix];
            for edge in &node.edges {
                // each spring is stored in both directions
                if edge.ix <= point.live_ix {
                    continue;
                }
                let Some(other) = projected.get(edge.ix) else {
                    continue;
                };
                let actual = node.position.distance(nodes[edge.ix].position);
                if config
                    .max_edge_length
                    .is_some_and(|max_edge_length| actual > max_edge_length)
                {
                    continue;
                }

                let strain = actual - edge.distance;
                segments.push(Segment {
                    from: point.live_ix,
                    to: edge.ix,
                    from_xy: [point.x, point.y],
                    to_xy: [other.x, other.y],
                    strain,
                    rgb: hsv_to_rgb(strain_ratio(strain, config.max_strain), 1.0, 1.0),
                    alpha: depth_alpha(point.z),
                });
            }
        }

        Self {
            width: config.width,
            height: config.height,
            tick,
            nodes: sorted,
            segments,
        }
    }
}

// ===========================================================================
// Colouring
// ===========================================================================

/// Maps strain onto 0..=1: 0 is squeezed by `max_strain` or more, 0.5 is at
/// rest length, 1 is stretched by `max_strain` or more.
pub fn strain_ratio(strain: f64, max_strain: f64) -> f64 {
    (strain / max_strain).clamp(-1.0, 1.0) / 2.0 + 0.5
}

pub fn depth_alpha(z: f64) -> f64 {
    (1.0 - (z + 400.0) / 800.0).clamp(0.0, 1.0)
}

pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [u8; 3] {
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    let (r, g, b) = match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    [r, g, b].map(|channel| (channel * 255.0).round() as u8)
}
