//! Force-directed layout (Fruchterman-Reingold style)
//!
//! Every iteration accumulates forces for all nodes into a separate buffer
//! and only then moves the nodes, so results do not depend on node order.
//!
//! - repulsion between every pair of nodes: `10000 / d²`
//! - attraction along every edge: `(d / 100) * strength`
//! - displacement: `force * 0.1`, then clamped to the canvas less a 50px margin
//!
//! The iteration count is fixed; there is no convergence test. Repulsion is
//! all-pairs, which is acceptable only because maps are capped at
//! [`MAX_NODES`](super::map::MAX_NODES) nodes.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::config::LayoutConfig;

use super::map::{ConceptMap, inset_range, margin_range};

const REPULSION_CONSTANT: f64 = 10_000.0;
const ATTRACTION_DISTANCE_SCALE: f64 = 100.0;
const DAMPING: f64 = 0.1;

/// Initial positions are drawn this far inside the canvas edge
const INITIAL_INSET: f64 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Vec2 {
    x: f64,
    y: f64,
}

impl Vec2 {
    fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn length(self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Edge reduced to arena indices
#[derive(Debug, Clone, Copy)]
struct Spring {
    a: usize,
    b: usize,
    strength: f64,
}

/// Assigns 2-D coordinates to the nodes of a map
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lay out `map` in place
    ///
    /// Does nothing for an empty map. Edges whose endpoints are not in the
    /// map are ignored. A canvas with a non-finite width or height leaves
    /// the nodes where they are.
    pub fn layout(&self, map: &mut ConceptMap) {
        if map.nodes.is_empty() {
            return;
        }
        if !(self.config.width.is_finite() && self.config.height.is_finite()) {
            warn!(
                width = self.config.width,
                height = self.config.height,
                "Canvas size is not finite, skipping layout"
            );
            return;
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let springs = springs_for(map);
        let mut positions = self.initial_positions(map.nodes.len(), &mut rng);
        for _ in 0..self.config.iterations {
            self.step(&mut positions, &springs);
        }

        for (node, pos) in map.nodes.iter_mut().zip(&positions) {
            node.layout_x = pos.x;
            node.layout_y = pos.y;
        }

        debug!(
            nodes = map.nodes.len(),
            springs = springs.len(),
            iterations = self.config.iterations,
            "Layout complete"
        );
    }

    fn initial_positions(&self, count: usize, rng: &mut StdRng) -> Vec<Vec2> {
        let (x_lo, x_hi) = inset_range(self.config.width, INITIAL_INSET);
        let (y_lo, y_hi) = inset_range(self.config.height, INITIAL_INSET);

        (0..count)
            .map(|_| Vec2::new(rng.gen_range(x_lo..=x_hi), rng.gen_range(y_lo..=y_hi)))
            .collect()
    }

    /// One simulation step: accumulate, then apply and clamp
    fn step(&self, positions: &mut [Vec2], springs: &[Spring]) {
        let mut forces = vec![Vec2::default(); positions.len()];

        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let delta = positions[i] - positions[j];
                let distance = delta.length();
                if distance > 0.0 {
                    let magnitude = REPULSION_CONSTANT / (distance * distance);
                    let push = delta * (magnitude / distance);
                    forces[i] += push;
                    forces[j] -= push;
                }
            }
        }

        for spring in springs {
            let delta = positions[spring.b] - positions[spring.a];
            let distance = delta.length();
            if distance > 0.0 {
                let magnitude = (distance / ATTRACTION_DISTANCE_SCALE) * spring.strength;
                let pull = delta * (magnitude / distance);
                forces[spring.a] += pull;
                forces[spring.b] -= pull;
            }
        }

        let (x_min, x_max) = margin_range(self.config.width);
        let (y_min, y_max) = margin_range(self.config.height);

        for (pos, force) in positions.iter_mut().zip(&forces) {
            *pos += *force * DAMPING;
            pos.x = pos.x.clamp(x_min, x_max);
            pos.y = pos.y.clamp(y_min, y_max);
        }
    }
}

fn springs_for(map: &ConceptMap) -> Vec<Spring> {
    let index: HashMap<&str, usize> = map.index_by_id();
    map.edges
        .iter()
        .filter_map(|edge| {
            let a = *index.get(edge.source_node_id.as_str())?;
            let b = *index.get(edge.target_node_id.as_str())?;
            Some(Spring {
                a,
                b,
                strength: f64::from(edge.strength),
            })
        })
        .collect()
}
