use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::graph::GraphNode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Places nodes evenly on a circle, in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleLayout {
    pub radius: f64,
    pub center: Position,
}

impl Default for CircleLayout {
    fn default() -> Self {
        Self {
            radius: 300.0,
            center: Position::new(400.0, 300.0),
        }
    }
}

impl CircleLayout {
    /// Angle of the `index`-th of `count` nodes. Index 0 is always at angle 0.
    pub fn angle(&self, index: usize, count: usize) -> f64 {
        if count == 0 {
            return 0.0;
        }
        index as f64 * 2.0 * PI / count as f64
    }

    pub fn position(&self, index: usize, count: usize) -> Position {
        let angle = self.angle(index, count);
        Position {
            x: self.center.x + self.radius * angle.cos(),
            y: self.center.y + self.radius * angle.sin(),
        }
    }
}

/// Axis-aligned box enclosing a set of nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn of(nodes: &[GraphNode]) -> Option<Self> {
        let first = nodes.first()?;
        let mut bounds = Bounds {
            min_x: first.position.x,
            min_y: first.position.y,
            max_x: first.position.x + first.width,
            max_y: first.position.y + first.height,
        };
        for node in &nodes[1..] {
            bounds.min_x = bounds.min_x.min(node.position.x);
            bounds.min_y = bounds.min_y.min(node.position.y);
            bounds.max_x = bounds.max_x.max(node.position.x + node.width);
            bounds.max_y = bounds.max_y.max(node.position.y + node.height);
        }
        Some(bounds)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}
