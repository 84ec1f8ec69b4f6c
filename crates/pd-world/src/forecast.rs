//! Time-expanded occupancy forecast.
//!
//! `Forecast::build` projects every believed agent's trajectory onto a fresh
//! copy of the grid for each future step `0..H`.  Frame 0 is the present
//! layout.  The whole forecast is rebuilt from scratch on every world refresh;
//! frames are never patched in place.

use pd_core::{AgentId, Position};

use crate::{AgentBook, GridMap};

/// What a frame cell holds.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Occupancy {
    Free,
    Obstacle,
    Agent(AgentId),
}

/// Predicted occupancy of the whole grid at one future step.
#[derive(Clone, Debug)]
pub struct Frame {
    width:  i32,
    height: i32,
    cells:  Vec<Occupancy>,
}

impl Frame {
    /// The static layout with no agents.
    fn empty(map: &GridMap) -> Self {
        let (width, height) = (map.width(), map.height());
        let mut cells = Vec::with_capacity((width * height).max(0) as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(if map.is_walkable(Position::new(x, y)) {
                    Occupancy::Free
                } else {
                    Occupancy::Obstacle
                });
            }
        }
        Self { width, height, cells }
    }

    #[inline]
    fn index(&self, pos: Position) -> Option<usize> {
        (pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height)
            .then(|| (pos.y * self.width + pos.x) as usize)
    }

    /// Occupancy of `pos`; tiles outside the map read as obstacles.
    #[inline]
    pub fn at(&self, pos: Position) -> Occupancy {
        self.index(pos).map_or(Occupancy::Obstacle, |i| self.cells[i])
    }

    /// `true` if `agent` may stand on `pos` in this frame: no obstacle and no
    /// other agent.
    #[inline]
    pub fn is_free_for(&self, pos: Position, agent: AgentId) -> bool {
        match self.at(pos) {
            Occupancy::Free => true,
            Occupancy::Agent(other) => other == agent,
            Occupancy::Obstacle => false,
        }
    }

    /// Mark `pos` as occupied by `agent` (no-op on obstacles or outside).
    pub fn occupy(&mut self, pos: Position, agent: AgentId) {
        if let Some(i) = self.index(pos) {
            if self.cells[i] != Occupancy::Obstacle {
                self.cells[i] = Occupancy::Agent(agent);
            }
        }
    }
}

/// One frame per future step, `frames[0]` being the present.
#[derive(Clone, Debug)]
pub struct Forecast {
    frames: Vec<Frame>,
}

impl Forecast {
    /// Build `horizon` frames from the static map and projected trajectories.
    ///
    /// Trajectories must already be projected (see [`AgentBook::project`]).
    pub fn build(map: &GridMap, agents: &AgentBook, horizon: usize) -> Self {
        let base = Frame::empty(map);
        let mut frames = vec![base; horizon.max(1)];
        for belief in agents.iter() {
            if belief.position.is_none() {
                continue;
            }
            for (t, frame) in frames.iter_mut().enumerate() {
                if let Some(p) = belief.predicted(t) {
                    frame.occupy(p, belief.id);
                }
            }
        }
        Self { frames }
    }

    /// A forecast with only static obstacles.
    pub fn static_only(map: &GridMap, horizon: usize) -> Self {
        Self { frames: vec![Frame::empty(map); horizon.max(1)] }
    }

    pub fn horizon(&self) -> usize {
        self.frames.len()
    }

    /// Frame for step `t`, capped at the last frame.
    #[inline]
    pub fn frame(&self, t: usize) -> &Frame {
        let last = self.frames.len() - 1;
        &self.frames[t.min(last)]
    }

    /// Copy of this forecast with `pos` occupied by `agent` in every frame.
    pub fn with_blocked(&self, pos: Position, agent: AgentId) -> Self {
        let mut out = self.clone();
        for frame in &mut out.frames {
            frame.occupy(pos, agent);
        }
        out
    }
}
