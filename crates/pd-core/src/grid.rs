//! Grid coordinates and movement directions.
//!
//! The environment reports agent coordinates as floats while an agent is
//! between two tiles (e.g. `x = 2.6`).  Every distance in the agent is taken
//! on rounded coordinates, so `Position` is always integral.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Direction ─────────────────────────────────────────────────────────────────

/// One of the four atomic moves the environment accepts.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Canonical try-order used on even search levels.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Alternate try-order used on odd search levels.
    pub const ALT: [Direction; 4] = [
        Direction::Left,
        Direction::Down,
        Direction::Right,
        Direction::Up,
    ];

    /// `(dx, dy)` offset of one step in this direction.  `Up` is `y + 1`.
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up    => (0, 1),
            Direction::Down  => (0, -1),
            Direction::Left  => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    #[inline]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up    => Direction::Down,
            Direction::Down  => Direction::Up,
            Direction::Left  => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up    => "up",
            Direction::Down  => "down",
            Direction::Left  => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Position ──────────────────────────────────────────────────────────────────

/// An integral tile coordinate.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
#[derive(Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Snap a sensed (possibly fractional) coordinate to its tile.
    #[inline]
    pub fn rounded(x: f32, y: f32) -> Self {
        Self { x: x.round() as i32, y: y.round() as i32 }
    }

    /// Manhattan distance in tiles.
    #[inline]
    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The tile one step away in `dir`.  May lie outside the map.
    #[inline]
    pub fn step(self, dir: Direction) -> Position {
        let (dx, dy) = dir.delta();
        Position { x: self.x + dx, y: self.y + dy }
    }

    /// The four orthogonal neighbours, in [`Direction::ALL`] order.
    pub fn neighbors(self) -> [(Direction, Position); 4] {
        Direction::ALL.map(|d| (d, self.step(d)))
    }

    /// Direction of a single step from `self` to `other`, if they are
    /// orthogonally adjacent.
    pub fn direction_to(self, other: Position) -> Option<Direction> {
        match (other.x - self.x, other.y - self.y) {
            (0, 1)  => Some(Direction::Up),
            (0, -1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            (1, 0)  => Some(Direction::Right),
            _       => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
