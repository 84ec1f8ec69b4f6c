//! Tile grid and builder.
//!
//! # Data layout
//!
//! Tiles are stored row-major in one `Vec<Tile>`; the tile at `(x, y)` is at
//! index `y * width + x`.  `y` grows upward (`Direction::Up` is `y + 1`), so
//! layouts written as text are read bottom row last.
//!
//! # Heuristic
//!
//! `build()` runs one multi-source BFS from every delivery tile over walkable
//! tiles and stores, per tile, the hop count to the nearest delivery tile and
//! which one it was.  Agents are not considered.  These values are never
//! recomputed.

use std::collections::VecDeque;

use pd_core::{Position, Tick};

use crate::{Tile, TileKind, WorldError, WorldResult};

// ── GridMap ───────────────────────────────────────────────────────────────────

/// The static grid plus per-tile dynamic fields.
///
/// Do not construct directly; use [`GridMapBuilder`].
#[derive(Clone, Debug)]
pub struct GridMap {
    width:      i32,
    height:     i32,
    tiles:      Vec<Tile>,
    deliveries: Vec<Position>,
}

impl GridMap {
    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    #[inline]
    fn index(&self, pos: Position) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| (pos.y * self.width + pos.x) as usize)
    }

    // ── Tile queries ──────────────────────────────────────────────────────

    #[inline]
    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    /// `true` if `pos` is inside the map and not an obstacle.
    #[inline]
    pub fn is_walkable(&self, pos: Position) -> bool {
        self.tile(pos).is_some_and(|t| t.kind.is_walkable())
    }

    #[inline]
    pub fn is_delivery(&self, pos: Position) -> bool {
        self.tile(pos).is_some_and(|t| t.kind == TileKind::Delivery)
    }

    pub fn deliveries(&self) -> &[Position] {
        &self.deliveries
    }

    /// Hop count from `pos` to the nearest delivery tile, ignoring agents.
    #[inline]
    pub fn heuristic(&self, pos: Position) -> Option<u32> {
        self.tile(pos).and_then(|t| t.heuristic)
    }

    pub fn closest_delivery(&self, pos: Position) -> Option<Position> {
        self.tile(pos).and_then(|t| t.closest_delivery)
    }

    /// Walkable neighbours of `pos`.
    pub fn walkable_neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        pos.neighbors()
            .into_iter()
            .map(|(_, p)| p)
            .filter(|&p| self.is_walkable(p))
    }

    /// Every walkable tile, in row-major order.
    pub fn walkable_positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width)
                .map(move |x| Position::new(x, y))
                .filter(move |&p| self.is_walkable(p))
        })
    }

    // ── Dynamic-field mutation (world model only) ─────────────────────────

    pub(crate) fn clear_dynamic(&mut self) {
        for tile in &mut self.tiles {
            tile.agent = None;
            tile.parcel = None;
            tile.agent_heat = 0.0;
        }
    }

    pub(crate) fn tile_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        self.index(pos).map(move |i| &mut self.tiles[i])
    }

    pub(crate) fn mark_seen(&mut self, center: Position, radius: u32, now: Tick) {
        let r = radius as i32;
        for y in (center.y - r)..=(center.y + r) {
            for x in (center.x - r)..=(center.x + r) {
                let p = Position::new(x, y);
                if center.manhattan(p) <= radius {
                    if let Some(tile) = self.tile_mut(p) {
                        tile.last_seen = now;
                    }
                }
            }
        }
    }
}

// ── GridMapBuilder ────────────────────────────────────────────────────────────

/// Construct a [`GridMap`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use pd_core::Position;
/// use pd_world::GridMapBuilder;
///
/// let map = GridMapBuilder::from_rows(&[
///     "D..",
///     ".#.",
///     "S..",
/// ])
/// .unwrap()
/// .build();
/// assert_eq!(map.heuristic(Position::new(0, 0)), Some(2));
/// assert!(!map.is_walkable(Position::new(1, 1)));
/// ```
pub struct GridMapBuilder {
    width:  i32,
    height: i32,
    kinds:  Vec<TileKind>,
}

impl GridMapBuilder {
    /// A `width × height` map of unspawnable (walkable) tiles.
    pub fn new(width: i32, height: i32) -> Self {
        let n = (width.max(0) * height.max(0)) as usize;
        Self { width, height, kinds: vec![TileKind::Unspawnable; n] }
    }

    /// Parse a text layout, top row first.  All rows must have equal length.
    pub fn from_rows(rows: &[&str]) -> WorldResult<Self> {
        let height = rows.len() as i32;
        let width = rows.first().map_or(0, |r| r.chars().count()) as i32;
        if width == 0 || height == 0 {
            return Err(WorldError::InvalidLayout("empty layout".into()));
        }
        let mut builder = Self::new(width, height);
        for (row_idx, row) in rows.iter().enumerate() {
            if row.chars().count() as i32 != width {
                return Err(WorldError::InvalidLayout(format!(
                    "row {row_idx} has length {}, expected {width}",
                    row.chars().count()
                )));
            }
            let y = height - 1 - row_idx as i32;
            for (x, c) in row.chars().enumerate() {
                let kind = TileKind::from_char(c).ok_or_else(|| {
                    WorldError::InvalidLayout(format!("unknown tile character {c:?}"))
                })?;
                builder.set(Position::new(x as i32, y), kind)?;
            }
        }
        Ok(builder)
    }

    /// Classify one tile.
    pub fn set(&mut self, pos: Position, kind: TileKind) -> WorldResult<()> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width || pos.y >= self.height {
            return Err(WorldError::OutOfBounds(pos));
        }
        self.kinds[(pos.y * self.width + pos.x) as usize] = kind;
        Ok(())
    }

    /// Consume the builder and produce a [`GridMap`] with the delivery
    /// heuristic filled in.
    pub fn build(self) -> GridMap {
        let mut tiles: Vec<Tile> = self.kinds.iter().map(|&k| Tile::new(k)).collect();
        let mut deliveries = Vec::new();
        let mut queue = VecDeque::new();

        for y in 0..self.height {
            for x in 0..self.width {
                let i = (y * self.width + x) as usize;
                if tiles[i].kind == TileKind::Delivery {
                    let p = Position::new(x, y);
                    deliveries.push(p);
                    tiles[i].heuristic = Some(0);
                    tiles[i].closest_delivery = Some(p);
                    queue.push_back(p);
                }
            }
        }

        let mut map = GridMap {
            width: self.width,
            height: self.height,
            tiles,
            deliveries,
        };

        // Multi-source BFS; the first visit of a tile is its shortest distance.
        while let Some(p) = queue.pop_front() {
            let (dist, origin) = match map.tile(p) {
                Some(t) => (t.heuristic.unwrap_or(0), t.closest_delivery),
                None => continue,
            };
            for (_, n) in p.neighbors() {
                if let Some(tile) = map.tile_mut(n) {
                    if tile.kind.is_walkable() && tile.heuristic.is_none() {
                        tile.heuristic = Some(dist + 1);
                        tile.closest_delivery = origin;
                        queue.push_back(n);
                    }
                }
            }
        }

        map
    }
}
