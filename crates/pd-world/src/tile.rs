//! Map tiles.

use pd_core::{AgentId, ParcelId, Position, Tick};

/// Static classification of a tile, fixed when the map is built.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TileKind {
    Obstacle,
    /// Walkable; parcels may spawn here.
    Spawnable,
    /// Walkable; parcels never spawn here.
    Unspawnable,
    /// Walkable; carried parcels put down here are scored.
    Delivery,
}

impl TileKind {
    /// Parse one layout character.
    ///
    /// Accepts both the symbolic form (`#`, `S`, `.`, `D`) and the numeric
    /// codes the environment uses (`0` obstacle, `1` spawnable, `2` delivery,
    /// `3` unspawnable).
    pub fn from_char(c: char) -> Option<TileKind> {
        match c {
            '#' | '0' => Some(TileKind::Obstacle),
            'S' | '1' => Some(TileKind::Spawnable),
            'D' | '2' => Some(TileKind::Delivery),
            '.' | '3' => Some(TileKind::Unspawnable),
            _ => None,
        }
    }

    #[inline]
    pub fn is_walkable(self) -> bool {
        !matches!(self, TileKind::Obstacle)
    }
}

/// One cell of the grid.
///
/// `kind`, `heuristic` and `closest_delivery` are fixed at map-build time;
/// [`GridMap`](crate::GridMap) hands out only shared references to tiles and
/// mutates the dynamic fields through crate-private methods.
#[derive(Clone, Debug)]
pub struct Tile {
    pub kind: TileKind,

    /// Shortest hop count to the nearest delivery tile, ignoring agents.
    /// `None` when no delivery tile is reachable.
    pub heuristic: Option<u32>,

    /// The delivery tile `heuristic` was measured to.
    pub closest_delivery: Option<Position>,

    // ── Dynamic fields ────────────────────────────────────────────────────
    /// Agent believed to stand here now.
    pub agent: Option<AgentId>,

    /// Free parcel believed to lie here now.
    pub parcel: Option<ParcelId>,

    /// Number of believed agents within Manhattan distance 2.
    pub agent_heat: f32,

    /// Last revision tick at which this tile was inside our sensing radius.
    pub last_seen: Tick,
}

impl Tile {
    pub(crate) fn new(kind: TileKind) -> Self {
        Self {
            kind,
            heuristic:        None,
            closest_delivery: None,
            agent:            None,
            parcel:           None,
            agent_heat:       0.0,
            last_seen:        Tick::ZERO,
        }
    }
}
