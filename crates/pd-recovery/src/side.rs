//! Side-tile selection.

use pd_core::{AgentId, Position};
use pd_world::WorldModel;

/// A walkable neighbour of `at` that `who` could step onto right now without
/// landing on any tile in `avoid`.  The least crowded one wins; ties keep
/// `Direction::ALL` order.
pub fn side_tile(world: &WorldModel, at: Position, who: AgentId, avoid: &[Position]) -> Option<Position> {
    let frame = world.forecast.frame(0);
    let heat = |p: Position| world.map.tile(p).map_or(f32::MAX, |t| t.agent_heat);
    world
        .map
        .walkable_neighbors(at)
        .filter(|p| frame.is_free_for(*p, who) && !avoid.contains(p))
        .min_by(|a, b| heat(*a).total_cmp(&heat(*b)))
}

/// Like [`side_tile`], restricted to tiles holding a free parcel.
pub fn side_tile_with_parcel(
    world: &WorldModel,
    at:    Position,
    who:   AgentId,
    avoid: &[Position],
) -> Option<Position> {
    let frame = world.forecast.frame(0);
    world
        .map
        .walkable_neighbors(at)
        .find(|p| {
            frame.is_free_for(*p, who) && !avoid.contains(p) && world.parcels.free_at(*p).is_some()
        })
}
