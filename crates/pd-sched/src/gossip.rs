//! Teammate gossip.

use pd_comm::BeliefUpdate;
use pd_core::AgentId;
use pd_world::WorldModel;

/// Fold a batch of gossiped updates into `world`, then rebuild the forecast
/// once.
pub fn absorb(world: &mut WorldModel, updates: Vec<(AgentId, BeliefUpdate)>) {
    if updates.is_empty() {
        return;
    }
    let now = world.now;
    for (from, update) in updates {
        if from == world.me.id {
            continue;
        }
        match update {
            BeliefUpdate::Parcels(parcels) => world.parcels.merge(&parcels),
            BeliefUpdate::Intention { kind, target } => world.agents.announce(from, kind, target, now),
            BeliefUpdate::Position(pos) => world.agents.set_position(from, pos, now),
            BeliefUpdate::Carrying(carrying) => world.agents.set_carrying(from, carrying, now),
            BeliefUpdate::Path(path) => world.agents.announce_path(from, path, now),
        }
    }
    world.refresh();
}
