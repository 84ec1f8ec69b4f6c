//! The environment connector interface.
//!
//! The connector is an external collaborator: it performs atomic actions in
//! the game and reports their outcome.  Sensing callbacks flow the other way
//! (see `WorldModel::on_*`).

use async_trait::async_trait;

use pd_core::{Direction, GameConfig, ParcelId, Position};

use crate::SharedWorld;

/// Atomic actions exposed by the environment.
///
/// Every action resolves when the environment has applied (or rejected) it;
/// callers await them one at a time.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Step one tile in `dir`.  `false` if the move was rejected (obstacle,
    /// occupied tile, map edge).
    async fn move_to(&self, dir: Direction) -> bool;

    /// Pick up every free parcel on the current tile.
    async fn pickup(&self) -> Vec<ParcelId>;

    /// Put down every carried parcel on the current tile.
    async fn putdown(&self) -> Vec<ParcelId>;

    /// Static game parameters.
    fn game_config(&self) -> GameConfig;
}

// ── Tracked actions ───────────────────────────────────────────────────────────
//
// Perform an action, then record its effect in the world model.  The write
// guard is taken only after the connector has answered.

/// Step in `dir`; on success our believed position moves optimistically.
/// Returns the new position, or `None` if the move was rejected or our
/// position is unknown.
///
/// The target is fixed before dispatch, so a sensing update landing while
/// the move is in flight cannot push us a second tile.
pub async fn tracked_move(
    connector: &dyn Connector,
    world:     &SharedWorld,
    dir:       Direction,
) -> Option<Position> {
    let next = world.read().position()?.step(dir);
    if !connector.move_to(dir).await {
        return None;
    }
    let mut w = world.write();
    w.set_position(next);
    w.refresh();
    Some(next)
}

/// Pick up and record what was picked up.
pub async fn tracked_pickup(connector: &dyn Connector, world: &SharedWorld) -> Vec<ParcelId> {
    let ids = connector.pickup().await;
    if !ids.is_empty() {
        world.write().record_pickup(&ids);
    }
    ids
}

/// Put down and record it.  Returns the ids and the points scored.
pub async fn tracked_putdown(connector: &dyn Connector, world: &SharedWorld) -> (Vec<ParcelId>, u32) {
    let ids = connector.putdown().await;
    let gained = if ids.is_empty() { 0 } else { world.write().record_putdown(&ids) };
    (ids, gained)
}
