//! Core server events routed to plugins.
//!
//! Only infrastructure events live here. Feature-specific chatter between
//! plugins goes through the `plugin` namespace of the bus with ad-hoc
//! payload types owned by the emitting plugin.

use crate::types::PlayerId;
use serde::{Deserialize, Serialize};

/// A player finished connecting and is fully in the game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConnectedEvent {
    pub player_id: PlayerId,
    pub timestamp: u64,
}

/// A player left the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerDisconnectedEvent {
    pub player_id: PlayerId,
    pub reason: String,
    pub timestamp: u64,
}

/// A round ended and the engine crowned its MVP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundMvpEvent {
    pub player_id: PlayerId,
    pub round: u32,
    pub timestamp: u64,
}

/// Periodic game-logic tick, fired on the host's serialized logic thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerTickEvent {
    pub tick: u64,
    pub timestamp: u64,
}
