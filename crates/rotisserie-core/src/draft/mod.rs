pub mod card;
pub mod config;
pub mod order;
pub mod pick;
pub mod player;
pub mod snapshot;
pub mod state;
