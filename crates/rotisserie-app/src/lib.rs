// Library root: the chat-facing draft session and the services it drives
// (card lookup, sheet mirror, SQLite persistence, config).

pub mod app;
pub mod config;
pub mod db;
pub mod lookup;
pub mod protocol;
pub mod sheet;
