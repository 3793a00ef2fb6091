// Library root: re-exports all modules so integration tests and the app
// binary can reach the engine's public API.

pub mod backtest;
pub mod config;
pub mod history;
pub mod innings;
pub mod io;
pub mod multipliers;
pub mod profiles;
pub mod projector;
pub mod scoring;
pub mod simulator;
pub mod stats;
pub mod strength;
