pub mod app;
pub mod check;
pub mod deps;
pub mod pipeline;
pub mod runner;
pub mod sandbox;
pub mod secrets;
pub mod state;

#[cfg(test)]
pub mod testing;

pub use check::{diagnose, Diagnosis};
pub use pipeline::Launcher;
pub use runner::{AppExit, SystemRunner};
pub use state::{LaunchError, LaunchState};
