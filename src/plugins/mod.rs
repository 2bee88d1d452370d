//! Engine subsystems operating on decision workspaces.

pub mod bundle;
pub mod decay;
pub mod decide;
pub mod engine;
pub mod graph;
pub mod health;
