//! Game simulation modules

pub mod combat;
pub mod entity;
pub mod error;
pub mod physics;
pub mod registry;
pub mod session;
pub mod snapshot;
pub mod tick;

pub use registry::SessionRegistry;
pub use tick::TickScheduler;
