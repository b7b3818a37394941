//! Instance composition and lifecycle.
//!
//! [`StandardInstanceLauncher`] owns the lifecycle state machine
//! (`new -> starting -> running -> stopping -> terminated`, with an
//! absorbing `failed`); [`InstanceDriver`] composes the catalog, scheduler,
//! execution launcher, metrics, and listener registry it manages.

pub mod driver;
pub mod launcher;
pub mod state;

pub use driver::InstanceDriver;
pub use launcher::{InstanceLauncherBuilder, StandardInstanceLauncher};
pub use state::InstanceState;
