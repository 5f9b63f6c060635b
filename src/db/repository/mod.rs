//! Repository layer: settings-scoped database operations.

mod settings;

pub use settings::*;
