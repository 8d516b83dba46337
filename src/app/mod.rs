//! Application runtime composition modules.

pub(crate) mod commands;
pub(crate) mod presets;
pub(crate) mod runtime;
pub(crate) mod templates;
pub(crate) mod terminal;
