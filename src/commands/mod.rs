pub mod config;
pub mod generate;
pub mod site;

pub use crate::render::{Phase, Render};
pub use crate::utils::tui::create_spinner;
