//! Local reactive state: one cell per character plus the shared score.

mod cell;
mod registry;

pub use cell::{CharacterCell, ScoreCell, StateCell};
pub use registry::CharacterRegistry;
