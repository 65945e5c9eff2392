//! Engine for a sliding-tile merge puzzle on a 4×4 grid.
//!
//! The crate owns board state, the slide/merge rules, scoring, undo history
//! and the persisted records; rendering and input decoding are left to the
//! embedder, which drives a [`game::GameEngine`] with directions and reacts
//! to the [`model::GameEngineEvent`]s it emits.

mod destroyable;
pub mod events;
pub mod game;
pub mod model;

pub use destroyable::Destroyable;
