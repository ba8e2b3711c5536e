//! The scene model: entities, their change tags and baseline snapshots, and
//! the graph that holds them.

mod baseline;
mod entity;
mod global;
mod graph;
mod kind;
mod metadata;

pub use baseline::*;
pub use entity::*;
pub use global::*;
pub use graph::*;
pub use kind::*;
pub use metadata::*;
