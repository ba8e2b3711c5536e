//! Change tracking, diffing, and project reconciliation for authored 3D
//! scenes.
//!
//! A scene is loaded once as a baseline. Edits made on top of it are tagged
//! as they happen, and exporting writes only what differs from the baseline
//! into a project document. Importing applies such a document back onto a
//! freshly loaded baseline.

pub mod cli;
pub mod codec;
pub mod diff;
pub mod export;
pub mod interaction;
pub mod overlay;
pub mod project;
pub mod reconcile;
pub mod removed;
pub mod scene;
pub mod session;
pub mod store;

mod error;
mod multimap;

pub use crate::error::ErrorDisplay;
pub use crate::session::AuthoringSession;
