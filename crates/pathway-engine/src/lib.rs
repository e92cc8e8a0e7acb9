//! # Pathway Engine
//!
//! Turns a list of achievements into a navigable, animated, branching path.
//!
//! This crate provides:
//! - Path layout (snake main path, category branches, curve smoothing)
//! - Node placement along segments
//! - Snapshot diffing with progress, unlock and statistics events
//! - Per-node animations and a staggered celebration queue
//! - Scroll physics and auto-scroll navigation
//! - A one-shot reveal scan line
//! - Adaptive quality and viewport culling
//! - `ProgressionController`, which runs it all and emits a `FrameState` per tick

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod achievement;
pub mod animation;
pub mod branch;
pub mod config;
pub mod controller;
pub mod easing;
pub mod events;
pub mod frame;
pub mod hub;
pub mod layout;
pub mod navigation;
pub mod nodes;
pub mod performance;
pub mod reveal;
pub mod source;


/// Prelude for convenient imports
pub mod prelude {
    pub use crate::achievement::*;
    pub use crate::animation::*;
    pub use crate::branch::*;
    pub use crate::config::*;
    pub use crate::controller::*;
    pub use crate::easing::*;
    pub use crate::events::*;
    pub use crate::frame::*;
    pub use crate::hub::*;
    pub use crate::layout::*;
    pub use crate::navigation::*;
    pub use crate::nodes::NodePosition;
    pub use crate::performance::*;
    pub use crate::reveal::*;
    pub use crate::source::*;
    pub use pathway_common::prelude::*;
}

pub use prelude::*;
