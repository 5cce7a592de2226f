//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Listener trait and closure adapter
pub use crate::listener::{FnMutListener, Listener};
// Ownership handles
#[cfg(feature = "shared")]
pub use crate::rc::{MutArc, WeakArc};
pub use crate::rc::{MutRc, RcDeref, RcDerefMut, WeakRc};
// Subjects
pub use crate::subject::*;
