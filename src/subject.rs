//! Subjects: state holders that push every change to their listeners.
//!
//! [`LocalSubject`] is the single-threaded flavour, [`SharedSubject`] the
//! thread-safe one (feature `shared`). Both hold listeners through weak
//! references only, so a listener's lifetime is always decided by its owner.

mod local_subject;
#[cfg(feature = "shared")]
mod shared_subject;
mod subject_core;

pub use local_subject::LocalSubject;
#[cfg(feature = "shared")]
pub use shared_subject::SharedSubject;
