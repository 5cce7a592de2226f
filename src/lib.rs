//! # rxsubject: observable state for Rust
//!
//! A subject owns a text state and a list of listeners. Every state change is
//! pushed, synchronously and in attach order, to every listener.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//!
//! use rxsubject::prelude::*;
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let c_log = log.clone();
//!
//! let subject: LocalSubject = LocalSubject::new();
//! let listener =
//!   MutRc::own(FnMutListener(move |msg: &str| c_log.borrow_mut().push(msg.to_owned())));
//!
//! subject.attach(&listener);
//! subject.set_state("ready").unwrap();
//! subject.detach(&listener);
//! subject.set_state("unheard").unwrap();
//!
//! assert_eq!(*log.borrow(), vec!["ready"]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Listener`] | Receives each new state value |
//! | [`LocalSubject`] / [`SharedSubject`] | Subjects for single-thread and thread-safe use |
//! | [`MutRc`] / [`MutArc`] | Owning listener handles; subjects only keep the weak side |
//!
//! ## Feature Flags
//!
//! - **`shared`** (default): `MutArc`, `WeakArc` and `SharedSubject`
//!
//! [`Listener`]: listener::Listener
//! [`LocalSubject`]: subject::LocalSubject
//! [`SharedSubject`]: subject::SharedSubject
//! [`MutRc`]: rc::MutRc
//! [`MutArc`]: rc::MutArc
pub mod listener;
pub mod prelude;
pub mod rc;
pub mod subject;

// Re-export the prelude module
pub use prelude::*;

#[cfg(all(doctest, not(target_arch = "wasm32")))]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
