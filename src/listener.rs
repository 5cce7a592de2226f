//! Listener trait and implementations
//!
//! A listener is the consumer side of a subject: it is handed every new state
//! value through `receive`.

use std::convert::Infallible;

// ============================================================================
// Listener Trait
// ============================================================================

/// Listener trait: receives the state pushed by a subject.
///
/// `Err` is the failure type of `receive`. A failing listener stops the
/// notification pass it is part of and its error is returned to whoever
/// changed the state. Listeners that cannot fail use the default
/// `Infallible`.
///
/// Listeners carry no identity of their own. A subject tells two attached
/// listeners apart by the handle allocation they live in, never by content.
pub trait Listener<Err = Infallible> {
  /// Receive the subject's current state.
  fn receive(&mut self, message: &str) -> Result<(), Err>;
}

// ============================================================================
// FnMutListener - Closure adapter
// ============================================================================

/// Adapts a closure into an infallible listener.
///
/// ```rust
/// use rxsubject::prelude::*;
///
/// let mut seen = Vec::new();
/// let mut listener = FnMutListener(|msg: &str| seen.push(msg.to_owned()));
/// listener.receive("hello").unwrap();
/// drop(listener);
/// assert_eq!(seen, vec!["hello"]);
/// ```
#[derive(Clone)]
pub struct FnMutListener<F>(pub F);

impl<F> Listener for FnMutListener<F>
where
  F: FnMut(&str),
{
  #[inline]
  fn receive(&mut self, message: &str) -> Result<(), Infallible> {
    (self.0)(message);
    Ok(())
  }
}

// ============================================================================
// Tests
// ============================================================================
