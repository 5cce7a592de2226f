use std::{
  cell::RefCell,
  convert::Infallible,
  rc::{Rc, Weak},
};

use super::subject_core::{deliver, ensure_not_emitting, SubjectCore};
use crate::{
  listener::Listener,
  rc::{MutRc, RcDeref, RcDerefMut, WeakRc},
};

type LocalSlot<'a, Err> = WeakRc<dyn Listener<Err> + 'a>;

/// Single-threaded subject.
///
/// Holds a text state, initially empty, and an ordered list of weak listener
/// references. Cloning the subject yields another handle to the same state
/// and listeners, which is how a listener gets hold of the subject it is
/// attached to.
///
/// ```rust
/// use std::convert::Infallible;
///
/// use rxsubject::prelude::*;
///
/// #[derive(Default)]
/// struct Readout(String);
///
/// impl Listener for Readout {
///   fn receive(&mut self, message: &str) -> Result<(), Infallible> {
///     self.0 = message.to_owned();
///     Ok(())
///   }
/// }
///
/// let subject: LocalSubject = LocalSubject::new();
/// let display = MutRc::own(Readout::default());
///
/// subject.attach(&display);
/// subject.set_state("21°C").unwrap();
/// assert_eq!(display.rc_deref().0, "21°C");
/// ```
///
/// # Re-Entrancy Policy
///
/// - Every notification pass works on a snapshot of the listener list taken
///   when the pass starts. `attach`/`detach` from inside a listener are
///   allowed and take effect from the next pass.
/// - **Emissions are not re-entrant**. Calling `set_state`/`notify` on the
///   same subject from inside one of its listeners panics, and the state is
///   left untouched.
/// - **Listeners are not re-entrant**. A listener that is still receiving
///   may not be notified again, even by another subject it is attached to.
///   That delivery panics.
pub struct LocalSubject<'a, Err = Infallible> {
  core: MutRc<SubjectCore<LocalSlot<'a, Err>>>,
}

impl<'a, Err> LocalSubject<'a, Err> {
  pub fn new() -> Self { Self::default() }

  /// Append `listener` to the end of the notification order.
  ///
  /// The subject keeps only a weak reference: dropping every `MutRc` of the
  /// listener is as good as detaching it. Attaching the same listener twice
  /// makes it receive every notification twice.
  pub fn attach<L>(&self, listener: &MutRc<L>)
  where
    L: Listener<Err> + 'a,
  {
    let weak = Rc::downgrade(&listener.0);
    let weak: Weak<RefCell<dyn Listener<Err> + 'a>> = weak;
    let mut core = self.core.rc_deref_mut();
    core.attach(WeakRc(weak));
    tracing::trace!(listeners = core.listener_count(), "listener attached");
  }

  /// Remove every entry of `listener` and return how many were removed.
  /// Detaching a listener that is not attached does nothing.
  pub fn detach<L>(&self, listener: &MutRc<L>) -> usize
  where
    L: Listener<Err> + ?Sized,
  {
    let removed = self.core.rc_deref_mut().detach(listener.addr());
    tracing::trace!(removed, "listener detached");
    removed
  }

  /// Replace the state and notify every attached listener of it.
  ///
  /// # Panics
  ///
  /// When called from inside a listener of this subject.
  #[track_caller]
  pub fn set_state(&self, state: impl Into<String>) -> Result<(), Err> {
    ensure_not_emitting(&self.core);
    self.core.rc_deref_mut().replace_state(state.into());
    deliver(&self.core)
  }

  /// Deliver the current state to every attached listener, in attach order.
  ///
  /// # Panics
  ///
  /// When called from inside a listener of this subject.
  #[track_caller]
  pub fn notify(&self) -> Result<(), Err> {
    ensure_not_emitting(&self.core);
    deliver(&self.core)
  }

  pub fn state(&self) -> String { self.core.rc_deref().state().to_owned() }

  /// Number of attached entries whose listener is still alive.
  pub fn listener_count(&self) -> usize { self.core.rc_deref().listener_count() }

  pub fn is_empty(&self) -> bool { self.listener_count() == 0 }
}

impl<Err> Default for LocalSubject<'_, Err> {
  fn default() -> Self { Self { core: MutRc::own(SubjectCore::default()) } }
}

impl<Err> Clone for LocalSubject<'_, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone() } }
}
