use std::{
  convert::Infallible,
  sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use super::subject_core::{deliver, ensure_not_emitting, SubjectCore};
use crate::{
  listener::Listener,
  rc::{MutArc, RcDeref, RcDerefMut, WeakArc},
};

type SharedSlot<'a, Err> = WeakArc<dyn Listener<Err> + Send + 'a>;

/// Thread-safe subject.
///
/// Same contract as [`LocalSubject`](super::LocalSubject), over
/// `Arc<Mutex<_>>`. Listeners must be `Send` and live in a [`MutArc`].
///
/// Emissions from different threads are serialized: a `set_state` waits for
/// the pass in flight on another thread to finish before it replaces the
/// state, so every pass delivers the value it was started with. `attach` and
/// `detach` never wait for a pass.
///
/// # Re-Entrancy Policy
///
/// - Passes work on a snapshot of the listener list; `attach`/`detach` from
///   inside a listener take effect from the next pass.
/// - Calling `set_state`/`notify` on the same subject from inside one of its
///   listeners panics before the state is touched.
/// - A listener is locked while it receives. If it makes another subject
///   notify it again on the same thread, for instance by calling
///   `set_state` on a second subject it is also attached to, that thread
///   **deadlocks** on the listener's own mutex. Such listener graphs must be
///   acyclic.
pub struct SharedSubject<'a, Err = Infallible> {
  core: MutArc<SubjectCore<SharedSlot<'a, Err>>>,
  gate: Arc<Mutex<()>>,
}

impl<'a, Err> SharedSubject<'a, Err> {
  pub fn new() -> Self { Self::default() }

  /// Append `listener` to the end of the notification order.
  pub fn attach<L>(&self, listener: &MutArc<L>)
  where
    L: Listener<Err> + Send + 'a,
  {
    let weak = Arc::downgrade(&listener.0);
    let weak: Weak<Mutex<dyn Listener<Err> + Send + 'a>> = weak;
    let mut core = self.core.rc_deref_mut();
    core.attach(WeakArc(weak));
    tracing::trace!(listeners = core.listener_count(), "listener attached");
  }

  /// Remove every entry of `listener` and return how many were removed.
  pub fn detach<L>(&self, listener: &MutArc<L>) -> usize
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
    let _gate = self.pass();
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
    let _gate = self.pass();
    deliver(&self.core)
  }

  pub fn state(&self) -> String { self.core.rc_deref().state().to_owned() }

  /// Number of attached entries whose listener is still alive.
  pub fn listener_count(&self) -> usize { self.core.rc_deref().listener_count() }

  pub fn is_empty(&self) -> bool { self.listener_count() == 0 }

  fn pass(&self) -> MutexGuard<'_, ()> {
    self.gate.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<Err> Default for SharedSubject<'_, Err> {
  fn default() -> Self {
    Self { core: MutArc::own(SubjectCore::default()), gate: Arc::new(Mutex::new(())) }
  }
}

impl<Err> Clone for SharedSubject<'_, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone(), gate: self.gate.clone() } }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Default)]
  struct Last(String);

  impl Listener for Last {
    fn receive(&mut self, message: &str) -> Result<(), Infallible> {
      self.0 = message.to_owned();
      Ok(())
    }
  }

  fn assert_send_sync<T: Send + Sync>() {}

  #[rxsubject_macro::test]
  fn smoke() {
    let subject: SharedSubject = SharedSubject::new();
    let listener = MutArc::own(Last::default());

    subject.attach(&listener);
    subject.set_state("test shared subject").unwrap();

    assert_eq!(listener.rc_deref().0, "test shared subject");
    assert_eq!(subject.listener_count(), 1);
    assert_eq!(subject.detach(&listener), 1);
    assert!(subject.is_empty());
  }

  #[rxsubject_macro::test]
  fn handles_cross_threads() {
    assert_send_sync::<SharedSubject<'static>>();
    assert_send_sync::<SharedSubject<'static, String>>();
  }

  #[cfg(not(target_arch = "wasm32"))]
  #[rxsubject_macro::test]
  fn emission_from_another_thread() {
    let subject: SharedSubject = SharedSubject::new();
    let listener = MutArc::own(Last::default());
    subject.attach(&listener);

    let c_subject = subject.clone();
    std::thread::spawn(move || c_subject.set_state("from a worker").unwrap())
      .join()
      .unwrap();

    assert_eq!(subject.state(), "from a worker");
    assert_eq!(listener.rc_deref().0, "from a worker");
  }
}
