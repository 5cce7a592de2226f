use std::{
  marker::PhantomData,
  ptr,
  thread::{self, ThreadId},
};

use smallvec::SmallVec;

#[cfg(feature = "shared")]
use crate::rc::{MutArc, WeakArc};
use crate::{
  listener::Listener,
  rc::{MutRc, RcDeref, RcDerefMut, WeakRc},
};

// ============================================================================
// ListenerSlot
// ============================================================================

/// A non-owning listener reference as stored by a subject.
///
/// Slots never keep their listener alive. `upgrade` hands out a temporary
/// owning handle for the duration of one delivery.
pub(crate) trait ListenerSlot: Clone {
  type Handle;

  fn upgrade(&self) -> Option<Self::Handle>;

  fn is_alive(&self) -> bool;

  /// Address of the listener allocation, used as its identity.
  fn addr(&self) -> *const ();
}

impl<T: ?Sized> ListenerSlot for WeakRc<T> {
  type Handle = MutRc<T>;

  #[inline]
  fn upgrade(&self) -> Option<MutRc<T>> { WeakRc::upgrade(self) }

  #[inline]
  fn is_alive(&self) -> bool { WeakRc::is_alive(self) }

  #[inline]
  fn addr(&self) -> *const () { WeakRc::addr(self) }
}

#[cfg(feature = "shared")]
impl<T: ?Sized> ListenerSlot for WeakArc<T> {
  type Handle = MutArc<T>;

  #[inline]
  fn upgrade(&self) -> Option<MutArc<T>> { WeakArc::upgrade(self) }

  #[inline]
  fn is_alive(&self) -> bool { WeakArc::is_alive(self) }

  #[inline]
  fn addr(&self) -> *const () { WeakArc::addr(self) }
}

// ============================================================================
// SubjectCore
// ============================================================================

/// Listeners captured at the start of a notification pass.
pub(crate) type Snapshot<W> = SmallVec<[W; 4]>;

/// State and listener registry shared by every handle of one subject.
///
/// The registry keeps insertion order and allows duplicates. `emitting`
/// records the thread currently running a notification pass so a listener
/// that tries to emit on the same subject can be rejected.
pub(crate) struct SubjectCore<W> {
  state: String,
  listeners: SmallVec<[W; 2]>,
  emitting: Option<ThreadId>,
}

impl<W> Default for SubjectCore<W> {
  fn default() -> Self { Self { state: String::new(), listeners: SmallVec::new(), emitting: None } }
}

impl<W: ListenerSlot> SubjectCore<W> {
  #[inline]
  pub(crate) fn state(&self) -> &str { &self.state }

  #[inline]
  pub(crate) fn replace_state(&mut self, state: String) { self.state = state; }

  /// Number of entries whose listener is still alive.
  pub(crate) fn listener_count(&self) -> usize {
    self.listeners.iter().filter(|slot| slot.is_alive()).count()
  }

  #[inline]
  pub(crate) fn attach(&mut self, slot: W) { self.listeners.push(slot); }

  /// Remove every entry pointing at `addr` and return how many there were.
  /// Dead entries are dropped on the way.
  pub(crate) fn detach(&mut self, addr: *const ()) -> usize {
    let mut removed = 0;
    self.listeners.retain(|slot| {
      if ptr::addr_eq(slot.addr(), addr) {
        removed += 1;
        false
      } else {
        slot.is_alive()
      }
    });
    removed
  }

  #[inline]
  pub(crate) fn is_emitting_here(&self) -> bool {
    self.emitting == Some(thread::current().id())
  }

  fn begin_emission(&mut self) -> (String, Snapshot<W>) {
    self.emitting = Some(thread::current().id());
    (self.state.clone(), self.listeners.iter().cloned().collect())
  }

  fn end_emission(&mut self) -> usize {
    self.emitting = None;
    let before = self.listeners.len();
    self.listeners.retain(|slot| slot.is_alive());
    before - self.listeners.len()
  }
}

// ============================================================================
// Emission
// ============================================================================

/// Marks a notification pass as running for as long as it is alive.
///
/// Dropping it (normally, on a listener error, or while unwinding from a
/// listener panic) clears the emitting mark and prunes dead entries.
pub(crate) struct Emission<'c, P, W>
where
  P: RcDerefMut<Target = SubjectCore<W>>,
  W: ListenerSlot,
{
  core: &'c P,
  _slot: PhantomData<W>,
}

impl<'c, P, W> Emission<'c, P, W>
where
  P: RcDerefMut<Target = SubjectCore<W>>,
  W: ListenerSlot,
{
  fn begin(core: &'c P) -> (Self, String, Snapshot<W>) {
    let (message, snapshot) = core.rc_deref_mut().begin_emission();
    (Self { core, _slot: PhantomData }, message, snapshot)
  }
}

impl<P, W> Drop for Emission<'_, P, W>
where
  P: RcDerefMut<Target = SubjectCore<W>>,
  W: ListenerSlot,
{
  fn drop(&mut self) {
    let pruned = self.core.rc_deref_mut().end_emission();
    if pruned > 0 {
      tracing::debug!(pruned, "pruned dropped listeners");
    }
  }
}

/// Panics when called from inside a notification pass of the same subject.
#[track_caller]
pub(crate) fn ensure_not_emitting<P, W>(core: &P)
where
  P: RcDeref<Target = SubjectCore<W>>,
  W: ListenerSlot,
{
  let reentrant = core.rc_deref().is_emitting_here();
  if reentrant {
    panic!(
      "re-entrant subject emissions are not supported (set_state/notify). Change the state \
       after the current notification returns."
    );
  }
}

/// Delivers the current state to a snapshot of the listeners, in order.
///
/// Listeners dropped before their turn are skipped. The first listener error
/// ends the pass and is returned.
pub(crate) fn deliver<P, W, Err>(core: &P) -> Result<(), Err>
where
  P: RcDerefMut<Target = SubjectCore<W>>,
  W: ListenerSlot,
  W::Handle: Listener<Err>,
{
  let (_emission, message, snapshot) = Emission::begin(core);
  tracing::trace!(listeners = snapshot.len(), state_len = message.len(), "notifying listeners");
  for (position, slot) in snapshot.iter().enumerate() {
    let Some(mut listener) = slot.upgrade() else { continue };
    if let Err(err) = listener.receive(&message) {
      tracing::debug!(position, skipped = snapshot.len() - position - 1, "listener failed");
      return Err(err);
    }
  }
  Ok(())
}

// ============================================================================
// Tests
// ============================================================================
