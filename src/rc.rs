use std::{
  cell::{Ref, RefCell, RefMut},
  ops::{Deref, DerefMut},
  rc::{Rc, Weak},
};
#[cfg(feature = "shared")]
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak as ArcWeak};

use crate::listener::Listener;

pub trait RcDeref {
  type Target: ?Sized;
  type Guard<'a>: Deref<Target = Self::Target>
  where
    Self: 'a;
  fn rc_deref(&self) -> Self::Guard<'_>;
}

pub trait RcDerefMut: RcDeref {
  type GuardMut<'a>: DerefMut<Target = Self::Target>
  where
    Self: 'a;
  fn rc_deref_mut(&self) -> Self::GuardMut<'_>;
}

/// Owning, single-threaded handle. Listeners attached to a `LocalSubject` live
/// in one of these; the subject only keeps the [`WeakRc`] side.
pub struct MutRc<T: ?Sized>(pub(crate) Rc<RefCell<T>>);

/// Non-owning side of a [`MutRc`].
pub struct WeakRc<T: ?Sized>(pub(crate) Weak<RefCell<T>>);

/// Owning, thread-safe handle. Listeners attached to a `SharedSubject` live in
/// one of these; the subject only keeps the [`WeakArc`] side.
#[cfg(feature = "shared")]
pub struct MutArc<T: ?Sized>(pub(crate) Arc<Mutex<T>>);

/// Non-owning side of a [`MutArc`].
#[cfg(feature = "shared")]
pub struct WeakArc<T: ?Sized>(pub(crate) ArcWeak<Mutex<T>>);

impl<T> MutRc<T> {
  pub fn own(t: T) -> Self { Self(Rc::new(RefCell::new(t))) }
}

#[cfg(feature = "shared")]
impl<T> MutArc<T> {
  pub fn own(t: T) -> Self { Self(Arc::new(Mutex::new(t))) }
}

impl<T: ?Sized> MutRc<T> {
  #[inline]
  pub fn downgrade(&self) -> WeakRc<T> { WeakRc(Rc::downgrade(&self.0)) }

  /// `true` when both handles point at the same allocation.
  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }

  #[inline]
  pub(crate) fn addr(&self) -> *const () { Rc::as_ptr(&self.0).cast() }
}

#[cfg(feature = "shared")]
impl<T: ?Sized> MutArc<T> {
  #[inline]
  pub fn downgrade(&self) -> WeakArc<T> { WeakArc(Arc::downgrade(&self.0)) }

  /// `true` when both handles point at the same allocation.
  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }

  #[inline]
  pub(crate) fn addr(&self) -> *const () { Arc::as_ptr(&self.0).cast() }
}

impl<T: ?Sized> WeakRc<T> {
  #[inline]
  pub fn upgrade(&self) -> Option<MutRc<T>> { self.0.upgrade().map(MutRc) }

  #[inline]
  pub fn is_alive(&self) -> bool { self.0.strong_count() > 0 }

  // The allocation outlives every weak handle, so the address of a dead entry
  // is never reused by a live listener.
  #[inline]
  pub(crate) fn addr(&self) -> *const () { self.0.as_ptr().cast() }
}

#[cfg(feature = "shared")]
impl<T: ?Sized> WeakArc<T> {
  #[inline]
  pub fn upgrade(&self) -> Option<MutArc<T>> { self.0.upgrade().map(MutArc) }

  #[inline]
  pub fn is_alive(&self) -> bool { self.0.strong_count() > 0 }

  #[inline]
  pub(crate) fn addr(&self) -> *const () { self.0.as_ptr().cast() }
}

impl<T: ?Sized> RcDeref for MutRc<T> {
  type Target = T;
  type Guard<'a>
    = Ref<'a, T>
  where
    Self: 'a;

  #[inline]
  fn rc_deref(&self) -> Self::Guard<'_> { self.0.borrow() }
}

impl<T: ?Sized> RcDerefMut for MutRc<T> {
  type GuardMut<'a>
    = RefMut<'a, T>
  where
    Self: 'a;

  #[inline]
  fn rc_deref_mut(&self) -> Self::GuardMut<'_> { self.0.borrow_mut() }
}

// A panic inside a listener poisons its mutex; the value itself is still
// consistent from the subject's point of view, so the guard is recovered.
#[cfg(feature = "shared")]
impl<T: ?Sized> RcDeref for MutArc<T> {
  type Target = T;
  type Guard<'a>
    = MutexGuard<'a, T>
  where
    Self: 'a;

  #[inline]
  fn rc_deref(&self) -> Self::Guard<'_> { self.0.lock().unwrap_or_else(PoisonError::into_inner) }
}

#[cfg(feature = "shared")]
impl<T: ?Sized> RcDerefMut for MutArc<T> {
  type GuardMut<'a>
    = MutexGuard<'a, T>
  where
    Self: 'a;

  #[inline]
  fn rc_deref_mut(&self) -> Self::GuardMut<'_> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<T, Err> Listener<Err> for MutRc<T>
where
  T: Listener<Err> + ?Sized,
{
  /// # Panics
  ///
  /// When the listener is already receiving, e.g. a listener attached to two
  /// subjects that makes the second one notify it from inside `receive`.
  #[track_caller]
  fn receive(&mut self, message: &str) -> Result<(), Err> {
    let Ok(mut listener) = self.0.try_borrow_mut() else {
      panic!(
        "re-entrant listener notification is not supported: the listener is still receiving. \
         Emit on the other subject after `receive` returns."
      );
    };
    listener.receive(message)
  }
}

// Same-thread re-entry blocks on the listener's own lock. See `SharedSubject`.
#[cfg(feature = "shared")]
impl<T, Err> Listener<Err> for MutArc<T>
where
  T: Listener<Err> + ?Sized,
{
  #[inline]
  fn receive(&mut self, message: &str) -> Result<(), Err> { self.rc_deref_mut().receive(message) }
}

macro_rules! handle_impl {
  ($rc: ident, $weak: ident) => {
    impl<T: ?Sized> Clone for $rc<T> {
      #[inline]
      fn clone(&self) -> Self { Self(self.0.clone()) }
    }

    impl<T: ?Sized> Clone for $weak<T> {
      #[inline]
      fn clone(&self) -> Self { Self(self.0.clone()) }
    }

    impl<T> From<T> for $rc<T> {
      #[inline]
      fn from(t: T) -> Self { Self::own(t) }
    }

    impl<T: Default> Default for $rc<T> {
      #[inline]
      fn default() -> Self { Self::own(T::default()) }
    }
  };
}

handle_impl!(MutRc, WeakRc);
#[cfg(feature = "shared")]
handle_impl!(MutArc, WeakArc);

#[cfg(test)]
mod tests {
  use std::convert::Infallible;

  use super::*;

  #[derive(Default)]
  struct Last(String);

  impl Listener for Last {
    fn receive(&mut self, message: &str) -> Result<(), Infallible> {
      self.0 = message.to_owned();
      Ok(())
    }
  }

  #[rxsubject_macro::test]
  fn identity_is_the_allocation() {
    let a = MutRc::own(1);
    let b = MutRc::own(1);
    assert!(a.ptr_eq(&a.clone()));
    assert!(!a.ptr_eq(&b));
    assert_eq!(a.addr(), a.downgrade().addr());
    assert_ne!(a.addr(), b.downgrade().addr());
  }

  #[rxsubject_macro::test]
  fn weak_does_not_keep_value_alive() {
    let owner = MutRc::own(String::from("v"));
    let weak = owner.downgrade();
    assert!(weak.is_alive());
    assert_eq!(*weak.upgrade().unwrap().rc_deref(), "v");

    drop(owner);
    assert!(!weak.is_alive());
    assert!(weak.upgrade().is_none());
  }

  #[rxsubject_macro::test]
  fn handle_forwards_to_listener() {
    let inner = MutRc::<Last>::default();
    let mut forwarding = inner.clone();
    forwarding.receive("through the handle").unwrap();
    assert_eq!(inner.rc_deref().0, "through the handle");
  }

  #[rxsubject_macro::test]
  #[should_panic(expected = "re-entrant listener notification")]
  fn busy_listener_refuses_delivery() {
    let inner = MutRc::<Last>::default();
    let mut forwarding = inner.clone();
    let _receiving = inner.rc_deref_mut();
    let _ = forwarding.receive("while busy");
  }

  #[cfg(feature = "shared")]
  #[rxsubject_macro::test]
  fn shared_weak_does_not_keep_value_alive() {
    let owner = MutArc::own(7);
    let weak = owner.downgrade();
    assert_eq!(*weak.upgrade().unwrap().rc_deref(), 7);
    assert_eq!(owner.addr(), weak.addr());

    drop(owner);
    assert!(weak.upgrade().is_none());
  }

  #[cfg(all(feature = "shared", not(target_arch = "wasm32")))]
  #[rxsubject_macro::test]
  fn poisoned_mutex_is_recovered() {
    let value = MutArc::own(Last::default());
    let c_value = value.clone();
    let result = std::thread::spawn(move || {
      let _guard = c_value.rc_deref_mut();
      panic!("poison the lock");
    })
    .join();
    assert!(result.is_err());

    let mut handle = value.clone();
    handle.receive("after poison").unwrap();
    assert_eq!(value.rc_deref().0, "after poison");
  }
}
