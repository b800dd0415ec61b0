use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

/// Locks a mutex, recovering the guard if a previous holder panicked.
///
/// Every structure guarded this way is left consistent between
/// statements, so a poisoned lock carries no torn state.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Like [`lock`], but returns `None` instead of waiting for a holder.
pub(crate) fn try_lock<T: ?Sized>(mutex: &Mutex<T>) -> Option<MutexGuard<'_, T>> {
    match mutex.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}
