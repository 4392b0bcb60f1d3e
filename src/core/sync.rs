//! Synchronisation utilities for lock poisoning
//!
//! Lock poisoning only happens after a panic while a guard was held. These
//! helpers turn it into a module error so callers can log it and carry on
//! instead of propagating the panic to every thread sharing a process queue.

use std::sync::{LockResult, PoisonError, RwLockReadGuard, RwLockWriteGuard};

/// Convert a poisoned mutex lock into an application error
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use popqueue::core::sync::handle_mutex_poison;
/// use popqueue::consumer::ConsumerError;
///
/// let mutex = Mutex::new(42);
/// let guard = handle_mutex_poison(mutex.lock(), |message| {
///     ConsumerError::Synchronisation { message }
/// })
/// .unwrap();
/// assert_eq!(*guard, 42);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (mutex poisoned). PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Convert a poisoned RwLock read into an application error
pub fn handle_rwlock_read<T, E>(
    result: LockResult<RwLockReadGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockReadGuard<T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (RwLock read poisoned). PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Convert a poisoned RwLock write into an application error
pub fn handle_rwlock_write<T, E>(
    result: LockResult<RwLockWriteGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (RwLock write poisoned). PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Take the guard out of a poisoned lock, logging that it happened
///
/// For state that stays consistent across a panic, such as bookkeeping
/// that is only ever appended to.
pub fn recover_lock_poison<T>(result: LockResult<T>, lock_name: &str) -> T {
    result.unwrap_or_else(|poison_err| {
        log::warn!("Recovered poisoned lock {}", lock_name);
        PoisonError::into_inner(poison_err)
    })
}
