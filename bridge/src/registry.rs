//! Handle registry: maps opaque tokens to live host contexts.
//!
//! An engine only ever sees a token (disguised as the context pointer of
//! the callback table). Each callback looks the token up here to find the
//! `HostContext` lent to the execution in progress.
//!
//! Rules:
//!
//! - Tokens are unique for the life of the process and never zero, so the
//!   pointer an engine receives is never null.
//! - The lock is held only to insert, copy out, or remove an entry; never
//!   while a host method runs. Nested executions register from inside a
//!   callback on the same thread.
//! - A [`Registration`] removes its entry when dropped, so a token cannot
//!   outlive the borrow it was created from.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use evmlink_hostapi::HostContext;
use evmlink_primitives::ffi::HostContextHandle;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::error::ProtocolError;

static NEXT_TOKEN: AtomicUsize = AtomicUsize::new(1);

static GLOBAL: Lazy<HandleRegistry> = Lazy::new(HandleRegistry::new);

/// The registry consulted by the host callback table.
pub fn global() -> &'static HandleRegistry {
    &GLOBAL
}

/// An opaque token naming one registered host context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleToken(usize);

impl HandleToken {
    pub fn get(self) -> usize {
        self.0
    }

    /// The token in the shape the callback table carries it.
    pub fn as_context_ptr(self) -> *mut HostContextHandle {
        self.0 as *mut HostContextHandle
    }

    /// Recover a token from a callback's context argument.
    pub fn from_context_ptr(ptr: *mut HostContextHandle) -> Self {
        Self(ptr as usize)
    }
}

/// A lifetime-erased pointer to a registered host context.
#[derive(Clone, Copy)]
pub struct ContextPtr(NonNull<dyn HostContext>);

// SAFETY: the pointer is only dereferenced by callbacks of the execution
// that registered it, which run on the registering thread. The map merely
// stores it.
unsafe impl Send for ContextPtr {}

impl ContextPtr {
    /// Reborrow the host context.
    ///
    /// # Safety
    ///
    /// The token this pointer was looked up with must still be registered,
    /// and no other reference obtained this way may be in use, except by
    /// frames below this one on the same thread.
    pub unsafe fn as_mut<'a>(self) -> &'a mut dyn HostContext {
        &mut *self.0.as_ptr()
    }
}

/// Token → host context map.
pub struct HandleRegistry {
    entries: Mutex<HashMap<usize, ContextPtr>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register `host` under a fresh token for as long as the returned
    /// guard lives.
    pub fn register<'c>(&self, host: &'c mut (dyn HostContext + 'c)) -> Registration<'_, 'c> {
        let token = HandleToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed));
        let ptr: NonNull<dyn HostContext + 'c> = NonNull::from(host);
        // SAFETY: only the lifetime bound changes. The entry is removed when
        // the guard drops, and the guard cannot outlive 'c.
        let ptr: NonNull<dyn HostContext + 'static> = unsafe { std::mem::transmute(ptr) };
        self.entries.lock().insert(token.0, ContextPtr(ptr));
        Registration {
            registry: self,
            token,
            _borrow: PhantomData,
        }
    }

    /// Find the context registered under `token`.
    pub fn lookup(&self, token: HandleToken) -> Result<ContextPtr, ProtocolError> {
        let entry = self.entries.lock().get(&token.0).copied();
        entry.ok_or(ProtocolError::UnknownHandle(token.0))
    }

    /// Remove `token`. Releasing an unknown or already released token is an
    /// error.
    pub fn release(&self, token: HandleToken) -> Result<(), ProtocolError> {
        match self.entries.lock().remove(&token.0) {
            Some(_) => Ok(()),
            None => Err(ProtocolError::UnknownHandle(token.0)),
        }
    }

    /// Number of registered contexts.
    pub fn live_count(&self) -> usize {
        self.entries.lock().len()
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a host context registered; releases the token on drop.
pub struct Registration<'r, 'c> {
    registry: &'r HandleRegistry,
    token: HandleToken,
    _borrow: PhantomData<&'c mut ()>,
}

impl Registration<'_, '_> {
    pub fn token(&self) -> HandleToken {
        self.token
    }
}

impl Drop for Registration<'_, '_> {
    fn drop(&mut self) {
        if let Err(err) = self.registry.release(self.token) {
            crate::dispatch::violation("release", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evmlink_hostapi::MemHost;
    use evmlink_primitives::{Address, Bytes32};

    #[test]
    fn test_tokens_unique_and_nonzero() {
        let registry = HandleRegistry::new();
        let mut a = MemHost::new();
        let mut b = MemHost::new();
        let ra = registry.register(&mut a);
        let rb = registry.register(&mut b);
        assert_ne!(ra.token(), rb.token());
        assert!(!ra.token().as_context_ptr().is_null());
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn test_lookup_reaches_registered_host() {
        let registry = HandleRegistry::new();
        let mut host = MemHost::new();
        host.insert_storage(Address([1; 20]), Bytes32::ZERO, Bytes32::from_u64(7));
        let reg = registry.register(&mut host);
        let ptr = registry.lookup(reg.token()).unwrap();
        let value = unsafe { ptr.as_mut() }.get_storage(&Address([1; 20]), &Bytes32::ZERO);
        assert_eq!(value.to_u64(), Some(7));
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let registry = HandleRegistry::new();
        let mut host = MemHost::new();
        let token = {
            let reg = registry.register(&mut host);
            reg.token()
        };
        assert_eq!(registry.live_count(), 0);
        assert_eq!(
            registry.lookup(token).err(),
            Some(ProtocolError::UnknownHandle(token.get()))
        );
    }

    #[test]
    fn test_double_release_detected() {
        let registry = HandleRegistry::new();
        let mut host = MemHost::new();
        let token = registry.register(&mut host).token();
        assert_eq!(
            registry.release(token),
            Err(ProtocolError::UnknownHandle(token.get()))
        );
    }

    #[test]
    fn test_guard_after_out_of_band_release_is_reported() {
        let registry = HandleRegistry::new();
        let mut host = MemHost::new();
        let reg = registry.register(&mut host);
        registry.release(reg.token()).unwrap();
        let before = crate::dispatch::violation_count();
        drop(reg);
        assert!(crate::dispatch::violation_count() > before);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_unknown_token() {
        let registry = HandleRegistry::new();
        let bogus = HandleToken::from_context_ptr(usize::MAX as *mut HostContextHandle);
        assert!(registry.lookup(bogus).is_err());
    }

    #[test]
    fn test_register_while_callback_active() {
        // A host method that registers a second context must not deadlock.
        let registry = HandleRegistry::new();
        let mut outer = MemHost::new();
        let reg = registry.register(&mut outer);
        let ptr = registry.lookup(reg.token()).unwrap();
        let outer_ref = unsafe { ptr.as_mut() };

        let mut inner = MemHost::new();
        let inner_reg = registry.register(&mut inner);
        assert_eq!(registry.live_count(), 2);
        outer_ref.access_account(&Address::ZERO);
        drop(inner_reg);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_concurrent_registrations() {
        let registry = HandleRegistry::new();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let mut host = MemHost::new();
                        let reg = registry.register(&mut host);
                        assert!(registry.lookup(reg.token()).is_ok());
                    }
                });
            }
        });
        assert_eq!(registry.live_count(), 0);
    }
}
