// crates/sitedocs-conformance-core/src/test_support.rs
// ============================================================================
// Module: Test Support
// Description: Scoped process-environment mutation for tests.
// Purpose: Let env-driven config tests run serially and restore state.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`ScopedEnv`] holds a process-wide lock for its lifetime, clears the named
//! variables on creation, and puts the previous values back on drop. Only
//! compiled for tests or with the `test-support` feature.

#![allow(unsafe_code, reason = "Environment mutation is serialized by ENV_LOCK.")]

use std::ffi::OsString;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

/// Serializes every [`ScopedEnv`] in the process.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Exclusive, self-restoring view of a set of environment variables.
pub struct ScopedEnv {
    /// Values to put back on drop.
    saved: Vec<(&'static str, Option<OsString>)>,
    /// Held until the saved values are restored.
    _lock: MutexGuard<'static, ()>,
}

impl ScopedEnv {
    /// Locks the environment and unsets `names`.
    #[must_use]
    pub fn cleared(names: &[&'static str]) -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let saved = names
            .iter()
            .map(|name| {
                let previous = std::env::var_os(name);
                // SAFETY: ENV_LOCK is held, so no other ScopedEnv touches the environment.
                unsafe { std::env::remove_var(name) };
                (*name, previous)
            })
            .collect();
        Self {
            saved,
            _lock: lock,
        }
    }

    /// Sets a variable while the scope is held.
    pub fn set(&self, name: &str, value: &str) {
        // SAFETY: ENV_LOCK is held for the lifetime of `self`.
        unsafe { std::env::set_var(name, value) };
    }

    /// Unsets a variable while the scope is held.
    pub fn remove(&self, name: &str) {
        // SAFETY: ENV_LOCK is held for the lifetime of `self`.
        unsafe { std::env::remove_var(name) };
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (name, value) in self.saved.drain(..) {
            match value {
                // SAFETY: ENV_LOCK is still held; `_lock` drops after this body.
                Some(value) => unsafe { std::env::set_var(name, value) },
                // SAFETY: as above.
                None => unsafe { std::env::remove_var(name) },
            }
        }
    }
}
