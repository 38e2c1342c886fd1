//! Typed side-channel for ambient per-session data
//!
//! An [`AttachmentKey<T>`] carries the type of the value stored under it, so
//! [`Attachments::get`] hands back `Arc<T>` without caller-side casts.

use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Key for a value of type `T`
///
/// Two keys collide only if both name and type are equal.
pub struct AttachmentKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> AttachmentKey<T> {
    /// Create key
    #[inline]
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Key name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn slot(&self) -> (TypeId, &'static str) {
        (TypeId::of::<T>(), self.name)
    }
}

impl<T> Clone for AttachmentKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AttachmentKey<T> {}

impl<T> fmt::Debug for AttachmentKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AttachmentKey").field(&self.name).finish()
    }
}

/// Concurrent heterogeneous map keyed by [`AttachmentKey`]
#[derive(Default)]
pub struct Attachments {
    inner: RwLock<HashMap<(TypeId, &'static str), Arc<dyn Any + Send + Sync>>>,
}

impl Attachments {
    /// Create empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, returning the previous one
    pub fn attach<T: Any + Send + Sync>(&self, key: &AttachmentKey<T>, value: T) -> Option<Arc<T>> {
        let previous = self.inner.write().insert(key.slot(), Arc::new(value));
        previous.and_then(|old| old.downcast::<T>().ok())
    }

    /// Store `value` unless something is already attached; returns the stored value
    pub fn attach_if_absent<T: Any + Send + Sync>(&self, key: &AttachmentKey<T>, value: T) -> Arc<T> {
        let mut guard = self.inner.write();
        let stored = guard
            .entry(key.slot())
            .or_insert_with(|| Arc::new(value))
            .clone();
        drop(guard);
        match stored.downcast::<T>() {
            Ok(typed) => typed,
            // slot includes the TypeId, so the stored value always has type T
            Err(_) => unreachable!("attachment slot holds a value of another type"),
        }
    }

    /// Value attached under `key`
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &AttachmentKey<T>) -> Option<Arc<T>> {
        let value = self.inner.read().get(&key.slot()).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Remove and return the value under `key`
    pub fn detach<T: Any + Send + Sync>(&self, key: &AttachmentKey<T>) -> Option<Arc<T>> {
        let removed = self.inner.write().remove(&key.slot())?;
        removed.downcast::<T>().ok()
    }

    /// Number of attached values
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if nothing is attached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl fmt::Debug for Attachments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.inner.read().keys().map(|(_, name)| *name).collect();
        f.debug_struct("Attachments").field("keys", &names).finish()
    }
}
