// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-type arena binding.
//!
//! Different kinds of objects want different arenas without every call
//! site having to spell one out. Implementing [`Sentry`] for a type gives
//! it a process-wide "current arena" slot, lazily defaulting to the
//! default heap, that [`Sentry::into_tracked`] consults on every
//! allocation.
//!
//! ```
//! use mem_sentry::{Heap, Sentry};
//!
//! struct Particle {
//!     x: f32,
//!     y: f32,
//! }
//! impl Sentry for Particle {}
//!
//! let vfx = Heap::new("Vfx");
//! Particle::bind_heap(&vfx);
//!
//! let p = Particle { x: 0.0, y: 1.0 }.into_tracked().unwrap();
//! assert_eq!(vfx.allocation_count(), 1);
//! drop(p);
//! ```

use crate::boxed::HeapBox;
use crate::error::SentryError;
use crate::heap::Heap;
use crate::hierarchy::default_heap;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Current arena per concrete type.
static BINDINGS: OnceLock<RwLock<HashMap<TypeId, Arc<Heap>>>> = OnceLock::new();

fn bindings() -> &'static RwLock<HashMap<TypeId, Arc<Heap>>> {
    BINDINGS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Routes a type's tracked allocations to a bound arena.
///
/// All methods are provided; `impl Sentry for MyType {}` is the whole
/// opt-in. Binding is per concrete type and process-wide. Construction on
/// an explicit arena ([`HeapBox::new_in`]) bypasses the binding.
pub trait Sentry: Any + Sized {
    /// The arena currently bound to this type, or the default heap when
    /// none was bound yet.
    fn bound_heap() -> Arc<Heap> {
        if let Some(heap) = bindings().read().get(&TypeId::of::<Self>()) {
            return Arc::clone(heap);
        }
        Arc::clone(default_heap())
    }

    /// Binds this type's allocations to `heap` from now on.
    fn bind_heap(heap: &Arc<Heap>) {
        bindings().write().insert(TypeId::of::<Self>(), Arc::clone(heap));
    }

    /// Reverts this type to the default heap.
    fn unbind_heap() {
        bindings().write().remove(&TypeId::of::<Self>());
    }

    /// Moves `self` into a tracked allocation on the bound arena.
    fn into_tracked(self) -> Result<HeapBox<Self>, SentryError> {
        HeapBox::new_in(self, &Self::bound_heap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget(#[allow(dead_code)] u32);
    impl Sentry for Widget {}

    struct Gadget;
    impl Sentry for Gadget {}

    #[test]
    fn test_unbound_type_uses_default_heap() {
        assert!(Arc::ptr_eq(&Gadget::bound_heap(), default_heap()));
    }

    #[test]
    fn test_binding_is_per_type() {
        let widgets = Heap::new("Widgets");
        Widget::bind_heap(&widgets);

        assert!(Arc::ptr_eq(&Widget::bound_heap(), &widgets));
        assert!(Arc::ptr_eq(&Gadget::bound_heap(), default_heap()));

        let w = Widget(3).into_tracked().unwrap();
        #[cfg(any(feature = "tracking", debug_assertions))]
        assert_eq!(widgets.allocation_count(), 1);
        drop(w);
        assert_eq!(widgets.allocation_count(), 0);

        Widget::unbind_heap();
        assert!(Arc::ptr_eq(&Widget::bound_heap(), default_heap()));
    }
}
