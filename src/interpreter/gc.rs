use std::cell::RefCell;
use std::rc::Weak;

use tracing::debug;

use super::object::ObjectData;
use crate::types::JsObject;

const PRUNE_THRESHOLD: usize = 4096;

/// Tracks every object allocated in a realm. Objects are reference
/// counted; the heap only holds weak handles so that it can break the
/// remaining cycles when the realm goes away.
#[derive(Default)]
pub struct Heap {
    objects: Vec<Weak<RefCell<ObjectData>>>,
    alloc_count: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, data: ObjectData) -> JsObject {
        let obj = JsObject::from_data(data);
        self.alloc_count += 1;
        if self.alloc_count >= PRUNE_THRESHOLD {
            self.prune();
        }
        self.objects.push(obj.downgrade());
        obj
    }

    /// Forgets handles to objects that have already been freed.
    fn prune(&mut self) {
        self.alloc_count = 0;
        let before = self.objects.len();
        self.objects.retain(|weak| weak.strong_count() > 0);
        debug!(freed = before - self.objects.len(), live = self.objects.len(), "heap pruned");
    }

    pub fn live_objects(&self) -> usize {
        self.objects.iter().filter(|weak| weak.strong_count() > 0).count()
    }

    /// Clears every live object so that cycles among them are released.
    fn teardown(&mut self) {
        let mut cleared = 0usize;
        for weak in self.objects.drain(..) {
            let Some(obj) = weak.upgrade() else { continue };
            // An object borrowed elsewhere is mid-use; its owner frees it.
            if let Ok(mut data) = obj.try_borrow_mut() {
                data.clear();
                cleared += 1;
            }
        }
        debug!(cleared, "heap torn down");
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Heap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heap")
            .field("tracked", &self.objects.len())
            .field("live", &self.live_objects())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::interpreter::object::{ObjectKind, PropertyDescriptor};
    use crate::types::JsValue;

    #[test]
    fn teardown_breaks_cycles() {
        let mut heap = Heap::new();
        let a = heap.allocate(ObjectData::new(None, ObjectKind::Ordinary));
        let b = heap.allocate(ObjectData::new(Some(a.clone()), ObjectKind::Ordinary));
        a.define_own_property("b".into(), PropertyDescriptor::data(JsValue::Object(b.clone()), true, true, true));
        let weak_a = a.downgrade();
        let weak_b = b.downgrade();
        drop(a);
        drop(b);
        // the cycle keeps both alive until the heap goes
        assert_eq!(heap.live_objects(), 2);
        drop(heap);
        assert!(weak_a.upgrade().is_none());
        assert!(weak_b.upgrade().is_none());
    }

    #[test]
    fn freed_objects_are_not_counted() {
        let mut heap = Heap::new();
        let kept = heap.allocate(ObjectData::new(None, ObjectKind::Ordinary));
        drop(heap.allocate(ObjectData::new(None, ObjectKind::Ordinary)));
        assert_eq!(heap.live_objects(), 1);
        assert_eq!(format!("{heap:?}"), "Heap { tracked: 2, live: 1 }");
        assert_eq!(Rc::strong_count(&kept.downgrade().upgrade().unwrap()), 2);
    }
}
