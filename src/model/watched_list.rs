//! An ordered working set that watches its records.
//!
//! [`WatchedList`] subscribes to each record as it enters the list and
//! unsubscribes as it leaves, then re-publishes every in-place field edit as
//! a list-level [`ListChange::Replaced`] carrying the record's position. The
//! position is recomputed when the edit happens, not when the record was
//! added, so it stays correct after earlier insertions and removals have
//! shifted the record around.

use crate::model::record::Subscription;
use crate::model::{Field, SharedPurchase};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A list-level change notification.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ListChange {
    /// A record was appended or inserted at `index`.
    Added { index: usize },
    /// The record at `index` was removed.
    Removed { index: usize },
    /// A field of the record currently at `index` was edited in place.
    Replaced { index: usize, field: Field },
}

type ChangeListener = Box<dyn Fn(&ListChange)>;
type ItemListener = Box<dyn Fn(&SharedPurchase, Field)>;

struct ListInner {
    items: RefCell<Vec<SharedPurchase>>,
    /// Registry of the field-change subscription held for each distinct
    /// record currently in `items`. Keyed by record identity (`Rc::ptr_eq`).
    tracked: RefCell<Vec<(SharedPurchase, Subscription)>>,
    changed: RefCell<Vec<ChangeListener>>,
    item_changed: RefCell<Vec<ItemListener>>,
}

/// An ordered sequence of [`SharedPurchase`] records with automatic
/// subscription lifecycle management tied to membership.
#[derive(Clone)]
pub struct WatchedList {
    inner: Rc<ListInner>,
}

impl Default for WatchedList {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchedList {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ListInner {
                items: RefCell::new(Vec::new()),
                tracked: RefCell::new(Vec::new()),
                changed: RefCell::new(Vec::new()),
                item_changed: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Builds a list pre-populated from `records`, subscribing to each one.
    pub fn from_records(records: impl IntoIterator<Item = SharedPurchase>) -> Self {
        let list = Self::new();
        for record in records {
            list.push(&record);
        }
        list
    }

    /// Appends `record` and subscribes to its field changes. Pushing a record
    /// that is already present keeps a single subscription.
    pub fn push(&self, record: &SharedPurchase) {
        let index = {
            let mut items = self.inner.items.borrow_mut();
            items.push(Rc::clone(record));
            items.len() - 1
        };
        self.track(record);
        self.inner.emit_changed(&ListChange::Added { index });
    }

    /// Inserts `record` at `index`, shifting everything after it.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, like `Vec::insert`.
    pub fn insert(&self, index: usize, record: &SharedPurchase) {
        self.inner.items.borrow_mut().insert(index, Rc::clone(record));
        self.track(record);
        self.inner.emit_changed(&ListChange::Added { index });
    }

    /// Removes the first occurrence of `record` and, if no other occurrence
    /// remains, drops the field-change subscription. Returns `false` when the
    /// record is not in the list.
    pub fn remove(&self, record: &SharedPurchase) -> bool {
        let index = match self.index_of(record) {
            Some(index) => index,
            None => return false,
        };
        self.inner.items.borrow_mut().remove(index);

        let still_present = self.index_of(record).is_some();
        if !still_present {
            let mut tracked = self.inner.tracked.borrow_mut();
            if let Some(pos) = tracked.iter().position(|(r, _)| Rc::ptr_eq(r, record)) {
                let (r, sub) = tracked.remove(pos);
                r.unsubscribe(sub);
            }
        }

        self.inner.emit_changed(&ListChange::Removed { index });
        true
    }

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<SharedPurchase> {
        self.inner.items.borrow().get(index).cloned()
    }

    /// The current position of `record`, by reference identity.
    pub fn index_of(&self, record: &SharedPurchase) -> Option<usize> {
        self.inner
            .items
            .borrow()
            .iter()
            .position(|r| Rc::ptr_eq(r, record))
    }

    /// A snapshot of the current sequence (cheap `Rc` clones).
    pub fn records(&self) -> Vec<SharedPurchase> {
        self.inner.items.borrow().clone()
    }

    /// Registers a listener for list-level changes, including the
    /// [`ListChange::Replaced`] events re-published for in-place edits.
    pub fn on_changed(&self, listener: impl Fn(&ListChange) + 'static) {
        self.inner.changed.borrow_mut().push(Box::new(listener));
    }

    /// Registers a listener for item-level field changes (record + field),
    /// independent of the list-level replace events.
    pub fn on_item_changed(&self, listener: impl Fn(&SharedPurchase, Field) + 'static) {
        self.inner.item_changed.borrow_mut().push(Box::new(listener));
    }

    /// The number of field-change subscriptions currently held by the list.
    /// Equal to the number of distinct contained records.
    pub fn subscription_count(&self) -> usize {
        self.inner.tracked.borrow().len()
    }

    fn track(&self, record: &SharedPurchase) {
        let mut tracked = self.inner.tracked.borrow_mut();
        if tracked.iter().any(|(r, _)| Rc::ptr_eq(r, record)) {
            return;
        }
        let weak_list = Rc::downgrade(&self.inner);
        let weak_record = Rc::downgrade(record);
        let sub = record.subscribe(move |field| {
            let (Some(list), Some(record)) = (weak_list.upgrade(), weak_record.upgrade()) else {
                return;
            };
            ListInner::republish(&list, &record, field);
        });
        tracked.push((Rc::clone(record), sub));
    }
}

impl ListInner {
    /// Turns a record-level field change into a list-level `Replaced` event
    /// plus an item-level event.
    fn republish(list: &Rc<ListInner>, record: &SharedPurchase, field: Field) {
        let index = {
            list.items
                .borrow()
                .iter()
                .position(|r| Rc::ptr_eq(r, record))
        };
        // A record that already left the list has no position to report.
        let Some(index) = index else {
            return;
        };
        list.emit_changed(&ListChange::Replaced { index, field });
        for listener in list.item_changed.borrow().iter() {
            listener(record, field);
        }
    }

    fn emit_changed(&self, change: &ListChange) {
        for listener in self.changed.borrow().iter() {
            listener(change);
        }
    }
}

impl fmt::Debug for WatchedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchedList")
            .field("items", &self.inner.items.borrow())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}
