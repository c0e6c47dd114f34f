//! A shared, editable purchase record with field-change notifications.
//!
//! Everything here is single-threaded by construction (`Rc`/`RefCell`): all
//! edits happen on one logical thread in response to user actions, so no
//! locking discipline is needed.

use crate::model::{Field, Purchase};
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A purchase record shared between the working set and whoever is editing it.
pub type SharedPurchase = Rc<PurchaseCell>;

/// A handle returned by [`PurchaseCell::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Subscription {
    slot: usize,
    generation: u64,
}

type Listener = Rc<dyn Fn(Field)>;

/// One listener slot. Vacated slots are reused; the generation is bumped on
/// each new tenancy so that a stale handle cannot detach the current
/// listener.
struct ListenerSlot {
    generation: u64,
    listener: Option<Listener>,
}

/// A [`Purchase`] behind interior mutability. Every setter notifies the
/// registered listeners with the name of the field that changed, after the
/// new value is in place.
pub struct PurchaseCell {
    value: RefCell<Purchase>,
    listeners: RefCell<Vec<ListenerSlot>>,
}

impl PurchaseCell {
    pub fn new(purchase: Purchase) -> SharedPurchase {
        Rc::new(Self {
            value: RefCell::new(purchase),
            listeners: RefCell::new(Vec::new()),
        })
    }

    /// A clone of the current field values.
    pub fn snapshot(&self) -> Purchase {
        self.value.borrow().clone()
    }

    pub fn id(&self) -> i64 {
        self.value.borrow().id
    }

    pub fn is_persisted(&self) -> bool {
        self.value.borrow().is_persisted()
    }

    pub fn description(&self) -> String {
        self.value.borrow().description.clone()
    }

    pub fn price(&self) -> Decimal {
        self.value.borrow().price
    }

    pub fn year(&self) -> String {
        self.value.borrow().year.clone()
    }

    pub fn month(&self) -> String {
        self.value.borrow().month.clone()
    }

    pub fn set_id(&self, id: i64) {
        self.value.borrow_mut().id = id;
        self.notify(Field::Id);
    }

    pub fn set_description(&self, description: impl Into<String>) {
        self.value.borrow_mut().description = description.into();
        self.notify(Field::Description);
    }

    pub fn set_price(&self, price: Decimal) {
        self.value.borrow_mut().price = price;
        self.notify(Field::Price);
    }

    pub fn set_year(&self, year: impl Into<String>) {
        self.value.borrow_mut().year = year.into();
        self.notify(Field::Year);
    }

    pub fn set_month(&self, month: impl Into<String>) {
        self.value.borrow_mut().month = month.into();
        self.notify(Field::Month);
    }

    /// Registers `listener` to be called after every field mutation. A
    /// listener registered while a notification is in flight is not called
    /// for that notification.
    pub fn subscribe(&self, listener: impl Fn(Field) + 'static) -> Subscription {
        let mut listeners = self.listeners.borrow_mut();
        let listener: Listener = Rc::new(listener);
        match listeners.iter().position(|s| s.listener.is_none()) {
            Some(slot) => {
                let entry = &mut listeners[slot];
                entry.generation += 1;
                entry.listener = Some(listener);
                Subscription {
                    slot,
                    generation: entry.generation,
                }
            }
            None => {
                listeners.push(ListenerSlot {
                    generation: 0,
                    listener: Some(listener),
                });
                Subscription {
                    slot: listeners.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    /// Detaches a listener. Returns `false` if the handle was already
    /// detached, making double-unsubscribe harmless.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.get_mut(subscription.slot) {
            Some(slot)
                if slot.generation == subscription.generation && slot.listener.is_some() =>
            {
                slot.listener = None;
                true
            }
            _ => false,
        }
    }

    /// The number of currently attached listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|s| s.listener.is_some())
            .count()
    }

    fn notify(&self, field: Field) {
        // Dispatch from a snapshot with no borrow held, so listeners are free
        // to read the record and to subscribe or unsubscribe on it.
        let live: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter_map(|s| s.listener.clone())
            .collect();
        for listener in live {
            listener(field);
        }
    }
}

impl fmt::Debug for PurchaseCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurchaseCell")
            .field("value", &self.value.borrow())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
