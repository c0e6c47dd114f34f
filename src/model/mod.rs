//! Types that represent the core data model: purchases, the shared editable
//! record, and the watched working-set list.
mod purchase;
mod record;
mod watched_list;

pub use purchase::{Field, Purchase, UNSAVED};
pub use record::{PurchaseCell, SharedPurchase, Subscription};
pub use watched_list::{ListChange, WatchedList};
