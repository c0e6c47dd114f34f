//! spesa: record, reconcile and export monthly purchases kept in a local
//! SQLite database.

pub mod args;
pub mod commands;
mod db;
mod error;
mod export;
mod home;
mod model;
mod session;

pub use db::Db;
pub use error::{Error, Result, StoreError};
pub use export::export_json;
pub use home::Home;
pub use model::{
    Field, ListChange, Purchase, PurchaseCell, SharedPurchase, Subscription, WatchedList, UNSAVED,
};
pub use session::{SaveOutcome, Session};
