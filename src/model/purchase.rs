use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The sentinel id for a purchase that has not yet been assigned a row id by
/// the database. Everything with any other id is assumed to exist on disk.
pub const UNSAVED: i64 = 0;

/// A single purchase row: what was bought, for how much, and in which
/// year/month bucket it lives.
///
/// `year` is a 4-digit string and `month` a 1-2 digit unpadded string
/// (e.g. `"2024"` / `"6"`), matching how periods are keyed in the database.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Purchase {
    /// The database row id, or [`UNSAVED`] for a record created in-session.
    pub id: i64,
    /// Free-form description of the purchase.
    pub description: String,
    /// The price as an exact decimal.
    pub price: Decimal,
    /// 4-digit year, e.g. "2024".
    pub year: String,
    /// 1-2 digit month with no leading zero, e.g. "6".
    pub month: String,
}

impl Purchase {
    /// Creates a purchase that has not been persisted yet. The year and month
    /// are left empty; the edit session stamps them from the selected period
    /// at save time.
    pub fn unsaved(description: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: UNSAVED,
            description: description.into(),
            price,
            year: String::new(),
            month: String::new(),
        }
    }

    /// Whether this record exists in the database.
    pub fn is_persisted(&self) -> bool {
        self.id != UNSAVED
    }
}

/// Names a [`Purchase`] field in change notifications.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Description,
    Price,
    Year,
    Month,
}

serde_plain::derive_display_from_serialize!(Field);
serde_plain::derive_fromstr_from_deserialize!(Field);
