//! The edit session: an in-memory working set for one year/month, and the
//! reconciliation of its accumulated edits back to the database.
//!
//! A session moves through load → edit → save. Edits are classified purely by
//! record identity: a record with a real row id is an update candidate, a
//! record with the [`UNSAVED`] sentinel id is an insert candidate, and a
//! removed persisted record is queued for deletion. Save applies the three
//! groups as one batch, in update → insert → delete order.

use crate::db::Db;
use crate::model::{Purchase, PurchaseCell, SharedPurchase, WatchedList};
use crate::Result;
use rust_decimal::Decimal;
use std::rc::Rc;
use tracing::debug;

/// How many rows a save touched, per phase.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct SaveOutcome {
    pub updated: usize,
    pub inserted: usize,
    pub deleted: usize,
}

impl SaveOutcome {
    pub fn total(&self) -> usize {
        self.updated + self.inserted + self.deleted
    }
}

/// An edit session over the purchases of a single year/month.
pub struct Session {
    year: String,
    month: String,
    purchases: WatchedList,
    /// Persisted records removed from the working set this session, awaiting
    /// deletion on save. Disjoint from the working set; never holds records
    /// that were created in-session (those are simply discarded on removal).
    pending_deletes: Vec<Purchase>,
    /// Sum of prices, computed when the working set is (re)loaded. In-place
    /// price edits do not move this figure; see `recompute_expenses`.
    expenses: Decimal,
}

impl Session {
    /// Loads the working set for `year`/`month` from the database.
    pub async fn load(db: &Db, year: impl Into<String>, month: impl Into<String>) -> Result<Self> {
        let year = year.into();
        let month = month.into();
        let records = db.purchases_by_period(&year, &month).await?;
        debug!("Loaded {} purchases for {year}-{month}", records.len());
        let purchases = WatchedList::from_records(records.into_iter().map(PurchaseCell::new));
        let expenses = sum_prices(&purchases);
        Ok(Self {
            year,
            month,
            purchases,
            pending_deletes: Vec::new(),
            expenses,
        })
    }

    /// Switches the session to a new period, reloading the working set.
    /// Unsaved edits, additions and pending deletions for the previous period
    /// are discarded without warning.
    pub async fn select_period(
        &mut self,
        db: &Db,
        year: impl Into<String>,
        month: impl Into<String>,
    ) -> Result<()> {
        *self = Self::load(db, year, month).await?;
        Ok(())
    }

    pub fn year(&self) -> &str {
        &self.year
    }

    pub fn month(&self) -> &str {
        &self.month
    }

    /// The working set. Callers may edit records in place through the shared
    /// handles; the list re-publishes those edits as change events.
    pub fn purchases(&self) -> &WatchedList {
        &self.purchases
    }

    /// Creates a record with the sentinel id and adds it to the working set.
    /// Its year/month are stamped from the session's period at save time.
    pub fn add(&mut self, description: impl Into<String>, price: Decimal) -> SharedPurchase {
        let record = PurchaseCell::new(Purchase::unsaved(description, price));
        self.purchases.push(&record);
        record
    }

    /// Removes `record` from the working set. A persisted record is queued
    /// for deletion on save; a record that was never persisted is simply
    /// dropped. Returns `false` if the record is not in the working set.
    pub fn remove(&mut self, record: &SharedPurchase) -> bool {
        if !self.purchases.remove(record) {
            return false;
        }
        let snapshot = record.snapshot();
        if snapshot.is_persisted() && !self.pending_deletes.iter().any(|p| p.id == snapshot.id) {
            self.pending_deletes.push(snapshot);
        }
        true
    }

    /// Records queued for deletion on the next save.
    pub fn pending_deletes(&self) -> &[Purchase] {
        &self.pending_deletes
    }

    /// Whether a save would touch any rows. Every record in the working set
    /// is written on save (as an update or an insert), so this is simply
    /// "anything in the working set or the deletion queue".
    pub fn has_changes(&self) -> bool {
        !self.purchases.is_empty() || !self.pending_deletes.is_empty()
    }

    /// The running total, as of the last load or reload.
    pub fn expenses(&self) -> Decimal {
        self.expenses
    }

    /// Recomputes the running total from the current working set and returns
    /// it. The stored figure is refreshed as well.
    pub fn recompute_expenses(&mut self) -> Decimal {
        self.expenses = sum_prices(&self.purchases);
        self.expenses
    }

    /// Applies the session's accumulated changes to the database as one
    /// transactional batch: persisted records are updated, sentinel-id
    /// records are stamped with the session's period and inserted, and queued
    /// deletions are deleted. On success the newly assigned row ids are
    /// written back into the inserted records and the deletion queue is
    /// cleared.
    pub async fn save(&mut self, db: &Db) -> Result<SaveOutcome> {
        let records = self.purchases.records();

        let mut updates = Vec::new();
        let mut insert_records = Vec::new();
        for record in &records {
            if record.is_persisted() {
                updates.push(record.snapshot());
            } else {
                record.set_year(self.year.clone());
                record.set_month(self.month.clone());
                insert_records.push(Rc::clone(record));
            }
        }
        let inserts: Vec<Purchase> = insert_records.iter().map(|r| r.snapshot()).collect();
        let delete_ids: Vec<i64> = self.pending_deletes.iter().map(|p| p.id).collect();

        let new_ids = db.apply_batch(&updates, &inserts, &delete_ids).await?;
        for (record, id) in insert_records.iter().zip(&new_ids) {
            record.set_id(*id);
        }

        let outcome = SaveOutcome {
            updated: updates.len(),
            inserted: inserts.len(),
            deleted: delete_ids.len(),
        };
        self.pending_deletes.clear();
        debug!(
            "Saved {}-{}: {} updated, {} inserted, {} deleted",
            self.year, self.month, outcome.updated, outcome.inserted, outcome.deleted
        );
        Ok(outcome)
    }
}

fn sum_prices(purchases: &WatchedList) -> Decimal {
    purchases
        .records()
        .iter()
        .fold(Decimal::ZERO, |total, record| total + record.price())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::test::TestEnv;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_load_populates_working_set_and_expenses() {
        let env = TestEnv::new().await;
        env.seed("2024", "6", &[("Coffee", "3.50"), ("Bread", "1.25")])
            .await;
        env.seed("2024", "7", &[("Elsewhere", "99.00")]).await;

        let session = Session::load(env.db(), "2024", "6").await.unwrap();
        assert_eq!(session.purchases().len(), 2);
        assert_eq!(session.expenses(), dec("4.75"));
        assert!(session.pending_deletes().is_empty());
    }

    #[tokio::test]
    async fn test_save_counts_match_the_edits() {
        let env = TestEnv::new().await;
        let ids = env
            .seed(
                "2024",
                "6",
                &[("a", "1.00"), ("b", "2.00"), ("c", "3.00")],
            )
            .await;

        let mut session = Session::load(env.db(), "2024", "6").await.unwrap();

        // Remove one persisted record, add two new ones.
        let doomed = session
            .purchases()
            .records()
            .into_iter()
            .find(|r| r.id() == ids[1])
            .unwrap();
        assert!(session.remove(&doomed));
        session.add("d", dec("4.00"));
        session.add("e", dec("5.00"));

        let outcome = session.save(env.db()).await.unwrap();
        assert_eq!(
            outcome,
            SaveOutcome {
                updated: 2,
                inserted: 2,
                deleted: 1
            }
        );
        assert_eq!(outcome.total(), 5);

        let stored = env.db().purchases_by_period("2024", "6").await.unwrap();
        let descriptions: Vec<&str> = stored.iter().map(|p| p.description.as_str()).collect();
        assert_eq!(descriptions, vec!["a", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_insert_is_stamped_with_the_period_and_gets_an_id() {
        let env = TestEnv::new().await;
        let mut session = Session::load(env.db(), "2024", "6").await.unwrap();

        let record = session.add("Coffee", dec("3.50"));
        assert!(record.year().is_empty());

        let outcome = session.save(env.db()).await.unwrap();
        assert_eq!(outcome.inserted, 1);
        assert_eq!(record.year(), "2024");
        assert_eq!(record.month(), "6");
        assert!(record.is_persisted());

        let stored = env.db().purchases_by_period("2024", "6").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, record.id());
        assert_eq!(stored[0].description, "Coffee");
        assert_eq!(stored[0].price, dec("3.50"));
    }

    #[tokio::test]
    async fn test_add_then_remove_of_a_new_record_is_a_no_op_on_save() {
        let env = TestEnv::new().await;
        let mut session = Session::load(env.db(), "2024", "6").await.unwrap();

        let record = session.add("Oops", dec("1.00"));
        assert!(session.remove(&record));
        // Never persisted, so never queued for deletion.
        assert!(session.pending_deletes().is_empty());

        let outcome = session.save(env.db()).await.unwrap();
        assert_eq!(outcome, SaveOutcome::default());
        assert!(env
            .db()
            .purchases_by_period("2024", "6")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_remove_queues_persisted_records_exactly_once() {
        let env = TestEnv::new().await;
        let ids = env.seed("2024", "6", &[("a", "1.00")]).await;
        let mut session = Session::load(env.db(), "2024", "6").await.unwrap();

        let record = session.purchases().get(0).unwrap();
        assert_eq!(record.id(), ids[0]);
        assert!(session.remove(&record));
        assert!(!session.remove(&record));
        assert_eq!(session.pending_deletes().len(), 1);
    }

    #[tokio::test]
    async fn test_in_place_edits_become_updates() {
        let env = TestEnv::new().await;
        env.seed("2024", "6", &[("Coffee", "3.50")]).await;
        let mut session = Session::load(env.db(), "2024", "6").await.unwrap();

        let record = session.purchases().get(0).unwrap();
        record.set_description("Espresso");
        record.set_price(dec("4.20"));

        let outcome = session.save(env.db()).await.unwrap();
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.inserted, 0);

        let stored = env.db().purchases_by_period("2024", "6").await.unwrap();
        assert_eq!(stored[0].description, "Espresso");
        assert_eq!(stored[0].price, dec("4.20"));
    }

    #[tokio::test]
    async fn test_round_trip_reload_yields_equal_fields_with_real_id() {
        let env = TestEnv::new().await;
        let mut session = Session::load(env.db(), "2024", "6").await.unwrap();
        session.add("Καφές", dec("3.50"));
        session.save(env.db()).await.unwrap();

        let reloaded = Session::load(env.db(), "2024", "6").await.unwrap();
        assert_eq!(reloaded.purchases().len(), 1);
        let record = reloaded.purchases().get(0).unwrap();
        assert!(record.is_persisted());
        assert_eq!(record.description(), "Καφές");
        assert_eq!(record.price(), dec("3.50"));
        assert_eq!(record.year(), "2024");
        assert_eq!(record.month(), "6");
    }

    #[tokio::test]
    async fn test_select_period_discards_unsaved_changes() {
        let env = TestEnv::new().await;
        env.seed("2024", "6", &[("Coffee", "3.50")]).await;
        let mut session = Session::load(env.db(), "2024", "6").await.unwrap();

        let record = session.purchases().get(0).unwrap();
        assert!(session.remove(&record));
        session.add("Unsaved", dec("9.99"));
        assert_eq!(session.pending_deletes().len(), 1);

        session.select_period(env.db(), "2024", "7").await.unwrap();
        assert!(session.purchases().is_empty());
        assert!(session.pending_deletes().is_empty());

        // Back on the original period everything is still in the database.
        session.select_period(env.db(), "2024", "6").await.unwrap();
        assert_eq!(session.purchases().len(), 1);
        assert_eq!(session.purchases().get(0).unwrap().description(), "Coffee");
    }

    #[tokio::test]
    async fn test_failed_period_switch_keeps_the_working_set() {
        let env = TestEnv::new().await;
        let ids = env
            .seed("2024", "6", &[("Coffee", "3.50"), ("Bread", "1.25")])
            .await;
        let mut session = Session::load(env.db(), "2024", "6").await.unwrap();

        let doomed = session.purchases().get(0).unwrap();
        assert!(session.remove(&doomed));
        session.add("Unsaved", dec("9.99"));

        sqlx::query("DROP TABLE purchases")
            .execute(env.db().pool())
            .await
            .unwrap();

        assert!(session.select_period(env.db(), "2024", "7").await.is_err());
        // The old period, working set and deletion queue all survive.
        assert_eq!(session.year(), "2024");
        assert_eq!(session.month(), "6");
        assert_eq!(session.purchases().len(), 2);
        assert_eq!(session.pending_deletes().len(), 1);
        assert_eq!(session.pending_deletes()[0].id, ids[0]);
    }

    #[tokio::test]
    async fn test_expenses_update_on_reload_not_on_edit() {
        let env = TestEnv::new().await;
        env.seed("2024", "6", &[("Coffee", "3.50"), ("Bread", "1.50")])
            .await;
        let mut session = Session::load(env.db(), "2024", "6").await.unwrap();
        assert_eq!(session.expenses(), dec("5.00"));

        session.purchases().get(0).unwrap().set_price(dec("10.00"));
        assert_eq!(session.expenses(), dec("5.00"));
        assert_eq!(session.recompute_expenses(), dec("11.50"));

        session.save(env.db()).await.unwrap();
        session.select_period(env.db(), "2024", "6").await.unwrap();
        assert_eq!(session.expenses(), dec("11.50"));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_the_deletion_queue() {
        let env = TestEnv::new().await;
        let ids = env.seed("2024", "6", &[("Coffee", "3.50")]).await;
        let mut session = Session::load(env.db(), "2024", "6").await.unwrap();

        let record = session.purchases().get(0).unwrap();
        assert!(session.remove(&record));

        // The row disappears underneath the session.
        env.db().delete_purchase(ids[0]).await.unwrap();

        let err = session.save(env.db()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotFound(_))
        ));
        // Not cleared: the failed batch changed nothing.
        assert_eq!(session.pending_deletes().len(), 1);
    }

    #[tokio::test]
    async fn test_has_changes() {
        let env = TestEnv::new().await;
        let mut session = Session::load(env.db(), "2024", "6").await.unwrap();
        assert!(!session.has_changes());
        let record = session.add("Coffee", dec("3.50"));
        assert!(session.has_changes());
        assert!(session.remove(&record));
        assert!(!session.has_changes());
    }
}
