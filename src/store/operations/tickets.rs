use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::constants::{NUMBER_MAX, NUMBER_MIN, PICK_COUNT};
use crate::store::keys;
use crate::store::{Store, StoreError};

/// One user number selection for a specific round. Created unclaimed by the
/// external submission flow; mutated exactly once, by reconciliation, which
/// populates rank and winning amount and flips `claimed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TicketEntry {
    pub id: String,
    pub user_id: String,
    pub round: u32,
    /// Comma-separated integers, up to six — the submission-side contract.
    pub numbers: String,
    pub auto_generated: bool,
    pub subscription_linked: bool,
    pub rank: Option<u8>,
    pub winning_amount: Option<u64>,
    pub claimed: bool,
    pub created_at: DateTime<Utc>,
}

impl TicketEntry {
    pub fn new(user_id: &str, round: u32, numbers: &str, auto_generated: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            round,
            numbers: numbers.to_string(),
            auto_generated,
            subscription_linked: false,
            rank: None,
            winning_amount: None,
            claimed: false,
            created_at: Utc::now(),
        }
    }

    /// Parse the stored selection into a set of in-range numbers. Malformed
    /// or out-of-range entries are dropped rather than failing settlement;
    /// a number that cannot be parsed can never match a draw.
    pub fn selection(&self) -> HashSet<u8> {
        self.numbers
            .split(',')
            .filter_map(|part| part.trim().parse::<u8>().ok())
            .filter(|n| (NUMBER_MIN..=NUMBER_MAX).contains(n))
            .take(PICK_COUNT)
            .collect()
    }
}

impl Store {
    pub fn create_ticket(&self, ticket: &TicketEntry) -> Result<(), StoreError> {
        let key = keys::ticket_key(ticket.round, &ticket.id);
        let bytes = Self::serialize(ticket)?;
        let swapped =
            self.tickets
                .compare_and_swap(key.as_bytes(), None as Option<&[u8]>, Some(bytes))?;
        if swapped.is_err() {
            return Err(StoreError::Conflict {
                entity: "ticket".into(),
                key,
            });
        }
        Ok(())
    }

    pub fn get_ticket(&self, round: u32, ticket_id: &str) -> Result<Option<TicketEntry>, StoreError> {
        let key = keys::ticket_key(round, ticket_id);
        match self.tickets.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn tickets_for_round(&self, round: u32) -> Result<Vec<TicketEntry>, StoreError> {
        let prefix = keys::ticket_round_prefix(round);
        let mut out = Vec::new();
        for item in self.tickets.scan_prefix(prefix.as_bytes()) {
            let (_, raw) = item?;
            out.push(Self::deserialize::<TicketEntry>(&raw)?);
        }
        Ok(out)
    }

    pub fn unclaimed_tickets_for_round(&self, round: u32) -> Result<Vec<TicketEntry>, StoreError> {
        Ok(self
            .tickets_for_round(round)?
            .into_iter()
            .filter(|t| !t.claimed)
            .collect())
    }

    /// Whether any ticket for the round still awaits settlement.
    pub fn has_unclaimed_tickets(&self, round: u32) -> Result<bool, StoreError> {
        let prefix = keys::ticket_round_prefix(round);
        for item in self.tickets.scan_prefix(prefix.as_bytes()) {
            let (_, raw) = item?;
            let ticket: TicketEntry = Self::deserialize(&raw)?;
            if !ticket.claimed {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Write back a round's settled tickets as one transaction: all entries
    /// commit or none do, so a round is never left half-settled.
    pub fn settle_tickets(&self, settled: &[TicketEntry]) -> Result<(), StoreError> {
        let mut payloads = Vec::with_capacity(settled.len());
        for ticket in settled {
            payloads.push((
                keys::ticket_key(ticket.round, &ticket.id),
                Self::serialize(ticket)?,
            ));
        }

        self.tickets
            .transaction(|tx| {
                for (key, bytes) in &payloads {
                    tx.insert(key.as_bytes(), bytes.as_slice())?;
                }
                Ok(())
            })
            .map_err(
                |error: sled::transaction::TransactionError<StoreError>| match error {
                    sled::transaction::TransactionError::Abort(store_error) => store_error,
                    sled::transaction::TransactionError::Storage(storage_error) => {
                        StoreError::Sled(storage_error)
                    }
                },
            )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn open_store(dir: &tempfile::TempDir) -> Store {
        Store::open(dir.path().join("db").to_str().unwrap()).unwrap()
    }

    #[test]
    fn selection_parses_defensively() {
        let mut ticket = TicketEntry::new("u1", 100, "3, 12,19,27,34,41", false);
        assert_eq!(ticket.selection().len(), 6);

        ticket.numbers = "3,abc,99,12,0".to_string();
        let parsed = ticket.selection();
        assert_eq!(parsed, HashSet::from([3, 12]));
    }

    #[test]
    fn duplicate_ticket_id_conflicts() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let ticket = TicketEntry::new("u1", 100, "1,2,3,4,5,6", false);

        store.create_ticket(&ticket).unwrap();
        assert!(matches!(
            store.create_ticket(&ticket),
            Err(StoreError::Conflict { .. })
        ));
    }

    #[test]
    fn unclaimed_scan_is_round_scoped() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        store
            .create_ticket(&TicketEntry::new("u1", 100, "1,2,3,4,5,6", false))
            .unwrap();
        store
            .create_ticket(&TicketEntry::new("u1", 101, "1,2,3,4,5,6", false))
            .unwrap();

        let mut claimed = TicketEntry::new("u2", 100, "7,8,9,10,11,12", true);
        claimed.claimed = true;
        claimed.rank = Some(0);
        store.create_ticket(&claimed).unwrap();

        let unclaimed = store.unclaimed_tickets_for_round(100).unwrap();
        assert_eq!(unclaimed.len(), 1);
        assert_eq!(unclaimed[0].user_id, "u1");
        assert!(store.has_unclaimed_tickets(100).unwrap());
        assert!(store.has_unclaimed_tickets(101).unwrap());
    }

    #[test]
    fn settle_batch_overwrites_all_entries() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let mut a = TicketEntry::new("u1", 100, "1,2,3,4,5,6", false);
        let mut b = TicketEntry::new("u2", 100, "7,8,9,10,11,12", false);
        store.create_ticket(&a).unwrap();
        store.create_ticket(&b).unwrap();

        a.claimed = true;
        a.rank = Some(1);
        a.winning_amount = Some(2_000_000_000);
        b.claimed = true;
        b.rank = Some(0);
        b.winning_amount = Some(0);

        store.settle_tickets(&[a.clone(), b.clone()]).unwrap();

        let stored = store.get_ticket(100, &a.id).unwrap().unwrap();
        assert_eq!(stored.rank, Some(1));
        assert!(stored.claimed);
        assert!(!store.has_unclaimed_tickets(100).unwrap());
    }
}
