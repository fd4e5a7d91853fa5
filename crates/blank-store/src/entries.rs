use rusqlite::{Params, Row, params};
use uuid::Uuid;

use blank_core::{Entry, EntryStatus, NewEntry, Tier};

use crate::error::{Result, StoreError};
use crate::store::{Store, UpdateOutcome, parse_uuid};

const ENTRY_COLUMNS: &str = "id, author_id, text, tier, measured_balance, is_core_memory, \
                             status, cycle_number, created_at, annotation";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The author already has `cycle_cap` entries in the cycle.
    CapReached,
}

/// Filter for the public journal listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JournalQuery {
    pub cycle_number: Option<u32>,
    pub core_only: bool,
    pub limit: usize,
    pub offset: usize,
}

impl Default for JournalQuery {
    fn default() -> Self {
        Self {
            cycle_number: None,
            core_only: false,
            limit: 50,
            offset: 0,
        }
    }
}

type EntryRow = (
    String,
    String,
    String,
    u8,
    f64,
    bool,
    String,
    u32,
    String,
    Option<String>,
);

fn read_entry_row(row: &Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn entry_from_row(r: EntryRow) -> Result<Entry> {
    let (id, author_id, text, tier, measured_balance, is_core_memory, status, cycle_number, created_at, annotation) = r;
    Ok(Entry {
        id: parse_uuid(&id)?,
        author_id,
        text,
        tier: Tier::from_u8(tier)
            .ok_or_else(|| StoreError::InvalidData(format!("entry {id} has tier {tier}")))?,
        measured_balance,
        is_core_memory,
        status: status.parse().map_err(StoreError::InvalidData)?,
        cycle_number,
        created_at,
        annotation,
    })
}

impl Store {
    fn query_entries<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Entry>> {
        let mut stmt = self.conn().prepare(sql)?;
        let rows: Vec<EntryRow> = stmt
            .query_map(params, read_entry_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().map(entry_from_row).collect()
    }

    /// Insert a pending entry unless the author has already reached the
    /// cycle cap. Count and insert are a single statement.
    pub fn insert_entry_capped(&self, entry: &NewEntry) -> Result<InsertOutcome> {
        let inserted = self.conn().execute(
            "INSERT INTO entries (id, author_id, text, tier, measured_balance, is_core_memory,
                                  status, cycle_number, created_at)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?8
             WHERE ?9 IS NULL
                OR (SELECT COUNT(*) FROM entries WHERE author_id = ?2 AND cycle_number = ?7) < ?9",
            params![
                entry.id.to_string(),
                entry.author_id,
                entry.text,
                entry.tier.as_u8(),
                entry.measured_balance,
                entry.is_core_memory,
                entry.cycle_number,
                entry.created_at,
                entry.cycle_cap,
            ],
        )?;
        Ok(if inserted == 1 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::CapReached
        })
    }

    pub fn get_entry(&self, id: Uuid) -> Result<Option<Entry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1");
        Ok(self.query_entries(&sql, [id.to_string()])?.pop())
    }

    /// Entries with `status`, newest first. `before` is the id of the last
    /// entry of the previous page.
    pub fn list_by_status(
        &self,
        status: EntryStatus,
        before: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Entry>> {
        if let Some(cursor) = before
            && self.get_entry(cursor)?.is_none()
        {
            return Err(StoreError::NotFound(format!("cursor entry {cursor}")));
        }
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries
             WHERE status = ?1
               AND (?2 IS NULL
                    OR (created_at, rowid) < (SELECT created_at, rowid FROM entries WHERE id = ?2))
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?3"
        );
        self.query_entries(
            &sql,
            params![
                status.as_str(),
                before.map(|id| id.to_string()),
                limit as i64
            ],
        )
    }

    /// Approved entries of one cycle in the order they were written.
    pub fn approved_for_cycle(&self, cycle_number: u32) -> Result<Vec<Entry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries
             WHERE status = 'approved' AND cycle_number = ?1
             ORDER BY created_at ASC, rowid ASC"
        );
        self.query_entries(&sql, [cycle_number])
    }

    /// Every approved core memory, oldest first, regardless of cycle.
    pub fn core_memories(&self) -> Result<Vec<Entry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries
             WHERE status = 'approved' AND is_core_memory = 1
             ORDER BY created_at ASC, rowid ASC"
        );
        self.query_entries(&sql, [])
    }

    pub fn recent_approved(&self, limit: usize) -> Result<Vec<Entry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries
             WHERE status = 'approved'
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1"
        );
        self.query_entries(&sql, [limit as i64])
    }

    pub fn list_journal(&self, query: &JournalQuery) -> Result<Vec<Entry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries
             WHERE status = 'approved'
               AND (?1 IS NULL OR cycle_number = ?1)
               AND (?2 = 0 OR is_core_memory = 1)
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?3 OFFSET ?4"
        );
        self.query_entries(
            &sql,
            params![
                query.cycle_number,
                query.core_only,
                query.limit as i64,
                query.offset as i64
            ],
        )
    }

    fn entry_status(&self, id: Uuid) -> Result<Option<EntryStatus>> {
        Ok(self.get_entry(id)?.map(|e| e.status))
    }

    /// Move a pending entry to `to`. Only the first moderator wins.
    pub fn set_entry_status(&self, id: Uuid, to: EntryStatus) -> Result<UpdateOutcome<EntryStatus>> {
        let updated = self.conn().execute(
            "UPDATE entries SET status = ?1 WHERE id = ?2 AND status = 'pending'",
            params![to.as_str(), id.to_string()],
        )?;
        if updated == 1 {
            return Ok(UpdateOutcome::Applied);
        }
        Ok(match self.entry_status(id)? {
            None => UpdateOutcome::Missing,
            Some(current) => UpdateOutcome::Blocked(current),
        })
    }

    /// Overwrite the annotation of an approved entry.
    pub fn set_annotation(&self, id: Uuid, annotation: &str) -> Result<UpdateOutcome<EntryStatus>> {
        let updated = self.conn().execute(
            "UPDATE entries SET annotation = ?1 WHERE id = ?2 AND status = 'approved'",
            params![annotation, id.to_string()],
        )?;
        if updated == 1 {
            return Ok(UpdateOutcome::Applied);
        }
        Ok(match self.entry_status(id)? {
            None => UpdateOutcome::Missing,
            Some(current) => UpdateOutcome::Blocked(current),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHOR: &str = "Gh9ZwEmdLJ8DscKNTkTqPbNwLNNBjvSo2VJn3DYwUpeB";

    fn new_entry(author: &str, text: &str, cycle: u32, created_at: &str, cap: Option<u32>) -> NewEntry {
        NewEntry {
            id: Uuid::new_v4(),
            author_id: author.to_string(),
            text: text.to_string(),
            tier: if cap.is_some() { Tier::One } else { Tier::Three },
            measured_balance: 1.0,
            is_core_memory: false,
            cycle_number: cycle,
            created_at: created_at.to_string(),
            cycle_cap: cap,
        }
    }

    fn insert_approved(store: &Store, text: &str, cycle: u32, created_at: &str, core: bool) -> Uuid {
        let mut e = new_entry(AUTHOR, text, cycle, created_at, None);
        e.is_core_memory = core;
        let id = e.id;
        assert_eq!(store.insert_entry_capped(&e).unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            store.set_entry_status(id, EntryStatus::Approved).unwrap(),
            UpdateOutcome::Applied
        );
        id
    }

    #[test]
    fn test_insert_and_get() {
        let store = Store::open_in_memory().unwrap();
        let e = new_entry(AUTHOR, "hello", 1, "2026-03-01T01:00:00Z", None);
        store.insert_entry_capped(&e).unwrap();

        let got = store.get_entry(e.id).unwrap().unwrap();
        assert_eq!(got, e.clone().into_entry());
        assert!(store.get_entry(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_cap_enforced_per_cycle() {
        let store = Store::open_in_memory().unwrap();
        let first = new_entry(AUTHOR, "one", 4, "2026-03-04T01:00:00Z", Some(1));
        let second = new_entry(AUTHOR, "two", 4, "2026-03-04T02:00:00Z", Some(1));
        let next_day = new_entry(AUTHOR, "three", 5, "2026-03-05T02:00:00Z", Some(1));

        assert_eq!(store.insert_entry_capped(&first).unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert_entry_capped(&second).unwrap(), InsertOutcome::CapReached);
        assert_eq!(store.insert_entry_capped(&next_day).unwrap(), InsertOutcome::Inserted);
        let count: u32 = store
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM entries WHERE author_id = ?1 AND cycle_number = 4",
                [AUTHOR],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_cap_counts_rejected_entries() {
        let store = Store::open_in_memory().unwrap();
        let first = new_entry(AUTHOR, "one", 4, "2026-03-04T01:00:00Z", Some(1));
        store.insert_entry_capped(&first).unwrap();
        store.set_entry_status(first.id, EntryStatus::Rejected).unwrap();

        let second = new_entry(AUTHOR, "two", 4, "2026-03-04T02:00:00Z", Some(1));
        assert_eq!(store.insert_entry_capped(&second).unwrap(), InsertOutcome::CapReached);
    }

    #[test]
    fn test_cap_is_per_author() {
        let store = Store::open_in_memory().unwrap();
        let other = "Other1111111111111111111111111111111111111";
        store
            .insert_entry_capped(&new_entry(AUTHOR, "a", 4, "t1", Some(1)))
            .unwrap();
        assert_eq!(
            store
                .insert_entry_capped(&new_entry(other, "b", 4, "t2", Some(1)))
                .unwrap(),
            InsertOutcome::Inserted
        );
    }

    #[test]
    fn test_status_transition_is_conditional() {
        let store = Store::open_in_memory().unwrap();
        let e = new_entry(AUTHOR, "x", 1, "t", None);
        store.insert_entry_capped(&e).unwrap();

        assert_eq!(
            store.set_entry_status(e.id, EntryStatus::Approved).unwrap(),
            UpdateOutcome::Applied
        );
        assert_eq!(
            store.set_entry_status(e.id, EntryStatus::Rejected).unwrap(),
            UpdateOutcome::Blocked(EntryStatus::Approved)
        );
        assert_eq!(
            store.set_entry_status(Uuid::new_v4(), EntryStatus::Approved).unwrap(),
            UpdateOutcome::Missing
        );
    }

    #[test]
    fn test_annotation_only_on_approved() {
        let store = Store::open_in_memory().unwrap();
        let e = new_entry(AUTHOR, "x", 1, "t", None);
        store.insert_entry_capped(&e).unwrap();
        assert_eq!(
            store.set_annotation(e.id, "hm").unwrap(),
            UpdateOutcome::Blocked(EntryStatus::Pending)
        );

        store.set_entry_status(e.id, EntryStatus::Approved).unwrap();
        store.set_annotation(e.id, "first").unwrap();
        store.set_annotation(e.id, "second").unwrap();
        let got = store.get_entry(e.id).unwrap().unwrap();
        assert_eq!(got.annotation.as_deref(), Some("second"));
        assert_eq!(got.text, "x");
    }

    #[test]
    fn test_approved_for_cycle_is_chronological() {
        let store = Store::open_in_memory().unwrap();
        insert_approved(&store, "b", 2, "2026-03-02T10:00:00Z", false);
        insert_approved(&store, "a", 2, "2026-03-02T09:00:00Z", false);
        insert_approved(&store, "c", 2, "2026-03-02T10:00:00Z", false);
        insert_approved(&store, "other", 3, "2026-03-03T09:00:00Z", false);

        let texts: Vec<String> = store
            .approved_for_cycle(2)
            .unwrap()
            .into_iter()
            .map(|e| e.text)
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_core_memories_span_cycles() {
        let store = Store::open_in_memory().unwrap();
        insert_approved(&store, "old core", 1, "2026-03-01T00:00:00Z", true);
        insert_approved(&store, "plain", 1, "2026-03-01T00:01:00Z", false);
        let mut pending = new_entry(AUTHOR, "pending core", 2, "2026-03-02T00:00:00Z", None);
        pending.is_core_memory = true;
        store.insert_entry_capped(&pending).unwrap();

        let cores = store.core_memories().unwrap();
        assert_eq!(cores.len(), 1);
        assert_eq!(cores[0].text, "old core");
    }

    #[test]
    fn test_list_pending_pages_newest_first() {
        let store = Store::open_in_memory().unwrap();
        for i in 0..5 {
            let e = new_entry(AUTHOR, &format!("p{i}"), 1, &format!("2026-03-01T0{i}:00:00Z"), None);
            store.insert_entry_capped(&e).unwrap();
        }
        let page1 = store.list_by_status(EntryStatus::Pending, None, 2).unwrap();
        assert_eq!(page1.iter().map(|e| e.text.as_str()).collect::<Vec<_>>(), ["p4", "p3"]);

        let page2 = store
            .list_by_status(EntryStatus::Pending, Some(page1[1].id), 2)
            .unwrap();
        assert_eq!(page2.iter().map(|e| e.text.as_str()).collect::<Vec<_>>(), ["p2", "p1"]);

        let page3 = store
            .list_by_status(EntryStatus::Pending, Some(page2[1].id), 2)
            .unwrap();
        assert_eq!(page3.len(), 1);

        assert!(matches!(
            store.list_by_status(EntryStatus::Pending, Some(Uuid::new_v4()), 2),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_journal_filters() {
        let store = Store::open_in_memory().unwrap();
        insert_approved(&store, "core", 1, "2026-03-01T00:00:00Z", true);
        insert_approved(&store, "day2", 2, "2026-03-02T00:00:00Z", false);
        insert_approved(&store, "day2 later", 2, "2026-03-02T05:00:00Z", false);

        let all = store.list_journal(&JournalQuery::default()).unwrap();
        assert_eq!(all[0].text, "day2 later");
        assert_eq!(all.len(), 3);

        let day2 = store
            .list_journal(&JournalQuery {
                cycle_number: Some(2),
                ..JournalQuery::default()
            })
            .unwrap();
        assert_eq!(day2.len(), 2);

        let cores = store
            .list_journal(&JournalQuery {
                core_only: true,
                ..JournalQuery::default()
            })
            .unwrap();
        assert_eq!(cores.len(), 1);

        let paged = store
            .list_journal(&JournalQuery {
                limit: 1,
                offset: 1,
                ..JournalQuery::default()
            })
            .unwrap();
        assert_eq!(paged[0].text, "day2");
    }

    #[test]
    fn test_recent_approved_limit() {
        let store = Store::open_in_memory().unwrap();
        for i in 0..12 {
            insert_approved(&store, &format!("e{i:02}"), 1, &format!("2026-03-01T00:{i:02}:00Z"), false);
        }
        let recent = store.recent_approved(10).unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].text, "e11");
    }
}
