use rusqlite::params;

use blank_core::WakingEntry;

use crate::error::Result;
use crate::store::{Store, parse_uuid};

impl Store {
    pub fn insert_waking(&self, entry: &WakingEntry) -> Result<()> {
        self.conn().execute(
            "INSERT INTO waking_entries (id, cycle_number, first_post, second_post, status, posted_at)
             VALUES (?1, ?2, ?3, ?4, 'posted', ?5)",
            params![
                entry.id.to_string(),
                entry.cycle_number,
                entry.first_post,
                entry.second_post,
                entry.posted_at,
            ],
        )?;
        Ok(())
    }

    /// Posted waking entries, newest first.
    pub fn list_waking(&self, limit: usize) -> Result<Vec<WakingEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, cycle_number, first_post, second_post, posted_at
             FROM waking_entries WHERE status = 'posted'
             ORDER BY posted_at DESC, rowid DESC
             LIMIT ?1",
        )?;
        let rows: Vec<(String, u32, String, Option<String>, String)> = stmt
            .query_map([limit as i64], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(id, cycle_number, first_post, second_post, posted_at)| {
                Ok(WakingEntry {
                    id: parse_uuid(&id)?,
                    cycle_number,
                    first_post,
                    second_post,
                    posted_at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_list_newest_first() {
        let store = Store::open_in_memory().unwrap();
        let a = WakingEntry::new(1, "first wake", None, "2026-03-01T00:05:00Z".into()).unwrap();
        let b = WakingEntry::new(2, "second wake", Some("and more"), "2026-03-02T00:05:00Z".into())
            .unwrap();
        store.insert_waking(&a).unwrap();
        store.insert_waking(&b).unwrap();

        let listed = store.list_waking(10).unwrap();
        assert_eq!(listed, vec![b, a]);
        assert_eq!(store.list_waking(1).unwrap().len(), 1);
    }
}
