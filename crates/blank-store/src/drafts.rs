use rusqlite::{Row, params};
use uuid::Uuid;

use blank_core::{Draft, DraftStatus};

use crate::error::{Result, StoreError};
use crate::store::{Store, UpdateOutcome, parse_uuid};

type DraftRow = (String, String, String, u32, String, String, Option<String>);

fn read_draft_row(row: &Row<'_>) -> rusqlite::Result<DraftRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn draft_from_row(r: DraftRow) -> Result<Draft> {
    let (id, text, kind, cycle_number, status, created_at, posted_at) = r;
    Ok(Draft {
        id: parse_uuid(&id)?,
        text,
        kind: kind
            .parse()
            .map_err(|e: blank_core::Error| StoreError::InvalidData(e.to_string()))?,
        cycle_number,
        status: status
            .parse()
            .map_err(|e: blank_core::Error| StoreError::InvalidData(e.to_string()))?,
        created_at,
        posted_at,
    })
}

impl Store {
    /// Insert a batch of drafts atomically.
    pub fn insert_drafts(&self, drafts: &[Draft]) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO drafts (id, text, kind, cycle_number, status, created_at, posted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for d in drafts {
                stmt.execute(params![
                    d.id.to_string(),
                    d.text,
                    d.kind.as_str(),
                    d.cycle_number,
                    d.status.as_str(),
                    d.created_at,
                    d.posted_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_draft(&self, id: Uuid) -> Result<Option<Draft>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, text, kind, cycle_number, status, created_at, posted_at
             FROM drafts WHERE id = ?1",
        )?;
        let row = stmt
            .query_map([id.to_string()], read_draft_row)?
            .next()
            .transpose()?;
        row.map(draft_from_row).transpose()
    }

    /// Drafts with `status`, newest first.
    pub fn list_drafts(&self, status: DraftStatus) -> Result<Vec<Draft>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, text, kind, cycle_number, status, created_at, posted_at
             FROM drafts WHERE status = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows: Vec<DraftRow> = stmt
            .query_map([status.as_str()], read_draft_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().map(draft_from_row).collect()
    }

    fn draft_outcome(&self, updated: usize, id: Uuid) -> Result<UpdateOutcome<DraftStatus>> {
        if updated == 1 {
            return Ok(UpdateOutcome::Applied);
        }
        Ok(match self.get_draft(id)? {
            None => UpdateOutcome::Missing,
            Some(d) => UpdateOutcome::Blocked(d.status),
        })
    }

    /// Move a draft to `to` if it is currently in one of `from`. `posted_at`
    /// is recorded when given.
    pub fn set_draft_status(
        &self,
        id: Uuid,
        from: &[DraftStatus],
        to: DraftStatus,
        posted_at: Option<&str>,
    ) -> Result<UpdateOutcome<DraftStatus>> {
        let allowed: Vec<&str> = from.iter().map(|s| s.as_str()).collect();
        let updated = self.conn().execute(
            "UPDATE drafts SET status = ?1, posted_at = COALESCE(?2, posted_at)
             WHERE id = ?3 AND status IN (SELECT value FROM json_each(?4))",
            params![
                to.as_str(),
                posted_at,
                id.to_string(),
                json_array(&allowed)
            ],
        )?;
        self.draft_outcome(updated, id)
    }

    /// Rewrite draft text if it is currently in one of `from`.
    pub fn set_draft_text(
        &self,
        id: Uuid,
        from: &[DraftStatus],
        text: &str,
    ) -> Result<UpdateOutcome<DraftStatus>> {
        let allowed: Vec<&str> = from.iter().map(|s| s.as_str()).collect();
        let updated = self.conn().execute(
            "UPDATE drafts SET text = ?1
             WHERE id = ?2 AND status IN (SELECT value FROM json_each(?3))",
            params![text, id.to_string(), json_array(&allowed)],
        )?;
        self.draft_outcome(updated, id)
    }
}

/// Status names contain only `[a-z_]`, so no escaping is needed.
fn json_array(values: &[&str]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| format!("\"{v}\"")).collect();
    format!("[{}]", quoted.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blank_core::DraftKind;

    fn draft(text: &str, created_at: &str) -> Draft {
        Draft::new(text.to_string(), DraftKind::Morning, 3, created_at.to_string())
    }

    #[test]
    fn test_batch_insert_and_list() {
        let store = Store::open_in_memory().unwrap();
        let batch = vec![
            draft("a", "2026-03-03T08:00:00Z"),
            draft("b", "2026-03-03T08:00:00Z"),
        ];
        store.insert_drafts(&batch).unwrap();

        let listed = store.list_drafts(DraftStatus::Draft).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].text, "b");
        assert!(store.list_drafts(DraftStatus::Posted).unwrap().is_empty());
    }

    #[test]
    fn test_batch_is_atomic() {
        let store = Store::open_in_memory().unwrap();
        let a = draft("a", "t");
        let dup = Draft { text: "dup".into(), ..a.clone() };
        assert!(store.insert_drafts(&[a, dup]).is_err());
        assert!(store.list_drafts(DraftStatus::Draft).unwrap().is_empty());
    }

    #[test]
    fn test_status_update_is_conditional() {
        let store = Store::open_in_memory().unwrap();
        let d = draft("a", "t");
        store.insert_drafts(std::slice::from_ref(&d)).unwrap();

        assert_eq!(
            store
                .set_draft_status(d.id, &[DraftStatus::Approved], DraftStatus::Posted, Some("now"))
                .unwrap(),
            UpdateOutcome::Blocked(DraftStatus::Draft)
        );
        assert_eq!(
            store
                .set_draft_status(d.id, &[DraftStatus::Draft], DraftStatus::Approved, None)
                .unwrap(),
            UpdateOutcome::Applied
        );
        store
            .set_draft_status(d.id, &[DraftStatus::Approved], DraftStatus::Posted, Some("now"))
            .unwrap();
        let got = store.get_draft(d.id).unwrap().unwrap();
        assert_eq!(got.status, DraftStatus::Posted);
        assert_eq!(got.posted_at.as_deref(), Some("now"));

        assert_eq!(
            store
                .set_draft_status(Uuid::new_v4(), &[DraftStatus::Draft], DraftStatus::Deleted, None)
                .unwrap(),
            UpdateOutcome::Missing
        );
    }

    #[test]
    fn test_edit_text() {
        let store = Store::open_in_memory().unwrap();
        let d = draft("a", "t");
        store.insert_drafts(std::slice::from_ref(&d)).unwrap();
        let editable = [DraftStatus::Draft, DraftStatus::Approved];
        assert_eq!(
            store.set_draft_text(d.id, &editable, "better").unwrap(),
            UpdateOutcome::Applied
        );
        assert_eq!(store.get_draft(d.id).unwrap().unwrap().text, "better");
    }
}
