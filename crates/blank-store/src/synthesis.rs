use rusqlite::params;

use blank_core::Synthesis;

use crate::error::Result;
use crate::store::Store;

impl Store {
    /// Insert or replace the synthesis for its cycle.
    pub fn upsert_synthesis(&self, synthesis: &Synthesis) -> Result<()> {
        self.conn().execute(
            "INSERT INTO syntheses (cycle_number, narrative_text, source_submission_count, generated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(cycle_number) DO UPDATE SET
                 narrative_text = excluded.narrative_text,
                 source_submission_count = excluded.source_submission_count,
                 generated_at = excluded.generated_at",
            params![
                synthesis.cycle_number,
                synthesis.narrative_text,
                synthesis.source_submission_count,
                synthesis.generated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_synthesis(&self, cycle_number: u32) -> Result<Option<Synthesis>> {
        let mut stmt = self.conn().prepare(
            "SELECT cycle_number, narrative_text, source_submission_count, generated_at
             FROM syntheses WHERE cycle_number = ?1",
        )?;
        let mut rows = stmt.query_map([cycle_number], |row| {
            Ok(Synthesis {
                cycle_number: row.get(0)?,
                narrative_text: row.get(1)?,
                source_submission_count: row.get(2)?,
                generated_at: row.get(3)?,
            })
        })?;
        Ok(rows.next().transpose()?)
    }
}
