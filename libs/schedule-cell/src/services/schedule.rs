use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::InMemoryTable;

use crate::models::{
    CreateScheduleEntryRequest, EntryRevision, ScheduleEntry, ScheduleError,
    UpdateScheduleEntryRequest,
};

/// Owns schedule entries. Edits are versioned: the superseded entry is kept
/// in an append-only history so past appointments stay explainable.
pub struct ScheduleService {
    entries: InMemoryTable<Uuid, ScheduleEntry>,
    history: InMemoryTable<Uuid, Vec<EntryRevision>>,
}

impl ScheduleService {
    pub fn new() -> Self {
        Self {
            entries: InMemoryTable::new("schedule_entries"),
            history: InMemoryTable::new("schedule_entry_history"),
        }
    }

    pub async fn create_entry(
        &self,
        request: CreateScheduleEntryRequest,
        actor_id: Option<Uuid>,
    ) -> Result<ScheduleEntry, ScheduleError> {
        debug!("Creating {} entry for employee {}", request.kind, request.employee_id);

        let entry = ScheduleEntry::new(
            request.employee_id,
            request.kind,
            request.recurrence,
            normalize_notes(request.notes),
        );

        if let Err(e) = entry.validate() {
            warn!("Rejected schedule entry for employee {}: {}", request.employee_id, e);
            return Err(e);
        }

        self.entries
            .insert(entry.id, entry.clone())
            .await
            .map_err(|e| ScheduleError::Storage(e.to_string()))?;

        info!(
            target: "audit",
            entry_id = %entry.id,
            employee_id = %entry.employee_id,
            kind = %entry.kind,
            actor = ?actor_id,
            "schedule entry created"
        );

        Ok(entry)
    }

    pub async fn update_entry(
        &self,
        entry_id: Uuid,
        request: UpdateScheduleEntryRequest,
        actor_id: Option<Uuid>,
    ) -> Result<ScheduleEntry, ScheduleError> {
        debug!("Updating schedule entry {}", entry_id);

        let now = Utc::now();
        let outcome = self
            .entries
            .modify(&entry_id, |entry| -> Result<ScheduleEntry, ScheduleError> {
                let previous = entry.clone();

                if let Some(kind) = request.kind {
                    entry.kind = kind;
                }
                if let Some(recurrence) = request.recurrence {
                    entry.recurrence = recurrence;
                }
                if request.notes.is_some() {
                    entry.notes = normalize_notes(request.notes);
                }

                entry.validate()?;

                entry.version = previous.version + 1;
                entry.updated_at = now;
                Ok(previous)
            })
            .await
            .ok_or(ScheduleError::NotFound(entry_id))?;

        let previous = outcome.map_err(|e| {
            warn!("Rejected update of schedule entry {}: {}", entry_id, e);
            e
        })?;

        self.record_revision(previous, false).await?;

        let updated = self
            .entries
            .get(&entry_id)
            .await
            .ok_or(ScheduleError::NotFound(entry_id))?;

        info!(
            target: "audit",
            entry_id = %entry_id,
            version = updated.version,
            actor = ?actor_id,
            "schedule entry updated"
        );

        Ok(updated)
    }

    pub async fn delete_entry(
        &self,
        entry_id: Uuid,
        actor_id: Option<Uuid>,
    ) -> Result<ScheduleEntry, ScheduleError> {
        let removed = self
            .entries
            .remove(&entry_id)
            .await
            .ok_or(ScheduleError::NotFound(entry_id))?;

        self.record_revision(removed.clone(), true).await?;

        info!(
            target: "audit",
            entry_id = %entry_id,
            employee_id = %removed.employee_id,
            actor = ?actor_id,
            "schedule entry deleted"
        );

        Ok(removed)
    }

    pub async fn get_entry(&self, entry_id: Uuid) -> Result<ScheduleEntry, ScheduleError> {
        self.entries
            .get(&entry_id)
            .await
            .ok_or(ScheduleError::NotFound(entry_id))
    }

    /// Current entries for an employee, ordered by range start then kind.
    pub async fn entries_for_employee(&self, employee_id: Uuid) -> Vec<ScheduleEntry> {
        let mut entries = self.entries.scan(|e| e.employee_id == employee_id).await;
        entries.sort_by(|a, b| {
            a.recurrence
                .range_start()
                .cmp(&b.recurrence.range_start())
                .then_with(|| b.kind.precedence().cmp(&a.kind.precedence()))
                .then_with(|| a.id.cmp(&b.id))
        });
        entries
    }

    /// Superseded and deleted versions of an entry, oldest first.
    pub async fn entry_history(&self, entry_id: Uuid) -> Result<Vec<EntryRevision>, ScheduleError> {
        let revisions = self.history.get(&entry_id).await.unwrap_or_default();
        if revisions.is_empty() && !self.entries.contains(&entry_id).await {
            return Err(ScheduleError::NotFound(entry_id));
        }
        Ok(revisions)
    }

    async fn record_revision(&self, entry: ScheduleEntry, deleted: bool) -> Result<(), ScheduleError> {
        let entry_id = entry.id;
        let revision = EntryRevision {
            entry,
            superseded_at: Utc::now(),
            deleted,
        };

        let appended = self
            .history
            .modify(&entry_id, |revisions| {
                revisions.push(revision.clone());
                Ok::<(), ScheduleError>(())
            })
            .await;

        match appended {
            Some(result) => result,
            None => self
                .history
                .insert(entry_id, vec![revision])
                .await
                .map_err(|e| ScheduleError::Storage(e.to_string())),
        }
    }
}

impl Default for ScheduleService {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}
