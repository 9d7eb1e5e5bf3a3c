//! Field-by-field merge of scan drafts into discovered-instance rows.

use chrono::{DateTime, Utc};

use migrex_model::{DiscoveredInstance, InstanceDraft};

use crate::ports::store::GraphStore;
use crate::Result;

/// Folds a draft into an existing row.
///
/// Identity fields never change. Descriptive fields take the draft value
/// only when the draft has one, so a scan that learned nothing new cannot
/// blank what an earlier scan recorded. Origin and owner are written once;
/// the finder advances on every merge, the touching process whenever the
/// draft came out of an assessment run, and a soft-deleted row comes back
/// to life.
pub fn apply_draft(existing: &mut DiscoveredInstance, draft: &InstanceDraft, now: DateTime<Utc>) {
    if !draft.detail_type.is_empty() {
        existing.detail_type = draft.detail_type.clone();
    }
    if draft.name.is_some() {
        existing.name = draft.name.clone();
    }
    if draft.vendor.is_some() {
        existing.vendor = draft.vendor.clone();
    }
    if draft.version.is_some() {
        existing.version = draft.version.clone();
    }
    if existing.origin.is_none() {
        existing.origin = draft.origin;
    }
    if existing.owner_inventory_id.is_none() {
        existing.owner_inventory_id = draft.owner_inventory_id;
    }
    if draft.finder_inventory_id.is_some() {
        existing.finder_inventory_id = draft.finder_inventory_id;
    }
    existing.deleted = false;
    if draft.touched_by.is_some() {
        existing.last_process_id = draft.touched_by;
    }
    existing.last_seen = now;
}

/// Inserts or merges a draft under its instance key and returns the row as
/// persisted. Two scans producing the same key always land on one row.
pub async fn upsert_instance(
    store: &dyn GraphStore,
    draft: &InstanceDraft,
    now: DateTime<Utc>,
) -> Result<DiscoveredInstance> {
    match store.find_instance(&draft.key).await? {
        Some(mut existing) => {
            apply_draft(&mut existing, draft, now);
            store.update_instance(&existing).await?;
            Ok(existing)
        }
        None => store.insert_instance(draft, now).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use migrex_model::{
        Domain, InstanceId, InstanceKey, InventoryId, ProcessId, ProjectId,
        RegistrationOrigin,
    };

    fn existing_row() -> DiscoveredInstance {
        let seen = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        DiscoveredInstance {
            id: InstanceId::new(7),
            key: InstanceKey::new(ProjectId::new(1), "10.0.0.5", "1521|ORCL"),
            domain: Domain::Database,
            detail_type: "ORACLE".into(),
            name: Some("ORCL".into()),
            vendor: Some("Oracle".into()),
            version: Some("12.1".into()),
            origin: Some(RegistrationOrigin::Discovered),
            owner_inventory_id: None,
            finder_inventory_id: Some(InventoryId::new(30)),
            deleted: true,
            last_process_id: Some(ProcessId::new(100)),
            first_seen: seen,
            last_seen: seen,
        }
    }

    fn draft() -> InstanceDraft {
        InstanceDraft {
            key: InstanceKey::new(ProjectId::new(1), "10.0.0.5", "1521|ORCL"),
            domain: Domain::Database,
            detail_type: "ORACLE".into(),
            name: None,
            vendor: None,
            version: Some("19.3".into()),
            origin: Some(RegistrationOrigin::Inventory),
            owner_inventory_id: Some(InventoryId::new(55)),
            finder_inventory_id: Some(InventoryId::new(41)),
            touched_by: Some(ProcessId::new(200)),
        }
    }

    #[test]
    fn absent_draft_fields_do_not_blank_the_row() {
        let mut row = existing_row();
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        apply_draft(&mut row, &draft(), now);

        assert_eq!(row.name.as_deref(), Some("ORCL"));
        assert_eq!(row.vendor.as_deref(), Some("Oracle"));
        assert_eq!(row.version.as_deref(), Some("19.3"));
    }

    #[test]
    fn origin_is_written_once() {
        let mut row = existing_row();
        let now = Utc::now();
        apply_draft(&mut row, &draft(), now);
        assert_eq!(row.origin, Some(RegistrationOrigin::Discovered));

        row.origin = None;
        apply_draft(&mut row, &draft(), now);
        assert_eq!(row.origin, Some(RegistrationOrigin::Inventory));
    }

    #[test]
    fn owner_is_adopted_only_when_missing() {
        let mut row = existing_row();
        let now = Utc::now();
        apply_draft(&mut row, &draft(), now);
        assert_eq!(row.owner_inventory_id, Some(InventoryId::new(55)));

        let mut rebinding = draft();
        rebinding.owner_inventory_id = Some(InventoryId::new(99));
        apply_draft(&mut row, &rebinding, now);
        assert_eq!(row.owner_inventory_id, Some(InventoryId::new(55)));
    }

    #[test]
    fn every_touch_resurrects_and_advances_bookkeeping() {
        let mut row = existing_row();
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        apply_draft(&mut row, &draft(), now);

        assert!(!row.deleted);
        assert_eq!(row.last_process_id, Some(ProcessId::new(200)));
        assert_eq!(row.finder_inventory_id, Some(InventoryId::new(41)));
        assert_eq!(row.last_seen, now);
        assert_ne!(row.first_seen, row.last_seen);
    }

    #[test]
    fn process_less_touch_keeps_the_last_process() {
        let mut row = existing_row();
        let mut observation = draft();
        observation.touched_by = None;
        apply_draft(&mut row, &observation, Utc::now());

        assert_eq!(row.last_process_id, Some(ProcessId::new(100)));
    }
}
