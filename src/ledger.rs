// =============================================================================
// ledger.rs: THE RECORD BOOK
// =============================================================================
//
// One profile's worth of driver records, held in memory in insertion order.
// This is the surface the outside world pokes at: the reminder button, the
// bill sync, the violation sync, the edit form, the import merge. None of
// it does any math.
// Statuses are always recomputed from whatever the records say right now.
// =============================================================================

use chrono::NaiveDate;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::dates::iso_date;
use crate::error::{LedgerError, Result};
use crate::models::{DriverRecord, LeaseMode};

/// Fields a remote bill sync is allowed to overwrite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillSync {
    pub actual_paid: f64,
    pub overdue_rent_amount: f64,
}

/// Fields a remote violation sync is allowed to overwrite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViolationSync {
    pub count: u32,
    pub points: u32,
    pub fine: f64,
    pub violation_mode: Option<LeaseMode>,
}

/// Which fields an import is allowed to touch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// Upsert whole records. Unknown drivers are appended.
    #[default]
    Full,
    /// Refresh violation fields of drivers already on the books. Unknown
    /// drivers are skipped.
    Violations,
}

/// Plate placeholder for violation imports that only know the driver's name.
pub const NAME_ONLY_PLATE: &str = "JSON_MATCH_ONLY";

/// What an import did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub updated: usize,
    pub appended: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: Vec<DriverRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array of records. Records without an id get a fresh one.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<DriverRecord> = serde_json::from_str(json)?;
        let mut ledger = Self::new();
        for record in records {
            ledger.insert(record)?;
        }
        Ok(ledger)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ledger = Self::from_json_str(&json)?;
        info!(path = %path.display(), records = ledger.len(), "Ledger loaded");
        Ok(ledger)
    }

    /// Add a record, returning its id.
    pub fn insert(&mut self, mut record: DriverRecord) -> Result<String> {
        if record.id.trim().is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        if self.position(&record.id).is_some() {
            return Err(LedgerError::DuplicateId(record.id));
        }
        let id = record.id.clone();
        debug!(record_id = %id, name = %record.name, "Record inserted");
        self.records.push(record);
        Ok(id)
    }

    /// Replace the record with the same id.
    pub fn update(&mut self, record: DriverRecord) -> Result<()> {
        let index = self
            .position(&record.id)
            .ok_or_else(|| LedgerError::NotFound(record.id.clone()))?;
        self.records[index] = record;
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<DriverRecord> {
        let index = self.position(id).ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        Ok(self.records.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&DriverRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn list(&self) -> &[DriverRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stamp the record as chased on `date`.
    pub fn mark_reminded(&mut self, id: &str, date: NaiveDate) -> Result<()> {
        let record = self.get_mut(id)?;
        record.last_reminded_date = Some(iso_date(date));
        Ok(())
    }

    /// Undo a reminder stamp.
    pub fn clear_reminder(&mut self, id: &str) -> Result<()> {
        self.get_mut(id)?.last_reminded_date = None;
        Ok(())
    }

    pub fn apply_bill_sync(&mut self, id: &str, sync: BillSync) -> Result<()> {
        let record = self.get_mut(id)?;
        record.actual_paid = sync.actual_paid;
        record.overdue_rent_amount = sync.overdue_rent_amount;
        debug!(
            record_id = %id,
            actual_paid = sync.actual_paid,
            overdue = sync.overdue_rent_amount,
            "Bill sync applied"
        );
        Ok(())
    }

    pub fn apply_violation_sync(&mut self, id: &str, sync: ViolationSync) -> Result<()> {
        let record = self.get_mut(id)?;
        record.violation_count = sync.count;
        record.violation_points = sync.points;
        record.violation_fine = sync.fine;
        if sync.violation_mode.is_some() {
            record.violation_mode = sync.violation_mode;
        }
        debug!(record_id = %id, points = sync.points, fine = sync.fine, "Violation sync applied");
        Ok(())
    }

    /// Fold an imported batch into the ledger.
    ///
    /// Records are matched on trimmed (license plate, name) and an existing
    /// record always keeps its id. Matching runs against the ledger as it
    /// grows, so a driver listed twice in one import lands once.
    pub fn merge_import(&mut self, records: Vec<DriverRecord>, mode: ImportMode) -> MergeSummary {
        let mut summary = MergeSummary::default();

        for incoming in records {
            match mode {
                ImportMode::Full => match self.same_driver(&incoming) {
                    Some(index) => {
                        let id = std::mem::take(&mut self.records[index].id);
                        self.records[index] = DriverRecord { id, ..incoming };
                        summary.updated += 1;
                    }
                    None => {
                        let mut incoming = incoming;
                        if incoming.id.trim().is_empty() || self.position(&incoming.id).is_some() {
                            incoming.id = Uuid::new_v4().to_string();
                        }
                        self.records.push(incoming);
                        summary.appended += 1;
                    }
                },
                ImportMode::Violations => {
                    if self.merge_violations(incoming) {
                        summary.updated += 1;
                    } else {
                        summary.skipped += 1;
                    }
                }
            }
        }

        info!(
            ?mode,
            updated = summary.updated,
            appended = summary.appended,
            skipped = summary.skipped,
            "Import merged"
        );
        summary
    }

    /// Overwrite the current violation figures. History figures only move
    /// when the import carries a non-zero value. Name-only rows fall back to
    /// matching on name and leave the deadline alone.
    fn merge_violations(&mut self, incoming: DriverRecord) -> bool {
        let name_only = incoming.license_plate == NAME_ONLY_PLATE;
        let index = self.same_driver(&incoming).or_else(|| {
            if name_only {
                let name = incoming.name.trim();
                self.records.iter().position(|record| record.name.trim() == name)
            } else {
                None
            }
        });
        let Some(index) = index else {
            debug!(
                name = %incoming.name,
                plate = %incoming.license_plate,
                "No driver to merge violations into"
            );
            return false;
        };

        let existing = &mut self.records[index];
        existing.violation_count = incoming.violation_count;
        existing.violation_points = incoming.violation_points;
        existing.violation_fine = incoming.violation_fine;
        if !name_only {
            existing.violation_deadline = incoming.violation_deadline;
        }
        if incoming.history_violation_count != 0 {
            existing.history_violation_count = incoming.history_violation_count;
        }
        if incoming.history_violation_points != 0 {
            existing.history_violation_points = incoming.history_violation_points;
        }
        if incoming.history_violation_fine != 0.0 && !incoming.history_violation_fine.is_nan() {
            existing.history_violation_fine = incoming.history_violation_fine;
        }
        true
    }

    fn same_driver(&self, incoming: &DriverRecord) -> Option<usize> {
        let plate = incoming.license_plate.trim();
        let name = incoming.name.trim();
        self.records
            .iter()
            .position(|record| record.license_plate.trim() == plate && record.name.trim() == name)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|record| record.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut DriverRecord> {
        self.records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(id: &str, name: &str) -> DriverRecord {
        DriverRecord {
            id: id.to_string(),
            name: name.to_string(),
            license_plate: format!("PLATE-{name}"),
            contract_start_date: "2024-04-01".to_string(),
            total_payable: 3600.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_assigns_missing_ids_and_rejects_duplicates() {
        let mut ledger = Ledger::new();
        let id = ledger.insert(driver("", "anon")).unwrap();
        assert!(Uuid::parse_str(&id).is_ok());

        ledger.insert(driver("a", "first")).unwrap();
        assert!(matches!(ledger.insert(driver("a", "again")), Err(LedgerError::DuplicateId(_))));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_update_and_remove() {
        let mut ledger = Ledger::new();
        ledger.insert(driver("a", "first")).unwrap();

        let mut edited = driver("a", "renamed");
        edited.actual_paid = 100.0;
        ledger.update(edited).unwrap();
        assert_eq!(ledger.get("a").unwrap().name, "renamed");

        assert!(matches!(ledger.update(driver("zzz", "ghost")), Err(LedgerError::NotFound(_))));

        let removed = ledger.remove("a").unwrap();
        assert_eq!(removed.actual_paid, 100.0);
        assert!(ledger.is_empty());
        assert!(ledger.remove("a").is_err());
    }

    #[test]
    fn test_reminder_toggle() {
        let mut ledger = Ledger::new();
        ledger.insert(driver("a", "first")).unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 4, 7).unwrap();
        ledger.mark_reminded("a", day).unwrap();
        assert_eq!(ledger.get("a").unwrap().last_reminded_date.as_deref(), Some("2024-04-07"));

        ledger.clear_reminder("a").unwrap();
        assert!(ledger.get("a").unwrap().last_reminded_date.is_none());
    }

    #[test]
    fn test_sync_mutations() {
        let mut ledger = Ledger::new();
        ledger.insert(driver("a", "first")).unwrap();

        let bill = BillSync {
            actual_paid: 1800.0,
            overdue_rent_amount: 250.0,
        };
        ledger.apply_bill_sync("a", bill).unwrap();
        let violations = ViolationSync {
            count: 2,
            points: 6,
            fine: 400.0,
            violation_mode: Some(LeaseMode::Kuaiwen),
        };
        ledger.apply_violation_sync("a", violations).unwrap();

        let record = ledger.get("a").unwrap();
        assert_eq!(record.actual_paid, 1800.0);
        assert_eq!(record.overdue_rent_amount, 250.0);
        assert_eq!(record.violation_points, 6);
        assert_eq!(record.effective_violation_mode(), LeaseMode::Kuaiwen);

        let cleared = ViolationSync {
            count: 0,
            points: 0,
            fine: 0.0,
            violation_mode: None,
        };
        ledger.apply_violation_sync("a", cleared).unwrap();
        assert_eq!(ledger.get("a").unwrap().effective_violation_mode(), LeaseMode::Kuaiwen);
    }

    #[test]
    fn test_from_json_str() {
        let ledger = Ledger::from_json_str(
            r#"[
                {"id": "a", "name": "First", "contractStartDate": "2024-04-01",
                 "totalPayable": 3600},
                {"name": "Second", "contractStartDate": "2024-03-15", "totalPayable": "2800"}
            ]"#,
        )
        .unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.list()[1].total_payable, 2800.0);
        assert!(!ledger.list()[1].id.is_empty());

        assert!(matches!(Ledger::from_json_str("{not json"), Err(LedgerError::Json(_))));
    }

    fn violation_row(name: &str, plate: &str, points: u32, history_points: u32) -> DriverRecord {
        DriverRecord {
            name: name.to_string(),
            license_plate: plate.to_string(),
            violation_count: 1,
            violation_points: points,
            violation_fine: 200.0,
            violation_deadline: Some("2024-05-01".to_string()),
            history_violation_points: history_points,
            ..Default::default()
        }
    }

    #[test]
    fn test_full_import_updates_in_place_and_appends() {
        let mut ledger = Ledger::new();
        ledger.insert(driver("a", "first")).unwrap();

        let mut refreshed = driver("", "  first ");
        refreshed.license_plate = " PLATE-first".to_string();
        refreshed.actual_paid = 1800.0;
        let newcomer = driver("a", "second");

        let summary = ledger.merge_import(vec![refreshed, newcomer], ImportMode::Full);
        assert_eq!(
            summary,
            MergeSummary {
                updated: 1,
                appended: 1,
                skipped: 0,
            }
        );

        assert_eq!(ledger.len(), 2);
        let first = ledger.get("a").unwrap();
        assert_eq!(first.actual_paid, 1800.0);
        assert_eq!(first.name, "  first ");

        // The newcomer's id collided with "a", so it got a fresh one.
        let second = &ledger.list()[1];
        assert_eq!(second.name, "second");
        assert!(Uuid::parse_str(&second.id).is_ok());
    }

    #[test]
    fn test_full_import_dedups_within_one_batch() {
        let mut ledger = Ledger::new();
        let mut again = driver("", "twice");
        again.actual_paid = 500.0;

        let summary = ledger.merge_import(vec![driver("", "twice"), again], ImportMode::Full);
        assert_eq!(
            summary,
            MergeSummary {
                updated: 1,
                appended: 1,
                skipped: 0,
            }
        );
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.list()[0].actual_paid, 500.0);
    }

    #[test]
    fn test_violation_import_touches_only_violation_fields() {
        let mut ledger = Ledger::new();
        let mut existing = driver("a", "first");
        existing.actual_paid = 900.0;
        existing.history_violation_points = 4;
        existing.history_violation_fine = 1050.0;
        ledger.insert(existing).unwrap();

        let mut row = violation_row("first", "PLATE-first", 6, 0);
        row.actual_paid = 0.0;
        row.total_payable = 1.0;
        let stranger = violation_row("nobody", "PLATE-x", 3, 0);

        let summary = ledger.merge_import(vec![row, stranger], ImportMode::Violations);
        assert_eq!(
            summary,
            MergeSummary {
                updated: 1,
                appended: 0,
                skipped: 1,
            }
        );
        assert_eq!(ledger.len(), 1);

        let record = ledger.get("a").unwrap();
        assert_eq!(record.violation_points, 6);
        assert_eq!(record.violation_fine, 200.0);
        assert_eq!(record.violation_deadline.as_deref(), Some("2024-05-01"));
        assert_eq!(record.history_violation_points, 4);
        assert_eq!(record.history_violation_fine, 1050.0);
        assert_eq!(record.actual_paid, 900.0);
        assert_eq!(record.total_payable, 3600.0);
    }

    #[test]
    fn test_name_only_violation_rows_match_by_name_and_keep_deadline() {
        let mut ledger = Ledger::new();
        let mut existing = driver("a", "first");
        existing.violation_deadline = Some("2024-04-20".to_string());
        ledger.insert(existing).unwrap();

        let row = violation_row(" first", NAME_ONLY_PLATE, 9, 12);
        let summary = ledger.merge_import(vec![row], ImportMode::Violations);
        assert_eq!(summary.updated, 1);

        let record = ledger.get("a").unwrap();
        assert_eq!(record.violation_points, 9);
        assert_eq!(record.history_violation_points, 12);
        assert_eq!(record.violation_deadline.as_deref(), Some("2024-04-20"));
        assert_eq!(record.license_plate, "PLATE-first");
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = Ledger::load("/definitely/not/here/ledger.json").unwrap_err();
        assert!(matches!(err, LedgerError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here/ledger.json"));
    }
}
