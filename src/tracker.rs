//! Change detection between successive refreshes.
//!
//! Rows are matched across refreshes by their [`IdentityKey`]. A row whose
//! key was not seen last time is new; a row whose status moved is changed.
//! Rows that disappeared simply drop out, there is no removed state.

use log::debug;
use std::collections::HashMap;
use std::net::IpAddr;

use crate::rows::{DisplayRow, Highlight};

/// Composite key used to match a row with its previous incarnation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub pid: Option<u32>,
    pub local_ip: IpAddr,
    pub local_port: u16,
    pub remote_ip: Option<IpAddr>,
    pub remote_port: Option<u16>,
}

impl IdentityKey {
    pub fn of(row: &DisplayRow) -> Self {
        Self {
            pid: row.pid,
            local_ip: row.local_ip,
            local_port: row.local_port,
            remote_ip: row.remote_ip,
            remote_port: row.remote_port,
        }
    }
}

/// Status of every row of one refresh, keyed by identity
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    statuses: HashMap<IdentityKey, String>,
}

impl Snapshot {
    pub fn from_rows(rows: &[DisplayRow]) -> Self {
        Self {
            statuses: rows
                .iter()
                .map(|row| (IdentityKey::of(row), row.status.clone()))
                .collect(),
        }
    }

    pub fn status(&self, key: &IdentityKey) -> Option<&str> {
        self.statuses.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

/// Highlight state of one row against the previous snapshot
pub fn classify(previous: &Snapshot, row: &DisplayRow) -> Highlight {
    match previous.status(&IdentityKey::of(row)) {
        None => Highlight::New,
        Some(status) if status != row.status => Highlight::Changed,
        Some(_) => Highlight::Unchanged,
    }
}

/// Annotate `rows` in place against `previous`
pub fn diff(previous: &Snapshot, rows: &mut [DisplayRow]) -> ChangeCounts {
    let mut counts = ChangeCounts::default();
    for row in rows.iter_mut() {
        row.highlight = classify(previous, row);
        counts.record(row.highlight);
    }
    counts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeCounts {
    pub new: usize,
    pub changed: usize,
    pub unchanged: usize,
}

impl ChangeCounts {
    fn record(&mut self, highlight: Highlight) {
        match highlight {
            Highlight::New => self.new += 1,
            Highlight::Changed => self.changed += 1,
            Highlight::Unchanged => self.unchanged += 1,
        }
    }
}

/// Holds the previous refresh's snapshot between passes
#[derive(Debug)]
pub struct ChangeTracker {
    previous: Option<Snapshot>,
    highlight_first_pass: bool,
}

impl ChangeTracker {
    /// The first pass diffs against an empty snapshot, so every row is new.
    /// With `highlight_first_pass` false it marks every row unchanged instead.
    pub fn new(highlight_first_pass: bool) -> Self {
        Self {
            previous: None,
            highlight_first_pass,
        }
    }

    /// Annotate `rows`, then make them the baseline for the next pass
    pub fn track(&mut self, rows: &mut [DisplayRow]) -> ChangeCounts {
        let counts = match &self.previous {
            Some(previous) => {
                if previous.is_empty() && !rows.is_empty() {
                    debug!("No rows in the previous pass, marking {} rows new", rows.len());
                }
                diff(previous, rows)
            }
            None if self.highlight_first_pass => diff(&Snapshot::default(), rows),
            None => {
                for row in rows.iter_mut() {
                    row.highlight = Highlight::Unchanged;
                }
                ChangeCounts {
                    unchanged: rows.len(),
                    ..ChangeCounts::default()
                }
            }
        };
        self.previous = Some(Snapshot::from_rows(rows));
        counts
    }

    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::test_support::row;

    #[test]
    fn test_new_changed_unchanged() {
        let a = row("a", 1, 80, "LISTEN");
        let b = row("b", 2, 443, "ESTABLISHED");
        let previous = Snapshot::from_rows(&[a.clone(), b]);

        let c = row("c", 3, 8080, "LISTEN");
        let mut current = vec![a, c];
        let counts = diff(&previous, &mut current);

        assert_eq!(current.len(), 2);
        assert_eq!(current[0].highlight, Highlight::Unchanged);
        assert_eq!(current[1].highlight, Highlight::New);
        assert_eq!(
            counts,
            ChangeCounts {
                new: 1,
                changed: 0,
                unchanged: 1
            }
        );
    }

    #[test]
    fn test_status_change_detected() {
        let before = row("curl", 7, 51000, "SYN_SENT");
        let previous = Snapshot::from_rows(&[before.clone()]);

        let mut after = vec![row("curl", 7, 51000, "ESTABLISHED")];
        diff(&previous, &mut after);
        assert_eq!(after[0].highlight, Highlight::Changed);
    }

    #[test]
    fn test_remote_endpoint_is_part_of_identity() {
        let before = row("curl", 7, 51000, "ESTABLISHED");
        let previous = Snapshot::from_rows(&[before.clone()]);

        let mut moved = before.clone();
        moved.remote_port = Some(8443);
        let mut current = vec![moved];
        diff(&previous, &mut current);
        assert_eq!(current[0].highlight, Highlight::New);
    }

    #[test]
    fn test_process_name_change_is_not_a_change() {
        let before = row("old-name", 7, 80, "LISTEN");
        let previous = Snapshot::from_rows(&[before]);
        let mut current = vec![row("new-name", 7, 80, "LISTEN")];
        diff(&previous, &mut current);
        assert_eq!(current[0].highlight, Highlight::Unchanged);
    }

    #[test]
    fn test_tracker_replaces_snapshot_each_pass() {
        let mut tracker = ChangeTracker::default();

        let mut first = vec![row("a", 1, 80, "LISTEN")];
        let counts = tracker.track(&mut first);
        assert_eq!(counts.new, 1);
        assert_eq!(first[0].highlight, Highlight::New);

        let mut second = vec![row("b", 2, 81, "LISTEN")];
        assert_eq!(tracker.track(&mut second).new, 1);

        // "a" was only in the first pass; history is one pass deep
        let mut third = vec![row("a", 1, 80, "LISTEN")];
        tracker.track(&mut third);
        assert_eq!(third[0].highlight, Highlight::New);
        assert_eq!(tracker.previous().map(Snapshot::len), Some(1));
    }

    #[test]
    fn test_first_pass_opt_out() {
        let mut tracker = ChangeTracker::new(false);
        let mut rows = vec![row("a", 1, 80, "LISTEN")];
        assert_eq!(tracker.track(&mut rows).unchanged, 1);
        assert_eq!(rows[0].highlight, Highlight::Unchanged);

        let mut second = vec![row("a", 1, 80, "LISTEN"), row("b", 2, 81, "LISTEN")];
        assert_eq!(tracker.track(&mut second).new, 1);
    }

    #[test]
    fn test_no_baseline_is_new_however_it_arose() {
        let mut tracker = ChangeTracker::default();
        let mut first = vec![row("a", 1, 22, "LISTEN")];
        tracker.track(&mut first);

        // A failed query produces an empty pass
        tracker.track(&mut []);
        assert!(tracker.previous().is_some_and(Snapshot::is_empty));

        let mut after = vec![row("a", 1, 22, "LISTEN")];
        tracker.track(&mut after);
        assert_eq!(first[0].highlight, after[0].highlight);
        assert_eq!(after[0].highlight, Highlight::New);
    }
}
