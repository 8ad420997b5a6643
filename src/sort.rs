//! Column ordering for the connection table.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;

use crate::rows::DisplayRow;

/// Table columns, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Process,
    Pid,
    LocalIp,
    LocalPort,
    Status,
    Family,
    Type,
}

impl SortColumn {
    pub const ALL: [SortColumn; 7] = [
        SortColumn::Process,
        SortColumn::Pid,
        SortColumn::LocalIp,
        SortColumn::LocalPort,
        SortColumn::Status,
        SortColumn::Family,
        SortColumn::Type,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SortColumn::Process => "Process",
            SortColumn::Pid => "PID",
            SortColumn::LocalIp => "Local IP",
            SortColumn::LocalPort => "Port",
            SortColumn::Status => "Status",
            SortColumn::Family => "Family",
            SortColumn::Type => "Type",
        }
    }

    /// Column for a 0-based display position
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Parse a column name as accepted on the command line and in config
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "process" | "name" => Some(SortColumn::Process),
            "pid" => Some(SortColumn::Pid),
            "ip" | "local-ip" | "lip" => Some(SortColumn::LocalIp),
            "port" | "lport" | "local-port" => Some(SortColumn::LocalPort),
            "status" | "state" => Some(SortColumn::Status),
            "family" => Some(SortColumn::Family),
            "type" => Some(SortColumn::Type),
            _ => None,
        }
    }

    fn compare(&self, a: &DisplayRow, b: &DisplayRow) -> Ordering {
        match self {
            SortColumn::Pid => a.pid.cmp(&b.pid),
            SortColumn::LocalPort => a.local_port.cmp(&b.local_port),
            SortColumn::Process => cmp_text(&a.process_name, &b.process_name),
            SortColumn::LocalIp => cmp_text(&a.local_ip.to_string(), &b.local_ip.to_string()),
            SortColumn::Status => cmp_text(&a.status, &b.status),
            SortColumn::Family => cmp_text(a.family, b.family),
            SortColumn::Type => cmp_text(a.socket_type, b.socket_type),
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

/// Stable sort; rows that compare equal keep their input order in both directions
pub fn sort_rows<R: Borrow<DisplayRow>>(
    rows: &mut [R],
    column: SortColumn,
    direction: SortDirection,
) {
    rows.sort_by(|a, b| {
        let ord = column.compare(
            <R as Borrow<DisplayRow>>::borrow(a),
            <R as Borrow<DisplayRow>>::borrow(b),
        );
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

/// Current column selection of the table. No column means enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub column: Option<SortColumn>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(column: SortColumn, direction: SortDirection) -> Self {
        Self {
            column: Some(column),
            direction,
        }
    }

    /// Selecting the active column flips direction, any other column starts ascending
    pub fn select(&mut self, column: SortColumn) {
        if self.column == Some(column) {
            self.direction = self.direction.reversed();
        } else {
            self.column = Some(column);
            self.direction = SortDirection::Ascending;
        }
    }

    pub fn apply<R: Borrow<DisplayRow>>(&self, rows: &mut [R]) {
        if let Some(column) = self.column {
            sort_rows(rows, column, self.direction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::test_support::row;
    use proptest::prelude::*;

    fn ports(rows: &[DisplayRow]) -> Vec<u16> {
        rows.iter().map(|r| r.local_port).collect()
    }

    #[test]
    fn test_numeric_columns_sort_as_integers() {
        let mut rows = vec![
            row("a", 1, 8080, "LISTEN"),
            row("b", 2, 443, "LISTEN"),
            row("c", 3, 80, "LISTEN"),
        ];
        sort_rows(&mut rows, SortColumn::LocalPort, SortDirection::Ascending);
        assert_eq!(ports(&rows), vec![80, 443, 8080]);
    }

    #[test]
    fn test_missing_pid_sorts_first() {
        let mut rows = vec![row("a", 10, 1, "-"), row("b", 2, 2, "-")];
        rows[0].pid = None;
        sort_rows(&mut rows, SortColumn::Pid, SortDirection::Descending);
        assert_eq!(rows[0].pid, Some(2));
        assert_eq!(rows[1].pid, None);
    }

    #[test]
    fn test_text_columns_case_insensitive() {
        let mut rows = vec![
            row("zsh", 1, 1, "-"),
            row("Apache", 2, 2, "-"),
            row("bash", 3, 3, "-"),
        ];
        sort_rows(&mut rows, SortColumn::Process, SortDirection::Ascending);
        let names: Vec<_> = rows.iter().map(|r| r.process_name.as_str()).collect();
        assert_eq!(names, vec!["Apache", "bash", "zsh"]);
    }

    #[test]
    fn test_ties_keep_order_when_descending() {
        let mut rows = vec![
            row("first", 1, 80, "-"),
            row("other", 2, 22, "-"),
            row("second", 3, 80, "-"),
        ];
        sort_rows(&mut rows, SortColumn::LocalPort, SortDirection::Descending);
        let names: Vec<_> = rows.iter().map(|r| r.process_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "other"]);
    }

    #[test]
    fn test_select_toggles_and_resets() {
        let mut state = SortState::default();
        assert_eq!(state.column, None);

        state.select(SortColumn::LocalPort);
        assert_eq!(state, SortState::new(SortColumn::LocalPort, SortDirection::Ascending));

        state.select(SortColumn::LocalPort);
        assert_eq!(state.direction, SortDirection::Descending);

        state.select(SortColumn::Status);
        assert_eq!(state, SortState::new(SortColumn::Status, SortDirection::Ascending));
    }

    #[test]
    fn test_unsorted_state_keeps_order() {
        let mut rows = vec![row("b", 2, 2, "-"), row("a", 1, 1, "-")];
        SortState::default().apply(&mut rows);
        assert_eq!(ports(&rows), vec![2, 1]);
    }

    #[test]
    fn test_column_names() {
        assert_eq!(SortColumn::from_name("PORT"), Some(SortColumn::LocalPort));
        assert_eq!(SortColumn::from_name("bogus"), None);
        assert_eq!(SortColumn::from_index(6), Some(SortColumn::Type));
    }

    proptest! {
        #[test]
        fn prop_descending_reverses_distinct_ports(
            port_set in prop::collection::btree_set(1u16..u16::MAX, 0..30),
        ) {
            let mut rows: Vec<DisplayRow> = port_set
                .iter()
                .rev()
                .enumerate()
                .map(|(i, &p)| row("p", i as u32, p, "-"))
                .collect();
            sort_rows(&mut rows, SortColumn::LocalPort, SortDirection::Ascending);
            let ascending = ports(&rows);
            sort_rows(&mut rows, SortColumn::LocalPort, SortDirection::Descending);
            let mut descending = ports(&rows);
            descending.reverse();
            prop_assert_eq!(ascending, descending);
        }

        #[test]
        fn prop_shared_ports_keep_prior_order(
            ports_in in prop::collection::vec(1u16..5, 0..30),
        ) {
            let mut rows: Vec<DisplayRow> = ports_in
                .iter()
                .enumerate()
                .map(|(i, &p)| row("p", i as u32, p, "-"))
                .collect();
            sort_rows(&mut rows, SortColumn::LocalPort, SortDirection::Ascending);
            let prior: Vec<u32> = rows.iter().filter_map(|r| r.pid).collect();
            sort_rows(&mut rows, SortColumn::LocalPort, SortDirection::Descending);
            for port in 1u16..5 {
                let before: Vec<u32> = prior
                    .iter()
                    .copied()
                    .filter(|pid| ports_in[*pid as usize] == port)
                    .collect();
                let after: Vec<u32> = rows
                    .iter()
                    .filter(|r| r.local_port == port)
                    .filter_map(|r| r.pid)
                    .collect();
                prop_assert_eq!(before, after);
            }
        }
    }
}
