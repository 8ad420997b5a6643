use anyhow::Error;
use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use std::io;
use std::time::Instant;

use crate::config::Config;
use crate::filter::ConnectionFilter;
use crate::network::{
    ConnectionSource, ProcessLookup, SystemConnectionSource, SystemProcessLookup,
};
use crate::refresh::{AutoRefresh, RefreshReport};
use crate::rows::{self, DisplayRow};
use crate::sort::{SortColumn, SortState};
use crate::tracker::ChangeTracker;

/// Application state
pub struct App {
    /// Application configuration
    pub config: Config,
    source: Box<dyn ConnectionSource>,
    lookup: Box<dyn ProcessLookup>,
    /// Every row of the last pass, annotated, in enumeration order
    rows: Vec<DisplayRow>,
    /// Owns the previous pass's snapshot
    tracker: ChangeTracker,
    query: String,
    filter: ConnectionFilter,
    pub sort: SortState,
    pub auto_refresh: AutoRefresh,
    last_report: RefreshReport,
    last_refresh: Option<DateTime<Local>>,
}

impl App {
    /// Create an application reading from the given source and lookup
    pub fn new(
        config: Config,
        source: Box<dyn ConnectionSource>,
        lookup: Box<dyn ProcessLookup>,
    ) -> anyhow::Result<Self> {
        let sort = config.sort_state()?;
        let mut app = Self {
            tracker: ChangeTracker::new(config.highlight_first_refresh),
            auto_refresh: AutoRefresh::new(config.refresh_interval()),
            query: String::new(),
            filter: ConnectionFilter::default(),
            source,
            lookup,
            rows: Vec::new(),
            sort,
            last_report: RefreshReport::default(),
            last_refresh: None,
            config,
        };
        let query = app.config.filter.clone();
        app.set_query(&query);
        if app.config.auto_refresh {
            app.auto_refresh.enable(Instant::now());
        }
        info!(
            "App created: source={}, interval={:?}, auto_refresh={}",
            app.source.name(),
            app.auto_refresh.interval(),
            app.auto_refresh.is_enabled()
        );
        Ok(app)
    }

    /// Create an application reading the operating system's socket tables
    pub fn with_system_source(config: Config) -> anyhow::Result<Self> {
        Self::new(
            config,
            Box::new(SystemConnectionSource::new()),
            Box::new(SystemProcessLookup::new()),
        )
    }

    /// Run one full pass: query, map, diff. Never fails; source errors end
    /// up in the returned report and leave an empty or partial row set.
    pub fn refresh(&mut self) -> &RefreshReport {
        let started = Instant::now();
        let mut report = RefreshReport::default();

        let records = match self.source.collect() {
            Ok(collection) => {
                if collection.is_partial() {
                    report.skipped = collection.failures.len();
                    report.error = Some(format!(
                        "{} sockets could not be read: {}",
                        collection.failures.len(),
                        collection.failures[0]
                    ));
                }
                collection.records
            }
            Err(e) => {
                error!("Connection query failed: {:#}", e);
                report.error = Some(describe_source_error(&e));
                Vec::new()
            }
        };

        self.lookup.refresh();
        let mut rows = rows::map_records(&records, &*self.lookup);
        let counts = self.tracker.track(&mut rows);

        report.total = rows.len();
        report.new = counts.new;
        report.changed = counts.changed;
        self.rows = rows;
        self.last_refresh = Some(Local::now());
        self.auto_refresh.mark_ran(Instant::now());

        debug!(
            "Refresh: {} rows ({} new, {} changed, {} skipped) in {:?}",
            report.total,
            report.new,
            report.changed,
            report.skipped,
            started.elapsed()
        );
        self.last_report = report;
        &self.last_report
    }

    /// Run a pass if auto-refresh is due at `now`. Returns whether a pass ran.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.auto_refresh.is_due(now) {
            return false;
        }
        self.refresh();
        true
    }

    /// Returns whether auto-refresh is now enabled
    pub fn toggle_auto_refresh(&mut self, now: Instant) -> bool {
        let enabled = self.auto_refresh.toggle(now);
        info!(
            "Auto-refresh {}",
            if enabled { "enabled" } else { "disabled" }
        );
        enabled
    }

    /// Replace the filter query; applies to the current rows without re-querying
    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.filter = ConnectionFilter::parse(query);
        if !self.filter.ignored.is_empty() {
            debug!("Ignored filter tokens: {:?}", self.filter.ignored);
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn filter(&self) -> &ConnectionFilter {
        &self.filter
    }

    pub fn select_sort_column(&mut self, column: SortColumn) {
        self.sort.select(column);
        debug!("Sort by {} {:?}", column, self.sort.direction);
    }

    /// Rows passing the filter, in sort order
    pub fn visible_rows(&self) -> Vec<&DisplayRow> {
        let mut visible = self.filter.apply(&self.rows);
        self.sort.apply(&mut visible);
        visible
    }

    /// All rows of the last pass, unfiltered
    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    pub fn last_report(&self) -> &RefreshReport {
        &self.last_report
    }

    pub fn last_refresh(&self) -> Option<DateTime<Local>> {
        self.last_refresh
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }
}

/// Turn a source failure into a status line for the user
pub fn describe_source_error(err: &Error) -> String {
    if err.chain().any(is_permission_denied) {
        warn!("Socket table access denied");
        "Access denied reading connections; run with elevated privileges to see all sockets"
            .to_string()
    } else {
        format!("Failed to read connections: {:#}", err)
    }
}

/// netstat2 keeps the `io::Error` of some variants out of the source chain
fn is_permission_denied(cause: &(dyn std::error::Error + 'static)) -> bool {
    let io_err = match cause.downcast_ref::<netstat2::error::Error>() {
        Some(
            netstat2::error::Error::FailedToListProcesses(io_err)
            | netstat2::error::Error::FailedToQueryFileDescriptors(io_err),
        ) => Some(io_err),
        _ => cause.downcast_ref::<io::Error>(),
    };
    io_err.is_some_and(|io_err| io_err.kind() == io::ErrorKind::PermissionDenied)
}
