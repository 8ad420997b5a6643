use std::str::FromStr;

use crate::rows::DisplayRow;

/// Row field a predicate applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    ProcessName,
    Pid,
    LocalPort,
    Status,
    LocalIp,
}

impl FilterField {
    /// Resolve a `field:` keyword (case-insensitive)
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_lowercase().as_str() {
            "name" | "process" | "proc" => Some(FilterField::ProcessName),
            "pid" => Some(FilterField::Pid),
            "lport" | "port" => Some(FilterField::LocalPort),
            "status" | "state" => Some(FilterField::Status),
            "ip" | "lip" | "laddr" => Some(FilterField::LocalIp),
            _ => None,
        }
    }
}

/// A single filter condition derived from the query text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterPredicate {
    /// Process name contains this text
    ProcessName(String),
    /// Pid equals this number. `None` means the value was not a number
    /// and the predicate never matches.
    Pid(Option<u32>),
    /// Local port equals this number, `None` never matches
    LocalPort(Option<u16>),
    /// Status contains this text
    Status(String),
    /// Local IP contains this text
    LocalIp(String),
    /// Bare word: process name or status contains this text
    NameOrStatus(String),
}

impl FilterPredicate {
    fn for_field(field: FilterField, value: &str) -> Self {
        let value = value.to_lowercase();
        match field {
            FilterField::ProcessName => FilterPredicate::ProcessName(value),
            FilterField::Pid => FilterPredicate::Pid(parse_number(&value)),
            FilterField::LocalPort => FilterPredicate::LocalPort(parse_number(&value)),
            FilterField::Status => FilterPredicate::Status(value),
            FilterField::LocalIp => FilterPredicate::LocalIp(value),
        }
    }

    /// Check a single row. Text values are already lowercase.
    pub fn matches(&self, row: &DisplayRow) -> bool {
        match self {
            FilterPredicate::ProcessName(text) => row.process_name.to_lowercase().contains(text),
            FilterPredicate::Pid(pid) => pid.is_some() && row.pid == *pid,
            FilterPredicate::LocalPort(port) => *port == Some(row.local_port),
            FilterPredicate::Status(text) => row.status.to_lowercase().contains(text),
            FilterPredicate::LocalIp(text) => row.local_ip.to_string().to_lowercase().contains(text),
            FilterPredicate::NameOrStatus(text) => {
                row.process_name.to_lowercase().contains(text)
                    || row.status.to_lowercase().contains(text)
            }
        }
    }
}

/// Plain decimal digits only: no sign, no leading zeros
fn parse_number<T: FromStr>(value: &str) -> Option<T> {
    let digits_only = !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit());
    if !digits_only || (value.len() > 1 && value.starts_with('0')) {
        return None;
    }
    value.parse().ok()
}

/// Parse result for one whitespace-separated token of the query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterToken {
    Recognized(FilterPredicate),
    /// `field:value` with an unknown field; contributes no predicate
    Ignored(String),
}

/// Split a query into tokens and classify each one
pub fn tokenize(query: &str) -> Vec<FilterToken> {
    query
        .split_whitespace()
        .map(|part| match part.split_once(':') {
            Some((keyword, value)) => match FilterField::from_keyword(keyword) {
                Some(field) => FilterToken::Recognized(FilterPredicate::for_field(field, value)),
                None => FilterToken::Ignored(part.to_string()),
            },
            None => FilterToken::Recognized(FilterPredicate::NameOrStatus(part.to_lowercase())),
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionFilter {
    pub predicates: Vec<FilterPredicate>,
    /// Tokens that were skipped, kept so the UI can point them out
    pub ignored: Vec<String>,
}

impl ConnectionFilter {
    /// Parse filter query string into predicates
    pub fn parse(query: &str) -> Self {
        let mut filter = Self::default();
        for token in tokenize(query) {
            match token {
                FilterToken::Recognized(predicate) => filter.predicates.push(predicate),
                FilterToken::Ignored(text) => filter.ignored.push(text),
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Check if a row matches all predicates
    pub fn matches(&self, row: &DisplayRow) -> bool {
        self.predicates.iter().all(|p| p.matches(row))
    }

    /// Rows that pass the filter, in their original order
    pub fn apply<'a>(&self, rows: &'a [DisplayRow]) -> Vec<&'a DisplayRow> {
        rows.iter().filter(|row| self.matches(row)).collect()
    }
}
