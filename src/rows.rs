//! Mapping of raw connection records into display rows.

use std::net::IpAddr;

use crate::network::{ConnectionRecord, ProcessLookup};

/// Shown when the owning process is unknown or gone
pub const UNKNOWN_PROCESS: &str = "Unknown";
/// Shown for an absent pid and for sockets without a status
pub const PLACEHOLDER: &str = "-";

/// Per-row annotation produced by the change tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Highlight {
    New,
    Changed,
    #[default]
    Unchanged,
}

/// A connection as presented in the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub process_name: String,
    pub pid: Option<u32>,
    pub local_ip: IpAddr,
    pub local_port: u16,
    pub remote_ip: Option<IpAddr>,
    pub remote_port: Option<u16>,
    pub status: String,
    pub family: &'static str,
    pub socket_type: &'static str,
    pub highlight: Highlight,
}

impl DisplayRow {
    pub fn pid_label(&self) -> String {
        self.pid
            .map(|p| p.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    /// "ip:port" of the local endpoint, bracketing IPv6 addresses
    pub fn local_endpoint(&self) -> String {
        format_endpoint(self.local_ip, self.local_port)
    }

    pub fn remote_endpoint(&self) -> String {
        match (self.remote_ip, self.remote_port) {
            (Some(ip), Some(port)) => format_endpoint(ip, port),
            _ => PLACEHOLDER.to_string(),
        }
    }
}

fn format_endpoint(ip: IpAddr, port: u16) -> String {
    match ip {
        IpAddr::V4(v4) => format!("{}:{}", v4, port),
        IpAddr::V6(v6) => format!("[{}]:{}", v6, port),
    }
}

/// Map one record into a row. Never fails: missing data becomes placeholders.
pub fn map_record<L: ProcessLookup + ?Sized>(
    record: &ConnectionRecord,
    lookup: &L,
) -> DisplayRow {
    // pid 0 is the kernel/idle pseudo-process and has no meaningful owner
    let process_name = record
        .pid
        .filter(|&pid| pid != 0)
        .and_then(|pid| lookup.process_name(pid))
        .unwrap_or_else(|| UNKNOWN_PROCESS.to_string());

    DisplayRow {
        process_name,
        pid: record.pid,
        local_ip: record.local_ip,
        local_port: record.local_port,
        remote_ip: record.remote_ip,
        remote_port: record.remote_port,
        status: normalize_status(&record.status),
        family: record.family.label(),
        socket_type: record.socket_type.label(),
        highlight: Highlight::Unchanged,
    }
}

pub fn map_records<L: ProcessLookup + ?Sized>(
    records: &[ConnectionRecord],
    lookup: &L,
) -> Vec<DisplayRow> {
    records.iter().map(|r| map_record(r, lookup)).collect()
}

/// Empty statuses and the "NONE" state of connectionless sockets become `-`
pub fn normalize_status(status: &str) -> String {
    let status = status.trim();
    if status.is_empty() || status.eq_ignore_ascii_case("none") {
        PLACEHOLDER.to_string()
    } else {
        status.to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn names() -> HashMap<u32, String> {
        let mut names = HashMap::new();
        names.insert(100, "nginx".to_string());
        names
    }

    #[test]
    fn test_end_to_end_status_placeholder() {
        let records = vec![
            ConnectionRecord::tcp(
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                80,
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                0,
                "LISTEN",
                Some(100),
            ),
            ConnectionRecord::udp(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 443, Some(200)),
        ];

        let rows = map_records(&records, &names());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].pid, Some(100));
        assert_eq!(rows[0].status, "LISTEN");
        assert_eq!(rows[0].process_name, "nginx");
        assert_eq!(rows[1].pid, Some(200));
        assert_eq!(rows[1].status, "-");
    }

    #[test]
    fn test_missing_pid_uses_placeholders() {
        let rec = ConnectionRecord::udp(IpAddr::V6(Ipv6Addr::LOCALHOST), 5353, None);
        let row = map_record(&rec, &names());
        assert_eq!(row.process_name, UNKNOWN_PROCESS);
        assert_eq!(row.pid_label(), "-");
        assert_eq!(row.family, "AF_INET6");
        assert_eq!(row.socket_type, "SOCK_DGRAM");
    }

    #[test]
    fn test_failed_lookup_keeps_pid() {
        let rec = ConnectionRecord::udp(IpAddr::V4(Ipv4Addr::LOCALHOST), 53, Some(4242));
        let row = map_record(&rec, &names());
        assert_eq!(row.process_name, UNKNOWN_PROCESS);
        assert_eq!(row.pid_label(), "4242");
    }

    #[test]
    fn test_pid_zero_not_looked_up() {
        let mut names = names();
        names.insert(0, "swapper".to_string());
        let rec = ConnectionRecord::udp(IpAddr::V4(Ipv4Addr::LOCALHOST), 53, Some(0));
        assert_eq!(map_record(&rec, &names).process_name, UNKNOWN_PROCESS);
    }

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status(""), "-");
        assert_eq!(normalize_status("  "), "-");
        assert_eq!(normalize_status("NONE"), "-");
        assert_eq!(normalize_status("none"), "-");
        assert_eq!(normalize_status("ESTABLISHED"), "ESTABLISHED");
    }

    #[test]
    fn test_endpoints() {
        let rec = ConnectionRecord::tcp(
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            8080,
            IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)),
            443,
            "ESTABLISHED",
            None,
        );
        let row = map_record(&rec, &names());
        assert_eq!(row.local_endpoint(), "[::1]:8080");
        assert_eq!(row.remote_endpoint(), "10.1.2.3:443");

        let udp = map_record(&ConnectionRecord::udp(IpAddr::V4(Ipv4Addr::LOCALHOST), 53, None), &names());
        assert_eq!(udp.remote_endpoint(), "-");
    }
}
