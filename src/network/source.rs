// network/source.rs - Socket table enumeration

use anyhow::{Context, Result};
use log::{debug, warn};
use netstat2::{
    AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, SocketInfo, TcpState,
    iterate_sockets_info,
};

use crate::network::types::{Collection, ConnectionRecord};

/// Anything that can enumerate the machine's sockets
pub trait ConnectionSource {
    /// Query the current socket table.
    ///
    /// An `Err` means nothing could be read (typically access denied).
    /// Sockets that fail individually are reported in `Collection::failures`.
    fn collect(&mut self) -> Result<Collection>;

    /// Name of the backend, shown in the UI and in logs
    fn name(&self) -> &str;
}

/// Connection source backed by the operating system's socket tables
pub struct SystemConnectionSource {
    address_families: AddressFamilyFlags,
    protocols: ProtocolFlags,
}

impl SystemConnectionSource {
    pub fn new() -> Self {
        Self {
            address_families: AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6,
            protocols: ProtocolFlags::TCP | ProtocolFlags::UDP,
        }
    }
}

impl Default for SystemConnectionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionSource for SystemConnectionSource {
    fn collect(&mut self) -> Result<Collection> {
        let sockets = iterate_sockets_info(self.address_families, self.protocols)
            .context("Failed to query socket table")?;

        let mut collection = Collection::default();
        for socket in sockets {
            match socket {
                Ok(info) => collection.records.extend(records_for_socket(info)),
                Err(e) => {
                    debug!("Skipping unreadable socket: {}", e);
                    collection.failures.push(e.to_string());
                }
            }
        }

        if collection.is_partial() {
            warn!(
                "Socket query returned {} records, {} sockets could not be read",
                collection.records.len(),
                collection.failures.len()
            );
        }

        Ok(collection)
    }

    fn name(&self) -> &str {
        "netstat2"
    }
}

/// Expand one socket into records, one per owning process
fn records_for_socket(info: SocketInfo) -> Vec<ConnectionRecord> {
    let base = match info.protocol_socket_info {
        ProtocolSocketInfo::Tcp(tcp) => ConnectionRecord::tcp(
            tcp.local_addr,
            tcp.local_port,
            tcp.remote_addr,
            tcp.remote_port,
            tcp_state_label(tcp.state),
            None,
        ),
        ProtocolSocketInfo::Udp(udp) => ConnectionRecord::udp(udp.local_addr, udp.local_port, None),
    };

    if info.associated_pids.is_empty() {
        return vec![base];
    }

    info.associated_pids
        .into_iter()
        .map(|pid| ConnectionRecord {
            pid: Some(pid),
            ..base.clone()
        })
        .collect()
}

/// Status names as the kernel's socket state table spells them
pub fn tcp_state_label(state: TcpState) -> &'static str {
    match state {
        TcpState::Listen => "LISTEN",
        TcpState::SynSent => "SYN_SENT",
        TcpState::SynReceived => "SYN_RECV",
        TcpState::Established => "ESTABLISHED",
        TcpState::FinWait1 => "FIN_WAIT1",
        TcpState::FinWait2 => "FIN_WAIT2",
        TcpState::CloseWait => "CLOSE_WAIT",
        TcpState::Closing => "CLOSING",
        TcpState::LastAck => "LAST_ACK",
        TcpState::TimeWait => "TIME_WAIT",
        TcpState::Closed => "CLOSE",
        TcpState::DeleteTcb => "DELETE_TCB",
        TcpState::Unknown => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_state_labels() {
        assert_eq!(tcp_state_label(TcpState::Established), "ESTABLISHED");
        assert_eq!(tcp_state_label(TcpState::SynReceived), "SYN_RECV");
        assert_eq!(tcp_state_label(TcpState::Closed), "CLOSE");
    }

    #[test]
    fn test_system_source_name() {
        let source = SystemConnectionSource::default();
        assert_eq!(source.name(), "netstat2");
    }
}
