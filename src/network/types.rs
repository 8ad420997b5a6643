use std::fmt;
use std::net::IpAddr;

/// Address family of a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Inet,
    Inet6,
}

impl AddressFamily {
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::Inet,
            IpAddr::V6(_) => AddressFamily::Inet6,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AddressFamily::Inet => "AF_INET",
            AddressFamily::Inet6 => "AF_INET6",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Socket type (TCP sockets are streams, UDP sockets are datagrams)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
    Stream,
    Datagram,
}

impl SocketType {
    pub fn label(&self) -> &'static str {
        match self {
            SocketType::Stream => "SOCK_STREAM",
            SocketType::Datagram => "SOCK_DGRAM",
        }
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One socket as reported by the connection source at query time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub local_ip: IpAddr,
    pub local_port: u16,
    pub remote_ip: Option<IpAddr>,
    pub remote_port: Option<u16>,
    /// Protocol state, empty for connectionless sockets
    pub status: String,
    pub pid: Option<u32>,
    pub family: AddressFamily,
    pub socket_type: SocketType,
}

impl ConnectionRecord {
    /// Create a stream (TCP) record
    pub fn tcp(
        local_ip: IpAddr,
        local_port: u16,
        remote_ip: IpAddr,
        remote_port: u16,
        status: impl Into<String>,
        pid: Option<u32>,
    ) -> Self {
        Self {
            family: AddressFamily::of(&local_ip),
            local_ip,
            local_port,
            remote_ip: Some(remote_ip),
            remote_port: Some(remote_port),
            status: status.into(),
            pid,
            socket_type: SocketType::Stream,
        }
    }

    /// Create a datagram (UDP) record, which has no peer and no status
    pub fn udp(local_ip: IpAddr, local_port: u16, pid: Option<u32>) -> Self {
        Self {
            family: AddressFamily::of(&local_ip),
            local_ip,
            local_port,
            remote_ip: None,
            remote_port: None,
            status: String::new(),
            pid,
            socket_type: SocketType::Datagram,
        }
    }
}

/// Result of one query against the connection source.
///
/// `failures` holds the sockets that could not be read; the query as a
/// whole still succeeded with the remaining `records`.
#[derive(Debug, Default)]
pub struct Collection {
    pub records: Vec<ConnectionRecord>,
    pub failures: Vec<String>,
}

impl Collection {
    pub fn complete(records: Vec<ConnectionRecord>) -> Self {
        Self {
            records,
            failures: Vec::new(),
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}
