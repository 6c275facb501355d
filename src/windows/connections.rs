//! TCP and UDP connection tables with owning processes

use serde::{Deserialize, Serialize};

use crate::core::name_cache::ProcessNameCache;

/// One connection table row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionRow {
    pub protocol: String,
    pub local_address: String,
    pub local_port: u16,
    pub remote_address: String,
    pub remote_port: u16,
    pub state: String,
    pub pid: u32,
    pub process: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionsSnapshot {
    pub tcp: Vec<ConnectionRow>,
    pub udp: Vec<ConnectionRow>,
}

#[cfg(windows)]
fn tcp_state_name(state: u32) -> &'static str {
    use windows::Win32::NetworkManagement::IpHelper::{
        MIB_TCP_STATE_CLOSE_WAIT, MIB_TCP_STATE_CLOSING, MIB_TCP_STATE_ESTAB,
        MIB_TCP_STATE_FIN_WAIT1, MIB_TCP_STATE_FIN_WAIT2, MIB_TCP_STATE_LAST_ACK,
        MIB_TCP_STATE_LISTEN, MIB_TCP_STATE_SYN_RCVD, MIB_TCP_STATE_SYN_SENT,
        MIB_TCP_STATE_TIME_WAIT,
    };

    match state {
        s if s == MIB_TCP_STATE_LISTEN.0 as u32 => "LISTENING",
        s if s == MIB_TCP_STATE_ESTAB.0 as u32 => "ESTABLISHED",
        s if s == MIB_TCP_STATE_SYN_SENT.0 as u32 => "SYN_SENT",
        s if s == MIB_TCP_STATE_SYN_RCVD.0 as u32 => "SYN_RECEIVED",
        s if s == MIB_TCP_STATE_FIN_WAIT1.0 as u32 => "FIN_WAIT_1",
        s if s == MIB_TCP_STATE_FIN_WAIT2.0 as u32 => "FIN_WAIT_2",
        s if s == MIB_TCP_STATE_CLOSE_WAIT.0 as u32 => "CLOSE_WAIT",
        s if s == MIB_TCP_STATE_CLOSING.0 as u32 => "CLOSING",
        s if s == MIB_TCP_STATE_LAST_ACK.0 as u32 => "LAST_ACK",
        s if s == MIB_TCP_STATE_TIME_WAIT.0 as u32 => "TIME_WAIT",
        _ => "UNKNOWN",
    }
}

/// Resolve a pid to its executable name, without the path.
#[cfg(windows)]
pub fn query_process_name(pid: u32) -> Option<String> {
    use windows::core::PWSTR;
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{
        OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_FORMAT,
        PROCESS_QUERY_LIMITED_INFORMATION,
    };

    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;
        let mut buffer = [0u16; 260];
        let mut size = buffer.len() as u32;
        let result = QueryFullProcessImageNameW(
            handle,
            PROCESS_NAME_FORMAT(0),
            PWSTR(buffer.as_mut_ptr()),
            &mut size,
        );
        let _ = CloseHandle(handle);
        result.ok()?;
        let path = String::from_utf16_lossy(&buffer[..size as usize]);
        let name = path.rsplit('\\').next().unwrap_or(path.as_str());
        Some(name.to_string())
    }
}

#[cfg(not(windows))]
pub fn query_process_name(_pid: u32) -> Option<String> {
    None
}

/// Snapshot the IPv4 TCP and UDP tables.
///
/// Closed and closing-teardown TCP rows are skipped. Each row's owning
/// process name goes through the shared cache so repeated polls do not
/// reopen process handles.
#[cfg(windows)]
pub fn enumerate(names: &mut ProcessNameCache) -> ConnectionsSnapshot {
    use windows::Win32::Foundation::NO_ERROR;
    use windows::Win32::NetworkManagement::IpHelper::{
        GetExtendedTcpTable, GetExtendedUdpTable, MIB_TCPROW_OWNER_PID, MIB_TCPTABLE_OWNER_PID,
        MIB_TCP_STATE_CLOSED, MIB_TCP_STATE_DELETE_TCB, MIB_UDPROW_OWNER_PID,
        MIB_UDPTABLE_OWNER_PID, TCP_TABLE_OWNER_PID_ALL, UDP_TABLE_OWNER_PID,
    };
    use windows::Win32::Networking::WinSock::AF_INET;

    let mut snapshot = ConnectionsSnapshot::default();
    let family = AF_INET.0 as u32;

    let mut size = 0u32;
    unsafe {
        GetExtendedTcpTable(None, &mut size, false, family, TCP_TABLE_OWNER_PID_ALL, 0);
    }
    if size > 0 {
        let mut buffer = vec![0u8; size as usize];
        let status = unsafe {
            GetExtendedTcpTable(
                Some(buffer.as_mut_ptr() as *mut _),
                &mut size,
                false,
                family,
                TCP_TABLE_OWNER_PID_ALL,
                0,
            )
        };
        if status == NO_ERROR.0 {
            let table = unsafe { &*(buffer.as_ptr() as *const MIB_TCPTABLE_OWNER_PID) };
            let rows: &[MIB_TCPROW_OWNER_PID] = unsafe {
                std::slice::from_raw_parts(table.table.as_ptr(), table.dwNumEntries as usize)
            };
            for row in rows {
                if row.dwState == MIB_TCP_STATE_CLOSED.0 as u32
                    || row.dwState == MIB_TCP_STATE_DELETE_TCB.0 as u32
                {
                    continue;
                }
                snapshot.tcp.push(ConnectionRow {
                    protocol: "TCP".to_string(),
                    local_address: ipv4_text(row.dwLocalAddr),
                    local_port: port_text(row.dwLocalPort),
                    remote_address: ipv4_text(row.dwRemoteAddr),
                    remote_port: port_text(row.dwRemotePort),
                    state: tcp_state_name(row.dwState).to_string(),
                    pid: row.dwOwningPid,
                    process: names.resolve(row.dwOwningPid, query_process_name),
                });
            }
        }
    }

    let mut size = 0u32;
    unsafe {
        GetExtendedUdpTable(None, &mut size, false, family, UDP_TABLE_OWNER_PID, 0);
    }
    if size > 0 {
        let mut buffer = vec![0u8; size as usize];
        let status = unsafe {
            GetExtendedUdpTable(
                Some(buffer.as_mut_ptr() as *mut _),
                &mut size,
                false,
                family,
                UDP_TABLE_OWNER_PID,
                0,
            )
        };
        if status == NO_ERROR.0 {
            let table = unsafe { &*(buffer.as_ptr() as *const MIB_UDPTABLE_OWNER_PID) };
            let rows: &[MIB_UDPROW_OWNER_PID] = unsafe {
                std::slice::from_raw_parts(table.table.as_ptr(), table.dwNumEntries as usize)
            };
            for row in rows {
                snapshot.udp.push(ConnectionRow {
                    protocol: "UDP".to_string(),
                    local_address: ipv4_text(row.dwLocalAddr),
                    local_port: port_text(row.dwLocalPort),
                    remote_address: "*".to_string(),
                    remote_port: 0,
                    // UDP has no handshake; every bound socket is listening.
                    state: "LISTENING".to_string(),
                    pid: row.dwOwningPid,
                    process: names.resolve(row.dwOwningPid, query_process_name),
                });
            }
        }
    }

    snapshot
}

#[cfg(not(windows))]
pub fn enumerate(_names: &mut ProcessNameCache) -> ConnectionsSnapshot {
    ConnectionsSnapshot::default()
}

/// Table rows store addresses in network byte order.
#[cfg(windows)]
fn ipv4_text(addr: u32) -> String {
    std::net::Ipv4Addr::from(addr.to_ne_bytes()).to_string()
}

/// Ports occupy the low 16 bits, also in network byte order.
#[cfg(windows)]
fn port_text(port: u32) -> u16 {
    u16::from_be(port as u16)
}
