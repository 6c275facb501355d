//! Active network interface enumeration
//!
//! Walks the adapter list, keeps physical ethernet/wireless interfaces that
//! are up, and pairs each with its cumulative octet counters. Byte rates
//! are filled in by the monitor from consecutive polls.

use serde::{Deserialize, Serialize};

/// One active physical interface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterfaceStats {
    /// OS interface index; the identity used for rate sampling.
    pub index: u32,
    pub name: String,
    /// "wired" or "wireless".
    pub kind: String,
    pub ipv4: Option<String>,
    pub subnet: Option<String>,
    pub ipv6: Option<String>,
    pub dns: Vec<String>,
    pub dhcp: bool,
    pub mac: Option<String>,
    pub link_speed_mbps: f64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
    /// Busier direction relative to link speed, 0-100.
    pub utilization_percent: f64,
}

#[cfg(windows)]
pub fn enumerate() -> Vec<InterfaceStats> {
    use std::net::{Ipv4Addr, Ipv6Addr};
    use windows::Win32::Foundation::{ERROR_BUFFER_OVERFLOW, NO_ERROR};
    use windows::Win32::NetworkManagement::IpHelper::{
        GetAdaptersAddresses, GetIfEntry2, GAA_FLAG_INCLUDE_PREFIX, GAA_FLAG_SKIP_ANYCAST,
        GAA_FLAG_SKIP_MULTICAST, IF_TYPE_ETHERNET_CSMACD, IF_TYPE_IEEE80211,
        IP_ADAPTER_ADDRESSES_LH, MIB_IF_ROW2,
    };
    use windows::Win32::NetworkManagement::Ndis::IfOperStatusUp;
    use windows::Win32::Networking::WinSock::{
        AF_INET, AF_INET6, AF_UNSPEC, SOCKADDR, SOCKADDR_IN, SOCKADDR_IN6,
    };

    // Bit 2 of the adapter flags word.
    const DHCPV4_ENABLED: u32 = 0x4;

    let flags = GAA_FLAG_SKIP_ANYCAST | GAA_FLAG_SKIP_MULTICAST | GAA_FLAG_INCLUDE_PREFIX;
    let family = AF_UNSPEC.0 as u32;

    let mut size = 16 * 1024u32;
    let mut buffer = vec![0u8; size as usize];
    let mut status = unsafe {
        GetAdaptersAddresses(
            family,
            flags,
            None,
            Some(buffer.as_mut_ptr() as *mut IP_ADAPTER_ADDRESSES_LH),
            &mut size,
        )
    };
    if status == ERROR_BUFFER_OVERFLOW.0 {
        buffer = vec![0u8; size as usize];
        status = unsafe {
            GetAdaptersAddresses(
                family,
                flags,
                None,
                Some(buffer.as_mut_ptr() as *mut IP_ADAPTER_ADDRESSES_LH),
                &mut size,
            )
        };
    }
    if status != NO_ERROR.0 {
        return Vec::new();
    }

    unsafe fn sockaddr_text(sockaddr: *const SOCKADDR) -> Option<(bool, String)> {
        if sockaddr.is_null() {
            return None;
        }
        let family = (*sockaddr).sa_family;
        if family == AF_INET {
            let sa = &*(sockaddr as *const SOCKADDR_IN);
            let addr = Ipv4Addr::from(sa.sin_addr.S_un.S_addr.to_ne_bytes());
            Some((true, addr.to_string()))
        } else if family == AF_INET6 {
            let sa = &*(sockaddr as *const SOCKADDR_IN6);
            let addr = Ipv6Addr::from(sa.sin6_addr.u.Byte);
            Some((false, addr.to_string()))
        } else {
            None
        }
    }

    let mut interfaces = Vec::new();
    let mut adapter = buffer.as_ptr() as *const IP_ADAPTER_ADDRESSES_LH;

    while !adapter.is_null() {
        let a = unsafe { &*adapter };
        adapter = a.Next;

        // Physical interfaces only, and only those that are up.
        if a.IfType != IF_TYPE_ETHERNET_CSMACD && a.IfType != IF_TYPE_IEEE80211 {
            continue;
        }
        if a.OperStatus != IfOperStatusUp {
            continue;
        }

        let index = unsafe { a.Anonymous1.Anonymous.IfIndex };
        let mut row = MIB_IF_ROW2 {
            InterfaceIndex: index,
            ..Default::default()
        };
        if unsafe { GetIfEntry2(&mut row) }.is_err() {
            continue;
        }

        let mut iface = InterfaceStats {
            index,
            name: if a.FriendlyName.is_null() {
                String::new()
            } else {
                unsafe { a.FriendlyName.to_string() }.unwrap_or_default()
            },
            kind: if a.IfType == IF_TYPE_IEEE80211 {
                "wireless".to_string()
            } else {
                "wired".to_string()
            },
            dhcp: unsafe { a.Anonymous2.Flags } & DHCPV4_ENABLED != 0,
            link_speed_mbps: a.TransmitLinkSpeed as f64 / 1e6,
            rx_bytes: row.InOctets,
            tx_bytes: row.OutOctets,
            rx_packets: row.InUcastPkts,
            tx_packets: row.OutUcastPkts,
            ..Default::default()
        };

        let mut unicast = a.FirstUnicastAddress;
        while !unicast.is_null() {
            let entry = unsafe { &*unicast };
            unicast = entry.Next;
            match unsafe { sockaddr_text(entry.Address.lpSockaddr) } {
                Some((true, text)) if iface.ipv4.is_none() => {
                    iface.ipv4 = Some(text);
                    let prefix = entry.OnLinkPrefixLength as u32;
                    let mask = u32::MAX
                        .checked_shl(32 - prefix.min(32))
                        .unwrap_or(0);
                    iface.subnet = Some(Ipv4Addr::from(mask).to_string());
                }
                Some((false, text)) if iface.ipv6.is_none() => {
                    iface.ipv6 = Some(text);
                }
                _ => {}
            }
        }

        let mut dns = a.FirstDnsServerAddress;
        while !dns.is_null() && iface.dns.len() < 2 {
            let entry = unsafe { &*dns };
            dns = entry.Next;
            if let Some((_, text)) = unsafe { sockaddr_text(entry.Address.lpSockaddr) } {
                iface.dns.push(text);
            }
        }

        if a.PhysicalAddressLength == 6 {
            let mac = &a.PhysicalAddress[..6];
            iface.mac = Some(format!(
                "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
                mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
            ));
        }

        interfaces.push(iface);
    }

    interfaces
}

#[cfg(not(windows))]
pub fn enumerate() -> Vec<InterfaceStats> {
    Vec::new()
}
