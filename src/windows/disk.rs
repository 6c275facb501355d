//! Partitions, physical disks and disk I/O rates

use serde::{Deserialize, Serialize};

use crate::core::counter::CounterSource;
#[cfg(windows)]
use super::perf::PdhQuery;

/// One fixed partition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Partition {
    pub mount: String,
    pub filesystem: Option<String>,
    pub size: u64,
    pub free: u64,
    pub used: u64,
    pub used_percent: f64,
}

/// One physical drive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhysicalDisk {
    pub model: Option<String>,
    pub vendor: Option<String>,
    pub bus: String,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskSnapshot {
    pub partitions: Vec<Partition>,
    pub physical: Vec<PhysicalDisk>,
}

/// Disk I/O rates, straight from the OS-side counters.
///
/// Unlike network throughput these need no local delta computation; the
/// performance counters are already expressed per second.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskIoStats {
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
    pub active_time_percent: f64,
    pub queue_length: f64,
    pub avg_read_ms: f64,
    pub avg_write_ms: f64,
    pub reads_per_sec: f64,
    pub writes_per_sec: f64,
}

#[cfg(windows)]
const DISK_IO_PATHS: [&str; 8] = [
    r"\PhysicalDisk(_Total)\Disk Read Bytes/sec",
    r"\PhysicalDisk(_Total)\Disk Write Bytes/sec",
    r"\PhysicalDisk(_Total)\% Disk Time",
    r"\PhysicalDisk(_Total)\Current Disk Queue Length",
    r"\PhysicalDisk(_Total)\Avg. Disk sec/Read",
    r"\PhysicalDisk(_Total)\Avg. Disk sec/Write",
    r"\PhysicalDisk(_Total)\Disk Reads/sec",
    r"\PhysicalDisk(_Total)\Disk Writes/sec",
];

/// Aggregate disk I/O counter set.
pub struct DiskIoCounter {
    #[cfg(windows)]
    query: Option<PdhQuery>,
    #[cfg(windows)]
    slots: Vec<Option<usize>>,
}

impl DiskIoCounter {
    pub fn new() -> Self {
        Self {
            #[cfg(windows)]
            query: None,
            #[cfg(windows)]
            slots: Vec::new(),
        }
    }
}

impl Default for DiskIoCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(windows)]
impl CounterSource for DiskIoCounter {
    type Value = DiskIoStats;

    fn prime(&mut self) -> bool {
        if self.query.is_none() {
            let Some(mut query) = PdhQuery::open() else {
                return false;
            };
            let slots: Vec<Option<usize>> = DISK_IO_PATHS
                .iter()
                .map(|path| query.add_counter(path))
                .collect();
            if slots.iter().all(Option::is_none) {
                return false;
            }
            self.query = Some(query);
            self.slots = slots;
        }
        self.query.as_ref().map(PdhQuery::collect).unwrap_or(false)
    }

    fn collect(&mut self) -> Option<DiskIoStats> {
        let query = self.query.as_ref()?;
        if !query.collect() {
            return None;
        }
        let slot = |index: usize| {
            self.slots
                .get(index)
                .copied()
                .flatten()
                .and_then(|s| query.value(s))
                .unwrap_or(0.0)
                .max(0.0)
        };
        Some(DiskIoStats {
            read_bytes_per_sec: slot(0),
            write_bytes_per_sec: slot(1),
            active_time_percent: slot(2).min(100.0),
            queue_length: slot(3),
            // Latency counters report seconds.
            avg_read_ms: slot(4) * 1000.0,
            avg_write_ms: slot(5) * 1000.0,
            reads_per_sec: slot(6),
            writes_per_sec: slot(7),
        })
    }
}

#[cfg(not(windows))]
impl CounterSource for DiskIoCounter {
    type Value = DiskIoStats;

    fn prime(&mut self) -> bool {
        false
    }

    fn collect(&mut self) -> Option<DiskIoStats> {
        None
    }
}

#[cfg(windows)]
pub fn snapshot() -> DiskSnapshot {
    DiskSnapshot {
        partitions: partitions(),
        physical: physical_disks(),
    }
}

#[cfg(not(windows))]
pub fn snapshot() -> DiskSnapshot {
    DiskSnapshot::default()
}

#[cfg(windows)]
fn partitions() -> Vec<Partition> {
    use super::util::{from_wide, wide};
    use windows::core::PCWSTR;
    use windows::Win32::Storage::FileSystem::{
        GetDiskFreeSpaceExW, GetDriveTypeW, GetLogicalDrives, GetVolumeInformationW, DRIVE_FIXED,
    };

    let mask = unsafe { GetLogicalDrives() };
    let mut partitions = Vec::new();

    for letter in b'A'..=b'Z' {
        if mask & (1 << (letter - b'A')) == 0 {
            continue;
        }
        let root = format!("{}:\\", letter as char);
        let root_wide = wide(&root);
        let root_ptr = PCWSTR::from_raw(root_wide.as_ptr());

        if unsafe { GetDriveTypeW(root_ptr) } != DRIVE_FIXED {
            continue;
        }

        let mut total = 0u64;
        let mut total_free = 0u64;
        if unsafe { GetDiskFreeSpaceExW(root_ptr, None, Some(&mut total), Some(&mut total_free)) }
            .is_err()
        {
            continue;
        }

        let mut fs_name = [0u16; 32];
        let filesystem = unsafe {
            GetVolumeInformationW(root_ptr, None, None, None, None, Some(&mut fs_name[..]))
        }
        .ok()
        .map(|_| from_wide(&fs_name))
        .filter(|name| !name.is_empty());

        let used = total - total_free;
        partitions.push(Partition {
            mount: root,
            filesystem,
            size: total,
            free: total_free,
            used,
            used_percent: if total > 0 {
                used as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        });
    }

    partitions
}

#[cfg(windows)]
fn physical_disks() -> Vec<PhysicalDisk> {
    use super::util::wide;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::Storage::FileSystem::{
        CreateFileW, FILE_FLAGS_AND_ATTRIBUTES, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
    };
    use windows::Win32::System::Ioctl::{
        PropertyStandardQuery, StorageDeviceProperty, BusTypeNvme, BusTypeSata,
        DISK_GEOMETRY_EX, IOCTL_DISK_GET_DRIVE_GEOMETRY_EX, IOCTL_STORAGE_QUERY_PROPERTY,
        STORAGE_DEVICE_DESCRIPTOR, STORAGE_PROPERTY_QUERY,
    };
    use windows::Win32::System::IO::DeviceIoControl;

    // A null-terminated ANSI field inside the descriptor buffer.
    fn descriptor_text(buffer: &[u8], offset: u32) -> Option<String> {
        let start = offset as usize;
        if start == 0 || start >= buffer.len() {
            return None;
        }
        let tail = &buffer[start..];
        let end = tail.iter().position(|&b| b == 0)?;
        let text = String::from_utf8_lossy(&tail[..end]).trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    let mut disks = Vec::new();

    for index in 0..16 {
        let path = wide(&format!(r"\\.\PhysicalDrive{index}"));
        let Ok(handle) = (unsafe {
            CreateFileW(
                PCWSTR::from_raw(path.as_ptr()),
                0,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                None,
                OPEN_EXISTING,
                FILE_FLAGS_AND_ATTRIBUTES(0),
                None,
            )
        }) else {
            continue;
        };

        let query = STORAGE_PROPERTY_QUERY {
            PropertyId: StorageDeviceProperty,
            QueryType: PropertyStandardQuery,
            ..Default::default()
        };
        let mut buffer = [0u8; 1024];
        let mut returned = 0u32;
        let described = unsafe {
            DeviceIoControl(
                handle,
                IOCTL_STORAGE_QUERY_PROPERTY,
                Some(&query as *const _ as *const std::ffi::c_void),
                std::mem::size_of::<STORAGE_PROPERTY_QUERY>() as u32,
                Some(buffer.as_mut_ptr() as *mut std::ffi::c_void),
                buffer.len() as u32,
                Some(&mut returned),
                None,
            )
        }
        .is_ok();

        if described {
            let descriptor = unsafe { &*(buffer.as_ptr() as *const STORAGE_DEVICE_DESCRIPTOR) };
            let bus = if descriptor.BusType == BusTypeSata {
                "SATA"
            } else if descriptor.BusType == BusTypeNvme {
                "NVMe"
            } else {
                "Unknown"
            };

            let mut geometry = DISK_GEOMETRY_EX::default();
            let size = unsafe {
                DeviceIoControl(
                    handle,
                    IOCTL_DISK_GET_DRIVE_GEOMETRY_EX,
                    None,
                    0,
                    Some(&mut geometry as *mut _ as *mut std::ffi::c_void),
                    std::mem::size_of::<DISK_GEOMETRY_EX>() as u32,
                    Some(&mut returned),
                    None,
                )
            }
            .is_ok()
            .then(|| geometry.DiskSize as u64);

            disks.push(PhysicalDisk {
                model: descriptor_text(&buffer, descriptor.ProductIdOffset),
                vendor: descriptor_text(&buffer, descriptor.VendorIdOffset),
                bus: bus.to_string(),
                size,
            });
        }

        unsafe {
            let _ = CloseHandle(handle);
        }
    }

    disks
}
