//! Host identity, uptime and system-wide object counts

use serde::{Deserialize, Serialize};

use crate::core::counter::CounterSource;
#[cfg(windows)]
use super::perf::PdhQuery;

/// Static machine identity; immutable for the process lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemIdentity {
    pub hostname: String,
    pub platform: String,
    pub build: u32,
    pub arch: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
}

/// System-wide object counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemStats {
    pub processes: u32,
    pub threads: u32,
    pub handles: u32,
}

/// System handle count source. Task Manager reads the process-total
/// counter; the bare system counter is the fallback on older builds.
pub struct HandleCountCounter {
    #[cfg(windows)]
    query: Option<PdhQuery>,
}

impl HandleCountCounter {
    pub fn new() -> Self {
        Self {
            #[cfg(windows)]
            query: None,
        }
    }
}

impl Default for HandleCountCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(windows)]
impl CounterSource for HandleCountCounter {
    type Value = u32;

    fn prime(&mut self) -> bool {
        if self.query.is_none() {
            let Some(mut query) = PdhQuery::open() else {
                return false;
            };
            if query.add_counter(r"\Process(_Total)\Handle Count").is_none()
                && query.add_counter(r"\System\Handle Count").is_none()
            {
                return false;
            }
            self.query = Some(query);
        }
        self.query.as_ref().map(PdhQuery::collect).unwrap_or(false)
    }

    fn collect(&mut self) -> Option<u32> {
        let query = self.query.as_ref()?;
        if !query.collect() {
            return None;
        }
        query.value_long(0).map(|count| count.max(0) as u32)
    }
}

#[cfg(not(windows))]
impl CounterSource for HandleCountCounter {
    type Value = u32;

    fn prime(&mut self) -> bool {
        false
    }

    fn collect(&mut self) -> Option<u32> {
        None
    }
}

#[cfg(windows)]
pub fn identity() -> SystemIdentity {
    use super::util::{from_wide, reg_string};
    use windows::core::{s, w, PWSTR};
    use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
    use windows::Win32::System::SystemInformation::{
        ComputerNameDnsHostname, GetComputerNameExW, GetNativeSystemInfo,
        OSVERSIONINFOW, PROCESSOR_ARCHITECTURE_AMD64, PROCESSOR_ARCHITECTURE_ARM64,
        SYSTEM_INFO,
    };

    const BIOS_KEY: &str = r"HARDWARE\DESCRIPTION\System\BIOS";

    let mut hostname = String::new();
    let mut buffer = [0u16; 256];
    let mut size = buffer.len() as u32;
    if unsafe {
        GetComputerNameExW(
            ComputerNameDnsHostname,
            Some(PWSTR(buffer.as_mut_ptr())),
            &mut size,
        )
    }
    .is_ok()
    {
        hostname = from_wide(&buffer[..size as usize]);
    }

    // RtlGetVersion reports the real build; GetVersionExW lies to
    // unmanifested processes.
    let mut build = 0u32;
    type RtlGetVersionFn = unsafe extern "system" fn(*mut OSVERSIONINFOW) -> i32;
    unsafe {
        if let Ok(ntdll) = GetModuleHandleW(w!("ntdll.dll")) {
            if let Some(entry) = GetProcAddress(ntdll, s!("RtlGetVersion")) {
                let rtl_get_version: RtlGetVersionFn = std::mem::transmute(entry);
                let mut info = OSVERSIONINFOW {
                    dwOSVersionInfoSize: std::mem::size_of::<OSVERSIONINFOW>() as u32,
                    ..Default::default()
                };
                if rtl_get_version(&mut info) == 0 {
                    build = info.dwBuildNumber;
                }
            }
        }
    }

    let mut info = SYSTEM_INFO::default();
    unsafe { GetNativeSystemInfo(&mut info) };
    let architecture = unsafe { info.Anonymous.Anonymous.wProcessorArchitecture };
    let arch = if architecture == PROCESSOR_ARCHITECTURE_AMD64 {
        "x64"
    } else if architecture == PROCESSOR_ARCHITECTURE_ARM64 {
        "arm64"
    } else {
        "x86"
    };

    SystemIdentity {
        hostname,
        platform: if build >= 22000 {
            "Windows 11".to_string()
        } else {
            "Windows 10".to_string()
        },
        build,
        arch: arch.to_string(),
        manufacturer: reg_string(BIOS_KEY, "SystemManufacturer"),
        model: reg_string(BIOS_KEY, "SystemProductName"),
    }
}

#[cfg(not(windows))]
pub fn identity() -> SystemIdentity {
    SystemIdentity::default()
}

/// Seconds since boot.
#[cfg(windows)]
pub fn uptime_secs() -> u64 {
    use windows::Win32::System::SystemInformation::GetTickCount64;
    unsafe { GetTickCount64() / 1000 }
}

#[cfg(not(windows))]
pub fn uptime_secs() -> u64 {
    0
}

/// Count live processes and threads from one toolhelp snapshot.
#[cfg(windows)]
pub fn object_counts() -> (u32, u32) {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, Thread32First, Thread32Next,
        PROCESSENTRY32W, TH32CS_SNAPPROCESS, TH32CS_SNAPTHREAD, THREADENTRY32,
    };

    let Ok(snapshot) =
        (unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS | TH32CS_SNAPTHREAD, 0) })
    else {
        return (0, 0);
    };

    let mut processes = 0u32;
    let mut entry = PROCESSENTRY32W {
        dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };
    if unsafe { Process32FirstW(snapshot, &mut entry) }.is_ok() {
        loop {
            processes += 1;
            if unsafe { Process32NextW(snapshot, &mut entry) }.is_err() {
                break;
            }
        }
    }

    let mut threads = 0u32;
    let mut thread_entry = THREADENTRY32 {
        dwSize: std::mem::size_of::<THREADENTRY32>() as u32,
        ..Default::default()
    };
    if unsafe { Thread32First(snapshot, &mut thread_entry) }.is_ok() {
        loop {
            threads += 1;
            if unsafe { Thread32Next(snapshot, &mut thread_entry) }.is_err() {
                break;
            }
        }
    }

    unsafe {
        let _ = CloseHandle(snapshot);
    }
    (processes, threads)
}

#[cfg(not(windows))]
pub fn object_counts() -> (u32, u32) {
    (0, 0)
}
