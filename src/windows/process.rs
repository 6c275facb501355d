//! Process enumeration with cumulative CPU times

/// One enumerated process, counters included.
///
/// `ticks` is `None` when the process could not be opened (access denied,
/// exited mid-walk); such processes still appear in the list but are left
/// out of the CPU rate sample so a later successful read is not measured
/// against a bogus zero.
#[derive(Debug, Clone, Default)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub threads: u32,
    pub memory_bytes: u64,
    pub handles: u32,
    /// Cumulative (kernel, user) CPU time in 100-nanosecond ticks.
    pub ticks: Option<(u64, u64)>,
}

#[cfg(windows)]
pub fn enumerate() -> Vec<ProcessSample> {
    use super::util::{filetime_ticks, from_wide};
    use windows::Win32::Foundation::{CloseHandle, FILETIME};
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
        TH32CS_SNAPPROCESS,
    };
    use windows::Win32::System::ProcessStatus::{GetProcessMemoryInfo, PROCESS_MEMORY_COUNTERS};
    use windows::Win32::System::Threading::{
        GetProcessHandleCount, GetProcessTimes, OpenProcess, PROCESS_QUERY_INFORMATION,
        PROCESS_VM_READ,
    };

    let Ok(snapshot) = (unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }) else {
        return Vec::new();
    };

    let mut list = Vec::new();
    let mut entry = PROCESSENTRY32W {
        dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };

    if unsafe { Process32FirstW(snapshot, &mut entry) }.is_ok() {
        loop {
            if entry.th32ProcessID != 0 {
                let mut sample = ProcessSample {
                    pid: entry.th32ProcessID,
                    name: from_wide(&entry.szExeFile),
                    threads: entry.cntThreads,
                    ..Default::default()
                };

                if let Ok(handle) = unsafe {
                    OpenProcess(
                        PROCESS_QUERY_INFORMATION | PROCESS_VM_READ,
                        false,
                        entry.th32ProcessID,
                    )
                } {
                    let cb = std::mem::size_of::<PROCESS_MEMORY_COUNTERS>() as u32;
                    let mut counters = PROCESS_MEMORY_COUNTERS {
                        cb,
                        ..Default::default()
                    };
                    if unsafe { GetProcessMemoryInfo(handle, &mut counters, cb) }.is_ok() {
                        sample.memory_bytes = counters.WorkingSetSize as u64;
                    }

                    let mut handle_count = 0u32;
                    if unsafe { GetProcessHandleCount(handle, &mut handle_count) }.is_ok() {
                        sample.handles = handle_count;
                    }

                    let mut create = FILETIME::default();
                    let mut exit = FILETIME::default();
                    let mut kernel = FILETIME::default();
                    let mut user = FILETIME::default();
                    if unsafe {
                        GetProcessTimes(handle, &mut create, &mut exit, &mut kernel, &mut user)
                    }
                    .is_ok()
                    {
                        sample.ticks = Some((filetime_ticks(kernel), filetime_ticks(user)));
                    }

                    unsafe {
                        let _ = CloseHandle(handle);
                    }
                }

                list.push(sample);
            }

            if unsafe { Process32NextW(snapshot, &mut entry) }.is_err() {
                break;
            }
        }
    }

    unsafe {
        let _ = CloseHandle(snapshot);
    }
    list
}

#[cfg(not(windows))]
pub fn enumerate() -> Vec<ProcessSample> {
    Vec::new()
}
