//! Shared Win32 helpers: wide strings and registry reads

use windows::core::PCWSTR;
use windows::Win32::Foundation::FILETIME;
use windows::Win32::System::Registry::{
    RegCloseKey, RegOpenKeyExW, RegQueryValueExW, HKEY, HKEY_LOCAL_MACHINE, KEY_READ,
};

/// NUL-terminated UTF-16 for passing to Win32.
pub fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// UTF-16 buffer to String, stopping at the first NUL.
pub fn from_wide(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

/// FILETIME to a single 100-nanosecond tick count.
pub fn filetime_ticks(ft: FILETIME) -> u64 {
    ((ft.dwHighDateTime as u64) << 32) | ft.dwLowDateTime as u64
}

fn open_key(subkey: &str) -> Option<HKEY> {
    let path = wide(subkey);
    let mut hkey = HKEY::default();
    let status = unsafe {
        RegOpenKeyExW(
            HKEY_LOCAL_MACHINE,
            PCWSTR::from_raw(path.as_ptr()),
            0,
            KEY_READ,
            &mut hkey,
        )
    };
    if status.is_ok() {
        Some(hkey)
    } else {
        None
    }
}

fn query_value(hkey: HKEY, value: &str, data: *mut u8, size: &mut u32) -> bool {
    let name = wide(value);
    unsafe {
        RegQueryValueExW(
            hkey,
            PCWSTR::from_raw(name.as_ptr()),
            None,
            None,
            Some(data),
            Some(size),
        )
        .is_ok()
    }
}

/// Read a REG_SZ value under HKLM; trimmed, `None` when missing or empty.
pub fn reg_string(subkey: &str, value: &str) -> Option<String> {
    let hkey = open_key(subkey)?;
    let mut buf = [0u16; 256];
    let mut size = (buf.len() * 2) as u32;
    let found = query_value(hkey, value, buf.as_mut_ptr() as *mut u8, &mut size);
    unsafe {
        let _ = RegCloseKey(hkey);
    }
    if !found {
        return None;
    }
    let text = from_wide(&buf).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Read a REG_DWORD value under HKLM.
pub fn reg_u32(subkey: &str, value: &str) -> Option<u32> {
    let hkey = open_key(subkey)?;
    let mut data = 0u32;
    let mut size = std::mem::size_of::<u32>() as u32;
    let found = query_value(hkey, value, &mut data as *mut u32 as *mut u8, &mut size);
    unsafe {
        let _ = RegCloseKey(hkey);
    }
    if found {
        Some(data)
    } else {
        None
    }
}

/// Read a REG_QWORD value under HKLM.
pub fn reg_u64(subkey: &str, value: &str) -> Option<u64> {
    let hkey = open_key(subkey)?;
    let mut data = 0u64;
    let mut size = std::mem::size_of::<u64>() as u32;
    let found = query_value(hkey, value, &mut data as *mut u64 as *mut u8, &mut size);
    unsafe {
        let _ = RegCloseKey(hkey);
    }
    if found {
        Some(data)
    } else {
        None
    }
}
