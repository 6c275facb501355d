//! GPU adapters and displays

use serde::{Deserialize, Serialize};

/// One display adapter, as recorded by the driver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GpuAdapter {
    pub model: String,
    pub vendor: String,
    pub vram_bytes: Option<u64>,
    pub bus: String,
}

/// One active display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub model: String,
    pub width: u32,
    pub height: u32,
    pub refresh_hz: u32,
    pub bits_per_pixel: u32,
    pub primary: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GpuSnapshot {
    pub adapters: Vec<GpuAdapter>,
    pub displays: Vec<DisplayInfo>,
}

fn vendor_of(model: &str) -> &'static str {
    if model.contains("NVIDIA") {
        "NVIDIA"
    } else if model.contains("AMD") {
        "AMD"
    } else if model.contains("Intel") {
        "Intel"
    } else {
        "Unknown"
    }
}

#[cfg(windows)]
pub fn snapshot() -> GpuSnapshot {
    GpuSnapshot {
        adapters: adapters(),
        displays: displays(),
    }
}

#[cfg(not(windows))]
pub fn snapshot() -> GpuSnapshot {
    GpuSnapshot::default()
}

/// Walk the display class key; the driver records the adapter description
/// and dedicated VRAM there, with no device handle needed.
#[cfg(windows)]
fn adapters() -> Vec<GpuAdapter> {
    use super::util::{reg_string, reg_u32, reg_u64};

    const DISPLAY_CLASS: &str =
        r"SYSTEM\CurrentControlSet\Control\Class\{4d36e968-e325-11ce-bfc1-08002be10318}";

    let mut adapters = Vec::new();
    for index in 0..10 {
        let subkey = format!(r"{DISPLAY_CLASS}\{index:04}");
        let Some(model) = reg_string(&subkey, "DriverDesc") else {
            continue;
        };
        // Newer drivers store a QWORD; fall back to the 32-bit value.
        let vram_bytes = reg_u64(&subkey, "HardwareInformation.qwMemorySize")
            .or_else(|| reg_u32(&subkey, "HardwareInformation.MemorySize").map(u64::from));
        adapters.push(GpuAdapter {
            vendor: vendor_of(&model).to_string(),
            model,
            vram_bytes,
            bus: "PCI".to_string(),
        });
    }
    adapters
}

#[cfg(windows)]
fn displays() -> Vec<DisplayInfo> {
    use super::util::from_wide;
    use windows::core::PCWSTR;
    use windows::Win32::Graphics::Gdi::{
        EnumDisplayDevicesW, EnumDisplaySettingsW, DEVMODEW, DISPLAY_DEVICEW,
        ENUM_CURRENT_SETTINGS,
    };

    // DISPLAY_DEVICE state flag bits.
    const ACTIVE: u32 = 0x1;
    const PRIMARY: u32 = 0x4;

    let mut displays = Vec::new();
    let mut index = 0u32;

    loop {
        let mut device = DISPLAY_DEVICEW {
            cb: std::mem::size_of::<DISPLAY_DEVICEW>() as u32,
            ..Default::default()
        };
        if !unsafe { EnumDisplayDevicesW(PCWSTR::null(), index, &mut device, 0) }.as_bool() {
            break;
        }
        index += 1;

        if device.StateFlags & ACTIVE == 0 {
            continue;
        }

        let device_name = PCWSTR::from_raw(device.DeviceName.as_ptr());
        let mut mode = DEVMODEW {
            dmSize: std::mem::size_of::<DEVMODEW>() as u16,
            ..Default::default()
        };
        if !unsafe { EnumDisplaySettingsW(device_name, ENUM_CURRENT_SETTINGS, &mut mode) }
            .as_bool()
        {
            continue;
        }

        // The attached monitor carries the human-readable name.
        let mut monitor = DISPLAY_DEVICEW {
            cb: std::mem::size_of::<DISPLAY_DEVICEW>() as u32,
            ..Default::default()
        };
        let model = if unsafe { EnumDisplayDevicesW(device_name, 0, &mut monitor, 0) }.as_bool() {
            from_wide(&monitor.DeviceString)
        } else {
            "Monitor".to_string()
        };

        displays.push(DisplayInfo {
            model,
            width: mode.dmPelsWidth,
            height: mode.dmPelsHeight,
            refresh_hz: mode.dmDisplayFrequency,
            bits_per_pixel: mode.dmBitsPerPel,
            primary: device.StateFlags & PRIMARY != 0,
        });
    }

    displays
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_heuristic_matches_known_brands() {
        assert_eq!(vendor_of("NVIDIA GeForce RTX 4070"), "NVIDIA");
        assert_eq!(vendor_of("AMD Radeon RX 7800 XT"), "AMD");
        assert_eq!(vendor_of("Intel(R) UHD Graphics 770"), "Intel");
        assert_eq!(vendor_of("Matrox G200"), "Unknown");
    }
}
