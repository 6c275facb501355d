//! Battery status

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatteryStatus {
    pub present: bool,
    /// Charge percent; `None` when unknown or no battery is fitted.
    pub percent: Option<u8>,
    pub charging: bool,
}

#[cfg(windows)]
pub fn status() -> BatteryStatus {
    use windows::Win32::System::Power::{GetSystemPowerStatus, SYSTEM_POWER_STATUS};

    let mut power = SYSTEM_POWER_STATUS::default();
    if unsafe { GetSystemPowerStatus(&mut power) }.is_err() {
        return BatteryStatus::default();
    }

    // 128 = no system battery, 255 = unknown.
    let present = power.BatteryFlag != 128 && power.BatteryFlag != 255;
    BatteryStatus {
        present,
        percent: (present && power.BatteryLifePercent <= 100)
            .then_some(power.BatteryLifePercent),
        charging: power.ACLineStatus == 1,
    }
}

#[cfg(not(windows))]
pub fn status() -> BatteryStatus {
    BatteryStatus::default()
}
