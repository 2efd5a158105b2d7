use std::fs;
use std::path::PathBuf;

pub static POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";

pub trait BatteryProvider {
    /// One-shot charge level as a fraction in [0, 1]. None means the
    /// platform has no readable battery.
    fn battery_level(&self) -> Option<f64>;
}

/// Reads the first `Battery`-type entry under the Linux power-supply sysfs
/// tree. Desktops and containers typically have none, which is the
/// unsupported case rather than an error.
pub struct SysfsBatteryProvider {
    root: PathBuf,
}

impl SysfsBatteryProvider {
    pub fn new() -> SysfsBatteryProvider {
        SysfsBatteryProvider {
            root: PathBuf::from(POWER_SUPPLY_ROOT),
        }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> SysfsBatteryProvider {
        SysfsBatteryProvider { root: root.into() }
    }
}

impl BatteryProvider for SysfsBatteryProvider {
    fn battery_level(&self) -> Option<f64> {
        let entries = fs::read_dir(&self.root).ok()?;

        for entry in entries.flatten() {
            let path = entry.path();

            let supply_type = fs::read_to_string(path.join("type")).unwrap_or_default();
            if supply_type.trim() != "Battery" {
                continue;
            }

            if let Ok(capacity) = fs::read_to_string(path.join("capacity")) {
                if let Ok(percent) = capacity.trim().parse::<f64>() {
                    return Some(percent / 100.0);
                }
            }
        }

        None
    }
}
