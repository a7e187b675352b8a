//! Normalization of BMC member ids into the sensor names used in the data
//! files and the report.

/// The PSU tray a power endpoint belongs to, decided at discovery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tray {
    Gpu,
    Cpu,
}

/// The synthetic per-cycle sum recorded alongside the PSU readings.
pub const TOTAL_POWER_NAME: &str = "Total Power in W";

/// `power_PWR_PDB_PSU<n>` becomes `GPU_TRAY_PSU<n>`, `PWR_MB_PSU<n>`
/// becomes `CPU_TRAY_PSU<n>`.
pub fn power_sensor_name(member_id: &str, tray: Tray) -> String {
    match tray {
        Tray::Gpu => member_id.replace("power_PWR_PDB_PSU", "GPU_TRAY_PSU"),
        Tray::Cpu => member_id
            .replace("PWR_MB_PSU", "CPU_TRAY_PSU")
            .replace("power_", ""),
    }
}

/// Fan member ids carry an `SPD_` prefix and a rotor suffix:
/// `SPD_FAN1_F` becomes `FAN1 Front`, `SPD_FAN1_R` becomes `FAN1 Rear`.
pub fn fan_sensor_name(member_id: &str) -> String {
    let id = member_id.replace("SPD_", "");
    if let Some(base) = id.strip_suffix("_F") {
        format!("{base} Front")
    } else if let Some(base) = id.strip_suffix("_R") {
        format!("{base} Rear")
    } else {
        id
    }
}

/// PSU temperature sensors are renamed to match their tray; every other
/// member id is kept as-is.
pub fn temp_sensor_name(member_id: &str) -> String {
    if member_id.contains("TEMP_PDB_PSU") {
        member_id.replace("TEMP_PDB_PSU", "TEMP_GPU_TRAY_PSU")
    } else if member_id.contains("TEMP_MB_PSU") {
        member_id.replace("TEMP_MB_PSU", "TEMP_CPU_TRAY_PSU")
    } else {
        member_id.to_string()
    }
}
