//! Device manifests.

use serde::{Deserialize, Serialize};

/// Static properties of a target device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceManifest {
    /// Device name as used in configurations.
    pub name: String,
    /// Clock frequency of the generated hardware in Hz.
    pub clock_frequency_hz: u64,
    /// Width of the SimpleMemory data bus in bytes.
    pub data_bus_width_bytes: u32,
    /// Host platforms the device can be driven from.
    pub supported_platforms: Vec<String>,
}

impl DeviceManifest {
    /// Clock period in nanoseconds.
    pub fn clock_period_ns(&self) -> f64 {
        1e9 / self.clock_frequency_hz as f64
    }

    /// Width of the SimpleMemory data bus in bits.
    pub fn data_bus_width_bits(&self) -> u32 {
        self.data_bus_width_bytes * 8
    }
}

/// Manifests of the devices known out of the box.
pub fn builtin_manifests() -> Vec<DeviceManifest> {
    vec![
        DeviceManifest {
            name: "Nexys A7".to_owned(),
            clock_frequency_hz: 100_000_000,
            data_bus_width_bytes: 4,
            supported_platforms: vec!["Serial".to_owned()],
        },
        DeviceManifest {
            name: "Alveo U250".to_owned(),
            clock_frequency_hz: 300_000_000,
            data_bus_width_bytes: 4,
            supported_platforms: vec!["Xrt".to_owned()],
        },
        DeviceManifest {
            name: "Zynq 7000".to_owned(),
            clock_frequency_hz: 150_000_000,
            data_bus_width_bytes: 4,
            supported_platforms: vec!["Zynq".to_owned()],
        },
    ]
}

/// Looks up a built-in manifest by name, ignoring ASCII case.
pub fn builtin_manifest(name: &str) -> Option<DeviceManifest> {
    builtin_manifests()
        .into_iter()
        .find(|manifest| manifest.name.eq_ignore_ascii_case(name))
}
