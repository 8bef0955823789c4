// ============================================================
// Layer 6 — Device Selection
// ============================================================
// Parses the `--device` flag into a WGPU device.
//
//   auto            → best adapter WGPU can find (GPU if present)
//   cpu             → WGPU software / CPU adapter
//   gpu:N           → N-th discrete GPU   (also: discrete:N, cuda:N)
//   integrated:N    → N-th integrated GPU
//
// A bare `gpu` means `gpu:0`.

use burn::backend::wgpu::WgpuDevice;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Serialised as its flag spelling, e.g. `"gpu:0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeviceChoice {
    #[default]
    Auto,
    Cpu,
    Discrete(usize),
    Integrated(usize),
}

impl DeviceChoice {
    pub fn wgpu_device(self) -> WgpuDevice {
        match self {
            DeviceChoice::Auto          => WgpuDevice::default(),
            DeviceChoice::Cpu           => WgpuDevice::Cpu,
            DeviceChoice::Discrete(n)   => WgpuDevice::DiscreteGpu(n),
            DeviceChoice::Integrated(n) => WgpuDevice::IntegratedGpu(n),
        }
    }
}

impl FromStr for DeviceChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (kind, index) = match s.split_once(':') {
            Some((kind, idx)) => {
                let n = idx
                    .parse::<usize>()
                    .map_err(|_| format!("invalid device index '{idx}'"))?;
                (kind.to_string(), n)
            }
            None => (s.clone(), 0),
        };

        match kind.as_str() {
            "auto" if !s.contains(':') => Ok(DeviceChoice::Auto),
            "cpu" if !s.contains(':')  => Ok(DeviceChoice::Cpu),
            "gpu" | "discrete" | "cuda" => Ok(DeviceChoice::Discrete(index)),
            "integrated"                => Ok(DeviceChoice::Integrated(index)),
            _ => Err(format!(
                "unknown device '{s}' (expected auto, cpu, gpu:N or integrated:N)"
            )),
        }
    }
}

impl fmt::Display for DeviceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceChoice::Auto          => write!(f, "auto"),
            DeviceChoice::Cpu           => write!(f, "cpu"),
            DeviceChoice::Discrete(n)   => write!(f, "gpu:{n}"),
            DeviceChoice::Integrated(n) => write!(f, "integrated:{n}"),
        }
    }
}

impl TryFrom<String> for DeviceChoice {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DeviceChoice> for String {
    fn from(d: DeviceChoice) -> Self {
        d.to_string()
    }
}
