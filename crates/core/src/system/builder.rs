// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::SystemBus;
use crate::cpu::Arm7Tdmi;
use crate::{Machine, SimulationConfig};
use tdmi_config::MachineManifest;
use tracing::info;

/// Builds a SystemBus from a machine manifest.
/// Without a manifest, or when it declares no memory map, the GBA map is used.
pub fn build_system_bus(manifest: Option<&MachineManifest>) -> anyhow::Result<SystemBus> {
    let bus = match manifest.and_then(|m| m.memory_map.as_deref()) {
        Some(map) => {
            info!("Using declared memory map ({} regions)", map.len());
            SystemBus::from_config(map)?
        }
        None => {
            info!("Using default GBA memory map");
            SystemBus::gba()
        }
    };

    Ok(bus)
}

/// Builds an ARM7TDMI machine in reset state. Images are not loaded here.
pub fn build_machine(manifest: Option<&MachineManifest>) -> anyhow::Result<Machine<Arm7Tdmi>> {
    let bus = build_system_bus(manifest)?;
    let config = manifest
        .map(|m| SimulationConfig::from(&m.simulation))
        .unwrap_or_default();
    if let Some(m) = manifest {
        info!("Machine '{}', unimplemented policy {:?}", m.name, config.unimplemented);
    }
    Ok(Machine::new(Arm7Tdmi::new(), bus).with_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UnimplementedPolicy;

    #[test]
    fn test_default_bus_is_gba_map() {
        let bus = build_system_bus(None).unwrap();
        assert_eq!(bus.regions.len(), 9);
        assert!(bus.region("vram").is_some());
    }

    #[test]
    fn test_declared_map_and_policy() {
        let yaml = r#"
name: "tiny"
memory_map:
  - name: rom
    base: 0x0
    size: "16 KiB"
    port_width: 32
    init: seeded
  - name: ram
    base: 0x03000000
    size: "0x8000"
    port_width: 32
simulation:
  unimplemented: skip
"#;
        let manifest = MachineManifest::from_yaml(yaml).unwrap();
        let machine = build_machine(Some(&manifest)).unwrap();
        assert_eq!(machine.bus.regions.len(), 2);
        assert_eq!(machine.bus.region("ram").map(|r| r.end), Some(0x0300_7FFF));
        assert_eq!(machine.config.unimplemented, UnimplementedPolicy::Skip);
    }
}
