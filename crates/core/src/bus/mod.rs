// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::memory::{MemoryRegion, PortWidth, RegionInit, SeedPolicy};
use crate::{SimResult, SimulationError};
use anyhow::Context;
use tdmi_config::{parse_size, InitKind, RegionDescriptor};

/// Fixed table of address-range-bound regions, searched first-match per access.
#[derive(Debug, Clone, Default)]
pub struct SystemBus {
    pub regions: Vec<MemoryRegion>,
}

impl SystemBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// The Game Boy Advance memory map.
    pub fn gba() -> Self {
        use PortWidth::*;
        use RegionInit::*;
        Self {
            regions: vec![
                MemoryRegion::new("sys_rom", 0x0000_0000, 0x0000_3FFF, Bits32, Seeded),
                MemoryRegion::new("ewram", 0x0200_0000, 0x0203_FFFF, Bits16, Zero),
                MemoryRegion::new("iwram", 0x0300_0000, 0x0300_7FFF, Bits32, Zero),
                MemoryRegion::new("io", 0x0400_0000, 0x0400_03FF, Bits16, Zero),
                MemoryRegion::new("palette", 0x0500_0000, 0x0500_03FF, Bits16, Zero),
                MemoryRegion::new("vram", 0x0600_0000, 0x0601_7FFF, Bits16, Zero),
                MemoryRegion::new("oam", 0x0700_0000, 0x0700_03FF, Bits32, Zero),
                MemoryRegion::new("cart_rom", 0x0800_0000, 0x09FF_FFFF, Bits16, Seeded),
                MemoryRegion::new("cart_ram", 0x0E00_0000, 0x0E00_FFFF, Bits8, Zero),
            ],
        }
    }

    pub fn from_config(map: &[RegionDescriptor]) -> anyhow::Result<Self> {
        let mut bus = Self::new();
        for desc in map {
            let size = parse_size(&desc.size)
                .with_context(|| format!("Invalid size for region '{}'", desc.name))?;
            if size == 0 || desc.base as u64 + size - 1 > u32::MAX as u64 {
                anyhow::bail!(
                    "Region '{}' does not fit the 32-bit address space ({:#x} + {:#x})",
                    desc.name,
                    desc.base,
                    size
                );
            }
            let port = PortWidth::from_bits(desc.port_width).ok_or_else(|| {
                anyhow::anyhow!(
                    "Region '{}' has unsupported port width {}",
                    desc.name,
                    desc.port_width
                )
            })?;
            let init = match desc.init {
                InitKind::Zero => RegionInit::Zero,
                InitKind::Seeded => RegionInit::Seeded,
            };
            let end = desc.base + (size - 1) as u32;
            bus.add_region(MemoryRegion::new(&desc.name, desc.base, end, port, init))?;
        }
        Ok(bus)
    }

    /// Registers a region. Regions never overlap.
    pub fn add_region(&mut self, region: MemoryRegion) -> SimResult<()> {
        if let Some(existing) = self
            .regions
            .iter()
            .find(|r| r.overlaps(region.start, region.end))
        {
            return Err(SimulationError::RegionOverlap {
                name: region.name.clone(),
                other: existing.name.clone(),
            });
        }
        self.regions.push(region);
        Ok(())
    }

    pub fn region(&self, name: &str) -> Option<&MemoryRegion> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn region_mut(&mut self, name: &str) -> Option<&mut MemoryRegion> {
        self.regions.iter_mut().find(|r| r.name == name)
    }

    pub fn region_at(&self, addr: u32) -> Option<&MemoryRegion> {
        self.regions.iter().find(|r| r.contains(addr))
    }

    /// Seeds the region that starts exactly at `start_addr`.
    pub fn seed(&mut self, start_addr: u32, data: &[u8], policy: SeedPolicy) -> SimResult<()> {
        let region = self
            .regions
            .iter_mut()
            .find(|r| r.start == start_addr)
            .ok_or(SimulationError::UnknownRegion(start_addr))?;
        if region.init != RegionInit::Seeded {
            tracing::warn!("Seeding zero-initialized region {}", region.name);
        }
        region.seed(data, policy)
    }
}

impl crate::Bus for SystemBus {
    fn lookup(&self, addr: u32, len: usize) -> SimResult<u32> {
        self.regions
            .iter()
            .find(|r| r.contains(addr))
            .and_then(|r| r.read(addr, len))
            .ok_or(SimulationError::MemoryViolation { addr, len })
    }

    fn write_bytes(&mut self, addr: u32, value: u32, len: usize) -> SimResult<()> {
        let written = self
            .regions
            .iter_mut()
            .find(|r| r.contains(addr))
            .is_some_and(|r| r.write(addr, value, len));
        if written {
            Ok(())
        } else {
            Err(SimulationError::MemoryViolation { addr, len })
        }
    }
}
