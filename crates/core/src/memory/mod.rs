// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{SimResult, SimulationError};
use serde::{Deserialize, Serialize};

/// Natural access granularity of a region, in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortWidth {
    #[serde(rename = "8")]
    Bits8,
    #[serde(rename = "16")]
    Bits16,
    #[serde(rename = "32")]
    Bits32,
}

impl PortWidth {
    pub fn bytes(self) -> usize {
        match self {
            PortWidth::Bits8 => 1,
            PortWidth::Bits16 => 2,
            PortWidth::Bits32 => 4,
        }
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            8 => Some(PortWidth::Bits8),
            16 => Some(PortWidth::Bits16),
            32 => Some(PortWidth::Bits32),
            _ => None,
        }
    }
}

/// How a region's backing store is populated at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionInit {
    #[default]
    Zero,
    /// Zero-backed until an external image replaces the contents.
    Seeded,
}

/// What to do when a seed image is shorter than its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedPolicy {
    /// Image length must equal the region length.
    #[default]
    Exact,
    /// Short images are zero-filled up to the region length.
    Pad,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub start_addr: u32,
    pub data: Vec<u8>,
    #[serde(default)]
    pub policy: SeedPolicy,
}

/// Byte images destined for seeded regions (BIOS, cartridge).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramImage {
    pub entry_point: u32,
    pub segments: Vec<Segment>,
}

impl ProgramImage {
    pub fn new(entry_point: u32) -> Self {
        Self {
            entry_point,
            segments: Vec::new(),
        }
    }

    pub fn add_segment(&mut self, start_addr: u32, data: Vec<u8>, policy: SeedPolicy) {
        self.segments.push(Segment {
            start_addr,
            data,
            policy,
        });
    }
}

/// A contiguous address range `[start, end]` backed by a flat byte store.
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    pub name: String,
    pub start: u32,
    pub end: u32,
    pub port: PortWidth,
    pub init: RegionInit,
    pub data: Vec<u8>,
}

impl MemoryRegion {
    pub fn new(name: &str, start: u32, end: u32, port: PortWidth, init: RegionInit) -> Self {
        let len = (end - start) as usize + 1;
        Self {
            name: name.to_string(),
            start,
            end,
            port,
            init,
            data: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr <= self.end
    }

    pub fn overlaps(&self, start: u32, end: u32) -> bool {
        start <= self.end && end >= self.start
    }

    /// Offset of `[addr, addr + len)` into the backing store, if the whole span fits.
    fn span(&self, addr: u32, len: usize) -> Option<usize> {
        if !self.contains(addr) || len == 0 {
            return None;
        }
        let offset = (addr - self.start) as usize;
        if offset + len > self.data.len() {
            return None;
        }
        Some(offset)
    }

    /// Little-endian read of `len` (1..=4) bytes.
    pub fn read(&self, addr: u32, len: usize) -> Option<u32> {
        let offset = self.span(addr, len)?;
        let value = self.data[offset..offset + len]
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32);
        Some(value)
    }

    /// Stores the low `len * 8` bits of `value`, least-significant byte first.
    pub fn write(&mut self, addr: u32, value: u32, len: usize) -> bool {
        let Some(offset) = self.span(addr, len) else {
            return false;
        };
        for (i, byte) in self.data[offset..offset + len].iter_mut().enumerate() {
            *byte = (value >> (8 * i)) as u8;
        }
        true
    }

    /// Replaces the backing store wholesale. Never truncates.
    pub fn seed(&mut self, image: &[u8], policy: SeedPolicy) -> SimResult<()> {
        let expected = self.data.len();
        let actual = image.len();
        let fits = match policy {
            SeedPolicy::Exact => actual == expected,
            SeedPolicy::Pad => actual <= expected,
        };
        if !fits {
            return Err(SimulationError::SeedLengthMismatch {
                region: self.name.clone(),
                expected,
                actual,
            });
        }

        self.data[..actual].copy_from_slice(image);
        if actual < expected {
            self.data[actual..].fill(0);
            tracing::info!(
                "Seeded {} with {} bytes, zero-padded {} bytes",
                self.name,
                actual,
                expected - actual
            );
        } else {
            tracing::info!("Seeded {} with {} bytes", self.name, actual);
        }
        Ok(())
    }
}
