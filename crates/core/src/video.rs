// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Typed views over the I/O and video regions for a display collaborator.
//!
//! Nothing here is consulted by the core while it executes; these types only
//! give names to bytes that the program writes through the bus.

use bitflags::bitflags;

use crate::{Bus, SimResult, SimulationError};

/// Display control register, the first halfword of the I/O region.
pub const DISPCNT_ADDR: u32 = 0x0400_0000;
pub const VRAM_BASE: u32 = 0x0600_0000;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DisplayControl: u16 {
        const MODE = 0b111;
        /// Game Boy colour BIOS mode.
        const GB = 1 << 3;
        /// Page select for the bitmap modes.
        const PAGE = 1 << 4;
        /// OAM accessible during HBlank.
        const OAM_HBL = 1 << 5;
        /// One-dimensional OBJ tile mapping.
        const OBJ_1D = 1 << 6;
        const BLANK = 1 << 7;
        const BG0 = 1 << 8;
        const BG1 = 1 << 9;
        const BG2 = 1 << 10;
        const BG3 = 1 << 11;
        const OBJ = 1 << 12;
        const WIN0 = 1 << 13;
        const WIN1 = 1 << 14;
        const WINOBJ = 1 << 15;

        const LAYER = 0x1F00;
        const WIN = 0xE000;
    }
}

impl DisplayControl {
    /// Highest video mode the hardware defines.
    pub const MAX_MODE: u8 = 5;

    pub fn read(bus: &dyn Bus) -> SimResult<Self> {
        Ok(Self::from_bits_retain(bus.read_u16(DISPCNT_ADDR)?))
    }

    pub fn write(self, bus: &mut dyn Bus) -> SimResult<()> {
        bus.write_u16(DISPCNT_ADDR, self.bits())
    }

    pub fn mode(self) -> u8 {
        (self.bits() & Self::MODE.bits()) as u8
    }

    /// Replaces the mode field. Modes above 5 do not exist.
    pub fn with_mode(self, mode: u8) -> Option<Self> {
        if mode > Self::MAX_MODE {
            return None;
        }
        let bits = (self.bits() & !Self::MODE.bits()) | mode as u16;
        Some(Self::from_bits_retain(bits))
    }

    /// BG0-BG3 and OBJ enables, bit 0 = BG0.
    pub fn layers(self) -> u8 {
        ((self.bits() & Self::LAYER.bits()) >> 8) as u8
    }

    /// WIN0, WIN1 and OBJ window enables, bit 0 = WIN0.
    pub fn windows(self) -> u8 {
        ((self.bits() & Self::WIN.bits()) >> 13) as u8
    }
}

/// 15-bit BGR pixel: red in bits 0-4, green 5-9, blue 10-14.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb15(pub u16);

impl Rgb15 {
    /// Packs three 5-bit channels; higher bits are dropped.
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self((r as u16 & 0x1F) | ((g as u16 & 0x1F) << 5) | ((b as u16 & 0x1F) << 10))
    }

    pub fn channels(self) -> (u8, u8, u8) {
        (
            (self.0 & 0x1F) as u8,
            ((self.0 >> 5) & 0x1F) as u8,
            ((self.0 >> 10) & 0x1F) as u8,
        )
    }

    /// Expands each channel to 8 bits as `v * 255 / 31`.
    pub fn to_rgb888(self) -> [u8; 3] {
        let expand = |v: u8| (v as u32 * 255 / 31) as u8;
        let (r, g, b) = self.channels();
        [expand(r), expand(g), expand(b)]
    }
}

/// Mode 3 bitmap: one 15-bit pixel per 2 bytes of VRAM, row-major.
#[derive(Debug, Clone, Copy)]
pub struct Mode3Framebuffer {
    pub base: u32,
}

impl Default for Mode3Framebuffer {
    fn default() -> Self {
        Self { base: VRAM_BASE }
    }
}

impl Mode3Framebuffer {
    pub const WIDTH: u32 = 240;
    pub const HEIGHT: u32 = 160;
    pub const STRIDE: u32 = 2;

    fn address(&self, x: u32, y: u32) -> SimResult<u32> {
        let addr = self
            .base
            .wrapping_add((x + y * Self::WIDTH) * Self::STRIDE);
        if x >= Self::WIDTH || y >= Self::HEIGHT {
            return Err(SimulationError::MemoryViolation { addr, len: 2 });
        }
        Ok(addr)
    }

    pub fn pixel(&self, bus: &dyn Bus, x: u32, y: u32) -> SimResult<Rgb15> {
        Ok(Rgb15(bus.read_u16(self.address(x, y)?)?))
    }

    pub fn set_pixel(&self, bus: &mut dyn Bus, x: u32, y: u32, value: Rgb15) -> SimResult<()> {
        bus.write_u16(self.address(x, y)?, value.0)
    }

    /// Whole frame as 8-bit RGB triples, row-major.
    pub fn to_rgb888(&self, bus: &dyn Bus) -> SimResult<Vec<[u8; 3]>> {
        let mut frame = Vec::with_capacity((Self::WIDTH * Self::HEIGHT) as usize);
        for y in 0..Self::HEIGHT {
            for x in 0..Self::WIDTH {
                frame.push(self.pixel(bus, x, y)?.to_rgb888());
            }
        }
        Ok(frame)
    }
}
