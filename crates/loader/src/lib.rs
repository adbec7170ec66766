// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tdmi_config::SeedPolicies;
use tdmi_core::memory::ProgramImage;
use tracing::{debug, info};

/// Start of the system ROM region; execution begins here after reset.
pub const BIOS_BASE: u32 = 0x0000_0000;
/// Start of the cartridge ROM window.
pub const CART_BASE: u32 = 0x0800_0000;

/// Reads a raw image file. Empty files are rejected.
pub fn read_image(path: &Path) -> Result<Vec<u8>> {
    let data = fs::read(path).with_context(|| format!("Failed to read image file: {:?}", path))?;
    if data.is_empty() {
        bail!("Image file {:?} is empty", path);
    }
    debug!("Read {} bytes from {:?}", data.len(), path);
    Ok(data)
}

/// Builds the seed image for a BIOS and an optional cartridge.
///
/// Length checks happen when the image is seeded into the bus, under the
/// policy recorded on each segment.
pub fn build_image(bios: Vec<u8>, cartridge: Option<Vec<u8>>, seed: &SeedPolicies) -> ProgramImage {
    let mut image = ProgramImage::new(BIOS_BASE);

    info!("BIOS image: {} bytes at {:#x}", bios.len(), BIOS_BASE);
    image.add_segment(BIOS_BASE, bios, seed.bios.into());

    if let Some(rom) = cartridge {
        info!("Cartridge image: {} bytes at {:#x}", rom.len(), CART_BASE);
        image.add_segment(CART_BASE, rom, seed.cartridge.into());
    }

    image
}

pub fn load_images(bios: &Path, cartridge: Option<&Path>, seed: &SeedPolicies) -> Result<ProgramImage> {
    let bios = read_image(bios).context("Failed to load BIOS")?;
    let cartridge = cartridge
        .map(|p| read_image(p).context("Failed to load cartridge"))
        .transpose()?;
    Ok(build_image(bios, cartridge, seed))
}
