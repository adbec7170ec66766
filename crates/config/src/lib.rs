// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitKind {
    #[default]
    Zero,
    Seeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedMode {
    #[default]
    Exact,
    #[serde(alias = "zero_pad")]
    Pad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnimplementedMode {
    #[default]
    Fault,
    #[serde(alias = "nop")]
    Skip,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RegionDescriptor {
    pub name: String,
    pub base: u32,
    pub size: String, // e.g. "16 KiB" or "1024"
    pub port_width: u8,
    #[serde(default)]
    pub init: InitKind,
}

fn default_cartridge_seed() -> SeedMode {
    SeedMode::Pad
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SeedPolicies {
    #[serde(default)]
    pub bios: SeedMode,
    #[serde(default = "default_cartridge_seed")]
    pub cartridge: SeedMode,
}

impl Default for SeedPolicies {
    fn default() -> Self {
        Self {
            bios: SeedMode::Exact,
            cartridge: SeedMode::Pad,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SimulationSection {
    #[serde(default)]
    pub unimplemented: UnimplementedMode,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RunLimits {
    #[serde(default)]
    pub max_steps: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MachineManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    #[serde(default)]
    pub bios: Option<String>,
    #[serde(default)]
    pub cartridge: Option<String>,
    /// Replaces the built-in GBA map when present.
    #[serde(default)]
    pub memory_map: Option<Vec<RegionDescriptor>>,
    #[serde(default)]
    pub seed: SeedPolicies,
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default)]
    pub limits: RunLimits,
}

impl MachineManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read machine manifest at {:?}", path))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let manifest: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Machine Manifest")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}' (expected '1.0')",
                self.schema_version
            );
        }
        if let Some(map) = &self.memory_map {
            let mut seen = HashSet::new();
            for region in map {
                if !seen.insert(region.name.as_str()) {
                    anyhow::bail!("Duplicate region name '{}' in memory_map", region.name);
                }
                if !matches!(region.port_width, 8 | 16 | 32) {
                    anyhow::bail!(
                        "Region '{}' has invalid port_width {} (expected 8, 16 or 32)",
                        region.name,
                        region.port_width
                    );
                }
                parse_size(&region.size)
                    .with_context(|| format!("Invalid size for region '{}'", region.name))?;
            }
        }
        Ok(())
    }

    /// Resolves an image path relative to the directory holding the manifest.
    pub fn resolve(&self, manifest_path: &Path, relative: &str) -> PathBuf {
        let candidate = Path::new(relative);
        if candidate.is_absolute() {
            return candidate.to_path_buf();
        }
        manifest_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(candidate)
    }
}

/// Parses a byte count: plain decimal, `0x` hex, or a human-readable size.
pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let trimmed = size_str.trim();
    if let Ok(n) = trimmed.parse::<u64>() {
        return Ok(n);
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map_err(|e| anyhow::anyhow!("Invalid hex size '{}': {}", size_str, e));
    }
    let s: Size = trimmed
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format '{}': {}", size_str, e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}
