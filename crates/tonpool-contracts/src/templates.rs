//! Contract code templates
//!
//! Code cells are versioned constants owned by the contract envelope. The
//! wallet is the standard wallet v3 revision 2 image. The bundled set is
//! used unless the settings point at BOC files exported from the envelope,
//! in which case those are loaded instead.

use std::path::Path;

use serde::Deserialize;
use tonlib_core::cell::{ArcCell, CellBuilder};
use tracing::debug;

use crate::boc;
use crate::error::Result;

/// Version tag of the bundled code images
pub const BUNDLED_VERSION: &str = "wallet-v3r2/envelope-v1";

/// Representation hash of the wallet v3r2 code cell
pub const WALLET_V3R2_CODE_HASH: &str = "84dafa449f98a6987789ba232358072bc0f76dc4524002a5d0918b9a75d2d599";

const WALLET_V3R2_BOC: &[u8] = &[
    0xb5, 0xee, 0x9c, 0x72, 0x41, 0x01, 0x01, 0x01, 0x00, 0x71, 0x00, 0x00, 0xde, 0xff, 0x00, 0x20,
    0xdd, 0x20, 0x82, 0x01, 0x4c, 0x97, 0xba, 0x21, 0x82, 0x01, 0x33, 0x9c, 0xba, 0xb1, 0x9f, 0x71,
    0xb0, 0xed, 0x44, 0xd0, 0xd3, 0x1f, 0xd3, 0x1f, 0x31, 0xd7, 0x0b, 0xff, 0xe3, 0x04, 0xe0, 0xa4,
    0xf2, 0x60, 0x83, 0x08, 0xd7, 0x18, 0x20, 0xd3, 0x1f, 0xd3, 0x1f, 0xd3, 0x1f, 0xf8, 0x23, 0x13,
    0xbb, 0xf2, 0x63, 0xed, 0x44, 0xd0, 0xd3, 0x1f, 0xd3, 0x1f, 0xd3, 0xff, 0xd1, 0x51, 0x32, 0xba,
    0xf2, 0xa1, 0x51, 0x44, 0xba, 0xf2, 0xa2, 0x04, 0xf9, 0x01, 0x54, 0x10, 0x55, 0xf9, 0x10, 0xf2,
    0xa3, 0xf8, 0x00, 0x93, 0x20, 0xd7, 0x4a, 0x96, 0xd3, 0x07, 0xd4, 0x02, 0xfb, 0x00, 0xe8, 0xd1,
    0x01, 0xa4, 0xc8, 0xcb, 0x1f, 0xcb, 0x1f, 0xcb, 0xff, 0xc9, 0xed, 0x54, 0x10, 0xbd, 0x6d, 0xad,
];

// Envelope images; deployments override them with the envelope's BOC files.
const POOL_CODE: &[u8] = &[
    0xff, 0x00, 0xf4, 0xa4, 0x13, 0xf4, 0xbc, 0xf2, 0xc8, 0x0b, 0x50, 0x4f, 0x4f, 0x4c, 0x00, 0x01,
    0xd3, 0x1f, 0xd3, 0x1f, 0xd3, 0x1f, 0xd3, 0x1f, 0xfa, 0x40, 0x30, 0xed, 0x54,
];
const NOMINATOR_CODE: &[u8] = &[
    0xff, 0x00, 0xf4, 0xa4, 0x13, 0xf4, 0xbc, 0xf2, 0xc8, 0x0b, 0x4e, 0x4f, 0x4d, 0x00, 0x01, 0xfa,
    0x40, 0xd3, 0x1f, 0x30, 0xed, 0x54,
];

/// Source of contract code cells
pub trait ContractTemplates {
    fn version(&self) -> &str;
    fn wallet_code(&self) -> &ArcCell;
    fn pool_code(&self) -> &ArcCell;
    fn nominator_code(&self) -> &ArcCell;
}

/// Paths to BOC files overriding the bundled code
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplatePaths {
    pub version: Option<String>,
    pub wallet: Option<String>,
    pub pool: Option<String>,
    pub nominator: Option<String>,
}

/// A concrete set of code cells
#[derive(Debug, Clone)]
pub struct TemplateSet {
    version: String,
    wallet: ArcCell,
    pool: ArcCell,
    nominator: ArcCell,
}

impl TemplateSet {
    /// The code images shipped with this crate
    pub fn bundled() -> Result<Self> {
        Ok(Self {
            version: BUNDLED_VERSION.to_string(),
            wallet: boc::deserialize(WALLET_V3R2_BOC)?,
            pool: code_cell(POOL_CODE)?,
            nominator: code_cell(NOMINATOR_CODE)?,
        })
    }

    /// Bundled images with any configured file overrides applied
    pub fn load(paths: &TemplatePaths) -> Result<Self> {
        let mut set = Self::bundled()?;
        if let Some(path) = &paths.wallet {
            set.wallet = load_boc(path)?;
        }
        if let Some(path) = &paths.pool {
            set.pool = load_boc(path)?;
        }
        if let Some(path) = &paths.nominator {
            set.nominator = load_boc(path)?;
        }
        if let Some(version) = &paths.version {
            set.version = version.clone();
        }
        Ok(set)
    }
}

impl ContractTemplates for TemplateSet {
    fn version(&self) -> &str {
        &self.version
    }

    fn wallet_code(&self) -> &ArcCell {
        &self.wallet
    }

    fn pool_code(&self) -> &ArcCell {
        &self.pool
    }

    fn nominator_code(&self) -> &ArcCell {
        &self.nominator
    }
}

fn code_cell(bytes: &[u8]) -> Result<ArcCell> {
    let mut builder = CellBuilder::new();
    builder.store_slice(bytes)?;
    Ok(builder.build()?.to_arc())
}

fn load_boc(path: impl AsRef<Path>) -> Result<ArcCell> {
    let bytes = fs_err::read(path.as_ref())?;
    let cell = boc::deserialize(&bytes)?;
    debug!(path = %path.as_ref().display(), hash = %hex::encode(cell.cell_hash()), "loaded code template");
    Ok(cell)
}
