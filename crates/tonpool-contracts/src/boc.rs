//! Bag-of-cells encoding
//!
//! Single-root BOCs in the `b5ee9c72` format, with a CRC32-C trailer on
//! output. The header is checked against the input length before the
//! payload reaches the decoder, since the cell count it declares sizes the
//! decoder's tables.

use tonlib_core::cell::{ArcCell, BagOfCells, Cell};

use crate::error::{ContractError, Result};

const MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

/// Smallest serialized cell: two descriptor bytes and no data
const MIN_CELL_BYTES: usize = 2;

pub fn serialize(root: &Cell) -> Result<Vec<u8>> {
    Ok(BagOfCells::from_root(root.clone()).serialize(true)?)
}

pub fn deserialize(bytes: &[u8]) -> Result<ArcCell> {
    check_header(bytes)?;
    let boc = BagOfCells::parse(bytes)?;
    Ok(boc.single_root()?.clone())
}

/// Reject headers whose counts cannot fit in the payload
fn check_header(bytes: &[u8]) -> Result<()> {
    if bytes.len() < 6 || bytes[..4] != MAGIC {
        return Err(ContractError::InvalidBoc("unknown magic".to_string()));
    }
    let size_bytes = usize::from(bytes[4] & 0x07);
    if size_bytes == 0 || size_bytes > 4 {
        return Err(ContractError::InvalidBoc(format!("bad reference size {}", size_bytes)));
    }
    let counts = 6 + 2 * size_bytes;
    if bytes.len() < counts {
        return Err(ContractError::InvalidBoc("truncated header".to_string()));
    }

    let cells = read_uint(&bytes[6..6 + size_bytes]);
    let roots = read_uint(&bytes[6 + size_bytes..counts]);
    let limit = bytes.len() / MIN_CELL_BYTES;
    if cells > limit {
        return Err(ContractError::InvalidBoc(format!(
            "{} cells cannot fit in {} bytes",
            cells,
            bytes.len()
        )));
    }
    if roots != 1 || cells == 0 {
        return Err(ContractError::InvalidBoc(format!("expected a single root, got {}", roots)));
    }
    Ok(())
}

fn read_uint(bytes: &[u8]) -> usize {
    bytes.iter().fold(0, |acc, &b| (acc << 8) | usize::from(b))
}
