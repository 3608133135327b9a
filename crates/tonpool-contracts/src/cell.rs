//! Cell helpers
//!
//! Cells come from `tonlib-core`. This module adds the few encodings the
//! contract family needs on top of its builder, and the `x{...}` text form
//! used when printing get-method results.

use std::fmt::Write as _;

pub use tonlib_core::cell::{ArcCell, Cell, CellBuilder, CellParser, TonCellError};

use crate::error::Result;

/// Encodings used by the wallet, pool and nominator layouts
pub trait CellBuilderExt {
    /// `Grams` as `len:(## 4) value:(uint len*8)`
    fn store_grams(&mut self, nano: u64) -> Result<&mut Self>;

    /// `addr_none$00`
    fn store_address_none(&mut self) -> Result<&mut Self>;

    /// The first `bit_len` bits of `data`
    fn store_leading_bits(&mut self, data: &[u8], bit_len: usize) -> Result<&mut Self>;
}

impl CellBuilderExt for CellBuilder {
    fn store_grams(&mut self, nano: u64) -> Result<&mut Self> {
        let len = (64 - nano.leading_zeros() as usize + 7) / 8;
        self.store_u8(4, len as u8)?;
        if len > 0 {
            self.store_u64(len * 8, nano)?;
        }
        Ok(self)
    }

    fn store_address_none(&mut self) -> Result<&mut Self> {
        self.store_u8(2, 0)?;
        Ok(self)
    }

    fn store_leading_bits(&mut self, data: &[u8], bit_len: usize) -> Result<&mut Self> {
        for index in 0..bit_len {
            self.store_bit(bit_at(data, index))?;
        }
        Ok(self)
    }
}

fn bit_at(data: &[u8], index: usize) -> bool {
    data.get(index / 8)
        .map_or(false, |byte| byte & (0x80 >> (index % 8)) != 0)
}

/// Hex rendering of the data bits; `_` marks a completion tag
pub fn hex_bits(cell: &Cell) -> String {
    let bits = cell.bit_len();
    let mut padded = cell.data().to_vec();
    padded.resize((bits + 4) / 8 + 1, 0);
    if bits % 4 != 0 {
        padded[bits / 8] |= 0x80 >> (bits % 8);
    }
    let mut text = hex::encode_upper(&padded);
    text.truncate((bits + 3) / 4);
    if bits % 4 != 0 {
        text.push('_');
    }
    text
}

/// One `x{...}` line per cell, children indented by one space per level
pub fn format_tree(cell: &Cell) -> String {
    let mut text = String::new();
    write_tree(&mut text, cell, 0);
    text
}

fn write_tree(text: &mut String, cell: &Cell, indent: usize) {
    let _ = writeln!(text, "{:indent$}x{{{}}}", "", hex_bits(cell), indent = indent);
    for child in cell.references() {
        write_tree(text, child, indent + 1);
    }
}
