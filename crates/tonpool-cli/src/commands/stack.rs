//! Get-method stack values
//!
//! Arguments of `runmethod` are read as a sequence of entries:
//!
//! - decimal integers, or hexadecimal with a `0x` / `-0x` prefix
//! - `"text"` slices of up to 127 bytes
//! - `x{hex}` and `b{binary}` bit-string slices
//! - `[ ... ]` tuples and `( ... )` lists of nested entries

use std::str::FromStr;

use dashu::integer::IBig;

use tonpool_contracts::cell::format_tree;
use tonpool_contracts::{boc, Cell, CellBuilder, CellBuilderExt, ContractError};

use crate::api::{StackEntry, TvmElements, TvmNumber, TvmSlice};
use crate::dispatch::Args;
use crate::error::{CliError, CliResult};

const MAX_TEXT_BYTES: usize = 127;
const MAX_SLICE_BITS: usize = 1023;
const MAX_INT_BITS: usize = 256;

/// Read stack entries until the arguments run out
pub fn parse_stack(args: &mut Args<'_>) -> CliResult<Vec<StackEntry>> {
    parse_until(args, None)
}

fn parse_until(args: &mut Args<'_>, close: Option<&str>) -> CliResult<Vec<StackEntry>> {
    let mut stack = Vec::new();
    loop {
        let word = args.word();
        if word.is_empty() {
            return match close {
                None => Ok(stack),
                Some(close) => Err(CliError::validation(format!("Expected `{}` before end of input", close))),
            };
        }
        if Some(word) == close {
            return Ok(stack);
        }
        let entry = match word {
            "[" => StackEntry::Tuple {
                tuple: TvmElements {
                    elements: parse_until(args, Some("]"))?,
                },
            },
            "(" => StackEntry::List {
                list: TvmElements {
                    elements: parse_until(args, Some(")"))?,
                },
            },
            _ => parse_entry(word)?,
        };
        stack.push(entry);
    }
}

/// Parse a single non-nested entry
pub fn parse_entry(word: &str) -> CliResult<StackEntry> {
    if let Some(quoted) = word.strip_prefix('"') {
        let text = quoted
            .strip_suffix('"')
            .filter(|text| text.len() <= MAX_TEXT_BYTES)
            .ok_or_else(|| CliError::validation("Failed to parse slice"))?;
        return bits_entry(text.as_bytes(), text.len() * 8);
    }

    if word.len() >= 3 && word.ends_with('}') {
        if let Some(hex) = word.strip_prefix("x{") {
            let (data, bits) = parse_hex_bits(&hex[..hex.len() - 1])?;
            return bits_entry(&data, bits);
        }
        if let Some(binary) = word.strip_prefix("b{") {
            let (data, bits) = parse_binary_bits(&binary[..binary.len() - 1])?;
            return bits_entry(&data, bits);
        }
    }

    let number = parse_number(word)?;
    Ok(StackEntry::Number {
        number: TvmNumber {
            number: number.to_string(),
        },
    })
}

fn parse_number(word: &str) -> CliResult<IBig> {
    let invalid = || CliError::validation("Failed to parse a number");
    let number = if let Some(hex) = word.strip_prefix("0x") {
        IBig::from_str_radix(hex, 16).map_err(|_| invalid())?
    } else if let Some(hex) = word.strip_prefix("-0x") {
        -IBig::from_str_radix(hex, 16).map_err(|_| invalid())?
    } else {
        IBig::from_str(word).map_err(|_| invalid())?
    };
    let limit = IBig::ONE << MAX_INT_BITS;
    if number >= limit || number < -limit {
        return Err(CliError::validation("Number does not fit into 257 bits"));
    }
    Ok(number)
}

fn bits_entry(data: &[u8], bits: usize) -> CliResult<StackEntry> {
    if bits > MAX_SLICE_BITS {
        return Err(CliError::validation("Failed to parse slice"));
    }
    let mut builder = CellBuilder::new();
    builder.store_leading_bits(data, bits)?;
    slice_entry(&builder.build().map_err(ContractError::from)?)
}

fn slice_entry(cell: &Cell) -> CliResult<StackEntry> {
    Ok(StackEntry::Slice {
        slice: TvmSlice {
            bytes: boc::serialize(cell)?,
        },
    })
}

/// Hex digits, optionally ending with `_` to mark a completion tag
fn parse_hex_bits(text: &str) -> CliResult<(Vec<u8>, usize)> {
    let (digits, tagged) = match text.strip_suffix('_') {
        Some(digits) => (digits, true),
        None => (text, false),
    };
    let mut bits = Vec::with_capacity(digits.len() * 4);
    for c in digits.chars() {
        let nibble = c
            .to_digit(16)
            .ok_or_else(|| CliError::validation("Failed to parse slice"))?;
        for shift in (0..4).rev() {
            bits.push(nibble >> shift & 1 == 1);
        }
    }
    if tagged {
        while bits.last() == Some(&false) {
            bits.pop();
        }
        bits.pop();
    }
    Ok(pack_bits(&bits))
}

fn parse_binary_bits(text: &str) -> CliResult<(Vec<u8>, usize)> {
    let bits = text
        .chars()
        .map(|c| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            _ => Err(CliError::validation("Failed to parse slice")),
        })
        .collect::<CliResult<Vec<_>>>()?;
    Ok(pack_bits(&bits))
}

fn pack_bits(bits: &[bool]) -> (Vec<u8>, usize) {
    let mut data = vec![0u8; (bits.len() + 7) / 8];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            data[i / 8] |= 0x80 >> (i % 8);
        }
    }
    (data, bits.len())
}

//-----------------------------------------------------------------------------
// Printing
//-----------------------------------------------------------------------------

/// One entry per line
pub fn format_stack(stack: &[StackEntry]) -> String {
    let mut text = String::new();
    for entry in stack {
        format_entry(&mut text, entry);
        text.push('\n');
    }
    text
}

fn format_entry(text: &mut String, entry: &StackEntry) {
    match entry {
        StackEntry::Number { number } => text.push_str(&number.number),
        StackEntry::Slice { slice } => format_cell(text, &slice.bytes),
        StackEntry::Cell { cell } => format_cell(text, &cell.bytes),
        StackEntry::Tuple { tuple } => format_elements(text, "[", &tuple.elements, "]"),
        StackEntry::List { list } => format_elements(text, "(", &list.elements, ")"),
        StackEntry::Unsupported => text.push_str("<UNSUPPORTED>"),
    }
}

fn format_elements(text: &mut String, open: &str, elements: &[StackEntry], close: &str) {
    text.push_str(open);
    for element in elements {
        text.push(' ');
        format_entry(text, element);
    }
    text.push(' ');
    text.push_str(close);
}

fn format_cell(text: &mut String, bytes: &[u8]) {
    match boc::deserialize(bytes) {
        Ok(cell) => text.push_str(format_tree(&cell).trim_end()),
        Err(_) => text.push_str("<INVALID_CELL>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> CliResult<Vec<StackEntry>> {
        parse_stack(&mut Args::new(text))
    }

    fn number(value: &str) -> StackEntry {
        StackEntry::Number {
            number: TvmNumber {
                number: value.to_string(),
            },
        }
    }

    #[test]
    fn test_numbers() {
        let stack = parse("42 -7 0xff -0x10").unwrap();
        assert_eq!(stack, vec![number("42"), number("-7"), number("255"), number("-16")]);
        assert!(parse("12abc").is_err());
        assert!(parse("0x").is_err());
    }

    #[test]
    fn test_nested_entries() {
        let stack = parse("[ 1 ( 2 3 ) ] 4").unwrap();
        assert_eq!(stack.len(), 2);
        match &stack[0] {
            StackEntry::Tuple { tuple } => {
                assert_eq!(tuple.elements[0], number("1"));
                assert!(matches!(&tuple.elements[1], StackEntry::List { list } if list.elements.len() == 2));
            }
            other => panic!("unexpected entry {:?}", other),
        }
        assert_eq!(format_stack(&stack), "[ 1 ( 2 3 ) ]\n4\n");

        assert!(parse("[ 1 2").is_err());
    }

    #[test]
    fn test_slices() {
        let stack = parse("x{A_} b{101} \"hi\"").unwrap();
        let printed = format_stack(&stack);
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(lines, vec!["x{A_}", "x{B_}", "x{6869}"]);

        assert!(parse("x{zz}").is_err());
        assert!(parse("\"unterminated").is_err());
    }

    #[test]
    fn test_parse_hex_bits() {
        assert_eq!(parse_hex_bits("A").unwrap(), (vec![0xa0], 4));
        assert_eq!(parse_hex_bits("A_").unwrap(), (vec![0x80], 2));
        assert_eq!(parse_hex_bits("").unwrap(), (vec![], 0));
    }
}
