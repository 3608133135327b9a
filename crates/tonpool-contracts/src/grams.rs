// Grams amounts: `GR$<whole>[.<fraction>]` or a raw nanogram count

use std::fmt;
use std::str::FromStr;

use crate::error::ContractError;

const NANO_PER_GRAM: u64 = 1_000_000_000;
const PREFIX: &str = "GR$";

/// An amount in nanograms
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Grams {
    pub nano: u64,
}

impl Grams {
    pub fn from_nano(nano: u64) -> Self {
        Self { nano }
    }
}

impl fmt::Display for Grams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.nano / NANO_PER_GRAM;
        let mut fraction = self.nano % NANO_PER_GRAM;
        write!(f, "{}{}", PREFIX, whole)?;
        if fraction != 0 {
            let mut width = 9;
            while fraction % 10 == 0 {
                fraction /= 10;
                width -= 1;
            }
            write!(f, ".{:0width$}", fraction, width = width)?;
        }
        Ok(())
    }
}

impl FromStr for Grams {
    type Err = ContractError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let Some(rest) = text.strip_prefix(PREFIX) else {
            return text
                .parse::<u64>()
                .map(Grams::from_nano)
                .map_err(|_| ContractError::InvalidGrams(format!("\"{}\"", text)));
        };

        let (whole, fraction) = match rest.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (rest, None),
        };
        let whole = whole
            .parse::<u32>()
            .map_err(|_| ContractError::InvalidGrams(format!("\"{}\"", text)))?;
        let mut nano = u64::from(whole);

        match fraction {
            None => nano *= NANO_PER_GRAM,
            Some(digits) => {
                let mut chars = digits.chars().peekable();
                for _ in 0..9 {
                    nano *= 10;
                    if let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                        nano += u64::from(d);
                        chars.next();
                    }
                }
                let left: String = chars.collect();
                if !left.is_empty() {
                    return Err(ContractError::InvalidGrams(format!("\"{}\", left \"{}\"", text, left)));
                }
            }
        }
        Ok(Grams::from_nano(nano))
    }
}
