use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const BLOCK_MASK: u64 = 0xff_ffff;
const TX_MASK: u64 = 0xff_ffff;
const OUTPUT_MASK: u64 = 0xffff;

/// Errors parsing the `HxTxO` string form.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScidError {
    #[error("expected <block>x<tx>x<output>, got {0:?}")]
    Format(String),

    #[error("{field} {value} does not fit in {bits} bits")]
    Overflow {
        field: &'static str,
        value: u64,
        bits: u32,
    },
}

/// Short channel id: block height (24 bits), transaction index (24 bits)
/// and output index (16 bits) of the funding output, packed into a u64.
///
/// The `Display` form `"<block>x<tx>x<output>"` is the only form matched
/// against configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortChannelId(pub u64);

impl ShortChannelId {
    /// Pack the three fields. Values wider than their field are masked.
    pub fn new(block_height: u32, tx_index: u32, output_index: u16) -> Self {
        ShortChannelId(encode(block_height, tx_index, output_index))
    }

    #[inline]
    pub fn block_height(&self) -> u32 {
        ((self.0 >> 40) & BLOCK_MASK) as u32
    }

    #[inline]
    pub fn tx_index(&self) -> u32 {
        ((self.0 >> 16) & TX_MASK) as u32
    }

    #[inline]
    pub fn output_index(&self) -> u16 {
        (self.0 & OUTPUT_MASK) as u16
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ShortChannelId {
    fn from(id: u64) -> Self {
        ShortChannelId(id)
    }
}

impl fmt::Display for ShortChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{}",
            self.block_height(),
            self.tx_index(),
            self.output_index()
        )
    }
}

impl FromStr for ShortChannelId {
    type Err = ScidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('x');
        let (Some(block), Some(tx), Some(output), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ScidError::Format(s.to_string()));
        };

        let parse = |field: &'static str, raw: &str, bits: u32| -> Result<u64, ScidError> {
            let value: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ScidError::Format(s.to_string()))?;
            if value >> bits != 0 {
                return Err(ScidError::Overflow { field, value, bits });
            }
            Ok(value)
        };

        let block = parse("block height", block, 24)?;
        let tx = parse("tx index", tx, 24)?;
        let output = parse("output index", output, 16)?;

        Ok(ShortChannelId((block << 40) | (tx << 16) | output))
    }
}

/// Pack block height, tx index and output index into a short channel id.
#[inline]
pub fn encode(block_height: u32, tx_index: u32, output_index: u16) -> u64 {
    ((block_height as u64 & BLOCK_MASK) << 40)
        | ((tx_index as u64 & TX_MASK) << 16)
        | output_index as u64
}

/// Render a raw short channel id as `"<block>x<tx>x<output>"`.
///
/// Total over u64: ids too small to populate the upper fields render
/// those fields as zero, `0` renders as `"0x0x0"`.
#[inline]
pub fn decode(id: u64) -> String {
    ShortChannelId(id).to_string()
}
