//! Master/Global Virtual Channel Identifier packing, per CCSDS 132.0-B-3 2.1.3
//! and the Global Virtual Channel ID word layout shown in 4.1.2.7.

use crate::error::{Result, TmFrameError};

/// Maximum value of the 2-bit Transfer Frame Version Number field.
pub const MAX_TFVN: u8 = 0x3;
/// Maximum value of the 10-bit Spacecraft Identifier field.
pub const MAX_SCID: u16 = 0x3FF;
/// Maximum value of the 3-bit Virtual Channel Identifier field.
pub const MAX_VCID: u8 = 0x7;

// Bit offsets within the 16-bit packed word: [15:14] TFVN, [13:4] SCID,
// [3:1] VCID, [0] OCF.
const VCID_OFFSET: u16 = 1;
const SCID_OFFSET: u16 = VCID_OFFSET + 3;
const TFVN_OFFSET: u16 = SCID_OFFSET + 10;

const VCID_MASK: u16 = 0x7;
const TFVN_MASK: u16 = 0x3;
const SCID_MASK: u16 = 0x3FF;

/// Master Channel Identifier: Transfer Frame Version Number ‖ Spacecraft
/// Identifier. Equality is componentwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mcid {
    /// Transfer Frame Version Number (2 bits, value <= 3).
    pub tfvn: u8,
    /// Spacecraft Identifier (10 bits, value <= 1023).
    pub scid: u16,
}

impl Mcid {
    /// Construct a new MCID, validating both fields fit their bit widths.
    pub fn new(tfvn: u8, scid: u16) -> Result<Self> {
        if tfvn > MAX_TFVN {
            return Err(TmFrameError::RangeViolation {
                field: "tfvn",
                value: tfvn as u32,
                bits: 2,
            });
        }
        if scid > MAX_SCID {
            return Err(TmFrameError::RangeViolation {
                field: "scid",
                value: scid as u32,
                bits: 10,
            });
        }
        Ok(Self { tfvn, scid })
    }
}

/// Global Virtual Channel Identifier: MCID ‖ Virtual Channel Identifier.
/// Fits in 15 bits; see [Gvcid::to_val] for the 16-bit on-wire packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gvcid {
    pub mcid: Mcid,
    /// Virtual Channel Identifier (3 bits, value <= 7).
    pub vcid: u8,
}

impl Gvcid {
    /// Construct a new GVCID, validating all three fields fit their bit
    /// widths. Out-of-range field values are a programming error per the
    /// originating source; this constructor turns them into a recoverable
    /// [TmFrameError::RangeViolation] instead of panicking.
    pub fn new(tfvn: u8, scid: u16, vcid: u8) -> Result<Self> {
        let mcid = Mcid::new(tfvn, scid)?;
        if vcid > MAX_VCID {
            return Err(TmFrameError::RangeViolation {
                field: "vcid",
                value: vcid as u32,
                bits: 3,
            });
        }
        Ok(Self { mcid, vcid })
    }

    /// Pack into the 16-bit on-wire word: bits \[15:14\] TFVN, \[13:4\] SCID,
    /// \[3:1\] VCID, \[0\] OCF (always 0 — this core never emits OCF).
    pub fn to_val(self) -> u16 {
        (self.mcid.tfvn as u16) << TFVN_OFFSET
            | (self.mcid.scid) << SCID_OFFSET
            | (self.vcid as u16) << VCID_OFFSET
    }

    /// Unpack from the 16-bit on-wire word. Fails with
    /// [TmFrameError::RangeViolation] if any extracted field exceeds its
    /// width, which cannot happen for a correctly masked `val` but is
    /// checked here for defense against a corrupted word.
    pub fn from_val(val: u16) -> Result<Self> {
        let scid = (val >> SCID_OFFSET) & SCID_MASK;
        let tfvn = ((val >> TFVN_OFFSET) & TFVN_MASK) as u8;
        let vcid = ((val >> VCID_OFFSET) & VCID_MASK) as u8;
        Self::new(tfvn, scid, vcid)
    }
}
