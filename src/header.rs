//! Transfer Frame Primary Header: bit-exact 6-octet codec per CCSDS
//! 132.0-B-3 4.1.2.7. The on-wire layout is produced with explicit shifts
//! and masks rather than a packed record, since a packed record's octet
//! order is not portable.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Read, Write};

use crate::error::{Result, TmFrameError};
use crate::gvcid::Gvcid;

/// Size in octets of a serialized Primary Header. Fixed by CCSDS 132.0-B-3
/// 4.1.2 regardless of mission phase configuration.
pub const PRIMARY_HEADER_SIZE: usize = 6;

/// `0b11111111111`: the data field is an extension of a packet begun in a
/// previous frame (Synchronization Flag == 1).
pub const FIRST_HEADER_EXTEND_PACKET: u16 = 0b111_1111_1111;
/// `0b11111111110`: the data field contains only idle data (Synchronization
/// Flag == 1).
pub const FIRST_HEADER_IDLE: u16 = 0b111_1111_1110;

/// Data Field Status (16 bits): secondary-header-flag ‖ sync-flag ‖
/// packet-order-flag ‖ segment-length-id ‖ first-header-pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataFieldStatus {
    /// Constant for the mission phase; this core never emits a secondary
    /// header so this is always `false`.
    pub has_secondary_header: bool,
    /// Constant for the mission phase. `true` means the data field holds a
    /// Virtual Channel Access Service Data Unit; `false` means it holds
    /// octet-synchronized, forward-ordered packets or idle data.
    pub sync_flag: bool,
    /// Reserved for future CCSDS use; recommended `false`.
    pub packet_order_flag: bool,
    /// If `sync_flag` is `false`, fixed to `0b11` (non-use of source packet
    /// segments). Undefined (but still round-tripped) if `sync_flag` is
    /// `true`.
    pub segment_length_id: u8,
    /// Position of the first octet of the first packet in the data field,
    /// or one of [FIRST_HEADER_IDLE]/[FIRST_HEADER_EXTEND_PACKET]. Undefined
    /// if `sync_flag` is `true`.
    pub first_header_pointer: u16,
}

impl DataFieldStatus {
    fn to_u16(self) -> u16 {
        (self.has_secondary_header as u16) << 15
            | (self.sync_flag as u16) << 14
            | (self.packet_order_flag as u16) << 13
            | ((self.segment_length_id as u16) & 0x3) << 11
            | (self.first_header_pointer & 0x7FF)
    }

    fn from_u16(word: u16) -> Self {
        Self {
            has_secondary_header: (word >> 15) & 0x1 != 0,
            sync_flag: (word >> 14) & 0x1 != 0,
            packet_order_flag: (word >> 13) & 0x1 != 0,
            segment_length_id: ((word >> 11) & 0x3) as u8,
            first_header_pointer: word & 0x7FF,
        }
    }
}

/// Primary Header control info stable across the whole transfer: the
/// mission-phase-constant fields plus the addressing fields a Virtual
/// Channel stamps once at frame construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryHeader {
    /// Transfer Frame Version Number (2 bits). Constant for the mission
    /// phase.
    pub tfvn: u8,
    /// Spacecraft Identifier (10 bits). Constant for the mission phase.
    pub scid: u16,
    /// Virtual Channel Identifier (3 bits).
    pub vcid: u8,
    /// Operational Control Field presence flag. Always `false` in this
    /// core (OCF emission is not implemented).
    pub ocf_flag: bool,
    /// Master Channel frame count, modulo 256.
    pub mc_frame_count: u8,
    /// Virtual Channel frame count, modulo 256.
    pub vc_frame_count: u8,
    /// Data Field Status metadata.
    pub data_field_status: DataFieldStatus,
}

impl PrimaryHeader {
    /// Build a header from a [Gvcid] and zeroed counters/status, as a
    /// Virtual Channel does at `setControlInfo` time.
    pub fn new(gvcid: Gvcid, data_field_status: DataFieldStatus) -> Self {
        Self {
            tfvn: gvcid.mcid.tfvn,
            scid: gvcid.mcid.scid,
            vcid: gvcid.vcid,
            ocf_flag: false,
            mc_frame_count: 0,
            vc_frame_count: 0,
            data_field_status,
        }
    }

    fn first_word(&self) -> u16 {
        (self.tfvn as u16 & 0x3) << 14
            | (self.scid & 0x3FF) << 4
            | (self.vcid as u16 & 0x7) << 1
            | self.ocf_flag as u16
    }

    /// Serialize the 6-octet header, big-endian, bit-exact per CCSDS
    /// 132.0-B-3 4.1.2.7.
    pub fn encode<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(&self.first_word().to_be_bytes())?;
        out.write_all(&[self.mc_frame_count, self.vc_frame_count])?;
        out.write_all(&self.data_field_status.to_u16().to_be_bytes())?;
        Ok(())
    }

    /// Deserialize a 6-octet header.
    pub fn decode<R: Read>(buffer: &mut R) -> Result<Self> {
        let first_word = buffer.read_u16::<BigEndian>()?;
        let mc_frame_count = buffer.read_u8()?;
        let vc_frame_count = buffer.read_u8()?;
        let status_word = buffer.read_u16::<BigEndian>()?;

        Ok(Self {
            tfvn: ((first_word >> 14) & 0x3) as u8,
            scid: (first_word >> 4) & 0x3FF,
            vcid: ((first_word >> 1) & 0x7) as u8,
            ocf_flag: first_word & 0x1 != 0,
            mc_frame_count,
            vc_frame_count,
            data_field_status: DataFieldStatus::from_u16(status_word),
        })
    }

    /// Validate that every bit field fits its designated width. Values
    /// constructed via [Gvcid] are already validated; this exists for
    /// headers assembled or mutated by hand (e.g. in tests).
    pub fn validate(&self) -> Result<()> {
        if self.tfvn > crate::gvcid::MAX_TFVN {
            return Err(TmFrameError::RangeViolation {
                field: "tfvn",
                value: self.tfvn as u32,
                bits: 2,
            });
        }
        if self.scid > crate::gvcid::MAX_SCID {
            return Err(TmFrameError::RangeViolation {
                field: "scid",
                value: self.scid as u32,
                bits: 10,
            });
        }
        if self.vcid > crate::gvcid::MAX_VCID {
            return Err(TmFrameError::RangeViolation {
                field: "vcid",
                value: self.vcid as u32,
                bits: 3,
            });
        }
        Ok(())
    }
}
