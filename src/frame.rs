//! Transfer Frame composition: Primary Header + Data Field + Frame Error
//! Control Field. The Secondary Header and Operational Control Field are
//! both null in this core (zero octets emitted, per [crate::pdu::NullField])
//! so they don't appear as stored fields at all.

use crate::error::{Result, TmFrameError};
use crate::fecf;
use crate::gvcid::{Gvcid, Mcid};
use crate::header::{DataFieldStatus, PrimaryHeader, FIRST_HEADER_EXTEND_PACKET, FIRST_HEADER_IDLE};
use crate::pdu::{ArrayField, Pdu};

/// Default data field size in octets (247), giving the default 255-octet
/// frame: 6 (primary header) + 247 (data field) + 2 (FECF).
pub const DEFAULT_DATA_FIELD_SIZE: usize = 247;

/// Parameters held constant for a mission phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissionPhaseParameters {
    /// Transfer Frame Version Number (recommended 0).
    pub tfvn: u8,
    /// Spacecraft Identifier.
    pub scid: u16,
    /// Whether an Operational Control Field is appended. This core only
    /// supports `false` (OCF emission is a non-goal).
    pub has_ocf: bool,
    /// Whether a Secondary Header is present. This core only supports
    /// `false` (secondary header emission is a non-goal).
    pub has_secondary_header: bool,
    /// Whether the data field carries VCA_SDUs (`true`) or
    /// octet-synchronized packets/idle data (`false`).
    pub sync_flag_enabled: bool,
}

impl MissionPhaseParameters {
    /// Construct mission phase parameters, validating TFVN/SCID widths and
    /// that OCF/secondary-header are left at their only supported value.
    pub fn new(
        tfvn: u8,
        scid: u16,
        sync_flag_enabled: bool,
    ) -> Result<Self> {
        // the VCID itself is per-channel and checked separately when a
        // concrete GVCID is built.
        Mcid::new(tfvn, scid)?;
        Ok(Self {
            tfvn,
            scid,
            has_ocf: false,
            has_secondary_header: false,
            sync_flag_enabled,
        })
    }
}

/// Data field descriptor: what kind of content the data field holds, used
/// to compute the Primary Header's first-header-pointer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataFieldDesc {
    /// The data field contains only idle data.
    pub is_idle_only: bool,
    /// The data field is an extension of a packet begun in a previous
    /// frame.
    pub is_extension_packet: bool,
    /// Byte offset of the first packet header in the data field, used when
    /// neither `is_idle_only` nor `is_extension_packet` is set.
    pub first_header_offset: u16,
}

impl DataFieldDesc {
    /// A descriptor for a data field wholly occupied by one packet (or
    /// VCA_SDU) beginning at offset 0 — the common case.
    pub fn offset(first_header_offset: u16) -> Self {
        Self {
            is_idle_only: false,
            is_extension_packet: false,
            first_header_offset,
        }
    }

    /// A descriptor for an idle-data-only frame.
    pub fn idle() -> Self {
        Self {
            is_idle_only: true,
            is_extension_packet: false,
            first_header_offset: 0,
        }
    }

    /// A descriptor for a frame that extends a packet begun previously.
    pub fn extension() -> Self {
        Self {
            is_idle_only: false,
            is_extension_packet: true,
            first_header_offset: 0,
        }
    }

    /// Resolve to the Primary Header's 11-bit first-header-pointer value.
    pub fn first_header_pointer(&self) -> u16 {
        if self.is_idle_only {
            FIRST_HEADER_IDLE
        } else if self.is_extension_packet {
            FIRST_HEADER_EXTEND_PACKET
        } else {
            self.first_header_offset & 0x7FF
        }
    }
}

/// Per-frame data carried alongside the application payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferData {
    pub vcid: u8,
    pub mc_frame_count: u8,
    pub vc_frame_count: u8,
    pub data_field_desc: DataFieldDesc,
}

/// A fixed-size CCSDS TM Transfer Frame: Primary Header + Data Field, with
/// the Frame Error Control Field computed (never stored) at serialization
/// time. `D` is the data field size in octets; the serialized frame is
/// always exactly `6 + D + 2` octets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFrame<const D: usize = DEFAULT_DATA_FIELD_SIZE> {
    pub primary_header: PrimaryHeader,
    data_field: ArrayField<D>,
}

impl<const D: usize> TransferFrame<D> {
    /// Total serialized frame size in octets.
    pub const fn frame_size() -> usize {
        crate::header::PRIMARY_HEADER_SIZE + D + fecf::FECF_SIZE
    }

    /// Construct a frame with the given header and a zeroed data field.
    pub fn new(primary_header: PrimaryHeader) -> Self {
        Self {
            primary_header,
            data_field: ArrayField::default(),
        }
    }

    /// Seed primary-header fields stable for this frame: addressing (from
    /// `phase` and `transfer_data.vcid`), both frame counts, and the Data
    /// Field Status (built from `phase` and the data-field descriptor).
    /// Mirrors `TransferFrame::setControlInfo` in the originating source.
    pub fn set_control_info(
        &mut self,
        phase: &MissionPhaseParameters,
        transfer_data: &TransferData,
    ) -> Result<()> {
        let gvcid = Gvcid::new(phase.tfvn, phase.scid, transfer_data.vcid)?;
        self.primary_header = PrimaryHeader {
            tfvn: gvcid.mcid.tfvn,
            scid: gvcid.mcid.scid,
            vcid: gvcid.vcid,
            ocf_flag: phase.has_ocf,
            mc_frame_count: transfer_data.mc_frame_count,
            vc_frame_count: transfer_data.vc_frame_count,
            data_field_status: DataFieldStatus {
                has_secondary_header: phase.has_secondary_header,
                sync_flag: phase.sync_flag_enabled,
                packet_order_flag: false,
                segment_length_id: 0b11,
                first_header_pointer: transfer_data.data_field_desc.first_header_pointer(),
            },
        };
        Ok(())
    }

    /// Overwrite the data field. `data.len()` must equal `D`.
    pub fn set_data_field(&mut self, data: &[u8]) -> Result<()> {
        self.data_field.set_from_slice(data)
    }

    /// The current data field contents.
    pub fn data_field(&self) -> &[u8] {
        self.data_field.as_slice()
    }

    /// Serialize primary header, data field, and FECF, in order. Total
    /// length is always [Self::frame_size] octets.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(Self::frame_size());
        self.primary_header.encode(&mut out)?;
        self.data_field.insert(&mut out)?;
        if out.len() != crate::header::PRIMARY_HEADER_SIZE + D {
            return Err(TmFrameError::SerializationError);
        }
        fecf::insert(&out.clone(), &mut out);
        Ok(out)
    }

    /// Inverse of [Self::serialize]: validates the overall length and FECF,
    /// then decodes the primary header and data field.
    pub fn deserialize(input: &[u8]) -> Result<Self> {
        if input.len() != Self::frame_size() {
            return Err(TmFrameError::SizeMismatch {
                expected: Self::frame_size(),
                actual: input.len(),
            });
        }
        fecf::verify(input)?;

        let mut cursor = input;
        let primary_header = PrimaryHeader::decode(&mut cursor)?;

        let mut data_field = ArrayField::default();
        data_field.extract(&mut cursor)?;

        Ok(Self {
            primary_header,
            data_field,
        })
    }
}
