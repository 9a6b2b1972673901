//! Virtual Channel Access (VCA) and Virtual Channel Frame (VCF) services,
//! modeled on `Svc::TMSpaceDataLink::Services` in the originating source:
//! VCAS is stateless and builds a `VCA.request` primitive from an
//! application SDU; VCFS is stateful, bound to one GVCID, and turns a
//! `VCA.request` into a fully populated Transfer Frame, advancing its VC
//! frame count only on success.

use crate::error::{Result, TmFrameError};
use crate::frame::{
    DataFieldDesc, MissionPhaseParameters, TransferData, TransferFrame, DEFAULT_DATA_FIELD_SIZE,
};
use crate::gvcid::Gvcid;
use crate::header::PrimaryHeader;

/// `VCA.request` primitive: an application SDU addressed to a GVCID,
/// tagged with the data-field descriptor that will become the Primary
/// Header's first-header-pointer.
#[derive(Debug, Clone)]
pub struct VcaRequest {
    pub sdu: Vec<u8>,
    pub status_fields: DataFieldDesc,
    pub sap: Gvcid,
}

/// Virtual Channel Access Service: stateless: builds a `VCA.request` from
/// an SDU plus where it sits in the data field.
pub struct VcaService;

impl VcaService {
    /// Build a `VCA.request` primitive. Does not itself validate `sdu`'s
    /// length against the data field size; that's checked when the
    /// Virtual Channel Frame Service assembles the frame.
    pub fn request(sdu: Vec<u8>, status_fields: DataFieldDesc, sap: Gvcid) -> VcaRequest {
        VcaRequest {
            sdu,
            status_fields,
            sap,
        }
    }
}

/// `VCF.request` primitive: a fully populated Transfer Frame (minus the
/// Master Channel frame count, stamped later) addressed to a GVCID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcfRequest<const D: usize = DEFAULT_DATA_FIELD_SIZE> {
    pub frame: TransferFrame<D>,
    pub sap: Gvcid,
}

/// Virtual Channel Frame Service: stateful, bound to one GVCID. Holds the
/// Virtual Channel frame count and advances it modulo 256 on every
/// successful frame built.
pub struct VcfService<const D: usize = DEFAULT_DATA_FIELD_SIZE> {
    gvcid: Gvcid,
    vc_frame_count: u8,
}

impl<const D: usize> VcfService<D> {
    /// Bind a new service instance to `gvcid`, with the VC frame count
    /// starting at 0.
    pub fn new(gvcid: Gvcid) -> Self {
        Self {
            gvcid,
            vc_frame_count: 0,
        }
    }

    /// Current Virtual Channel frame count.
    pub fn vc_frame_count(&self) -> u8 {
        self.vc_frame_count
    }

    /// Turn a `VCA.request` into a `VCF.request`: build the Transfer
    /// Frame's control info and data field, and on success advance the VC
    /// frame count modulo 256. The Master Channel frame count is left at 0
    /// for the Master Channel Service to stamp.
    ///
    /// Fails with [TmFrameError::InvariantViolation] if `request.sap`
    /// doesn't match this service's bound GVCID, or
    /// [TmFrameError::SizeMismatch] if `request.sdu` isn't exactly `D`
    /// octets.
    pub fn request(
        &mut self,
        phase: &MissionPhaseParameters,
        request: VcaRequest,
    ) -> Result<VcfRequest<D>> {
        if request.sap != self.gvcid {
            return Err(TmFrameError::InvariantViolation(
                "VCF.request GVCID does not match the bound Virtual Channel",
            ));
        }

        let mut frame = TransferFrame::<D>::new(PrimaryHeader::new(
            self.gvcid,
            crate::header::DataFieldStatus {
                has_secondary_header: false,
                sync_flag: false,
                packet_order_flag: false,
                segment_length_id: 0,
                first_header_pointer: 0,
            },
        ));

        let transfer_data = TransferData {
            vcid: self.gvcid.vcid,
            mc_frame_count: 0,
            vc_frame_count: self.vc_frame_count,
            data_field_desc: request.status_fields,
        };
        frame.set_control_info(phase, &transfer_data)?;
        frame.set_data_field(&request.sdu)?;

        self.vc_frame_count = self.vc_frame_count.wrapping_add(1);

        Ok(VcfRequest {
            frame,
            sap: request.sap,
        })
    }
}
