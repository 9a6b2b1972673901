#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]
//! CCSDS 132.0-B-3 TM Space Data Link framing: a bit-exact Transfer Frame
//! codec plus the Virtual Channel → Master Channel → Physical Channel
//! multiplexing hierarchy. The receive-side deframer, the outbound
//! byte-stream driver, the TC variant, and the Space Packet Protocol are
//! all out of scope for this crate — see the README.

pub mod channel;
pub mod config;
pub mod detector;
pub mod error;
pub mod fecf;
pub mod frame;
pub mod gvcid;
pub mod header;
pub mod pdu;
pub mod queue;
pub mod services;

#[doc(inline)]
pub use crc;

pub use channel::{MasterChannel, PhysicalChannel, VirtualChannel};
pub use config::{
    BlockingMode, MasterChannelConfig, PhysicalChannelConfig, QueueConfig, VirtualChannelConfig,
};
pub use error::{Result, TmFrameError};
pub use frame::{DataFieldDesc, MissionPhaseParameters, TransferData, TransferFrame};
pub use gvcid::{Gvcid, Mcid};
pub use header::{DataFieldStatus, PrimaryHeader};
pub use services::{VcaRequest, VcaService, VcfRequest, VcfService};
