//! Per-channel configuration: plain, validated structs built once at
//! startup and held for a channel's lifetime. No file-backed loader — the
//! originating source's micro-filesystem-driven config table is out of
//! scope here; callers construct these from whatever configuration
//! surface their application already has.

use crate::error::{Result, TmFrameError};
use crate::frame::MissionPhaseParameters;
use crate::gvcid::MAX_VCID;

/// Queueing discipline for a channel's inbound/outbound hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingMode {
    /// `send`/`receive` block until capacity/data is available.
    Blocking,
    /// `send`/`receive` fail immediately instead of blocking.
    NonBlocking,
}

/// Capacity and blocking behavior for one [crate::queue::FrameQueue].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub capacity: usize,
    pub mode: BlockingMode,
}

impl QueueConfig {
    pub fn new(capacity: usize, mode: BlockingMode) -> Result<Self> {
        if capacity == 0 {
            return Err(TmFrameError::InvariantViolation(
                "queue capacity must be at least 1",
            ));
        }
        Ok(Self { capacity, mode })
    }
}

/// Configuration for one Virtual Channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualChannelConfig {
    pub vcid: u8,
    pub priority: u8,
    pub queue: QueueConfig,
}

impl VirtualChannelConfig {
    pub fn new(vcid: u8, priority: u8, queue: QueueConfig) -> Result<Self> {
        if vcid > MAX_VCID {
            return Err(TmFrameError::RangeViolation {
                field: "vcid",
                value: vcid as u32,
                bits: 3,
            });
        }
        Ok(Self {
            vcid,
            priority,
            queue,
        })
    }
}

/// Configuration for one Master Channel: the mission phase it operates
/// under and the Virtual Channels multiplexed onto it, in the fixed
/// ascending order a generation cycle visits them.
#[derive(Debug, Clone)]
pub struct MasterChannelConfig {
    pub phase: MissionPhaseParameters,
    pub virtual_channels: Vec<VirtualChannelConfig>,
    /// This Master Channel's sending priority onto its Physical Channel.
    pub priority: u8,
    pub outbound_queue: QueueConfig,
    /// Blocking mode this Master Channel uses to dequeue from each Virtual
    /// Channel during a generation cycle.
    pub receive_mode: BlockingMode,
}

impl MasterChannelConfig {
    pub fn new(
        phase: MissionPhaseParameters,
        virtual_channels: Vec<VirtualChannelConfig>,
        priority: u8,
        outbound_queue: QueueConfig,
        receive_mode: BlockingMode,
    ) -> Result<Self> {
        if virtual_channels.is_empty() {
            return Err(TmFrameError::InvariantViolation(
                "a Master Channel must multiplex at least one Virtual Channel",
            ));
        }
        Ok(Self {
            phase,
            virtual_channels,
            priority,
            outbound_queue,
            receive_mode,
        })
    }
}

/// Configuration for one Physical Channel: the Master Channels multiplexed
/// onto it, visited in the same fixed ascending order.
#[derive(Debug, Clone)]
pub struct PhysicalChannelConfig {
    pub master_channels: Vec<MasterChannelConfig>,
    pub outbound_queue: QueueConfig,
    /// Blocking mode this Physical Channel uses to dequeue from each Master
    /// Channel during a generation cycle.
    pub receive_mode: BlockingMode,
}

impl PhysicalChannelConfig {
    pub fn new(
        master_channels: Vec<MasterChannelConfig>,
        outbound_queue: QueueConfig,
        receive_mode: BlockingMode,
    ) -> Result<Self> {
        if master_channels.is_empty() {
            return Err(TmFrameError::InvariantViolation(
                "a Physical Channel must multiplex at least one Master Channel",
            ));
        }
        Ok(Self {
            master_channels,
            outbound_queue,
            receive_mode,
        })
    }
}
