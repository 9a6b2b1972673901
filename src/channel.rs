//! Virtual Channel → Master Channel → Physical Channel hierarchy: three
//! layers of the same receive → generate → enqueue stage, data flowing
//! leaf to root. Matches the layering of
//! `Svc::TMSpaceDataLink::Channels` in the originating source, generalized
//! over the number of children each Master/Physical Channel multiplexes
//! via a const generic rather than that source's fixed-arity template
//! instantiations.
//!
//! Multiplex cycles at the Master and Physical Channel layers are
//! all-or-nothing: a non-blocking receive that comes up empty on any one
//! child aborts the whole cycle before anything is stamped, enqueued, or
//! counted, so a Master/Physical Channel's frame count and outbound queue
//! never reflect a partial multiplex.

use tracing::{debug, trace};

use crate::config::{BlockingMode, MasterChannelConfig, PhysicalChannelConfig, VirtualChannelConfig};
use crate::error::{Result, TmFrameError};
use crate::fecf;
use crate::frame::{DataFieldDesc, MissionPhaseParameters, TransferFrame, DEFAULT_DATA_FIELD_SIZE};
use crate::gvcid::Gvcid;
use crate::queue::FrameQueue;
use crate::services::{VcaService, VcfService};

fn send(queue: &FrameQueue, bytes: Vec<u8>, priority: u8, mode: BlockingMode) -> Result<()> {
    match mode {
        BlockingMode::Blocking => queue.send_blocking(bytes, priority),
        BlockingMode::NonBlocking => queue.send_nonblocking(bytes, priority),
    }
}

fn stamp_mc_frame_count(bytes: &mut [u8], count: u8) -> Result<()> {
    if bytes.len() < 3 {
        return Err(TmFrameError::SizeMismatch {
            expected: 3,
            actual: bytes.len(),
        });
    }
    bytes[2] = count;
    Ok(())
}

fn recompute_fecf(bytes: &mut [u8]) -> Result<()> {
    let len = bytes.len();
    if len < fecf::FECF_SIZE {
        return Err(TmFrameError::SizeMismatch {
            expected: fecf::FECF_SIZE,
            actual: len,
        });
    }
    let crc = fecf::checksum(&bytes[..len - fecf::FECF_SIZE]);
    bytes[len - 2..].copy_from_slice(&crc.to_be_bytes());
    Ok(())
}

/// A Virtual Channel: generates Transfer Frames from application SDUs and
/// enqueues them for its Master Channel to multiplex.
pub struct VirtualChannel {
    config: VirtualChannelConfig,
    vcf: VcfService<DEFAULT_DATA_FIELD_SIZE>,
    queue: FrameQueue,
}

impl VirtualChannel {
    pub fn new(gvcid: Gvcid, config: VirtualChannelConfig) -> Self {
        let queue = FrameQueue::create(
            "virtual_channel",
            config.queue.capacity,
            TransferFrame::<DEFAULT_DATA_FIELD_SIZE>::frame_size(),
        );
        Self {
            config,
            vcf: VcfService::new(gvcid),
            queue,
        }
    }

    pub fn vcid(&self) -> u8 {
        self.config.vcid
    }

    pub fn priority(&self) -> u8 {
        self.config.priority
    }

    /// Current Virtual Channel frame count.
    pub fn vc_frame_count(&self) -> u8 {
        self.vcf.vc_frame_count()
    }

    /// Receive an SDU, generate a Transfer Frame from it, and enqueue the
    /// serialized frame for this Virtual Channel's Master Channel. One
    /// full VC cycle.
    pub fn generate(
        &mut self,
        phase: &MissionPhaseParameters,
        sdu: Vec<u8>,
        status_fields: DataFieldDesc,
    ) -> Result<()> {
        let gvcid = Gvcid::new(phase.tfvn, phase.scid, self.config.vcid)?;
        let request = VcaService::request(sdu, status_fields, gvcid);
        let vcf_request = self.vcf.request(phase, request)?;
        let bytes = vcf_request.frame.serialize()?;
        send(&self.queue, bytes, self.config.priority, self.config.queue.mode)
    }

    /// Dequeue one serialized frame using the given blocking mode. This is
    /// the receive side a parent Master Channel uses during its own
    /// generation cycle; the mode is the *parent's* configured receive
    /// mode, not this Virtual Channel's own send mode.
    fn receive(&self, mode: BlockingMode) -> Result<Vec<u8>> {
        match mode {
            BlockingMode::Blocking => self.queue.receive_blocking(),
            BlockingMode::NonBlocking => self.queue.receive_nonblocking(),
        }
    }

    fn try_receive(&self) -> Result<Vec<u8>> {
        self.receive(BlockingMode::NonBlocking)
    }
}

/// A Master Channel: multiplexes `N` Virtual Channels, stamping each
/// forwarded frame with this Master Channel's own frame count.
pub struct MasterChannel<const N: usize> {
    virtual_channels: [VirtualChannel; N],
    mc_frame_count: u8,
    outbound: FrameQueue,
    priority: u8,
    outbound_mode: BlockingMode,
    receive_mode: BlockingMode,
}

impl<const N: usize> MasterChannel<N> {
    pub fn new(virtual_channels: [VirtualChannel; N], config: &MasterChannelConfig) -> Self {
        Self {
            virtual_channels,
            mc_frame_count: 0,
            outbound: FrameQueue::create(
                "master_channel",
                config.outbound_queue.capacity,
                TransferFrame::<DEFAULT_DATA_FIELD_SIZE>::frame_size(),
            ),
            priority: config.priority,
            outbound_mode: config.outbound_queue.mode,
            receive_mode: config.receive_mode,
        }
    }

    pub fn mc_frame_count(&self) -> u8 {
        self.mc_frame_count
    }

    /// This Master Channel's sending priority onto its Physical Channel.
    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn virtual_channel(&self, index: usize) -> Option<&VirtualChannel> {
        self.virtual_channels.get(index)
    }

    /// Run one multiplex cycle: visit every Virtual Channel in ascending
    /// index order, dequeue a frame from each using this Master Channel's
    /// configured receive mode, and only if every child has one ready,
    /// stamp each with the next `mc_frame_count` value (consecutive, in
    /// visit order), recompute its FECF, and enqueue it onto this Master
    /// Channel's outbound queue. Returns the number of frames forwarded
    /// (always `N` on success).
    pub fn generate_cycle(&mut self) -> Result<usize> {
        let mut collected = Vec::with_capacity(N);
        for (index, vc) in self.virtual_channels.iter().enumerate() {
            match vc.receive(self.receive_mode) {
                Ok(bytes) => collected.push((vc.priority(), bytes)),
                Err(err) => {
                    debug!(vc_index = index, %err, "master channel cycle aborted");
                    return Err(err);
                }
            }
        }

        let mut count = self.mc_frame_count;
        for (priority, mut bytes) in collected {
            stamp_mc_frame_count(&mut bytes, count)?;
            recompute_fecf(&mut bytes)?;
            send(&self.outbound, bytes, priority, self.outbound_mode)?;
            count = count.wrapping_add(1);
        }
        trace!(forwarded = N, mc_frame_count = count, "master channel cycle complete");
        self.mc_frame_count = count;
        Ok(N)
    }

    /// Dequeue one forwarded frame from this Master Channel's outbound
    /// queue using the given blocking mode. This is the receive side a
    /// parent Physical Channel uses during its own generation cycle.
    fn receive(&self, mode: BlockingMode) -> Result<Vec<u8>> {
        match mode {
            BlockingMode::Blocking => self.outbound.receive_blocking(),
            BlockingMode::NonBlocking => self.outbound.receive_nonblocking(),
        }
    }

    fn try_receive(&self) -> Result<Vec<u8>> {
        self.receive(BlockingMode::NonBlocking)
    }
}

/// A Physical Channel: multiplexes `N` Master Channels (each itself
/// multiplexing `M` Virtual Channels) onto a single outbound queue,
/// unchanged — there is no per-Physical-Channel counter in the Primary
/// Header to stamp.
pub struct PhysicalChannel<const N: usize, const M: usize> {
    master_channels: [MasterChannel<M>; N],
    outbound: FrameQueue,
    outbound_mode: BlockingMode,
    receive_mode: BlockingMode,
}

impl<const N: usize, const M: usize> PhysicalChannel<N, M> {
    pub fn new(master_channels: [MasterChannel<M>; N], config: &PhysicalChannelConfig) -> Self {
        Self {
            master_channels,
            outbound: FrameQueue::create(
                "physical_channel",
                config.outbound_queue.capacity,
                TransferFrame::<DEFAULT_DATA_FIELD_SIZE>::frame_size(),
            ),
            outbound_mode: config.outbound_queue.mode,
            receive_mode: config.receive_mode,
        }
    }

    pub fn master_channel(&self, index: usize) -> Option<&MasterChannel<M>> {
        self.master_channels.get(index)
    }

    pub fn master_channel_mut(&mut self, index: usize) -> Option<&mut MasterChannel<M>> {
        self.master_channels.get_mut(index)
    }

    /// Run one multiplex cycle: visit every Master Channel in ascending
    /// index order, dequeue a forwarded frame from each using this
    /// Physical Channel's configured receive mode, and only if every child
    /// has one ready, enqueue all of them onto this Physical Channel's
    /// outbound queue, unmodified.
    pub fn generate_cycle(&mut self) -> Result<usize> {
        let mut collected = Vec::with_capacity(N);
        for mc in self.master_channels.iter() {
            collected.push((mc.priority(), mc.receive(self.receive_mode)?));
        }
        for (priority, bytes) in collected {
            send(&self.outbound, bytes, priority, self.outbound_mode)?;
        }
        Ok(N)
    }

    pub fn receive(&self) -> Result<Vec<u8>> {
        self.outbound.receive_nonblocking()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::QueueConfig;
    use crate::frame::TransferFrame;
    use std::sync::{Arc, Mutex};
    use std::thread;

    fn phase() -> MissionPhaseParameters {
        MissionPhaseParameters::new(0, 0x2C, false).unwrap()
    }

    fn vc(vcid: u8, priority: u8) -> VirtualChannel {
        let gvcid = Gvcid::new(0, 0x2C, vcid).unwrap();
        let config = VirtualChannelConfig::new(
            vcid,
            priority,
            QueueConfig::new(8, BlockingMode::NonBlocking).unwrap(),
        )
        .unwrap();
        VirtualChannel::new(gvcid, config)
    }

    #[test]
    fn scenario_single_vc_single_frame_roundtrip() {
        let mut channel = vc(1, 0);
        channel
            .generate(&phase(), vec![0xAA; 247], DataFieldDesc::offset(0))
            .unwrap();

        let bytes = channel.try_receive().unwrap();
        let frame = TransferFrame::<247>::deserialize(&bytes).unwrap();
        assert_eq!(frame.primary_header.vcid, 1);
        assert_eq!(frame.primary_header.vc_frame_count, 0);
        assert_eq!(frame.data_field(), &[0xAA; 247][..]);
    }

    #[test]
    fn scenario_vc_frame_count_wraps_over_257_frames() {
        let mut channel = vc(0, 0);
        for i in 0..257u32 {
            channel
                .generate(&phase(), vec![i as u8; 247], DataFieldDesc::offset(0))
                .unwrap();
            let bytes = channel.try_receive().unwrap();
            let frame = TransferFrame::<247>::deserialize(&bytes).unwrap();
            assert_eq!(frame.primary_header.vc_frame_count, (i % 256) as u8);
        }
    }

    #[test]
    fn scenario_mc_multiplex_two_vcs() {
        let mc_config = MasterChannelConfig::new(
            phase(),
            vec![
                VirtualChannelConfig::new(0, 0, QueueConfig::new(4, BlockingMode::NonBlocking).unwrap())
                    .unwrap(),
                VirtualChannelConfig::new(1, 0, QueueConfig::new(4, BlockingMode::NonBlocking).unwrap())
                    .unwrap(),
            ],
            0,
            QueueConfig::new(8, BlockingMode::NonBlocking).unwrap(),
            BlockingMode::NonBlocking,
        )
        .unwrap();

        let mut vc0 = vc(0, 0);
        let mut vc1 = vc(1, 0);
        vc0.generate(&phase(), vec![1; 247], DataFieldDesc::offset(0)).unwrap();
        vc1.generate(&phase(), vec![2; 247], DataFieldDesc::offset(0)).unwrap();

        let mut mc = MasterChannel::new([vc0, vc1], &mc_config);
        let forwarded = mc.generate_cycle().unwrap();
        assert_eq!(forwarded, 2);
        assert_eq!(mc.mc_frame_count(), 2);

        let first = TransferFrame::<247>::deserialize(&mc.try_receive().unwrap()).unwrap();
        let second = TransferFrame::<247>::deserialize(&mc.try_receive().unwrap()).unwrap();
        assert_eq!(first.primary_header.vcid, 0);
        assert_eq!(first.primary_header.mc_frame_count, 0);
        assert_eq!(second.primary_header.vcid, 1);
        assert_eq!(second.primary_header.mc_frame_count, 1);
    }

    #[test]
    fn mc_cycle_is_all_or_nothing_when_one_vc_is_empty() {
        let mc_config = MasterChannelConfig::new(
            phase(),
            vec![
                VirtualChannelConfig::new(0, 0, QueueConfig::new(4, BlockingMode::NonBlocking).unwrap())
                    .unwrap(),
                VirtualChannelConfig::new(1, 0, QueueConfig::new(4, BlockingMode::NonBlocking).unwrap())
                    .unwrap(),
            ],
            0,
            QueueConfig::new(8, BlockingMode::NonBlocking).unwrap(),
            BlockingMode::NonBlocking,
        )
        .unwrap();

        let mut vc0 = vc(0, 0);
        let vc1 = vc(1, 0); // never fed, stays empty
        vc0.generate(&phase(), vec![1; 247], DataFieldDesc::offset(0)).unwrap();

        let mut mc = MasterChannel::new([vc0, vc1], &mc_config);
        assert!(matches!(
            mc.generate_cycle(),
            Err(TmFrameError::QueueEmpty(_))
        ));
        assert_eq!(mc.mc_frame_count(), 0);
        // vc0's frame was pulled off its queue by the aborted cycle and is
        // simply lost, matching the all-or-nothing contract: nothing about
        // a failed cycle is recoverable from the Master Channel's state.
        assert_eq!(mc.virtual_channel(0).unwrap().vc_frame_count(), 1);
    }

    #[test]
    fn scenario_nonblocking_queue_full_is_reported() {
        let mut channel = vc(0, 0);
        for _ in 0..8 {
            channel
                .generate(&phase(), vec![0; 247], DataFieldDesc::offset(0))
                .unwrap();
        }
        assert!(matches!(
            channel.generate(&phase(), vec![0; 247], DataFieldDesc::offset(0)),
            Err(TmFrameError::QueueFull(_))
        ));
    }

    #[test]
    fn scenario_crc_corruption_is_detected_end_to_end() {
        let mut channel = vc(0, 0);
        channel
            .generate(&phase(), vec![0x7E; 247], DataFieldDesc::offset(0))
            .unwrap();
        let mut bytes = channel.try_receive().unwrap();
        bytes[20] ^= 0x01;
        assert!(matches!(
            TransferFrame::<247>::deserialize(&bytes),
            Err(TmFrameError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn physical_channel_forwards_frames_from_two_master_channels_unmodified() {
        let queue_cfg = || QueueConfig::new(4, BlockingMode::NonBlocking).unwrap();
        let mc0_config = MasterChannelConfig::new(
            phase(),
            vec![VirtualChannelConfig::new(0, 0, queue_cfg()).unwrap()],
            0,
            queue_cfg(),
            BlockingMode::NonBlocking,
        )
        .unwrap();
        let mc1_config = MasterChannelConfig::new(
            phase(),
            vec![VirtualChannelConfig::new(0, 0, queue_cfg()).unwrap()],
            1,
            queue_cfg(),
            BlockingMode::NonBlocking,
        )
        .unwrap();

        let mut vc0 = vc(0, 0);
        vc0.generate(&phase(), vec![1; 247], DataFieldDesc::offset(0)).unwrap();
        let mut mc0 = MasterChannel::new([vc0], &mc0_config);
        mc0.generate_cycle().unwrap();

        let mut vc1 = vc(0, 0);
        vc1.generate(&phase(), vec![2; 247], DataFieldDesc::offset(0)).unwrap();
        let mut mc1 = MasterChannel::new([vc1], &mc1_config);
        mc1.generate_cycle().unwrap();

        let pc_outbound_cfg = QueueConfig::new(8, BlockingMode::NonBlocking).unwrap();
        let pc_config = PhysicalChannelConfig::new(
            vec![mc0_config, mc1_config],
            pc_outbound_cfg,
            BlockingMode::NonBlocking,
        )
        .unwrap();

        let mut pc = PhysicalChannel::new([mc0, mc1], &pc_config);
        let forwarded = pc.generate_cycle().unwrap();
        assert_eq!(forwarded, 2);

        let first = TransferFrame::<247>::deserialize(&pc.receive().unwrap()).unwrap();
        let second = TransferFrame::<247>::deserialize(&pc.receive().unwrap()).unwrap();
        assert_eq!(first.data_field(), &[1u8; 247][..]);
        assert_eq!(second.data_field(), &[2u8; 247][..]);
    }

    #[test]
    fn mc_generate_cycle_with_blocking_receive_mode_succeeds_once_fed() {
        // receive_mode: Blocking means the cycle's dequeue from each VC
        // uses receive_blocking rather than failing fast; with the frame
        // already queued this resolves immediately rather than suspending.
        let mc_config = MasterChannelConfig::new(
            phase(),
            vec![VirtualChannelConfig::new(0, 0, QueueConfig::new(4, BlockingMode::NonBlocking).unwrap())
                .unwrap()],
            0,
            QueueConfig::new(4, BlockingMode::NonBlocking).unwrap(),
            BlockingMode::Blocking,
        )
        .unwrap();

        let mut vc0 = vc(0, 0);
        vc0.generate(&phase(), vec![7; 247], DataFieldDesc::offset(0)).unwrap();

        let mut mc = MasterChannel::new([vc0], &mc_config);
        assert_eq!(mc.generate_cycle().unwrap(), 1);
    }

    #[test]
    fn threaded_producer_consumer_across_a_virtual_channel() {
        let channel = Arc::new(Mutex::new(vc(0, 0)));
        let producer = Arc::clone(&channel);
        let handle = thread::spawn(move || {
            for i in 0..16u32 {
                producer
                    .lock()
                    .unwrap()
                    .generate(&phase(), vec![i as u8; 247], DataFieldDesc::offset(0))
                    .unwrap();
            }
        });
        handle.join().unwrap();

        let consumer = channel.lock().unwrap();
        for i in 0..16u32 {
            let bytes = consumer.try_receive().unwrap();
            let frame = TransferFrame::<247>::deserialize(&bytes).unwrap();
            assert_eq!(frame.primary_header.vc_frame_count, i as u8);
        }
    }
}
