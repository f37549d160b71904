use super::{
    backend::CodedBufferId,
    config::{EncoderConfig, Profile, RateControlMode, MAX_REFERENCE_FRAMES},
    gop::{FrameDescriptor, FrameType},
    reference::{ReferencePicture, ReferenceTracker},
};
use h264::{
    BufferingPeriod, HRDParameters, PicTiming, PictureParameterSet, SEISched, SequenceParameterSet, VUIParameters, SE, U1, U32, U4, U5, U8, UE,
};

/// Level 4.1.
pub const DEFAULT_LEVEL_IDC: u8 = 41;

/// The number of entries in each slice reference list.
pub const MAX_REF_PIC_LIST_ENTRIES: usize = 32;

// The delays in the timing SEI and the HRD are expressed in a 90 kHz clock.
const HRD_CLOCK_RATE: u32 = 90_000;

// BitRate = (bit_rate_value_minus1 + 1) * 2^(6 + bit_rate_scale), E.2.2
const HRD_BIT_RATE_SCALE: u8 = 4;
// CpbSize = (cpb_size_value_minus1 + 1) * 2^(4 + cpb_size_scale), E.2.2
const HRD_CPB_SIZE_SCALE: u8 = 6;
const HRD_DELAY_LENGTH: usize = 24;

/// Slice types as the backend numbers them. IDR frames are coded as I slices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceType {
    P = 0,
    B = 1,
    I = 2,
}

impl From<FrameType> for SliceType {
    fn from(frame_type: FrameType) -> Self {
        match frame_type {
            FrameType::Idr | FrameType::I => Self::I,
            FrameType::P => Self::P,
            FrameType::B => Self::B,
        }
    }
}

/// Stream-level parameters submitted once, with the first frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceParameters {
    pub seq_parameter_set_id: u32,
    pub profile: Profile,
    pub level_idc: u8,
    pub intra_period: u32,
    pub intra_idr_period: u32,
    pub ip_period: u32,
    pub bits_per_second: u32,
    pub max_num_ref_frames: u32,
    pub picture_width_in_mbs: u32,
    pub picture_height_in_mbs: u32,
    /// In chroma sample units, like the SPS fields.
    pub frame_crop_right_offset: u32,
    pub frame_crop_bottom_offset: u32,
    pub log2_max_frame_num_minus4: u32,
    pub log2_max_pic_order_cnt_lsb_minus4: u32,
    pub num_units_in_tick: u32,
    pub time_scale: u32,
    pub vui_parameters_present_flag: bool,
}

impl SequenceParameters {
    pub fn new(config: &EncoderConfig) -> Self {
        let picture_width_in_mbs = config.width_in_mbs();
        let picture_height_in_mbs = config.height_in_mbs();
        Self {
            seq_parameter_set_id: 0,
            profile: config.profile,
            level_idc: DEFAULT_LEVEL_IDC,
            intra_period: config.gop.intra_period,
            intra_idr_period: config.gop.intra_idr_period,
            ip_period: config.gop.ip_period,
            bits_per_second: config.bitrate(),
            max_num_ref_frames: config.max_ref_frames as u32,
            picture_width_in_mbs,
            picture_height_in_mbs,
            // 4:2:0 crops in units of two samples.
            frame_crop_right_offset: (picture_width_in_mbs * 16 - config.width) / 2,
            frame_crop_bottom_offset: (picture_height_in_mbs * 16 - config.height) / 2,
            log2_max_frame_num_minus4: 0,
            log2_max_pic_order_cnt_lsb_minus4: 2,
            // Two ticks per frame.
            num_units_in_tick: 15,
            time_scale: 30 * config.frame_rate,
            vui_parameters_present_flag: config.vui,
        }
    }

    pub fn frame_cropping_flag(&self) -> bool {
        self.frame_crop_right_offset != 0 || self.frame_crop_bottom_offset != 0
    }

    pub fn max_frame_num(&self) -> u32 {
        1 << (self.log2_max_frame_num_minus4 + 4)
    }

    pub fn max_pic_order_cnt_lsb(&self) -> u32 {
        1 << (self.log2_max_pic_order_cnt_lsb_minus4 + 4)
    }

    pub fn num_macroblocks(&self) -> u32 {
        self.picture_width_in_mbs * self.picture_height_in_mbs
    }

    /// A single constant bit rate schedule with a one second buffer.
    pub fn hrd_parameters(&self) -> HRDParameters {
        let bit_rate_value = (self.bits_per_second >> (6 + HRD_BIT_RATE_SCALE)).max(1);
        let cpb_size_value = (self.bits_per_second >> (4 + HRD_CPB_SIZE_SCALE)).max(1);
        HRDParameters {
            cpb_cnt_minus1: UE(0),
            bit_rate_scale: U4(HRD_BIT_RATE_SCALE),
            cpb_size_scale: U4(HRD_CPB_SIZE_SCALE),
            sei_scheds: vec![SEISched {
                bit_rate_value_minus1: UE(bit_rate_value as u64 - 1),
                cpb_size_value_minus1: UE(cpb_size_value as u64 - 1),
                cbr_flag: U1(1),
            }],
            initial_cpb_removal_delay_length_minus1: U5(HRD_DELAY_LENGTH as u8 - 1),
            cpb_removal_delay_length_minus1: U5(HRD_DELAY_LENGTH as u8 - 1),
            dpb_output_delay_length_minus1: U5(HRD_DELAY_LENGTH as u8 - 1),
            time_offset_length: U5(HRD_DELAY_LENGTH as u8),
        }
    }

    fn vui_parameters(&self) -> VUIParameters {
        VUIParameters {
            timing_info_present_flag: U1(1),
            num_units_in_tick: U32(self.num_units_in_tick),
            time_scale: U32(self.time_scale),
            fixed_frame_rate_flag: U1(1),
            nal_hrd_parameters_present_flag: U1(1),
            nal_hrd_parameters: Some(self.hrd_parameters()),
            ..Default::default()
        }
    }

    pub fn to_sequence_parameter_set(&self) -> SequenceParameterSet {
        let flags = self.profile.constraint_set_flags();
        let flag = |n: u8| U1((flags >> n) & 1);
        SequenceParameterSet {
            profile_idc: U8(self.profile.profile_idc()),
            constraint_set0_flag: flag(0),
            constraint_set1_flag: flag(1),
            constraint_set2_flag: flag(2),
            constraint_set3_flag: flag(3),
            constraint_set4_flag: flag(4),
            constraint_set5_flag: flag(5),
            level_idc: U8(self.level_idc),
            seq_parameter_set_id: UE(self.seq_parameter_set_id as _),
            chroma_format_idc: UE(1),
            log2_max_frame_num_minus4: UE(self.log2_max_frame_num_minus4 as _),
            pic_order_cnt_type: UE(0),
            log2_max_pic_order_cnt_lsb_minus4: UE(self.log2_max_pic_order_cnt_lsb_minus4 as _),
            max_num_ref_frames: UE(self.max_num_ref_frames as _),
            pic_width_in_mbs_minus1: UE(self.picture_width_in_mbs as u64 - 1),
            pic_height_in_map_units_minus1: UE(self.picture_height_in_mbs as u64 - 1),
            frame_mbs_only_flag: U1(1),
            direct_8x8_inference_flag: U1(1),
            frame_cropping_flag: U1(self.frame_cropping_flag() as _),
            frame_crop_right_offset: UE(self.frame_crop_right_offset as _),
            frame_crop_bottom_offset: UE(self.frame_crop_bottom_offset as _),
            vui_parameters_present_flag: U1(self.vui_parameters_present_flag as _),
            vui_parameters: if self.vui_parameters_present_flag {
                self.vui_parameters()
            } else {
                VUIParameters::default()
            },
            ..Default::default()
        }
    }

    /// The buffering period sent with each IDR frame. The first picture leaves the buffer half a
    /// second after it starts arriving.
    pub fn buffering_period(&self) -> BufferingPeriod {
        BufferingPeriod {
            seq_parameter_set_id: UE(self.seq_parameter_set_id as _),
            initial_cpb_removal_delay: HRD_CLOCK_RATE / 2,
            initial_cpb_removal_delay_offset: 0,
            initial_cpb_removal_delay_length: HRD_DELAY_LENGTH,
        }
    }

    /// Picture timing in ticks. Removal is counted from the IDR frame that started the buffering
    /// period and output waits for the reordering that B frames introduce.
    pub fn pic_timing(&self, frame: &FrameDescriptor, idr_encode_order: u64) -> PicTiming {
        let mask = (1u64 << HRD_DELAY_LENGTH) - 1;
        let output_order = frame.display_order + self.ip_period as u64 - 1;
        PicTiming {
            cpb_removal_delay: ((2 * frame.encode_order.saturating_sub(idr_encode_order)) & mask) as u32,
            cpb_removal_delay_length: HRD_DELAY_LENGTH,
            dpb_output_delay: ((2 * output_order.saturating_sub(frame.encode_order)) & mask) as u32,
            dpb_output_delay_length: HRD_DELAY_LENGTH,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateControlParameters {
    pub mode: RateControlMode,
    pub bits_per_second: u32,
    pub initial_qp: u8,
    pub min_qp: u8,
}

impl RateControlParameters {
    pub fn new(config: &EncoderConfig) -> Self {
        Self {
            mode: config.rate_control,
            bits_per_second: config.bitrate(),
            initial_qp: config.initial_qp,
            min_qp: config.minimal_qp,
        }
    }
}

/// Per-frame parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct PictureParameters {
    /// The reference surface the reconstructed picture is written to.
    pub current_picture: ReferencePicture,
    pub reference_frames: [Option<ReferencePicture>; MAX_REFERENCE_FRAMES],
    pub coded_buffer: CodedBufferId,
    pub seq_parameter_set_id: u32,
    pub pic_parameter_set_id: u32,
    pub frame_num: u32,
    pub pic_init_qp: u8,
    pub idr_pic_flag: bool,
    pub reference_pic_flag: bool,
    pub entropy_coding_mode_flag: bool,
    pub deblocking_filter_control_present_flag: bool,
    pub transform_8x8_mode_flag: bool,
    /// Set on the final frame of the stream.
    pub last_picture: bool,
}

impl PictureParameters {
    pub fn new(config: &EncoderConfig, frame: &FrameDescriptor, current_picture: ReferencePicture, frame_num: u32, coded_buffer: CodedBufferId) -> Self {
        Self {
            current_picture,
            reference_frames: [None; MAX_REFERENCE_FRAMES],
            coded_buffer,
            seq_parameter_set_id: 0,
            pic_parameter_set_id: 0,
            frame_num,
            pic_init_qp: config.initial_qp,
            idr_pic_flag: frame.frame_type == FrameType::Idr,
            reference_pic_flag: frame.frame_type.is_reference(),
            entropy_coding_mode_flag: config.profile.supports_cabac(),
            deblocking_filter_control_present_flag: true,
            transform_8x8_mode_flag: config.profile == Profile::High,
            last_picture: frame.encode_order + 1 == config.frame_count,
        }
    }

    /// Fills the reference frames with the pictures `frame_type` predicts from.
    pub fn set_references(&mut self, tracker: &ReferenceTracker, frame_type: FrameType) {
        self.reference_frames = [None; MAX_REFERENCE_FRAMES];
        for (entry, picture) in self.reference_frames.iter_mut().zip(tracker.reference_list(frame_type)) {
            *entry = Some(picture);
        }
    }

    pub fn to_picture_parameter_set(&self) -> PictureParameterSet {
        PictureParameterSet {
            pic_parameter_set_id: UE(self.pic_parameter_set_id as _),
            seq_parameter_set_id: UE(self.seq_parameter_set_id as _),
            entropy_coding_mode_flag: U1(self.entropy_coding_mode_flag as _),
            pic_init_qp_minus26: SE(self.pic_init_qp as i64 - 26),
            deblocking_filter_control_present_flag: U1(self.deblocking_filter_control_present_flag as _),
            transform_8x8_mode_flag: U1(self.transform_8x8_mode_flag as _),
            ..Default::default()
        }
    }
}

/// Describes the single slice that covers each frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SliceParameters {
    pub macroblock_address: u32,
    pub num_macroblocks: u32,
    pub slice_type: SliceType,
    pub num_ref_idx_active_override_flag: bool,
    pub num_ref_idx_l0_active_minus1: u32,
    pub num_ref_idx_l1_active_minus1: u32,
    pub ref_pic_list0: [Option<ReferencePicture>; MAX_REF_PIC_LIST_ENTRIES],
    pub ref_pic_list1: [Option<ReferencePicture>; MAX_REF_PIC_LIST_ENTRIES],
    pub slice_alpha_c0_offset_div2: i8,
    pub slice_beta_offset_div2: i8,
    pub pic_order_cnt_lsb: u32,
}

impl SliceParameters {
    /// A slice whose reference lists are left to the backend.
    pub fn new(sequence: &SequenceParameters, frame: &FrameDescriptor) -> Self {
        Self {
            macroblock_address: 0,
            num_macroblocks: sequence.num_macroblocks(),
            slice_type: frame.frame_type.into(),
            num_ref_idx_active_override_flag: false,
            num_ref_idx_l0_active_minus1: 0,
            num_ref_idx_l1_active_minus1: 0,
            ref_pic_list0: [None; MAX_REF_PIC_LIST_ENTRIES],
            ref_pic_list1: [None; MAX_REF_PIC_LIST_ENTRIES],
            slice_alpha_c0_offset_div2: 2,
            slice_beta_offset_div2: 2,
            pic_order_cnt_lsb: (frame.display_order % sequence.max_pic_order_cnt_lsb() as u64) as u32,
        }
    }

    /// Sets the lists explicitly: P slices predict from the last reference, and B slices from the
    /// second to last in list 0 and the last in list 1.
    pub fn override_references(&mut self, tracker: &ReferenceTracker, frame_type: FrameType) {
        self.num_ref_idx_active_override_flag = true;
        self.num_ref_idx_l0_active_minus1 = 0;
        self.num_ref_idx_l1_active_minus1 = 0;
        match frame_type {
            FrameType::Idr | FrameType::I => {}
            FrameType::P => self.ref_pic_list0[0] = tracker.last().copied(),
            FrameType::B => {
                self.ref_pic_list0[0] = tracker.second_last().copied();
                self.ref_pic_list1[0] = tracker.last().copied();
            }
        }
    }
}
