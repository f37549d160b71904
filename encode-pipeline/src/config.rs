use super::{
    error::{invalid_configuration, Result},
    gop::{schedule, FrameDescriptor},
};
use h264::{PROFILE_IDC_BASELINE, PROFILE_IDC_HIGH, PROFILE_IDC_MAIN};
use log::warn;

/// The number of reference frame slots a picture can carry.
pub const MAX_REFERENCE_FRAMES: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    Baseline,
    ConstrainedBaseline,
    Main,
    High,
}

impl Profile {
    pub fn profile_idc(self) -> u8 {
        match self {
            Self::Baseline | Self::ConstrainedBaseline => PROFILE_IDC_BASELINE,
            Self::Main => PROFILE_IDC_MAIN,
            Self::High => PROFILE_IDC_HIGH,
        }
    }

    /// Bit `n` is constraint_set`n`_flag.
    pub fn constraint_set_flags(self) -> u8 {
        match self {
            // ITU-T H.264, 04/2017, A.2.1
            Self::Baseline => 1 << 0,
            // ITU-T H.264, 04/2017, A.2.2
            Self::ConstrainedBaseline => 1 << 0 | 1 << 1,
            Self::Main => 1 << 1,
            // ITU-T H.264, 04/2017, A.2.4
            Self::High => 1 << 3,
        }
    }

    /// Baseline profiles can't code B slices.
    pub fn supports_b_frames(self) -> bool {
        matches!(self, Self::Main | Self::High)
    }

    /// Baseline profiles are restricted to CAVLC.
    pub fn supports_cabac(self) -> bool {
        matches!(self, Self::Main | Self::High)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateControlMode {
    None,
    Cbr,
    Vbr,
    Vcm,
    Cqp,
    VbrConstrained,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GopConfig {
    /// The distance between intra frames. 0 disables periodic intra frames entirely and 1 makes
    /// every frame intra.
    pub intra_period: u32,
    /// The distance between IDR frames. 0 means only the first frame is an IDR frame.
    pub intra_idr_period: u32,
    /// The distance between reference frames. Each step carries `ip_period - 1` B frames.
    pub ip_period: u32,
}

impl Default for GopConfig {
    fn default() -> Self {
        Self {
            intra_period: 30,
            intra_idr_period: 60,
            ip_period: 1,
        }
    }
}

impl GopConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ip_period < 1 {
            return invalid_configuration("ip_period must be at least 1");
        } else if self.intra_period != 1 && self.intra_period % self.ip_period != 0 {
            return invalid_configuration(format!(
                "intra_period ({}) must be a multiple of ip_period ({})",
                self.intra_period, self.ip_period
            ));
        } else if self.intra_period != 0 && self.intra_idr_period % self.intra_period != 0 {
            return invalid_configuration(format!(
                "intra_idr_period ({}) must be a multiple of intra_period ({})",
                self.intra_idr_period, self.intra_period
            ));
        }
        Ok(())
    }

    pub fn has_b_frames(&self) -> bool {
        self.intra_period != 1 && self.ip_period > 1
    }

    /// Schedules the frame at `encode_order`. The config must be valid.
    pub fn schedule(&self, encode_order: u64) -> FrameDescriptor {
        schedule(encode_order, self.intra_period, self.intra_idr_period, self.ip_period)
    }
}

#[derive(Clone, Debug)]
pub struct EncoderConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub frame_count: u64,
    /// Defaults to `width * height * 12 * frame_rate / 50` bits per second.
    pub bitrate: Option<u32>,
    pub initial_qp: u8,
    pub minimal_qp: u8,
    pub gop: GopConfig,
    pub profile: Profile,
    pub rate_control: RateControlMode,
    /// The number of source surfaces, and of coded buffers, in the pool.
    pub surface_count: usize,
    pub max_ref_frames: usize,
    /// Enumerates every reference surface for each picture and overrides each slice's reference
    /// lists instead of letting the backend build them.
    pub ref_override: bool,
    /// Runs post-processing inline instead of on a worker thread.
    pub sync_mode: bool,
    /// Submits packed SPS and PPS NAL units with the first frame.
    pub packed_headers: bool,
    /// Submits a buffering period and picture timing SEI with each IDR frame.
    pub timing_sei: bool,
    /// Signals timing and HRD information in the SPS.
    pub vui: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            width: 176,
            height: 144,
            frame_rate: 30,
            frame_count: 60,
            bitrate: None,
            initial_qp: 28,
            minimal_qp: 0,
            gop: GopConfig::default(),
            profile: Profile::High,
            rate_control: RateControlMode::Vbr,
            surface_count: 16,
            max_ref_frames: 3,
            ref_override: false,
            sync_mode: false,
            packed_headers: true,
            timing_sei: false,
            vui: false,
        }
    }
}

impl EncoderConfig {
    /// Rejects configurations that can't be scheduled or submitted. Nothing is sent to the
    /// backend before this passes.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return invalid_configuration("frame dimensions must be non-zero");
        } else if self.width % 2 != 0 || self.height % 2 != 0 {
            return invalid_configuration(format!("frame dimensions ({}x{}) must be even", self.width, self.height));
        } else if self.frame_rate == 0 {
            return invalid_configuration("frame_rate must be non-zero");
        } else if self.frame_count == 0 {
            return invalid_configuration("frame_count must be non-zero");
        } else if self.bitrate == Some(0) {
            return invalid_configuration("bitrate must be non-zero");
        } else if self.initial_qp > 51 || self.minimal_qp > 51 {
            return invalid_configuration("qp values must not exceed 51");
        } else if self.surface_count == 0 {
            return invalid_configuration("surface_count must be non-zero");
        } else if self.max_ref_frames == 0 || self.max_ref_frames > MAX_REFERENCE_FRAMES {
            return invalid_configuration(format!("max_ref_frames must be between 1 and {}", MAX_REFERENCE_FRAMES));
        } else if self.timing_sei && !(self.vui && self.packed_headers) {
            return invalid_configuration("timing_sei requires vui and packed_headers");
        }

        self.gop.validate()?;

        if self.gop.has_b_frames() {
            if !self.profile.supports_b_frames() {
                return invalid_configuration(format!("{:?} profile doesn't support B frames", self.profile));
            } else if self.max_ref_frames < 3 {
                // B frames reconstruct into the slot after the two references they use.
                return invalid_configuration("B frames need at least 3 reference frames");
            } else if self.surface_count < self.gop.ip_period as usize {
                // A P frame is submitted ahead of the B frames shown before it, so the whole run
                // of ip_period frames needs distinct surfaces.
                return invalid_configuration(format!(
                    "surface_count ({}) must be at least ip_period ({}) when B frames are used",
                    self.surface_count, self.gop.ip_period
                ));
            }
        }

        Ok(())
    }

    /// Baseline profiles are forced to `ip_period = 1` since they can't code B frames.
    pub fn constrain_to_profile(&mut self) {
        if !self.profile.supports_b_frames() && self.gop.ip_period != 1 {
            warn!("{:?} profile doesn't support B frames, forcing ip_period from {} to 1", self.profile, self.gop.ip_period);
            self.gop.ip_period = 1;
        }
    }

    pub fn bitrate(&self) -> u32 {
        self.bitrate
            .unwrap_or_else(|| (self.width as u64 * self.height as u64 * 12 * self.frame_rate as u64 / 50).min(u32::MAX as u64) as u32)
    }

    pub fn coded_buffer_size(&self) -> usize {
        self.width as usize * self.height as usize * 400 / (16 * 16)
    }

    pub fn width_in_mbs(&self) -> u32 {
        (self.width + 15) / 16
    }

    pub fn height_in_mbs(&self) -> u32 {
        (self.height + 15) / 16
    }
}
