#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameType {
    Idr,
    I,
    P,
    B,
}

impl FrameType {
    /// B frames are never used as references.
    pub fn is_reference(self) -> bool {
        self != Self::B
    }

    pub fn is_intra(self) -> bool {
        matches!(self, Self::Idr | Self::I)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub encode_order: u64,
    pub display_order: u64,
    pub frame_type: FrameType,
}

/// Maps a frame's position in encode order to its position in display order and its type.
///
/// IDR frames start each group. Within a group, every `ip_period`th frame is a P or I frame shown
/// `ip_period - 1` frames later than it's encoded, and the frames between are B frames shown one
/// frame earlier than they're encoded. When B frames are in use, a group spans
/// `intra_idr_period + 1` frames in encode order.
///
/// The periods must satisfy `GopConfig::validate`. In particular, `ip_period` must be non-zero.
pub fn schedule(encode_order: u64, intra_period: u32, intra_idr_period: u32, ip_period: u32) -> FrameDescriptor {
    let descriptor = |display_order, frame_type| FrameDescriptor {
        encode_order,
        display_order,
        frame_type,
    };

    if intra_period == 1 {
        let is_idr = if intra_idr_period == 0 {
            encode_order == 0
        } else {
            encode_order % intra_idr_period as u64 == 0
        };
        return descriptor(encode_order, if is_idr { FrameType::Idr } else { FrameType::I });
    }

    let intra_period = intra_period as u64;
    let ip_period = ip_period as u64;
    let intra_idr_period = if intra_period == 0 { 0 } else { intra_idr_period as u64 };

    let group_index = if intra_idr_period == 0 {
        encode_order
    } else {
        encode_order % (intra_idr_period + if ip_period == 1 { 0 } else { 1 })
    };

    if group_index == 0 {
        descriptor(encode_order, FrameType::Idr)
    } else if (group_index - 1) % ip_period != 0 {
        descriptor(encode_order - 1, FrameType::B)
    } else {
        // The first P slot after the IDR frame is never promoted to I.
        let is_intra_boundary = intra_period != 0
            && group_index >= 2
            && if ip_period == 1 {
                group_index % intra_period == 0
            } else {
                (group_index - 1) / ip_period % (intra_period / ip_period) == 0
            };
        descriptor(
            encode_order + ip_period - 1,
            if is_intra_boundary { FrameType::I } else { FrameType::P },
        )
    }
}
