//! Builders for Annex B header NAL units that an encoder submits alongside its own slice data.
//!
//! The output is the raw RBSP behind a 4-byte start code. Emulation prevention bytes are not
//! inserted; consumers of packed headers are expected to add them.

use super::{
    nal_unit::*, picture_parameter_set::PictureParameterSet, sei::*, sequence_parameter_set::SequenceParameterSet, BitBuffer, BitstreamWriter, Encode,
};

use std::io;

/// A finished header NAL unit. `bit_length` covers the start code and the trailing bits.
pub type PackedHeader = BitBuffer;

fn build_packed_nal_unit<V: Encode + ?Sized>(nal_ref_idc: NalRefIdc, nal_unit_type: NalUnitType, rbsp: &V) -> io::Result<PackedHeader> {
    let mut bs = BitstreamWriter::new();
    bs.put_bits(START_CODE_PREFIX, 32)?;
    bs.encode(&NALUnitHeader::new(nal_ref_idc, nal_unit_type))?;
    bs.encode(rbsp)?;
    bs.rbsp_trailing_bits()?;
    Ok(bs.finish())
}

pub fn build_packed_sequence_header(sps: &SequenceParameterSet) -> io::Result<PackedHeader> {
    build_packed_nal_unit(NalRefIdc::High, NalUnitType::SequenceParameterSet, sps)
}

pub fn build_packed_picture_header(pps: &PictureParameterSet) -> io::Result<PackedHeader> {
    build_packed_nal_unit(NalRefIdc::High, NalUnitType::PictureParameterSet, pps)
}

/// Builds a single SEI NAL unit carrying a buffering period message followed by a picture timing
/// message.
pub fn build_packed_sei_timing(buffering_period: &BufferingPeriod, pic_timing: &PicTiming) -> io::Result<PackedHeader> {
    let sei = SEI {
        messages: vec![
            SEIMessage::new(SEI_PAYLOAD_TYPE_BUFFERING_PERIOD, buffering_period)?,
            SEIMessage::new(SEI_PAYLOAD_TYPE_PIC_TIMING, pic_timing)?,
        ],
    };
    build_packed_nal_unit(NalRefIdc::None, NalUnitType::Sei, &sei)
}
