use super::{decode, encode, syntax_elements::*, Bitstream, BitstreamWriter, Decode, Encode};

use std::{convert::TryFrom, io};

/// The first byte of each NALU contains its type. If you just need the type without decoding the
/// NALU, mask the first byte with this.
pub const NAL_UNIT_TYPE_MASK: u8 = 0x1f;

pub const NAL_UNIT_TYPE_SEQUENCE_PARAMETER_SET: u8 = 7;
pub const NAL_UNIT_TYPE_PICTURE_PARAMETER_SET: u8 = 8;

/// Annex B start code written in front of every packed NAL unit.
pub const START_CODE_PREFIX: u32 = 0x00000001;

// ITU-T H.264, 04/2017, Table 7-1
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum NalUnitType {
    NonIdrSlice = 1,
    IdrSlice = 5,
    Sei = 6,
    SequenceParameterSet = NAL_UNIT_TYPE_SEQUENCE_PARAMETER_SET,
    PictureParameterSet = NAL_UNIT_TYPE_PICTURE_PARAMETER_SET,
}

impl TryFrom<u8> for NalUnitType {
    type Error = io::Error;

    fn try_from(v: u8) -> io::Result<Self> {
        Ok(match v {
            1 => Self::NonIdrSlice,
            5 => Self::IdrSlice,
            6 => Self::Sei,
            NAL_UNIT_TYPE_SEQUENCE_PARAMETER_SET => Self::SequenceParameterSet,
            NAL_UNIT_TYPE_PICTURE_PARAMETER_SET => Self::PictureParameterSet,
            _ => return Err(io::Error::new(io::ErrorKind::Other, "unsupported nal_unit_type")),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum NalRefIdc {
    None = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

// ITU-T H.264, 04/2017, 7.3.1
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NALUnitHeader {
    pub forbidden_zero_bit: F1,
    pub nal_ref_idc: U2,
    pub nal_unit_type: U5,
}

impl NALUnitHeader {
    pub fn new(nal_ref_idc: NalRefIdc, nal_unit_type: NalUnitType) -> Self {
        Self {
            forbidden_zero_bit: F1(0),
            nal_ref_idc: U2(nal_ref_idc as u8),
            nal_unit_type: U5(nal_unit_type as u8),
        }
    }
}

impl Decode for NALUnitHeader {
    fn decode<T: AsRef<[u8]>>(bs: &mut Bitstream<T>) -> io::Result<Self> {
        let mut ret = Self::default();

        decode!(bs, &mut ret.forbidden_zero_bit, &mut ret.nal_ref_idc, &mut ret.nal_unit_type)?;

        if ret.forbidden_zero_bit.0 != 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "non-zero forbidden_zero_bit"));
        }

        Ok(ret)
    }
}

impl Encode for NALUnitHeader {
    fn encode(&self, bs: &mut BitstreamWriter) -> io::Result<()> {
        encode!(bs, &self.forbidden_zero_bit, &self.nal_ref_idc, &self.nal_unit_type)
    }
}

// ITU-T H.264, 04/2017, 7.3.1
#[derive(Default)]
pub struct NALUnit {
    pub header: NALUnitHeader,
    pub rbsp_byte: Vec<u8>,
}

pub fn decode_rbsp<T: AsRef<[u8]>>(bs: &mut Bitstream<T>) -> io::Result<Vec<u8>> {
    let mut rbsp = Vec::with_capacity(bs.bits_remaining() / 8);
    while bs.bits_remaining() >= 8 {
        if bs.next_bits(24) == Some(0x000003) {
            rbsp.push(0);
            rbsp.push(0);
            bs.advance_bits(24);
        } else {
            rbsp.push(bs.read_bits(8)? as u8);
        }
    }
    Ok(rbsp)
}

impl Decode for NALUnit {
    fn decode<T: AsRef<[u8]>>(bs: &mut Bitstream<T>) -> io::Result<Self> {
        let header = NALUnitHeader::decode(bs)?;

        match header.nal_unit_type.0 {
            14 | 20 | 21 => return Err(io::Error::new(io::ErrorKind::Other, "unsupported nal_unit_type")),
            _ => {}
        }

        Ok(Self {
            header,
            rbsp_byte: decode_rbsp(bs)?,
        })
    }
}
