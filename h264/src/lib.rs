use std::iter::Iterator;

pub mod bitstream;
pub use bitstream::*;

pub mod nal_unit;
pub use nal_unit::*;

pub mod packed_header;
pub use packed_header::*;

pub mod picture_parameter_set;
pub use picture_parameter_set::*;

pub mod sei;
pub use sei::*;

pub mod sequence_parameter_set;
pub use sequence_parameter_set::*;

pub mod syntax_elements;
pub use syntax_elements::*;

pub struct AnnexBIter<'a> {
    buf: &'a [u8],
}

/// Splits an Annex B byte stream, such as a run of packed headers, into NAL units without their
/// start codes.
pub fn iterate_annex_b<'a, T: AsRef<[u8]>>(buf: &'a T) -> AnnexBIter<'a> {
    AnnexBIter { buf: buf.as_ref() }
}

impl<'a> Iterator for AnnexBIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let mut pos = 0;
        loop {
            if pos >= self.buf.len() || self.buf[pos] != 0 {
                return None;
            } else if self.buf.len() - pos >= 3 && self.buf[pos + 1] == 0 && self.buf[pos + 2] == 1 {
                break;
            }
            pos += 1;
        }

        let nalu = pos + 3;
        let mut end = nalu;
        loop {
            // Any start code or trailing zero run begins with a zero byte.
            end = match memchr::memchr(0, &self.buf[end..]) {
                Some(offset) => end + offset,
                None => self.buf.len(),
            };
            if end == self.buf.len() || (self.buf.len() - end >= 3 && self.buf[end + 1] == 0 && self.buf[end + 2] <= 1) {
                let ret = &self.buf[nalu..end];
                self.buf = &self.buf[end..];
                return Some(ret);
            }
            end += 1;
        }
    }
}
