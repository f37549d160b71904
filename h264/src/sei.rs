use super::{sequence_parameter_set::HRDParameters, syntax_elements::*, Bitstream, BitstreamWriter, Decode, Encode};

use std::io;

pub const SEI_PAYLOAD_TYPE_BUFFERING_PERIOD: u64 = 0;
pub const SEI_PAYLOAD_TYPE_PIC_TIMING: u64 = 1;

// ITU-T H.264, 04/2017, 7.3.2.3.1
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SEIMessage {
    pub payload_type: u64,
    pub payload: Vec<u8>,
}

impl SEIMessage {
    /// Packs `payload` into its own byte-aligned buffer. An unaligned payload gets a single `1`
    /// bit followed by zero bits up to the next byte.
    pub fn new<V: Encode>(payload_type: u64, payload: &V) -> io::Result<Self> {
        let mut bs = BitstreamWriter::new();
        payload.encode(&mut bs)?;
        if !bs.byte_aligned() {
            bs.put_bits(1, 1)?;
        }
        Ok(Self {
            payload_type,
            payload: bs.finish().data,
        })
    }
}

fn decode_ff_coded<T: AsRef<[u8]>>(bs: &mut Bitstream<T>) -> io::Result<u64> {
    let mut value = 0;
    let mut byte = bs.read_bits(8)?;
    while byte == 0xff {
        value += byte;
        byte = bs.read_bits(8)?;
    }
    Ok(value + byte)
}

fn encode_ff_coded(bs: &mut BitstreamWriter, mut value: u64) -> io::Result<()> {
    while value >= 0xff {
        bs.put_bits(0xff, 8)?;
        value -= 0xff;
    }
    bs.put_bits(value as u32, 8)
}

impl Decode for SEIMessage {
    fn decode<T: AsRef<[u8]>>(bs: &mut Bitstream<T>) -> io::Result<Self> {
        let payload_type = decode_ff_coded(bs)?;
        let payload_size = decode_ff_coded(bs)?;
        if (bs.bits_remaining() as u64) < payload_size * 8 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "sei payload exceeds the rbsp"));
        }
        let mut payload = Vec::with_capacity(payload_size as usize);
        for _ in 0..payload_size {
            payload.push(bs.read_bits(8)? as u8);
        }
        Ok(Self { payload_type, payload })
    }
}

impl Encode for SEIMessage {
    fn encode(&self, bs: &mut BitstreamWriter) -> io::Result<()> {
        encode_ff_coded(bs, self.payload_type)?;
        encode_ff_coded(bs, self.payload.len() as u64)?;
        bs.put_bytes(&self.payload)
    }
}

// ITU-T H.264, 04/2017, 7.3.2.3
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SEI {
    pub messages: Vec<SEIMessage>,
}

impl Decode for SEI {
    fn decode<T: AsRef<[u8]>>(bs: &mut Bitstream<T>) -> io::Result<Self> {
        let mut ret = Self::default();
        loop {
            ret.messages.push(SEIMessage::decode(bs)?);
            if !bs.more_rbsp_data() {
                break;
            }
        }
        Ok(ret)
    }
}

impl Encode for SEI {
    fn encode(&self, bs: &mut BitstreamWriter) -> io::Result<()> {
        for message in &self.messages {
            message.encode(bs)?;
        }
        Ok(())
    }
}

// ITU-T H.264, 04/2017, D.1.2
//
// Only a single schedule is carried. The delay lengths come from the HRD parameters of the active
// SPS, so they travel with the values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BufferingPeriod {
    pub seq_parameter_set_id: UE,
    pub initial_cpb_removal_delay: u32,
    pub initial_cpb_removal_delay_offset: u32,
    pub initial_cpb_removal_delay_length: usize,
}

impl BufferingPeriod {
    pub fn decode<T: AsRef<[u8]>>(bs: &mut Bitstream<T>, hrd: &HRDParameters) -> io::Result<Self> {
        let length = hrd.initial_cpb_removal_delay_length_minus1.0 as usize + 1;
        Ok(Self {
            seq_parameter_set_id: UE::decode(bs)?,
            initial_cpb_removal_delay: bs.read_bits(length)? as u32,
            initial_cpb_removal_delay_offset: bs.read_bits(length)? as u32,
            initial_cpb_removal_delay_length: length,
        })
    }
}

impl Encode for BufferingPeriod {
    fn encode(&self, bs: &mut BitstreamWriter) -> io::Result<()> {
        self.seq_parameter_set_id.encode(bs)?;
        bs.put_bits(self.initial_cpb_removal_delay, self.initial_cpb_removal_delay_length)?;
        bs.put_bits(self.initial_cpb_removal_delay_offset, self.initial_cpb_removal_delay_length)
    }
}

// ITU-T H.264, 04/2017, D.1.3
//
// Only the HRD delays are carried, pic_struct is never signalled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PicTiming {
    pub cpb_removal_delay: u32,
    pub cpb_removal_delay_length: usize,
    pub dpb_output_delay: u32,
    pub dpb_output_delay_length: usize,
}

impl PicTiming {
    pub fn decode<T: AsRef<[u8]>>(bs: &mut Bitstream<T>, hrd: &HRDParameters) -> io::Result<Self> {
        let cpb_removal_delay_length = hrd.cpb_removal_delay_length_minus1.0 as usize + 1;
        let dpb_output_delay_length = hrd.dpb_output_delay_length_minus1.0 as usize + 1;
        Ok(Self {
            cpb_removal_delay: bs.read_bits(cpb_removal_delay_length)? as u32,
            cpb_removal_delay_length,
            dpb_output_delay: bs.read_bits(dpb_output_delay_length)? as u32,
            dpb_output_delay_length,
        })
    }
}

impl Encode for PicTiming {
    fn encode(&self, bs: &mut BitstreamWriter) -> io::Result<()> {
        bs.put_bits(self.cpb_removal_delay, self.cpb_removal_delay_length)?;
        bs.put_bits(self.dpb_output_delay, self.dpb_output_delay_length)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sei_message_payload_alignment() {
        let bp = BufferingPeriod {
            seq_parameter_set_id: UE(0),
            initial_cpb_removal_delay: 0,
            initial_cpb_removal_delay_offset: 0,
            initial_cpb_removal_delay_length: 24,
        };
        let message = SEIMessage::new(SEI_PAYLOAD_TYPE_BUFFERING_PERIOD, &bp).unwrap();
        // 49 bits of payload, then the stop bit.
        assert_eq!(message.payload, vec![0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x40]);

        let pt = PicTiming {
            cpb_removal_delay: 2,
            cpb_removal_delay_length: 8,
            dpb_output_delay: 4,
            dpb_output_delay_length: 8,
        };
        let message = SEIMessage::new(SEI_PAYLOAD_TYPE_PIC_TIMING, &pt).unwrap();
        assert_eq!(message.payload, vec![0x02, 0x04]);
    }

    #[test]
    fn test_sei_message_ff_coding() {
        let message = SEIMessage {
            payload_type: 300,
            payload: vec![0xaa; 255],
        };
        let mut bs = BitstreamWriter::new();
        message.encode(&mut bs).unwrap();
        let buf = bs.finish();
        assert_eq!(&buf.data[..4], &[0xff, 0x2d, 0xff, 0x00]);
        assert_eq!(buf.data.len(), 4 + 255);

        let decoded = SEIMessage::decode(&mut Bitstream::new(&buf)).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_sei_decode() {
        let hrd = HRDParameters {
            initial_cpb_removal_delay_length_minus1: U5(15),
            cpb_removal_delay_length_minus1: U5(7),
            dpb_output_delay_length_minus1: U5(7),
            ..Default::default()
        };

        let bp = BufferingPeriod {
            seq_parameter_set_id: UE(0),
            initial_cpb_removal_delay: 0x1234,
            initial_cpb_removal_delay_offset: 0x5678,
            initial_cpb_removal_delay_length: 16,
        };
        let pt = PicTiming {
            cpb_removal_delay: 6,
            cpb_removal_delay_length: 8,
            dpb_output_delay: 2,
            dpb_output_delay_length: 8,
        };

        let sei = SEI {
            messages: vec![
                SEIMessage::new(SEI_PAYLOAD_TYPE_BUFFERING_PERIOD, &bp).unwrap(),
                SEIMessage::new(SEI_PAYLOAD_TYPE_PIC_TIMING, &pt).unwrap(),
            ],
        };
        let mut bs = BitstreamWriter::new();
        sei.encode(&mut bs).unwrap();
        bs.rbsp_trailing_bits().unwrap();
        let buf = bs.finish();

        let decoded = SEI::decode(&mut Bitstream::new(&buf)).unwrap();
        assert_eq!(decoded, sei);

        let message = &decoded.messages[0];
        assert_eq!(message.payload_type, SEI_PAYLOAD_TYPE_BUFFERING_PERIOD);
        assert_eq!(BufferingPeriod::decode(&mut Bitstream::new(&message.payload), &hrd).unwrap(), bp);

        let message = &decoded.messages[1];
        assert_eq!(message.payload_type, SEI_PAYLOAD_TYPE_PIC_TIMING);
        assert_eq!(PicTiming::decode(&mut Bitstream::new(&message.payload), &hrd).unwrap(), pt);
    }
}
