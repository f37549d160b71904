use super::{Bitstream, BitstreamWriter, Decode, Encode};

use std::io;

// ITU-T H.264, 04/2017, 7.2
macro_rules! define_syntax_element_u {
    ($e:ident, $t:tt, $n:literal) => {
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
        pub struct $e(pub $t);

        impl Decode for $e {
            fn decode<T: AsRef<[u8]>>(bs: &mut Bitstream<T>) -> io::Result<Self> {
                Ok(Self(bs.read_bits($n)? as _))
            }
        }

        impl Encode for $e {
            fn encode(&self, bs: &mut BitstreamWriter) -> io::Result<()> {
                bs.put_bits_u64(self.0 as u64, $n)
            }
        }
    };
}

define_syntax_element_u!(U1, u8, 1);
define_syntax_element_u!(U2, u8, 2);
define_syntax_element_u!(U3, u8, 3);
define_syntax_element_u!(U4, u8, 4);
define_syntax_element_u!(U5, u8, 5);
define_syntax_element_u!(U6, u8, 6);
define_syntax_element_u!(U7, u8, 7);
define_syntax_element_u!(U8, u8, 8);
define_syntax_element_u!(U16, u16, 16);
define_syntax_element_u!(U32, u32, 32);
define_syntax_element_u!(U48, u64, 48);

// ITU-T H.264, 04/2017, 7.2
define_syntax_element_u!(F1, u8, 1);

// ITU-T H.264, 04/2017, 7.2 / 9.1
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UE(pub u64);

impl Decode for UE {
    fn decode<T: AsRef<[u8]>>(bs: &mut Bitstream<T>) -> io::Result<Self> {
        let mut leading_zero_bits = 0;
        while bs.read_bits(1)? == 0 {
            leading_zero_bits += 1;
        }
        Ok(Self(bs.read_bits(leading_zero_bits)? + (1 << leading_zero_bits) - 1))
    }
}

impl Encode for UE {
    fn encode(&self, bs: &mut BitstreamWriter) -> io::Result<()> {
        bs.put_ue(self.0)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SE(pub i64);

impl Decode for SE {
    fn decode<T: AsRef<[u8]>>(bs: &mut Bitstream<T>) -> io::Result<Self> {
        let ue = UE::decode(bs)?;
        let mut value = ((ue.0 >> 1) + (ue.0 & 1)) as i64;
        if (ue.0 & 1) == 0 {
            value = -value;
        }
        Ok(Self(value))
    }
}

impl Encode for SE {
    fn encode(&self, bs: &mut BitstreamWriter) -> io::Result<()> {
        bs.put_se(self.0)
    }
}
