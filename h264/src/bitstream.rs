use std::io;

pub struct Bitstream<T> {
    inner: T,
    bit_offset: usize,
}

impl<T: AsRef<[u8]>> Bitstream<T> {
    pub fn new(inner: T) -> Self {
        Self { inner, bit_offset: 0 }
    }

    pub fn bits_remaining(&self) -> usize {
        self.inner.as_ref().len() * 8 - self.bit_offset
    }

    pub fn byte_aligned(&self) -> bool {
        self.bit_offset % 8 == 0
    }

    pub fn advance_bits(&mut self, n: usize) -> bool {
        if self.bits_remaining() < n {
            return false;
        }
        self.bit_offset += n;
        return true;
    }

    pub fn next_bits(&self, n: usize) -> Option<u64> {
        if self.bits_remaining() < n {
            return None;
        }
        let mut ret = 0;
        let data = self.inner.as_ref();
        for i in 0..n {
            ret = (ret << 1) | ((data[(self.bit_offset + i) / 8] >> (8 - (self.bit_offset + i) % 8 - 1)) & 1) as u64;
        }
        Some(ret)
    }

    pub fn read_bits(&mut self, n: usize) -> io::Result<u64> {
        match self.next_bits(n) {
            Some(ret) => {
                self.bit_offset += n;
                Ok(ret)
            }
            None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "unexpected end of bitstream")),
        }
    }

    // ITU-T H.264, 04/2017, 7.2
    pub fn more_rbsp_data(&self) -> bool {
        let data = self.inner.as_ref();
        let last_one = match data.iter().rposition(|&b| b != 0) {
            Some(pos) => pos * 8 + 7 - data[pos].trailing_zeros() as usize,
            None => return false,
        };
        self.bit_offset < last_one
    }

    pub fn decode<V: Decode>(&mut self, v: &mut V) -> io::Result<()> {
        *v = V::decode(self)?;
        Ok(())
    }
}

pub trait Decode: Sized {
    fn decode<T: AsRef<[u8]>>(bs: &mut Bitstream<T>) -> io::Result<Self>;
}

#[macro_export]
macro_rules! decode {
    ($b:expr, $e:expr) => {{
        $b.decode($e)
    }};
    ($b:expr, $e:expr, $($r:expr),+) => {
        decode!($b, $e).and(decode!($b, $($r),+))
    };
}

/// The number of 32-bit words a `BitstreamWriter` allocates at a time.
pub const BITSTREAM_ALLOCATE_STEPPING: usize = 4096;

/// Bits packed by a `BitstreamWriter`. Only the first `bit_length` bits of `data` are meaningful,
/// the rest of the final byte is zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitBuffer {
    pub data: Vec<u8>,
    pub bit_length: usize,
}

impl BitBuffer {
    pub fn byte_length(&self) -> usize {
        (self.bit_length + 7) / 8
    }
}

impl AsRef<[u8]> for BitBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Packs bits MSB first into 32-bit words. Words are kept in host order while they're being filled
/// and are converted to network order as soon as they're full.
pub struct BitstreamWriter {
    words: Vec<u32>,
    bit_offset: usize,
}

impl Default for BitstreamWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitstreamWriter {
    pub fn new() -> Self {
        Self {
            words: vec![0; BITSTREAM_ALLOCATE_STEPPING],
            bit_offset: 0,
        }
    }

    /// The number of bits written so far.
    pub fn bit_offset(&self) -> usize {
        self.bit_offset
    }

    /// The allocated capacity in bits.
    pub fn capacity_bits(&self) -> usize {
        self.words.len() * 32
    }

    pub fn byte_aligned(&self) -> bool {
        self.bit_offset % 8 == 0
    }

    fn grow(&mut self) -> io::Result<()> {
        self.words
            .try_reserve_exact(BITSTREAM_ALLOCATE_STEPPING)
            .map_err(|_| io::Error::new(io::ErrorKind::OutOfMemory, "unable to grow bitstream buffer"))?;
        self.words.resize(self.words.len() + BITSTREAM_ALLOCATE_STEPPING, 0);
        Ok(())
    }

    /// Writes the low `n` bits of `value`, most significant first. `n` must not exceed 32.
    pub fn put_bits(&mut self, value: u32, n: usize) -> io::Result<()> {
        if n == 0 {
            return Ok(());
        } else if n > 32 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "at most 32 bits can be written at once"));
        }

        let value = if n == 32 { value } else { value & ((1 << n) - 1) };
        let pos = self.bit_offset >> 5;
        let bit_left = 32 - (self.bit_offset & 0x1f);

        if bit_left > n {
            self.words[pos] = self.words[pos] << n | value;
        } else {
            let low_bits = n - bit_left;
            self.words[pos] = (((self.words[pos] as u64) << bit_left) as u32 | (value >> low_bits)).to_be();

            if pos + 1 == self.words.len() {
                self.grow()?;
            }

            self.words[pos + 1] = if low_bits == 0 { 0 } else { value & ((1 << low_bits) - 1) };
        }

        self.bit_offset += n;
        Ok(())
    }

    /// Writes the low `n` bits of `value`, most significant first. `n` must not exceed 64.
    pub fn put_bits_u64(&mut self, value: u64, n: usize) -> io::Result<()> {
        if n > 64 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "at most 64 bits can be written at once"));
        } else if n > 32 {
            self.put_bits((value >> 32) as u32, n - 32)?;
            self.put_bits(value as u32, 32)
        } else {
            self.put_bits(value as u32, n)
        }
    }

    // ITU-T H.264, 04/2017, 9.1
    pub fn put_ue(&mut self, value: u64) -> io::Result<()> {
        let code_num = value
            .checked_add(1)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "value is too large for exp-golomb coding"))?;
        let size_in_bits = 64 - code_num.leading_zeros() as usize;

        let mut leading_zero_bits = size_in_bits - 1;
        while leading_zero_bits > 0 {
            let n = leading_zero_bits.min(32);
            self.put_bits(0, n)?;
            leading_zero_bits -= n;
        }
        self.put_bits_u64(code_num, size_in_bits)
    }

    // ITU-T H.264, 04/2017, 9.1.1
    pub fn put_se(&mut self, value: i64) -> io::Result<()> {
        let mapped = if value > 0 {
            2 * value as u64 - 1
        } else {
            value
                .unsigned_abs()
                .checked_mul(2)
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "value is too small for exp-golomb coding"))?
        };
        self.put_ue(mapped)
    }

    /// Pads the stream with `bit` up to the next byte boundary.
    pub fn byte_align(&mut self, bit: bool) -> io::Result<()> {
        let bit_offset = self.bit_offset & 0x7;
        if bit_offset == 0 {
            return Ok(());
        }
        let bit_left = 8 - bit_offset;
        self.put_bits(if bit { (1 << bit_left) - 1 } else { 0 }, bit_left)
    }

    // ITU-T H.264, 04/2017, 7.3.2.11
    pub fn rbsp_trailing_bits(&mut self) -> io::Result<()> {
        self.put_bits(1, 1)?;
        self.byte_align(false)
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        for &b in bytes {
            self.put_bits(b as u32, 8)?;
        }
        Ok(())
    }

    pub fn encode<V: Encode + ?Sized>(&mut self, v: &V) -> io::Result<()> {
        v.encode(self)
    }

    /// Flushes the partially filled word and returns the packed bytes.
    pub fn finish(mut self) -> BitBuffer {
        let pos = self.bit_offset >> 5;
        let bit_offset = self.bit_offset & 0x1f;
        if bit_offset != 0 {
            self.words[pos] = (self.words[pos] << (32 - bit_offset)).to_be();
        }

        let bit_length = self.bit_offset;
        let mut data = Vec::with_capacity((bit_length + 31) / 32 * 4);
        for word in &self.words[..(bit_length + 31) / 32] {
            data.extend_from_slice(&word.to_ne_bytes());
        }
        data.truncate((bit_length + 7) / 8);

        BitBuffer { data, bit_length }
    }
}

pub trait Encode {
    fn encode(&self, bs: &mut BitstreamWriter) -> io::Result<()>;
}

#[macro_export]
macro_rules! encode {
    ($b:expr, $e:expr) => {{
        $b.encode($e)
    }};
    ($b:expr, $e:expr, $($r:expr),+) => {
        match encode!($b, $e) {
            Ok(()) => encode!($b, $($r),+),
            Err(e) => Err(e),
        }
    };
}
