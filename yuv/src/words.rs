//! File word packing for raw planar YUV data.
//!
//! Raw YUV files carry one sample per word, with the word size picked for the
//! whole file: one byte when every channel fits in 8 bits, otherwise two bytes
//! stored little endian with the sample aligned to the least significant bit.

use bytemuck::Pod;
use num_traits::PrimInt;
use std::mem::size_of;

/// A word type samples can be stored as in a raw YUV file.
pub trait FileWord: Pod + PrimInt {
    /// Truncate an in-memory sample into a file word.
    fn from_sample(sample: i16) -> Self;

    /// Reinterpret a file word as an in-memory sample.
    fn into_sample(self) -> i16;
}

impl FileWord for u8 {
    #[inline]
    fn from_sample(sample: i16) -> Self {
        sample as u8
    }

    #[inline]
    fn into_sample(self) -> i16 {
        self as i16
    }
}

impl FileWord for u16 {
    #[inline]
    fn from_sample(sample: i16) -> Self {
        sample as u16
    }

    #[inline]
    fn into_sample(self) -> i16 {
        self as i16
    }
}

/// The size of a single sample word in a raw YUV file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WordSize {
    /// One byte per sample.
    Byte,

    /// Two bytes per sample, little endian.
    Word,
}

impl WordSize {
    /// Pick the word size for a file whose deepest channel has `max_depth`
    /// bits.
    pub fn for_bit_depth(max_depth: u32) -> Self {
        if max_depth > 8 {
            Self::Word
        } else {
            Self::Byte
        }
    }

    /// How many bytes a single sample occupies.
    pub fn bytes(self) -> usize {
        match self {
            Self::Byte => size_of::<u8>(),
            Self::Word => size_of::<u16>(),
        }
    }

    /// Unpack a row of file words into samples.
    ///
    /// Only as many samples as there are whole words in `bytes` (or slots in
    /// `samples`, whichever is less) are written.
    pub fn unpack_row(self, bytes: &[u8], samples: &mut [i16]) {
        match self {
            Self::Byte => unpack::<u8>(bytes, samples),
            Self::Word => unpack::<u16>(bytes, samples),
        }
    }

    /// Pack a row of samples into file words.
    pub fn pack_row(self, samples: &[i16], bytes: &mut [u8]) {
        match self {
            Self::Byte => pack::<u8>(samples, bytes),
            Self::Word => pack::<u16>(samples, bytes),
        }
    }

    /// Fill a row of file words with a single repeated value.
    pub fn fill_row(self, value: i16, bytes: &mut [u8]) {
        match self {
            Self::Byte => fill::<u8>(value, bytes),
            Self::Word => fill::<u16>(value, bytes),
        }
    }
}

fn unpack<W: FileWord>(bytes: &[u8], samples: &mut [i16]) {
    for (chunk, sample) in bytes.chunks_exact(size_of::<W>()).zip(samples.iter_mut()) {
        *sample = W::from_le(bytemuck::pod_read_unaligned::<W>(chunk)).into_sample();
    }
}

fn pack<W: FileWord>(samples: &[i16], bytes: &mut [u8]) {
    for (sample, chunk) in samples.iter().zip(bytes.chunks_exact_mut(size_of::<W>())) {
        chunk.copy_from_slice(bytemuck::bytes_of(&W::from_sample(*sample).to_le()));
    }
}

fn fill<W: FileWord>(value: i16, bytes: &mut [u8]) {
    let word = W::from_sample(value).to_le();
    for chunk in bytes.chunks_exact_mut(size_of::<W>()) {
        chunk.copy_from_slice(bytemuck::bytes_of(&word));
    }
}
