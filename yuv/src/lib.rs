//! Raw YUV sample packing and bit-depth rescaling.
//!
//! These are the sample-crunching kernels behind raw frame file I/O: moving
//! samples between in-memory `i16` planes and 8/16-bit little endian file
//! words, and rescaling planes between file and internal bit depths.

pub mod rescale;
pub mod words;
