//! Ride status feed delivered through push.
//!
//! This module provides the records pushed by the alerting backend and the
//! decoder that recovers them from an opaque push payload.
//!
//! # Modules
//!
//! - `structs` - [`RideStatus`] and [`RideStatusRecord`]
//! - `decoder` - base64 and decompression pipeline producing the records

mod decoder;
mod structs;

#[cfg(test)]
pub(crate) use crate::rides::decoder::tests::encode_gzip;
pub use crate::rides::decoder::decode_payload;
pub use crate::rides::structs::{RideStatus, RideStatusRecord};
