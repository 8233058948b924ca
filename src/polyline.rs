//! Google polyline codec.
//!
//! Coordinates are delta-encoded per axis, zig-zag signed, split into 5-bit
//! groups with a 0x20 continuation bit, biased by 63 into printable ASCII,
//! and scaled by 1e5. Both directions are implemented; the decoder is the
//! one on the hot path (overview polylines and per-step geometry from the
//! directions service).

use thiserror::Error;

use crate::models::geo::GeoPoint;

const PRECISION: f64 = 1e5;

// A legal 1e5-scaled delta fits in 6 groups; past this shift the next
// group would overflow i64.
const MAX_SHIFT: u32 = 55;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolylineError {
    #[error("invalid polyline byte {byte:#04x} at offset {at}")]
    InvalidByte { byte: u8, at: usize },

    #[error("polyline ends inside a value group at offset {at}")]
    UnexpectedEnd { at: usize },

    #[error("polyline has a latitude with no matching longitude at offset {at}")]
    DanglingLatitude { at: usize },

    #[error("unbounded continuation run at offset {at}")]
    Overflow { at: usize },
}

pub fn decode(encoded: &str) -> Result<Vec<GeoPoint>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut path = Vec::new();
    let mut idx = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while idx < bytes.len() {
        let start = idx;
        let (dlat, next) = decode_value(bytes, idx)?;
        lat += dlat;

        if next >= bytes.len() {
            return Err(PolylineError::DanglingLatitude { at: start });
        }
        let (dlng, next) = decode_value(bytes, next)?;
        lng += dlng;
        idx = next;

        path.push(GeoPoint {
            lat: lat as f64 / PRECISION,
            lng: lng as f64 / PRECISION,
        });
    }

    Ok(path)
}

pub fn encode(path: &[GeoPoint]) -> String {
    let mut out = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for point in path {
        let lat = (point.lat * PRECISION).round() as i64;
        let lng = (point.lng * PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn decode_value(bytes: &[u8], mut idx: usize) -> Result<(i64, usize), PolylineError> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(&raw) = bytes.get(idx) else {
            return Err(PolylineError::UnexpectedEnd { at: idx });
        };
        if raw < 63 {
            return Err(PolylineError::InvalidByte { byte: raw, at: idx });
        }
        if shift > MAX_SHIFT {
            return Err(PolylineError::Overflow { at: idx });
        }

        let chunk = i64::from(raw - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        idx += 1;

        if chunk & 0x20 == 0 {
            break;
        }
    }

    let delta = if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    };
    Ok((delta, idx))
}

fn encode_value(value: i64, out: &mut String) {
    let mut v = value << 1;
    if value < 0 {
        v = !v;
    }
    while v >= 0x20 {
        out.push((((v & 0x1f) | 0x20) + 63) as u8 as char);
        v >>= 5;
    }
    out.push((v + 63) as u8 as char);
}
