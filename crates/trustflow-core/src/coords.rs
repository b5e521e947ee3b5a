//! Flow coordinate codec.
//!
//! Each flow edge references three flow vertices by index: the asset vertex,
//! the sender vertex and the receiver vertex. On the wire every index is a
//! 16-bit big-endian unsigned integer, so one edge takes exactly six bytes.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Index into a flow vertex list.
pub type Coordinate = u16;

/// Bytes used by one packed coordinate triple.
pub const TRIPLE_LEN: usize = 6;

/// The three vertex references of one flow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordinateTriple {
    /// Vertex whose asset moves along the edge.
    pub asset: Coordinate,
    /// Vertex sending the asset.
    pub sender: Coordinate,
    /// Vertex receiving the asset.
    pub receiver: Coordinate,
}

impl CoordinateTriple {
    /// Create a triple.
    #[must_use]
    pub const fn new(asset: Coordinate, sender: Coordinate, receiver: Coordinate) -> Self {
        Self {
            asset,
            sender,
            receiver,
        }
    }

    /// The triple as an array in wire order.
    #[must_use]
    pub const fn as_array(&self) -> [Coordinate; 3] {
        [self.asset, self.sender, self.receiver]
    }
}

/// Pack coordinate triples into their wire form.
#[must_use]
pub fn pack(triples: &[CoordinateTriple]) -> Vec<u8> {
    let mut out = Vec::with_capacity(triples.len() * TRIPLE_LEN);
    for triple in triples {
        for coordinate in triple.as_array() {
            out.extend_from_slice(&coordinate.to_be_bytes());
        }
    }
    out
}

/// Unpack the coordinates of exactly `edge_count` edges.
///
/// # Errors
///
/// Returns [`CoreError::CoordinateLength`] unless `packed` is exactly
/// `6 * edge_count` bytes long.
pub fn unpack(packed: &[u8], edge_count: usize) -> Result<Vec<CoordinateTriple>, CoreError> {
    let expected = edge_count.saturating_mul(TRIPLE_LEN);
    if packed.len() != expected {
        return Err(CoreError::CoordinateLength {
            edges: edge_count,
            expected,
            actual: packed.len(),
        });
    }
    Ok(decode_chunks(packed))
}

/// Unpack every triple in `packed`, inferring the edge count.
///
/// # Errors
///
/// Returns [`CoreError::TruncatedCoordinates`] if the length is not a
/// multiple of six.
pub fn unpack_all(packed: &[u8]) -> Result<Vec<CoordinateTriple>, CoreError> {
    if packed.len() % TRIPLE_LEN != 0 {
        return Err(CoreError::TruncatedCoordinates(packed.len()));
    }
    Ok(decode_chunks(packed))
}

fn decode_chunks(packed: &[u8]) -> Vec<CoordinateTriple> {
    packed
        .chunks_exact(TRIPLE_LEN)
        .map(|chunk| {
            let read = |at: usize| Coordinate::from_be_bytes([chunk[at], chunk[at + 1]]);
            CoordinateTriple::new(read(0), read(2), read(4))
        })
        .collect()
}
