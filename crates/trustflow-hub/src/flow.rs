//! Flow matrices: the input of a settlement.
//!
//! A matrix lists the participating vertices in strictly ascending order, the
//! edges to execute, the streams declaring the caller's intent, and the packed
//! coordinates that bind each edge to three vertices.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use trustflow_core::{Amount, AvatarId, Coordinate, CoordinateTriple, coords};

use crate::config::MAX_ADDRESSABLE_VERTICES;
use crate::error::{Result, StructuralError};

/// Largest edge count addressable by a stream edge index.
pub const MAX_ADDRESSABLE_EDGES: usize = u16::MAX as usize + 1;

/// Largest stream count addressable by a one-based stream tag.
pub const MAX_ADDRESSABLE_STREAMS: usize = u16::MAX as usize;

/// One edge of a flow matrix.
///
/// `stream_tag == 0` marks an intermediate hop; `stream_tag == k` marks a
/// terminal leg of stream `k - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
    /// Stream reference, zero for intermediate hops.
    pub stream_tag: u16,
    /// Amount moved along the edge.
    pub amount: Amount,
}

impl FlowEdge {
    /// An intermediate hop.
    #[must_use]
    pub const fn hop(amount: Amount) -> Self {
        Self {
            stream_tag: 0,
            amount,
        }
    }

    /// A terminal leg of stream `stream`.
    #[must_use]
    pub const fn terminal(stream: u16, amount: Amount) -> Self {
        Self {
            stream_tag: stream.saturating_add(1),
            amount,
        }
    }

    /// The stream index this edge terminates, if any.
    #[must_use]
    pub fn stream_index(&self) -> Option<usize> {
        self.stream_tag.checked_sub(1).map(usize::from)
    }
}

/// Declared intent: one source delivering to one receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    /// Coordinate of the paying vertex.
    pub source: Coordinate,
    /// Terminal edges of the stream in execution order.
    pub edge_ids: Vec<u16>,
    /// Opaque data handed to the receiver's acceptance hook.
    #[serde(default)]
    pub data: Vec<u8>,
}

/// The complete input of [`crate::Hub::settle_flow`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMatrix {
    /// Participating avatars, strictly ascending.
    pub vertices: Vec<AvatarId>,
    /// Edges in execution order.
    pub edges: Vec<FlowEdge>,
    /// Declared streams.
    pub streams: Vec<Stream>,
    /// Three big-endian 16-bit coordinates per edge.
    pub packed_coordinates: Vec<u8>,
}

/// Signed net flow per vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NetFlow(Vec<i128>);

impl NetFlow {
    /// A zero vector over `vertices` entries.
    #[must_use]
    pub fn zeros(vertices: usize) -> Self {
        Self(vec![0; vertices])
    }

    fn apply(&mut self, vertex: usize, amount: Amount, outgoing: bool) -> Result<()> {
        let overflow = || StructuralError::NetFlowOverflow { vertex };
        let delta = amount.as_flow().ok_or_else(overflow)?;
        let slot = self.0.get_mut(vertex).ok_or_else(overflow)?;
        let updated = if outgoing {
            slot.checked_sub(delta)
        } else {
            slot.checked_add(delta)
        };
        *slot = updated.ok_or_else(overflow)?;
        Ok(())
    }

    /// Subtract `amount` at `vertex`.
    ///
    /// # Errors
    ///
    /// Fails if the amount does not fit or the entry overflows.
    pub fn debit(&mut self, vertex: usize, amount: Amount) -> Result<()> {
        self.apply(vertex, amount, true)
    }

    /// Add `amount` at `vertex`.
    ///
    /// # Errors
    ///
    /// Fails if the amount does not fit or the entry overflows.
    pub fn credit(&mut self, vertex: usize, amount: Amount) -> Result<()> {
        self.apply(vertex, amount, false)
    }

    /// Entries in vertex order.
    #[must_use]
    pub fn as_slice(&self) -> &[i128] {
        &self.0
    }

    /// Entry at `vertex`.
    #[must_use]
    pub fn get(&self, vertex: usize) -> Option<i128> {
        self.0.get(vertex).copied()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Net flow of one vertex in a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VertexFlow {
    /// Vertex avatar.
    pub avatar: AvatarId,
    /// Signed net flow.
    pub net: i128,
}

/// Result of a successful settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementReceipt {
    /// Settling operator.
    pub operator: AvatarId,
    /// Net flow per vertex.
    pub flows: Vec<VertexFlow>,
    /// Number of executed edges.
    pub edges: usize,
    /// Number of reconciled streams.
    pub streams: usize,
}

/// Builds a [`FlowMatrix`] from avatar-addressed edges.
///
/// Vertices are collected, sorted and deduplicated on [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct FlowMatrixBuilder {
    edges: Vec<([AvatarId; 3], Option<usize>, Amount)>,
    streams: Vec<(AvatarId, Vec<usize>, Vec<u8>)>,
    extra_vertices: Vec<AvatarId>,
}

impl FlowMatrixBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an intermediate hop moving `amount` of `asset` from `from` to `to`.
    /// Returns the edge index.
    pub fn edge(&mut self, asset: AvatarId, from: AvatarId, to: AvatarId, amount: Amount) -> usize {
        self.edges.push(([asset, from, to], None, amount));
        self.edges.len() - 1
    }

    /// Declare a stream paid by `source`. Returns the stream index.
    pub fn stream(&mut self, source: AvatarId, data: impl Into<Vec<u8>>) -> usize {
        self.streams.push((source, Vec::new(), data.into()));
        self.streams.len() - 1
    }

    /// Add a terminal leg of `stream`. Returns the edge index.
    ///
    /// The edge is appended to the stream's declared edge list if the stream
    /// exists; otherwise it only carries the tag.
    pub fn terminal(
        &mut self,
        stream: usize,
        asset: AvatarId,
        from: AvatarId,
        to: AvatarId,
        amount: Amount,
    ) -> usize {
        self.edges.push(([asset, from, to], Some(stream), amount));
        let index = self.edges.len() - 1;
        if let Some((_, ids, _)) = self.streams.get_mut(stream) {
            ids.push(index);
        }
        index
    }

    /// Include `avatar` as a vertex even if no edge references it.
    pub fn vertex(&mut self, avatar: AvatarId) -> &mut Self {
        self.extra_vertices.push(avatar);
        self
    }

    /// Assemble the matrix.
    ///
    /// # Errors
    ///
    /// Fails if the vertices, edges or streams exceed the 16-bit index width.
    pub fn build(self) -> Result<FlowMatrix> {
        let vertices: Vec<AvatarId> = self
            .edges
            .iter()
            .flat_map(|(ids, _, _)| ids.iter().copied())
            .chain(self.streams.iter().map(|(source, _, _)| *source))
            .chain(self.extra_vertices.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if vertices.len() > MAX_ADDRESSABLE_VERTICES {
            return Err(StructuralError::TooManyVertices {
                count: vertices.len(),
                max: MAX_ADDRESSABLE_VERTICES,
            }
            .into());
        }
        if self.edges.len() > MAX_ADDRESSABLE_EDGES {
            return Err(StructuralError::TooManyEdges {
                count: self.edges.len(),
                max: MAX_ADDRESSABLE_EDGES,
            }
            .into());
        }
        let referenced = self
            .edges
            .iter()
            .filter_map(|(_, stream, _)| stream.map(|s| s + 1))
            .max()
            .unwrap_or_default();
        let stream_count = self.streams.len().max(referenced);
        if stream_count > MAX_ADDRESSABLE_STREAMS {
            return Err(StructuralError::TooManyStreams {
                count: stream_count,
                max: MAX_ADDRESSABLE_STREAMS,
            }
            .into());
        }

        let index: HashMap<AvatarId, Coordinate> = vertices
            .iter()
            .zip(0..=Coordinate::MAX)
            .map(|(id, i)| (*id, i))
            .collect();
        let coordinate = |id: &AvatarId| index.get(id).copied().unwrap_or_default();

        let triples: Vec<CoordinateTriple> = self
            .edges
            .iter()
            .map(|([asset, from, to], _, _)| {
                CoordinateTriple::new(coordinate(asset), coordinate(from), coordinate(to))
            })
            .collect();

        let streams = self
            .streams
            .into_iter()
            .map(|(source, ids, data)| Stream {
                source: coordinate(&source),
                edge_ids: ids
                    .into_iter()
                    .filter_map(|id| u16::try_from(id).ok())
                    .collect(),
                data,
            })
            .collect();

        Ok(FlowMatrix {
            vertices,
            edges: self
                .edges
                .into_iter()
                .map(|(_, stream, amount)| {
                    stream
                        .and_then(|s| u16::try_from(s).ok())
                        .map_or(FlowEdge::hop(amount), |s| FlowEdge::terminal(s, amount))
                })
                .collect(),
            streams,
            packed_coordinates: coords::pack(&triples),
        })
    }
}
