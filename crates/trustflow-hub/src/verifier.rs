//! Flow-matrix verification.
//!
//! Runs before any mutation. Checks are applied in a fixed order and the
//! first failure is returned:
//!
//! 1. packed coordinates hold exactly three coordinates per edge
//! 2. the vertex count fits the configured limit
//! 3. vertices and edges are non-empty
//! 4. vertices are strictly ascending
//! 5. every vertex is registered
//! 6. per edge: coordinates are in range and the flow is permitted
//!
//! The output is the matrix's net-flow vector.

use tracing::debug;
use trustflow_core::{AvatarId, CoordinateTriple, Timestamp, coords};

use crate::error::{HubError, PermissionError, RegistrationError, Result, StructuralError};
use crate::flow::{FlowMatrix, NetFlow};
use crate::state::HubState;

/// A matrix that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedFlow {
    /// Decoded coordinates, one triple per edge.
    pub triples: Vec<CoordinateTriple>,
    /// Net flow computed from the edges.
    pub net_flow: NetFlow,
}

/// Verify `matrix` against `state` at `now`.
///
/// # Errors
///
/// Returns the first structural, ordering, registration or permission
/// failure.
pub fn verify_flow_matrix(
    state: &HubState,
    now: Timestamp,
    max_vertices: usize,
    matrix: &FlowMatrix,
) -> Result<VerifiedFlow> {
    let triples = coords::unpack(&matrix.packed_coordinates, matrix.edges.len())?;

    let vertex_count = matrix.vertices.len();
    if vertex_count > max_vertices {
        return Err(StructuralError::TooManyVertices {
            count: vertex_count,
            max: max_vertices,
        }
        .into());
    }
    if matrix.vertices.is_empty() {
        return Err(StructuralError::EmptyVertices.into());
    }
    if matrix.edges.is_empty() {
        return Err(StructuralError::EmptyEdges.into());
    }

    for (index, pair) in matrix.vertices.windows(2).enumerate() {
        if pair[0] >= pair[1] {
            return Err(HubError::Ordering {
                index: index + 1,
                previous: pair[0],
                current: pair[1],
            });
        }
    }

    for (index, &avatar) in matrix.vertices.iter().enumerate() {
        if !state.registry.is_registered(avatar) {
            return Err(RegistrationError::UnregisteredVertex { index, avatar }.into());
        }
    }

    let mut net_flow = NetFlow::zeros(vertex_count);
    for (edge, (triple, flow_edge)) in triples.iter().zip(&matrix.edges).enumerate() {
        let [asset, from, to] = resolve(matrix, edge, triple)?;
        if !state.is_permitted_flow(from.1, to.1, asset.1, now) {
            return Err(PermissionError::UnpermittedFlow {
                edge,
                from: from.1,
                to: to.1,
                asset: asset.1.into(),
            }
            .into());
        }
        net_flow.debit(from.0, flow_edge.amount)?;
        net_flow.credit(to.0, flow_edge.amount)?;
        debug!(
            edge,
            from = %from.1,
            to = %to.1,
            asset = %asset.1,
            amount = %flow_edge.amount,
            "edge verified"
        );
    }

    Ok(VerifiedFlow { triples, net_flow })
}

/// Resolve a triple to `(index, avatar)` pairs in asset, sender, receiver order.
pub(crate) fn resolve(
    matrix: &FlowMatrix,
    edge: usize,
    triple: &CoordinateTriple,
) -> Result<[(usize, AvatarId); 3]> {
    let lookup = |coordinate: u16| {
        let index = usize::from(coordinate);
        matrix
            .vertices
            .get(index)
            .map(|avatar| (index, *avatar))
            .ok_or(StructuralError::CoordinateOutOfRange {
                edge,
                coordinate,
                vertices: matrix.vertices.len(),
            })
    };
    Ok([
        lookup(triple.asset)?,
        lookup(triple.sender)?,
        lookup(triple.receiver)?,
    ])
}
