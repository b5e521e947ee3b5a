//! Stream reconciliation.
//!
//! After every edge has been executed, each stream's receiver is asked to
//! accept the aggregated delivery, and a second net-flow vector is built from
//! the streams alone. It must equal the verified matrix vector exactly.

use tracing::debug;
use trustflow_core::{Amount, AssetId, AvatarId};

use crate::error::{AcceptanceContext, HubError, Result, StreamError, StructuralError};
use crate::events::HubEvent;
use crate::executor::StreamPlan;
use crate::flow::{FlowMatrix, NetFlow};
use crate::hooks::Delivery;
use crate::hub::Hub;
use crate::verifier::VerifiedFlow;

/// Reconcile declared streams against the executed matrix.
///
/// Must run inside a unit of work, after [`crate::executor::execute`].
pub(crate) fn reconcile(
    hub: &Hub,
    operator: AvatarId,
    matrix: &FlowMatrix,
    verified: &VerifiedFlow,
    plan: &StreamPlan,
) -> Result<()> {
    let mut streams_flow = NetFlow::zeros(matrix.vertices.len());

    for ((index, stream), &(receiver_index, receiver)) in
        matrix.streams.iter().enumerate().zip(&plan.receivers)
    {
        let source_index = usize::from(stream.source);
        let source = matrix.vertices.get(source_index).copied().ok_or(
            StructuralError::StreamSourceOutOfRange {
                stream: index,
                coordinate: stream.source,
            },
        )?;

        let mut assets = Vec::with_capacity(stream.edge_ids.len());
        let mut amounts = Vec::with_capacity(stream.edge_ids.len());
        for &edge_id in &stream.edge_ids {
            let edge = usize::from(edge_id);
            let (Some(triple), Some(flow_edge)) = (verified.triples.get(edge), matrix.edges.get(edge))
            else {
                return Err(StreamError::Incomplete {
                    stream: index,
                    matched: assets.len(),
                    declared: stream.edge_ids.len(),
                }
                .into());
            };
            let asset = matrix
                .vertices
                .get(usize::from(triple.asset))
                .copied()
                .ok_or(StructuralError::CoordinateOutOfRange {
                    edge,
                    coordinate: triple.asset,
                    vertices: matrix.vertices.len(),
                })?;
            assets.push(AssetId::of(asset));
            amounts.push(flow_edge.amount);
        }
        let total = Amount::checked_sum(amounts.iter().copied())
            .ok_or(StreamError::TotalOverflow { stream: index })?;

        let hook = hub.hooks.read().acceptance_hook(receiver);
        if let Some(hook) = hook {
            let delivery = Delivery {
                from: source,
                to: receiver,
                assets: &assets,
                amounts: &amounts,
                data: &stream.data,
            };
            hook.on_receive(hub, &delivery)
                .map_err(|rejection| HubError::AcceptanceRejection {
                    from: source,
                    to: receiver,
                    context: AcceptanceContext::Stream { index },
                    reason: rejection.into_reason(),
                })?;
        }

        streams_flow.debit(source_index, total)?;
        streams_flow.credit(receiver_index, total)?;
        debug!(stream = index, from = %source, to = %receiver, total = %total, "stream accepted");

        hub.state.write().record(HubEvent::StreamCompleted {
            operator,
            from: source,
            to: receiver,
            assets,
            amounts,
        });
    }

    compare(matrix, &verified.net_flow, &streams_flow)
}

fn compare(matrix: &FlowMatrix, expected: &NetFlow, actual: &NetFlow) -> Result<()> {
    for (vertex, &avatar) in matrix.vertices.iter().enumerate() {
        let matrix_flow = expected.get(vertex).unwrap_or_default();
        let streams_flow = actual.get(vertex).unwrap_or_default();
        if matrix_flow != streams_flow {
            return Err(StreamError::NettedFlowMismatch {
                vertex,
                avatar,
                matrix: matrix_flow,
                streams: streams_flow,
            }
            .into());
        }
    }
    Ok(())
}
