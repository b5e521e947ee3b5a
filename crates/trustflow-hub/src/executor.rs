//! Path-transfer execution.
//!
//! Applies verified edges to the ledger in order. An edge ending at a group
//! becomes a routed issuance; any other edge is a plain transfer with no
//! receiver callback. Terminal edges are checked against their stream as they
//! are executed.

use tracing::debug;
use trustflow_core::{AssetId, AvatarId, Timestamp};

use crate::error::{PermissionError, Result, StreamError};
use crate::flow::{FlowEdge, FlowMatrix};
use crate::hub::Hub;
use crate::issuance::{self, IssueRequest};
use crate::verifier::{VerifiedFlow, resolve};

/// Receivers of each stream, as `(coordinate, avatar)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StreamPlan {
    pub receivers: Vec<(usize, AvatarId)>,
}

#[derive(Debug)]
struct StreamTracker {
    progress: Vec<usize>,
    receivers: Vec<Option<(usize, AvatarId)>>,
}

impl StreamTracker {
    fn new(streams: usize) -> Self {
        Self {
            progress: vec![0; streams],
            receivers: vec![None; streams],
        }
    }

    fn observe(
        &mut self,
        matrix: &FlowMatrix,
        edge: usize,
        flow_edge: &FlowEdge,
        receiver: (usize, AvatarId),
    ) -> Result<()> {
        let Some(stream) = flow_edge.stream_index() else {
            return Ok(());
        };
        let declared = matrix
            .streams
            .get(stream)
            .ok_or(StreamError::UnknownStream {
                edge,
                tag: flow_edge.stream_tag,
                streams: matrix.streams.len(),
            })?;

        let position = self.progress[stream];
        if declared.edge_ids.get(position).map(|id| usize::from(*id)) != Some(edge) {
            return Err(StreamError::OutOfOrder {
                stream,
                edge,
                position,
            }
            .into());
        }

        match self.receivers[stream] {
            None => self.receivers[stream] = Some(receiver),
            Some(expected) if expected.1 != receiver.1 => {
                return Err(StreamError::ReceiverMismatch {
                    stream,
                    edge,
                    expected: expected.1,
                    actual: receiver.1,
                }
                .into());
            }
            Some(_) => {}
        }
        self.progress[stream] += 1;
        Ok(())
    }

    fn finish(self, matrix: &FlowMatrix) -> Result<StreamPlan> {
        let mut receivers = Vec::with_capacity(matrix.streams.len());
        for (stream, declared) in matrix.streams.iter().enumerate() {
            if declared.edge_ids.is_empty() {
                return Err(StreamError::EmptyStream { stream }.into());
            }
            let matched = self.progress[stream];
            match self.receivers[stream] {
                Some(receiver) if matched == declared.edge_ids.len() => receivers.push(receiver),
                _ => {
                    return Err(StreamError::Incomplete {
                        stream,
                        matched,
                        declared: declared.edge_ids.len(),
                    }
                    .into());
                }
            }
        }
        Ok(StreamPlan { receivers })
    }
}

/// Execute every edge of a verified matrix.
///
/// Must run inside a unit of work.
pub(crate) fn execute(
    hub: &Hub,
    matrix: &FlowMatrix,
    verified: &VerifiedFlow,
    now: Timestamp,
) -> Result<StreamPlan> {
    let mut tracker = StreamTracker::new(matrix.streams.len());

    for (edge, (triple, flow_edge)) in verified.triples.iter().zip(&matrix.edges).enumerate() {
        let [asset, from, to] = resolve(matrix, edge, triple)?;
        tracker.observe(matrix, edge, flow_edge, to)?;

        let (to_group, permitted) = {
            let state = hub.state.read();
            (
                state.registry.group(to.1).is_some(),
                state.is_permitted_flow(from.1, to.1, asset.1, now),
            )
        };

        if to_group {
            issuance::issue(
                hub,
                &IssueRequest {
                    sender: from.1,
                    receiver: to.1,
                    group: to.1,
                    collateral: &[asset.1],
                    amounts: &[flow_edge.amount],
                    data: &[],
                    direct: false,
                },
                now,
            )?;
        } else {
            if !permitted {
                return Err(PermissionError::UnpermittedFlow {
                    edge,
                    from: from.1,
                    to: to.1,
                    asset: asset.1.into(),
                }
                .into());
            }
            hub.ledger.lock().transfer(
                from.1,
                to.1,
                AssetId::of(asset.1),
                flow_edge.amount,
                &[],
            )?;
        }
        debug!(edge, from = %from.1, to = %to.1, routed = to_group, "edge executed");
    }

    tracker.finish(matrix)
}
