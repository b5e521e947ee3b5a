//! Error types for hub operations.
//!
//! Every error is fatal to the enclosing unit of work: the hub rolls back all
//! mutations and surfaces the error unchanged. Nothing is retried internally.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use trustflow_core::{Amount, AssetId, AvatarId, CoreError};

use crate::ledger::LedgerError;

/// Result type alias for hub operations.
pub type Result<T> = std::result::Result<T, HubError>;

/// Coarse error category, stable for callers that branch on failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input (lengths, empty arrays, coordinates, overflow).
    Structural,
    /// Registration state does not allow the operation.
    Registration,
    /// A trust or approval predicate is false.
    Permission,
    /// Flow vertices are not strictly ascending.
    Ordering,
    /// A group's mint policy refused the operation.
    PolicyRejection,
    /// A receiver-side hook refused a delivery.
    AcceptanceRejection,
    /// Declared streams do not match the executed flow.
    StreamConsistency,
    /// A settlement was attempted while another one is in progress.
    Reentrancy,
    /// The balance ledger refused a mutation.
    Ledger,
    /// Invalid hub configuration.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Structural => "structural",
            Self::Registration => "registration",
            Self::Permission => "permission",
            Self::Ordering => "ordering",
            Self::PolicyRejection => "policy_rejection",
            Self::AcceptanceRejection => "acceptance_rejection",
            Self::StreamConsistency => "stream_consistency",
            Self::Reentrancy => "reentrancy",
            Self::Ledger => "ledger",
            Self::Config => "config",
        };
        f.write_str(s)
    }
}

/// Operation a mint policy was consulted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyOperation {
    /// Collateralized group mint.
    Mint,
    /// Burn of group currency.
    Burn,
}

impl fmt::Display for PolicyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mint => f.write_str("mint"),
            Self::Burn => f.write_str("burn"),
        }
    }
}

/// Where a receiver-side rejection happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceContext {
    /// The acceptance hook of a stream receiver.
    Stream {
        /// Index of the stream in the settlement.
        index: usize,
    },
    /// The receipt hook of a group treasury.
    CollateralReceipt {
        /// Group the collateral was delivered for.
        group: AvatarId,
    },
}

impl fmt::Display for AcceptanceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream { index } => write!(f, "stream {index}"),
            Self::CollateralReceipt { group } => write!(f, "collateral for group {group}"),
        }
    }
}

/// Malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// Packed coordinates do not describe exactly three vertices per edge.
    #[error("coordinates describe {actual} bytes, expected {expected} for {edges} edges")]
    CoordinateLength {
        /// Number of flow edges.
        edges: usize,
        /// Expected packed length.
        expected: usize,
        /// Supplied packed length.
        actual: usize,
    },

    /// More vertices than a coordinate can address.
    #[error("{count} flow vertices exceed the limit of {max}")]
    TooManyVertices {
        /// Supplied vertex count.
        count: usize,
        /// Maximum addressable vertex count.
        max: usize,
    },

    /// More edges than a stream edge index can address.
    #[error("{count} flow edges exceed the limit of {max}")]
    TooManyEdges {
        /// Supplied edge count.
        count: usize,
        /// Maximum addressable edge count.
        max: usize,
    },

    /// More streams than a stream tag can address.
    #[error("{count} flow streams exceed the limit of {max}")]
    TooManyStreams {
        /// Supplied stream count.
        count: usize,
        /// Maximum addressable stream count.
        max: usize,
    },

    /// No flow vertices.
    #[error("flow vertices must not be empty")]
    EmptyVertices,

    /// No flow edges.
    #[error("flow edges must not be empty")]
    EmptyEdges,

    /// An edge references a vertex that does not exist.
    #[error("edge {edge} references coordinate {coordinate} but only {vertices} vertices exist")]
    CoordinateOutOfRange {
        /// Edge index.
        edge: usize,
        /// Offending coordinate.
        coordinate: u16,
        /// Number of vertices.
        vertices: usize,
    },

    /// A stream source references a vertex that does not exist.
    #[error("stream {stream} source coordinate {coordinate} is out of range")]
    StreamSourceOutOfRange {
        /// Stream index.
        stream: usize,
        /// Offending coordinate.
        coordinate: u16,
    },

    /// Collateral and amount arrays differ in length.
    #[error("{collateral} collateral entries but {amounts} amounts")]
    ArrayLengthMismatch {
        /// Collateral entries.
        collateral: usize,
        /// Amount entries.
        amounts: usize,
    },

    /// No collateral supplied.
    #[error("collateral must not be empty")]
    EmptyCollateral,

    /// A collateral amount is zero.
    #[error("collateral amount at index {index} is zero")]
    ZeroAmount {
        /// Index of the zero amount.
        index: usize,
    },

    /// Summing amounts overflowed.
    #[error("amount overflow")]
    AmountOverflow,

    /// Accumulating a net flow overflowed the signed accumulator.
    #[error("net flow overflow at vertex {vertex}")]
    NetFlowOverflow {
        /// Vertex index whose accumulator overflowed.
        vertex: usize,
    },

    /// A reserved identifier (null or sentinel) was used as a counterparty.
    #[error("reserved avatar id {0} cannot be used")]
    ReservedAvatar(AvatarId),

    /// Malformed packed coordinate bytes.
    #[error("malformed coordinates: {0}")]
    MalformedCoordinates(String),
}

/// Registration state does not allow the operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The avatar is already registered.
    #[error("avatar {0} is already registered")]
    AlreadyRegistered(AvatarId),

    /// The avatar is not registered.
    #[error("avatar {0} is not registered")]
    NotRegistered(AvatarId),

    /// A reserved identifier cannot be registered.
    #[error("avatar id {0} is reserved")]
    ReservedId(AvatarId),

    /// A flow vertex is not registered.
    #[error("flow vertex {index} ({avatar}) is not registered")]
    UnregisteredVertex {
        /// Vertex index.
        index: usize,
        /// Vertex avatar.
        avatar: AvatarId,
    },

    /// Group registration without a mint policy.
    #[error("group mint policy must not be null")]
    NullMintPolicy,

    /// Group registration without a treasury.
    #[error("group treasury must not be null")]
    NullTreasury,

    /// The avatar is not a group.
    #[error("avatar {0} is not a group")]
    NotAGroup(AvatarId),

    /// The avatar is not a human.
    #[error("avatar {0} is not a human")]
    NotAHuman(AvatarId),

    /// Registration outside the bootstrap window needs an inviter.
    #[error("an inviter is required after the bootstrap period")]
    InviterRequired,

    /// Group name rejected by the naming service.
    #[error("invalid name '{name}': {reason}")]
    InvalidName {
        /// Proposed name.
        name: String,
        /// Rejection reason.
        reason: String,
    },

    /// Group symbol rejected by the naming service.
    #[error("invalid symbol '{symbol}': {reason}")]
    InvalidSymbol {
        /// Proposed symbol.
        symbol: String,
        /// Rejection reason.
        reason: String,
    },
}

/// A trust or approval predicate is false.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// The flow along an edge is not permitted by the trust graph.
    #[error("edge {edge}: flow of {asset} from {from} to {to} is not permitted")]
    UnpermittedFlow {
        /// Edge index.
        edge: usize,
        /// Sender.
        from: AvatarId,
        /// Receiver.
        to: AvatarId,
        /// Asset moved.
        asset: AssetId,
    },

    /// Direct group mint with collateral the group does not trust.
    #[error("group {group} does not trust collateral {collateral}")]
    UntrustedCollateral {
        /// Group being minted.
        group: AvatarId,
        /// Collateral issuer.
        collateral: AvatarId,
    },

    /// Routed group mint with collateral that may not flow to the group.
    #[error("collateral {collateral} may not flow from {sender} to group {group}")]
    UnpermittedCollateral {
        /// Collateral payer.
        sender: AvatarId,
        /// Group being minted.
        group: AvatarId,
        /// Collateral issuer.
        collateral: AvatarId,
    },

    /// The operator may not move the stream source's funds.
    #[error("operator {operator} is not approved by {owner}")]
    OperatorNotApproved {
        /// Calling operator.
        operator: AvatarId,
        /// Owner of the funds.
        owner: AvatarId,
    },

    /// Self-trust is implicit and immutable.
    #[error("avatar {0} cannot change trust in itself")]
    SelfTrust(AvatarId),

    /// An owner cannot approve itself as operator.
    #[error("avatar {0} cannot approve itself as operator")]
    SelfApproval(AvatarId),

    /// The inviter does not trust the invitee.
    #[error("inviter {inviter} does not trust {invitee}")]
    InviterDoesNotTrust {
        /// Inviting human.
        inviter: AvatarId,
        /// Human being registered.
        invitee: AvatarId,
    },
}

/// Declared streams do not match the executed flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// A terminal edge references a stream that was not declared.
    #[error("edge {edge} is tagged for stream {tag} but only {streams} streams exist")]
    UnknownStream {
        /// Edge index.
        edge: usize,
        /// Stream tag on the edge (one-based).
        tag: u16,
        /// Declared stream count.
        streams: usize,
    },

    /// A terminal edge appears out of its stream's declared order.
    #[error("edge {edge} is out of order for stream {stream} at position {position}")]
    OutOfOrder {
        /// Stream index.
        stream: usize,
        /// Edge index.
        edge: usize,
        /// Position within the stream's edge list.
        position: usize,
    },

    /// Terminal edges of one stream deliver to different receivers.
    #[error("stream {stream}: edge {edge} delivers to {actual}, expected {expected}")]
    ReceiverMismatch {
        /// Stream index.
        stream: usize,
        /// Edge index.
        edge: usize,
        /// Receiver of the stream's first terminal edge.
        expected: AvatarId,
        /// Receiver of this edge.
        actual: AvatarId,
    },

    /// A stream declares no edges.
    #[error("stream {stream} declares no edges")]
    EmptyStream {
        /// Stream index.
        stream: usize,
    },

    /// Not every declared edge of a stream was tagged for it.
    #[error("stream {stream}: matched {matched} of {declared} declared edges")]
    Incomplete {
        /// Stream index.
        stream: usize,
        /// Terminal edges found.
        matched: usize,
        /// Edges declared.
        declared: usize,
    },

    /// Stream total overflowed.
    #[error("stream {stream} total overflows")]
    TotalOverflow {
        /// Stream index.
        stream: usize,
    },

    /// The netted flow of the streams differs from the verified matrix.
    #[error("netted flow mismatch at vertex {vertex} ({avatar}): matrix {matrix}, streams {streams}")]
    NettedFlowMismatch {
        /// Vertex index.
        vertex: usize,
        /// Vertex avatar.
        avatar: AvatarId,
        /// Value computed from the edges.
        matrix: i128,
        /// Value computed from the streams.
        streams: i128,
    },
}

/// Errors that can occur during hub operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// Malformed input.
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    /// Registration state does not allow the operation.
    #[error("registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// A trust or approval predicate is false.
    #[error("permission denied: {0}")]
    Permission(#[from] PermissionError),

    /// Flow vertices are not strictly ascending.
    #[error("flow vertex {index} ({current}) does not follow {previous}")]
    Ordering {
        /// Index of the offending vertex.
        index: usize,
        /// Vertex before it.
        previous: AvatarId,
        /// Offending vertex.
        current: AvatarId,
    },

    /// A group's mint policy refused the operation.
    #[error("{operation} of group {group} rejected by policy {policy}: {reason}")]
    PolicyRejection {
        /// Group whose policy was consulted.
        group: AvatarId,
        /// Policy address.
        policy: AvatarId,
        /// Operation refused.
        operation: PolicyOperation,
        /// Rejection detail.
        reason: String,
    },

    /// A receiver-side hook refused a delivery.
    #[error("{to} rejected {context} from {from}: {reason}")]
    AcceptanceRejection {
        /// Sender of the delivery.
        from: AvatarId,
        /// Rejecting receiver.
        to: AvatarId,
        /// Where the rejection happened.
        context: AcceptanceContext,
        /// Reason given by the hook.
        reason: String,
    },

    /// Declared streams do not match the executed flow.
    #[error("stream consistency error: {0}")]
    StreamConsistency(#[from] StreamError),

    /// A settlement is already in progress.
    #[error("reentrant settlement rejected")]
    Reentrancy,

    /// The balance ledger refused a mutation.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl HubError {
    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// The coarse category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Structural(_) => ErrorKind::Structural,
            Self::Registration(_) => ErrorKind::Registration,
            Self::Permission(_) => ErrorKind::Permission,
            Self::Ordering { .. } => ErrorKind::Ordering,
            Self::PolicyRejection { .. } => ErrorKind::PolicyRejection,
            Self::AcceptanceRejection { .. } => ErrorKind::AcceptanceRejection,
            Self::StreamConsistency(_) => ErrorKind::StreamConsistency,
            Self::Reentrancy => ErrorKind::Reentrancy,
            Self::Ledger(_) => ErrorKind::Ledger,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// A discriminating sub-code within the category.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Structural(e) => match e {
                StructuralError::CoordinateLength { .. } => "coordinate_length",
                StructuralError::TooManyVertices { .. } => "too_many_vertices",
                StructuralError::TooManyEdges { .. } => "too_many_edges",
                StructuralError::TooManyStreams { .. } => "too_many_streams",
                StructuralError::EmptyVertices => "empty_vertices",
                StructuralError::EmptyEdges => "empty_edges",
                StructuralError::CoordinateOutOfRange { .. } => "coordinate_out_of_range",
                StructuralError::StreamSourceOutOfRange { .. } => "stream_source_out_of_range",
                StructuralError::ArrayLengthMismatch { .. } => "array_length_mismatch",
                StructuralError::EmptyCollateral => "empty_collateral",
                StructuralError::ZeroAmount { .. } => "zero_amount",
                StructuralError::AmountOverflow => "amount_overflow",
                StructuralError::NetFlowOverflow { .. } => "net_flow_overflow",
                StructuralError::ReservedAvatar(_) => "reserved_avatar",
                StructuralError::MalformedCoordinates(_) => "malformed_coordinates",
            },
            Self::Registration(e) => match e {
                RegistrationError::AlreadyRegistered(_) => "already_registered",
                RegistrationError::NotRegistered(_) => "not_registered",
                RegistrationError::ReservedId(_) => "reserved_id",
                RegistrationError::UnregisteredVertex { .. } => "unregistered_vertex",
                RegistrationError::NullMintPolicy => "null_mint_policy",
                RegistrationError::NullTreasury => "null_treasury",
                RegistrationError::NotAGroup(_) => "not_a_group",
                RegistrationError::NotAHuman(_) => "not_a_human",
                RegistrationError::InviterRequired => "inviter_required",
                RegistrationError::InvalidName { .. } => "invalid_name",
                RegistrationError::InvalidSymbol { .. } => "invalid_symbol",
            },
            Self::Permission(e) => match e {
                PermissionError::UnpermittedFlow { .. } => "unpermitted_flow",
                PermissionError::UntrustedCollateral { .. } => "untrusted_collateral",
                PermissionError::UnpermittedCollateral { .. } => "unpermitted_collateral",
                PermissionError::OperatorNotApproved { .. } => "operator_not_approved",
                PermissionError::SelfTrust(_) => "self_trust",
                PermissionError::SelfApproval(_) => "self_approval",
                PermissionError::InviterDoesNotTrust { .. } => "inviter_does_not_trust",
            },
            Self::Ordering { .. } => "vertices_not_ascending",
            Self::PolicyRejection { operation, .. } => match operation {
                PolicyOperation::Mint => "mint_rejected",
                PolicyOperation::Burn => "burn_rejected",
            },
            Self::AcceptanceRejection { context, .. } => match context {
                AcceptanceContext::Stream { .. } => "stream_rejected",
                AcceptanceContext::CollateralReceipt { .. } => "collateral_rejected",
            },
            Self::StreamConsistency(e) => match e {
                StreamError::UnknownStream { .. } => "unknown_stream",
                StreamError::OutOfOrder { .. } => "out_of_order",
                StreamError::ReceiverMismatch { .. } => "receiver_mismatch",
                StreamError::EmptyStream { .. } => "empty_stream",
                StreamError::Incomplete { .. } => "incomplete_stream",
                StreamError::TotalOverflow { .. } => "stream_total_overflow",
                StreamError::NettedFlowMismatch { .. } => "netted_flow_mismatch",
            },
            Self::Reentrancy => "reentrancy",
            Self::Ledger(e) => e.code(),
            Self::Config(_) => "config",
        }
    }
}

impl From<CoreError> for HubError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::CoordinateLength {
                edges,
                expected,
                actual,
            } => StructuralError::CoordinateLength {
                edges,
                expected,
                actual,
            }
            .into(),
            CoreError::TruncatedCoordinates(len) => {
                StructuralError::MalformedCoordinates(format!("{len} bytes")).into()
            }
            CoreError::InvalidAmount(msg) | CoreError::InvalidAvatarId(msg) => {
                StructuralError::MalformedCoordinates(msg).into()
            }
        }
    }
}

/// Shorthand for an amount-overflow structural error.
pub(crate) fn amount_overflow() -> HubError {
    StructuralError::AmountOverflow.into()
}

/// Sum amounts or fail with [`StructuralError::AmountOverflow`].
pub(crate) fn checked_total(amounts: &[Amount]) -> Result<Amount> {
    Amount::checked_sum(amounts.iter().copied()).ok_or_else(amount_overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_code_discriminate() {
        let err: HubError = StructuralError::EmptyEdges.into();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert_eq!(err.code(), "empty_edges");

        let err: HubError = StreamError::EmptyStream { stream: 3 }.into();
        assert_eq!(err.kind(), ErrorKind::StreamConsistency);
        assert_eq!(err.code(), "empty_stream");
    }

    #[test]
    fn ordering_display_names_both_vertices() {
        let err = HubError::Ordering {
            index: 1,
            previous: AvatarId::from_low_u64(9),
            current: AvatarId::from_low_u64(3),
        };
        let s = err.to_string();
        assert!(s.contains(&AvatarId::from_low_u64(9).to_hex()));
        assert!(s.contains(&AvatarId::from_low_u64(3).to_hex()));
        assert_eq!(err.kind(), ErrorKind::Ordering);
    }

    #[test]
    fn unpermitted_flow_mentions_edge() {
        let err: HubError = PermissionError::UnpermittedFlow {
            edge: 0,
            from: AvatarId::from_low_u64(2),
            to: AvatarId::from_low_u64(3),
            asset: AssetId::of(AvatarId::from_low_u64(2)),
        }
        .into();
        assert!(err.to_string().contains("edge 0"));
        assert_eq!(err.code(), "unpermitted_flow");
    }

    #[test]
    fn core_coordinate_error_maps_to_structural() {
        let err: HubError = CoreError::CoordinateLength {
            edges: 1,
            expected: 6,
            actual: 4,
        }
        .into();
        assert_eq!(err.code(), "coordinate_length");
    }

    #[test]
    fn policy_rejection_codes() {
        let err = HubError::PolicyRejection {
            group: AvatarId::from_low_u64(5),
            policy: AvatarId::from_low_u64(6),
            operation: PolicyOperation::Burn,
            reason: "denied".into(),
        };
        assert_eq!(err.kind(), ErrorKind::PolicyRejection);
        assert_eq!(err.code(), "burn_rejected");
        assert!(err.to_string().contains("burn"));
    }

    #[test]
    fn checked_total_overflows() {
        let amounts = [Amount::from_atto(u128::MAX), Amount::from_atto(1)];
        assert_eq!(checked_total(&amounts).unwrap_err().code(), "amount_overflow");
    }
}
