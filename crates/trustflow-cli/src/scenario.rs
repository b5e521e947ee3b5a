//! Scenario files.
//!
//! A scenario sets up a hub from scratch (avatars, trust, balances, hooks)
//! and then settles one flow matrix against an in-memory ledger at a fixed
//! time. Avatars are referenced either by `0x`-prefixed hex id or by a name,
//! which is hashed into an id.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trustflow_core::{Amount, AssetId, AvatarId, CoordinateTriple, INDEFINITE, Timestamp, coords};
use trustflow_hub::{
    AcceptAll, FlowEdge, FlowMatrix, FlowMatrixBuilder, Hub, HubConfig, HubEvent, InMemoryLedger,
    ManualClock, RejectAll, SettlementReceipt, StaticPolicy, Stream,
};

use crate::error::CliError;

/// Resolve an avatar reference to an id.
///
/// # Errors
///
/// Returns an error if a `0x` reference is not a valid id.
pub fn resolve_avatar(reference: &str) -> Result<AvatarId, CliError> {
    if reference.starts_with("0x") {
        Ok(reference.parse()?)
    } else {
        Ok(AvatarId::derive(reference))
    }
}

/// Kind of avatar to register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvatarEntryKind {
    /// Human.
    Human,
    /// Group.
    Group,
    /// Organization.
    Organization,
}

/// One avatar registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AvatarEntry {
    /// Avatar reference.
    pub id: String,
    /// Registration kind.
    pub kind: AvatarEntryKind,
    /// Inviting human.
    #[serde(default)]
    pub inviter: Option<String>,
    /// Group mint policy address.
    #[serde(default)]
    pub mint_policy: Option<String>,
    /// Group treasury; the configured standard treasury if absent.
    #[serde(default)]
    pub treasury: Option<String>,
    /// Group or organization name.
    #[serde(default)]
    pub name: Option<String>,
    /// Group symbol.
    #[serde(default)]
    pub symbol: Option<String>,
}

/// A trust relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustEntry {
    /// Trusting avatar.
    pub truster: String,
    /// Trusted avatar.
    pub trustee: String,
    /// Expiry; indefinite if absent.
    #[serde(default)]
    pub expiry: Option<Timestamp>,
}

/// A starting balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BalanceEntry {
    /// Holder.
    pub holder: String,
    /// Issuer of the asset.
    pub asset: String,
    /// Amount in tokens.
    pub amount: Amount,
}

/// A mint policy deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyEntry {
    /// Policy address.
    pub address: String,
    /// Whether mints are allowed.
    #[serde(default = "default_true")]
    pub allow_mint: bool,
    /// Whether burns are allowed.
    #[serde(default = "default_true")]
    pub allow_burn: bool,
}

const fn default_true() -> bool {
    true
}

/// A hook deployment that either accepts or rejects with a reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookEntry {
    /// Hook owner or address.
    pub address: String,
    /// Rejection reason; accepts if absent.
    #[serde(default)]
    pub reject: Option<String>,
}

/// An operator approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApprovalEntry {
    /// Owner of the funds.
    pub owner: String,
    /// Approved operator.
    pub operator: String,
}

/// An avatar-addressed edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeEntry {
    /// Issuer of the moved asset.
    pub asset: String,
    /// Sender.
    pub from: String,
    /// Receiver.
    pub to: String,
    /// Amount in tokens.
    pub amount: Amount,
    /// Stream this edge terminates, if any.
    #[serde(default)]
    pub stream: Option<usize>,
}

/// An avatar-addressed stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamEntry {
    /// Paying avatar.
    pub source: String,
    /// Hex data for the acceptance hook.
    #[serde(default)]
    pub data: Option<String>,
}

/// A flow described by avatars; vertices and coordinates are derived.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowPaths {
    /// Streams, referenced by index from edges.
    #[serde(default)]
    pub streams: Vec<StreamEntry>,
    /// Edges in execution order.
    pub edges: Vec<EdgeEntry>,
}

/// A raw edge of a [`RawMatrix`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEdge {
    /// Stream tag, zero for intermediate hops.
    #[serde(default)]
    pub stream_tag: u16,
    /// Amount in tokens.
    pub amount: Amount,
}

/// A raw stream of a [`RawMatrix`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStream {
    /// Source coordinate.
    pub source: u16,
    /// Terminal edge indices.
    pub edge_ids: Vec<u16>,
    /// Hex data for the acceptance hook.
    #[serde(default)]
    pub data: Option<String>,
}

/// A flow matrix given verbatim, with coordinates as triples.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawMatrix {
    /// Vertex references in the given order.
    pub vertices: Vec<String>,
    /// Edges.
    pub edges: Vec<RawEdge>,
    /// Streams.
    #[serde(default)]
    pub streams: Vec<RawStream>,
    /// `[asset, sender, receiver]` per edge.
    pub coordinates: Vec<[u16; 3]>,
}

/// A complete scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Clock reading for the whole replay.
    pub now: Timestamp,
    /// Hub configuration.
    #[serde(default)]
    pub config: HubConfig,
    /// Mint policies to deploy.
    #[serde(default)]
    pub policies: Vec<PolicyEntry>,
    /// Treasury hooks to deploy.
    #[serde(default)]
    pub treasuries: Vec<HookEntry>,
    /// Acceptance hooks to install.
    #[serde(default)]
    pub acceptance: Vec<HookEntry>,
    /// Avatars in registration order.
    #[serde(default)]
    pub avatars: Vec<AvatarEntry>,
    /// Trust relations, applied after registration.
    #[serde(default)]
    pub trust: Vec<TrustEntry>,
    /// Avatars opting into consented flow.
    #[serde(default)]
    pub consented: Vec<String>,
    /// Operator approvals.
    #[serde(default)]
    pub approvals: Vec<ApprovalEntry>,
    /// Starting balances.
    #[serde(default)]
    pub balances: Vec<BalanceEntry>,
    /// Settling operator.
    pub operator: String,
    /// Avatar-addressed flow.
    #[serde(default)]
    pub flow: Option<FlowPaths>,
    /// Raw flow matrix.
    #[serde(default)]
    pub matrix: Option<RawMatrix>,
}

/// Result of replaying a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    /// Settlement receipt.
    pub receipt: SettlementReceipt,
    /// Events emitted by the settlement.
    pub events: Vec<HubEvent>,
}

fn decode_data(data: Option<&String>) -> Result<Vec<u8>, CliError> {
    match data {
        None => Ok(Vec::new()),
        Some(hex_data) => hex::decode(hex_data.trim_start_matches("0x"))
            .map_err(|e| CliError::scenario(format!("invalid stream data '{hex_data}': {e}"))),
    }
}

impl Scenario {
    /// Parse a scenario from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid.
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        serde_json::from_str(content).map_err(|e| CliError::scenario(format!("invalid JSON: {e}")))
    }

    /// Load a scenario file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Build the flow matrix of this scenario.
    ///
    /// # Errors
    ///
    /// Fails unless exactly one of `flow` and `matrix` is present, or if a
    /// reference cannot be resolved.
    pub fn flow_matrix(&self) -> Result<FlowMatrix, CliError> {
        match (&self.flow, &self.matrix) {
            (Some(paths), None) => Self::build_paths(paths),
            (None, Some(raw)) => Self::build_raw(raw),
            _ => Err(CliError::scenario(
                "exactly one of 'flow' and 'matrix' is required",
            )),
        }
    }

    fn build_paths(paths: &FlowPaths) -> Result<FlowMatrix, CliError> {
        let mut builder = FlowMatrixBuilder::new();
        for stream in &paths.streams {
            builder.stream(
                resolve_avatar(&stream.source)?,
                decode_data(stream.data.as_ref())?,
            );
        }
        for edge in &paths.edges {
            let asset = resolve_avatar(&edge.asset)?;
            let from = resolve_avatar(&edge.from)?;
            let to = resolve_avatar(&edge.to)?;
            match edge.stream {
                Some(stream) => builder.terminal(stream, asset, from, to, edge.amount),
                None => builder.edge(asset, from, to, edge.amount),
            };
        }
        Ok(builder.build()?)
    }

    fn build_raw(raw: &RawMatrix) -> Result<FlowMatrix, CliError> {
        let vertices = raw
            .vertices
            .iter()
            .map(String::as_str)
            .map(resolve_avatar)
            .collect::<Result<Vec<_>, _>>()?;
        let triples: Vec<CoordinateTriple> = raw
            .coordinates
            .iter()
            .map(|[asset, sender, receiver]| CoordinateTriple::new(*asset, *sender, *receiver))
            .collect();
        let streams = raw
            .streams
            .iter()
            .map(|s| {
                Ok(Stream {
                    source: s.source,
                    edge_ids: s.edge_ids.clone(),
                    data: decode_data(s.data.as_ref())?,
                })
            })
            .collect::<Result<Vec<_>, CliError>>()?;
        Ok(FlowMatrix {
            vertices,
            edges: raw
                .edges
                .iter()
                .map(|e| FlowEdge {
                    stream_tag: e.stream_tag,
                    amount: e.amount,
                })
                .collect(),
            streams,
            packed_coordinates: coords::pack(&triples),
        })
    }

    /// Set up a hub with everything except the flow.
    ///
    /// # Errors
    ///
    /// Returns the first failing setup step.
    pub fn build_hub(&self) -> Result<Hub, CliError> {
        let hub = Hub::builder()
            .config(self.config.clone())
            .clock(Arc::new(ManualClock::new(self.now)))
            .ledger(InMemoryLedger::new())
            .build()?;

        for policy in &self.policies {
            let address = resolve_avatar(&policy.address)?;
            let deployed = match (policy.allow_mint, policy.allow_burn) {
                (true, true) => StaticPolicy::allow_all(),
                (true, false) => StaticPolicy::mint_only(),
                (false, _) => StaticPolicy::deny_all(),
            };
            hub.deploy_mint_policy(address, Arc::new(deployed));
        }
        for treasury in &self.treasuries {
            let address = resolve_avatar(&treasury.address)?;
            match &treasury.reject {
                Some(reason) => hub.deploy_treasury(address, Arc::new(RejectAll::new(reason))),
                None => hub.deploy_treasury(address, Arc::new(AcceptAll)),
            }
        }
        for hook in &self.acceptance {
            let address = resolve_avatar(&hook.address)?;
            match &hook.reject {
                Some(reason) => hub.set_acceptance_hook(address, Arc::new(RejectAll::new(reason))),
                None => hub.set_acceptance_hook(address, Arc::new(AcceptAll)),
            }
        }

        // balances first so inviters can pay for invitations
        for balance in &self.balances {
            let holder = resolve_avatar(&balance.holder)?;
            let asset = AssetId::of(resolve_avatar(&balance.asset)?);
            hub.with_ledger(|ledger| ledger.mint(holder, asset, balance.amount, &[]))
                .map_err(trustflow_hub::HubError::from)?;
        }

        for avatar in &self.avatars {
            self.register(&hub, avatar)?;
        }
        for trust in &self.trust {
            hub.trust(
                resolve_avatar(&trust.truster)?,
                resolve_avatar(&trust.trustee)?,
                trust.expiry.unwrap_or(INDEFINITE),
            )?;
        }
        for avatar in &self.consented {
            hub.set_consented_flow(resolve_avatar(avatar)?, true)?;
        }
        for approval in &self.approvals {
            hub.set_approval_for_all(
                resolve_avatar(&approval.owner)?,
                resolve_avatar(&approval.operator)?,
                true,
            )?;
        }
        debug!(avatars = self.avatars.len(), trust = self.trust.len(), "scenario hub ready");
        Ok(hub)
    }

    fn register(&self, hub: &Hub, entry: &AvatarEntry) -> Result<(), CliError> {
        let id = resolve_avatar(&entry.id)?;
        match entry.kind {
            AvatarEntryKind::Human => {
                let inviter = entry.inviter.as_deref().map(resolve_avatar).transpose()?;
                hub.register_human(id, inviter, None)?;
            }
            AvatarEntryKind::Group => {
                let policy = entry
                    .mint_policy
                    .as_deref()
                    .ok_or_else(|| CliError::scenario(format!("group '{}' needs a mint_policy", entry.id)))
                    .and_then(resolve_avatar)?;
                let name = entry.name.clone().unwrap_or_else(|| entry.id.clone());
                let symbol = entry.symbol.clone().unwrap_or_default();
                match entry.treasury.as_deref() {
                    Some(treasury) => hub.register_custom_group(
                        id,
                        policy,
                        resolve_avatar(treasury)?,
                        &name,
                        &symbol,
                        None,
                    )?,
                    None => hub.register_group(id, policy, &name, &symbol, None)?,
                }
            }
            AvatarEntryKind::Organization => {
                hub.register_organization(id, entry.name.clone(), None)?;
            }
        }
        Ok(())
    }

    /// Replay the scenario and settle its flow.
    ///
    /// # Errors
    ///
    /// Returns the first failing setup step or the settlement error.
    pub fn run(&self) -> Result<ScenarioOutcome, CliError> {
        let hub = self.build_hub()?;
        let matrix = self.flow_matrix()?;
        let operator = resolve_avatar(&self.operator)?;
        let before = hub.events().len();

        let receipt = hub.settle_flow(operator, &matrix)?;
        let events = hub.events().split_off(before);
        info!(operator = %operator, streams = receipt.streams, "scenario settled");
        Ok(ScenarioOutcome { receipt, events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SIMPLE_PATH: &str = include_str!("../scenarios/simple-path.json");

    #[test]
    fn resolves_names_and_hex() {
        let id = AvatarId::from_low_u64(5);
        assert_eq!(resolve_avatar(&id.to_hex()).unwrap(), id);
        assert_eq!(resolve_avatar("alice").unwrap(), AvatarId::derive("alice"));
        assert!(resolve_avatar("0xzz").is_err());
    }

    #[test]
    fn simple_path_scenario_settles() {
        let scenario = Scenario::from_json(SIMPLE_PATH).unwrap();
        let outcome = scenario.run().unwrap();
        assert_eq!(outcome.receipt.edges, 2);
        assert_eq!(outcome.receipt.streams, 1);
        let nets: Vec<i128> = outcome.receipt.flows.iter().map(|f| f.net).collect();
        assert_eq!(nets.iter().sum::<i128>(), 0);
        assert_eq!(nets.iter().filter(|n| **n == 0).count(), 1);
        assert!(matches!(
            outcome.events.last(),
            Some(HubEvent::StreamCompleted { .. })
        ));
    }

    #[test]
    fn rejecting_receiver_fails_scenario() {
        let mut scenario = Scenario::from_json(SIMPLE_PATH).unwrap();
        scenario.acceptance.push(HookEntry {
            address: "carol".into(),
            reject: Some("not today".into()),
        });
        match scenario.run().unwrap_err() {
            CliError::Hub(err) => assert_eq!(err.code(), "stream_rejected"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn raw_matrix_with_bad_order_is_rejected() {
        let mut scenario = Scenario::from_json(SIMPLE_PATH).unwrap();
        let (a, b) = (AvatarId::derive("alice"), AvatarId::derive("bob"));
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        scenario.flow = None;
        scenario.matrix = Some(RawMatrix {
            vertices: vec![high.to_hex(), low.to_hex()],
            edges: vec![RawEdge {
                stream_tag: 0,
                amount: "1".parse().unwrap(),
            }],
            streams: vec![],
            coordinates: vec![[0, 0, 1]],
        });
        match scenario.run().unwrap_err() {
            CliError::Hub(err) => assert_eq!(err.code(), "vertices_not_ascending"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn flow_and_matrix_are_exclusive() {
        let mut scenario = Scenario::from_json(SIMPLE_PATH).unwrap();
        scenario.flow = None;
        assert!(matches!(
            scenario.flow_matrix().unwrap_err(),
            CliError::Scenario(_)
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SIMPLE_PATH.as_bytes()).unwrap();
        let scenario = Scenario::load(file.path()).unwrap();
        assert_eq!(scenario.operator, "alice");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Scenario::from_json(r#"{"now": 1, "operator": "a", "bogus": true}"#).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }
}
