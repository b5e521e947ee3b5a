//! The settlement hub.
//!
//! [`Hub`] owns the registry, the trust graph, the hook directory and the
//! ledger handle. Every mutating operation runs as one unit of work: on
//! failure the hub state, the hook directory and the ledger are restored to
//! where they were when the unit began. Units are serialized across threads,
//! and so is every query. Hooks are called with `&Hub` and may re-enter;
//! nested operations join the enclosing unit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tracing::{debug, info, warn};
use trustflow_core::{Amount, AssetId, AvatarId, Timestamp};

use crate::clock::{Clock, SystemClock};
use crate::config::HubConfig;
use crate::error::{
    HubError, PermissionError, PolicyOperation, RegistrationError, Result, StructuralError,
};
use crate::events::HubEvent;
use crate::executor;
use crate::flow::{FlowMatrix, SettlementReceipt, VertexFlow};
use crate::hooks::{AcceptanceHook, BurnRequest, HookDirectory, MintPolicy, Treasury};
use crate::issuance::{self, IssueRequest};
use crate::ledger::{InMemoryLedger, Ledger};
use crate::names::{BasicNameValidator, NameValidator};
use crate::reconciler;
use crate::registry::{AvatarKind, AvatarRecord, GroupInfo};
use crate::state::HubState;
use crate::trust::TrustEdge;
use crate::verifier::verify_flow_matrix;

/// Builder for [`Hub`].
#[derive(Default)]
pub struct HubBuilder {
    config: HubConfig,
    clock: Option<Arc<dyn Clock>>,
    names: Option<Arc<dyn NameValidator>>,
    ledger: Option<Box<dyn Ledger>>,
    hooks: HookDirectory,
}

impl HubBuilder {
    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: HubConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the time source. Defaults to [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the naming service. Defaults to [`BasicNameValidator`] with the
    /// configured limits.
    #[must_use]
    pub fn name_validator(mut self, names: Arc<dyn NameValidator>) -> Self {
        self.names = Some(names);
        self
    }

    /// Set the ledger. Defaults to an empty [`InMemoryLedger`].
    #[must_use]
    pub fn ledger(mut self, ledger: impl Ledger + 'static) -> Self {
        self.ledger = Some(Box::new(ledger));
        self
    }

    /// Deploy a mint policy at `address`.
    #[must_use]
    pub fn mint_policy(mut self, address: AvatarId, policy: Arc<dyn MintPolicy>) -> Self {
        self.hooks.deploy_mint_policy(address, policy);
        self
    }

    /// Deploy a treasury at `address`.
    #[must_use]
    pub fn treasury(mut self, address: AvatarId, treasury: Arc<dyn Treasury>) -> Self {
        self.hooks.deploy_treasury(address, treasury);
        self
    }

    /// Build the hub.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<Hub> {
        self.config.validate()?;
        let names = self
            .names
            .unwrap_or_else(|| Arc::new(BasicNameValidator::new(self.config.names.clone())));
        Ok(Hub {
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            names,
            ledger: Mutex::new(self.ledger.unwrap_or_else(|| Box::new(InMemoryLedger::new()))),
            hooks: RwLock::new(self.hooks),
            state: RwLock::new(HubState::default()),
            serial: ReentrantMutex::new(()),
            settling: AtomicBool::new(false),
            config: self.config,
        })
    }
}

/// Clears the settlement flag when dropped.
struct SettlementGuard<'a>(&'a AtomicBool);

impl<'a> SettlementGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            return Err(HubError::Reentrancy);
        }
        Ok(Self(flag))
    }
}

impl Drop for SettlementGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The settlement hub.
pub struct Hub {
    config: HubConfig,
    clock: Arc<dyn Clock>,
    names: Arc<dyn NameValidator>,
    pub(crate) state: RwLock<HubState>,
    pub(crate) ledger: Mutex<Box<dyn Ledger>>,
    pub(crate) hooks: RwLock<HookDirectory>,
    serial: ReentrantMutex<()>,
    settling: AtomicBool,
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("config", &self.config)
            .field("avatars", &self.state.read().registry.len())
            .field("settling", &self.settling.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Hub {
    /// Start building a hub.
    #[must_use]
    pub fn builder() -> HubBuilder {
        HubBuilder::default()
    }

    /// Run `f` as one unit of work.
    ///
    /// Units nest; an inner failure only undoes the inner unit, but the error
    /// usually propagates and undoes the outer one as well.
    pub(crate) fn atomically<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&Self) -> Result<T>,
    ) -> Result<T> {
        let _serial = self.serial.lock();
        let snapshot = self.state.read().clone();
        let hooks = self.hooks.read().clone();
        let checkpoint = self.ledger.lock().checkpoint();
        debug!(operation, depth = checkpoint.depth(), "unit of work started");

        let outcome = f(self).and_then(|value| {
            self.ledger.lock().commit(checkpoint)?;
            Ok(value)
        });
        if let Err(err) = &outcome {
            *self.state.write() = snapshot;
            *self.hooks.write() = hooks;
            if let Err(ledger_err) = self.ledger.lock().rollback(checkpoint) {
                warn!(operation, error = %ledger_err, "ledger rollback failed");
            }
            warn!(operation, code = err.code(), error = %err, "unit of work rolled back");
        }
        outcome
    }

    fn record(&self, event: HubEvent) {
        debug!(event = event.name(), "event recorded");
        self.state.write().record(event);
    }

    // ===== Registration =====

    /// Register `caller` as a human.
    ///
    /// While the bootstrap window is open no inviter is needed. Afterwards the
    /// inviter must be a human that trusts `caller`, and it burns the
    /// configured invitation cost of its own currency.
    ///
    /// # Errors
    ///
    /// Registration and permission errors, or a ledger error if the inviter
    /// cannot pay.
    pub fn register_human(
        &self,
        caller: AvatarId,
        inviter: Option<AvatarId>,
        metadata: Option<String>,
    ) -> Result<()> {
        self.atomically("register_human", |hub| {
            let now = hub.now();
            {
                let state = hub.state.read();
                if caller.is_reserved() {
                    return Err(RegistrationError::ReservedId(caller).into());
                }
                if state.registry.is_registered(caller) {
                    return Err(RegistrationError::AlreadyRegistered(caller).into());
                }
                match inviter {
                    None if !hub.config.bootstrap_open(now) => {
                        return Err(RegistrationError::InviterRequired.into());
                    }
                    None => {}
                    Some(inviter) => {
                        if state.registry.classify(inviter) != AvatarKind::Human {
                            return Err(RegistrationError::NotAHuman(inviter).into());
                        }
                        if !state.trust.is_trusted(inviter, caller, now) {
                            return Err(PermissionError::InviterDoesNotTrust {
                                inviter,
                                invitee: caller,
                            }
                            .into());
                        }
                    }
                }
            }

            if let Some(inviter) = inviter {
                let cost = hub.config.invitation_cost;
                if !cost.is_zero() {
                    let asset = AssetId::of(inviter);
                    hub.ledger.lock().burn(inviter, asset, cost)?;
                    hub.record(HubEvent::Burn {
                        burner: inviter,
                        asset,
                        amount: cost,
                    });
                }
            }

            {
                let mut state = hub.state.write();
                state
                    .registry
                    .insert(caller, AvatarRecord::human(now, inviter, metadata))?;
                state.trust.establish_self_trust(caller);
            }
            hub.record(HubEvent::RegisterHuman {
                avatar: caller,
                inviter,
            });
            info!(avatar = %caller, inviter = ?inviter, "human registered");
            Ok(())
        })
    }

    /// Register `caller` as a group using the configured standard treasury.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::NullTreasury`] if no standard treasury is
    /// configured, otherwise as [`Hub::register_custom_group`].
    pub fn register_group(
        &self,
        caller: AvatarId,
        mint_policy: AvatarId,
        name: &str,
        symbol: &str,
        metadata: Option<String>,
    ) -> Result<()> {
        let treasury = self.config.standard_treasury.unwrap_or(AvatarId::NULL);
        self.register_custom_group(caller, mint_policy, treasury, name, symbol, metadata)
    }

    /// Register `caller` as a group with its own treasury.
    ///
    /// # Errors
    ///
    /// Fails if `caller` is registered or reserved, the policy or treasury is
    /// null, or the naming service rejects the name or symbol.
    pub fn register_custom_group(
        &self,
        caller: AvatarId,
        mint_policy: AvatarId,
        treasury: AvatarId,
        name: &str,
        symbol: &str,
        metadata: Option<String>,
    ) -> Result<()> {
        if mint_policy.is_null() {
            return Err(RegistrationError::NullMintPolicy.into());
        }
        if treasury.is_null() {
            return Err(RegistrationError::NullTreasury.into());
        }
        self.names
            .validate_name(name)
            .map_err(|reason| RegistrationError::InvalidName {
                name: name.to_string(),
                reason,
            })?;
        self.names
            .validate_symbol(symbol)
            .map_err(|reason| RegistrationError::InvalidSymbol {
                symbol: symbol.to_string(),
                reason,
            })?;

        let _serial = self.serial.lock();
        let info = GroupInfo {
            mint_policy,
            treasury,
            name: name.to_string(),
            symbol: symbol.to_string(),
            metadata,
        };
        {
            let mut state = self.state.write();
            state.registry.insert(caller, AvatarRecord::Group(info))?;
            state.trust.establish_self_trust(caller);
        }
        self.record(HubEvent::RegisterGroup {
            group: caller,
            mint_policy,
            treasury,
            name: name.to_string(),
            symbol: symbol.to_string(),
        });
        info!(group = %caller, name, symbol, "group registered");
        Ok(())
    }

    /// Register `caller` as an organization.
    ///
    /// # Errors
    ///
    /// Fails if `caller` is registered or reserved.
    pub fn register_organization(
        &self,
        caller: AvatarId,
        name: Option<String>,
        metadata: Option<String>,
    ) -> Result<()> {
        let _serial = self.serial.lock();
        {
            let mut state = self.state.write();
            state.registry.insert(
                caller,
                AvatarRecord::Organization {
                    name: name.clone(),
                    metadata,
                },
            )?;
            state.trust.establish_self_trust(caller);
        }
        self.record(HubEvent::RegisterOrganization {
            organization: caller,
            name,
        });
        info!(organization = %caller, "organization registered");
        Ok(())
    }

    // ===== Trust and consent =====

    /// Set the expiry of `truster`'s trust in `trustee`.
    ///
    /// An expiry in the past is clamped to the present, which revokes the
    /// trust from the next second on.
    ///
    /// # Errors
    ///
    /// Fails if `truster` is unregistered, `trustee` is reserved, or the two
    /// are equal.
    pub fn trust(&self, truster: AvatarId, trustee: AvatarId, expiry: Timestamp) -> Result<()> {
        let _serial = self.serial.lock();
        let now = self.now();
        let expiry = expiry.max(now);
        {
            let mut state = self.state.write();
            state.registry.require(truster)?;
            if trustee.is_reserved() {
                return Err(StructuralError::ReservedAvatar(trustee).into());
            }
            let update = state.trust.upsert(truster, trustee, expiry)?;
            debug!(truster = %truster, trustee = %trustee, ?update, "trust upserted");
        }
        self.record(HubEvent::Trust {
            truster,
            trustee,
            expiry,
        });
        info!(truster = %truster, trustee = %trustee, expiry, "trust set");
        Ok(())
    }

    /// Opt `caller` in or out of consented flow.
    ///
    /// # Errors
    ///
    /// Fails if `caller` is unregistered.
    pub fn set_consented_flow(&self, caller: AvatarId, enabled: bool) -> Result<()> {
        let _serial = self.serial.lock();
        {
            let mut state = self.state.write();
            state.registry.require(caller)?;
            state.trust.set_consented(caller, enabled);
        }
        self.record(HubEvent::ConsentedFlow {
            avatar: caller,
            enabled,
        });
        info!(avatar = %caller, enabled, "consented flow set");
        Ok(())
    }

    /// Allow or forbid `operator` to settle flows sourced at `owner`.
    ///
    /// # Errors
    ///
    /// Fails if `owner` and `operator` are the same avatar.
    pub fn set_approval_for_all(
        &self,
        owner: AvatarId,
        operator: AvatarId,
        approved: bool,
    ) -> Result<()> {
        if owner == operator {
            return Err(PermissionError::SelfApproval(owner).into());
        }
        let _serial = self.serial.lock();
        self.state.write().set_approval(owner, operator, approved);
        self.record(HubEvent::ApprovalForAll {
            owner,
            operator,
            approved,
        });
        info!(owner = %owner, operator = %operator, approved, "operator approval set");
        Ok(())
    }

    // ===== Currency =====

    /// Mint `group` currency to `caller` against collateral the group trusts.
    ///
    /// Returns the amount minted.
    ///
    /// # Errors
    ///
    /// See [`crate::issuance`].
    pub fn group_mint(
        &self,
        caller: AvatarId,
        group: AvatarId,
        collateral: &[AvatarId],
        amounts: &[Amount],
        data: &[u8],
    ) -> Result<Amount> {
        self.atomically("group_mint", |hub| {
            issuance::issue(
                hub,
                &IssueRequest {
                    sender: caller,
                    receiver: caller,
                    group,
                    collateral,
                    amounts,
                    data,
                    direct: true,
                },
                hub.now(),
            )
        })
    }

    /// Burn `amount` of `asset` held by `caller`.
    ///
    /// Group currency can only be burned with the consent of the group's
    /// mint policy.
    ///
    /// # Errors
    ///
    /// A policy rejection or a ledger error.
    pub fn burn(&self, caller: AvatarId, asset: AssetId, amount: Amount, data: &[u8]) -> Result<()> {
        self.atomically("burn", |hub| {
            let group = hub.group(asset.issuer());
            if let Some(info) = group {
                let policy = hub.hooks.read().mint_policy(info.mint_policy);
                let request = BurnRequest {
                    burner: caller,
                    group: asset.issuer(),
                    amount,
                    data,
                };
                let allowed = policy.is_some_and(|policy| policy.before_burn(hub, &request));
                if !allowed {
                    return Err(HubError::PolicyRejection {
                        group: asset.issuer(),
                        policy: info.mint_policy,
                        operation: PolicyOperation::Burn,
                        reason: "before_burn refused".to_string(),
                    });
                }
            }
            hub.ledger.lock().burn(caller, asset, amount)?;
            hub.record(HubEvent::Burn {
                burner: caller,
                asset,
                amount,
            });
            info!(burner = %caller, asset = %asset, amount = %amount, "burned");
            Ok(())
        })
    }

    // ===== Settlement =====

    /// Settle a flow matrix on behalf of `operator`.
    ///
    /// Verification runs before any mutation; execution and reconciliation
    /// run in one unit of work. Re-entrant settlements are rejected.
    ///
    /// # Errors
    ///
    /// Any verification, execution or reconciliation failure. Nothing is
    /// applied in that case.
    pub fn settle_flow(&self, operator: AvatarId, matrix: &FlowMatrix) -> Result<SettlementReceipt> {
        let _serial = self.serial.lock();
        let _guard = SettlementGuard::acquire(&self.settling)?;
        self.atomically("settle_flow", |hub| {
            let now = hub.now();
            let verified = {
                let state = hub.state.read();
                let verified =
                    verify_flow_matrix(&state, now, hub.config.max_flow_vertices, matrix)?;
                for (index, stream) in matrix.streams.iter().enumerate() {
                    let source = matrix
                        .vertices
                        .get(usize::from(stream.source))
                        .copied()
                        .ok_or(StructuralError::StreamSourceOutOfRange {
                            stream: index,
                            coordinate: stream.source,
                        })?;
                    if !state.is_approved(source, operator) {
                        return Err(PermissionError::OperatorNotApproved {
                            operator,
                            owner: source,
                        }
                        .into());
                    }
                }
                verified
            };
            debug!(
                operator = %operator,
                vertices = matrix.vertices.len(),
                edges = matrix.edges.len(),
                "flow matrix verified"
            );

            let plan = executor::execute(hub, matrix, &verified, now)?;
            reconciler::reconcile(hub, operator, matrix, &verified, &plan)?;

            let flows = matrix
                .vertices
                .iter()
                .zip(verified.net_flow.as_slice())
                .map(|(avatar, net)| VertexFlow {
                    avatar: *avatar,
                    net: *net,
                })
                .collect();
            info!(
                operator = %operator,
                edges = matrix.edges.len(),
                streams = matrix.streams.len(),
                "flow settled"
            );
            Ok(SettlementReceipt {
                operator,
                flows,
                edges: matrix.edges.len(),
                streams: matrix.streams.len(),
            })
        })
    }

    // ===== Hooks =====

    /// Deploy a mint policy at `address`.
    pub fn deploy_mint_policy(&self, address: AvatarId, policy: Arc<dyn MintPolicy>) {
        let _serial = self.serial.lock();
        self.hooks.write().deploy_mint_policy(address, policy);
    }

    /// Deploy a treasury at `address`.
    pub fn deploy_treasury(&self, address: AvatarId, treasury: Arc<dyn Treasury>) {
        let _serial = self.serial.lock();
        self.hooks.write().deploy_treasury(address, treasury);
    }

    /// Install the acceptance hook of `avatar`.
    pub fn set_acceptance_hook(&self, avatar: AvatarId, hook: Arc<dyn AcceptanceHook>) {
        let _serial = self.serial.lock();
        self.hooks.write().set_acceptance_hook(avatar, hook);
    }

    /// Run `f` with exclusive access to the ledger.
    ///
    /// Waits for a unit of work running on another thread to finish.
    /// Mutations made here are not rolled back by a later failure.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&mut dyn Ledger) -> R) -> R {
        let _serial = self.serial.lock();
        let mut ledger = self.ledger.lock();
        f(ledger.as_mut())
    }

    // ===== Queries =====
    //
    // Queries wait for a unit of work running on another thread, so they only
    // observe committed state. Hooks running inside a unit may still query.

    /// Current time of the hub clock.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// The hub configuration.
    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Classify `avatar`.
    #[must_use]
    pub fn classify(&self, avatar: AvatarId) -> AvatarKind {
        let _serial = self.serial.lock();
        self.state.read().registry.classify(avatar)
    }

    /// Whether `avatar` is registered.
    #[must_use]
    pub fn is_registered(&self, avatar: AvatarId) -> bool {
        let _serial = self.serial.lock();
        self.state.read().registry.is_registered(avatar)
    }

    /// Whether `avatar` is a registered human.
    #[must_use]
    pub fn is_human(&self, avatar: AvatarId) -> bool {
        self.classify(avatar) == AvatarKind::Human
    }

    /// Whether `avatar` is a registered group.
    #[must_use]
    pub fn is_group(&self, avatar: AvatarId) -> bool {
        self.classify(avatar) == AvatarKind::Group
    }

    /// Whether `avatar` is a registered organization.
    #[must_use]
    pub fn is_organization(&self, avatar: AvatarId) -> bool {
        self.classify(avatar) == AvatarKind::Organization
    }

    /// Group data of `avatar`.
    #[must_use]
    pub fn group(&self, avatar: AvatarId) -> Option<GroupInfo> {
        let _serial = self.serial.lock();
        self.state.read().registry.group(avatar).cloned()
    }

    /// Registered avatars in registration order.
    #[must_use]
    pub fn avatars(&self) -> Vec<(AvatarId, AvatarKind)> {
        let _serial = self.serial.lock();
        self.state
            .read()
            .registry
            .iter()
            .map(|(id, record)| (id, record.kind()))
            .collect()
    }

    /// Whether `truster` trusts `trustee` now.
    #[must_use]
    pub fn is_trusted(&self, truster: AvatarId, trustee: AvatarId) -> bool {
        let _serial = self.serial.lock();
        self.state.read().trust.is_trusted(truster, trustee, self.now())
    }

    /// Whether `asset` may currently move from `from` to `to`.
    #[must_use]
    pub fn is_permitted_flow(&self, from: AvatarId, to: AvatarId, asset: AvatarId) -> bool {
        let _serial = self.serial.lock();
        self.state.read().is_permitted_flow(from, to, asset, self.now())
    }

    /// Outgoing trust edges of `truster` in insertion order.
    #[must_use]
    pub fn trustees(&self, truster: AvatarId) -> Vec<TrustEdge> {
        let _serial = self.serial.lock();
        self.state.read().trust.trustees(truster)
    }

    /// Whether `avatar` opted into consented flow.
    #[must_use]
    pub fn has_consented_flow(&self, avatar: AvatarId) -> bool {
        let _serial = self.serial.lock();
        self.state.read().trust.has_consented(avatar)
    }

    /// Whether `operator` may settle flows sourced at `owner`.
    #[must_use]
    pub fn is_approved_for_all(&self, owner: AvatarId, operator: AvatarId) -> bool {
        let _serial = self.serial.lock();
        self.state.read().is_approved(owner, operator)
    }

    /// Balance of `asset` held by `holder`.
    #[must_use]
    pub fn balance_of(&self, holder: AvatarId, asset: AssetId) -> Amount {
        let _serial = self.serial.lock();
        self.ledger.lock().balance_of(holder, asset)
    }

    /// The event journal.
    #[must_use]
    pub fn events(&self) -> Vec<HubEvent> {
        let _serial = self.serial.lock();
        self.state.read().events().to_vec()
    }

    /// Whether a settlement is in progress.
    #[must_use]
    pub fn is_settling(&self) -> bool {
        self.settling.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::hooks::StaticPolicy;
    use crate::names::NameValidator;
    use trustflow_core::INDEFINITE;
    use trustflow_core::amount::ATTO_PER_TOKEN;

    fn avatar(n: u64) -> AvatarId {
        AvatarId::from_low_u64(n)
    }

    fn tokens(n: u128) -> Amount {
        Amount::from_atto(n * ATTO_PER_TOKEN)
    }

    fn hub_at(now: Timestamp, config: HubConfig) -> (Hub, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(now));
        let hub = Hub::builder()
            .config(config)
            .clock(clock.clone())
            .build()
            .unwrap();
        (hub, clock)
    }

    #[test]
    fn registration_classifies_and_installs_self_trust() {
        let (hub, _) = hub_at(100, HubConfig::default());
        hub.register_human(avatar(2), None, None).unwrap();
        hub.register_custom_group(avatar(3), avatar(90), avatar(91), "Commons", "CMN", None)
            .unwrap();
        hub.register_organization(avatar(4), Some("Bakery".into()), None)
            .unwrap();

        assert!(hub.is_human(avatar(2)));
        assert!(hub.is_group(avatar(3)));
        assert!(hub.is_organization(avatar(4)));
        assert_eq!(hub.classify(avatar(5)), AvatarKind::Unregistered);
        for n in 2..=4 {
            assert!(hub.is_trusted(avatar(n), avatar(n)));
        }
        let names: Vec<_> = hub.events().iter().map(HubEvent::name).collect();
        assert_eq!(
            names,
            vec!["register_human", "register_group", "register_organization"]
        );
    }

    #[test]
    fn duplicate_registration_fails_across_kinds() {
        let (hub, _) = hub_at(100, HubConfig::default());
        hub.register_human(avatar(2), None, None).unwrap();
        let err = hub.register_organization(avatar(2), None, None).unwrap_err();
        assert_eq!(err.code(), "already_registered");
        assert!(hub.is_human(avatar(2)));
    }

    #[test]
    fn group_requires_policy_and_treasury() {
        let (hub, _) = hub_at(100, HubConfig::default());
        let err = hub
            .register_custom_group(avatar(3), AvatarId::NULL, avatar(91), "G", "G", None)
            .unwrap_err();
        assert_eq!(err.code(), "null_mint_policy");
        let err = hub
            .register_custom_group(avatar(3), avatar(90), AvatarId::NULL, "G", "G", None)
            .unwrap_err();
        assert_eq!(err.code(), "null_treasury");
        let err = hub
            .register_group(avatar(3), avatar(90), "G", "G", None)
            .unwrap_err();
        assert_eq!(err.code(), "null_treasury");
        assert!(!hub.is_registered(avatar(3)));
    }

    #[test]
    fn standard_treasury_is_used() {
        let config = HubConfig {
            standard_treasury: Some(avatar(91)),
            ..HubConfig::default()
        };
        let (hub, _) = hub_at(100, config);
        hub.register_group(avatar(3), avatar(90), "Commons", "CMN", None)
            .unwrap();
        assert_eq!(hub.group(avatar(3)).unwrap().treasury, avatar(91));
    }

    #[test]
    fn group_names_are_validated() {
        let (hub, _) = hub_at(100, HubConfig::default());
        let err = hub
            .register_custom_group(avatar(3), avatar(90), avatar(91), "bad;name", "OK", None)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_name");
        let err = hub
            .register_custom_group(avatar(3), avatar(90), avatar(91), "Good", "B D", None)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_symbol");
    }

    #[test]
    fn custom_name_validator() {
        struct OnlyUpper;
        impl NameValidator for OnlyUpper {
            fn validate_name(&self, name: &str) -> std::result::Result<(), String> {
                if name.chars().all(|c| c.is_ascii_uppercase()) {
                    Ok(())
                } else {
                    Err("uppercase only".into())
                }
            }
            fn validate_symbol(&self, _symbol: &str) -> std::result::Result<(), String> {
                Ok(())
            }
        }
        let hub = Hub::builder()
            .name_validator(Arc::new(OnlyUpper))
            .clock(Arc::new(ManualClock::new(1)))
            .build()
            .unwrap();
        assert!(
            hub.register_custom_group(avatar(3), avatar(90), avatar(91), "abc", "A", None)
                .is_err()
        );
        hub.register_custom_group(avatar(3), avatar(90), avatar(91), "ABC", "A b", None)
            .unwrap();
    }

    #[test]
    fn trust_validates_parties() {
        let (hub, _) = hub_at(100, HubConfig::default());
        assert_eq!(
            hub.trust(avatar(2), avatar(3), INDEFINITE).unwrap_err().code(),
            "not_registered"
        );
        hub.register_human(avatar(2), None, None).unwrap();
        assert_eq!(
            hub.trust(avatar(2), AvatarId::NULL, INDEFINITE).unwrap_err().code(),
            "reserved_avatar"
        );
        assert_eq!(
            hub.trust(avatar(2), AvatarId::SENTINEL, INDEFINITE)
                .unwrap_err()
                .code(),
            "reserved_avatar"
        );
        assert_eq!(
            hub.trust(avatar(2), avatar(2), 0).unwrap_err().code(),
            "self_trust"
        );
        // trustee need not be registered
        hub.trust(avatar(2), avatar(3), INDEFINITE).unwrap();
        assert!(hub.is_trusted(avatar(2), avatar(3)));
    }

    #[test]
    fn past_expiry_is_clamped_to_now() {
        let (hub, clock) = hub_at(100, HubConfig::default());
        hub.register_human(avatar(2), None, None).unwrap();
        hub.trust(avatar(2), avatar(3), INDEFINITE).unwrap();
        hub.trust(avatar(2), avatar(3), 5).unwrap();

        assert_eq!(hub.trustees(avatar(2))[1].expiry, 100);
        assert!(hub.is_trusted(avatar(2), avatar(3)));
        clock.advance(1);
        assert!(!hub.is_trusted(avatar(2), avatar(3)));
    }

    #[test]
    fn invitation_required_after_bootstrap() {
        let config = HubConfig {
            bootstrap_until: Some(50),
            ..HubConfig::default()
        };
        let (hub, clock) = hub_at(10, config);
        hub.register_human(avatar(2), None, None).unwrap();
        hub.with_ledger(|ledger| ledger.mint(avatar(2), AssetId::of(avatar(2)), tokens(100), &[]))
            .unwrap();

        clock.set(60);
        assert_eq!(
            hub.register_human(avatar(3), None, None).unwrap_err().code(),
            "inviter_required"
        );
        assert_eq!(
            hub.register_human(avatar(3), Some(avatar(2)), None)
                .unwrap_err()
                .code(),
            "inviter_does_not_trust"
        );
        assert_eq!(
            hub.register_human(avatar(3), Some(avatar(9)), None)
                .unwrap_err()
                .code(),
            "not_a_human"
        );

        hub.trust(avatar(2), avatar(3), INDEFINITE).unwrap();
        hub.register_human(avatar(3), Some(avatar(2)), None).unwrap();
        assert!(hub.is_human(avatar(3)));
        assert_eq!(hub.balance_of(avatar(2), AssetId::of(avatar(2))), tokens(4));
    }

    #[test]
    fn failed_invitation_leaves_no_trace() {
        let config = HubConfig {
            bootstrap_until: Some(0),
            ..HubConfig::default()
        };
        let (hub, _) = hub_at(0, config);
        hub.register_human(avatar(2), None, None).unwrap();
        hub.trust(avatar(2), avatar(3), INDEFINITE).unwrap();
        let before = hub.events().len();

        // inviter holds nothing, so the burn fails
        let err = hub.register_human(avatar(3), Some(avatar(2)), None).unwrap_err();
        assert_eq!(err.code(), "insufficient_balance");
        assert!(!hub.is_registered(avatar(3)));
        assert_eq!(hub.events().len(), before);
    }

    #[test]
    fn consent_and_approval() {
        let (hub, _) = hub_at(100, HubConfig::default());
        assert_eq!(
            hub.set_consented_flow(avatar(2), true).unwrap_err().code(),
            "not_registered"
        );
        hub.register_human(avatar(2), None, None).unwrap();
        hub.set_consented_flow(avatar(2), true).unwrap();
        assert!(hub.has_consented_flow(avatar(2)));

        assert_eq!(
            hub.set_approval_for_all(avatar(2), avatar(2), true)
                .unwrap_err()
                .code(),
            "self_approval"
        );
        hub.set_approval_for_all(avatar(2), avatar(7), true).unwrap();
        assert!(hub.is_approved_for_all(avatar(2), avatar(7)));
        assert!(hub.is_approved_for_all(avatar(7), avatar(7)));
    }

    #[test]
    fn burn_consults_group_policy() {
        let (hub, _) = hub_at(100, HubConfig::default());
        hub.deploy_mint_policy(avatar(90), Arc::new(StaticPolicy::mint_only()));
        hub.register_custom_group(avatar(3), avatar(90), avatar(91), "Commons", "CMN", None)
            .unwrap();
        hub.register_human(avatar(2), None, None).unwrap();
        hub.with_ledger(|ledger| {
            ledger.mint(avatar(2), AssetId::of(avatar(3)), tokens(5), &[])?;
            ledger.mint(avatar(2), AssetId::of(avatar(2)), tokens(5), &[])
        })
        .unwrap();

        let err = hub
            .burn(avatar(2), AssetId::of(avatar(3)), tokens(1), &[])
            .unwrap_err();
        assert_eq!(err.code(), "burn_rejected");
        assert_eq!(hub.balance_of(avatar(2), AssetId::of(avatar(3))), tokens(5));

        hub.burn(avatar(2), AssetId::of(avatar(2)), tokens(1), &[])
            .unwrap();
        assert_eq!(hub.balance_of(avatar(2), AssetId::of(avatar(2))), tokens(4));
    }

    #[test]
    fn invalid_config_is_rejected_by_builder() {
        let config = HubConfig {
            max_flow_vertices: 0,
            ..HubConfig::default()
        };
        assert_eq!(Hub::builder().config(config).build().unwrap_err().code(), "config");
    }
}
