//! Registration and trust graph tests.
//!
//! Tests avatar lifecycle through the public hub API:
//! 1. Bootstrap and invited human registration
//! 2. Group and organization registration
//! 3. Self-trust, trust updates and expiry

use trustflow_core::{AvatarId, INDEFINITE};
use trustflow_hub::{
    AvatarKind, ErrorKind, HubConfig, HubError, HubEvent, PermissionError, RegistrationError,
};
use trustflow_integration_tests::{Fixture, NOW, POLICY, avatar, raw_matrix, stream, tokens};

// ============================================================================
// Helper Functions
// ============================================================================

/// Hub whose bootstrap window closed before [`NOW`].
fn closed_bootstrap() -> Fixture {
    Fixture::with_config(HubConfig {
        bootstrap_until: Some(NOW - 1),
        ..HubConfig::default()
    })
}

// ============================================================================
// Human Registration
// ============================================================================

#[test]
fn bootstrap_window_allows_uninvited_humans() {
    let fx = Fixture::with_config(HubConfig {
        bootstrap_until: Some(NOW + 60),
        ..HubConfig::default()
    });

    fx.hub.register_human(avatar(10), None, None).unwrap();
    fx.clock.advance(61);
    let err = fx.hub.register_human(avatar(20), None, None).unwrap_err();

    assert_eq!(
        err,
        HubError::Registration(RegistrationError::InviterRequired)
    );
    assert!(fx.hub.is_human(avatar(10)));
    assert!(!fx.hub.is_registered(avatar(20)));
}

#[test]
fn invitation_burns_inviter_currency() {
    let fx = Fixture::with_config(HubConfig {
        bootstrap_until: Some(NOW),
        ..HubConfig::default()
    });
    let cost = fx.hub.config().invitation_cost;
    let inviter = fx.human(10, 200);
    let invitee = avatar(20);
    fx.trust(inviter, invitee);
    fx.clock.advance(1);

    fx.hub
        .register_human(invitee, Some(inviter), Some("ipfs://profile".into()))
        .unwrap();

    assert!(fx.hub.is_human(invitee));
    assert_eq!(
        fx.balance(inviter, inviter).as_atto(),
        tokens(200).as_atto() - cost.as_atto()
    );
    let events = fx.hub.events();
    assert!(events.contains(&HubEvent::RegisterHuman {
        avatar: invitee,
        inviter: Some(inviter),
    }));
    assert!(events.iter().any(|e| matches!(e, HubEvent::Burn { burner, .. } if *burner == inviter)));
}

#[test]
fn uninvited_registration_after_bootstrap_fails() {
    let fx = closed_bootstrap();

    let err = fx.hub.register_human(avatar(10), None, None).unwrap_err();

    assert_eq!(err.code(), "inviter_required");
}

#[test]
fn inviter_must_trust_invitee() {
    let fx = Fixture::new();
    let inviter = fx.human(10, 200);

    let err = fx
        .hub
        .register_human(avatar(20), Some(inviter), None)
        .unwrap_err();

    assert!(matches!(
        err,
        HubError::Permission(PermissionError::InviterDoesNotTrust { .. })
    ));
    assert_eq!(fx.balance(inviter, inviter), tokens(200));
}

#[test]
fn inviter_without_funds_cannot_invite() {
    let fx = Fixture::new();
    let inviter = fx.human(10, 1);
    fx.trust(inviter, avatar(20));

    let err = fx
        .hub
        .register_human(avatar(20), Some(inviter), None)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Ledger);
    assert!(!fx.hub.is_registered(avatar(20)));
    assert!(!fx.hub.events().iter().any(|e| matches!(e, HubEvent::Burn { .. })));
}

#[test]
fn group_cannot_invite() {
    let fx = Fixture::new();
    let g = fx.group(40);
    fx.trust(g, avatar(20));

    let err = fx.hub.register_human(avatar(20), Some(g), None).unwrap_err();

    assert_eq!(err.code(), "not_a_human");
}

#[test]
fn reserved_and_duplicate_ids_are_rejected() {
    let fx = Fixture::new();
    fx.human(10, 0);

    for id in [AvatarId::NULL, AvatarId::SENTINEL] {
        assert_eq!(
            fx.hub.register_human(id, None, None).unwrap_err().code(),
            "reserved_id"
        );
    }
    assert_eq!(
        fx.hub.register_human(avatar(10), None, None).unwrap_err().code(),
        "already_registered"
    );
    assert_eq!(
        fx.hub
            .register_organization(avatar(10), None, None)
            .unwrap_err()
            .code(),
        "already_registered"
    );
}

// ============================================================================
// Groups and Organizations
// ============================================================================

#[test]
fn group_registration_requires_policy_and_treasury() {
    let fx = Fixture::new();

    let null_policy = fx
        .hub
        .register_custom_group(avatar(40), AvatarId::NULL, avatar(50), "G", "G", None)
        .unwrap_err();
    assert_eq!(null_policy.code(), "null_mint_policy");

    // default config has no standard treasury
    let no_treasury = fx
        .hub
        .register_group(avatar(40), avatar(POLICY), "G", "G", None)
        .unwrap_err();
    assert_eq!(no_treasury.code(), "null_treasury");
}

#[test]
fn standard_treasury_is_used_when_configured() {
    let fx = Fixture::with_config(HubConfig {
        standard_treasury: Some(avatar(800)),
        ..HubConfig::default()
    });

    fx.hub
        .register_group(avatar(40), avatar(POLICY), "Commons", "CMN", None)
        .unwrap();

    let info = fx.hub.group(avatar(40)).unwrap();
    assert_eq!(info.treasury, avatar(800));
    assert_eq!(info.symbol, "CMN");
    assert_eq!(fx.hub.classify(avatar(40)), AvatarKind::Group);
}

#[test]
fn group_names_are_validated() {
    let fx = Fixture::new();

    let err = fx
        .hub
        .register_custom_group(avatar(40), avatar(POLICY), avatar(50), "", "G", None)
        .unwrap_err();
    assert_eq!(err.code(), "invalid_name");

    let err = fx
        .hub
        .register_custom_group(avatar(40), avatar(POLICY), avatar(50), "Good", "bad symbol!", None)
        .unwrap_err();
    assert_eq!(err.code(), "invalid_symbol");
    assert!(!fx.hub.is_registered(avatar(40)));
}

#[test]
fn organizations_register_without_currency() {
    let fx = Fixture::new();

    fx.hub
        .register_organization(avatar(60), Some("Bakery".into()), None)
        .unwrap();

    assert!(fx.hub.is_organization(avatar(60)));
    assert!(fx.hub.is_trusted(avatar(60), avatar(60)));
    assert_eq!(
        fx.hub.avatars(),
        vec![(avatar(60), AvatarKind::Organization)]
    );
}

// ============================================================================
// Trust
// ============================================================================

#[test]
fn self_trust_is_implicit_and_immutable() {
    let fx = Fixture::new();
    let a = fx.human(10, 0);

    assert!(fx.hub.is_trusted(a, a));
    let err = fx.hub.trust(a, a, NOW).unwrap_err();
    assert_eq!(err, HubError::Permission(PermissionError::SelfTrust(a)));

    fx.clock.advance(10_000_000);
    assert!(fx.hub.is_trusted(a, a));
}

#[test]
fn repeated_trust_updates_a_single_edge() {
    let fx = Fixture::new();
    let (a, b) = (fx.human(10, 0), fx.human(20, 0));

    fx.hub.trust(a, b, NOW + 100).unwrap();
    fx.hub.trust(a, b, NOW + 100).unwrap();
    fx.hub.trust(a, b, INDEFINITE).unwrap();

    let edges: Vec<_> = fx
        .hub
        .trustees(a)
        .into_iter()
        .filter(|edge| edge.trustee == b)
        .collect();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].expiry, INDEFINITE);
}

#[test]
fn expired_trust_blocks_flow() {
    let fx = Fixture::new();
    let (a, b) = (fx.human(10, 10), fx.human(20, 0));
    fx.hub.trust(b, a, NOW + 30).unwrap();
    let matrix = raw_matrix(&[a, b], &[(0, 0, 1, 1, 1)], vec![stream(0, &[0])]);

    assert!(fx.hub.is_permitted_flow(a, b, a));
    fx.clock.advance(31);
    assert!(!fx.hub.is_trusted(b, a));

    let err = fx.hub.settle_flow(a, &matrix).unwrap_err();
    assert_eq!(err.code(), "unpermitted_flow");
}

#[test]
fn past_expiry_is_clamped_to_now() {
    let fx = Fixture::new();
    let (a, b) = (fx.human(10, 0), fx.human(20, 0));

    fx.hub.trust(a, b, 1).unwrap();

    assert!(fx.hub.is_trusted(a, b));
    fx.clock.advance(1);
    assert!(!fx.hub.is_trusted(a, b));
}

#[test]
fn reserved_trustee_is_rejected() {
    let fx = Fixture::new();
    let a = fx.human(10, 0);

    let err = fx.hub.trust(a, AvatarId::NULL, INDEFINITE).unwrap_err();

    assert_eq!(err.code(), "reserved_avatar");
}

#[test]
fn unregistered_truster_is_rejected() {
    let fx = Fixture::new();

    let err = fx.hub.trust(avatar(10), avatar(20), INDEFINITE).unwrap_err();

    assert_eq!(err.code(), "not_registered");
}
