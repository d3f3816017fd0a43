//! # Resolution Scenarios
//!
//! Filters registered through the registry, resolved against the published
//! snapshot. No dispatcher involved.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hce_01_filter_index::MatchKind;
    use hce_02_service_registry::{
        CollectingCallback, MemorySettingsFile, ServiceRegistry, ServiceRegistryApi,
        StaticServicePlatform, StaticUserProfiles,
    };
    use hce_03_conflict_resolver::{ConflictResolver, Resolution};
    use shared_types::{ComponentName, PollingFrame, PollingFrameType, UserHandle};

    use crate::fixtures::*;

    const SHARED_FRAME: &str = "7D0F";

    fn registry() -> ServiceRegistry {
        let platform = Arc::new(StaticServicePlatform::new());
        for service in default_services() {
            platform.install(service);
        }
        let registry = ServiceRegistry::new(
            platform,
            Arc::new(StaticUserProfiles::new(UserHandle::of(USER))),
            Arc::new(MemorySettingsFile::new("dynamic")),
            Arc::new(MemorySettingsFile::new("other")),
            Arc::new(CollectingCallback::new()),
        );
        registry.initialize().unwrap();
        registry
    }

    /// bank and transit register the frame exactly; loyalty by pattern.
    fn two_exact_one_pattern() -> ConflictResolver {
        let registry = registry();
        registry
            .register_polling_loop_filter(USER, &bank(), SHARED_FRAME, false)
            .unwrap();
        registry
            .register_polling_loop_filter(USER, &transit(), SHARED_FRAME, false)
            .unwrap();
        registry
            .register_polling_loop_pattern_filter(USER, &loyalty(), "7D.*", true)
            .unwrap();
        ConflictResolver::new(registry.snapshot(USER).unwrap())
    }

    fn frame(hex_payload: &str) -> PollingFrame {
        PollingFrame::new(PollingFrameType::Unknown, hex::decode(hex_payload).unwrap())
    }

    #[test]
    fn test_two_exact_one_pattern_is_ambiguous_and_tagged() {
        let resolver = two_exact_one_pattern();
        match resolver.resolve_polling_frame(&frame(SHARED_FRAME), None) {
            Resolution::Ambiguous(candidates) => {
                let components: Vec<&ComponentName> =
                    candidates.iter().map(|c| &c.service.component).collect();
                assert_eq!(components, vec![&bank(), &transit()]);
                assert!(candidates.iter().all(|c| c.kind == MatchKind::Exact));
            }
            other => panic!("expected ambiguity, got {:?}", other.components()),
        }
    }

    #[test]
    fn test_preferred_breaks_exact_tie() {
        let resolver = two_exact_one_pattern();
        let outcome = resolver.resolve_polling_frame(&frame(SHARED_FRAME), Some(&transit()));
        assert_eq!(outcome.components(), vec![transit()]);
    }

    #[test]
    fn test_preferred_pattern_does_not_beat_exact() {
        let resolver = two_exact_one_pattern();
        let outcome = resolver.resolve_polling_frame(&frame(SHARED_FRAME), Some(&loyalty()));
        assert!(outcome.is_ambiguous());
    }

    #[test]
    fn test_pattern_only_frame_resolves_to_pattern_owner() {
        let resolver = two_exact_one_pattern();
        let outcome = resolver.resolve_polling_frame(&frame("7D10"), None);
        let winner = outcome.winner().unwrap();
        assert_eq!(winner.service.component, loyalty());
        assert_eq!(winner.kind, MatchKind::Pattern);
        assert!(winner.auto_transact);
    }

    #[test]
    fn test_exact_beats_pattern() {
        // The wallet's exact auto-transact filter, also covered by a pattern.
        let registry = registry();
        registry
            .register_polling_loop_pattern_filter(USER, &loyalty(), "6A02.*", false)
            .unwrap();
        let resolver = ConflictResolver::new(registry.snapshot(USER).unwrap());
        let outcome = resolver.resolve_polling_frame(&frame("6A02C801"), None);
        assert_eq!(outcome.components(), vec![wallet()]);
        assert_eq!(outcome.winner().unwrap().kind, MatchKind::Exact);
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let resolver = two_exact_one_pattern();
        for preferred in [None, Some(bank()), Some(loyalty())] {
            let first = resolver
                .resolve_polling_frame(&frame(SHARED_FRAME), preferred.as_ref())
                .components();
            let second = resolver
                .resolve_polling_frame(&frame(SHARED_FRAME), preferred.as_ref())
                .components();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_aid_group_round_trip() {
        let registry = registry();
        let group = shared_types::AidGroup::new("other", ["f0aabbccdd", "F0AABBCCEE*"]);
        registry
            .register_aid_group(USER, &transit(), group.clone())
            .unwrap();
        let service = registry.service(USER, &transit()).unwrap();
        assert_eq!(service.dynamic_aid_groups, vec![group]);

        let resolver = ConflictResolver::new(registry.snapshot(USER).unwrap());
        assert_eq!(
            resolver.resolve_aid("F0AABBCCEE0102", None).components(),
            vec![transit()]
        );

        registry
            .remove_aid_group(USER, &transit(), "other")
            .unwrap();
        let resolver = ConflictResolver::new(registry.snapshot(USER).unwrap());
        assert!(matches!(
            resolver.resolve_aid("F0AABBCCDD", None),
            Resolution::NoMatch
        ));
        // The static group is back in effect.
        assert!(resolver.resolve_aid(TRANSIT_AID, None).is_ambiguous());
    }
}
