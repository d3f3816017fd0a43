//! # Persistence Scenarios
//!
//! Registrations written to the on-disk stores, read back by a fresh
//! context over the same directory.

#[cfg(test)]
mod tests {
    use std::fs;

    use hce_02_service_registry::{ServiceRegistryApi, DYNAMIC_SETTINGS_FILE};
    use hce_03_conflict_resolver::ConflictResolver;
    use shared_types::{categories, AidGroup, ServiceDescriptor, ServiceKind};

    use crate::fixtures::*;

    const LOYALTY_PAYMENT_AID: &str = "A0000000651010";

    #[tokio::test]
    async fn test_aid_group_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let rig = Rig::on_disk(dir.path());

        let context = rig.start();
        context
            .registry()
            .register_aid_group(
                USER,
                &loyalty(),
                AidGroup::new(categories::PAYMENT, [LOYALTY_PAYMENT_AID]),
            )
            .unwrap();
        context
            .registry()
            .register_polling_loop_pattern_filter(USER, &loyalty(), "7B.*", false)
            .unwrap();
        context.shutdown().await.unwrap();

        let context = Rig::on_disk(dir.path()).start();
        let service = context.registry().service(USER, &loyalty()).unwrap();
        assert_eq!(
            service.dynamic_aid_groups,
            vec![AidGroup::new(categories::PAYMENT, [LOYALTY_PAYMENT_AID])]
        );
        assert_eq!(service.polling_loop_pattern_filters.len(), 1);

        let resolver = ConflictResolver::new(context.registry().snapshot(USER).unwrap());
        let outcome = resolver.resolve_aid(LOYALTY_PAYMENT_AID, None);
        assert_eq!(outcome.components(), vec![loyalty()]);
    }

    #[tokio::test]
    async fn test_stale_override_pruned_after_package_removal() {
        let dir = tempfile::tempdir().unwrap();
        let rig = Rig::on_disk(dir.path());
        let context = rig.start();
        context
            .registry()
            .register_aid_group(
                USER,
                &transit(),
                AidGroup::new(categories::OTHER, ["F0010203040599"]),
            )
            .unwrap();

        rig.platform.uninstall_package(USER, transit().package());
        context
            .registry()
            .on_package_removed(USER, transit().package())
            .unwrap();

        let document = fs::read_to_string(dir.path().join(DYNAMIC_SETTINGS_FILE)).unwrap();
        assert!(!document.contains("com.example.transit"));

        // Reinstalled under a new uid, the service comes back without the
        // old registration.
        rig.platform.install(
            ServiceDescriptor::new(transit(), ServiceKind::OnHost, USER, 10_099)
                .with_aid_group(AidGroup::new(categories::OTHER, [TRANSIT_AID])),
        );
        context.registry().update_for_user(USER).unwrap();
        let service = context.registry().service(USER, &transit()).unwrap();
        assert!(service.dynamic_aid_groups.is_empty());
        assert!(!context.registry().snapshot(USER).unwrap().has_unknown_default);
    }

    #[tokio::test]
    async fn test_corrupt_store_starts_empty_and_recovers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DYNAMIC_SETTINGS_FILE), b"{ not json").unwrap();

        let rig = Rig::on_disk(dir.path());
        let context = rig.start();
        assert_eq!(context.registry().services(USER).len(), 4);

        context
            .registry()
            .register_polling_loop_filter(USER, &bank(), "7c01", true)
            .unwrap();
        let document = fs::read_to_string(dir.path().join(DYNAMIC_SETTINGS_FILE)).unwrap();
        assert!(document.contains("7C01"));
    }

    #[tokio::test]
    async fn test_category_other_opt_out_persists() {
        let dir = tempfile::tempdir().unwrap();
        let context = Rig::on_disk(dir.path()).start();
        context
            .registry()
            .set_service_enabled_for_category_other(USER, &loyalty(), false)
            .unwrap();
        context.shutdown().await.unwrap();

        let context = Rig::on_disk(dir.path()).start();
        let service = context.registry().service(USER, &loyalty()).unwrap();
        assert!(!service.category_other_enabled);

        // Only transit still claims the shared AID.
        let resolver = ConflictResolver::new(context.registry().snapshot(USER).unwrap());
        assert_eq!(
            resolver.resolve_aid(TRANSIT_AID, None).components(),
            vec![transit()]
        );
    }
}
