//! # Routing Flows
//!
//! Registry → dispatcher through a started `CardEmulationContext`:
//!
//! 1. **Preferred switch**: the old service is unbound before the new bind
//! 2. **Card session**: SELECT, queued follow-ups, response, deactivation
//! 3. **Auto-transact**: observe mode off on the matching frame, back on at
//!    the end of the session
//! 4. **Quiet profiles**: no catalog while quiet
//! 5. **Package removal**: a preferred service that disappears is dropped

#[cfg(test)]
mod tests {
    use hce_02_service_registry::{ServiceRegistryApi, StaticUserProfiles};
    use hce_04_emulation_dispatcher::adapters::BinderCall;
    use hce_04_emulation_dispatcher::{BindRequest, ServiceMessage};
    use shared_bus::{CardEmulationEvent, EventFilter, EventTopic};
    use shared_types::{EmulationPhase, PollingFrame, PollingFrameType, UserHandle};

    use crate::fixtures::*;

    fn bind(component: shared_types::ComponentName) -> BinderCall {
        BinderCall::Bind(BindRequest {
            component,
            user_id: USER,
            allow_background_start: true,
        })
    }

    #[tokio::test]
    async fn test_preferred_switch_unbinds_before_binding() {
        let rig = Rig::in_memory();
        let context = rig.start();

        context.set_preferred_service(USER, Some(wallet())).await.unwrap();
        context.set_preferred_service(USER, Some(bank())).await.unwrap();
        let dispatcher = context.shutdown().await.unwrap();

        assert_eq!(
            rig.binder.calls(),
            vec![
                bind(wallet()),
                BinderCall::Unbind(wallet(), USER),
                bind(bank()),
            ]
        );
        assert_eq!(dispatcher.state().bound_component(), Some(&bank()));
    }

    #[tokio::test]
    async fn test_card_session_round_trip() {
        let rig = Rig::in_memory();
        let context = rig.start();
        let mut session = context.subscribe(EventFilter::topics(vec![EventTopic::Session]));

        let handle = context.dispatcher().clone();
        handle.on_host_emulation_activated().await.unwrap();
        handle.on_host_emulation_data(select(BANK_AID)).await.unwrap();
        let read_record = vec![0x00, 0xB2, 0x01, 0x0C, 0x00];
        handle.on_host_emulation_data(read_record.clone()).await.unwrap();

        // The bank was not preferred; it is bound on demand.
        eventually("bank bind", || rig.binder.binds() == vec![bank()]).await;
        let channel = connect(&context, bank()).await;
        eventually("queued APDUs flushed", || channel.apdus().len() == 2).await;
        assert_eq!(channel.apdus(), vec![select(BANK_AID), read_record]);

        handle.on_service_response(bank(), vec![0x90, 0x00]).await.unwrap();
        handle.on_host_emulation_deactivated().await.unwrap();
        drop(handle);
        let dispatcher = context.shutdown().await.unwrap();

        assert_eq!(rig.responder.responses(), vec![vec![0x90, 0x00]]);
        assert_eq!(channel.messages().last(), Some(&ServiceMessage::Deactivated));
        assert_eq!(dispatcher.phase(), EmulationPhase::Idle);
        // No preferred service, so nothing stays bound.
        assert_eq!(rig.binder.unbinds(), vec![bank()]);

        let mut phases = Vec::new();
        while let Ok(Some(event)) = session.try_recv() {
            if let CardEmulationEvent::PhaseChanged { to, .. } = event {
                phases.push(to);
            }
        }
        assert_eq!(
            phases,
            vec![
                EmulationPhase::WaitForSelect,
                EmulationPhase::BoundActive,
                EmulationPhase::WaitForDeactivation,
                EmulationPhase::Idle,
            ]
        );
    }

    #[tokio::test]
    async fn test_auto_transact_toggles_observe_mode() {
        let rig = Rig::in_memory();
        let context = rig.start();
        let mut observe = context.subscribe(EventFilter::topics(vec![EventTopic::ObserveMode]));

        context.set_preferred_service(USER, Some(wallet())).await.unwrap();
        let channel = connect(&context, wallet()).await;

        let handle = context.dispatcher().clone();
        handle
            .on_polling_frames_detected(vec![
                PollingFrame::new(PollingFrameType::FieldOn, Vec::new()),
                PollingFrame::new(PollingFrameType::Unknown, WALLET_FRAME.to_vec()),
            ])
            .await
            .unwrap();
        handle.on_host_emulation_activated().await.unwrap();
        handle.on_host_emulation_data(select(PAYMENT_AID)).await.unwrap();
        handle.on_host_emulation_deactivated().await.unwrap();
        drop(handle);
        context.shutdown().await.unwrap();

        // Preferred default on, auto-transact off, restored at deactivation.
        assert_eq!(rig.observe.requests(), vec![true, false, true]);
        let Some(ServiceMessage::PollingFrames(frames)) = channel.messages().first().cloned() else {
            panic!("expected the frame batch first");
        };
        assert!(!frames[0].triggered_autotransact);
        assert!(frames[1].triggered_autotransact);

        let mut triggered = Vec::new();
        while let Ok(Some(event)) = observe.try_recv() {
            if let CardEmulationEvent::AutoTransactTriggered { component, frame_hex } = event {
                triggered.push((component, frame_hex));
            }
        }
        assert_eq!(triggered, vec![(wallet(), "6A02C801".to_string())]);
    }

    #[tokio::test]
    async fn test_quiet_profile_has_no_catalog() {
        let profiles = StaticUserProfiles::new(UserHandle::of(USER))
            .with_profile(UserHandle::of(WORK_PROFILE));
        profiles.set_quiet(UserHandle::of(WORK_PROFILE), true);
        let rig = Rig::in_memory().with_profiles(profiles);
        rig.platform.install(
            shared_types::ServiceDescriptor::new(
                shared_types::ComponentName::new("com.example.badge", "com.example.badge.Badge"),
                shared_types::ServiceKind::OnHost,
                WORK_PROFILE,
                1_010_001,
            )
            .with_aid_group(shared_types::AidGroup::new("other", ["F0000000000A01"])),
        );
        let context = rig.start();

        assert_eq!(context.registry().users(), vec![USER]);
        assert!(context.registry().is_quiet(WORK_PROFILE));
        context.registry().update_for_user(WORK_PROFILE).unwrap();
        assert!(context.registry().snapshot(WORK_PROFILE).is_none());

        rig.profiles.set_quiet(UserHandle::of(WORK_PROFILE), false);
        context
            .set_quiet_mode(UserHandle::of(WORK_PROFILE), false)
            .unwrap();
        assert_eq!(context.registry().users(), vec![USER, WORK_PROFILE]);
        assert_eq!(context.registry().services(WORK_PROFILE).len(), 1);
    }

    #[tokio::test]
    async fn test_removed_preferred_service_is_dropped() {
        let rig = Rig::in_memory();
        let context = rig.start();
        context.set_preferred_service(USER, Some(wallet())).await.unwrap();
        eventually("wallet bind", || rig.binder.binds() == vec![wallet()]).await;

        rig.platform.uninstall_package(USER, wallet().package());
        context
            .registry()
            .on_package_removed(USER, wallet().package())
            .unwrap();
        let dispatcher = context.shutdown().await.unwrap();

        assert!(dispatcher.state().preferred.is_none());
        assert!(dispatcher.state().bound.is_none());
        assert_eq!(rig.binder.unbinds(), vec![wallet()]);
    }

    #[tokio::test]
    async fn test_unknown_aid_answered_file_not_found() {
        let rig = Rig::in_memory();
        let context = rig.start();
        let handle = context.dispatcher().clone();
        handle.on_host_emulation_activated().await.unwrap();
        handle.on_host_emulation_data(select("A0000009999999")).await.unwrap();
        handle.on_host_emulation_data(select(TRANSIT_AID)).await.unwrap();
        drop(handle);
        context.shutdown().await.unwrap();

        // Unknown, then ambiguous between transit and loyalty.
        assert_eq!(
            rig.responder.responses(),
            vec![vec![0x6A, 0x82], vec![0x6A, 0x82]]
        );
        assert!(rig.binder.calls().is_empty());
    }
}
