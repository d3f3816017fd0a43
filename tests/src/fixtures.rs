//! # Shared Fixtures
//!
//! A `Rig` holds one fake per platform port. Scenarios install services,
//! start a `CardEmulationContext` on it and assert on what the fakes saw.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hce_02_service_registry::{
    AtomicSettingsFile, MemorySettingsFile, SettingsFile, StaticServicePlatform,
    StaticUserProfiles, DYNAMIC_SETTINGS_FILE, OTHER_STATUS_FILE,
};
use hce_04_emulation_dispatcher::adapters::{
    RecordingBinder, RecordingChannel, RecordingObserveMode, RecordingResponder,
};
use hce_04_emulation_dispatcher::domain::build_select;
use hce_runtime::{CardEmulationContext, ContextDependencies, RuntimeConfig};
use shared_types::{
    categories, AidGroup, ComponentName, PollingLoopFilter, ServiceDescriptor, ServiceKind,
    UserHandle, UserId,
};

pub const USER: UserId = 0;
pub const WORK_PROFILE: UserId = 10;

pub const PAYMENT_AID: &str = "A0000000041010";
pub const BANK_AID: &str = "A0000000031010";
pub const TRANSIT_AID: &str = "F0010203040506";

/// Frame payload the wallet registers as auto-transact.
pub const WALLET_FRAME: [u8; 4] = [0x6A, 0x02, 0xC8, 0x01];

pub fn wallet() -> ComponentName {
    ComponentName::new("com.example.wallet", "com.example.wallet.PayService")
}

pub fn bank() -> ComponentName {
    ComponentName::new("com.example.bank", "com.example.bank.CardService")
}

pub fn transit() -> ComponentName {
    ComponentName::new("com.example.transit", "com.example.transit.TransitService")
}

pub fn loyalty() -> ComponentName {
    ComponentName::new("com.example.loyalty", "com.example.loyalty.LoyaltyService")
}

/// The default install: two payment apps and two apps sharing an
/// "other" AID.
pub fn default_services() -> Vec<ServiceDescriptor> {
    vec![
        ServiceDescriptor::new(wallet(), ServiceKind::OnHost, USER, 10_001)
            .with_aid_group(AidGroup::new(categories::PAYMENT, [PAYMENT_AID]))
            .with_polling_loop_filter(PollingLoopFilter::new(
                hex::encode_upper(WALLET_FRAME),
                true,
            ))
            .with_default_observe_mode(true),
        ServiceDescriptor::new(bank(), ServiceKind::OnHost, USER, 10_002)
            .with_aid_group(AidGroup::new(categories::PAYMENT, [BANK_AID])),
        ServiceDescriptor::new(transit(), ServiceKind::OnHost, USER, 10_003)
            .with_aid_group(AidGroup::new(categories::OTHER, [TRANSIT_AID])),
        ServiceDescriptor::new(loyalty(), ServiceKind::OnHost, USER, 10_004)
            .with_aid_group(AidGroup::new(categories::OTHER, [TRANSIT_AID])),
    ]
}

pub fn select(aid: &str) -> Vec<u8> {
    build_select(aid).expect("fixture AIDs are valid SELECT AIDs")
}

pub struct Rig {
    pub platform: Arc<StaticServicePlatform>,
    pub profiles: Arc<StaticUserProfiles>,
    pub dynamic_store: Arc<dyn SettingsFile>,
    pub other_store: Arc<dyn SettingsFile>,
    pub binder: Arc<RecordingBinder>,
    pub observe: Arc<RecordingObserveMode>,
    pub responder: Arc<RecordingResponder>,
    pub config: RuntimeConfig,
}

impl Rig {
    /// Default services, in-memory stores.
    pub fn in_memory() -> Self {
        Self::with_stores(
            Arc::new(MemorySettingsFile::new(DYNAMIC_SETTINGS_FILE)),
            Arc::new(MemorySettingsFile::new(OTHER_STATUS_FILE)),
        )
    }

    /// Default services, file stores under `dir`.
    pub fn on_disk(dir: &Path) -> Self {
        let mut rig = Self::with_stores(
            Arc::new(AtomicSettingsFile::new(dir, DYNAMIC_SETTINGS_FILE)),
            Arc::new(AtomicSettingsFile::new(dir, OTHER_STATUS_FILE)),
        );
        rig.config.data_dir = dir.to_path_buf();
        rig
    }

    pub fn with_stores(dynamic_store: Arc<dyn SettingsFile>, other_store: Arc<dyn SettingsFile>) -> Self {
        let platform = Arc::new(StaticServicePlatform::new());
        for service in default_services() {
            platform.install(service);
        }
        Self {
            platform,
            profiles: Arc::new(StaticUserProfiles::new(UserHandle::of(USER))),
            dynamic_store,
            other_store,
            binder: Arc::new(RecordingBinder::new()),
            observe: Arc::new(RecordingObserveMode::new()),
            responder: Arc::new(RecordingResponder::new()),
            config: RuntimeConfig::default(),
        }
    }

    #[must_use]
    pub fn with_profiles(mut self, profiles: StaticUserProfiles) -> Self {
        self.profiles = Arc::new(profiles);
        self
    }

    /// Must run inside a tokio runtime.
    pub fn start(&self) -> CardEmulationContext {
        CardEmulationContext::start(
            ContextDependencies {
                platform: self.platform.clone(),
                profiles: self.profiles.clone(),
                dynamic_store: self.dynamic_store.clone(),
                other_store: self.other_store.clone(),
                binder: self.binder.clone(),
                observe_mode: self.observe.clone(),
                responder: self.responder.clone(),
            },
            &self.config,
        )
        .expect("registry initializes")
    }
}

/// Connects `component` and returns its channel.
pub async fn connect(context: &CardEmulationContext, component: ComponentName) -> Arc<RecordingChannel> {
    let channel = Arc::new(RecordingChannel::new(component.clone()));
    context
        .dispatcher()
        .on_service_connected(component, USER, channel.clone())
        .await
        .expect("dispatcher running");
    channel
}

/// Polls `condition` until it holds; the dispatcher applies events on its
/// own task.
pub async fn eventually<F>(what: &str, condition: F)
where
    F: Fn() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}
