//! Adapter bootstrap and dependency wiring.
//!
//! [`LgTv::init`] is the composition root: it locates the TV once, then wires
//! the connection manager, sequencer and dispatcher around the capabilities
//! it was given. Hosts pass [`Capabilities::system`] for the real network
//! implementations; tests pass fakes.

use std::sync::Arc;

use serde_json::Value;

use crate::device::{
    ArpLookup, ChannelConnector, SsapConnector, SsdpConfig, SsdpSearcher, SystemArpTable,
    UdpSsdpSearcher, UdpWakeSender, WakeSender,
};
use crate::error::{LgtvError, LgtvResult};
use crate::events::{EventEmitter, LoggingEventEmitter};
use crate::services::{
    AddressResolver, CommandDispatcher, CommandOutcome, ConnectionManager, ConnectionState,
    DeviceDiscovery, RequestSequencer,
};
use crate::state::{AdapterConfig, DeviceDescriptor};
use crate::store::ConfigStore;

/// The external capabilities the adapter orchestrates.
#[derive(Clone)]
pub struct Capabilities {
    pub arp: Arc<dyn ArpLookup>,
    pub wake: Arc<dyn WakeSender>,
    pub searcher: Arc<dyn SsdpSearcher>,
    pub connector: Arc<dyn ChannelConnector>,
    pub store: Arc<dyn ConfigStore>,
    pub emitter: Arc<dyn EventEmitter>,
}

impl Capabilities {
    /// Real network implementations persisting into `store`.
    ///
    /// The SSAP connector shares the store so the pairing key survives
    /// restarts. Events go to the log.
    pub fn system(config: &AdapterConfig, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            arp: Arc::new(SystemArpTable::new()),
            wake: Arc::new(UdpWakeSender::new()),
            searcher: Arc::new(UdpSsdpSearcher::new(SsdpConfig::from(config))),
            connector: Arc::new(SsapConnector::new(Some(Arc::clone(&store)))),
            store,
            emitter: Arc::new(LoggingEventEmitter),
        }
    }
}

/// A located LG webOS TV, ready to take commands.
pub struct LgTv {
    descriptor: DeviceDescriptor,
    connection: Arc<ConnectionManager>,
    dispatcher: CommandDispatcher,
}

impl LgTv {
    /// Locates the TV and wires the adapter.
    ///
    /// Discovery is skipped when `config` already carries both addresses.
    /// Fails if the configuration is invalid or discovery finds nothing.
    /// The control channel is not opened until the first command needs it.
    pub async fn init(config: AdapterConfig, caps: Capabilities) -> LgtvResult<Self> {
        config.validate().map_err(LgtvError::Configuration)?;

        let Capabilities {
            arp,
            wake,
            searcher,
            connector,
            store,
            emitter,
        } = caps;

        let resolver = AddressResolver::new(arp, store, Arc::clone(&emitter));
        let discovery = DeviceDiscovery::new(searcher, resolver, Arc::clone(&emitter), &config);

        let mut descriptor = config.descriptor();
        discovery.locate(&mut descriptor).await?;

        log::info!(
            "[LgTv] Ready (ip={}, mac={})",
            descriptor.ip.as_deref().unwrap_or("?"),
            descriptor.mac.as_deref().unwrap_or("unknown")
        );

        let connection = Arc::new(ConnectionManager::new(
            connector,
            descriptor.control_url(config.control_port),
            config.connect_timeout(),
            Arc::clone(&emitter),
        ));
        let sequencer = Arc::new(RequestSequencer::new(
            Arc::clone(&connection),
            config.repeat_delay(),
            Arc::clone(&emitter),
        ));
        let dispatcher = CommandDispatcher::new(sequencer, wake, descriptor.mac.clone(), emitter);

        Ok(Self {
            descriptor,
            connection,
            dispatcher,
        })
    }

    /// Parses and runs one command line. See [`CommandDispatcher::execute`].
    pub async fn execute(&self, line: &str) -> LgtvResult<CommandOutcome> {
        self.dispatcher.execute(line).await
    }

    /// Waits for background work (wake packets, detached requests) to finish.
    pub async fn settle(&self) {
        self.dispatcher.settle().await;
    }

    /// The addresses the adapter is using.
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn power_on(&self) {
        self.dispatcher.power_on();
    }

    pub fn power_off(&self) -> CommandOutcome {
        self.dispatcher.power_off()
    }

    pub fn toast(&self, message: &str) -> CommandOutcome {
        self.dispatcher.toast(message)
    }

    pub fn set_input(&self, input_id: &str) -> CommandOutcome {
        self.dispatcher.set_input(input_id)
    }

    pub async fn launch(&self, app_id: &str) -> CommandOutcome {
        self.dispatcher.launch(app_id).await
    }

    pub async fn open(&self, url: &str) -> CommandOutcome {
        self.dispatcher.open(url).await
    }

    pub async fn volume_up(&self, count: usize) -> CommandOutcome {
        self.dispatcher.volume_up(count).await
    }

    pub async fn volume_down(&self, count: usize) -> CommandOutcome {
        self.dispatcher.volume_down(count).await
    }

    /// Sends an arbitrary request. With `wait` the reply payload is returned
    /// as [`CommandOutcome::Reply`]; without it the request runs in the
    /// background.
    pub async fn request(
        &self,
        service: &str,
        payload: Option<Value>,
        wait: bool,
    ) -> CommandOutcome {
        if wait {
            self.dispatcher.request_wait(service, payload).await
        } else {
            self.dispatcher.request(service, payload)
        }
    }
}
