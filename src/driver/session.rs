use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;
use url::Url;

use crate::config::DriverConfig;

use super::channel::{ChannelError, OutboundChannel};
use super::events::{DispatchOutcome, EventBridge, NativeEvent};
use super::factory::NodeFactory;
use super::node::ForegroundTree;
use super::protocol::{InboundMessage, OutboundMessage};
use super::registry::IdentityRegistry;
use super::replay::{BatchSummary, MutationReplayEngine, ReplayError};
use super::style::StyleProjector;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to decode background message: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Capabilities probed from the host environment at startup.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    pub passive_listeners: bool,
}

/// One foreground driver session: owns the replay engine and event bridge
/// and talks to the background context through `C`.
///
/// Every entry point runs as one non-preemptible turn; callers must not
/// interleave them.
pub struct DriverSession<C: OutboundChannel> {
    engine: MutationReplayEngine,
    bridge: EventBridge,
    channel: C,
    capabilities: HostCapabilities,
}

impl<C: OutboundChannel> DriverSession<C> {
    pub fn new(config: &DriverConfig, channel: C, capabilities: HostCapabilities) -> Self {
        Self::with_engine(config, MutationReplayEngine::new(config), channel, capabilities)
    }

    pub fn with_projector(
        config: &DriverConfig,
        projector: Box<dyn StyleProjector>,
        channel: C,
        capabilities: HostCapabilities,
    ) -> Self {
        let factory = NodeFactory::with_projector(config, projector);
        let engine = MutationReplayEngine::with_factory(config, factory);
        Self::with_engine(config, engine, channel, capabilities)
    }

    fn with_engine(
        config: &DriverConfig,
        engine: MutationReplayEngine,
        channel: C,
        capabilities: HostCapabilities,
    ) -> Self {
        Self {
            engine,
            bridge: EventBridge::new(config.tap_threshold),
            channel,
            capabilities,
        }
    }

    /// Announces the page to the background context.
    pub fn start(&self, url: Url, viewport_width: u32) -> Result<(), SessionError> {
        debug!(
            target: "driver",
            %url,
            viewport_width,
            passive_listeners = self.capabilities.passive_listeners,
            "starting driver session"
        );
        self.channel.post(OutboundMessage::Init {
            url,
            viewport_width,
        })?;
        Ok(())
    }

    /// Registers the host framework's render callback.
    pub fn on_render(&mut self, callback: impl FnMut(&ForegroundTree) + 'static) {
        debug!(target: "driver", "render callback registered");
        self.engine.notifier_mut().register(callback);
    }

    pub fn tree(&self) -> &ForegroundTree {
        self.engine.tree()
    }

    pub fn registry(&self) -> &IdentityRegistry {
        self.engine.registry()
    }

    /// Applies one background message. Returns the batch summary for
    /// mutation batches and `None` for message types this core ignores.
    pub fn handle_message(
        &mut self,
        message: InboundMessage,
    ) -> Result<Option<BatchSummary>, SessionError> {
        match message {
            InboundMessage::MutationRecord { mutations } => {
                Ok(Some(self.engine.apply_batch(mutations)?))
            }
            InboundMessage::Other => Ok(None),
        }
    }

    pub fn handle_json(&mut self, raw: &str) -> Result<Option<BatchSummary>, SessionError> {
        let message: InboundMessage = serde_json::from_str(raw)?;
        self.handle_message(message)
    }

    /// Entry point for native events fired on nodes carrying listener props.
    pub fn dispatch_native_event(&mut self, event: &NativeEvent) -> DispatchOutcome {
        let root_token = self.engine.tree().root_token();
        self.bridge.dispatch(event, root_token, &self.channel)
    }

    /// Applies inbound messages in delivery order until the background
    /// context hangs up or a batch violates the protocol.
    pub async fn run(
        &mut self,
        inbound: &mut UnboundedReceiver<InboundMessage>,
    ) -> Result<(), SessionError> {
        while let Some(message) = inbound.recv().await {
            self.handle_message(message)?;
        }
        debug!(target: "driver", "background context hung up");
        Ok(())
    }

    /// Drops the whole foreground tree. Only for full session teardown.
    pub fn teardown(&mut self) {
        self.engine.teardown();
        self.engine.notifier_mut().clear();
    }
}
