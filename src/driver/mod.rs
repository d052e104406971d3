//! Foreground half of the worker driver: replays the background context's
//! change records onto a live tree and forwards interaction events back.

pub mod channel;
pub mod components;
pub mod events;
pub mod factory;
pub mod markup;
pub mod node;
pub mod notifier;
pub mod protocol;
pub mod registry;
pub mod replay;
pub mod session;
pub mod style;

pub use channel::{channel_pair, ChannelError, HostPort, OutboundChannel, WorkerChannel, WorkerPort};
pub use events::{DispatchOutcome, EventBridge, NativeEvent, NativeTouch, TapState};
pub use node::{Child, ForegroundNode, ForegroundTree, NodeKey, PropValue, Props};
pub use protocol::{
    ChangeRecord, InboundMessage, InteractionEventRecord, NodeToken, OutboundMessage,
    RemoteNodeDescriptor,
};
pub use replay::{BatchSummary, MutationReplayEngine, ReplayError};
pub use session::{DriverSession, HostCapabilities, SessionError};
