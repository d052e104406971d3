use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::protocol::{InboundMessage, OutboundMessage};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("background context channel is closed")]
    Closed,
}

/// Foreground → background half of the message channel. Sends are
/// fire-and-forget: no acknowledgement and no retry.
pub trait OutboundChannel {
    fn post(&self, message: OutboundMessage) -> Result<(), ChannelError>;
}

/// Outbound sender backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct WorkerChannel {
    outbound: UnboundedSender<OutboundMessage>,
}

impl OutboundChannel for WorkerChannel {
    fn post(&self, message: OutboundMessage) -> Result<(), ChannelError> {
        self.outbound
            .send(message)
            .map_err(|_| ChannelError::Closed)
    }
}

/// Endpoints held by the foreground driver.
pub struct HostPort {
    pub channel: WorkerChannel,
    pub inbound: UnboundedReceiver<InboundMessage>,
}

/// Endpoints held by (or on behalf of) the background context.
pub struct WorkerPort {
    pub sender: UnboundedSender<InboundMessage>,
    pub outbound: UnboundedReceiver<OutboundMessage>,
}

pub fn channel_pair() -> (HostPort, WorkerPort) {
    let (outbound_tx, outbound_rx) = unbounded_channel();
    let (inbound_tx, inbound_rx) = unbounded_channel();
    (
        HostPort {
            channel: WorkerChannel {
                outbound: outbound_tx,
            },
            inbound: inbound_rx,
        },
        WorkerPort {
            sender: inbound_tx,
            outbound: outbound_rx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::protocol::InteractionEventRecord;

    #[test]
    fn posts_reach_the_worker_side() {
        let (host, mut worker) = channel_pair();
        host.channel
            .post(OutboundMessage::Event {
                event: InteractionEventRecord::new("click"),
            })
            .unwrap();
        let received = worker.outbound.try_recv().unwrap();
        assert!(matches!(received, OutboundMessage::Event { event } if event.event_type == "click"));
    }

    #[test]
    fn post_fails_once_worker_is_gone() {
        let (host, worker) = channel_pair();
        drop(worker);
        let result = host.channel.post(OutboundMessage::Event {
            event: InteractionEventRecord::new("click"),
        });
        assert!(matches!(result, Err(ChannelError::Closed)));
    }
}
