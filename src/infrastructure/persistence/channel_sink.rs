//! Channel-backed artifact sink
//!
//! Forwards artifacts to another pipeline stage over a crossbeam channel.
//! A bounded channel applies backpressure to the session.

use crate::domain::entities::CarvedArtifact;
use crate::domain::repositories::{ArtifactSink, SinkError};
use crossbeam_channel::{Receiver, Sender};

pub struct ChannelSink {
    tx: Sender<CarvedArtifact>,
}

impl ChannelSink {
    pub fn new(tx: Sender<CarvedArtifact>) -> Self {
        Self { tx }
    }

    /// Creates a sink and the receiving end of a bounded channel
    pub fn bounded(capacity: usize) -> (Self, Receiver<CarvedArtifact>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self::new(tx), rx)
    }
}

impl ArtifactSink for ChannelSink {
    fn deliver(&mut self, artifact: CarvedArtifact) -> Result<(), SinkError> {
        self.tx.send(artifact).map_err(|_| SinkError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn disconnected_receiver_is_an_error() {
        let (mut sink, rx) = ChannelSink::bounded(1);
        let artifact = CarvedArtifact::new(0, "jpg", "jpg", 0, Bytes::from_static(b"x"));
        sink.deliver(artifact.clone()).unwrap();
        assert_eq!(rx.recv().unwrap(), artifact);
        drop(rx);
        assert!(matches!(sink.deliver(artifact), Err(SinkError::Disconnected)));
    }
}
