//! Decode-ahead frame source.
//!
//! [`PrefetchSource`] moves decoding onto a producer thread so that metric
//! extraction and decoding overlap. Frames travel through a bounded
//! `crossbeam-channel` queue in the order the inner source yields them; the
//! queue capacity caps how many decoded frames are held in memory.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, bounded};

use crate::error::{Result, SceneCutError};
use crate::frame::{Frame, FrameSource, SourceProperties};

/// A [`FrameSource`] that decodes on a background thread.
///
/// Dropping it disconnects the queue, which stops the producer at its next
/// send, and joins the producer thread.
pub struct PrefetchSource {
    properties: SourceProperties,
    receiver: Option<Receiver<Result<Frame>>>,
    producer: Option<JoinHandle<()>>,
}

impl PrefetchSource {
    /// Start decoding `source` on a new thread, keeping at most `capacity`
    /// frames queued (at least 1).
    ///
    /// # Errors
    ///
    /// Returns [`SceneCutError::IoError`] if the producer thread cannot be
    /// spawned.
    pub fn new<S>(source: S, capacity: usize) -> Result<Self>
    where
        S: FrameSource + Send + 'static,
    {
        Self::spawn(move || Ok(source), capacity)
    }

    /// Build the inner source on the producer thread with `open`.
    ///
    /// Decoders holding thread-bound handles can be prefetched this way,
    /// since only the factory has to be [`Send`].
    ///
    /// # Errors
    ///
    /// Returns the error of `open`, or [`SceneCutError::IoError`] if the
    /// producer thread cannot be spawned.
    pub fn spawn<F, S>(open: F, capacity: usize) -> Result<Self>
    where
        F: FnOnce() -> Result<S> + Send + 'static,
        S: FrameSource,
    {
        let (sender, receiver) = bounded(capacity.max(1));
        let (properties_sender, properties_receiver) = bounded(1);

        let producer = thread::Builder::new()
            .name("scenecut-prefetch".to_string())
            .spawn(move || {
                let source = match open() {
                    Ok(source) => source,
                    Err(error) => {
                        let _ = properties_sender.send(Err(error));
                        return;
                    }
                };
                if properties_sender.send(Ok(source.properties().clone())).is_err() {
                    return;
                }

                for item in source {
                    let failed = item.is_err();
                    if sender.send(item).is_err() {
                        log::debug!("Prefetch consumer went away, stopping decode");
                        break;
                    }
                    if failed {
                        break;
                    }
                }
            })?;

        let properties = match properties_receiver.recv() {
            Ok(Ok(properties)) => properties,
            Ok(Err(error)) => {
                join_producer(producer);
                return Err(error);
            }
            Err(_) => {
                join_producer(producer);
                return Err(SceneCutError::IoError(std::io::Error::other(
                    "prefetch thread exited before opening its source",
                )));
            }
        };

        Ok(Self {
            properties,
            receiver: Some(receiver),
            producer: Some(producer),
        })
    }

    /// Frames decoded and waiting in the queue.
    pub fn queued(&self) -> usize {
        self.receiver.as_ref().map_or(0, Receiver::len)
    }
}

impl Iterator for PrefetchSource {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.as_ref()?.recv().ok()
    }
}

impl FrameSource for PrefetchSource {
    fn properties(&self) -> &SourceProperties {
        &self.properties
    }
}

impl Drop for PrefetchSource {
    fn drop(&mut self) {
        drop(self.receiver.take());
        if let Some(producer) = self.producer.take() {
            join_producer(producer);
        }
    }
}

fn join_producer(producer: JoinHandle<()>) {
    if producer.join().is_err() {
        log::warn!("Prefetch decoder thread panicked");
    }
}
