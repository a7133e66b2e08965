// Pipeline - Single-threaded fold of a message stream through stages
// One inbound ring buffer, an ordered stage list and a list of sinks

pub mod channel;

use crate::config::EngineConfig;
use crate::midi::Message;
use channel::{MessageConsumer, MessageProducer, create_message_channel};
use ringbuf::traits::{Consumer, Observer, Producer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A stateful stream transform
///
/// Receives messages one at a time in arrival order and returns what goes
/// downstream: nothing, the message itself, or several messages.
pub trait Stage: Send {
    fn process(&mut self, message: Message) -> Vec<Message>;
}

/// Receives every message leaving the last stage
pub type Sink = Box<dyn FnMut(&Message) + Send>;

/// Idempotent cancellation shared by a pipeline and its input
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the pipeline; nothing is emitted afterwards
    /// Returns false if it was already cancelled
    pub fn cancel(&self) -> bool {
        let first = !self.cancelled.swap(true, Ordering::AcqRel);
        if first {
            log::debug!("pipeline cancelled");
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Producer side of a pipeline, safe to move to another thread
pub struct PipelineInput {
    tx: MessageProducer,
    cancel: CancelHandle,
}

impl PipelineInput {
    /// Queue one message
    /// Returns false when the buffer is full or the pipeline is cancelled
    pub fn push(&mut self, message: Message) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        // try_push is not blocking
        if self.tx.try_push(message).is_err() {
            log::warn!("pipeline input full, message dropped");
            return false;
        }
        true
    }

    /// Queue a batch in order, returns how many were accepted
    pub fn push_all(&mut self, messages: impl IntoIterator<Item = Message>) -> usize {
        let mut accepted = 0;
        for message in messages {
            if !self.push(message) {
                break;
            }
            accepted += 1;
        }
        accepted
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl std::fmt::Debug for PipelineInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineInput")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Consumer side: drains the inbound buffer through the stages into the sinks
pub struct Pipeline {
    rx: MessageConsumer,
    stages: Vec<Box<dyn Stage>>,
    sinks: Vec<Sink>,
    cancel: CancelHandle,
}

/// Create a pipeline whose inbound buffer holds `capacity` messages
pub fn pipeline(capacity: usize) -> (PipelineInput, Pipeline) {
    let (tx, rx) = create_message_channel(capacity);
    let cancel = CancelHandle::new();
    (
        PipelineInput {
            tx,
            cancel: cancel.clone(),
        },
        Pipeline {
            rx,
            stages: Vec::new(),
            sinks: Vec::new(),
            cancel,
        },
    )
}

/// Create a pipeline sized by `EngineConfig::pipeline_capacity`
pub fn pipeline_from_config(config: &EngineConfig) -> (PipelineInput, Pipeline) {
    pipeline(config.pipeline_capacity)
}

impl Pipeline {
    /// Append a stage after the existing ones
    pub fn add_stage<S: Stage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Register a sink for the pipeline output
    pub fn subscribe<F>(&mut self, sink: F) -> &mut Self
    where
        F: FnMut(&Message) + Send + 'static,
    {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) -> bool {
        self.cancel.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Messages waiting in the inbound buffer
    pub fn pending(&self) -> usize {
        self.rx.occupied_len()
    }

    /// Process everything queued so far, in arrival order
    /// Returns the number of inbound messages consumed
    pub fn pump(&mut self) -> usize {
        let mut consumed = 0;
        while !self.cancel.is_cancelled() {
            let Some(message) = self.rx.try_pop() else {
                break;
            };
            self.process_now(message);
            consumed += 1;
        }
        consumed
    }

    /// Run one message through the stages, deliver and return the output
    /// Bypasses the inbound buffer
    pub fn process_now(&mut self, message: Message) -> Vec<Message> {
        if self.cancel.is_cancelled() {
            return Vec::new();
        }

        let output = self.stages.iter_mut().fold(vec![message], |batch, stage| {
            batch
                .into_iter()
                .flat_map(|m| stage.process(m))
                .collect()
        });

        for message in &output {
            for sink in &mut self.sinks {
                sink(message);
            }
        }
        output
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .field("sinks", &self.sinks.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Emits each note-on twice, drops everything else
    struct Doubler;

    impl Stage for Doubler {
        fn process(&mut self, message: Message) -> Vec<Message> {
            if message.is_note_on() {
                vec![message.clone(), message]
            } else {
                Vec::new()
            }
        }
    }

    /// Shifts note numbers up by one
    struct Transpose;

    impl Stage for Transpose {
        fn process(&mut self, message: Message) -> Vec<Message> {
            match (message.note(), message.velocity(), message.channel()) {
                (Ok(note), Ok(velocity), Ok(channel)) => {
                    vec![Message::note_on(note + 1, velocity, channel)]
                }
                _ => vec![message],
            }
        }
    }

    fn collector(pipeline: &mut Pipeline) -> Arc<Mutex<Vec<Message>>> {
        let out = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&out);
        pipeline.subscribe(move |m| sink.lock().unwrap().push(m.clone()));
        out
    }

    #[test]
    fn test_no_stages_passes_through() {
        let (mut input, mut pipeline) = pipeline(8);
        let out = collector(&mut pipeline);

        assert!(input.push(Message::note_on(60, 100, 0)));
        assert!(input.push(Message::stop()));
        assert_eq!(pipeline.pending(), 2);
        assert_eq!(pipeline.pump(), 2);
        assert_eq!(pipeline.pending(), 0);

        let out = out.lock().unwrap();
        assert_eq!(out.len(), 2);
        assert!(out[1].is_stop());
    }

    #[test]
    fn test_stages_run_in_order() {
        let (mut input, mut pipeline) = pipeline(8);
        pipeline.add_stage(Doubler).add_stage(Transpose);
        let out = collector(&mut pipeline);

        input.push(Message::note_on(60, 100, 0));
        input.push(Message::clock(0.0));
        input.push(Message::note_on(64, 100, 0));
        pipeline.pump();

        let notes: Vec<u8> = out.lock().unwrap().iter().map(|m| m.note().unwrap()).collect();
        assert_eq!(notes, vec![61, 61, 65, 65]);
    }

    #[test]
    fn test_full_buffer_drops() {
        let (mut input, mut pipeline) = pipeline(2);
        let accepted = input.push_all((0..5).map(|i| Message::note_on(60 + i, 100, 0)));
        assert_eq!(accepted, 2);
        assert_eq!(pipeline.pump(), 2);
        assert!(input.push(Message::start()));
    }

    #[test]
    fn test_configured_capacity() {
        let config = EngineConfig {
            pipeline_capacity: 3,
            ..EngineConfig::default()
        };
        let (mut input, mut pipeline) = pipeline_from_config(&config);
        let accepted = input.push_all((0..10).map(|i| Message::clock(i as f64)));
        assert_eq!(accepted, 3);
        assert_eq!(pipeline.pending(), 3);
    }

    #[test]
    fn test_no_emission_after_cancel() {
        let (mut input, mut pipeline) = pipeline(8);
        let out = collector(&mut pipeline);
        let handle = pipeline.cancel_handle();

        input.push(Message::note_on(60, 100, 0));
        assert!(handle.cancel());
        assert!(!handle.cancel());

        assert_eq!(pipeline.pump(), 0);
        assert!(pipeline.process_now(Message::start()).is_empty());
        assert!(!input.push(Message::stop()));
        assert!(input.is_closed());
        assert!(out.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cancel_from_sink_stops_the_drain() {
        let (mut input, mut pipeline) = pipeline(8);
        let handle = pipeline.cancel_handle();
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        pipeline.subscribe(move |_| {
            *counter.lock().unwrap() += 1;
            handle.cancel();
        });

        input.push_all(vec![Message::start(), Message::stop(), Message::start()]);
        assert_eq!(pipeline.pump(), 1);
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn test_input_moves_to_another_thread() {
        let (mut input, mut pipeline) = pipeline(64);
        let out = collector(&mut pipeline);

        std::thread::spawn(move || {
            for i in 0..10 {
                input.push(Message::clock(i as f64));
            }
        })
        .join()
        .unwrap();

        pipeline.pump();
        let times: Vec<f64> = out.lock().unwrap().iter().filter_map(|m| m.timestamp).collect();
        assert_eq!(times, (0..10).map(|i| i as f64).collect::<Vec<_>>());
    }
}
