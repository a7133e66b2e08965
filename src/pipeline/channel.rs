// Lock-free message channel feeding a pipeline

use crate::midi::Message;
use ringbuf::{HeapRb, traits::Split};

pub type MessageProducer = ringbuf::HeapProd<Message>;
pub type MessageConsumer = ringbuf::HeapCons<Message>;

pub fn create_message_channel(capacity: usize) -> (MessageProducer, MessageConsumer) {
    let rb = HeapRb::<Message>::new(capacity.max(1));
    rb.split()
}
