use std::sync::mpsc::{sync_channel, Receiver, SendError, SyncSender, TryRecvError};

/// The live-mode risk engine's own bounded command queue, per §4.7: "the engine runs on its own
/// queue with a configurable maximum (`qsize`); enqueuing past capacity blocks the producer and
/// drops nothing". `std::sync::mpsc::sync_channel` already provides exactly this
/// blocks-rather-than-drops backpressure, so the queue is a thin named wrapper rather than a
/// hand-rolled ring buffer.
#[derive(Debug)]
pub struct LiveRiskQueue<T> {
    tx: SyncSender<T>,
    rx: Receiver<T>,
}

impl<T> LiveRiskQueue<T> {
    pub fn new(qsize: usize) -> Self {
        let (tx, rx) = sync_channel(qsize.max(1));
        Self { tx, rx }
    }

    pub fn producer(&self) -> LiveRiskQueueProducer<T> {
        LiveRiskQueueProducer { tx: self.tx.clone() }
    }

    /// Blocks until a command is available.
    pub fn recv(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Drains every command currently queued without blocking, for a tick-driven live loop that
    /// cannot afford to sit on [`Self::recv`].
    pub fn drain(&self) -> Vec<T> {
        let mut drained = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(item) => drained.push(item),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        drained
    }
}

/// The producer handle, cloned out to whatever submits commands to the queue (a strategy
/// thread, a venue event dispatcher). `send` blocks once `qsize` commands are already queued.
#[derive(Debug, Clone)]
pub struct LiveRiskQueueProducer<T> {
    tx: SyncSender<T>,
}

impl<T> LiveRiskQueueProducer<T> {
    pub fn send(&self, item: T) -> Result<(), SendError<T>> {
        self.tx.send(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_send_and_recv_round_trip() {
        let queue = LiveRiskQueue::new(4);
        let producer = queue.producer();

        producer.send(1).unwrap();
        producer.send(2).unwrap();

        assert_eq!(queue.recv(), Some(1));
        assert_eq!(queue.recv(), Some(2));
    }

    #[test]
    fn test_drain_collects_every_queued_command_without_blocking() {
        let queue = LiveRiskQueue::new(4);
        let producer = queue.producer();

        producer.send(1).unwrap();
        producer.send(2).unwrap();
        producer.send(3).unwrap();

        assert_eq!(queue.drain(), vec![1, 2, 3]);
        assert_eq!(queue.drain(), Vec::<i32>::new());
    }

    #[test]
    fn test_full_queue_blocks_producer_until_drained() {
        let queue = LiveRiskQueue::new(1);
        let producer = queue.producer();

        producer.send("first").unwrap();

        let second_producer = producer.clone();
        let handle = thread::spawn(move || {
            second_producer.send("second").unwrap();
        });

        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished(), "producer should block while the queue is full");

        assert_eq!(queue.recv(), Some("first"));
        handle.join().unwrap();
        assert_eq!(queue.recv(), Some("second"));
    }
}
