use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver};
use tracing::debug;

use super::data_batch::DataBatch;
use super::error::DatasetError;
use super::iterator::{DataSetIterator, SplitSource};

type BatchResult = Result<DataBatch, DatasetError>;

struct Producer {
    receiver: Receiver<BatchResult>,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Batch iterator fed by a background decoding thread through a bounded channel.
pub struct PrefetchIterator {
    source: Arc<SplitSource>,
    depth: usize,
    producer: Option<Producer>,
}

impl PrefetchIterator {
    pub(crate) fn new(source: Arc<SplitSource>, depth: usize) -> Self {
        let depth = depth.max(1);
        let producer = Some(spawn_producer(Arc::clone(&source), depth));
        Self {
            source,
            depth,
            producer,
        }
    }

    fn shutdown(&mut self) {
        if let Some(Producer {
            receiver,
            stop,
            handle,
        }) = self.producer.take()
        {
            stop.store(true, Ordering::Relaxed);
            // Unblocks a producer waiting on a full channel.
            drop(receiver);
            let _ = handle.join();
        }
    }
}

fn spawn_producer(source: Arc<SplitSource>, depth: usize) -> Producer {
    let (sender, receiver) = bounded(depth);
    let stop = Arc::new(AtomicBool::new(false));
    let worker_stop = Arc::clone(&stop);

    let handle = thread::spawn(move || {
        let mut batch_number = 0;
        while !worker_stop.load(Ordering::Relaxed) {
            let Some(batch) = source.load_batch(batch_number) else {
                break;
            };
            if sender.send(batch).is_err() {
                break;
            }
            batch_number += 1;
        }
        debug!("Prefetch worker exiting after {} batches", batch_number);
    });

    Producer {
        receiver,
        stop,
        handle,
    }
}

impl Iterator for PrefetchIterator {
    type Item = BatchResult;

    fn next(&mut self) -> Option<Self::Item> {
        let received = self.producer.as_ref()?.receiver.recv();
        match received {
            Ok(batch) => Some(batch),
            Err(_) => {
                // Sender is gone, so the worker has either finished or panicked.
                let producer = self.producer.take()?;
                match producer.handle.join() {
                    Ok(()) => None,
                    Err(_) => Some(Err(DatasetError::PrefetchDisconnected)),
                }
            }
        }
    }
}

impl DataSetIterator for PrefetchIterator {
    fn reset(&mut self) {
        self.shutdown();
        self.producer = Some(spawn_producer(Arc::clone(&self.source), self.depth));
    }

    fn batch_size(&self) -> usize {
        self.source.batch_size()
    }

    fn num_classes(&self) -> usize {
        self.source.num_classes()
    }

    fn num_samples(&self) -> usize {
        self.source.len()
    }
}

impl Drop for PrefetchIterator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
