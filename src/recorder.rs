use crate::sample::Sample;
use anyhow::{anyhow, Context, Result};
use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::mpsc,
    thread,
};

enum Message {
    Sample(Sample),
    Stop,
}

enum Queue {
    Unbounded(mpsc::Sender<Message>),
    Bounded(mpsc::SyncSender<Message>),
}

impl Queue {
    fn send(&self, msg: Message) -> Result<(), mpsc::SendError<Message>> {
        match self {
            Queue::Unbounded(tx) => tx.send(msg),
            Queue::Bounded(tx) => tx.send(msg),
        }
    }
}

/// Appends samples to the data file from a background thread, in the order
/// they were enqueued.
pub struct Recorder {
    queue: Queue,
    handle: thread::JoinHandle<io::Result<usize>>,
}

impl Recorder {
    /// With a `capacity`, `enqueue` blocks while that many samples are pending.
    pub fn spawn(path: impl Into<PathBuf>, capacity: Option<usize>) -> Result<Self> {
        let path = path.into();
        let (queue, rx) = match capacity {
            Some(capacity) => {
                let (tx, rx) = mpsc::sync_channel(capacity);
                (Queue::Bounded(tx), rx)
            }
            None => {
                let (tx, rx) = mpsc::channel();
                (Queue::Unbounded(tx), rx)
            }
        };
        let handle = thread::Builder::new()
            .name("recorder".to_owned())
            .spawn(move || write_samples(&path, rx))
            .context("failed to spawn recorder thread")?;
        Ok(Self { queue, handle })
    }

    pub fn enqueue(&self, sample: Sample) -> Result<()> {
        self.queue
            .send(Message::Sample(sample))
            .map_err(|_| anyhow!("recorder thread has exited"))
    }

    /// Drains everything enqueued so far, then returns the number of samples
    /// written.
    pub fn stop(self) -> Result<usize> {
        // A dead writer is reported by the join below.
        let _ = self.queue.send(Message::Stop);
        let written = self
            .handle
            .join()
            .map_err(|_| anyhow!("recorder thread panicked"))?
            .context("failed to write sample")?;
        log::debug!("Recorder wrote {} samples", written);
        Ok(written)
    }
}

fn write_samples(path: &Path, rx: mpsc::Receiver<Message>) -> io::Result<usize> {
    let mut written = 0;
    for msg in rx {
        match msg {
            Message::Sample(sample) => {
                // Reopened per sample so every line is on disk before the next.
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                writeln!(file, "{}", sample)?;
                written += 1;
            }
            Message::Stop => break,
        }
    }
    Ok(written)
}

/// Deletes the previous run's data and checkpoint. Missing files are fine.
pub fn delete_previous(paths: &[&Path]) -> Result<()> {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => log::info!("Deleted {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("failed to delete {}", path.display()))
            }
        }
    }
    Ok(())
}
