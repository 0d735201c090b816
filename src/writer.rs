//! Background writer for detached syncs.
//!
//! A single worker thread drains an unbounded queue in FIFO order, so file
//! images land on disk in the order they were issued. When several images are
//! already queued behind each other, only the newest is written; each image
//! is a full replacement, so the final file content is the same.

use crate::disk;
use crate::error::{Result, StoreError};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// Work items for the writer thread.
enum Command {
    /// Replace the file with this image.
    Write(Vec<u8>),
    /// Record a failure that happened before the write could be queued.
    Fail(StoreError),
    /// Reply once everything queued ahead has been applied.
    Barrier(Sender<Option<StoreError>>),
}

/// Handle to the writer thread. Dropping it drains the queue and joins.
pub struct DetachedWriter {
    sender: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl DetachedWriter {
    /// Spawn the writer thread for `path`.
    pub fn spawn(path: PathBuf, atomic: bool) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let worker = Worker {
            path: path.clone(),
            atomic,
            receiver,
            failure: None,
        };

        let handle = thread::Builder::new()
            .name("jsondb-writer".into())
            .spawn(move || worker.run())
            .map_err(|e| StoreError::io(path, e))?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(handle),
        })
    }

    /// Queue a full image. Returns immediately.
    pub fn submit(&self, image: Vec<u8>) {
        self.send(Command::Write(image));
    }

    /// Hand a failure to the writer so the next `wait` reports it.
    pub fn record_failure(&self, failure: StoreError) {
        self.send(Command::Fail(failure));
    }

    /// Block until every image queued so far has been applied, then return
    /// the first failure seen since the previous wait.
    pub fn wait(&self) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        let sender = self.sender.as_ref().ok_or(StoreError::WriterClosed)?;
        sender
            .send(Command::Barrier(reply_tx))
            .map_err(|_| StoreError::WriterClosed)?;

        match reply_rx.recv() {
            Ok(None) => Ok(()),
            Ok(Some(failure)) => Err(failure),
            Err(_) => Err(StoreError::WriterClosed),
        }
    }

    fn send(&self, command: Command) {
        let delivered = match &self.sender {
            Some(sender) => sender.send(command).is_ok(),
            None => false,
        };
        if !delivered {
            error!("background writer is gone; detached write dropped");
        }
    }
}

impl Drop for DetachedWriter {
    fn drop(&mut self) {
        // Closing the channel lets the worker finish the backlog and exit.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("background writer panicked");
            }
        }
    }
}

struct Worker {
    path: PathBuf,
    atomic: bool,
    receiver: Receiver<Command>,
    /// First failure not yet reported through a barrier.
    failure: Option<StoreError>,
}

impl Worker {
    fn run(mut self) {
        while let Ok(command) = self.receiver.recv() {
            match command {
                Command::Write(image) => self.write_latest(image),
                Command::Fail(failure) => self.remember(failure),
                Command::Barrier(reply) => self.answer(reply),
            }
        }
        debug!(path = %self.path.display(), "background writer stopped");
    }

    /// Write `image`, or a newer one if it is already waiting in the queue.
    fn write_latest(&mut self, mut image: Vec<u8>) {
        let mut collapsed = 0usize;
        let mut interrupted_by = None;

        while let Ok(next) = self.receiver.try_recv() {
            match next {
                Command::Write(newer) => {
                    image = newer;
                    collapsed += 1;
                }
                other => {
                    interrupted_by = Some(other);
                    break;
                }
            }
        }

        if collapsed > 0 {
            debug!(path = %self.path.display(), collapsed, "skipped superseded images");
        }

        if let Err(e) = disk::write_image(&self.path, &image, self.atomic) {
            error!(path = %self.path.display(), error = %e, "detached write failed");
            self.remember(e);
        }

        match interrupted_by {
            Some(Command::Fail(failure)) => self.remember(failure),
            Some(Command::Barrier(reply)) => self.answer(reply),
            Some(Command::Write(_)) | None => {}
        }
    }

    fn remember(&mut self, failure: StoreError) {
        if self.failure.is_none() {
            self.failure = Some(failure);
        }
    }

    fn answer(&mut self, reply: Sender<Option<StoreError>>) {
        // The waiter may have given up; nothing to do then.
        let _ = reply.send(self.failure.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_last_image_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        let writer = DetachedWriter::spawn(path.clone(), true).unwrap();

        for i in 0..100 {
            writer.submit(format!("{{\"n\":{i}}}").into_bytes());
        }
        writer.wait().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"n\":99}");
    }

    #[test]
    fn test_wait_reports_failure_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("db.json");
        let writer = DetachedWriter::spawn(path, false).unwrap();

        writer.submit(b"{}".to_vec());
        assert!(matches!(writer.wait(), Err(StoreError::Io { .. })));
        assert!(writer.wait().is_ok());
    }

    #[test]
    fn test_recorded_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let writer = DetachedWriter::spawn(dir.path().join("db.json"), true).unwrap();

        writer.record_failure(StoreError::InvalidArgument("boom".into()));
        assert!(matches!(writer.wait(), Err(StoreError::InvalidArgument(_))));
    }

    #[test]
    fn test_drop_applies_backlog() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        {
            let writer = DetachedWriter::spawn(path.clone(), true).unwrap();
            writer.submit(b"{\"done\":true}".to_vec());
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"done\":true}");
    }
}
