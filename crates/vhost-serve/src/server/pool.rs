// Copyright (c) 2025 Zensical and contributors

// SPDX-License-Identifier: MIT
// Third-party contributions licensed under DCO

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:

// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NON-INFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

// ----------------------------------------------------------------------------

//! Worker pool.

use crossbeam::channel::{unbounded, Receiver, Sender};
use mio::Waker;
use std::sync::Arc;
use std::thread::{self, Builder, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::http::{Header, Request};
use crate::router::Router;

use super::{Error, Result};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Request to be handled by a worker.
#[derive(Debug)]
pub struct Job {
    /// Slab index of the connection.
    pub slot: usize,
    /// Connection identifier.
    pub id: u64,
    /// Request.
    pub request: Request,
}

/// Encoded response produced by a worker.
#[derive(Debug)]
pub struct Completion {
    /// Slab index of the connection.
    pub slot: usize,
    /// Connection identifier.
    pub id: u64,
    /// Encoded response.
    pub bytes: Vec<u8>,
}

// ----------------------------------------------------------------------------

/// Worker pool.
///
/// Workers take jobs from a shared queue, resolve and handle them, and encode
/// the response, so the event loop only ever moves bytes. After posting a
/// completion, the worker wakes the event loop. Dropping the job sender makes
/// all workers exit once the queue is drained.
pub struct Pool {
    /// Job sender.
    jobs: Option<Sender<Job>>,
    /// Completion receiver.
    completions: Receiver<Completion>,
    /// Join handles of workers.
    workers: Vec<JoinHandle<()>>,
}

/// Shared state of workers.
struct Worker {
    /// Router.
    router: Arc<Router>,
    /// Compression level.
    gzip: u32,
    /// Whether to log every request at info level.
    verbose: bool,
    /// Completion sender.
    sender: Sender<Completion>,
    /// Waker of the event loop.
    waker: Arc<Waker>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Pool {
    /// Creates a worker pool and starts the given number of workers.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Io`] if a worker thread can't be spawned.
    pub fn new(
        workers: usize, router: Arc<Router>, gzip: u32, verbose: bool,
        waker: Arc<Waker>,
    ) -> Result<Self> {
        let (jobs, queue) = unbounded::<Job>();
        let (sender, completions) = unbounded();

        // Spawn workers, each with its own handle on the shared state
        let mut handles = Vec::with_capacity(workers);
        for n in 0..workers {
            let queue = queue.clone();
            let worker = Worker {
                router: Arc::clone(&router),
                gzip,
                verbose,
                sender: sender.clone(),
                waker: Arc::clone(&waker),
            };
            let handle = Builder::new()
                .name(format!("worker/{n}"))
                .spawn(move || {
                    for job in queue {
                        worker.handle(job);
                    }
                })?;
            handles.push(handle);
        }

        // Return worker pool
        Ok(Self {
            jobs: Some(jobs),
            completions,
            workers: handles,
        })
    }

    /// Submits a job to the pool.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Disconnected`] if the pool was shut down.
    pub fn dispatch(&self, job: Job) -> Result {
        self.jobs
            .as_ref()
            .ok_or(Error::Disconnected)?
            .send(job)
            .map_err(|_| Error::Disconnected)
    }

    /// Returns an iterator over all completions that are ready.
    pub fn completions(&self) -> impl Iterator<Item = Completion> + '_ {
        self.completions.try_iter()
    }

    /// Shuts down the pool, waiting for workers until the deadline.
    ///
    /// Pending jobs are still handled. Workers still busy at the deadline are
    /// detached, as threads can't be interrupted.
    pub fn shutdown(mut self, deadline: Instant) {
        drop(self.jobs.take());
        for handle in self.workers.drain(..) {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                let name = handle.thread().name().unwrap_or("worker");
                warn!(name, "worker did not finish in time");
            }
        }
    }
}

impl Worker {
    /// Handles a job and posts the encoded response.
    fn handle(&self, job: Job) {
        let Job { slot, id, request } = job;
        let time = Instant::now();

        // Only compress when the client accepts gzip
        let gzip = request
            .headers
            .get(Header::AcceptEncoding)
            .filter(|value| value.contains("gzip"))
            .map_or(0, |_| self.gzip);

        // Handle request and encode response
        let method = request.method.clone();
        let path = request.path.clone();
        let res = self
            .router
            .handle(request)
            .header(Header::Connection, "close");
        let status = res.status;
        let bytes = res.into_bytes(gzip);

        // Log request summary
        let elapsed = time.elapsed();
        if self.verbose {
            info!(%method, %path, %status, ?elapsed, "request");
        } else {
            debug!(%method, %path, %status, ?elapsed, "request");
        }

        // The event loop might already be gone during shutdown, in which case
        // there's nobody left to write the response to
        if self.sender.send(Completion { slot, id, bytes }).is_ok() {
            let _ = self.waker.wake();
        }
    }
}
