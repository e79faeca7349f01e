use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use relay_queue::{PopError, Queue};

use crate::clients::{CompletionClient, PlatformClient};
use crate::error::CompletionError;
use crate::reasoning::strip_reasoning;

/// Substituted for a completion that strips to nothing, or that the
/// completion/send client failed to produce (spec §4.3: "an empty result
/// after stripping is signalled to the caller so it can substitute a
/// fallback").
const FALLBACK_REPLY: &str = "(no reply)";

/// Builds one worker's `CompletionClient` + `PlatformClient` pair. Called
/// once per thread: "each worker owns its own client because the underlying
/// transport is single-threaded" (spec §4.2).
pub trait ClientFactory: Send + Sync {
    fn build(&self) -> (Box<dyn CompletionClient>, Box<dyn PlatformClient>);
}

impl<F> ClientFactory for F
where
    F: Fn() -> (Box<dyn CompletionClient>, Box<dyn PlatformClient>) + Send + Sync,
{
    fn build(&self) -> (Box<dyn CompletionClient>, Box<dyn PlatformClient>) {
        self()
    }
}

/// N OS threads draining the queue with per-sender pacing (spec §4.2).
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `worker_count` threads, each running the pop → pace → (typing)
    /// → complete → strip → send loop until the queue signals shutdown.
    pub fn spawn(
        queue: Arc<Queue>,
        worker_count: u32,
        reply_delay_seconds: f64,
        system_prompt: Option<Arc<str>>,
        running: Arc<AtomicBool>,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        let handles = (0..worker_count)
            .map(|id| {
                let queue = Arc::clone(&queue);
                let running = Arc::clone(&running);
                let factory = Arc::clone(&factory);
                let system_prompt = system_prompt.clone();
                thread::Builder::new()
                    .name(format!("relay-worker-{id}"))
                    .spawn(move || {
                        worker_loop(&queue, reply_delay_seconds, system_prompt.as_deref(), &running, factory.as_ref());
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();
        Self { handles }
    }

    /// Blocks until every worker thread has exited (after the queue has
    /// been shut down and drained).
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    queue: &Queue,
    reply_delay_seconds: f64,
    system_prompt: Option<&str>,
    running: &AtomicBool,
    factory: &dyn ClientFactory,
) {
    let (completion_client, platform_client) = factory.build();

    loop {
        if !running.load(Ordering::Relaxed) {
            return;
        }
        let message = match queue.pop() {
            Ok(message) => message,
            Err(PopError::End) => return,
        };

        let elapsed = queue.monotonic_now() - message.ingress_monotonic_seconds;
        let wait = reply_delay_seconds - elapsed;
        if wait > 0.0 {
            sleep_interruptibly(Duration::from_secs_f64(wait), running);
        }
        if !running.load(Ordering::Relaxed) {
            return;
        }

        let _ = platform_client.send_typing(message.chat_id);

        let reply = match completion_client.complete(system_prompt, &message.text) {
            Ok(reply) => {
                let stripped = strip_reasoning(&reply);
                if stripped.is_empty() {
                    FALLBACK_REPLY.to_owned()
                } else {
                    stripped
                }
            }
            Err(CompletionError::Cancelled) => return,
            Err(_) => FALLBACK_REPLY.to_owned(),
        };

        let _ = platform_client.send_message(message.chat_id, &reply);
    }
}

/// Sleeps `duration`, but wakes early in short slices to observe `running`
/// (spec §5 "Suspension points": "the sleep returns on signal").
fn sleep_interruptibly(duration: Duration, running: &AtomicBool) {
    const SLICE: Duration = Duration::from_millis(100);
    let mut remaining = duration;
    while remaining > Duration::ZERO {
        if !running.load(Ordering::Relaxed) {
            return;
        }
        let slice = remaining.min(SLICE);
        thread::sleep(slice);
        remaining -= slice;
    }
}
