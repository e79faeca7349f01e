mod update;

use std::io::BufRead;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

use relay_access::AccessList;
use relay_config::ConfigSnapshot;
use relay_ingress::{IngressConfig, IngressServer};
use relay_log::{CircularLog, Level};
use relay_queue::Queue;
use relay_workers::{ClientFactory, CompletionClient, PlatformClient, UreqCompletionClient, UreqPlatformClient, WorkerPool};

use crate::update::RouterState;

/// Reads stdin line by line and clears `running` on EOF or a `quit` line.
/// Real OS signal trapping (SIGINT/SIGTERM) is out of scope here; this is
/// the cooperative shutdown trigger the rest of the system already waits
/// on (spec §5).
fn watch_for_shutdown(running: Arc<AtomicBool>, notify: Arc<(Mutex<bool>, Condvar)>) {
    std::thread::Builder::new()
        .name("relay-shutdown-watch".to_owned())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(text) if text.trim().eq_ignore_ascii_case("quit") => break,
                    Ok(_) => continue,
                    Err(_) => break,
                }
            }
            running.store(false, Ordering::Relaxed);
            let (lock, cvar) = &*notify;
            *lock.lock().unwrap() = true;
            cvar.notify_all();
        })
        .expect("failed to spawn shutdown watcher thread");
}

/// Opens the configured log file, falling back to a path in the system
/// temp directory if that fails. A logger that can't be opened is not a
/// reason to abort startup (spec §6 "Exit codes" — "logger init failure
/// is non-fatal and falls through to standard-error-only"); `CircularLog`
/// always mirrors every line to stderr regardless of where the file lives,
/// so the fallback still gets the operator a working log, just not at the
/// path they configured.
fn open_log_or_fallback(config: &ConfigSnapshot) -> CircularLog {
    let log_cap = u64::from(config.log_max_size_mb) * 1_000_000;
    match CircularLog::open(&config.log_path, log_cap, Level::Info) {
        Ok(log) => log,
        Err(err) => {
            eprintln!(
                "relay-daemon: failed to open log at {}: {err} (falling back to stderr-only logging)",
                config.log_path
            );
            let fallback_path = std::env::temp_dir().join("relay-daemon-fallback.log");
            CircularLog::open(&fallback_path, log_cap.max(256), Level::Info)
                .expect("system temp directory must be writable for fallback logging")
        }
    }
}

fn run() -> Result<(), String> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "relay.toml".to_owned());
    let config = Arc::new(
        ConfigSnapshot::from_file(&config_path)
            .map_err(|e| format!("failed to load config at {config_path}: {e}"))?,
    );

    let log = Arc::new(open_log_or_fallback(&config));
    log.info("relay-daemon starting up");

    let access = Arc::new(
        AccessList::load(&config.access_path)
            .map_err(|e| format!("failed to load access list at {}: {e}", config.access_path))?,
    );

    let queue = Arc::new(Queue::new(relay_queue::Config::new(config.user_ring_size)));
    let running = Arc::new(AtomicBool::new(true));

    struct UreqClientFactory {
        config: Arc<ConfigSnapshot>,
        running: Arc<AtomicBool>,
    }
    impl ClientFactory for UreqClientFactory {
        fn build(&self) -> (Box<dyn CompletionClient>, Box<dyn PlatformClient>) {
            (
                Box::new(UreqCompletionClient::new(&self.config, Arc::clone(&self.running))),
                Box::new(UreqPlatformClient::new(
                    self.config.platform_api_base.clone(),
                    Arc::clone(&self.running),
                )),
            )
        }
    }

    let worker_pool = WorkerPool::spawn(
        Arc::clone(&queue),
        config.worker_count,
        f64::from(config.reply_delay_seconds),
        config.completion_system_prompt.clone().map(Arc::from),
        Arc::clone(&running),
        Arc::new(UreqClientFactory {
            config: Arc::clone(&config),
            running: Arc::clone(&running),
        }),
    );

    let router_state = RouterState {
        config: Arc::clone(&config),
        access: Arc::clone(&access),
        queue: Arc::clone(&queue),
        log: Arc::clone(&log),
        boot_monotonic: Instant::now(),
        worker_count: config.worker_count,
    };

    let ingress = if config.webhook_enabled {
        let ingress_config = IngressConfig {
            port: config.webhook_port,
            threads: config.webhook_threads as usize,
            pool_size: config.webhook_pool_size as usize,
            secret: config.webhook_secret.clone(),
        };
        let callback_state = router_state.clone();
        let server = IngressServer::start(
            ingress_config,
            Arc::new(move |value| update::route_update(&callback_state, value)),
        )
        .map_err(|e| format!("failed to start webhook ingress: {e}"))?;
        log.info(&format!("webhook ingress listening on port {}", config.webhook_port));
        Some(server)
    } else {
        None
    };

    let shutdown_notify = Arc::new((Mutex::new(false), Condvar::new()));
    watch_for_shutdown(Arc::clone(&running), Arc::clone(&shutdown_notify));

    let (lock, cvar) = &*shutdown_notify;
    let mut signalled = lock.lock().unwrap();
    while !*signalled {
        signalled = cvar.wait(signalled).unwrap();
    }
    drop(signalled);

    log.info("relay-daemon shutting down");
    queue.shutdown();
    worker_pool.join();
    if let Some(server) = ingress {
        server.shutdown();
    }
    log.info("relay-daemon shutdown complete");
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("relay-daemon: {err}");
            ExitCode::FAILURE
        }
    }
}
