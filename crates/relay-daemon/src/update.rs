use std::sync::Arc;
use std::time::Instant;

use relay_access::AccessList;
use relay_config::ConfigSnapshot;
use relay_dispatch::{dispatch, CommandContext};
use relay_log::CircularLog;
use relay_queue::Queue;

/// Shared collaborators an incoming update is routed through. Built once at
/// startup and cloned (cheaply, via `Arc`) into the webhook callback.
#[derive(Clone)]
pub struct RouterState {
    pub config: Arc<ConfigSnapshot>,
    pub access: Arc<AccessList>,
    pub queue: Arc<Queue>,
    pub log: Arc<CircularLog>,
    pub boot_monotonic: Instant,
    pub worker_count: u32,
}

/// Pulls `(sender_id, chat_id, text)` out of a Telegram-shaped update tree:
/// `{"message": {"from": {"id": ..}, "chat": {"id": ..}, "text": ".."}}`.
/// Anything else is not a message update and is dropped silently, matching
/// the webhook's "parse failure ... dropped update" handling for shapes
/// this relay does not understand (spec §4.5 step 5).
fn extract_message(update: &serde_json::Value) -> Option<(i64, i64, &str)> {
    let message = update.get("message")?;
    let sender_id = message.get("from")?.get("id")?.as_i64()?;
    let chat_id = message.get("chat")?.get("id")?.as_i64()?;
    let text = message.get("text")?.as_str()?;
    Some((sender_id, chat_id, text))
}

/// Routes one parsed update: filters by the access list, dispatches slash
/// commands, and enqueues anything else as a plain message for the worker
/// pool (spec §2 "Data flow").
pub fn route_update(state: &RouterState, update: serde_json::Value) {
    let Some((sender_id, chat_id, text)) = extract_message(&update) else {
        state.log.debug("webhook: update did not match the expected message shape");
        return;
    };

    let is_admin = state.config.admin_id != 0 && sender_id == state.config.admin_id;
    if !state.access.contains(sender_id) && !is_admin {
        state.log.debug(&format!("dropping message from unauthorized sender {sender_id}"));
        return;
    }

    let ctx = CommandContext {
        config: Arc::clone(&state.config),
        access: Arc::clone(&state.access),
        queue: Arc::clone(&state.queue),
        sender: sender_id,
        chat: chat_id,
        boot_monotonic: state.boot_monotonic,
        worker_count: state.worker_count,
    };

    match dispatch(&ctx, text) {
        Ok(relay_dispatch::DispatchOutcome::NotACommand) => {
            if let Err(err) = state.queue.push(sender_id, chat_id, text) {
                state.log.warn(&format!("queue full for sender {sender_id}: {err}"));
            }
        }
        Ok(_) => {}
        Err(err) => state.log.error(&format!("dispatch failed: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_queue::Config;
    use tempfile::tempdir;

    fn make_state(admin_id: i64) -> RouterState {
        let dir = tempdir().unwrap();
        let config = Arc::new(
            ConfigSnapshot::from_toml_str(&format!("admin_id = {admin_id}")).unwrap(),
        );
        let access = Arc::new(AccessList::load(dir.path().join("access.txt")).unwrap());
        let queue = Arc::new(Queue::new(Config::default()));
        let log = Arc::new(CircularLog::open(dir.path().join("log.txt"), 4096, relay_log::Level::Debug).unwrap());
        RouterState {
            config,
            access,
            queue,
            log,
            boot_monotonic: Instant::now(),
            worker_count: 1,
        }
    }

    #[test]
    fn unauthorized_sender_is_dropped() {
        let state = make_state(999);
        let update = serde_json::json!({"message": {"from": {"id": 1}, "chat": {"id": 1}, "text": "hi"}});
        route_update(&state, update);
        assert_eq!(state.queue.depth(), 0);
    }

    #[test]
    fn admin_message_is_enqueued_even_without_access_entry() {
        let state = make_state(1);
        let update = serde_json::json!({"message": {"from": {"id": 1}, "chat": {"id": 1}, "text": "hi"}});
        route_update(&state, update);
        assert_eq!(state.queue.depth(), 1);
    }

    #[test]
    fn allowed_sender_command_is_dispatched_not_enqueued_as_plain_text() {
        let state = make_state(1);
        state.access.add(42).unwrap();
        let update = serde_json::json!({"message": {"from": {"id": 42}, "chat": {"id": 42}, "text": "/start"}});
        route_update(&state, update);
        // /start enqueues its own reply, so depth is 1 — not the raw "/start" text.
        let msg = state.queue.try_pop().unwrap();
        assert_ne!(msg.text, "/start");
    }

    #[test]
    fn malformed_update_is_dropped_without_panicking() {
        let state = make_state(0);
        route_update(&state, serde_json::json!({"unexpected": true}));
        assert_eq!(state.queue.depth(), 0);
    }
}
