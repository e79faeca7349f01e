use std::sync::Arc;
use std::time::Instant;

use relay_access::AccessList;
use relay_config::ConfigSnapshot;
use relay_queue::{ChatId, Queue, SenderId};

/// Value passed to every command handler (spec §3 "CommandContext"). Handlers
/// only ever mutate state through `access`; everything else is read-only.
pub struct CommandContext {
    pub config: Arc<ConfigSnapshot>,
    pub access: Arc<AccessList>,
    pub queue: Arc<Queue>,
    pub sender: SenderId,
    pub chat: ChatId,
    pub boot_monotonic: Instant,
    pub worker_count: u32,
}

impl CommandContext {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.config.admin_id != 0 && self.sender == self.config.admin_id
    }

    pub(crate) fn reply(&self, text: &str) -> Result<(), relay_queue::PushError> {
        self.queue.push(self.sender, self.chat, text)
    }

    pub(crate) fn reply_to(
        &self,
        target: SenderId,
        text: &str,
    ) -> Result<(), relay_queue::PushError> {
        self.queue.push(target, target, text)
    }
}
