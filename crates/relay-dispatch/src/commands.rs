use relay_access::AddOutcome;

use crate::context::CommandContext;
use crate::error::DispatchError;

/// Result of attempting to dispatch one piece of message text (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Text did not start with `/`; not a command at all.
    NotACommand,
    /// Started with `/` but named no known command, or the `@botname`
    /// suffix named a different bot.
    Unhandled,
    /// Recognized and acted on — including authorization failures, which
    /// still count as handled because the slash was consumed.
    Handled,
}

type Handler = fn(&CommandContext, &str) -> Result<(), DispatchError>;

struct CommandSpec {
    name: &'static str,
    admin_only: bool,
    handler: Handler,
}

/// Alphabetically ordered so [`slice::binary_search_by`] resolves names in
/// O(log n) (spec §4.4).
const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "allow",
        admin_only: true,
        handler: handle_allow,
    },
    CommandSpec {
        name: "help",
        admin_only: false,
        handler: handle_help,
    },
    CommandSpec {
        name: "revoke",
        admin_only: true,
        handler: handle_revoke,
    },
    CommandSpec {
        name: "start",
        admin_only: false,
        handler: handle_start,
    },
    CommandSpec {
        name: "status",
        admin_only: true,
        handler: handle_status,
    },
];

/// Parses `text` as a slash-command and dispatches it, enqueueing any reply
/// rather than sending it directly (spec §4.4 "Side effects of commands are
/// always deferred to the queue").
pub fn dispatch(ctx: &CommandContext, text: &str) -> Result<DispatchOutcome, DispatchError> {
    let Some(rest) = text.strip_prefix('/') else {
        return Ok(DispatchOutcome::NotACommand);
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or("");
    let argument = parts.next().unwrap_or("").trim();

    let (name, suffix) = match head.split_once('@') {
        Some((name, suffix)) => (name, Some(suffix)),
        None => (head, None),
    };

    if let Some(suffix) = suffix {
        match ctx.config.bot_username.as_deref() {
            Some(bot_username) if suffix.eq_ignore_ascii_case(bot_username) => {}
            _ => return Ok(DispatchOutcome::Unhandled),
        }
    }

    let Ok(index) = COMMANDS.binary_search_by(|spec| spec.name.cmp(name)) else {
        return Ok(DispatchOutcome::Unhandled);
    };
    let spec = &COMMANDS[index];

    if spec.admin_only && !ctx.is_admin() {
        ctx.reply("not authorized")?;
        return Ok(DispatchOutcome::Handled);
    }

    (spec.handler)(ctx, argument)?;
    Ok(DispatchOutcome::Handled)
}

/// Decimal 64-bit integer, exact match of the whole argument, `0` rejected
/// (spec §4.4 "Argument parsing").
fn parse_sender_id(argument: &str) -> Option<relay_queue::SenderId> {
    let id: relay_queue::SenderId = argument.parse().ok()?;
    (id != 0).then_some(id)
}

fn handle_start(ctx: &CommandContext, _argument: &str) -> Result<(), DispatchError> {
    ctx.reply("hello, I'm listening.")?;
    Ok(())
}

fn handle_help(ctx: &CommandContext, _argument: &str) -> Result<(), DispatchError> {
    ctx.reply("commands: /start /help /allow <id> /revoke <id> /status")?;
    Ok(())
}

fn handle_allow(ctx: &CommandContext, argument: &str) -> Result<(), DispatchError> {
    let Some(target) = parse_sender_id(argument) else {
        ctx.reply("usage: /allow <id>")?;
        return Ok(());
    };
    match ctx.access.add(target)? {
        AddOutcome::Inserted => {
            ctx.reply(&format!("{target} is now allowed"))?;
            ctx.reply_to(target, "you have been granted access")?;
        }
        AddOutcome::AlreadyPresent => ctx.reply(&format!("{target} is already allowed"))?,
        AddOutcome::Full => ctx.reply("access list is full")?,
    }
    Ok(())
}

fn handle_revoke(ctx: &CommandContext, argument: &str) -> Result<(), DispatchError> {
    let Some(target) = parse_sender_id(argument) else {
        ctx.reply("usage: /revoke <id>")?;
        return Ok(());
    };
    match ctx.access.remove(target)? {
        relay_access::RemoveOutcome::Removed => ctx.reply(&format!("{target} revoked"))?,
        relay_access::RemoveOutcome::NotPresent => {
            ctx.reply(&format!("{target} was not allowed"))?;
        }
    }
    Ok(())
}

fn handle_status(ctx: &CommandContext, _argument: &str) -> Result<(), DispatchError> {
    let uptime = ctx.boot_monotonic.elapsed().as_secs();
    ctx.reply(&format!(
        "workers: {}, allowed: {}, uptime: {uptime}s",
        ctx.worker_count,
        ctx.access.count()
    ))?;
    Ok(())
}
