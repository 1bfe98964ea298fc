//! In-flight protocol exchanges
//!
//! An action is a small state machine driving one multi-step exchange
//! (e.g. bringing up ARC). Actions live in the controller's
//! `ActionRegistry` and advance on correlated responses or timeouts.
//!
//! Capability set shared by every variant:
//! - `start` - send the first message, arm the response timer
//! - `process_message` - consume a matching response, maybe finish
//! - `on_timeout` - resend up to `max_retries`, then give up
//!
//! Actions never touch the controller directly. They see it through
//! `ActionContext`, which the controller implements.

mod arc_initiation;
mod arc_termination;
mod registry;
mod system_audio_initiation;

pub use arc_initiation::ArcInitiation;
pub use arc_termination::ArcTermination;
pub use registry::ActionRegistry;
pub use system_audio_initiation::SystemAudioInitiation;

use crate::cec::{ActiveSource, CecMessage, LogicalAddress};
use crate::constants::{DEFAULT_ACTION_MAX_RETRIES, DEFAULT_ACTION_TIMEOUT_MS};
use crate::device::TimerId;
use crate::error::CecError;
use std::fmt;
use std::time::{Duration, Instant};

/// Kind tag used to key the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    SystemAudioInitiationFromAvr,
    ArcInitiation,
    ArcTermination,
}

impl ActionKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::SystemAudioInitiationFromAvr => "SystemAudioInitiationFromAvr",
            Self::ArcInitiation => "ArcInitiation",
            Self::ArcTermination => "ArcTermination",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Timeout and retry policy shared by all actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
            max_retries: DEFAULT_ACTION_MAX_RETRIES,
        }
    }
}

/// How a finished action ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded,
    /// The peer answered negatively
    Refused,
    /// No answer after all retries
    TimedOut { retries: u32 },
}

impl ActionOutcome {
    /// Error form of a failed outcome, for logging
    pub fn into_error(self, kind: ActionKind) -> Option<CecError> {
        match self {
            Self::TimedOut { retries } => Some(CecError::ActionTimeout {
                action: kind.name(),
                retries,
            }),
            _ => None,
        }
    }
}

/// Reaction of an action to an incoming message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Not for this action
    Ignored,
    /// Consumed, still waiting
    Consumed,
    /// Consumed and done
    Finished(ActionOutcome),
}

/// State after a timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Pending,
    Finished(ActionOutcome),
}

/// The controller as seen by an action
pub trait ActionContext {
    fn local_address(&self) -> LogicalAddress;
    fn policy(&self) -> ActionPolicy;
    fn now(&self) -> Instant;
    fn send(&mut self, message: CecMessage);
    fn arm_timer(&mut self, delay: Duration) -> TimerId;
    fn cancel_timer(&mut self, timer: TimerId);
    fn active_source(&self) -> ActiveSource;
    fn set_active_source(&mut self, source: ActiveSource);
    /// Change System Audio Mode, including its mute side effect
    fn set_system_audio_mode(&mut self, on: bool);
    fn set_arc_established(&mut self, established: bool);
}

/// Bookkeeping shared by every action variant
#[derive(Debug, Clone)]
pub(crate) struct ActionBase {
    target: LogicalAddress,
    retries: u32,
    timer: Option<TimerId>,
    deadline: Option<Instant>,
}

impl ActionBase {
    fn new(target: LogicalAddress) -> Self {
        Self {
            target,
            retries: 0,
            timer: None,
            deadline: None,
        }
    }

    /// (Re)arm the response timer
    fn arm(&mut self, ctx: &mut dyn ActionContext) {
        self.disarm(ctx);
        let timeout = ctx.policy().timeout;
        self.timer = Some(ctx.arm_timer(timeout));
        self.deadline = Some(ctx.now() + timeout);
    }

    fn disarm(&mut self, ctx: &mut dyn ActionContext) {
        if let Some(timer) = self.timer.take() {
            ctx.cancel_timer(timer);
        }
        self.deadline = None;
    }

    /// The timer fired; it no longer needs cancelling
    fn fired(&mut self) {
        self.timer = None;
        self.deadline = None;
    }

    /// Count one retry if the budget allows it
    fn try_retry(&mut self, policy: ActionPolicy) -> bool {
        if self.retries < policy.max_retries {
            self.retries += 1;
            true
        } else {
            false
        }
    }

    fn is_from_target(&self, message: &CecMessage) -> bool {
        message.source() == self.target
    }
}

/// One in-flight action
#[derive(Debug, Clone)]
pub enum Action {
    SystemAudioInitiation(SystemAudioInitiation),
    ArcInitiation(ArcInitiation),
    ArcTermination(ArcTermination),
}

impl Action {
    pub fn system_audio_initiation(tv: LogicalAddress) -> Self {
        Self::SystemAudioInitiation(SystemAudioInitiation::new(tv))
    }

    pub fn arc_initiation(tv: LogicalAddress) -> Self {
        Self::ArcInitiation(ArcInitiation::new(tv))
    }

    pub fn arc_termination(tv: LogicalAddress) -> Self {
        Self::ArcTermination(ArcTermination::new(tv))
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::SystemAudioInitiation(_) => ActionKind::SystemAudioInitiationFromAvr,
            Self::ArcInitiation(_) => ActionKind::ArcInitiation,
            Self::ArcTermination(_) => ActionKind::ArcTermination,
        }
    }

    fn base(&self) -> &ActionBase {
        match self {
            Self::SystemAudioInitiation(a) => &a.base,
            Self::ArcInitiation(a) => &a.base,
            Self::ArcTermination(a) => &a.base,
        }
    }

    fn base_mut(&mut self) -> &mut ActionBase {
        match self {
            Self::SystemAudioInitiation(a) => &mut a.base,
            Self::ArcInitiation(a) => &mut a.base,
            Self::ArcTermination(a) => &mut a.base,
        }
    }

    pub fn target(&self) -> LogicalAddress {
        self.base().target
    }

    pub fn retries(&self) -> u32 {
        self.base().retries
    }

    /// Pending response timer, if any
    pub fn timer(&self) -> Option<TimerId> {
        self.base().timer
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.base().deadline
    }

    pub(crate) fn start(&mut self, ctx: &mut dyn ActionContext) -> Progress {
        match self {
            Self::SystemAudioInitiation(a) => a.start(ctx),
            Self::ArcInitiation(a) => a.start(ctx),
            Self::ArcTermination(a) => a.start(ctx),
        }
    }

    pub(crate) fn process_message(
        &mut self,
        message: &CecMessage,
        ctx: &mut dyn ActionContext,
    ) -> Response {
        match self {
            Self::SystemAudioInitiation(a) => a.process_message(message, ctx),
            Self::ArcInitiation(a) => a.process_message(message, ctx),
            Self::ArcTermination(a) => a.process_message(message, ctx),
        }
    }

    pub(crate) fn on_timeout(&mut self, ctx: &mut dyn ActionContext) -> Progress {
        self.base_mut().fired();
        match self {
            Self::SystemAudioInitiation(a) => a.on_timeout(ctx),
            Self::ArcInitiation(a) => a.on_timeout(ctx),
            Self::ArcTermination(a) => a.on_timeout(ctx),
        }
    }

    /// Release the timer; called exactly once when the action leaves the registry
    pub(crate) fn teardown(&mut self, ctx: &mut dyn ActionContext) {
        self.base_mut().disarm(ctx);
    }
}
