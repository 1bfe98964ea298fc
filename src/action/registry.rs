//! Set of in-flight actions owned by the controller

use super::{Action, ActionContext, ActionKind, ActionOutcome, Progress, Response};
use crate::cec::{CecMessage, LogicalAddress};
use crate::device::TimerId;
use tracing::{debug, info, warn};

/// In-flight actions keyed by (kind, target)
///
/// At most one action per key. Every removal path tears the action down,
/// so a removed action never leaves a live timer behind.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: Vec<Action>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn has(&self, kind: ActionKind) -> bool {
        self.actions.iter().any(|a| a.kind() == kind)
    }

    pub fn actions(&self, kind: ActionKind) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(move |a| a.kind() == kind)
    }

    /// Start an action and keep it if it is still waiting
    ///
    /// # Panics
    /// If an action with the same kind and target is already registered.
    pub fn start(&mut self, mut action: Action, ctx: &mut dyn ActionContext) -> Progress {
        let (kind, target) = (action.kind(), action.target());
        if self
            .actions
            .iter()
            .any(|a| a.kind() == kind && a.target() == target)
        {
            panic!("{} for {} already in flight", kind, target);
        }

        debug!(action = %kind, %target, "Starting action");
        let progress = action.start(ctx);
        match progress {
            Progress::Pending => self.actions.push(action),
            Progress::Finished(outcome) => finish(action, outcome, ctx),
        }
        progress
    }

    /// Offer a message to each action in start order
    ///
    /// Returns true if one of them consumed it.
    pub fn dispatch_message(&mut self, message: &CecMessage, ctx: &mut dyn ActionContext) -> bool {
        for idx in 0..self.actions.len() {
            match self.actions[idx].process_message(message, ctx) {
                Response::Ignored => continue,
                Response::Consumed => return true,
                Response::Finished(outcome) => {
                    let action = self.actions.remove(idx);
                    finish(action, outcome, ctx);
                    return true;
                }
            }
        }
        false
    }

    /// Route a timer to its owner; stale ids return false
    pub fn dispatch_timeout(&mut self, timer: TimerId, ctx: &mut dyn ActionContext) -> bool {
        let Some(idx) = self.actions.iter().position(|a| a.timer() == Some(timer)) else {
            debug!(%timer, "Stale timer ignored");
            return false;
        };

        if let Progress::Finished(outcome) = self.actions[idx].on_timeout(ctx) {
            let action = self.actions.remove(idx);
            finish(action, outcome, ctx);
        }
        true
    }

    /// Remove every action of `kind`
    pub fn remove(&mut self, kind: ActionKind, ctx: &mut dyn ActionContext) {
        self.remove_where(|a| a.kind() == kind, ctx);
    }

    pub fn remove_for(
        &mut self,
        kind: ActionKind,
        target: LogicalAddress,
        ctx: &mut dyn ActionContext,
    ) {
        self.remove_where(|a| a.kind() == kind && a.target() == target, ctx);
    }

    pub fn clear(&mut self, ctx: &mut dyn ActionContext) {
        self.remove_where(|_| true, ctx);
    }

    fn remove_where(&mut self, pred: impl Fn(&Action) -> bool, ctx: &mut dyn ActionContext) {
        let mut idx = 0;
        while idx < self.actions.len() {
            if pred(&self.actions[idx]) {
                let mut action = self.actions.remove(idx);
                debug!(action = %action.kind(), target = %action.target(), "Removing action");
                action.teardown(ctx);
            } else {
                idx += 1;
            }
        }
    }
}

fn finish(mut action: Action, outcome: ActionOutcome, ctx: &mut dyn ActionContext) {
    action.teardown(ctx);
    let (kind, target) = (action.kind(), action.target());
    match outcome {
        ActionOutcome::Succeeded => info!(action = %kind, %target, "Action finished"),
        ActionOutcome::Refused => warn!(action = %kind, %target, "Action refused by peer"),
        ActionOutcome::TimedOut { .. } => {
            if let Some(err) = outcome.into_error(kind) {
                warn!(%target, "{}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::testing::FakeContext;
    use crate::cec::{FeatureAbortReason, Opcode};

    const TV: LogicalAddress = LogicalAddress::TV;
    const AUDIO: LogicalAddress = LogicalAddress::AUDIO_SYSTEM;

    #[test]
    fn test_start_registers_pending_action() {
        let mut ctx = FakeContext::new();
        let mut registry = ActionRegistry::new();

        let progress = registry.start(Action::arc_initiation(TV), &mut ctx);
        assert_eq!(progress, Progress::Pending);
        assert_eq!(registry.len(), 1);
        assert!(registry.has(ActionKind::ArcInitiation));
        assert!(!registry.has(ActionKind::ArcTermination));
        assert_eq!(registry.actions(ActionKind::ArcInitiation).count(), 1);
    }

    #[test]
    #[should_panic(expected = "already in flight")]
    fn test_duplicate_start_panics() {
        let mut ctx = FakeContext::new();
        let mut registry = ActionRegistry::new();
        registry.start(Action::arc_initiation(TV), &mut ctx);
        registry.start(Action::arc_initiation(TV), &mut ctx);
    }

    #[test]
    fn test_finished_action_is_removed_once() {
        let mut ctx = FakeContext::new();
        let mut registry = ActionRegistry::new();
        registry.start(Action::arc_initiation(TV), &mut ctx);

        let reply = CecMessage::report_arc_initiated(TV, AUDIO);
        assert!(registry.dispatch_message(&reply, &mut ctx));
        assert!(registry.is_empty());
        // A second copy has no taker
        assert!(!registry.dispatch_message(&reply, &mut ctx));
    }

    #[test]
    fn test_unrelated_message_not_consumed() {
        let mut ctx = FakeContext::new();
        let mut registry = ActionRegistry::new();
        registry.start(Action::arc_initiation(TV), &mut ctx);

        assert!(!registry.dispatch_message(&CecMessage::give_audio_status(TV, AUDIO), &mut ctx));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_stale_timer_ignored() {
        let mut ctx = FakeContext::new();
        let mut registry = ActionRegistry::new();
        registry.start(Action::arc_initiation(TV), &mut ctx);

        assert!(!registry.dispatch_timeout(TimerId(999), &mut ctx));
        assert_eq!(ctx.sent.len(), 1);
    }

    #[test]
    fn test_timeouts_retry_then_deregister() {
        let mut ctx = FakeContext::new();
        let mut registry = ActionRegistry::new();
        registry.start(Action::arc_termination(TV), &mut ctx);

        for _ in 0..2 {
            let timer = registry
                .actions(ActionKind::ArcTermination)
                .next()
                .and_then(Action::timer)
                .unwrap();
            assert!(registry.dispatch_timeout(timer, &mut ctx));
            assert_eq!(registry.len(), 1);
        }
        let timer = registry
            .actions(ActionKind::ArcTermination)
            .next()
            .and_then(Action::timer)
            .unwrap();
        assert_eq!(registry.actions(ActionKind::ArcTermination).next().unwrap().retries(), 2);
        assert!(registry.dispatch_timeout(timer, &mut ctx));
        assert!(registry.is_empty());
        assert_eq!(ctx.sent.len(), 3);
        assert_eq!(ctx.arc_established, Some(false));

        // Old timer id after removal is stale
        assert!(!registry.dispatch_timeout(timer, &mut ctx));
    }

    #[test]
    fn test_remove_cancels_timer_and_is_idempotent() {
        let mut ctx = FakeContext::new();
        let mut registry = ActionRegistry::new();
        registry.start(Action::arc_initiation(TV), &mut ctx);
        let timer = ctx.armed[0];

        registry.remove(ActionKind::ArcInitiation, &mut ctx);
        assert!(registry.is_empty());
        assert_eq!(ctx.cancelled, vec![timer]);

        registry.remove(ActionKind::ArcInitiation, &mut ctx);
        assert_eq!(ctx.cancelled, vec![timer]);
    }

    #[test]
    fn test_remove_for_only_matches_target() {
        let mut ctx = FakeContext::new();
        let mut registry = ActionRegistry::new();
        registry.start(Action::arc_initiation(TV), &mut ctx);

        registry.remove_for(ActionKind::ArcInitiation, LogicalAddress::PLAYBACK_1, &mut ctx);
        assert_eq!(registry.len(), 1);
        registry.remove_for(ActionKind::ArcInitiation, TV, &mut ctx);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clear_tears_down_everything() {
        let mut ctx = FakeContext::new();
        let mut registry = ActionRegistry::new();
        registry.start(Action::arc_initiation(TV), &mut ctx);
        registry.start(Action::system_audio_initiation(TV), &mut ctx);

        registry.clear(&mut ctx);
        assert!(registry.is_empty());
        assert_eq!(ctx.cancelled.len(), 2);
    }

    #[test]
    fn test_refusal_finishes_action() {
        let mut ctx = FakeContext::new();
        let mut registry = ActionRegistry::new();
        registry.start(Action::arc_initiation(TV), &mut ctx);

        let abort = CecMessage::feature_abort(TV, AUDIO, Opcode::InitiateArc, FeatureAbortReason::Refused);
        assert!(registry.dispatch_message(&abort, &mut ctx));
        assert!(registry.is_empty());
        assert_eq!(ctx.arc_established, Some(false));
    }
}
