//! Tear down the audio return channel
//!
//! `<Terminate ARC>` -> TV, then wait for `<Report ARC Terminated>`.
//! Termination is unilateral: ARC is marked down however this ends.

use super::{ActionBase, ActionContext, ActionOutcome, Progress, Response};
use crate::cec::{CecMessage, LogicalAddress, Opcode};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ArcTermination {
    pub(super) base: ActionBase,
}

impl ArcTermination {
    pub fn new(tv: LogicalAddress) -> Self {
        Self {
            base: ActionBase::new(tv),
        }
    }

    fn send_terminate(&mut self, ctx: &mut dyn ActionContext) {
        ctx.send(CecMessage::terminate_arc(ctx.local_address(), self.base.target));
        self.base.arm(ctx);
    }

    pub(super) fn start(&mut self, ctx: &mut dyn ActionContext) -> Progress {
        self.send_terminate(ctx);
        Progress::Pending
    }

    pub(super) fn process_message(
        &mut self,
        message: &CecMessage,
        ctx: &mut dyn ActionContext,
    ) -> Response {
        if !self.base.is_from_target(message) {
            return Response::Ignored;
        }

        let outcome = match message.opcode() {
            Opcode::ReportArcTerminated => ActionOutcome::Succeeded,
            Opcode::FeatureAbort if message.aborted_opcode() == Some(Opcode::TerminateArc) => {
                ActionOutcome::Refused
            }
            _ => return Response::Ignored,
        };
        self.base.disarm(ctx);
        ctx.set_arc_established(false);
        Response::Finished(outcome)
    }

    pub(super) fn on_timeout(&mut self, ctx: &mut dyn ActionContext) -> Progress {
        if self.base.try_retry(ctx.policy()) {
            debug!(retry = self.base.retries, "Resending <Terminate ARC>");
            self.send_terminate(ctx);
            return Progress::Pending;
        }
        ctx.set_arc_established(false);
        Progress::Finished(ActionOutcome::TimedOut {
            retries: self.base.retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::testing::FakeContext;
    use crate::action::ActionPolicy;
    use crate::cec::FeatureAbortReason;
    use std::time::Duration;

    const TV: LogicalAddress = LogicalAddress::TV;
    const AUDIO: LogicalAddress = LogicalAddress::AUDIO_SYSTEM;

    #[test]
    fn test_report_terminated_finishes() {
        let mut ctx = FakeContext::new();
        let mut action = ArcTermination::new(TV);
        action.start(&mut ctx);
        assert_eq!(ctx.last_sent(), Some(&CecMessage::terminate_arc(AUDIO, TV)));

        let response =
            action.process_message(&CecMessage::report_arc_terminated(TV, AUDIO), &mut ctx);
        assert_eq!(response, Response::Finished(ActionOutcome::Succeeded));
        assert_eq!(ctx.arc_established, Some(false));
    }

    #[test]
    fn test_feature_abort_still_drops_arc() {
        let mut ctx = FakeContext::new();
        let mut action = ArcTermination::new(TV);
        action.start(&mut ctx);

        let abort =
            CecMessage::feature_abort(TV, AUDIO, Opcode::TerminateArc, FeatureAbortReason::NotInCorrectMode);
        assert_eq!(
            action.process_message(&abort, &mut ctx),
            Response::Finished(ActionOutcome::Refused)
        );
        assert_eq!(ctx.arc_established, Some(false));
    }

    #[test]
    fn test_zero_retry_policy_fails_on_first_timeout() {
        let mut ctx = FakeContext::new();
        ctx.policy = ActionPolicy {
            timeout: Duration::from_millis(100),
            max_retries: 0,
        };
        let mut action = ArcTermination::new(TV);
        action.start(&mut ctx);

        assert_eq!(
            action.on_timeout(&mut ctx),
            Progress::Finished(ActionOutcome::TimedOut { retries: 0 })
        );
        assert_eq!(ctx.sent.len(), 1);
    }
}
