//! Bring up the audio return channel from the audio system side
//!
//! `<Initiate ARC>` -> TV, then wait for `<Report ARC Initiated>`.
//! `<Report ARC Terminated>` or `<Feature Abort>[Initiate ARC]` means the
//! TV refused.

use super::{ActionBase, ActionContext, ActionOutcome, Progress, Response};
use crate::cec::{CecMessage, LogicalAddress, Opcode};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ArcInitiation {
    pub(super) base: ActionBase,
}

impl ArcInitiation {
    pub fn new(tv: LogicalAddress) -> Self {
        Self {
            base: ActionBase::new(tv),
        }
    }

    fn send_initiate(&mut self, ctx: &mut dyn ActionContext) {
        ctx.send(CecMessage::initiate_arc(ctx.local_address(), self.base.target));
        self.base.arm(ctx);
    }

    pub(super) fn start(&mut self, ctx: &mut dyn ActionContext) -> Progress {
        self.send_initiate(ctx);
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

        match message.opcode() {
            Opcode::ReportArcInitiated => {
                self.base.disarm(ctx);
                ctx.set_arc_established(true);
                Response::Finished(ActionOutcome::Succeeded)
            }
            Opcode::ReportArcTerminated => {
                self.base.disarm(ctx);
                ctx.set_arc_established(false);
                Response::Finished(ActionOutcome::Refused)
            }
            Opcode::FeatureAbort if message.aborted_opcode() == Some(Opcode::InitiateArc) => {
                self.base.disarm(ctx);
                ctx.set_arc_established(false);
                Response::Finished(ActionOutcome::Refused)
            }
            _ => Response::Ignored,
        }
    }

    pub(super) fn on_timeout(&mut self, ctx: &mut dyn ActionContext) -> Progress {
        if self.base.try_retry(ctx.policy()) {
            debug!(retry = self.base.retries, "Resending <Initiate ARC>");
            self.send_initiate(ctx);
            return Progress::Pending;
        }
        ctx.set_arc_established(false);
        Progress::Finished(ActionOutcome::TimedOut {
            retries: self.base.retries,
        })
    }
}
