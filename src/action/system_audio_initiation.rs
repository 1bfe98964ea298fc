//! System Audio Mode initiation from the audio system
//!
//! Two phases:
//! 1. Active source unknown: broadcast `<Request Active Source>` and wait
//!    for `<Active Source>` (retried, then skipped).
//! 2. Send `<Set System Audio Mode>[on]` to the TV. A `<Feature Abort>` for
//!    it means the TV does not support the feature; silence until the
//!    timeout means it does, and the mode is turned on for the whole bus.

use super::{ActionBase, ActionContext, ActionOutcome, Progress, Response};
use crate::cec::{ActiveSource, CecMessage, LogicalAddress, Opcode};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    WaitingForActiveSource,
    WaitingForTvSupport,
}

#[derive(Debug, Clone)]
pub struct SystemAudioInitiation {
    pub(super) base: ActionBase,
    phase: Phase,
}

impl SystemAudioInitiation {
    pub fn new(tv: LogicalAddress) -> Self {
        Self {
            base: ActionBase::new(tv),
            phase: Phase::WaitingForActiveSource,
        }
    }

    pub(super) fn start(&mut self, ctx: &mut dyn ActionContext) -> Progress {
        if ctx.active_source().is_known() {
            self.query_tv_support(ctx);
        } else {
            self.request_active_source(ctx);
        }
        Progress::Pending
    }

    fn request_active_source(&mut self, ctx: &mut dyn ActionContext) {
        self.phase = Phase::WaitingForActiveSource;
        ctx.send(CecMessage::request_active_source(ctx.local_address()));
        self.base.arm(ctx);
    }

    fn query_tv_support(&mut self, ctx: &mut dyn ActionContext) {
        self.phase = Phase::WaitingForTvSupport;
        self.base.retries = 0;
        ctx.send(CecMessage::set_system_audio_mode(
            ctx.local_address(),
            self.base.target,
            true,
        ));
        self.base.arm(ctx);
    }

    pub(super) fn process_message(
        &mut self,
        message: &CecMessage,
        ctx: &mut dyn ActionContext,
    ) -> Response {
        match (self.phase, message.opcode()) {
            (Phase::WaitingForActiveSource, Opcode::ActiveSource) => {
                let Some(physical) = message.physical_address_operand() else {
                    return Response::Ignored;
                };
                ctx.set_active_source(ActiveSource::new(message.source(), physical));
                self.query_tv_support(ctx);
                Response::Consumed
            }
            (Phase::WaitingForTvSupport, Opcode::FeatureAbort)
                if self.base.is_from_target(message)
                    && message.aborted_opcode() == Some(Opcode::SetSystemAudioMode) =>
            {
                self.base.disarm(ctx);
                info!("TV does not support System Audio Mode");
                ctx.set_system_audio_mode(false);
                Response::Finished(ActionOutcome::Refused)
            }
            _ => Response::Ignored,
        }
    }

    pub(super) fn on_timeout(&mut self, ctx: &mut dyn ActionContext) -> Progress {
        match self.phase {
            Phase::WaitingForActiveSource => {
                if self.base.try_retry(ctx.policy()) {
                    debug!(retry = self.base.retries, "Resending <Request Active Source>");
                    self.request_active_source(ctx);
                } else {
                    debug!("No active source on the bus, continuing without one");
                    ctx.set_active_source(ActiveSource::NONE);
                    self.query_tv_support(ctx);
                }
                Progress::Pending
            }
            Phase::WaitingForTvSupport => {
                ctx.send(CecMessage::set_system_audio_mode(
                    ctx.local_address(),
                    LogicalAddress::BROADCAST,
                    true,
                ));
                ctx.set_system_audio_mode(true);
                Progress::Finished(ActionOutcome::Succeeded)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cec::{FeatureAbortReason, PhysicalAddress};
    use crate::action::testing::FakeContext;

    const TV: LogicalAddress = LogicalAddress::TV;
    const AUDIO: LogicalAddress = LogicalAddress::AUDIO_SYSTEM;
    const PLAYER: LogicalAddress = LogicalAddress::PLAYBACK_1;

    fn known_source() -> ActiveSource {
        ActiveSource::new(PLAYER, PhysicalAddress::new(0x2000))
    }

    #[test]
    fn test_unknown_source_requests_active_source() {
        let mut ctx = FakeContext::new();
        let mut action = SystemAudioInitiation::new(TV);

        assert_eq!(action.start(&mut ctx), Progress::Pending);
        assert_eq!(ctx.sent, vec![CecMessage::request_active_source(AUDIO)]);
        assert_eq!(action.phase, Phase::WaitingForActiveSource);
    }

    #[test]
    fn test_known_source_goes_straight_to_tv() {
        let mut ctx = FakeContext::new();
        ctx.active_source = known_source();
        let mut action = SystemAudioInitiation::new(TV);

        action.start(&mut ctx);
        assert_eq!(ctx.sent, vec![CecMessage::set_system_audio_mode(AUDIO, TV, true)]);
        assert_eq!(action.phase, Phase::WaitingForTvSupport);
    }

    #[test]
    fn test_active_source_reply_updates_state() {
        let mut ctx = FakeContext::new();
        let mut action = SystemAudioInitiation::new(TV);
        action.start(&mut ctx);

        let reply = CecMessage::active_source(PLAYER, PhysicalAddress::new(0x2000));
        assert_eq!(action.process_message(&reply, &mut ctx), Response::Consumed);
        assert_eq!(ctx.active_source, known_source());
        assert_eq!(
            ctx.last_sent(),
            Some(&CecMessage::set_system_audio_mode(AUDIO, TV, true))
        );
        // First timer was replaced
        assert_eq!(ctx.cancelled, vec![ctx.armed[0]]);
    }

    #[test]
    fn test_silent_tv_enables_mode() {
        let mut ctx = FakeContext::new();
        ctx.active_source = known_source();
        let mut action = SystemAudioInitiation::new(TV);
        action.start(&mut ctx);

        assert_eq!(
            action.on_timeout(&mut ctx),
            Progress::Finished(ActionOutcome::Succeeded)
        );
        assert_eq!(
            ctx.last_sent(),
            Some(&CecMessage::set_system_audio_mode(AUDIO, LogicalAddress::BROADCAST, true))
        );
        assert_eq!(ctx.system_audio_mode, Some(true));
    }

    #[test]
    fn test_feature_abort_from_tv_fails() {
        let mut ctx = FakeContext::new();
        ctx.active_source = known_source();
        let mut action = SystemAudioInitiation::new(TV);
        action.start(&mut ctx);

        let abort = CecMessage::feature_abort(
            TV,
            AUDIO,
            Opcode::SetSystemAudioMode,
            FeatureAbortReason::UnrecognizedOpcode,
        );
        assert_eq!(
            action.process_message(&abort, &mut ctx),
            Response::Finished(ActionOutcome::Refused)
        );
        assert_eq!(ctx.system_audio_mode, Some(false));
    }

    #[test]
    fn test_abort_from_other_device_is_ignored() {
        let mut ctx = FakeContext::new();
        ctx.active_source = known_source();
        let mut action = SystemAudioInitiation::new(TV);
        action.start(&mut ctx);

        let abort = CecMessage::feature_abort(
            PLAYER,
            AUDIO,
            Opcode::SetSystemAudioMode,
            FeatureAbortReason::Refused,
        );
        assert_eq!(action.process_message(&abort, &mut ctx), Response::Ignored);
        assert_eq!(ctx.system_audio_mode, None);
    }

    #[test]
    fn test_no_active_source_after_retries_continues() {
        let mut ctx = FakeContext::new();
        let mut action = SystemAudioInitiation::new(TV);
        action.start(&mut ctx);

        assert_eq!(action.on_timeout(&mut ctx), Progress::Pending);
        assert_eq!(action.on_timeout(&mut ctx), Progress::Pending);
        assert_eq!(action.phase, Phase::WaitingForActiveSource);
        assert_eq!(action.on_timeout(&mut ctx), Progress::Pending);
        assert_eq!(action.phase, Phase::WaitingForTvSupport);

        let requests = ctx
            .sent
            .iter()
            .filter(|m| m.opcode() == Opcode::RequestActiveSource)
            .count();
        assert_eq!(requests, 3);
        assert_eq!(ctx.active_source, ActiveSource::NONE);
        assert_eq!(
            ctx.last_sent(),
            Some(&CecMessage::set_system_audio_mode(AUDIO, TV, true))
        );
    }
}
