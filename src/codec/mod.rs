//! CEC message codec
//!
//! Separates message semantics from transport:
//! - **Codec**: how a `CecMessage` maps to frame bytes (this module)
//! - **Transport**: how frame bytes flow (see `transport`)
//!
//! Frame layout: `[source << 4 | destination, opcode, operands...]` with at
//! most 14 operand bytes. Bit timing and line framing belong to the adapter
//! below us; one buffer handed to `decode` is exactly one frame.
//!
//! The codec is pure: `decode(&encode(m)) == Ok(m)` for every message that
//! satisfies its opcode's rules.

pub mod rules;

use crate::cec::{CecMessage, LogicalAddress, Opcode};
use crate::constants::{FRAME_OVERHEAD, MAX_FRAME_LEN};
use crate::error::{CecError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use rules::{rule_for, Addressing};

/// Encode a message into frame bytes
pub fn encode(message: &CecMessage) -> Bytes {
    let mut out = BytesMut::with_capacity(FRAME_OVERHEAD + message.operands().len());
    out.put_u8((message.source().value() << 4) | message.destination().value());
    out.put_u8(message.opcode().into());
    out.put_slice(message.operands());
    out.freeze()
}

/// Decode and validate one frame
pub fn decode(frame: &[u8]) -> Result<CecMessage> {
    if frame.len() < FRAME_OVERHEAD {
        return Err(CecError::MalformedMessage {
            opcode: None,
            reason: format!("frame too short: {} bytes", frame.len()),
        });
    }
    if frame.len() > MAX_FRAME_LEN {
        return Err(CecError::MalformedMessage {
            opcode: frame.get(1).copied(),
            reason: format!("frame too long: {} bytes (max {})", frame.len(), MAX_FRAME_LEN),
        });
    }

    let header = frame[0];
    let source = LogicalAddress::from_nibble(header >> 4);
    let destination = LogicalAddress::from_nibble(header);
    let raw_opcode = frame[1];
    let operands = &frame[FRAME_OVERHEAD..];

    let message = CecMessage::new(
        source,
        destination,
        Opcode::from(raw_opcode),
        Bytes::copy_from_slice(operands),
    );
    validate(&message)?;
    Ok(message)
}

/// Check a message against its opcode's rules
pub fn validate(message: &CecMessage) -> Result<()> {
    let raw_opcode = u8::from(message.opcode());
    let rule = rule_for(message.opcode());
    let count = message.operands().len();

    if count < rule.min_operands || count > rule.max_operands {
        let expected = if rule.min_operands == rule.max_operands {
            format!("{}", rule.min_operands)
        } else {
            format!("{}..={}", rule.min_operands, rule.max_operands)
        };
        return Err(CecError::malformed(
            raw_opcode,
            format!("expected {} operands, got {}", expected, count),
        ));
    }

    match (rule.addressing, message.is_broadcast()) {
        (Addressing::Directed, true) => {
            return Err(CecError::malformed(raw_opcode, "must not be broadcast"));
        }
        (Addressing::Broadcast, false) => {
            return Err(CecError::malformed(raw_opcode, "must be broadcast"));
        }
        _ => {}
    }

    if let Some(check) = rule.check {
        check(message.operands()).map_err(|reason| CecError::malformed(raw_opcode, reason))?;
    }

    Ok(())
}
