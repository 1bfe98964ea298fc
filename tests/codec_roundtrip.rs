//! Property tests for the frame codec

use cec_audio::cec::{CecMessage, LogicalAddress, PhysicalAddress, PowerStatus, UiCommand};
use cec_audio::codec;
use proptest::prelude::*;

fn directed() -> impl Strategy<Value = LogicalAddress> {
    (0u8..=14).prop_map(|v| LogicalAddress::new(v).unwrap())
}

fn physical() -> impl Strategy<Value = PhysicalAddress> {
    (0u16..0xFFFF).prop_map(PhysicalAddress::new)
}

/// Well-formed messages the device sends or receives
fn message() -> impl Strategy<Value = CecMessage> {
    prop_oneof![
        (directed(), directed(), 0u8..=100, any::<bool>())
            .prop_map(|(s, d, v, m)| CecMessage::report_audio_status(s, d, v, m)),
        (directed(), directed(), any::<bool>())
            .prop_map(|(s, d, on)| CecMessage::set_system_audio_mode(s, d, on)),
        (directed(), directed(), proptest::option::of(physical()))
            .prop_map(|(s, d, a)| CecMessage::system_audio_mode_request(s, d, a)),
        (directed(), physical()).prop_map(|(s, a)| CecMessage::active_source(s, a)),
        (directed(), physical(), 0u8..=7)
            .prop_map(|(s, a, t)| CecMessage::report_physical_address(s, a, t)),
        (directed(), directed(), "[a-zA-Z0-9 ]{1,14}")
            .prop_map(|(s, d, n)| CecMessage::set_osd_name(s, d, &n)),
        (directed(), 0u32..=0x00FF_FFFF).prop_map(|(s, id)| CecMessage::device_vendor_id(s, id)),
        (directed(), directed(), prop_oneof![
            Just(UiCommand::VolumeUp),
            Just(UiCommand::VolumeDown),
            Just(UiCommand::Mute),
        ])
        .prop_map(|(s, d, c)| CecMessage::user_control_pressed(s, d, c)),
        (directed(), directed(), prop_oneof![
            Just(PowerStatus::On),
            Just(PowerStatus::Standby),
        ])
        .prop_map(|(s, d, p)| CecMessage::report_power_status(s, d, p)),
        (directed(), directed()).prop_map(|(s, d)| CecMessage::initiate_arc(s, d)),
    ]
}

proptest! {
    #[test]
    fn prop_decode_inverts_encode(msg in message()) {
        let frame = codec::encode(&msg);
        prop_assert_eq!(codec::decode(&frame).unwrap(), msg);
    }

    #[test]
    fn prop_decode_arbitrary_bytes(frame in proptest::collection::vec(any::<u8>(), 0..20)) {
        // Never panics; anything accepted encodes back to the same bytes
        if let Ok(msg) = codec::decode(&frame) {
            prop_assert_eq!(codec::encode(&msg).to_vec(), frame);
        }
    }
}
