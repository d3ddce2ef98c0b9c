// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies
//
// VideoIO Channel Lifecycle Tests
//
// TESTING LAYERS:
//
// Layer 1 (Simulated driver - No hardware required):
//   - test_random_open_close_sequences: at most one live channel per id,
//     format follows the last successful open
//   - test_input_mode_is_negotiated: requested mode is ignored for inputs
//   - test_negotiation_failure_leaves_channel_closed
//   - test_channels_are_independent_per_device
//   - test_capture_cycle_checked_against_latency
//
// RUN:
//   cargo test --test channel_lifecycle

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use videoio::mock::{MockCard, MockDriver};
use videoio::{
    ChannelId, ChannelState, Config, CycleConfig, DeviceRegistry, Error, VideoMode,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn simulated() -> Arc<MockDriver> {
    Arc::new(
        MockDriver::new()
            .with_card(
                MockCard::new("SN-A", "Sim 8x8")
                    .with_input(ChannelId::Input1, VideoMode::Hd1080i5994)
                    .with_recommended(ChannelId::Input2, VideoMode::Hd720p50),
            )
            .with_card(MockCard::new("SN-B", "Sim 4x4")),
    )
}

#[test]
fn test_random_open_close_sequences() {
    init_logging();
    let mock = simulated();
    let registry = DeviceRegistry::new(mock.clone());
    let device = registry.get("SN-A").unwrap();
    let baseline = mock.open_sessions();

    let outputs = [ChannelId::Output1, ChannelId::Output2];
    let modes = [
        VideoMode::Hd720p50,
        VideoMode::Hd1080i50,
        VideoMode::Hd1080p5994,
        VideoMode::Uhd2160p2398,
    ];

    for seed in 0..8u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut expected: [Option<VideoMode>; 2] = [None, None];

        for _ in 0..200 {
            let which = rng.random_range(0..outputs.len());
            let channel = outputs[which];
            if rng.random_bool(0.6) {
                let mode = modes[rng.random_range(0..modes.len())];
                device.open_channel(channel, Some(mode)).unwrap();
                expected[which] = Some(mode);
            } else {
                device.close_channel(channel);
                expected[which] = None;
            }

            let live = expected.iter().filter(|m| m.is_some()).count();
            assert_eq!(mock.open_sessions(), baseline + live);
            for (i, ch) in outputs.iter().enumerate() {
                match expected[i] {
                    Some(mode) => {
                        assert_eq!(device.channel_state(*ch), ChannelState::Open);
                        assert_eq!(device.channel_format(*ch).unwrap().mode, mode);
                    }
                    None => assert_eq!(device.channel_state(*ch), ChannelState::Closed),
                }
            }
        }

        for ch in outputs {
            device.close_channel(ch);
        }
    }
    assert_eq!(mock.open_sessions(), baseline);
}

#[test]
fn test_input_mode_is_negotiated() {
    init_logging();
    let registry = DeviceRegistry::new(simulated());
    let device = registry.get("SN-A").unwrap();

    device
        .open_channel(ChannelId::Input1, Some(VideoMode::Hd720p50))
        .unwrap();
    let format = device.channel_format(ChannelId::Input1).unwrap();
    assert_eq!(format.mode, VideoMode::Hd1080i5994);
    assert_eq!(
        (format.frame_rate.dividend, format.frame_rate.divisor),
        (30000, 1001)
    );

    // no signal detected, the recommendation is used instead
    device.open_channel(ChannelId::Input2, None).unwrap();
    assert_eq!(
        device.channel_format(ChannelId::Input2).unwrap().mode,
        VideoMode::Hd720p50
    );
}

#[test]
fn test_negotiation_failure_leaves_channel_closed() {
    init_logging();
    let mock = simulated();
    let registry = DeviceRegistry::new(mock.clone());
    let device = registry.get("SN-A").unwrap();

    match device.open_channel(ChannelId::Input3, None) {
        Err(Error::NegotiationFailed { channel, .. }) => assert_eq!(channel, ChannelId::Input3),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(device.channel_state(ChannelId::Input3), ChannelState::Closed);

    // a failed reopen also removes the channel that was open before
    device.open_channel(ChannelId::Input1, None).unwrap();
    mock.fail_validate(true);
    assert!(device.open_channel(ChannelId::Input1, None).is_err());
    assert_eq!(device.channel_state(ChannelId::Input1), ChannelState::Closed);
    assert!(matches!(
        device.wait_vbi(ChannelId::Input1),
        Err(Error::ChannelNotOpen(ChannelId::Input1))
    ));

    // not retried on its own; the next explicit open succeeds
    mock.fail_validate(false);
    device.open_channel(ChannelId::Input1, None).unwrap();
    assert_eq!(device.channel_state(ChannelId::Input1), ChannelState::Open);
}

#[test]
fn test_channels_are_independent_per_device() {
    init_logging();
    let registry = DeviceRegistry::new(simulated());
    let a = registry.get("SN-A").unwrap();
    let b = registry.get("SN-B").unwrap();

    a.open_channel(ChannelId::Output1, Some(VideoMode::Hd1080p25))
        .unwrap();
    b.open_channel(ChannelId::Output1, Some(VideoMode::Hd720p5994))
        .unwrap();
    a.close_channel(ChannelId::Output1);

    assert_eq!(a.channel_state(ChannelId::Output1), ChannelState::Closed);
    assert_eq!(
        b.channel_format(ChannelId::Output1).unwrap().mode,
        VideoMode::Hd720p5994
    );
}

#[test]
fn test_capture_cycle_checked_against_latency() {
    init_logging();
    let mock = Arc::new(
        MockDriver::new().with_card(
            MockCard::new("SN-C", "Slow capture")
                .with_input(ChannelId::Input1, VideoMode::Hd1080p50)
                .with_capture_latency(4),
        ),
    );

    // two frames of pipeline do not cover four progressive fields
    let registry = DeviceRegistry::new(mock.clone());
    let device = registry.get("SN-C").unwrap();
    assert!(matches!(
        device.open_channel(ChannelId::Input1, None),
        Err(Error::InvalidCycle(_))
    ));

    let config = Config::default().with_input_cycle(CycleConfig::new(8, 4));
    let registry = DeviceRegistry::with_config(mock, config);
    let device = registry.get("SN-C").unwrap();
    device.open_channel(ChannelId::Input1, None).unwrap();
    assert_eq!(
        device.cycle_config(ChannelId::Input1).unwrap(),
        CycleConfig::new(8, 4)
    );
}
