// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Victim-frame selection for the page-replacement policies.
//!
//! Callers invoke [`choose_victim`] only when every frame is occupied. Each
//! policy resolves ties down to the physical frame number, so eviction is
//! fully deterministic.

use crate::memory::Frame;
use schedsim_config::ReplacementPolicy;

/// Selects the frame to evict under `policy`.
///
/// `hand` is the persistent clock pointer; policies other than CLOCK leave
/// it untouched. OPT never reaches this function: it is rejected at the
/// configuration boundary because the live simulator has no future
/// reference string.
pub(crate) fn choose_victim(
    policy: ReplacementPolicy,
    frames: &mut [Frame],
    hand: &mut usize,
) -> usize {
    match policy {
        ReplacementPolicy::Fifo => min_frame_by(frames, |f| (f.loaded_at, 0)),
        ReplacementPolicy::Lru => min_frame_by(frames, |f| (f.last_used, 0)),
        ReplacementPolicy::Lfu => min_frame_by(frames, |f| (f.frequency, f.last_used)),
        ReplacementPolicy::Clock => {
            loop {
                let idx = *hand % frames.len();
                *hand = (idx + 1) % frames.len();
                if frames[idx].referenced {
                    frames[idx].referenced = false;
                } else {
                    return idx;
                }
            }
        }
        ReplacementPolicy::Opt => unreachable!("OPT is rejected at the configuration boundary"),
    }
}

fn min_frame_by(frames: &[Frame], key: impl Fn(&Frame) -> (u64, u64)) -> usize {
    frames
        .iter()
        .enumerate()
        .min_by_key(|(idx, f)| {
            let (a, b) = key(f);
            (a, b, *idx)
        })
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}
