// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::time::Duration;

use flare::sheet::{BottomSheetController, SheetBounds};
use flare::store::decode_snapshot;

#[derive(Arbitrary, Debug)]
enum Gesture {
    Start,
    Update(f64),
    End,
}

#[derive(Arbitrary, Debug)]
struct Input {
    snapshot: String,
    min: f64,
    max: f64,
    gestures: Vec<Gesture>,
}

fuzz_target!(|input: Input| {
    // Never panics, whatever the bytes
    let _ = decode_snapshot(&input.snapshot);

    let Ok(bounds) = SheetBounds::new(input.min, input.max) else {
        return;
    };
    let mut sheet = BottomSheetController::new(bounds, Duration::from_millis(300));
    for gesture in input.gestures {
        match gesture {
            Gesture::Start => sheet.on_drag_start(),
            Gesture::Update(delta) => sheet.on_drag_update(delta),
            Gesture::End => {
                sheet.on_drag_end();
            }
        }
        let offset = sheet.offset();
        assert!(offset >= bounds.min() && offset <= bounds.max());
    }
});
