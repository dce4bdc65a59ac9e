#![no_main]

use contour::System;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let mut system = System::new();
        for (time, line) in s.lines().enumerate() {
            let _ = system.define(line, time as i64);
        }
    }
});
