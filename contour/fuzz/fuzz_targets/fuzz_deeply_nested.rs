#![no_main]

use contour::System;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let depth = (data[0] as usize % 200) + 1;
    let expr = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    let chain = vec!["#n"; depth].join(" + ");

    let mut system = System::new();
    let _ = system.define(&format!("nested = {}", expr), 0);
    let _ = system.define(&format!("chain = {}", chain), 0);
    let _ = system.resolve("nested", &mut Default::default());
    let _ = system.resolve("chain", &mut Default::default());
});
