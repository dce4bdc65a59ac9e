#![no_main]

use contour::{Context, System, Value};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let mut system = System::new();
        let _ = system.define("base @ [n <- 0] = 1", 0);
        let _ = system.define(&format!("fuzz = {}", s), 0);

        let n = system.dim("n");
        let kappa = Context::new().with(n, Value::number(3));
        let _ = system.resolve("fuzz", &mut kappa.clone());
        let _ = system.fulfil("fuzz", &kappa);
    }
});
