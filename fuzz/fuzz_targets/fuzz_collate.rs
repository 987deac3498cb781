//! Fuzz target: raw bytes into the session cache
//!
//! Drives the full stack (parser, builder, collator, cache) with random
//! data. We don't care about the result, only that nothing panics and
//! that per-key state stays independent.

#![no_main]

use h1_collator::SessionCache;
use h1parse::Mode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let cache: SessionCache<u32> = SessionCache::new(Mode::Auto);

    let _ = cache.parse(1, data);
    let _ = cache.finish(&1);

    // Incremental feed on a second key
    if data.len() > 10 {
        let mid = data.len() / 2;
        let _ = cache.parse(2, &data[..mid]);
        let _ = cache.parse(2, &data[mid..]);
        let _ = cache.finish(&2);
    }

    // Same data on several keys must not interfere
    let _ = cache.parse(3, data);
    let _ = cache.parse(4, data);
    let _ = cache.remove(&3);
});
