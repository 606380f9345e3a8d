// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

mod common;

use libfuzzer_sys::fuzz_target;
use wirewalk::Codec;

fuzz_target!(|data: &[u8]| {
    let Some((&num_handles, body)) = data.split_first() else {
        return;
    };
    let (schema, ty) = common::fuzz_schema();
    let codec = Codec::new(&schema);

    // Fuzz strict validation
    let validated = codec.validate(ty, body, u32::from(num_handles % 8));

    // Fuzz exhaustive diagnostics: same verdict, never panics
    let diagnostics = codec.diagnose(ty, body, u32::from(num_handles % 8));
    assert_eq!(validated.is_ok(), diagnostics.is_empty());
});
