// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

mod common;

use libfuzzer_sys::fuzz_target;
use wirewalk::{Codec, Handle, HandleInfo, ObjectType, Rights, TransactionHeader};

fuzz_target!(|data: &[u8]| {
    let Some((&num_handles, body)) = data.split_first() else {
        return;
    };
    let (schema, ty) = common::fuzz_schema();
    let codec = Codec::new(&schema);

    let mut message = TransactionHeader::new(1).to_bytes().to_vec();
    message.extend_from_slice(body);
    let handles = (0..u32::from(num_handles % 8))
        .map(|raw| HandleInfo::new(Handle::from_raw(raw + 1), ObjectType::EVENT, Rights::WAIT))
        .collect();

    // Fuzz decode, then re-encode whatever decoded
    if let Ok((_, mut graph)) = codec.decode_message(ty, message, handles) {
        let reencoded = codec.encode_message(1, ty, &mut graph);
        if let Ok(reencoded) = reencoded {
            assert!(codec.validate(ty, reencoded.body(), reencoded.handles.len() as u32).is_ok());
        }
    }
});
