// Copyright (c) 2026 Hearthnet
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must never panic, and whatever decodes must
    // re-encode to something that decodes to the same sequence.
    if let Ok(tlvs) = hearthnet::core::tlv::decode_stream(data) {
        let bytes = hearthnet::core::tlv::encode_stream(&tlvs);
        let again = hearthnet::core::tlv::decode_stream(&bytes).expect("re-decode");
        assert_eq!(tlvs, again);
    }
});
