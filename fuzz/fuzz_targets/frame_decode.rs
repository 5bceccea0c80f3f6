#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use mt5_webapi::core::codec::FrameCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as an inbound stream: no panics, no infinite loops
    let mut buf = BytesMut::from(data);
    let mut codec = FrameCodec;
    while let Ok(Some(frame)) = codec.decode(&mut buf) {
        assert_eq!(frame.body.len(), frame.header.body_size as usize);
    }
    let _ = codec.decode_eof(&mut buf);
});
