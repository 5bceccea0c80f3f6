use bytes::BytesMut;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use mt5_webapi::core::codec::{encode_frame, Frame, FrameCodec};
use mt5_webapi::core::text;
use mt5_webapi::protocol::consts::{Param, RequestParams};
use mt5_webapi::utils::crypto::hash_password;
use tokio_util::codec::{Decoder, Encoder};

#[allow(clippy::unwrap_used)]
fn bench_frame_encode_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode_decode");
    let payload_sizes = [64usize, 512, 4096, 32_000];

    for &size in &payload_sizes {
        let params = RequestParams::new()
            .with(Param::Login, "100")
            .with(Param::BodyText, "x".repeat(size / 2));
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("encode_{size}b"), |b| {
            b.iter(|| encode_frame("SYMBOL_ADD", &params, 42, false).unwrap())
        });

        let body = text::to_wire(&"x".repeat(size / 2));
        group.bench_function(format!("decode_{size}b"), |b| {
            b.iter_batched(
                || {
                    let mut buf = BytesMut::new();
                    // three fragments of one answer
                    for flag in [1, 1, 0] {
                        let frame = Frame::new(42, body.clone(), false).unwrap().with_flag(flag);
                        FrameCodec.encode(frame, &mut buf).unwrap();
                    }
                    buf
                },
                |mut buf| {
                    let mut codec = FrameCodec;
                    while let Some(frame) = codec.decode(&mut buf).unwrap() {
                        if frame.header.is_final() {
                            break;
                        }
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_password_hash(c: &mut Criterion) {
    let challenge = "aabbccddeeff00112233445566778899";
    c.bench_function("hash_password", |b| {
        b.iter(|| hash_password("Manager1", challenge).unwrap())
    });
}

criterion_group!(benches, bench_frame_encode_decode, bench_password_hash);
criterion_main!(benches);
