use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use tob::{decode_fp2, Decoder};

/// A synthetic TOB3 file: two columns (IEEE4B, FP2), 10 records per 76-byte
/// frame.
fn synthetic_file(frames: usize) -> Vec<u8> {
    let mut dat = Vec::new();
    dat.extend_from_slice(
        b"\"TOB3\",\"Station\",\"CR1000X\",\"1\",\"os\",\"CPU:bench.CR1X\",\"1\",\"2021-06-18 17:00:00\"\r\n",
    );
    dat.extend_from_slice(b"\"Bench\",\"30 SEC\",\"76\",\"1000\",\"43981\",\"SecMsec\"\r\n");
    dat.extend_from_slice(b"\"Temp\",\"RH\"\r\n\"C\",\"%\"\r\n\"Avg\",\"Smp\"\r\n\"IEEE4B\",\"FP2\"\r\n");
    for frame in 0..frames {
        dat.extend_from_slice(&(300 * frame as u32).to_le_bytes());
        dat.extend_from_slice(&0u32.to_le_bytes());
        dat.extend_from_slice(&((frame * 10) as u32).to_le_bytes());
        for record in 0..10u16 {
            dat.extend_from_slice(&(f32::from(record) * 0.5).to_be_bytes());
            dat.extend_from_slice(&(0x2000 | record).to_be_bytes());
        }
        dat.extend_from_slice(&(43981u32 << 16).to_le_bytes());
    }
    dat
}

fn bench_decode_frames(c: &mut Criterion) {
    let dat = synthetic_file(1000);
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(dat.len() as u64));
    group.bench_function("tob3_1000_frames", |b| {
        b.iter(|| {
            let table = Decoder::new().decode(Cursor::new(&dat)).unwrap();
            assert_eq!(table.num_records(), 10_000);
        });
    });
    group.finish();
}

fn bench_fp2(c: &mut Criterion) {
    let mut group = c.benchmark_group("fp2");
    group.throughput(Throughput::Elements(u64::from(u16::MAX) + 1));
    group.bench_function("all_inputs", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for raw in 0..=u16::MAX {
                sum += decode_fp2(raw);
            }
            sum
        });
    });
    group.finish();
}

criterion_group!(benches, bench_decode_frames, bench_fp2);
criterion_main!(benches);
