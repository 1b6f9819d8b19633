//! Throughput benchmarks for the decode-side of the crate. There's no
//! encoder to generate compressed corpora from, so each case builds a
//! literal-only bitstream (every byte stored as a literal, no
//! back-references) large enough to make the per-bit reader cost, not
//! the allocation, dominate.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use au3x::decompress::{Decompressor, EaLzDecompressor};

/// Packs `payload` into an `EA06`/`EA05`-shaped stream where every byte
/// is emitted as a literal: a 1-bit choice flag followed by the 8 data
/// bits, MSB-first, matching `BitReader`'s 16-bit-word refill.
fn literal_bitstream(signature: &[u8; 4], literal_bit: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len() * 2);
    out.extend_from_slice(signature);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());

    let mut cur = 0u8;
    let mut nbits = 0u8;
    let mut push_bit = |bit: u32, out: &mut Vec<u8>| {
        cur = (cur << 1) | (bit as u8 & 1);
        nbits += 1;
        if nbits == 8 {
            out.push(cur);
            cur = 0;
            nbits = 0;
        }
    };
    for &byte in payload {
        push_bit(literal_bit, &mut out);
        for i in (0..8).rev() {
            push_bit(((byte >> i) & 1) as u32, &mut out);
        }
    }
    if nbits > 0 {
        cur <<= 8 - nbits;
        out.push(cur);
    }
    out.extend_from_slice(&[0u8; 4]); // slack so the reader's final 16-bit refill never runs past the end

    out
}

fn bench_ea_lz(c: &mut Criterion) {
    let mut group = c.benchmark_group("ea_lz_decompress_literal_only");
    for size in [4 * 1024usize, 64 * 1024, 512 * 1024] {
        let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();

        group.bench_with_input(BenchmarkId::new("ea06", size), &payload, |b, payload| {
            let stream = literal_bitstream(b"EA06", 1, payload);
            b.iter(|| {
                let mut d = EaLzDecompressor::new_ea06(black_box(stream.clone()), payload.len() as u32);
                black_box(d.decompress().unwrap())
            });
        });

        group.bench_with_input(BenchmarkId::new("ea05", size), &payload, |b, payload| {
            let stream = literal_bitstream(b"EA05", 0, payload);
            b.iter(|| {
                let mut d = EaLzDecompressor::new_ea05(black_box(stream.clone()), payload.len() as u32);
                black_box(d.decompress().unwrap())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ea_lz);
criterion_main!(benches);
