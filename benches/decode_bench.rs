use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pcktool::byte_stream::ByteStream;
use pcktool::header::PckHeader;
use pcktool::index::layout;
use pcktool::io_stream::{PckReader, PckWriter};
use pcktool::variant::{decode_value, TYPE_ARRAY, TYPE_DICTIONARY, TYPE_INT, TYPE_POOL_REAL, TYPE_STRING};
use std::io::Cursor;

fn tagged(tag: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = tag.to_le_bytes().to_vec();
    out.extend_from_slice(payload);
    out
}

/// Array of 1000 small dictionaries `{ "id": i }`.
fn nested_array() -> Vec<u8> {
    let mut out = tagged(TYPE_ARRAY, &1000u32.to_le_bytes());
    for i in 0..1000i32 {
        out.extend(tagged(TYPE_DICTIONARY, &1u32.to_le_bytes()));
        out.extend(tagged(TYPE_STRING, &[&2i32.to_le_bytes()[..], &b"id"[..]].concat()));
        out.extend(tagged(TYPE_INT, &i.to_le_bytes()));
    }
    out
}

fn pool_real(count: usize) -> Vec<u8> {
    let mut out = tagged(TYPE_POOL_REAL, &(count as i32).to_le_bytes());
    for i in 0..count {
        out.extend((i as f32).to_le_bytes());
    }
    out
}

fn bench_decode(c: &mut Criterion) {
    let nested = nested_array();
    let pool = pool_real(256 * 1024);

    c.bench_function("decode_nested_array_1000", |b| {
        b.iter(|| decode_value(&mut ByteStream::new(Cursor::new(black_box(&nested[..]))).unwrap()).unwrap())
    });
    c.bench_function("decode_pool_real_1mb", |b| {
        b.iter(|| decode_value(&mut ByteStream::new(Cursor::new(black_box(&pool[..]))).unwrap()).unwrap())
    });
}

fn bench_pack_and_parse(c: &mut Criterion) {
    let files: Vec<(String, Vec<u8>)> = (0..64)
        .map(|i| (format!("res://assets/file_{i:02}.bin"), vec![i as u8; 16 * 1024 + i]))
        .collect();
    let plan = layout(files.iter().map(|(p, d)| (p.as_str(), d.len() as u64)), true);

    let pack = || {
        let mut writer = PckWriter::new(Cursor::new(Vec::new()), PckHeader::default()).unwrap();
        writer.write_pack(&plan, |i, _| Ok(&files[i].1[..])).unwrap();
        writer.into_inner().into_inner()
    };
    let packed = pack();

    c.bench_function("pack_64_files_1mb", |b| b.iter(|| black_box(pack())));
    c.bench_function("parse_and_verify_64_files_1mb", |b| {
        b.iter(|| PckReader::new(Cursor::new(black_box(&packed[..]))).unwrap().entries.len())
    });
}

criterion_group!(benches, bench_decode, bench_pack_and_parse);
criterion_main!(benches);
