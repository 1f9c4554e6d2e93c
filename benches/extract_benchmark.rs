//! Benchmarks for expdf extraction performance.
//!
//! Run with: cargo bench
//!
//! These benchmarks run complete operations over synthetic documents.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lopdf::{dictionary, Document, Object, Stream};

use expdf::{process_bytes, ExtractConfig, ImageEncoding};

/// Creates a PDF where every page shows a line of text and paints one
/// 64x64 RGB image.
fn create_test_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let pixels: Vec<u8> = (0..64 * 64)
        .flat_map(|i| [(i % 256) as u8, (i / 16 % 256) as u8, 128])
        .collect();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(64),
            "Height" => Object::Integer(64),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => Object::Integer(8),
        },
        pixels,
    ));

    let mut kids = Vec::with_capacity(page_count);
    for i in 0..page_count {
        let content = format!(
            "BT /F1 12 Tf 72 700 Td (Page {} - Benchmark test content for region extraction.) Tj ET\n\
             q 128 0 0 128 72 400 cm /Im1 Do Q",
            i + 1
        );
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
                "XObject" => dictionary! { "Im1" => Object::Reference(image_id) },
            },
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save synthetic PDF");
    buf
}

/// Benchmark header rejection of non-PDF input.
fn bench_reject_non_pdf(c: &mut Criterion) {
    let data = b"Not a PDF file at all, just random text content".to_vec();
    let config = ExtractConfig::text();

    c.bench_function("reject_non_pdf", |b| {
        b.iter(|| process_bytes("notes.txt", black_box(data.clone()), &config).is_committed());
    });
}

/// Benchmark region text extraction at various sizes.
fn bench_text_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_extraction");
    let config = ExtractConfig::text();

    for page_count in [1, 5, 10].iter() {
        let data = create_test_pdf(*page_count);

        group.bench_function(format!("{}_pages", page_count), |b| {
            b.iter(|| process_bytes("bench.pdf", black_box(data.clone()), &config));
        });
    }

    group.finish();
}

/// Benchmark image extraction with both output encodings.
fn bench_image_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("image_extraction");
    let data = create_test_pdf(5);

    for encoding in [ImageEncoding::Tiff, ImageEncoding::Png] {
        let config = ExtractConfig::images()
            .with_image_encoding(encoding)
            .with_image_location(true);

        group.bench_function(encoding.extension(), |b| {
            b.iter(|| process_bytes("bench.pdf", black_box(data.clone()), &config));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_reject_non_pdf,
    bench_text_extraction,
    bench_image_extraction,
);
criterion_main!(benches);
