//! End-to-end region text extraction.

mod common;

use common::{show, PdfBuilder};
use expdf::{
    extract_bytes, process_bytes, CaptureRegion, ExtractConfig, ExtractedItem, PageSelection,
};

fn page_texts(data: &[u8], config: &ExtractConfig) -> Vec<(u32, String)> {
    extract_bytes(data, config)
        .unwrap()
        .into_iter()
        .map(|item| match item {
            ExtractedItem::Text(text) => (text.page, text.text),
            other => panic!("unexpected item {:?}", other),
        })
        .collect()
}

#[test]
fn test_words_and_lines() {
    let content = format!("{}{}", show("Hello World", 72.0, 700.0), show("Second", 72.0, 686.0));
    let data = PdfBuilder::new().page(&content, &[]).build();

    let texts = page_texts(&data, &ExtractConfig::text());
    assert_eq!(texts, vec![(1, "Hello World\nSecond\n".to_string())]);
}

#[test]
fn test_text_outside_default_region_is_dropped() {
    // Baseline at y=100 is 692pt from the top of a Letter page.
    let content = format!("{}{}", show("Header", 72.0, 700.0), show("Footer", 72.0, 100.0));
    let data = PdfBuilder::new().page(&content, &[]).build();

    let texts = page_texts(&data, &ExtractConfig::text());
    assert_eq!(texts[0].1, "Header\n");
}

#[test]
fn test_custom_capture_region() {
    let content = format!("{}{}", show("Header", 72.0, 700.0), show("Footer", 72.0, 100.0));
    let data = PdfBuilder::new().page(&content, &[]).build();

    let config = ExtractConfig::text().with_capture_region(CaptureRegion::new(0.0, 600.0, 612.0, 192.0));
    let texts = page_texts(&data, &config);
    assert_eq!(texts[0].1, "Footer\n");
}

#[test]
fn test_one_unit_per_page_even_when_empty() {
    let data = PdfBuilder::new()
        .page(&show("First", 72.0, 700.0), &[])
        .page("", &[])
        .page(&show("Third", 72.0, 700.0), &[])
        .build();

    let outcome = process_bytes("doc.pdf", data, &ExtractConfig::text());
    let units = outcome.units();
    assert_eq!(units.len(), 3);

    let payloads: Vec<&[u8]> = units.iter().map(|u| u.payload.as_slice()).collect();
    assert_eq!(payloads, vec![b"First\n".as_slice(), b"".as_slice(), b"Third\n".as_slice()]);

    for (i, unit) in units.iter().enumerate() {
        assert_eq!(unit.mime_type, "text/plain");
        assert_eq!(unit.page(), Some(i as u32 + 1));
        assert_eq!(unit.image(), None);
    }
}

#[test]
fn test_text_page_selection() {
    let mut pdf = PdfBuilder::new();
    for word in ["one", "two", "three"] {
        pdf.page(&show(word, 72.0, 700.0), &[]);
    }
    let data = pdf.build();

    let config = ExtractConfig::text().with_pages(PageSelection::parse("2-3").unwrap());
    let texts = page_texts(&data, &config);
    assert_eq!(
        texts,
        vec![(2, "two\n".to_string()), (3, "three\n".to_string())]
    );
}

#[test]
fn test_text_painted_by_form() {
    let mut pdf = PdfBuilder::new();
    let form = pdf.form(&show("Boxed", 72.0, 700.0), &[]);
    let data = pdf.page("/Fm1 Do", &[("Fm1", form)]).build();

    let texts = page_texts(&data, &ExtractConfig::text());
    assert_eq!(texts[0].1, "Boxed\n");
}

#[test]
fn test_self_painting_form_is_painted_once() {
    let mut pdf = PdfBuilder::new();
    let content = format!("{}/Fm0 Do /Fm0 Do\n", show("Loop", 72.0, 700.0));
    let form = pdf.self_painting_form(&content);
    let data = pdf.page("/Fm0 Do", &[("Fm0", form)]).build();

    let texts = page_texts(&data, &ExtractConfig::text());
    assert_eq!(texts[0].1, "Loop\n");
}

#[test]
fn test_text_mode_ignores_images() {
    let mut pdf = PdfBuilder::new();
    let im = pdf.jbig2_image();
    let data = pdf.page(&show("Caption", 72.0, 700.0), &[("Im1", im)]).build();

    let texts = page_texts(&data, &ExtractConfig::text());
    assert_eq!(texts[0].1, "Caption\n");
}

#[test]
fn test_repeated_runs_are_identical() {
    let data = PdfBuilder::new()
        .page(&format!("{}{}", show("Alpha beta", 72.0, 700.0), show("Gamma", 72.0, 686.0)), &[])
        .page(&show("Delta", 300.0, 500.0), &[])
        .build();

    let config = ExtractConfig::text();
    let first = process_bytes("doc.pdf", data.clone(), &config);
    let second = process_bytes("doc.pdf", data, &config);

    assert!(first.is_committed());
    assert_eq!(first.units().len(), 2);
    assert_eq!(first.units(), second.units());
}
