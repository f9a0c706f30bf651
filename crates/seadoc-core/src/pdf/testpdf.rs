//! Synthetic PDF builders shared by pdf, route, and pipeline tests.

use lopdf::{dictionary, Document, Object, Stream};

/// Create a multi-page PDF with the given text on each page.
pub fn create_multipage_pdf(page_texts: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids = Vec::new();

    for text in page_texts {
        let content = format!(
            "BT /F1 12 Tf 100 700 Td ({}) Tj ET",
            text.replace('\\', "\\\\")
                .replace('(', "\\(")
                .replace(')', "\\)")
        );
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| id.into()).collect();
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(page_texts.len() as i64),
    });

    for page_id in &page_ids {
        if let Ok(page) = doc.get_object_mut(*page_id) {
            if let Object::Dictionary(ref mut dict) = page {
                dict.set("Parent", pages_id);
            }
        }
    }

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });

    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Create an n-page PDF whose pages carry identical filler text.
pub fn create_pdf_with_pages(n: usize, page_text: &str) -> Vec<u8> {
    let texts: Vec<&str> = std::iter::repeat(page_text).take(n).collect();
    create_multipage_pdf(&texts)
}

/// Create an n-page PDF with empty content streams (no text layer).
pub fn create_blank_pdf(n: usize) -> Vec<u8> {
    create_pdf_with_pages(n, "")
}
