//! Builders for small, valid EPUB and PDF documents.

use std::io::Write;
use std::path::Path;

use lopdf::dictionary;
use lopdf::{Document, Object, Stream};
use zip::write::SimpleFileOptions;

pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0xFF, 0xD9];

/// Options for the generated fixture.
pub struct Fixture<'a> {
    pub title: Option<&'a str>,
    pub creator: Option<&'a str>,
    pub cover: bool,
    pub chapters: &'a [&'a str],
}
impl Default for Fixture<'_> {
    fn default() -> Self {
        Self {
            title: Some("Dune"),
            creator: Some("Frank Herbert"),
            cover: true,
            chapters: &[
                "<h1>Book One</h1><p>A beginning is the time for taking the most delicate care.</p>",
                "<p>In the week before their departure to Arrakis, <em>an old crone</em> came to visit.</p>",
            ],
        }
    }
}

fn chapter(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>Chapter</title></head><body>{body}</body></html>"#
    )
}

/// Writes a minimal EPUB 3 package to `path`.
pub fn write_epub(path: &Path, fixture: &Fixture<'_>) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();

    zip.start_file("META-INF/container.xml", SimpleFileOptions::default()).unwrap();
    zip.write_all(
        br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#,
    )
    .unwrap();

    let mut metadata = String::from(r#"<dc:identifier id="uid">urn:uuid:0b7bd5f2-5c5b-4f0e-9b39-d2e1c2f0a001</dc:identifier>"#);
    metadata.push_str(r#"<dc:language>en</dc:language>"#);
    metadata.push_str(r#"<meta property="dcterms:modified">2024-01-01T00:00:00Z</meta>"#);
    if let Some(title) = fixture.title {
        metadata.push_str(&format!("<dc:title>{title}</dc:title>"));
    }
    if let Some(creator) = fixture.creator {
        metadata.push_str(&format!("<dc:creator>{creator}</dc:creator>"));
    }
    let mut manifest = String::from(r#"<item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>"#);
    let mut spine = String::new();
    for index in 0..fixture.chapters.len() {
        manifest.push_str(&format!(
            r#"<item id="c{index}" href="c{index}.xhtml" media-type="application/xhtml+xml"/>"#
        ));
        spine.push_str(&format!(r#"<itemref idref="c{index}"/>"#));
    }
    if fixture.cover {
        manifest.push_str(r#"<item id="cover" href="cover.jpg" media-type="image/jpeg" properties="cover-image"/>"#);
        metadata.push_str(r#"<meta name="cover" content="cover"/>"#);
    }
    let opf = format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">{metadata}</metadata>
  <manifest>{manifest}</manifest>
  <spine>{spine}</spine>
</package>"#
    );
    zip.start_file("OEBPS/content.opf", SimpleFileOptions::default()).unwrap();
    zip.write_all(opf.as_bytes()).unwrap();

    zip.start_file("OEBPS/nav.xhtml", SimpleFileOptions::default()).unwrap();
    zip.write_all(
        chapter(r#"<nav xmlns:epub="http://www.idpf.org/2007/ops" epub:type="toc"><ol><li><a href="c0.xhtml">One</a></li></ol></nav>"#)
            .as_bytes(),
    )
    .unwrap();
    for (index, body) in fixture.chapters.iter().enumerate() {
        zip.start_file(format!("OEBPS/c{index}.xhtml"), SimpleFileOptions::default()).unwrap();
        zip.write_all(chapter(body).as_bytes()).unwrap();
    }
    if fixture.cover {
        zip.start_file("OEBPS/cover.jpg", stored).unwrap();
        zip.write_all(JPEG).unwrap();
    }
    zip.finish().unwrap();
}

/// A PDF with one page of Helvetica text per entry of `pages`.
pub fn make_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        kids.push(page_id.into());
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => kids, "Count" => count }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}
