//! In-memory test PDFs
//!
//! Shared by the unit tests, the integration tests (via `#[path]`) and
//! downstream crates through the `test-utils` feature.

use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, Stream};

fn letter_media_box() -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(612),
        Object::Integer(792),
    ])
}

fn page_content(doc: &mut Document, label: u32) -> lopdf::ObjectId {
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
            ),
            Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
            Operation::new(
                "Tj",
                vec![Object::String(
                    format!("Page {}", label).into_bytes(),
                    lopdf::StringFormat::Literal,
                )],
            ),
            Operation::new("ET", vec![]),
        ],
    };
    doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()))
}

fn finish(mut doc: Document, pages_id: lopdf::ObjectId, pages: Dictionary) -> Vec<u8> {
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// A flat PDF with `num_pages` letter-sized pages
pub fn create_test_pdf(num_pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();
    for i in 0..num_pages {
        let content_id = page_content(&mut doc, i + 1);
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("MediaBox", letter_media_box()),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(num_pages as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    finish(doc, pages_id, pages)
}

/// A PDF whose second half of pages sits below an intermediate `/Pages`
/// node carrying `/Rotate rotate` and the `/MediaBox`
pub fn create_nested_pdf(num_pages: u32, rotate: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let middle_id = doc.new_object_id();
    let split = num_pages / 2;

    let mut top_kids = Vec::new();
    let mut nested_kids = Vec::new();
    for i in 0..num_pages {
        let content_id = page_content(&mut doc, i + 1);
        let page = if i < split {
            Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("MediaBox", letter_media_box()),
                ("Contents", Object::Reference(content_id)),
            ])
        } else {
            Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(middle_id)),
                ("Contents", Object::Reference(content_id)),
            ])
        };
        let page_id = doc.add_object(page);
        if i < split {
            top_kids.push(Object::Reference(page_id));
        } else {
            nested_kids.push(Object::Reference(page_id));
        }
    }

    let middle = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        ("Count", Object::Integer(nested_kids.len() as i64)),
        ("Kids", Object::Array(nested_kids)),
        ("Rotate", Object::Integer(rotate)),
        ("MediaBox", letter_media_box()),
    ]);
    doc.objects.insert(middle_id, Object::Dictionary(middle));
    top_kids.push(Object::Reference(middle_id));

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(num_pages as i64)),
        ("Kids", Object::Array(top_kids)),
    ]);
    finish(doc, pages_id, pages)
}

/// A flat PDF whose trailer carries `/Encrypt` and `/ID`.
///
/// The encryption dictionary is structurally valid but the page content is
/// plain, so tests can check that saving leaves stream bytes untouched.
/// Content streams are long and repetitive, so compressing them would
/// visibly change them.
pub fn create_encrypted_pdf(num_pages: u32) -> Vec<u8> {
    let mut doc = Document::load_mem(&create_test_pdf(num_pages)).unwrap();
    for object in doc.objects.values_mut() {
        if let Object::Stream(stream) = object {
            let repeated = stream.content.repeat(32);
            stream.set_content(repeated);
        }
    }
    let encrypt_id = doc.add_object(Dictionary::from_iter(vec![
        ("Filter", Object::Name(b"Standard".to_vec())),
        ("V", Object::Integer(1)),
        ("R", Object::Integer(2)),
        ("O", Object::string_literal(vec![0u8; 32])),
        ("U", Object::string_literal(vec![0u8; 32])),
        ("P", Object::Integer(-4)),
    ]));
    doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::string_literal(b"pdfedit-fixture".to_vec()),
            Object::string_literal(b"pdfedit-fixture".to_vec()),
        ]),
    );

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}
