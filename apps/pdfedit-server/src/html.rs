//! HTML pages
//!
//! Two pages: the upload form and the page listing of a session. Every
//! action on the listing is a plain form POST, so the UI works without
//! JavaScript.

use html_escape::encode_text;
use pdfedit_core::{PageListing, SessionId};
use std::fmt::Write;

const STYLE: &str = r#"
  body { font-family: monospace; }
  table { border-collapse: collapse; margin: 1em 0; }
  th, td { border: 1px solid #999; padding: 6px 12px; text-align: center; }
  .actions form { display: inline; }
"#;

/// Upload form
pub fn index_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>pdfedit</title><style>{STYLE}</style></head>
<body>
<h1>pdfedit</h1>
<p>Delete, rotate and reorder the pages of a PDF.</p>
<form method="post" action="/upload" enctype="multipart/form-data">
  <input type="file" name="pdf" accept=".pdf" required>
  <button type="submit">Upload</button>
</form>
</body>
</html>
"#
    )
}

/// Page listing with rotate, delete and move controls per page
pub fn edit_page(id: &SessionId, listing: &PageListing) -> String {
    let filename = encode_text(&listing.filename);
    let page_count = listing.pages.len();

    let mut rows = String::new();
    for (index, page) in listing.pages.iter().enumerate() {
        let mut actions = String::new();
        let _ = write!(
            actions,
            r#"<form method="post" action="/rotate/{id}/{index}"><button title="Rotate 90° clockwise">↻ Rotate</button></form>
    <form method="post" action="/delete/{id}/{index}"><button title="Delete this page">✕ Delete</button></form>"#
        );
        if index > 0 {
            let _ = write!(
                actions,
                r#"
    <form method="post" action="/move/{id}/{index}"><input type="hidden" name="to" value="{}"><button title="Move up">▲ Up</button></form>"#,
                index - 1
            );
        }
        if index + 1 < page_count {
            let _ = write!(
                actions,
                r#"
    <form method="post" action="/move/{id}/{index}"><input type="hidden" name="to" value="{}"><button title="Move down">▼ Down</button></form>"#,
                index + 1
            );
        }

        let _ = write!(
            rows,
            r#"<tr>
  <td>{}</td><td>{}</td><td>{}</td>
  <td class="actions">
    {actions}
  </td>
</tr>
"#,
            index + 1,
            page.label(),
            page.rotation,
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>pdfedit - {filename}.pdf</title><style>{STYLE}</style></head>
<body>
<h1>{filename}.pdf ({page_count} pages)</h1>
<p><a href="/download/{id}">Download edited PDF</a> (the file is removed from the server once downloaded)</p>
<hr>
<table>
<tr><th>#</th><th>Original page</th><th>Rotation</th><th>Actions</th></tr>
{rows}</table>
<a href="/">&larr; Edit another PDF</a>
</body>
</html>
"#
    )
}
