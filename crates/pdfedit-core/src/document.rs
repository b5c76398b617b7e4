//! Loaded PDF document
//!
//! Wraps a parsed lopdf [`Document`] together with the bytes it was parsed
//! from. The bytes are needed for incremental saves, which append to the
//! previous file instead of regenerating it.

use crate::error::EditError;
use crate::rotation::Rotation;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeSet;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic `/Parent` chains in malformed files
const MAX_TREE_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct PdfDocument {
    source: Vec<u8>,
    inner: Document,
    touched: BTreeSet<ObjectId>,
}

impl PdfDocument {
    /// Parse PDF bytes
    pub fn load(bytes: Vec<u8>) -> Result<Self, EditError> {
        let inner = Document::load_mem(&bytes).map_err(|e| EditError::Parse(e.to_string()))?;
        Ok(Self {
            source: bytes,
            inner,
            touched: BTreeSet::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Page object ids in document order
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.inner.get_pages().into_values().collect()
    }

    pub fn is_encrypted(&self) -> bool {
        self.inner.is_encrypted()
    }

    /// Bytes the document was loaded from, i.e. the last persisted state
    pub fn source_bytes(&self) -> &[u8] {
        &self.source
    }

    pub(crate) fn inner(&self) -> &Document {
        &self.inner
    }

    /// Objects modified since the document was loaded
    pub(crate) fn touched(&self) -> impl Iterator<Item = &ObjectId> {
        self.touched.iter()
    }

    /// Effective rotation of every page, in document order
    pub fn rotations(&self) -> Result<Vec<Rotation>, EditError> {
        self.page_ids()
            .into_iter()
            .map(|id| self.rotation_of(id))
            .collect()
    }

    pub fn rotation(&self, index: usize) -> Result<Rotation, EditError> {
        self.rotation_of(self.page_id(index)?)
    }

    /// Write `/Rotate` directly on the page, overriding any inherited value
    pub fn set_rotation(&mut self, index: usize, rotation: Rotation) -> Result<(), EditError> {
        let page_id = self.page_id(index)?;
        let page = self.inner.get_object_mut(page_id)?.as_dict_mut()?;
        page.set("Rotate", Object::Integer(i64::from(rotation.degrees())));
        self.touched.insert(page_id);
        Ok(())
    }

    /// Replace the page sequence with `order`.
    ///
    /// The page tree is rebuilt flat under the root `/Pages` node. Attributes
    /// a page inherited from an intermediate node are copied onto the page
    /// first, since that node is no longer its ancestor afterwards.
    pub fn select(&mut self, order: &[ObjectId]) -> Result<(), EditError> {
        let pages_id = self.root_pages_id()?;

        for &page_id in order {
            let carried: Vec<(&[u8], Object)> = {
                let page = self.inner.get_dictionary(page_id)?;
                INHERITABLE
                    .iter()
                    .copied()
                    .filter(|key| !page.has(key))
                    .filter_map(|key| {
                        self.inherited_below(page, key, pages_id)
                            .map(|value| (key, value.clone()))
                    })
                    .collect()
            };

            let page = self.inner.get_object_mut(page_id)?.as_dict_mut()?;
            for (key, value) in carried {
                page.set(key.to_vec(), value);
            }
            page.set("Parent", Object::Reference(pages_id));
            self.touched.insert(page_id);
        }

        let root = self.inner.get_object_mut(pages_id)?.as_dict_mut()?;
        let kids = order
            .iter()
            .map(|&id| Object::Reference(id))
            .collect::<Vec<_>>();
        root.set("Kids", Object::Array(kids));
        root.set("Count", Object::Integer(order.len() as i64));
        self.touched.insert(pages_id);

        Ok(())
    }

    fn page_id(&self, index: usize) -> Result<ObjectId, EditError> {
        self.page_ids().get(index).copied().ok_or_else(|| {
            EditError::Pdf(format!(
                "Page index {} out of range ({} pages)",
                index,
                self.page_count()
            ))
        })
    }

    fn root_pages_id(&self) -> Result<ObjectId, EditError> {
        let catalog_id = self
            .inner
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|_| EditError::Pdf("No Root in trailer".into()))?;

        self.inner
            .get_dictionary(catalog_id)
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(|_| EditError::Pdf("No Pages in catalog".into()))
    }

    fn rotation_of(&self, page_id: ObjectId) -> Result<Rotation, EditError> {
        let page = self.inner.get_dictionary(page_id)?;
        let angle = self
            .inherited(page, b"Rotate")
            .and_then(|value| match self.resolve(value) {
                Object::Integer(n) => Some(*n),
                Object::Real(r) => Some(*r as i64),
                _ => None,
            })
            .unwrap_or(0);
        Ok(Rotation::from_degrees(angle))
    }

    /// Look up `key` on the page, then on each ancestor up to the root
    fn inherited<'a>(&'a self, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        if let Ok(value) = page.get(key) {
            return Some(value);
        }
        let mut current = page;
        for _ in 0..MAX_TREE_DEPTH {
            let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
            let parent = self.inner.get_dictionary(parent_id).ok()?;
            if let Ok(value) = parent.get(key) {
                return Some(value);
            }
            current = parent;
        }
        None
    }

    /// Like [`Self::inherited`] but only from ancestors strictly below `root`
    fn inherited_below<'a>(
        &'a self,
        page: &'a Dictionary,
        key: &[u8],
        root: ObjectId,
    ) -> Option<&'a Object> {
        let mut current = page;
        for _ in 0..MAX_TREE_DEPTH {
            let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
            if parent_id == root {
                return None;
            }
            let parent = self.inner.get_dictionary(parent_id).ok()?;
            if let Ok(value) = parent.get(key) {
                return Some(value);
            }
            current = parent;
        }
        None
    }

    fn resolve<'a>(&'a self, value: &'a Object) -> &'a Object {
        match value {
            Object::Reference(id) => self.inner.get_object(*id).unwrap_or(value),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{create_nested_pdf, create_test_pdf};

    #[test]
    fn test_load_rejects_garbage() {
        let result = PdfDocument::load(b"not a pdf".to_vec());
        assert!(matches!(result, Err(EditError::Parse(_))));
    }

    #[test]
    fn test_rotation_defaults_to_zero() {
        let doc = PdfDocument::load(create_test_pdf(3)).unwrap();
        assert_eq!(doc.rotations().unwrap(), vec![Rotation::NONE; 3]);
    }

    #[test]
    fn test_set_rotation_marks_page_touched() {
        let mut doc = PdfDocument::load(create_test_pdf(2)).unwrap();
        doc.set_rotation(1, Rotation::from_degrees(180)).unwrap();
        assert_eq!(doc.rotation(1).unwrap().degrees(), 180);
        assert_eq!(doc.rotation(0).unwrap(), Rotation::NONE);
        assert_eq!(doc.touched().count(), 1);
    }

    #[test]
    fn test_set_rotation_out_of_range_errors() {
        let mut doc = PdfDocument::load(create_test_pdf(2)).unwrap();
        assert!(doc.set_rotation(5, Rotation::NONE).is_err());
    }

    #[test]
    fn test_select_reorders_pages() {
        let mut doc = PdfDocument::load(create_test_pdf(3)).unwrap();
        let ids = doc.page_ids();
        doc.select(&[ids[2], ids[0]]).unwrap();
        assert_eq!(doc.page_ids(), vec![ids[2], ids[0]]);
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_inherited_rotation_is_read_from_intermediate_node() {
        // Second half of the pages hangs below an intermediate node with /Rotate 90
        let doc = PdfDocument::load(create_nested_pdf(4, 90)).unwrap();
        let degrees: Vec<u16> = doc.rotations().unwrap().iter().map(|r| r.degrees()).collect();
        assert_eq!(degrees, vec![0, 0, 90, 90]);
    }

    #[test]
    fn test_select_flattens_tree_and_keeps_inherited_rotation() {
        let mut doc = PdfDocument::load(create_nested_pdf(4, 90)).unwrap();
        let ids = doc.page_ids();
        doc.select(&[ids[3], ids[0], ids[2]]).unwrap();

        let degrees: Vec<u16> = doc.rotations().unwrap().iter().map(|r| r.degrees()).collect();
        assert_eq!(degrees, vec![90, 0, 90]);
        assert_eq!(doc.page_ids(), vec![ids[3], ids[0], ids[2]]);
    }
}
