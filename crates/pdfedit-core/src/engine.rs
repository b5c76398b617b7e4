//! Edit engine
//!
//! Applies one page operation to a loaded document and its ledger, keeping
//! both in lockstep. Operations whose index preconditions do not hold are
//! skipped and come back as [`Outcome::Skipped`], never as errors.

use crate::document::PdfDocument;
use crate::error::EditError;
use crate::ledger::Ledger;
use crate::persist::PersistMode;
use std::fmt;

/// A page-level edit. Indices are 0-based positions in the current order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// Rotate a page 90 degrees clockwise
    Rotate { page: usize },
    /// Remove a page; the last remaining page cannot be deleted
    Delete { page: usize },
    /// Pop the page at `from` and insert it at `to` of the shortened list
    Move { from: usize, to: usize },
}

impl EditOp {
    /// How the result of this operation must be saved
    pub fn persist_mode(&self) -> PersistMode {
        match self {
            EditOp::Rotate { .. } => PersistMode::Incremental,
            EditOp::Delete { .. } | EditOp::Move { .. } => PersistMode::FullRewrite,
        }
    }
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOp::Rotate { page } => write!(f, "rotate({})", page),
            EditOp::Delete { page } => write!(f, "delete({})", page),
            EditOp::Move { from, to } => write!(f, "move({} -> {})", from, to),
        }
    }
}

/// Why an operation was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    PageOutOfRange { index: usize, page_count: usize },
    LastPage,
    SamePosition,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::PageOutOfRange { index, page_count } => {
                write!(f, "page index {} out of range ({} pages)", index, page_count)
            }
            SkipReason::LastPage => write!(f, "cannot delete the only page"),
            SkipReason::SamePosition => write!(f, "source and target position are equal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied(PersistMode),
    Skipped(SkipReason),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }
}

/// Apply `op` to `doc` and `ledger`
pub fn apply(doc: &mut PdfDocument, ledger: &mut Ledger, op: EditOp) -> Result<Outcome, EditError> {
    let page_count = doc.page_count();
    if ledger.len() != page_count {
        return Err(EditError::Corrupt(format!(
            "Ledger has {} entries but document has {} pages",
            ledger.len(),
            page_count
        )));
    }

    if let Some(reason) = check(op, page_count) {
        return Ok(Outcome::Skipped(reason));
    }

    match op {
        EditOp::Rotate { page } => {
            let rotation = doc.rotation(page)?.quarter_turn();
            doc.set_rotation(page, rotation)?;
            ledger.set_rotation(page, rotation);
        }
        EditOp::Delete { page } => {
            let mut order = doc.page_ids();
            order.remove(page);
            doc.select(&order)?;
            ledger.remove(page);
        }
        EditOp::Move { from, to } => {
            let mut order = doc.page_ids();
            let moved = order.remove(from);
            order.insert(to, moved);
            doc.select(&order)?;
            ledger.move_record(from, to);
        }
    }

    debug_assert_eq!(ledger.len(), doc.page_count());
    Ok(Outcome::Applied(op.persist_mode()))
}

fn check(op: EditOp, page_count: usize) -> Option<SkipReason> {
    let out_of_range = |index: usize| {
        (index >= page_count).then_some(SkipReason::PageOutOfRange { index, page_count })
    };

    match op {
        EditOp::Rotate { page } => out_of_range(page),
        EditOp::Delete { page } => {
            out_of_range(page).or((page_count <= 1).then_some(SkipReason::LastPage))
        }
        EditOp::Move { from, to } => out_of_range(from)
            .or_else(|| out_of_range(to))
            .or((from == to).then_some(SkipReason::SamePosition)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::create_test_pdf;
    use crate::ledger::initial_indices;
    use pretty_assertions::assert_eq;

    fn session(pages: u32) -> (PdfDocument, Ledger) {
        let doc = PdfDocument::load(create_test_pdf(pages)).unwrap();
        let ledger = Ledger::from_parts(
            &initial_indices(doc.page_count()),
            &doc.rotations().unwrap(),
        )
        .unwrap();
        (doc, ledger)
    }

    fn degrees(ledger: &Ledger) -> Vec<u16> {
        ledger.rotations().iter().map(|r| r.degrees()).collect()
    }

    #[test]
    fn test_rotate_updates_document_and_ledger() {
        let (mut doc, mut ledger) = session(3);
        let outcome = apply(&mut doc, &mut ledger, EditOp::Rotate { page: 1 }).unwrap();

        assert_eq!(outcome, Outcome::Applied(PersistMode::Incremental));
        assert_eq!(degrees(&ledger), vec![0, 90, 0]);
        assert_eq!(doc.rotations().unwrap(), ledger.rotations());
    }

    #[test]
    fn test_delete_removes_matching_record() {
        let (mut doc, mut ledger) = session(3);
        let outcome = apply(&mut doc, &mut ledger, EditOp::Delete { page: 0 }).unwrap();

        assert_eq!(outcome, Outcome::Applied(PersistMode::FullRewrite));
        assert_eq!(ledger.original_indices(), vec![2, 3]);
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_delete_last_page_is_skipped() {
        let (mut doc, mut ledger) = session(1);
        let outcome = apply(&mut doc, &mut ledger, EditOp::Delete { page: 0 }).unwrap();

        assert_eq!(outcome, Outcome::Skipped(SkipReason::LastPage));
        assert_eq!(doc.page_count(), 1);
        assert_eq!(ledger.original_indices(), vec![1]);
    }

    #[test]
    fn test_move_uses_pop_then_insert() {
        let (mut doc, mut ledger) = session(4);
        let ids = doc.page_ids();
        apply(&mut doc, &mut ledger, EditOp::Move { from: 0, to: 2 }).unwrap();

        assert_eq!(ledger.original_indices(), vec![2, 3, 1, 4]);
        assert_eq!(doc.page_ids(), vec![ids[1], ids[2], ids[0], ids[3]]);
    }

    #[test]
    fn test_move_same_position_is_skipped() {
        let (mut doc, mut ledger) = session(3);
        let outcome = apply(&mut doc, &mut ledger, EditOp::Move { from: 1, to: 1 }).unwrap();
        assert_eq!(outcome, Outcome::Skipped(SkipReason::SamePosition));
    }

    #[test]
    fn test_out_of_range_is_skipped() {
        let (mut doc, mut ledger) = session(2);
        let before = ledger.clone();

        for op in [
            EditOp::Rotate { page: 2 },
            EditOp::Delete { page: 9 },
            EditOp::Move { from: 0, to: 2 },
            EditOp::Move { from: 5, to: 0 },
        ] {
            let outcome = apply(&mut doc, &mut ledger, op).unwrap();
            assert!(!outcome.is_applied(), "{} should be skipped", op);
        }
        assert_eq!(ledger, before);
        assert_eq!(doc.touched().count(), 0);
    }

    #[test]
    fn test_scenario_rotate_move_delete() {
        let (mut doc, mut ledger) = session(3);
        assert_eq!(ledger.original_indices(), vec![1, 2, 3]);
        assert_eq!(degrees(&ledger), vec![0, 0, 0]);

        apply(&mut doc, &mut ledger, EditOp::Rotate { page: 0 }).unwrap();
        assert_eq!(degrees(&ledger), vec![90, 0, 0]);

        apply(&mut doc, &mut ledger, EditOp::Move { from: 0, to: 2 }).unwrap();
        assert_eq!(ledger.original_indices(), vec![2, 3, 1]);
        assert_eq!(degrees(&ledger), vec![0, 0, 90]);

        apply(&mut doc, &mut ledger, EditOp::Delete { page: 1 }).unwrap();
        assert_eq!(ledger.original_indices(), vec![2, 1]);
        assert_eq!(degrees(&ledger), vec![0, 90]);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.rotations().unwrap(), ledger.rotations());
    }

    #[test]
    fn test_ledger_length_mismatch_is_corrupt() {
        let (mut doc, _) = session(3);
        let mut short = Ledger::from_parts(&[1], &[crate::rotation::Rotation::NONE]).unwrap();
        let result = apply(&mut doc, &mut short, EditOp::Rotate { page: 0 });
        assert!(matches!(result, Err(EditError::Corrupt(_))));
    }
}
