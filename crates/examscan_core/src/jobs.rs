//! Request builders for the two job families.
use thiserror::Error;

use crate::buffers::BufferStore;
use crate::protocol::{ScanIngestionRequest, ScanOptions, SheetGenerationRequest};
use crate::roster::{Roster, Subject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UserInputError {
    #[error("no roster loaded yet")]
    NoRosterLoaded,
    #[error("no document files loaded yet")]
    NoFilesLoaded,
    #[error("select at least one subject")]
    EmptySelection,
}

/// Layout options for generated sheets. All values are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetOptions {
    pub copies: u32,
    pub offset_row: u32,
    pub offset_col: u32,
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self {
            copies: 1,
            offset_row: 1,
            offset_col: 1,
        }
    }
}

impl SheetOptions {
    pub fn new(copies: u32, offset_row: u32, offset_col: u32) -> Self {
        Self {
            copies: copies.max(1),
            offset_row: offset_row.max(1),
            offset_col: offset_col.max(1),
        }
    }
}

/// Which roster rows go into sheet generation. When `enabled` is false the
/// whole roster is used regardless of the per-row flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    enabled: bool,
    selected: Vec<bool>,
}

impl Selection {
    /// Every row starts selected.
    pub fn for_roster(roster: &Roster) -> Self {
        Self {
            enabled: false,
            selected: vec![true; roster.len()],
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    /// Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, selected: bool) -> bool {
        match self.selected.get_mut(index) {
            Some(slot) if *slot != selected => {
                *slot = selected;
                true
            }
            _ => false,
        }
    }

    pub fn set_all(&mut self, selected: bool) {
        self.selected.iter_mut().for_each(|slot| *slot = selected);
    }

    pub fn resolve(&self, roster: &Roster) -> Vec<Subject> {
        if !self.enabled {
            return roster.subjects().to_vec();
        }
        roster
            .subjects()
            .iter()
            .enumerate()
            .filter(|(index, _)| self.is_selected(*index))
            .map(|(_, subject)| subject.clone())
            .collect()
    }
}

pub fn build_sheet_request(
    roster: Option<&Roster>,
    selection: &Selection,
    options: SheetOptions,
) -> Result<SheetGenerationRequest, UserInputError> {
    let roster = roster.ok_or(UserInputError::NoRosterLoaded)?;
    let selected = selection.resolve(roster);
    if selected.is_empty() {
        return Err(UserInputError::EmptySelection);
    }
    Ok(SheetGenerationRequest {
        roster_text: roster.raw_text().to_string(),
        roster_filename: roster.filename().to_string(),
        selection: selected,
        copies: options.copies.max(1),
        offset_row: options.offset_row.max(1),
        offset_col: options.offset_col.max(1),
        output_stem: roster.output_stem(),
    })
}

/// Moves every buffer out of `store`; the store is left empty.
pub fn build_scan_request(
    store: &mut BufferStore,
    options: ScanOptions,
) -> Result<ScanIngestionRequest, UserInputError> {
    if store.is_empty() {
        return Err(UserInputError::NoFilesLoaded);
    }
    Ok(ScanIngestionRequest {
        files: store.take(),
        options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster::parse("r.csv", "id,name\n1,Ann\n2,Ben\n3,Cid\n").unwrap()
    }

    #[test]
    fn disabled_selection_uses_whole_roster() {
        let roster = roster();
        let mut selection = Selection::for_roster(&roster);
        selection.set_all(false);
        assert_eq!(selection.resolve(&roster).len(), 3);
    }

    #[test]
    fn empty_explicit_selection_is_rejected() {
        let roster = roster();
        let mut selection = Selection::for_roster(&roster);
        selection.set_enabled(true);
        selection.set_all(false);
        assert_eq!(
            build_sheet_request(Some(&roster), &selection, SheetOptions::default()),
            Err(UserInputError::EmptySelection)
        );

        selection.set(2, true);
        let request = build_sheet_request(Some(&roster), &selection, SheetOptions::new(0, 2, 0)).unwrap();
        assert_eq!(request.selection, vec![Subject::new("3", "Cid")]);
        assert_eq!((request.copies, request.offset_row, request.offset_col), (1, 2, 1));
    }

    #[test]
    fn scan_request_requires_files() {
        let mut store = BufferStore::new();
        assert_eq!(
            build_scan_request(&mut store, ScanOptions::default()).unwrap_err(),
            UserInputError::NoFilesLoaded
        );
    }
}
