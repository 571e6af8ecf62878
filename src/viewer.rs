//! Navigation state for the reading view.

use log::{info, warn};

use crate::file_list::{DisplayEntry, FileList};
use crate::position::PositionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    /// Nothing loaded.
    Idle,
    /// Left the reading view; the list is kept so reading can resume.
    Paused,
    Browsing,
    Info,
    /// At a boundary, waiting for a second attempt to close the list.
    ConfirmExit,
}

/// Result of a `next`/`previous` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved(usize),
    ReachedEnd,
    ReachedBeginning,
    /// Second attempt past a boundary; the list has been cleared.
    Closed,
    /// Not reading.
    Ignored,
}

#[derive(Debug, Default)]
pub struct Viewer {
    list: Option<FileList>,
    index: Option<usize>,
    info: bool,
    ready_to_exit: bool,
    exited: bool,
}

impl Viewer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts reading `list` at its remembered position.
    pub fn open(&mut self, list: FileList, store: &mut PositionStore) {
        self.reset();
        if list.is_empty() {
            return;
        }
        let index = store.restore(list.fingerprint(), list.len());
        info!(
            "Opened {} pages ({}) at page {}",
            list.len(),
            list.fingerprint(),
            index + 1
        );
        self.list = Some(list);
        self.index = Some(index);
        self.remember(store);
    }

    pub fn state(&self) -> ViewerState {
        match (&self.list, self.index) {
            (Some(_), Some(_)) if self.exited => ViewerState::Paused,
            (Some(_), Some(_)) if self.ready_to_exit => ViewerState::ConfirmExit,
            (Some(_), Some(_)) if self.info => ViewerState::Info,
            (Some(_), Some(_)) => ViewerState::Browsing,
            _ => ViewerState::Idle,
        }
    }

    /// True while a page is on screen.
    pub fn is_reading(&self) -> bool {
        !matches!(self.state(), ViewerState::Idle | ViewerState::Paused)
    }

    pub fn show_info(&self) -> bool {
        self.is_reading() && self.info
    }

    pub fn list(&self) -> Option<&FileList> {
        self.list.as_ref()
    }

    pub fn current(&self) -> Option<(usize, &DisplayEntry)> {
        let index = self.index?;
        let entry = self.list.as_ref()?.get(index)?;
        Some((index, entry))
    }

    pub fn next(&mut self, store: &mut PositionStore) -> Navigation {
        let Some((index, len)) = self.position() else {
            return Navigation::Ignored;
        };
        if index + 1 < len {
            self.move_to(index + 1, store)
        } else {
            self.hit_boundary(Navigation::ReachedEnd)
        }
    }

    pub fn previous(&mut self, store: &mut PositionStore) -> Navigation {
        let Some((index, _)) = self.position() else {
            return Navigation::Ignored;
        };
        if index > 0 {
            self.move_to(index - 1, store)
        } else {
            self.hit_boundary(Navigation::ReachedBeginning)
        }
    }

    pub fn toggle_info(&mut self) {
        if self.is_reading() {
            self.info = !self.info;
        }
    }

    pub fn hide_info(&mut self) {
        self.info = false;
    }

    /// Leaves the reading view. While confirming an exit this closes the
    /// list; otherwise the list is kept for [`Viewer::resume`].
    pub fn exit(&mut self) {
        match self.state() {
            ViewerState::ConfirmExit => self.reset(),
            ViewerState::Browsing | ViewerState::Info => {
                self.info = false;
                self.ready_to_exit = false;
                self.exited = true;
            }
            ViewerState::Idle | ViewerState::Paused => {}
        }
    }

    /// Returns to the page that was showing before [`Viewer::exit`].
    pub fn resume(&mut self) {
        if self.state() == ViewerState::Paused {
            self.exited = false;
        }
    }

    fn position(&self) -> Option<(usize, usize)> {
        if !self.is_reading() {
            return None;
        }
        Some((self.index?, self.list.as_ref()?.len()))
    }

    fn move_to(&mut self, index: usize, store: &mut PositionStore) -> Navigation {
        self.index = Some(index);
        self.info = false;
        self.ready_to_exit = false;
        self.remember(store);
        Navigation::Moved(index)
    }

    fn hit_boundary(&mut self, boundary: Navigation) -> Navigation {
        if self.ready_to_exit {
            self.reset();
            Navigation::Closed
        } else {
            self.ready_to_exit = true;
            self.info = true;
            boundary
        }
    }

    fn remember(&self, store: &mut PositionStore) {
        let (Some(list), Some(index)) = (&self.list, self.index) else {
            return;
        };
        if let Err(e) = store.set(list.fingerprint(), index) {
            warn!("Failed to save reading position: {}", e);
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_list::SortPolicy;
    use crate::media::{FileHandle, MediaKind};

    fn pages(n: usize) -> FileList {
        let files = (0..n)
            .map(|i| FileHandle::from_bytes(format!("{i:02}.png"), MediaKind::Image, vec![0u8; i + 1]))
            .collect();
        FileList::build(files, SortPolicy::AsIs)
    }

    fn opened(n: usize, store: &mut PositionStore) -> Viewer {
        let mut viewer = Viewer::new();
        viewer.open(pages(n), store);
        viewer
    }

    #[test]
    fn starts_idle() {
        let viewer = Viewer::new();
        assert_eq!(viewer.state(), ViewerState::Idle);
        assert!(viewer.current().is_none());
    }

    #[test]
    fn empty_list_stays_idle() {
        let mut store = PositionStore::in_memory();
        let viewer = opened(0, &mut store);
        assert_eq!(viewer.state(), ViewerState::Idle);
    }

    #[test]
    fn next_and_previous_move_within_bounds() {
        let mut store = PositionStore::in_memory();
        let mut viewer = opened(3, &mut store);
        assert_eq!(viewer.state(), ViewerState::Browsing);
        assert_eq!(viewer.next(&mut store), Navigation::Moved(1));
        assert_eq!(viewer.next(&mut store), Navigation::Moved(2));
        assert_eq!(viewer.previous(&mut store), Navigation::Moved(1));
        assert_eq!(viewer.current().unwrap().1.display_name, "01.png");
    }

    #[test]
    fn end_needs_confirmation_then_closes() {
        let mut store = PositionStore::in_memory();
        let mut viewer = opened(2, &mut store);
        viewer.next(&mut store);

        assert_eq!(viewer.next(&mut store), Navigation::ReachedEnd);
        assert_eq!(viewer.state(), ViewerState::ConfirmExit);
        assert!(viewer.show_info());
        assert_eq!(viewer.current().unwrap().0, 1);

        assert_eq!(viewer.next(&mut store), Navigation::Closed);
        assert_eq!(viewer.state(), ViewerState::Idle);
        assert!(viewer.list().is_none());
        assert!(viewer.current().is_none());
    }

    #[test]
    fn beginning_needs_confirmation_too() {
        let mut store = PositionStore::in_memory();
        let mut viewer = opened(2, &mut store);
        assert_eq!(viewer.previous(&mut store), Navigation::ReachedBeginning);
        assert_eq!(viewer.previous(&mut store), Navigation::Closed);
    }

    #[test]
    fn moving_clears_confirmation_and_info() {
        let mut store = PositionStore::in_memory();
        let mut viewer = opened(2, &mut store);
        viewer.previous(&mut store);
        assert_eq!(viewer.state(), ViewerState::ConfirmExit);

        assert_eq!(viewer.next(&mut store), Navigation::Moved(1));
        assert_eq!(viewer.state(), ViewerState::Browsing);
        assert!(!viewer.show_info());
    }

    #[test]
    fn toggle_info_flips_between_browsing_and_info() {
        let mut store = PositionStore::in_memory();
        let mut viewer = opened(2, &mut store);
        viewer.toggle_info();
        assert_eq!(viewer.state(), ViewerState::Info);
        viewer.toggle_info();
        assert_eq!(viewer.state(), ViewerState::Browsing);
    }

    #[test]
    fn exit_pauses_and_resume_returns() {
        let mut store = PositionStore::in_memory();
        let mut viewer = opened(3, &mut store);
        viewer.next(&mut store);
        viewer.toggle_info();

        viewer.exit();
        assert_eq!(viewer.state(), ViewerState::Paused);
        assert_eq!(viewer.next(&mut store), Navigation::Ignored);
        assert!(viewer.list().is_some());

        viewer.resume();
        assert_eq!(viewer.state(), ViewerState::Browsing);
        assert_eq!(viewer.current().unwrap().0, 1);
    }

    #[test]
    fn exit_while_confirming_closes() {
        let mut store = PositionStore::in_memory();
        let mut viewer = opened(2, &mut store);
        viewer.previous(&mut store);
        viewer.exit();
        assert_eq!(viewer.state(), ViewerState::Idle);
        assert!(viewer.list().is_none());
    }

    #[test]
    fn reopening_resumes_saved_page() {
        let mut store = PositionStore::in_memory();
        let mut viewer = opened(5, &mut store);
        viewer.next(&mut store);
        viewer.next(&mut store);

        let fingerprint = viewer.list().unwrap().fingerprint().clone();
        assert_eq!(store.get(&fingerprint), Some(2));

        let reopened = opened(5, &mut store);
        assert_eq!(reopened.current().unwrap().0, 2);
    }

    #[test]
    fn saved_last_page_restarts_from_first() {
        let mut store = PositionStore::in_memory();
        let mut viewer = opened(3, &mut store);
        viewer.next(&mut store);
        viewer.next(&mut store);

        let reopened = opened(3, &mut store);
        assert_eq!(reopened.current().unwrap().0, 0);
        let fingerprint = reopened.list().unwrap().fingerprint().clone();
        assert_eq!(store.get(&fingerprint), Some(0));
    }

    #[test]
    fn opening_fresh_set_records_nothing() {
        let mut store = PositionStore::in_memory();
        opened(4, &mut store);
        assert!(store.is_empty());
    }
}
