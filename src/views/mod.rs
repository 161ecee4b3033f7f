//! Per-page state kept in the session between requests.

mod batch_list;
mod detail;

pub use batch_list::BatchListView;
pub use detail::DetailView;

/// The page a session is currently looking at. Switching pages drops the
/// previous page's state, including any review selection.
#[derive(Debug, Default)]
pub enum PageView {
    #[default]
    None,
    Dashboard(BatchListView),
    Batches(BatchListView),
    Queue(BatchListView),
    Detail(DetailView),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Batches,
    Queue,
}

impl PageView {
    pub fn batch_list(&self, page: Page) -> Option<&BatchListView> {
        match (self, page) {
            (Self::Dashboard(v), Page::Dashboard)
            | (Self::Batches(v), Page::Batches)
            | (Self::Queue(v), Page::Queue) => Some(v),
            _ => None,
        }
    }

    pub fn batch_list_mut(&mut self, page: Page) -> Option<&mut BatchListView> {
        match (self, page) {
            (Self::Dashboard(v), Page::Dashboard)
            | (Self::Batches(v), Page::Batches)
            | (Self::Queue(v), Page::Queue) => Some(v),
            _ => None,
        }
    }

    pub fn for_list(page: Page, view: BatchListView) -> Self {
        match page {
            Page::Dashboard => Self::Dashboard(view),
            Page::Batches => Self::Batches(view),
            Page::Queue => Self::Queue(view),
        }
    }

    /// Detail view for `batch_id`, if that batch is the one on screen.
    pub fn detail(&self, batch_id: &str) -> Option<&DetailView> {
        match self {
            Self::Detail(v) if v.batch_id == batch_id => Some(v),
            _ => None,
        }
    }

    pub fn detail_mut(&mut self, batch_id: &str) -> Option<&mut DetailView> {
        match self {
            Self::Detail(v) if v.batch_id == batch_id => Some(v),
            _ => None,
        }
    }
}
