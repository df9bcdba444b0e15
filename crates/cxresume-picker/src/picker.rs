//! Interactive picker state machine.
//!
//! The picker owns its caches and background tasks. Rendering and raw key
//! handling live elsewhere; this module only consumes decoded [`PickerOp`]s
//! and announces background progress as [`PickerEvent`]s.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
};

use cxresume_core::{
    Clipboard, HideSet, PreviewLine, QuickMeta, SessionFile, dialog_preview, filter_by_working_dir,
    parse_session, preview::PICKER_PREVIEW_LIMIT, time::format_local,
};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    cache::MemoryCache,
    reader::{MetaReader, PeekReader},
};

/// Rows per page.
pub const ITEMS_PER_PAGE: usize = 30;

/// Concurrent metadata reads per page.
pub const PREFETCH_WORKERS: usize = 8;

/// What the user chose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerDecision {
    Resume { path: PathBuf, extra_args: String },
    StartNew { working_dir: Option<PathBuf>, extra_args: String },
    Abort,
}

/// Decoded user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerOp {
    /// Move the selection within the page, clamped at both ends.
    Move(isize),
    SelectFirst,
    SelectLast,
    PrevPage,
    NextPage,
    /// Scroll the preview by lines.
    ScrollPreview(isize),
    ToggleFullView,
    BeginEdit,
    EditInput(char),
    EditBackspace,
    SubmitEdit,
    CancelEdit,
    CopyId,
    Resume,
    StartNew,
    /// Quit, escape or interrupt.
    Dismiss,
}

/// Background progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
    /// Metadata for `path` was cached by a load started in page `generation`.
    MetaLoaded { path: PathBuf, generation: u64 },
    FilterReady(Vec<SessionFile>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Browsing,
    Editing { buffer: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewState {
    Empty,
    Loading,
    Ready(Arc<Vec<PreviewLine>>),
    Failed(String),
}

/// The preview pane's content for the active selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewPane {
    pub path: Option<PathBuf>,
    pub state: PreviewState,
    pub scroll: usize,
}

impl Default for PreviewPane {
    fn default() -> Self {
        Self {
            path: None,
            state: PreviewState::Empty,
            scroll: 0,
        }
    }
}

impl PreviewPane {
    /// Text lines to display.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        match &self.state {
            PreviewState::Empty => Vec::new(),
            PreviewState::Loading => vec!["Loading…".to_string()],
            PreviewState::Ready(lines) => lines.iter().map(ToString::to_string).collect(),
            PreviewState::Failed(reason) => vec![format!("Preview failed: {reason}")],
        }
    }
}

/// One list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub time: String,
    pub working_dir: String,
    pub id: String,
}

/// Picker configuration.
pub struct PickerOptions {
    pub hide: HideSet,
    pub preview_limit: usize,
    pub clipboard: Arc<dyn Clipboard>,
    pub meta_reader: Arc<dyn MetaReader>,
}

impl PickerOptions {
    #[must_use]
    pub fn new(clipboard: Arc<dyn Clipboard>) -> Self {
        Self {
            hide: HideSet::default(),
            preview_limit: PICKER_PREVIEW_LIMIT,
            clipboard,
            meta_reader: Arc::new(PeekReader),
        }
    }

    #[must_use]
    pub fn with_meta_reader(mut self, reader: Arc<dyn MetaReader>) -> Self {
        self.meta_reader = reader;
        self
    }

    #[must_use]
    pub fn with_hide(mut self, hide: HideSet) -> Self {
        self.hide = hide;
        self
    }
}

/// One picker session.
///
/// Caches and liveness are per instance, so pickers never share state.
pub struct PickerSession {
    all: Arc<Vec<SessionFile>>,
    visible: Vec<SessionFile>,
    page: usize,
    selected: usize,
    meta: Arc<MemoryCache<QuickMeta>>,
    meta_reader: Arc<dyn MetaReader>,
    previews: MemoryCache<Arc<Vec<PreviewLine>>>,
    preview: PreviewPane,
    hide: HideSet,
    preview_limit: usize,
    clipboard: Arc<dyn Clipboard>,
    edited_args: String,
    mode: Mode,
    full_view: bool,
    notice: Option<String>,
    alive: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    events_tx: mpsc::UnboundedSender<PickerEvent>,
    events_rx: mpsc::UnboundedReceiver<PickerEvent>,
}

impl PickerSession {
    /// Create a picker over `files`, which should already be sorted newest first.
    #[must_use]
    pub fn new(files: Vec<SessionFile>, options: PickerOptions) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            visible: files.clone(),
            all: Arc::new(files),
            page: 0,
            selected: 0,
            meta: Arc::new(MemoryCache::new()),
            meta_reader: options.meta_reader,
            previews: MemoryCache::new(),
            preview: PreviewPane::default(),
            hide: options.hide,
            preview_limit: options.preview_limit,
            clipboard: options.clipboard,
            edited_args: String::new(),
            mode: Mode::Browsing,
            full_view: false,
            notice: None,
            alive: Arc::new(AtomicBool::new(true)),
            generation: Arc::new(AtomicU64::new(0)),
            events_tx,
            events_rx,
        }
    }

    /// Show the first page and start background work.
    ///
    /// With `dir_filter`, sessions recorded in that directory replace the list
    /// once the scan completes. Returns [`PickerDecision::Abort`] immediately
    /// when there is nothing to choose from.
    pub async fn start(&mut self, dir_filter: Option<PathBuf>) -> Option<PickerDecision> {
        if self.visible.is_empty() {
            self.close();
            return Some(PickerDecision::Abort);
        }
        self.enter_page(0).await;
        if let Some(cwd) = dir_filter {
            let _ = self.start_dir_filter(cwd);
        }
        None
    }

    /// Scan the full catalog for sessions recorded in `cwd`.
    ///
    /// The handle resolves to whether the result was delivered; a picker
    /// closed before the scan finishes never receives it.
    pub fn start_dir_filter(&self, cwd: PathBuf) -> JoinHandle<bool> {
        let files = Arc::clone(&self.all);
        let alive = Arc::clone(&self.alive);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let matched = filter_by_working_dir(&files, &cwd).await;
            if !alive.load(Ordering::Acquire) {
                tracing::debug!(cwd = %cwd.display(), "Directory filter finished after picker closed");
                return false;
            }
            tracing::debug!(cwd = %cwd.display(), matched = matched.len(), "Directory filter ready");
            tx.send(PickerEvent::FilterReady(matched)).is_ok()
        })
    }

    /// Wait for the next background event.
    pub async fn next_event(&mut self) -> Option<PickerEvent> {
        self.events_rx.recv().await
    }

    /// Next background event, if one is queued.
    pub fn try_next_event(&mut self) -> Option<PickerEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Fold a background event into the picker state.
    pub async fn handle_event(&mut self, event: PickerEvent) {
        if !self.is_alive() {
            return;
        }
        match event {
            // Rows read the metadata cache directly; a redraw is enough.
            PickerEvent::MetaLoaded { .. } => {}
            PickerEvent::FilterReady(files) if files.is_empty() => {
                self.notice = Some("No sessions recorded in the current directory; showing all sessions".into());
            }
            PickerEvent::FilterReady(files) => {
                self.notice = Some(format!("Showing {} sessions from the current directory", files.len()));
                self.visible = files;
                self.enter_page(0).await;
            }
        }
    }

    /// Apply one operation. Returns the decision once the user has made one.
    pub async fn apply(&mut self, op: PickerOp) -> Option<PickerDecision> {
        if !self.is_alive() {
            return Some(PickerDecision::Abort);
        }
        if op == PickerOp::Dismiss {
            self.close();
            return Some(PickerDecision::Abort);
        }

        if let Mode::Editing { buffer } = &mut self.mode {
            match op {
                PickerOp::EditInput(c) => buffer.push(c),
                PickerOp::EditBackspace => {
                    buffer.pop();
                }
                PickerOp::SubmitEdit => {
                    self.edited_args = std::mem::take(buffer).trim().to_string();
                    self.mode = Mode::Browsing;
                }
                PickerOp::CancelEdit => self.mode = Mode::Browsing,
                _ => {}
            }
            return None;
        }

        match op {
            PickerOp::Move(delta) => {
                let last = self.page_len().saturating_sub(1);
                let target = self.selected.saturating_add_signed(delta).min(last);
                self.select(target).await;
            }
            PickerOp::SelectFirst => self.select(0).await,
            PickerOp::SelectLast => self.select(self.page_len().saturating_sub(1)).await,
            PickerOp::PrevPage => {
                if self.page > 0 {
                    self.enter_page(self.page - 1).await;
                }
            }
            PickerOp::NextPage => {
                if self.page + 1 < self.total_pages() {
                    self.enter_page(self.page + 1).await;
                }
            }
            PickerOp::ScrollPreview(delta) => {
                let max = self.preview.lines().len().saturating_sub(1);
                self.preview.scroll = self.preview.scroll.saturating_add_signed(delta).min(max);
            }
            PickerOp::ToggleFullView => self.full_view = !self.full_view,
            PickerOp::BeginEdit => {
                self.mode = Mode::Editing {
                    buffer: self.edited_args.clone(),
                };
            }
            PickerOp::CopyId => self.copy_id().await,
            PickerOp::Resume => {
                let file = self.selected_file()?.clone();
                self.close();
                return Some(PickerDecision::Resume {
                    path: file.path,
                    extra_args: self.edited_args.clone(),
                });
            }
            PickerOp::StartNew => {
                let file = self.selected_file()?.clone();
                let working_dir = self.quick_meta(&file).await.and_then(|m| m.working_dir);
                self.close();
                return Some(PickerDecision::StartNew {
                    working_dir,
                    extra_args: self.edited_args.clone(),
                });
            }
            PickerOp::EditInput(_)
            | PickerOp::EditBackspace
            | PickerOp::SubmitEdit
            | PickerOp::CancelEdit
            | PickerOp::Dismiss => {}
        }
        None
    }

    /// Tear down: background results arriving later are dropped.
    /// Stop background work and discard undelivered events.
    pub fn close(&mut self) {
        self.alive.store(false, Ordering::Release);
        while self.events_rx.try_recv().is_ok() {}
    }

    /// Counter bumped on every page entry.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn page_items(&self) -> &[SessionFile] {
        let start = (self.page * ITEMS_PER_PAGE).min(self.visible.len());
        let end = (start + ITEMS_PER_PAGE).min(self.visible.len());
        &self.visible[start..end]
    }

    #[must_use]
    pub fn page_len(&self) -> usize {
        self.page_items().len()
    }

    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.visible.len().div_ceil(ITEMS_PER_PAGE).max(1)
    }

    /// Selected index within the page.
    #[must_use]
    pub const fn selected(&self) -> usize {
        self.selected
    }

    #[must_use]
    pub fn selected_file(&self) -> Option<&SessionFile> {
        self.page_items().get(self.selected)
    }

    /// `Page x/y | Showing n/m`.
    #[must_use]
    pub fn page_info(&self) -> String {
        format!(
            "Page {}/{} | Showing {}/{}",
            self.page + 1,
            self.total_pages(),
            self.page_len(),
            self.visible.len()
        )
    }

    /// Rows of the current page.
    #[must_use]
    pub fn rows(&self) -> Vec<Row> {
        self.page_items()
            .iter()
            .map(|file| {
                let meta = self.meta.get(&file.path).unwrap_or_default();
                Row {
                    time: format_local(&meta.start_time.unwrap_or_else(|| file.modified_at())),
                    working_dir: meta
                        .working_dir
                        .map_or_else(|| "-".to_string(), |d| d.display().to_string()),
                    id: meta.session_id.unwrap_or_else(|| file.file_name()),
                }
            })
            .collect()
    }

    #[must_use]
    pub const fn preview(&self) -> &PreviewPane {
        &self.preview
    }

    #[must_use]
    pub fn cached_meta(&self, path: &Path) -> Option<QuickMeta> {
        self.meta.get(path)
    }

    #[must_use]
    pub fn edited_args(&self) -> &str {
        &self.edited_args
    }

    #[must_use]
    pub const fn mode(&self) -> &Mode {
        &self.mode
    }

    #[must_use]
    pub const fn full_view(&self) -> bool {
        self.full_view
    }

    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    async fn enter_page(&mut self, page: usize) {
        self.page = page;
        self.selected = 0;
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.spawn_prefetch(generation);
        self.load_preview().await;
    }

    async fn select(&mut self, index: usize) {
        if index != self.selected || self.preview.path.is_none() {
            self.selected = index;
            self.load_preview().await;
        }
        let neighbours = [Some(index), index.checked_add(1), index.checked_sub(1)];
        for i in neighbours.into_iter().flatten() {
            if let Some(file) = self.page_items().get(i) {
                self.spawn_meta_load(file.clone());
            }
        }
    }

    /// Workers pull page indices from a shared counter until the page is
    /// exhausted, the page changes, or the picker closes.
    fn spawn_prefetch(&self, generation: u64) {
        let items: Arc<Vec<SessionFile>> = Arc::new(self.page_items().to_vec());
        let next = Arc::new(AtomicUsize::new(0));
        for _ in 0..PREFETCH_WORKERS.min(items.len()) {
            let items = Arc::clone(&items);
            let next = Arc::clone(&next);
            let meta = Arc::clone(&self.meta);
            let reader = Arc::clone(&self.meta_reader);
            let alive = Arc::clone(&self.alive);
            let current = Arc::clone(&self.generation);
            let tx = self.events_tx.clone();
            tokio::spawn(async move {
                let live = || alive.load(Ordering::Acquire) && current.load(Ordering::Acquire) == generation;
                while live() {
                    let Some(file) = items.get(next.fetch_add(1, Ordering::AcqRel)) else {
                        break;
                    };
                    if load_meta(reader.as_ref(), &meta, file).await && live() {
                        let _ = tx.send(PickerEvent::MetaLoaded {
                            path: file.path.clone(),
                            generation,
                        });
                    }
                }
            });
        }
    }

    fn spawn_meta_load(&self, file: SessionFile) {
        if self.meta.contains(&file.path) {
            return;
        }
        let meta = Arc::clone(&self.meta);
        let reader = Arc::clone(&self.meta_reader);
        let alive = Arc::clone(&self.alive);
        let current = Arc::clone(&self.generation);
        let generation = self.generation();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let live = || alive.load(Ordering::Acquire) && current.load(Ordering::Acquire) == generation;
            if load_meta(reader.as_ref(), &meta, &file).await && live() {
                let _ = tx.send(PickerEvent::MetaLoaded {
                    path: file.path,
                    generation,
                });
            }
        });
    }

    async fn load_preview(&mut self) {
        let Some(file) = self.selected_file().cloned() else {
            self.preview = PreviewPane::default();
            return;
        };
        self.preview = PreviewPane {
            path: Some(file.path.clone()),
            state: PreviewState::Loading,
            scroll: 0,
        };
        if let Some(lines) = self.previews.get(&file.path) {
            self.preview.state = PreviewState::Ready(lines);
            return;
        }

        let parsed = parse_session(&file.path).await;
        if !self.is_alive() || self.preview.path.as_deref() != Some(file.path.as_path()) {
            return;
        }
        self.preview.state = match parsed {
            Ok(parsed) => {
                let lines = Arc::new(dialog_preview(&parsed.messages, self.preview_limit, &self.hide));
                self.previews.insert(file.path.clone(), Arc::clone(&lines));
                PreviewState::Ready(lines)
            }
            Err(e) => {
                tracing::debug!(path = %file.path.display(), error = %e, "Preview failed");
                PreviewState::Failed(e.to_string())
            }
        };
    }

    async fn quick_meta(&self, file: &SessionFile) -> Option<QuickMeta> {
        if let Some(meta) = self.meta.get(&file.path) {
            return Some(meta);
        }
        load_meta(self.meta_reader.as_ref(), &self.meta, file).await;
        self.meta.get(&file.path)
    }

    async fn copy_id(&mut self) {
        let Some(file) = self.selected_file().cloned() else {
            return;
        };
        let id = self
            .quick_meta(&file)
            .await
            .and_then(|m| m.session_id)
            .unwrap_or_else(|| {
                if file.rel.as_os_str().is_empty() {
                    file.path.display().to_string()
                } else {
                    file.rel.display().to_string()
                }
            });
        self.notice = Some(match self.clipboard.copy(&id) {
            Ok(()) => format!("Copied session id: {id}"),
            Err(e) => format!("Copy failed: {e}"),
        });
    }
}

impl Drop for PickerSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Load metadata for `file` into `cache`. Returns whether a new entry was stored.
async fn load_meta(reader: &dyn MetaReader, cache: &MemoryCache<QuickMeta>, file: &SessionFile) -> bool {
    if cache.contains(&file.path) {
        return false;
    }
    match reader.read(&file.path).await {
        Ok(meta) => {
            cache.insert(file.path.clone(), meta);
            true
        }
        Err(e) => {
            tracing::debug!(path = %file.path.display(), error = %e, "Metadata load failed");
            false
        }
    }
}
