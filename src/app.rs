use std::collections::HashSet;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::loader::{TaskRef, TraceIndex};
use crate::trace::TraceSession;

/// Which panel is focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPanel {
    Index,
    Timeline,
    Stats,
}

/// What a flattened index row represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    Benchmark,
    Config,
    Task(TaskRef),
}

/// A flattened row in the index tree, ready for rendering.
#[derive(Debug, Clone)]
pub struct IndexRow {
    pub id: String,
    pub label: String,
    pub depth: usize,
    pub kind: RowKind,
    pub is_expanded: bool,
    pub has_children: bool,
}

/// An action the event loop must carry out on the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    LoadTask(TaskRef),
    Rediscover,
}

pub struct App {
    pub index: TraceIndex,
    pub should_quit: bool,

    // Index tree state.
    pub index_rows: Vec<IndexRow>,
    pub selected_index: usize,
    pub collapsed: HashSet<String>,

    // The active trace. Single owner: replacing it drops the previous
    // session's whole derived tree atomically.
    pub session: Option<TraceSession>,
    pub timeline_scroll: usize,

    pub focus: FocusPanel,
    pub loading: bool,
    pub status: Option<String>,
}

impl App {
    pub fn new() -> Self {
        Self {
            index: TraceIndex::default(),
            should_quit: false,
            index_rows: Vec::new(),
            selected_index: 0,
            collapsed: HashSet::new(),
            session: None,
            timeline_scroll: 0,
            focus: FocusPanel::Index,
            loading: false,
            status: None,
        }
    }

    /// Install a freshly discovered index. Starts with all configs collapsed.
    pub fn set_index(&mut self, index: TraceIndex) {
        self.collapsed = index
            .benchmarks
            .iter()
            .flat_map(|b| b.configs.iter().map(move |c| config_id(&b.name, &c.name)))
            .collect();
        self.index = index;
        self.loading = false;
        self.status = Some(format!(
            "{} benchmarks, {} tasks",
            self.index.benchmarks.len(),
            self.index.task_count()
        ));
        self.rebuild_index_rows();
        if self.selected_index >= self.index_rows.len() {
            self.selected_index = self.index_rows.len().saturating_sub(1);
        }
    }

    /// Install a loaded trace session, replacing any previous one.
    pub fn set_session(&mut self, session: Box<TraceSession>) {
        self.status = Some(format!(
            "loaded {} ({} timeline items)",
            session.record.task_id,
            session.timeline.len()
        ));
        self.session = Some(*session);
        self.timeline_scroll = 0;
        self.loading = false;
        self.focus = FocusPanel::Timeline;
    }

    /// Record a failed discovery or load. The previous session and the index
    /// stay intact.
    pub fn set_load_failed(&mut self, message: String) {
        self.status = Some(message);
        self.loading = false;
    }

    /// Rebuild the flattened index rows from the index + collapsed state.
    pub fn rebuild_index_rows(&mut self) {
        let mut rows = Vec::new();
        for bench in &self.index.benchmarks {
            let bench_id = bench.name.clone();
            let bench_expanded = !self.collapsed.contains(&bench_id);
            rows.push(IndexRow {
                id: bench_id.clone(),
                label: bench.name.clone(),
                depth: 0,
                kind: RowKind::Benchmark,
                is_expanded: bench_expanded,
                has_children: !bench.configs.is_empty(),
            });
            if !bench_expanded {
                continue;
            }
            for config in &bench.configs {
                let cfg_id = config_id(&bench.name, &config.name);
                let cfg_expanded = !self.collapsed.contains(&cfg_id);
                rows.push(IndexRow {
                    id: cfg_id,
                    label: config.name.clone(),
                    depth: 1,
                    kind: RowKind::Config,
                    is_expanded: cfg_expanded,
                    has_children: !config.tasks.is_empty(),
                });
                if !cfg_expanded {
                    continue;
                }
                for task in &config.tasks {
                    rows.push(IndexRow {
                        id: task.path.clone(),
                        label: task.task_id().to_string(),
                        depth: 2,
                        kind: RowKind::Task(task.clone()),
                        is_expanded: false,
                        has_children: false,
                    });
                }
            }
        }
        self.index_rows = rows;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                None
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                None
            }
            KeyCode::Tab => {
                self.cycle_focus();
                None
            }
            KeyCode::Char('r') => {
                self.loading = true;
                self.status = Some("re-discovering traces...".into());
                Some(Command::Rediscover)
            }
            _ if self.focus == FocusPanel::Index => self.handle_index_key(key),
            _ if self.focus == FocusPanel::Timeline => {
                self.handle_timeline_key(key);
                None
            }
            _ => None,
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.scroll_focused(-3),
            MouseEventKind::ScrollDown => self.scroll_focused(3),
            _ => {}
        }
    }

    fn handle_index_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('g') => self.selected_index = 0,
            KeyCode::Char('G') => {
                self.selected_index = self.index_rows.len().saturating_sub(1);
            }
            KeyCode::PageDown => self.move_selection(20),
            KeyCode::PageUp => self.move_selection(-20),
            KeyCode::Char('h') | KeyCode::Left => self.collapse_current(),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => {
                return self.activate_current();
            }
            _ => {}
        }
        None
    }

    fn handle_timeline_key(&mut self, key: KeyEvent) {
        let len = self.session.as_ref().map_or(0, |s| s.timeline.len());
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.timeline_scroll = (self.timeline_scroll + 1).min(len.saturating_sub(1));
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.timeline_scroll = self.timeline_scroll.saturating_sub(1);
            }
            KeyCode::Char('g') => self.timeline_scroll = 0,
            KeyCode::Char('G') => self.timeline_scroll = len.saturating_sub(1),
            KeyCode::PageDown => {
                self.timeline_scroll = (self.timeline_scroll + 10).min(len.saturating_sub(1));
            }
            KeyCode::PageUp => {
                self.timeline_scroll = self.timeline_scroll.saturating_sub(10);
            }
            _ => {}
        }
    }

    /// Expand/collapse a header row, or request a load for a task row.
    fn activate_current(&mut self) -> Option<Command> {
        let row = self.index_rows.get(self.selected_index)?;
        match &row.kind {
            RowKind::Task(task) => {
                let task = task.clone();
                self.loading = true;
                self.status = Some(format!("loading {}...", task.name));
                Some(Command::LoadTask(task))
            }
            _ if row.has_children => {
                let id = row.id.clone();
                if !self.collapsed.remove(&id) {
                    self.collapsed.insert(id);
                }
                self.rebuild_index_rows();
                None
            }
            _ => None,
        }
    }

    fn collapse_current(&mut self) {
        if let Some(row) = self.index_rows.get(self.selected_index) {
            if row.has_children && row.is_expanded {
                self.collapsed.insert(row.id.clone());
                self.rebuild_index_rows();
            }
        }
    }

    fn move_selection(&mut self, delta: i32) {
        if self.index_rows.is_empty() {
            return;
        }
        let new_idx = self.selected_index as i32 + delta;
        self.selected_index = new_idx.clamp(0, self.index_rows.len() as i32 - 1) as usize;
    }

    fn scroll_focused(&mut self, delta: i32) {
        match self.focus {
            FocusPanel::Index => self.move_selection(delta),
            FocusPanel::Timeline => {
                let len = self.session.as_ref().map_or(0, |s| s.timeline.len());
                let new = self.timeline_scroll as i32 + delta;
                self.timeline_scroll = new.clamp(0, len.saturating_sub(1) as i32) as usize;
            }
            FocusPanel::Stats => {}
        }
    }

    fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPanel::Index => FocusPanel::Timeline,
            FocusPanel::Timeline => FocusPanel::Stats,
            FocusPanel::Stats => FocusPanel::Index,
        };
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

fn config_id(benchmark: &str, config: &str) -> String {
    format!("{benchmark}/{config}")
}
