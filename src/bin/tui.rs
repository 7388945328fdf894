use std::sync::{atomic::{AtomicBool, Ordering}, Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use crossterm::{event::{self, Event, KeyCode, KeyEventKind}, execute, terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen}};
use ratatui::{backend::CrosstermBackend, Terminal, widgets::{Block, Borders, List, ListItem, Paragraph, ListState}, layout::{Layout, Constraint, Direction}, style::{Style, Modifier, Color}};
use tracing_subscriber::EnvFilter;

use todo_store::{config::StoreConfig, infrastructure::sqlite_storage::SqliteStorage, StoreView, TodoFilter, TodoId, TodoStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = StoreConfig::from_env();
    init_logging(&config.log_file)?;

    let storage = SqliteStorage::connect(&config.database_url).await?;
    let store = TodoStore::open(storage, config.storage_key.clone());
    tracing::info!(database_url = %config.database_url, key = %config.storage_key, "store opened");

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &store, &config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    store.shutdown().await?;
    res
}

/// Logs go to a file; stdout belongs to the terminal UI.
fn init_logging(path: &str) -> Result<()> {
    let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode { View, Create }

struct App<'a> {
    store: &'a TodoStore,
    view: StoreView,
    dirty: Arc<AtomicBool>,
    visible: Vec<TodoId>,
    selected: usize,
    mode: Mode,
    list_state: ListState,
    filter: TodoFilter,
    draft_title: String,
    status: String,
}

impl<'a> App<'a> {
    fn new(store: &'a TodoStore) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));
        let flag = dirty.clone();
        store.subscribe(move |_| flag.store(true, Ordering::Release));
        App { store, view: StoreView::default(), dirty, visible: Vec::new(), selected: 0, mode: Mode::View, list_state: ListState::default(), filter: TodoFilter::All, draft_title: String::new(), status: String::new() }
    }

    fn refresh(&mut self) {
        if self.dirty.swap(false, Ordering::AcqRel) { self.view = self.store.view(); }
        self.visible = self.view.visible(self.filter).map(|t| t.id.clone()).collect();
        // Clamp selection within filtered bounds
        let len = self.visible.len();
        if len == 0 { self.selected = 0; self.list_state.select(None); }
        else { if self.selected >= len { self.selected = len - 1; } self.list_state.select(Some(self.selected)); }
    }

    fn selected_id(&self) -> Option<TodoId> { self.visible.get(self.selected).cloned() }
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, store: &TodoStore, config: &StoreConfig) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut app = App::new(store);

    loop {
        app.refresh();
        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Min(1),
                    Constraint::Length(3),
                ])
                .split(f.size());

            let header = Paragraph::new("Todos (Enter/Space: toggle, n: new, d: delete, f: filter, q: quit)")
                .block(Block::default().borders(Borders::ALL).title("todo-tui"));
            f.render_widget(header, chunks[0]);

            let list_items: Vec<ListItem> = app.view.visible(app.filter).map(|t| {
                let mark = if t.done { "[x]" } else { "[ ]" };
                ListItem::new(format!("{} {}", mark, t.title))
            }).collect();
            let title = if app.view.is_loading {
                format!("items [{}] loading...", app.filter.label())
            } else {
                format!("items [{}]  done {} / left {}", app.filter.label(), app.view.completed_count(), app.view.remaining_count())
            };
            let list = List::new(list_items)
                .block(Block::default().borders(Borders::ALL).title(title))
                .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::REVERSED))
                .highlight_symbol(">> ");
            f.render_stateful_widget(list, chunks[1], &mut app.list_state);

            let footer_text = match app.mode {
                Mode::View => format!("DATABASE_URL={}  |  {}", config.database_url, app.status),
                Mode::Create => format!("New: {}_  |  (Enter to save, Esc to cancel)", app.draft_title),
            };
            let footer = Paragraph::new(footer_text)
                .block(Block::default().borders(Borders::ALL).title(match app.mode { Mode::View => "info", Mode::Create => "create" }));
            f.render_widget(footer, chunks[2]);
        })?;

        if !event::poll(tick_rate)? { continue; }
        let Event::Key(key) = event::read()? else { continue };
        // Only act on key presses; ignore repeats and releases to prevent duplicate input
        if key.kind != KeyEventKind::Press { continue; }
        match app.mode {
            Mode::View => match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Up => { if app.selected > 0 { app.selected -= 1; } }
                KeyCode::Down => { if app.selected + 1 < app.visible.len() { app.selected += 1; } }
                KeyCode::Enter | KeyCode::Char(' ') => {
                    if let Some(id) = app.selected_id() { store.toggle_todo(&id); }
                }
                KeyCode::Char('n') => {
                    app.mode = Mode::Create;
                    app.draft_title.clear();
                }
                KeyCode::Char('d') => {
                    if let Some(id) = app.selected_id() {
                        if store.delete_todo(&id) && app.selected > 0 { app.selected -= 1; }
                    }
                }
                KeyCode::Char('f') => app.filter = app.filter.next(),
                _ => {}
            },
            Mode::Create => match key.code {
                KeyCode::Esc => { app.mode = Mode::View; app.draft_title.clear(); }
                KeyCode::Enter => {
                    app.status = match store.add_todo(&app.draft_title) {
                        Ok(_) => String::new(),
                        Err(e) => e.to_string(),
                    };
                    app.mode = Mode::View;
                    app.draft_title.clear();
                }
                KeyCode::Backspace => { app.draft_title.pop(); }
                KeyCode::Char(c) => app.draft_title.push(c),
                _ => {}
            },
        }
    }
    Ok(())
}
