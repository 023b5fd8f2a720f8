// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use cabana_app::{
    AppCommand, AppMode, AppState, Cabin, CabinField, CabinFormInput, CabinId, CabinImageField,
    CabinSortField, DashboardCounts, FieldError, FormKind, FormMode, ImageInput, SettingKey,
    SettingValue, Settings, TabKind, ViewState, format_money, parse_money_cents, sort_items,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use std::io;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const MENU_WIDTH: u16 = 14;
const MENU_HEIGHT: u16 = 4;
const MENU_GAP_Y: u16 = 1;
const STATUS_CLEAR_SECS: u64 = 4;

const CABIN_COLUMNS: [&str; 5] = ["image", "cabin", "capacity", "price", "discount"];

const FORM_FIELDS: [CabinField; 6] = [
    CabinField::Name,
    CabinField::MaxCapacity,
    CabinField::RegularPrice,
    CabinField::Discount,
    CabinField::Description,
    CabinField::Image,
];

/// Everything the UI needs from the data layer. The store behind it owns
/// caching and invalidation; these calls are synchronous and may hit the
/// network.
pub trait AppRuntime {
    fn load_cabins(&mut self) -> Result<Vec<Cabin>>;
    fn load_settings(&mut self) -> Result<Settings>;
    fn load_dashboard_counts(&mut self) -> Result<DashboardCounts>;
    fn save_cabin(&mut self, mode: FormMode, input: &CabinFormInput) -> Result<Cabin>;
    fn delete_cabin(&mut self, id: CabinId) -> Result<()>;
    fn update_setting(&mut self, key: SettingKey, value: SettingValue) -> Result<Settings>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Edit,
    Delete,
}

impl MenuItem {
    const ALL: [Self; 2] = [Self::Edit, Self::Delete];

    const fn label(self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }
}

/// One menu id open at a time across every row of the table, plus the
/// screen position recorded when its toggle fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct MenuUiState {
    open: Option<CabinId>,
    position: Option<(u16, u16)>,
    selected: usize,
}

impl MenuUiState {
    fn toggle(&mut self, id: CabinId, anchor: (u16, u16)) {
        if self.open == Some(id) {
            self.close();
        } else {
            self.open = Some(id);
            self.position = Some(anchor);
            self.selected = 0;
        }
    }

    fn close(&mut self) {
        self.open = None;
        self.position = None;
        self.selected = 0;
    }

    fn is_open(self) -> bool {
        self.open.is_some()
    }

    fn move_selection(&mut self, delta: isize) {
        let len = MenuItem::ALL.len() as isize;
        let next = (self.selected as isize + delta).rem_euclid(len);
        self.selected = next as usize;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FormUiState {
    mode: FormMode,
    fields: [String; 6],
    cursor: usize,
    errors: Vec<FieldError>,
}

impl FormUiState {
    fn blank() -> Self {
        let mut fields: [String; 6] = Default::default();
        fields[field_index(CabinField::Discount)] = "0".to_owned();
        Self {
            mode: FormMode::Create,
            fields,
            cursor: 0,
            errors: Vec::new(),
        }
    }

    fn for_edit(cabin: &Cabin) -> Self {
        let mut fields: [String; 6] = Default::default();
        fields[field_index(CabinField::Name)] = cabin.name.clone();
        fields[field_index(CabinField::MaxCapacity)] = cabin.max_capacity.to_string();
        fields[field_index(CabinField::RegularPrice)] = money_field(cabin.regular_price_cents);
        fields[field_index(CabinField::Discount)] = money_field(cabin.discount_cents);
        fields[field_index(CabinField::Description)] = cabin.description.clone();
        // The image field is a file path; leaving it empty keeps the
        // record's stored image.
        Self {
            mode: FormMode::Edit(cabin.id),
            fields,
            cursor: 0,
            errors: Vec::new(),
        }
    }

    fn error_for(&self, field: CabinField) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CabinRowView {
    id: CabinId,
    cells: [String; 5],
}

#[derive(Debug, Clone, PartialEq, Default)]
struct CabinsProjection {
    rows: Vec<CabinRowView>,
}

#[derive(Debug)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Default)]
struct ViewData {
    cabins: Option<Vec<Cabin>>,
    settings: Option<Settings>,
    counts: Option<DashboardCounts>,
    view: ViewState,
    selected_row: usize,
    menu: MenuUiState,
    form: Option<FormUiState>,
    settings_selected: usize,
    settings_buffer: String,
    busy: bool,
    status_token: u64,
    table_area: Rect,
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    initial_view: ViewState,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData {
        view: initial_view,
        ..ViewData::default()
    };
    let (internal_tx, internal_rx) = mpsc::channel();

    if let Err(error) = refresh_view_data(runtime, &mut view_data) {
        state.dispatch(AppCommand::SetStatus(format!("load failed: {error:#}")));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);

        let size = terminal.size().context("read terminal size")?;
        view_data.table_area = layout_chunks(Rect::new(0, 0, size.width, size.height)).1;

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event
            && let Event::Key(key) = event::read().context("read event")?
            && handle_key_event(state, runtime, &mut view_data, &internal_tx, key)
        {
            break;
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(STATUS_CLEAR_SECS));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn refresh_view_data<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) -> Result<()> {
    view_data.cabins = Some(runtime.load_cabins()?);
    view_data.counts = Some(runtime.load_dashboard_counts()?);
    view_data.settings = Some(runtime.load_settings()?);
    clamp_cabin_cursor(view_data);
    Ok(())
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    // The open popover captures the keyboard the way an open popover
    // captures the pointer: its own keys act on it, anything else
    // dismisses it.
    if view_data.menu.is_open() {
        handle_menu_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    match state.mode {
        AppMode::Form(FormKind::Cabin) => {
            handle_form_key(state, runtime, view_data, internal_tx, key);
            false
        }
        AppMode::Edit => {
            handle_setting_edit_key(state, runtime, view_data, internal_tx, key);
            false
        }
        AppMode::Nav => handle_nav_key(state, view_data, internal_tx, key),
    }
}

fn handle_nav_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab => {
            state.dispatch(AppCommand::NextTab);
        }
        KeyCode::BackTab => {
            state.dispatch(AppCommand::PrevTab);
        }
        _ => match state.active_tab {
            TabKind::Cabins => handle_cabins_key(state, view_data, internal_tx, key),
            TabKind::Settings => handle_settings_key(state, view_data, key),
            TabKind::Dashboard => {}
        },
    }
    false
}

fn handle_cabins_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => move_cabin_cursor(view_data, 1),
        KeyCode::Char('k') | KeyCode::Up => move_cabin_cursor(view_data, -1),
        KeyCode::Char('f') => {
            view_data.view.discount = view_data.view.discount.next();
            clamp_cabin_cursor(view_data);
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("filter {}", view_data.view.discount.as_str()),
            );
        }
        KeyCode::Char('s') => {
            view_data.view.sort.field = next_sort_field(view_data.view.sort.field);
            emit_status(
                state,
                view_data,
                internal_tx,
                format!(
                    "sort {} {}",
                    view_data.view.sort.field.label(),
                    view_data.view.sort.direction.as_str()
                ),
            );
        }
        KeyCode::Char('r') => {
            view_data.view.sort.direction = view_data.view.sort.direction.toggled();
            emit_status(
                state,
                view_data,
                internal_tx,
                format!(
                    "sort {} {}",
                    view_data.view.sort.field.label(),
                    view_data.view.sort.direction.as_str()
                ),
            );
        }
        KeyCode::Char('x') => {
            view_data.view = ViewState::default();
            clamp_cabin_cursor(view_data);
            emit_status(state, view_data, internal_tx, "view reset");
        }
        KeyCode::Char('n') => {
            view_data.form = Some(FormUiState::blank());
            state.dispatch(AppCommand::OpenForm(FormKind::Cabin));
        }
        KeyCode::Char('e') => {
            if let Some(cabin) = selected_cabin(view_data) {
                view_data.form = Some(FormUiState::for_edit(&cabin));
                state.dispatch(AppCommand::OpenForm(FormKind::Cabin));
            }
        }
        KeyCode::Char('m') | KeyCode::Enter => {
            if let Some(id) = selected_cabin_id(view_data) {
                let anchor = menu_anchor(view_data.table_area, view_data.selected_row);
                view_data.menu.toggle(id, anchor);
            }
        }
        _ => {}
    }
}

fn handle_menu_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => view_data.menu.move_selection(1),
        KeyCode::Char('k') | KeyCode::Up => view_data.menu.move_selection(-1),
        KeyCode::Char('m') => view_data.menu.close(),
        KeyCode::Enter => {
            let Some(id) = view_data.menu.open else {
                return;
            };
            let item = MenuItem::ALL[view_data.menu.selected];
            // Close before reporting the outcome: selection always
            // dismisses the popover, whatever the action does.
            view_data.menu.close();
            run_menu_action(state, runtime, view_data, internal_tx, id, item);
        }
        // Anything else is an outside interaction and only dismisses.
        _ => view_data.menu.close(),
    }
}

fn run_menu_action<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    id: CabinId,
    item: MenuItem,
) {
    match item {
        MenuItem::Edit => {
            let Some(cabin) = cabin_by_id(view_data, id) else {
                emit_status(state, view_data, internal_tx, "cabin is gone; refresh");
                return;
            };
            view_data.form = Some(FormUiState::for_edit(&cabin));
            state.dispatch(AppCommand::OpenForm(FormKind::Cabin));
        }
        MenuItem::Delete => delete_cabin(state, runtime, view_data, internal_tx, id),
    }
}

fn delete_cabin<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    id: CabinId,
) {
    // The busy flag is the disabled-control guard. The call below blocks
    // the event loop, so the window for a duplicate activation is one
    // already-queued key event; that gap is accepted, not defended.
    if view_data.busy {
        return;
    }
    view_data.busy = true;
    let outcome = runtime.delete_cabin(id);
    view_data.busy = false;

    match outcome {
        Ok(()) => {
            if let Err(error) = refresh_view_data(runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("reload failed: {error:#}"));
                return;
            }
            emit_status(state, view_data, internal_tx, "cabin deleted");
        }
        Err(error) => {
            // The row stays visible; the cached set was left untouched.
            emit_status(state, view_data, internal_tx, format!("{error:#}"));
        }
    }
}

fn handle_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
        submit_cabin_form(state, runtime, view_data, internal_tx);
        return;
    }

    let Some(form) = view_data.form.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };

    match key.code {
        KeyCode::Esc => {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Tab | KeyCode::Down => form.cursor = (form.cursor + 1) % FORM_FIELDS.len(),
        KeyCode::BackTab | KeyCode::Up => {
            form.cursor = (form.cursor + FORM_FIELDS.len() - 1) % FORM_FIELDS.len();
        }
        KeyCode::Enter => {
            if form.cursor + 1 == FORM_FIELDS.len() {
                submit_cabin_form(state, runtime, view_data, internal_tx);
            } else {
                form.cursor += 1;
            }
        }
        KeyCode::Backspace => {
            form.fields[form.cursor].pop();
        }
        KeyCode::Char(c) => form.fields[form.cursor].push(c),
        _ => {}
    }
}

fn submit_cabin_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if view_data.busy {
        return;
    }
    let Some(form) = view_data.form.as_mut() else {
        return;
    };
    let mode = form.mode;

    let input = match parse_form_input(form) {
        Ok(input) => input,
        Err(errors) => {
            form.errors = errors;
            emit_status(state, view_data, internal_tx, "fix the highlighted fields");
            return;
        }
    };
    form.errors.clear();

    view_data.busy = true;
    let outcome = runtime.save_cabin(mode, &input);
    view_data.busy = false;

    match outcome {
        Ok(_) => {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            if let Err(error) = refresh_view_data(runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("reload failed: {error:#}"));
                return;
            }
            let message = match mode {
                FormMode::Create => "new cabin created",
                FormMode::Edit(_) => "cabin saved",
            };
            emit_status(state, view_data, internal_tx, message);
        }
        Err(error) => {
            // Phase-specific message from the save saga; the form keeps the
            // attempted values for correction and resubmission.
            emit_status(state, view_data, internal_tx, format!("{error:#}"));
        }
    }
}

/// Turns the raw field strings into a typed payload, collecting every
/// parse and validation failure against its field.
fn parse_form_input(form: &FormUiState) -> std::result::Result<CabinFormInput, Vec<FieldError>> {
    let mut errors = Vec::new();

    let max_capacity = match parse_count(&form.fields[field_index(CabinField::MaxCapacity)]) {
        Some(value) => value,
        None => {
            errors.push(FieldError {
                field: CabinField::MaxCapacity,
                message: "enter a whole number".to_owned(),
            });
            0
        }
    };
    let regular_price_cents =
        match parse_money_cents(&form.fields[field_index(CabinField::RegularPrice)]) {
            Some(value) => value,
            None => {
                errors.push(FieldError {
                    field: CabinField::RegularPrice,
                    message: "enter an amount such as 450 or 450.50".to_owned(),
                });
                0
            }
        };
    let discount_cents = match parse_money_cents(&form.fields[field_index(CabinField::Discount)]) {
        Some(value) => value,
        None => {
            errors.push(FieldError {
                field: CabinField::Discount,
                message: "enter an amount such as 0 or 25.50".to_owned(),
            });
            0
        }
    };

    let image_path = form.fields[field_index(CabinField::Image)].trim();
    let image = if image_path.is_empty() {
        CabinImageField::Keep
    } else {
        match read_image_file(image_path) {
            Ok(image) => CabinImageField::Upload(image),
            Err(error) => {
                errors.push(FieldError {
                    field: CabinField::Image,
                    message: format!("{error:#}"),
                });
                CabinImageField::Keep
            }
        }
    };

    let input = CabinFormInput {
        name: form.fields[field_index(CabinField::Name)].clone(),
        max_capacity,
        regular_price_cents,
        discount_cents,
        description: form.fields[field_index(CabinField::Description)].clone(),
        image,
    };

    let mut field_errors = input.field_errors(form.mode);
    field_errors.retain(|candidate| {
        errors
            .iter()
            .all(|existing| existing.field != candidate.field)
    });
    errors.extend(field_errors);

    if errors.is_empty() { Ok(input) } else { Err(errors) }
}

fn parse_count(raw: &str) -> Option<i32> {
    raw.trim().parse().ok()
}

fn read_image_file(path: &str) -> Result<ImageInput> {
    let data = std::fs::read(path).with_context(|| format!("read image file {path}"))?;
    let file_name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_owned());
    Ok(ImageInput {
        content_type: content_type_for(&file_name),
        file_name,
        data,
    })
}

fn content_type_for(file_name: &str) -> String {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
    .to_owned()
}

fn handle_settings_key(state: &mut AppState, view_data: &mut ViewData, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            view_data.settings_selected = (view_data.settings_selected + 1) % SettingKey::ALL.len();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.settings_selected =
                (view_data.settings_selected + SettingKey::ALL.len() - 1) % SettingKey::ALL.len();
        }
        KeyCode::Char('e') | KeyCode::Enter => {
            if view_data.settings.is_some() {
                view_data.settings_buffer.clear();
                state.dispatch(AppCommand::EnterEditMode);
            }
        }
        _ => {}
    }
}

fn handle_setting_edit_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            view_data.settings_buffer.clear();
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Backspace => {
            view_data.settings_buffer.pop();
        }
        KeyCode::Enter => {
            let key_under_edit = SettingKey::ALL[view_data.settings_selected];
            let Some(value) =
                SettingValue::parse_for_key(key_under_edit, &view_data.settings_buffer)
            else {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("invalid value for {}", key_under_edit.label()),
                );
                return;
            };
            match runtime.update_setting(key_under_edit, value) {
                Ok(settings) => {
                    view_data.settings = Some(settings);
                    view_data.settings_buffer.clear();
                    state.dispatch(AppCommand::ExitToNav);
                    emit_status(state, view_data, internal_tx, "setting saved");
                }
                Err(error) => {
                    emit_status(state, view_data, internal_tx, format!("{error:#}"));
                }
            }
        }
        KeyCode::Char(c) => view_data.settings_buffer.push(c),
        _ => {}
    }
}

fn next_sort_field(field: CabinSortField) -> CabinSortField {
    let fields = CabinSortField::ALL;
    let current = fields.iter().position(|f| *f == field).unwrap_or(0);
    fields[(current + 1) % fields.len()]
}

/// The filter → sort → render pipeline. A record set that has not loaded
/// yet flows through as `None` so nothing downstream filters, sorts, or
/// panics on missing data.
fn project_cabins(cabins: Option<&[Cabin]>, view: ViewState) -> Option<CabinsProjection> {
    let cabins = cabins?;
    let filtered: Vec<Cabin> = cabins
        .iter()
        .filter(|cabin| view.discount.keeps(cabin.discount_cents))
        .cloned()
        .collect();
    let sorted = sort_items(
        &filtered,
        |cabin| cabin.sort_value(view.sort.field),
        view.sort.direction,
    );
    Some(CabinsProjection {
        rows: sorted.iter().map(cabin_row_view).collect(),
    })
}

fn cabin_row_view(cabin: &Cabin) -> CabinRowView {
    let discount = if cabin.discount_cents > 0 {
        format_money(cabin.discount_cents)
    } else {
        "\u{2014}".to_owned()
    };
    CabinRowView {
        id: cabin.id,
        cells: [
            image_marker(&cabin.image),
            cabin.name.clone(),
            format!("Fits up to {} guests", cabin.max_capacity),
            format_money(cabin.regular_price_cents),
            discount,
        ],
    }
}

fn image_marker(url: &str) -> String {
    let name = url.rsplit('/').next().unwrap_or(url);
    truncate_label(name, 12)
}

fn truncate_label(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_owned();
    }
    let mut out: String = value.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('\u{2026}');
    out
}

fn selected_cabin_id(view_data: &ViewData) -> Option<CabinId> {
    let projection = project_cabins(view_data.cabins.as_deref(), view_data.view)?;
    projection
        .rows
        .get(view_data.selected_row)
        .map(|row| row.id)
}

fn selected_cabin(view_data: &ViewData) -> Option<Cabin> {
    let id = selected_cabin_id(view_data)?;
    cabin_by_id(view_data, id)
}

fn cabin_by_id(view_data: &ViewData, id: CabinId) -> Option<Cabin> {
    view_data
        .cabins
        .as_ref()?
        .iter()
        .find(|cabin| cabin.id == id)
        .cloned()
}

fn visible_row_count(view_data: &ViewData) -> usize {
    project_cabins(view_data.cabins.as_deref(), view_data.view)
        .map(|projection| projection.rows.len())
        .unwrap_or(0)
}

fn move_cabin_cursor(view_data: &mut ViewData, delta: isize) {
    let rows = visible_row_count(view_data);
    if rows == 0 {
        view_data.selected_row = 0;
        return;
    }
    let next = view_data.selected_row as isize + delta;
    view_data.selected_row = next.clamp(0, rows as isize - 1) as usize;
}

fn clamp_cabin_cursor(view_data: &mut ViewData) {
    let rows = visible_row_count(view_data);
    if rows == 0 {
        view_data.selected_row = 0;
    } else if view_data.selected_row >= rows {
        view_data.selected_row = rows - 1;
    }
}

fn menu_anchor(table_area: Rect, row_index: usize) -> (u16, u16) {
    // Right edge of the row, one line below it; the border and the header
    // row sit above the first data row.
    let x = table_area.right().saturating_sub(MENU_WIDTH + 1);
    let y = table_area
        .y
        .saturating_add(2)
        .saturating_add(row_index as u16)
        .saturating_add(MENU_GAP_Y);
    (x, y)
}

fn menu_rect(position: (u16, u16), frame: Rect) -> Rect {
    let width = MENU_WIDTH.min(frame.width);
    let height = MENU_HEIGHT.min(frame.height);
    let x = position.0.min(frame.right().saturating_sub(width));
    let y = position.1.min(frame.bottom().saturating_sub(height));
    Rect::new(x, y, width, height)
}

fn layout_chunks(area: Rect) -> (Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);
    (chunks[0], chunks[1], chunks[2])
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let (tabs_area, body_area, status_area) = layout_chunks(frame.area());

    let tabs = Paragraph::new(tabs_line(state));
    frame.render_widget(tabs, tabs_area);

    match state.active_tab {
        TabKind::Dashboard => render_dashboard(frame, body_area, view_data),
        TabKind::Cabins => render_cabins(frame, body_area, view_data),
        TabKind::Settings => render_settings(frame, body_area, state, view_data),
    }

    if let Some(form) = &view_data.form {
        render_form_overlay(frame, form, view_data.busy);
    }

    if view_data.menu.is_open()
        && let Some(position) = view_data.menu.position
    {
        render_menu_overlay(frame, position, view_data.menu.selected);
    }

    let status = Paragraph::new(status_text(state, view_data));
    frame.render_widget(status, status_area);
}

fn tabs_line(state: &AppState) -> String {
    TabKind::ALL
        .iter()
        .map(|tab| {
            if *tab == state.active_tab {
                format!("[{}]", tab.label())
            } else {
                format!(" {} ", tab.label())
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_dashboard(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let body = Paragraph::new(render_dashboard_text(view_data))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("dashboard"));
    frame.render_widget(body, area);
}

fn render_dashboard_text(view_data: &ViewData) -> String {
    let Some(counts) = &view_data.counts else {
        return "loading...".to_owned();
    };
    let mut out = String::new();
    out.push_str(&format!("cabins          {}\n", counts.cabins));
    out.push_str(&format!("with discount   {}\n", counts.with_discount));
    out.push_str(&format!("no discount     {}\n", counts.no_discount));
    if let Some(settings) = &view_data.settings {
        out.push_str(&format!(
            "\nstays of {}-{} nights, up to {} guests, breakfast {}\n",
            settings.min_booking_length,
            settings.max_booking_length,
            settings.max_guests_per_booking,
            format_money(settings.breakfast_price_cents),
        ));
    }
    out
}

fn render_cabins(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let title = cabins_title(view_data.view);
    let Some(projection) = project_cabins(view_data.cabins.as_deref(), view_data.view) else {
        let placeholder = Paragraph::new("loading cabins...")
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(placeholder, area);
        return;
    };

    let widths = [
        Constraint::Length(14),
        Constraint::Min(10),
        Constraint::Min(18),
        Constraint::Length(10),
        Constraint::Length(10),
    ];
    let header = Row::new(CABIN_COLUMNS.iter().map(|label| {
        Cell::from(*label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let rows = projection.rows.iter().enumerate().map(|(index, row)| {
        let mut style = Style::default();
        if index == view_data.selected_row {
            style = style.bg(Color::DarkGray);
        }
        Row::new(row.cells.iter().map(|cell| Cell::from(cell.clone()))).style(style)
    });

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, area);
}

fn cabins_title(view: ViewState) -> String {
    let encoded = view.encode();
    if encoded.is_empty() {
        "cabins".to_owned()
    } else {
        format!("cabins [{encoded}]")
    }
}

fn render_settings(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
) {
    let body = Paragraph::new(render_settings_text(state, view_data))
        .block(Block::default().borders(Borders::ALL).title("settings"));
    frame.render_widget(body, area);
}

fn render_settings_text(state: &AppState, view_data: &ViewData) -> String {
    let Some(settings) = &view_data.settings else {
        return "loading settings...".to_owned();
    };

    let mut out = String::new();
    for (index, key) in SettingKey::ALL.iter().enumerate() {
        let marker = if index == view_data.settings_selected {
            '>'
        } else {
            ' '
        };
        let value = if state.mode == AppMode::Edit && index == view_data.settings_selected {
            format!("{}_", view_data.settings_buffer)
        } else {
            settings.value(*key).display()
        };
        out.push_str(&format!("{marker} {:<22} {value}\n", key.label()));
    }
    out
}

fn render_form_overlay(frame: &mut ratatui::Frame<'_>, form: &FormUiState, busy: bool) {
    let area = centered_rect(64, 80, frame.area());
    frame.render_widget(Clear, area);

    let title = match form.mode {
        FormMode::Create => "new cabin",
        FormMode::Edit(_) => "edit cabin",
    };
    let body = Paragraph::new(render_form_text(form, busy))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(body, area);
}

fn render_form_text(form: &FormUiState, busy: bool) -> String {
    let mut out = String::new();
    for (index, field) in FORM_FIELDS.iter().enumerate() {
        let marker = if index == form.cursor { '>' } else { ' ' };
        let value = &form.fields[index];
        out.push_str(&format!("{marker} {:<18} {value}\n", field.label()));
        if let Some(message) = form.error_for(*field) {
            out.push_str(&format!("    ! {message}\n"));
        }
    }
    out.push('\n');
    if busy {
        out.push_str("saving...\n");
    } else {
        out.push_str("enter next field / submit on last -- ctrl+s submit -- esc cancel\n");
        if form.mode.is_edit() {
            out.push_str("leave the photo path empty to keep the current image\n");
        }
    }
    out
}

fn render_menu_overlay(frame: &mut ratatui::Frame<'_>, position: (u16, u16), selected: usize) {
    let area = menu_rect(position, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = String::new();
    for (index, item) in MenuItem::ALL.iter().enumerate() {
        let marker = if index == selected { '>' } else { ' ' };
        lines.push_str(&format!("{marker} {}\n", item.label()));
    }
    let menu = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    frame.render_widget(menu, area);
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if let Some(status) = &state.status_line {
        return status.clone();
    }
    if view_data.busy {
        return "working...".to_owned();
    }
    match state.mode {
        AppMode::Form(_) => "editing form".to_owned(),
        AppMode::Edit => "enter save -- esc cancel".to_owned(),
        AppMode::Nav => match state.active_tab {
            TabKind::Cabins => {
                "q quit  tab switch  j/k move  n new  e edit  m menu  f filter  s sort  r reverse"
                    .to_owned()
            }
            TabKind::Settings => "q quit  tab switch  j/k move  e edit value".to_owned(),
            TabKind::Dashboard => "q quit  tab switch".to_owned(),
        },
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}

fn money_field(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

const fn field_index(field: CabinField) -> usize {
    match field {
        CabinField::Name => 0,
        CabinField::MaxCapacity => 1,
        CabinField::RegularPrice => 2,
        CabinField::Discount => 3,
        CabinField::Description => 4,
        CabinField::Image => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, CabinsProjection, FormUiState, InternalEvent, MenuItem, MenuUiState, ViewData,
        cabins_title, field_index, handle_key_event, menu_anchor, menu_rect, money_field,
        parse_form_input, project_cabins, render_dashboard_text, render_form_text,
        render_settings_text, status_text,
    };
    use anyhow::{Result, anyhow};
    use cabana_app::{
        AppMode, AppState, Cabin, CabinField, CabinFormInput, CabinId, CabinImageField,
        CabinSortField, DashboardCounts, DiscountFilter, FormKind, FormMode, SettingKey,
        SettingValue, Settings, SortDirection, SortSpec, TabKind, ViewState,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::layout::Rect;
    use std::io::Write;
    use std::sync::mpsc;
    use time::OffsetDateTime;

    fn cabin(id: i64, name: &str, price: i64, discount: i64) -> Cabin {
        Cabin {
            id: CabinId::new(id),
            name: name.to_owned(),
            max_capacity: 4,
            regular_price_cents: price,
            discount_cents: discount,
            description: "A cabin".to_owned(),
            image: format!("https://x.example/cabin-images/{id}.jpg"),
            created_at: OffsetDateTime::from_unix_timestamp(1_767_225_600 + id)
                .expect("valid unix timestamp"),
        }
    }

    #[derive(Debug)]
    struct TestRuntime {
        cabins: Vec<Cabin>,
        settings: Settings,
        load_calls: usize,
        delete_calls: usize,
        save_calls: usize,
        fail_deletes: bool,
        fail_saves: bool,
        last_save: Option<(FormMode, CabinFormInput)>,
    }

    impl TestRuntime {
        fn with_cabins(cabins: Vec<Cabin>) -> Self {
            Self {
                cabins,
                settings: Settings {
                    id: 1,
                    min_booking_length: 3,
                    max_booking_length: 30,
                    max_guests_per_booking: 8,
                    breakfast_price_cents: 1_500,
                },
                load_calls: 0,
                delete_calls: 0,
                save_calls: 0,
                fail_deletes: false,
                fail_saves: false,
                last_save: None,
            }
        }
    }

    impl AppRuntime for TestRuntime {
        fn load_cabins(&mut self) -> Result<Vec<Cabin>> {
            self.load_calls += 1;
            Ok(self.cabins.clone())
        }

        fn load_settings(&mut self) -> Result<Settings> {
            Ok(self.settings)
        }

        fn load_dashboard_counts(&mut self) -> Result<DashboardCounts> {
            Ok(DashboardCounts::from_cabins(&self.cabins))
        }

        fn save_cabin(&mut self, mode: FormMode, input: &CabinFormInput) -> Result<Cabin> {
            self.save_calls += 1;
            self.last_save = Some((mode, input.clone()));
            if self.fail_saves {
                return Err(anyhow!("cabin image could not be uploaded"));
            }
            Ok(cabin(99, &input.name, input.regular_price_cents, 0))
        }

        fn delete_cabin(&mut self, id: CabinId) -> Result<()> {
            self.delete_calls += 1;
            if self.fail_deletes {
                return Err(anyhow!("cabin could not be deleted"));
            }
            self.cabins.retain(|cabin| cabin.id != id);
            Ok(())
        }

        fn update_setting(&mut self, key: SettingKey, value: SettingValue) -> Result<Settings> {
            match (key, value) {
                (SettingKey::BreakfastPrice, SettingValue::Money(cents)) => {
                    self.settings.breakfast_price_cents = cents;
                }
                (SettingKey::MinBookingLength, SettingValue::Count(count)) => {
                    self.settings.min_booking_length = count;
                }
                (SettingKey::MaxBookingLength, SettingValue::Count(count)) => {
                    self.settings.max_booking_length = count;
                }
                (SettingKey::MaxGuestsPerBooking, SettingValue::Count(count)) => {
                    self.settings.max_guests_per_booking = count;
                }
                _ => return Err(anyhow!("value kind does not fit setting")),
            }
            Ok(self.settings)
        }
    }

    fn view_data_with(cabins: Vec<Cabin>) -> ViewData {
        ViewData {
            cabins: Some(cabins),
            table_area: Rect::new(0, 1, 80, 20),
            ..ViewData::default()
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press<R: AppRuntime>(
        state: &mut AppState,
        runtime: &mut R,
        view_data: &mut ViewData,
        code: KeyCode,
    ) -> bool {
        let (tx, _rx) = mpsc::channel::<InternalEvent>();
        handle_key_event(state, runtime, view_data, &tx, key(code))
    }

    fn cabins_state() -> AppState {
        AppState {
            active_tab: TabKind::Cabins,
            ..AppState::default()
        }
    }

    #[test]
    fn projection_short_circuits_while_loading() {
        assert_eq!(project_cabins(None, ViewState::default()), None);
        assert_eq!(
            project_cabins(Some(&[]), ViewState::default()),
            Some(CabinsProjection::default())
        );
    }

    #[test]
    fn projection_filters_then_sorts() {
        let cabins = vec![
            cabin(1, "Aspen", 30_000, 0),
            cabin(2, "Birch", 10_000, 2_000),
            cabin(3, "Cedar", 20_000, 1_000),
        ];
        let view = ViewState {
            discount: DiscountFilter::WithDiscount,
            sort: SortSpec {
                field: CabinSortField::RegularPrice,
                direction: SortDirection::Desc,
            },
        };
        let projection = project_cabins(Some(&cabins), view).expect("data is present");
        let ids: Vec<i64> = projection.rows.iter().map(|row| row.id.get()).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn row_cells_render_money_and_capacity() {
        let projection =
            project_cabins(Some(&[cabin(1, "Aspen", 45_000, 0)]), ViewState::default())
                .expect("data is present");
        let cells = &projection.rows[0].cells;
        assert_eq!(cells[1], "Aspen");
        assert_eq!(cells[2], "Fits up to 4 guests");
        assert_eq!(cells[3], "$450.00");
        assert_eq!(cells[4], "\u{2014}");
    }

    #[test]
    fn menu_allows_at_most_one_open_id() {
        let mut menu = MenuUiState::default();
        let anchor = (10, 5);

        menu.toggle(CabinId::new(1), anchor);
        assert_eq!(menu.open, Some(CabinId::new(1)));

        // Opening another row's menu implicitly closes the first.
        menu.toggle(CabinId::new(2), anchor);
        assert_eq!(menu.open, Some(CabinId::new(2)));

        // Toggling the open row's own control closes it.
        menu.toggle(CabinId::new(2), anchor);
        assert_eq!(menu.open, None);
        assert_eq!(menu.position, None);

        for id in [1, 2, 3, 2, 1] {
            menu.toggle(CabinId::new(id), anchor);
            assert!(menu.open.is_some());
        }
    }

    #[test]
    fn menu_opens_with_anchor_and_any_other_key_dismisses() {
        let mut state = cabins_state();
        let mut runtime = TestRuntime::with_cabins(vec![cabin(1, "Aspen", 30_000, 0)]);
        let mut view_data = view_data_with(runtime.cabins.clone());

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('m'));
        assert!(view_data.menu.is_open());
        assert_eq!(
            view_data.menu.position,
            Some(menu_anchor(view_data.table_area, 0))
        );

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('f'));
        assert!(!view_data.menu.is_open());
        // The dismissing key was swallowed, not applied.
        assert_eq!(view_data.view.discount, DiscountFilter::All);
    }

    #[test]
    fn selecting_delete_closes_the_menu_even_on_failure() {
        let mut state = cabins_state();
        let mut runtime = TestRuntime::with_cabins(vec![cabin(1, "Aspen", 30_000, 0)]);
        runtime.fail_deletes = true;
        let mut view_data = view_data_with(runtime.cabins.clone());

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('m'));
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('j'));
        assert_eq!(MenuItem::ALL[view_data.menu.selected], MenuItem::Delete);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        assert!(!view_data.menu.is_open());
        assert_eq!(runtime.delete_calls, 1);
        // Failure leaves the cached rows untouched and reports the error.
        assert_eq!(view_data.cabins.as_ref().map(Vec::len), Some(1));
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|status| status.contains("could not be deleted"))
        );
    }

    #[test]
    fn successful_delete_refreshes_the_record_set() {
        let mut state = cabins_state();
        let mut runtime =
            TestRuntime::with_cabins(vec![cabin(1, "Aspen", 30_000, 0), cabin(2, "B", 9_000, 0)]);
        let mut view_data = view_data_with(runtime.cabins.clone());

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('m'));
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('j'));
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        assert_eq!(runtime.delete_calls, 1);
        assert_eq!(runtime.load_calls, 1);
        assert_eq!(view_data.cabins.as_ref().map(Vec::len), Some(1));
        assert_eq!(state.status_line.as_deref(), Some("cabin deleted"));
    }

    #[test]
    fn selecting_edit_opens_a_prefilled_form() {
        let mut state = cabins_state();
        let mut runtime = TestRuntime::with_cabins(vec![cabin(7, "Juniper", 62_000, 0)]);
        let mut view_data = view_data_with(runtime.cabins.clone());

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('m'));
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        assert!(!view_data.menu.is_open());
        assert_eq!(state.mode, AppMode::Form(FormKind::Cabin));
        let form = view_data.form.as_ref().expect("form should be open");
        assert_eq!(form.mode, FormMode::Edit(CabinId::new(7)));
        assert_eq!(form.fields[field_index(CabinField::Name)], "Juniper");
        assert_eq!(form.fields[field_index(CabinField::RegularPrice)], "620.00");
        assert_eq!(form.fields[field_index(CabinField::Image)], "");
    }

    #[test]
    fn filter_and_sort_keys_update_the_view_state() {
        let mut state = cabins_state();
        let mut runtime = TestRuntime::with_cabins(vec![cabin(1, "Aspen", 30_000, 0)]);
        let mut view_data = view_data_with(runtime.cabins.clone());

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('f'));
        assert_eq!(view_data.view.discount, DiscountFilter::NoDiscount);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('s'));
        assert_eq!(view_data.view.sort.field, CabinSortField::Name);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('r'));
        assert_eq!(view_data.view.sort.direction, SortDirection::Desc);

        assert_eq!(
            cabins_title(view_data.view),
            "cabins [discount=no-discount&sortBy=name-desc]"
        );

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('x'));
        assert_eq!(view_data.view, ViewState::default());
        assert_eq!(cabins_title(view_data.view), "cabins");
    }

    #[test]
    fn invalid_form_submission_blocks_the_save() {
        let mut state = cabins_state();
        let mut runtime = TestRuntime::with_cabins(Vec::new());
        let mut view_data = view_data_with(Vec::new());

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('n'));
        assert_eq!(state.mode, AppMode::Form(FormKind::Cabin));

        // Submit the blank form from the last field.
        let form = view_data.form.as_mut().expect("form should be open");
        form.cursor = super::FORM_FIELDS.len() - 1;
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        assert_eq!(runtime.save_calls, 0);
        assert_eq!(state.mode, AppMode::Form(FormKind::Cabin));
        let form = view_data.form.as_ref().expect("form stays open");
        assert!(!form.errors.is_empty());
        assert!(form.error_for(CabinField::Name).is_some());
    }

    #[test]
    fn edit_submit_without_image_path_keeps_the_stored_image() {
        let mut state = cabins_state();
        let mut runtime = TestRuntime::with_cabins(vec![cabin(7, "Juniper", 62_000, 0)]);
        let mut view_data = view_data_with(runtime.cabins.clone());

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('e'));
        let form = view_data.form.as_mut().expect("form should be open");
        form.cursor = super::FORM_FIELDS.len() - 1;
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        assert_eq!(runtime.save_calls, 1);
        let (mode, input) = runtime.last_save.as_ref().expect("save was invoked");
        assert_eq!(*mode, FormMode::Edit(CabinId::new(7)));
        assert_eq!(input.image, CabinImageField::Keep);
        // Success resets the form and returns to the table.
        assert_eq!(state.mode, AppMode::Nav);
        assert!(view_data.form.is_none());
        assert_eq!(state.status_line.as_deref(), Some("cabin saved"));
    }

    #[test]
    fn create_submit_reads_the_image_file_and_resets_on_success() {
        let mut state = cabins_state();
        let mut runtime = TestRuntime::with_cabins(Vec::new());
        let mut view_data = view_data_with(Vec::new());

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("lake view.jpg");
        let mut file = std::fs::File::create(&path).expect("create image file");
        file.write_all(&[0xff, 0xd8, 0xff]).expect("write image");

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('n'));
        {
            let form = view_data.form.as_mut().expect("form should be open");
            form.fields[field_index(CabinField::Name)] = "Birch".to_owned();
            form.fields[field_index(CabinField::MaxCapacity)] = "4".to_owned();
            form.fields[field_index(CabinField::RegularPrice)] = "450".to_owned();
            form.fields[field_index(CabinField::Discount)] = "25.50".to_owned();
            form.fields[field_index(CabinField::Description)] = "By the lake".to_owned();
            form.fields[field_index(CabinField::Image)] = path.display().to_string();
            form.cursor = super::FORM_FIELDS.len() - 1;
        }
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        assert_eq!(runtime.save_calls, 1);
        let (mode, input) = runtime.last_save.as_ref().expect("save was invoked");
        assert_eq!(*mode, FormMode::Create);
        assert_eq!(input.regular_price_cents, 45_000);
        assert_eq!(input.discount_cents, 2_550);
        match &input.image {
            CabinImageField::Upload(image) => {
                assert_eq!(image.file_name, "lake view.jpg");
                assert_eq!(image.content_type, "image/jpeg");
                assert_eq!(image.data, vec![0xff, 0xd8, 0xff]);
            }
            CabinImageField::Keep => panic!("expected an upload payload"),
        }
        assert!(view_data.form.is_none());
        assert_eq!(state.status_line.as_deref(), Some("new cabin created"));
    }

    #[test]
    fn failed_save_keeps_the_form_populated() {
        let mut state = cabins_state();
        let mut runtime = TestRuntime::with_cabins(vec![cabin(7, "Juniper", 62_000, 0)]);
        runtime.fail_saves = true;
        let mut view_data = view_data_with(runtime.cabins.clone());

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('e'));
        let form = view_data.form.as_mut().expect("form should be open");
        form.cursor = super::FORM_FIELDS.len() - 1;
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        assert_eq!(runtime.save_calls, 1);
        assert_eq!(state.mode, AppMode::Form(FormKind::Cabin));
        let form = view_data.form.as_ref().expect("form stays open");
        assert_eq!(form.fields[field_index(CabinField::Name)], "Juniper");
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|status| status.contains("could not be uploaded"))
        );
    }

    #[test]
    fn parse_errors_are_field_scoped() {
        let mut form = FormUiState::blank();
        form.fields[field_index(CabinField::Name)] = "Birch".to_owned();
        form.fields[field_index(CabinField::MaxCapacity)] = "several".to_owned();
        form.fields[field_index(CabinField::RegularPrice)] = "lots".to_owned();
        form.fields[field_index(CabinField::Description)] = "x".to_owned();
        form.fields[field_index(CabinField::Image)] = String::new();

        let errors = parse_form_input(&form).expect_err("parse should fail");
        let fields: Vec<_> = errors.iter().map(|error| error.field).collect();
        assert!(fields.contains(&CabinField::MaxCapacity));
        assert!(fields.contains(&CabinField::RegularPrice));
        assert!(fields.contains(&CabinField::Image));
        // One error per field, parse errors win over validation errors.
        assert_eq!(
            fields.iter().filter(|f| **f == CabinField::RegularPrice).count(),
            1
        );
    }

    #[test]
    fn settings_edit_round_trip() {
        let mut state = AppState {
            active_tab: TabKind::Settings,
            ..AppState::default()
        };
        let mut runtime = TestRuntime::with_cabins(Vec::new());
        let mut view_data = view_data_with(Vec::new());
        view_data.settings = Some(runtime.settings);
        view_data.settings_selected = 3;

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('e'));
        assert_eq!(state.mode, AppMode::Edit);
        for c in "18.00".chars() {
            press(&mut state, &mut runtime, &mut view_data, KeyCode::Char(c));
        }
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(
            view_data.settings.expect("settings loaded").breakfast_price_cents,
            1_800
        );
        assert_eq!(state.status_line.as_deref(), Some("setting saved"));
    }

    #[test]
    fn invalid_setting_value_keeps_edit_mode() {
        let mut state = AppState {
            active_tab: TabKind::Settings,
            ..AppState::default()
        };
        let mut runtime = TestRuntime::with_cabins(Vec::new());
        let mut view_data = view_data_with(Vec::new());
        view_data.settings = Some(runtime.settings);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('e'));
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('0'));
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        assert_eq!(state.mode, AppMode::Edit);
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|status| status.contains("invalid value"))
        );
    }

    #[test]
    fn menu_rect_is_clamped_to_the_frame() {
        let frame = Rect::new(0, 0, 40, 12);
        let rect = menu_rect((200, 200), frame);
        assert!(rect.right() <= frame.right());
        assert!(rect.bottom() <= frame.bottom());
    }

    #[test]
    fn dashboard_and_settings_render_from_loaded_data() {
        let mut view_data = view_data_with(vec![
            cabin(1, "Aspen", 30_000, 0),
            cabin(2, "Birch", 40_000, 2_000),
        ]);
        view_data.counts = Some(DashboardCounts::from_cabins(
            view_data.cabins.as_ref().expect("cabins present"),
        ));
        view_data.settings = Some(Settings {
            id: 1,
            min_booking_length: 3,
            max_booking_length: 30,
            max_guests_per_booking: 8,
            breakfast_price_cents: 1_500,
        });

        let dashboard = render_dashboard_text(&view_data);
        assert!(dashboard.contains("cabins          2"));
        assert!(dashboard.contains("with discount   1"));

        let state = AppState::default();
        let settings = render_settings_text(&state, &view_data);
        assert!(settings.contains("breakfast price"));
        assert!(settings.contains("$15.00"));
    }

    #[test]
    fn form_text_lists_fields_errors_and_hints() {
        let mut form = FormUiState::blank();
        form.errors = vec![cabana_app::FieldError {
            field: CabinField::Name,
            message: "this field is required".to_owned(),
        }];
        let text = render_form_text(&form, false);
        assert!(text.contains("cabin name"));
        assert!(text.contains("! this field is required"));
        assert!(text.contains("ctrl+s submit"));

        let busy = render_form_text(&form, true);
        assert!(busy.contains("saving..."));
    }

    #[test]
    fn status_falls_back_to_contextual_hints() {
        let state = AppState::default();
        let view_data = ViewData::default();
        assert_eq!(status_text(&state, &view_data), "q quit  tab switch");

        let mut with_status = AppState::default();
        with_status.dispatch(cabana_app::AppCommand::SetStatus("saved".to_owned()));
        assert_eq!(status_text(&with_status, &view_data), "saved");
    }

    #[test]
    fn money_field_prefill_has_no_currency_sign() {
        assert_eq!(money_field(45_000), "450.00");
        assert_eq!(money_field(2_550), "25.50");
    }
}
