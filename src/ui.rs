use std::cell::Cell;
use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use percent_encoding::percent_decode_str;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use textwrap::wrap;
use tracing::{debug, info};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use url::Url;

use crate::controller::{Controller, FetchOutcome};
use crate::dates::DateField;
use crate::gallery::{self, Card, GalleryContents, Placeholder, Thumbnail, VIDEO_PLACEHOLDER};
use crate::modal::{DismissTrigger, ModalEvent, ModalView, Overflow};

// Catppuccin Mocha palette
const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const CARD_WIDTH: u16 = 30;
const CARD_HEIGHT: u16 = 7;
const DATE_FIELD_WIDTH: u16 = 16;
const SUBMIT_WIDTH: u16 = 22;
const SUBMIT_LABEL: &str = "Get Space Images";
const CLOSE_LABEL: &str = "[x] close";
const ICON_IMAGE: &str = "▣";

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

fn rect_contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && column < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Focus {
    StartDate,
    EndDate,
    Submit,
    Gallery,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::StartDate => Focus::EndDate,
            Focus::EndDate => Focus::Submit,
            Focus::Submit => Focus::Gallery,
            Focus::Gallery => Focus::StartDate,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::StartDate => Focus::Gallery,
            Focus::EndDate => Focus::StartDate,
            Focus::Submit => Focus::EndDate,
            Focus::Gallery => Focus::Submit,
        }
    }

    fn for_date(field: DateField) -> Self {
        match field {
            DateField::Start => Focus::StartDate,
            DateField::End => Focus::EndDate,
        }
    }

    fn date_field(self) -> Option<DateField> {
        match self {
            Focus::StartDate => Some(DateField::Start),
            Focus::EndDate => Some(DateField::End),
            Focus::Submit | Focus::Gallery => None,
        }
    }
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

/// Screen regions from the last draw, used to resolve mouse clicks.
#[derive(Default)]
struct HitAreas {
    start_field: Rect,
    end_field: Rect,
    submit: Rect,
    cards: Vec<(usize, Rect)>,
    modal: Option<Rect>,
    modal_close: Option<Rect>,
    prompt: Option<Rect>,
}

fn image_label(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .map(|segment| percent_decode_str(segment).decode_utf8_lossy().to_string())
        })
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| "image".to_string())
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn card_lines(card: &Card, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut lines = Vec::new();
    match &card.thumbnail {
        Thumbnail::Image { url, .. } => lines.push(Line::from(Span::styled(
            truncate_to_width(&format!("{ICON_IMAGE} {}", image_label(url)), width),
            Style::default().fg(COLOR_ACCENT),
        ))),
        Thumbnail::VideoPlaceholder => lines.push(Line::from(Span::styled(
            truncate_to_width(VIDEO_PLACEHOLDER, width),
            Style::default()
                .fg(COLOR_TEXT_SECONDARY)
                .add_modifier(Modifier::ITALIC),
        ))),
    }
    lines.push(Line::default());

    let title_style = Style::default()
        .fg(COLOR_TEXT_PRIMARY)
        .add_modifier(Modifier::BOLD);
    let wrapped = wrap(&card.title, width);
    for (idx, segment) in wrapped.iter().take(2).enumerate() {
        let text = if idx == 1 && wrapped.len() > 2 {
            truncate_to_width(&format!("{segment} …"), width)
        } else {
            segment.to_string()
        };
        lines.push(Line::from(Span::styled(text, title_style)));
    }
    while lines.len() < 4 {
        lines.push(Line::default());
    }
    lines.push(Line::from(Span::styled(
        card.date_label.clone(),
        Style::default().fg(COLOR_TEXT_SECONDARY),
    )));
    lines
}

fn modal_lines(view: &ModalView, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut lines = vec![Line::from(Span::styled(
        view.date_label.clone(),
        Style::default().fg(COLOR_TEXT_SECONDARY),
    ))];
    if let Some(image) = &view.image {
        lines.push(Line::default());
        lines.push(Line::from(vec![
            Span::styled(
                format!("{ICON_IMAGE} "),
                Style::default().fg(COLOR_ACCENT),
            ),
            Span::styled(
                image.url.clone(),
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::UNDERLINED),
            ),
        ]));
        lines.push(Line::from(Span::styled(
            format!("  alt: {}", image.alt),
            Style::default()
                .fg(COLOR_TEXT_SECONDARY)
                .add_modifier(Modifier::ITALIC),
        )));
    }
    if let Some(owner) = &view.copyright {
        lines.push(Line::from(Span::styled(
            format!("© {owner}"),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )));
    }
    lines.push(Line::default());
    for paragraph in view.explanation.lines() {
        if paragraph.trim().is_empty() {
            lines.push(Line::default());
            continue;
        }
        for segment in wrap(paragraph, width) {
            lines.push(Line::from(Span::styled(
                segment.into_owned(),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            )));
        }
    }
    lines
}

fn placeholder_text(placeholder: &Placeholder) -> Text<'static> {
    let mut lines = vec![
        Line::from(Span::raw(placeholder.icon)),
        Line::default(),
    ];
    for (idx, line) in placeholder.lines.iter().enumerate() {
        let style = if idx == 0 {
            Style::default().fg(COLOR_TEXT_PRIMARY)
        } else {
            Style::default().fg(COLOR_TEXT_SECONDARY)
        };
        lines.push(Line::from(Span::styled(line.clone(), style)));
    }
    Text::from(lines)
}

pub struct Options {
    pub status_message: String,
    pub controller: Controller,
    pub config_path: String,
}

pub struct Model {
    controller: Controller,
    status_message: String,
    config_path: String,
    focus: Focus,
    prompt: Option<String>,
    spinner: Spinner,
    needs_redraw: bool,
    hit: HitAreas,
    gallery_columns: Cell<usize>,
    gallery_rows_visible: Cell<usize>,
    gallery_row_offset: Cell<usize>,
    modal_line_count: Cell<usize>,
    modal_view_height: Cell<u16>,
}

impl Model {
    pub fn new(options: Options) -> Self {
        Self {
            controller: options.controller,
            status_message: options.status_message,
            config_path: options.config_path,
            focus: Focus::StartDate,
            prompt: None,
            spinner: Spinner::new(),
            needs_redraw: true,
            hit: HitAreas::default(),
            gallery_columns: Cell::new(1),
            gallery_rows_visible: Cell::new(1),
            gallery_row_offset: Cell::new(0),
            modal_line_count: Cell::new(0),
            modal_view_height: Cell::new(1),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            self.poll_async();

            if self.needs_redraw {
                draw_once(terminal, self)?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if key.modifiers.contains(KeyModifiers::CONTROL)
                            && key.code == KeyCode::Char('c')
                        {
                            break;
                        }
                        if self.handle_key(key.code) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.controller.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn poll_async(&mut self) {
        let outcomes = self.controller.poll();
        if outcomes.is_empty() {
            return;
        }
        for outcome in outcomes {
            self.status_message = match outcome {
                FetchOutcome::Loaded { range, count: 0 } => {
                    format!("No entries for {range}.")
                }
                FetchOutcome::Loaded { range, count } => {
                    self.focus = Focus::Gallery;
                    format!("Loaded {count} entries for {range}.")
                }
                FetchOutcome::Failed { message, .. } => format!("Request failed: {message}"),
            };
        }
        self.gallery_row_offset.set(0);
        self.mark_dirty();
    }

    fn submit(&mut self) {
        match self.controller.on_submit() {
            Ok(range) => {
                self.spinner.reset();
                self.gallery_row_offset.set(0);
                self.status_message = format!("Loading {range}…");
            }
            Err(err) => {
                info!(error = %err, "date range rejected");
                self.prompt = Some(err.to_string());
            }
        }
        self.mark_dirty();
    }

    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.prompt.is_some() {
            if matches!(code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.prompt = None;
                self.mark_dirty();
            }
            return false;
        }

        if self.controller.modal().is_open() {
            return self.handle_modal_key(code);
        }

        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Char('r') => self.submit(),
            _ => match self.focus.date_field() {
                Some(field) => self.handle_date_key(field, code),
                None if self.focus == Focus::Submit => {
                    if matches!(code, KeyCode::Enter | KeyCode::Char(' ')) {
                        self.submit();
                    } else if matches!(code, KeyCode::Down | KeyCode::Char('j')) {
                        self.focus = Focus::Gallery;
                    }
                }
                None => self.handle_gallery_key(code),
            },
        }
        self.mark_dirty();
        false
    }

    fn handle_date_key(&mut self, field: DateField, code: KeyCode) {
        let dates = self.controller.dates_mut();
        dates.focus(field);
        match code {
            KeyCode::Char(ch) => {
                dates.push_char(ch);
            }
            KeyCode::Backspace => {
                dates.backspace();
            }
            KeyCode::Delete => dates.clear(),
            KeyCode::Left | KeyCode::Right => self.focus = Focus::for_date(field.other()),
            KeyCode::Down => self.focus = Focus::Gallery,
            KeyCode::Enter => self.submit(),
            _ => {}
        }
    }

    fn handle_gallery_key(&mut self, code: KeyCode) {
        if self.controller.modal().background_overflow() == Overflow::Hidden {
            return;
        }
        let columns = self.gallery_columns.get();
        let page = self.gallery_rows_visible.get().max(1) as i32;
        let gallery = self.controller.gallery_mut();
        match code {
            KeyCode::Left | KeyCode::Char('h') => {
                gallery.move_selection(-1, 0, columns);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                gallery.move_selection(1, 0, columns);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if !gallery.move_selection(0, -1, columns) {
                    self.focus = Focus::Submit;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                gallery.move_selection(0, 1, columns);
            }
            KeyCode::PageUp => {
                gallery.move_selection(0, -page, columns);
            }
            KeyCode::PageDown => {
                gallery.move_selection(0, page, columns);
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(transition) = self.controller.open_selected() {
                    debug!(?transition, "detail view opened");
                }
            }
            _ => {}
        }
    }

    fn handle_modal_key(&mut self, code: KeyCode) -> bool {
        let page = self.modal_view_height.get().max(1) as i32;
        let lines = self.modal_line_count.get();
        let modal = self.controller.modal_mut();
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Esc => {
                modal.dispatch(ModalEvent::Dismiss(DismissTrigger::Escape));
            }
            KeyCode::Char('x') => {
                modal.dispatch(ModalEvent::Dismiss(DismissTrigger::CloseControl));
            }
            KeyCode::Up | KeyCode::Char('k') => {
                modal.scroll_by(-1, lines);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                modal.scroll_by(1, lines);
            }
            KeyCode::PageUp => {
                modal.scroll_by(-page, lines);
            }
            KeyCode::PageDown | KeyCode::Char(' ') => {
                modal.scroll_by(page, lines);
            }
            KeyCode::Char('o') => self.open_current_link(),
            _ => return false,
        }
        self.mark_dirty();
        false
    }

    fn open_current_link(&mut self) {
        let Some(link) = self
            .controller
            .modal()
            .view()
            .map(|view| view.link.clone())
            .filter(|link| !link.trim().is_empty())
        else {
            self.status_message = "This entry has no link to open.".to_string();
            return;
        };
        match webbrowser::open(&link) {
            Ok(_) => self.status_message = format!("Opened {link} in your browser."),
            Err(err) => self.status_message = format!("Could not open browser: {err}"),
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => self.handle_click(event.column, event.row),
            MouseEventKind::ScrollDown => self.handle_wheel(1),
            MouseEventKind::ScrollUp => self.handle_wheel(-1),
            _ => {}
        }
    }

    fn handle_click(&mut self, column: u16, row: u16) {
        if let Some(prompt) = self.hit.prompt.filter(|_| self.prompt.is_some()) {
            if rect_contains(prompt, column, row) {
                self.prompt = None;
                self.mark_dirty();
            }
            return;
        }

        if self.controller.modal().is_open() {
            let on_close = self
                .hit
                .modal_close
                .is_some_and(|rect| rect_contains(rect, column, row));
            let on_content = self
                .hit
                .modal
                .is_some_and(|rect| rect_contains(rect, column, row));
            let event = if on_close {
                ModalEvent::Dismiss(DismissTrigger::CloseControl)
            } else if on_content {
                ModalEvent::ContentClick
            } else {
                ModalEvent::Dismiss(DismissTrigger::Backdrop)
            };
            self.controller.modal_mut().dispatch(event);
            self.mark_dirty();
            return;
        }

        if rect_contains(self.hit.start_field, column, row) {
            self.focus = Focus::StartDate;
        } else if rect_contains(self.hit.end_field, column, row) {
            self.focus = Focus::EndDate;
        } else if rect_contains(self.hit.submit, column, row) {
            self.focus = Focus::Submit;
            self.submit();
        } else if let Some(index) = self
            .hit
            .cards
            .iter()
            .find(|(_, rect)| rect_contains(*rect, column, row))
            .map(|(index, _)| *index)
        {
            self.focus = Focus::Gallery;
            self.controller.select(index);
        } else {
            return;
        }
        self.mark_dirty();
    }

    fn handle_wheel(&mut self, delta: i32) {
        if self.controller.modal().is_open() {
            let lines = self.modal_line_count.get();
            if self.controller.modal_mut().scroll_by(delta * 3, lines) {
                self.mark_dirty();
            }
            return;
        }
        let columns = self.gallery_columns.get();
        if self
            .controller
            .gallery_mut()
            .move_selection(0, delta, columns)
        {
            self.mark_dirty();
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_text = if self.controller.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
                .trim()
                .to_string()
        } else {
            self.status_message.clone()
        };
        let status_line = Paragraph::new(status_text).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        self.draw_form(frame, layout[1]);
        self.draw_gallery(frame, layout[2]);

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, layout[3]);

        self.hit.modal = None;
        self.hit.modal_close = None;
        if self.controller.modal().is_open() {
            self.draw_modal(frame, full);
        }

        self.hit.prompt = None;
        if self.prompt.is_some() {
            self.draw_prompt(frame, full);
        }
    }

    fn field_block(&self, title: &'static str, focused: bool) -> Block<'static> {
        let border = if focused {
            COLOR_BORDER_FOCUSED
        } else {
            COLOR_BORDER_IDLE
        };
        Block::default()
            .title(Span::styled(title, Style::default().fg(COLOR_TEXT_SECONDARY)))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(COLOR_PANEL_BG))
    }

    fn draw_form(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(DATE_FIELD_WIDTH),
                Constraint::Length(DATE_FIELD_WIDTH),
                Constraint::Length(SUBMIT_WIDTH),
                Constraint::Min(0),
            ])
            .split(area);

        for (field, rect) in [(DateField::Start, chunks[0]), (DateField::End, chunks[1])] {
            let focused = self.focus.date_field() == Some(field);
            let mut value = self.controller.dates().value(field).to_string();
            if focused {
                value.push('▏');
            }
            let title = match field {
                DateField::Start => "Start",
                DateField::End => "End",
            };
            let paragraph = Paragraph::new(value)
                .style(Style::default().fg(COLOR_TEXT_PRIMARY))
                .block(self.field_block(title, focused));
            frame.render_widget(paragraph, rect);
        }

        let submit_focused = self.focus == Focus::Submit;
        let submit_style = if submit_focused {
            Style::default()
                .fg(COLOR_BG)
                .bg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        };
        let button = Paragraph::new(Span::styled(SUBMIT_LABEL, submit_style))
            .alignment(Alignment::Center)
            .block(self.field_block("", submit_focused));
        frame.render_widget(button, chunks[2]);

        self.hit.start_field = chunks[0];
        self.hit.end_field = chunks[1];
        self.hit.submit = chunks[2];
    }

    fn draw_gallery(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let count = self.controller.gallery().cards().len();
        let title = if count > 0 {
            format!("Gallery ({count})")
        } else {
            "Gallery".to_string()
        };
        let block = self
            .field_block("", self.focus == Focus::Gallery)
            .title(Span::styled(
                title,
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.hit.cards.clear();

        match self.controller.gallery().contents() {
            GalleryContents::Placeholder(placeholder) => {
                let text = placeholder_text(placeholder);
                let height = (text.lines.len() as u16).min(inner.height);
                let top = inner.y + inner.height.saturating_sub(height) / 2;
                let centered = Rect::new(inner.x, top, inner.width, height);
                let paragraph = Paragraph::new(text)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });
                frame.render_widget(paragraph, centered);
            }
            GalleryContents::Cards(cards) => {
                let columns = gallery::columns_for_width(inner.width, CARD_WIDTH);
                let card_width = inner.width / columns as u16;
                let visible_rows = usize::from((inner.height / CARD_HEIGHT).max(1));
                self.gallery_columns.set(columns);
                self.gallery_rows_visible.set(visible_rows);

                let selected = self.controller.gallery().selected().unwrap_or(0);
                let selected_row = selected / columns;
                let mut offset = self.gallery_row_offset.get();
                if selected_row < offset {
                    offset = selected_row;
                } else if selected_row >= offset + visible_rows {
                    offset = selected_row + 1 - visible_rows;
                }
                self.gallery_row_offset.set(offset);

                let gallery_focused = self.focus == Focus::Gallery;
                for (index, card) in cards.iter().enumerate().skip(offset * columns) {
                    let row = index / columns - offset;
                    if row >= visible_rows {
                        break;
                    }
                    let column = index % columns;
                    let rect = Rect::new(
                        inner.x + column as u16 * card_width,
                        inner.y + row as u16 * CARD_HEIGHT,
                        card_width,
                        CARD_HEIGHT.min(inner.height.saturating_sub(row as u16 * CARD_HEIGHT)),
                    );
                    let is_selected = index == selected;
                    let (border, bg) = if is_selected && gallery_focused {
                        (COLOR_BORDER_FOCUSED, COLOR_PANEL_SELECTED_BG)
                    } else if is_selected {
                        (COLOR_SUCCESS, COLOR_PANEL_BG)
                    } else {
                        (COLOR_BORDER_IDLE, COLOR_PANEL_BG)
                    };
                    let card_block = Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(border))
                        .style(Style::default().bg(bg));
                    let card_inner = card_block.inner(rect);
                    let paragraph = Paragraph::new(Text::from(card_lines(
                        card,
                        usize::from(card_inner.width),
                    )))
                    .block(card_block);
                    frame.render_widget(paragraph, rect);
                    self.hit.cards.push((index, rect));
                }
            }
        }
    }

    fn draw_modal(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let Some(view) = self.controller.modal().view() else {
            return;
        };
        let popup_area = centered_rect(80, 80, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(Span::styled(
                view.title.clone(),
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_ACCENT))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let inner = block.inner(popup_area);
        let lines = modal_lines(view, usize::from(inner.width));
        self.modal_line_count.set(lines.len());
        self.modal_view_height.set(inner.height);

        let body = Paragraph::new(Text::from(lines))
            .block(block)
            .scroll((self.controller.modal().scroll(), 0));
        frame.render_widget(body, popup_area);

        let close_width = CLOSE_LABEL.len() as u16;
        let close_area = Rect::new(
            popup_area.x + popup_area.width.saturating_sub(close_width + 2),
            popup_area.y,
            close_width.min(popup_area.width),
            1,
        );
        frame.render_widget(
            Paragraph::new(Span::styled(
                CLOSE_LABEL,
                Style::default()
                    .fg(COLOR_ERROR)
                    .add_modifier(Modifier::BOLD),
            )),
            close_area,
        );

        self.hit.modal = Some(popup_area);
        self.hit.modal_close = Some(close_area);
    }

    fn draw_prompt(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let Some(message) = self.prompt.as_deref() else {
            return;
        };
        let popup_area = centered_rect(50, 30, area);
        frame.render_widget(Clear, popup_area);
        let text = Text::from(vec![
            Line::from(Span::styled(
                message.to_string(),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            )),
            Line::default(),
            Line::from(Span::styled(
                "Press Enter to continue",
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .add_modifier(Modifier::ITALIC),
            )),
        ]);
        let prompt = Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(Span::styled(
                        "Check the dates",
                        Style::default()
                            .fg(COLOR_ERROR)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(COLOR_ERROR))
                    .style(Style::default().bg(COLOR_PANEL_BG)),
            );
        frame.render_widget(prompt, popup_area);
        self.hit.prompt = Some(popup_area);
    }

    fn footer_text(&self) -> String {
        if self.prompt.is_some() {
            return "Enter dismiss".to_string();
        }
        if self.controller.modal().is_open() {
            return "j/k scroll · o open in browser · x/Esc/click outside close · q quit"
                .to_string();
        }
        let mut parts = vec!["Tab switch field".to_string()];
        match self.focus {
            Focus::StartDate | Focus::EndDate => {
                parts.push("type YYYY-MM-DD".to_string());
                parts.push("Enter fetch".to_string());
            }
            Focus::Submit => parts.push("Enter fetch".to_string()),
            Focus::Gallery => {
                parts.push("arrows/hjkl move".to_string());
                parts.push("Enter details".to_string());
            }
        }
        parts.push("r refresh".to_string());
        parts.push(format!("config {}", self.config_path));
        parts.push("q quit".to_string());
        parts.join(" · ")
    }
}

pub fn draw_once<B: Backend>(terminal: &mut Terminal<B>, model: &mut Model) -> Result<()> {
    terminal.draw(|frame| model.draw(frame))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use ratatui::backend::TestBackend;

    use crate::apod::{ItemRecord, MediaType};
    use crate::data::MockFeedService;
    use crate::dates::DateRangeInput;
    use crate::gallery::GalleryRenderer;
    use crate::modal::DetailModal;

    fn record(date: &str, title: &str, media_type: MediaType) -> ItemRecord {
        ItemRecord {
            date: date.into(),
            title: title.into(),
            media_type,
            url: "https://apod.nasa.gov/apod/image/2401/Nebula%20Wide.jpg".into(),
            explanation: "Gas and dust.".into(),
            hdurl: None,
            copyright: None,
        }
    }

    fn model_with(service: Arc<MockFeedService>) -> Model {
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let controller = Controller::new(
            DateRangeInput::with_defaults(today, 9),
            GalleryRenderer::new(),
            DetailModal::new(),
            service,
        );
        Model::new(Options {
            status_message: String::new(),
            controller,
            config_path: "~/.config/apod-gallery/config.yaml".into(),
        })
    }

    fn screen(model: &mut Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        draw_once(&mut terminal, model).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer.get(x, y).symbol());
            }
            out.push('\n');
        }
        out
    }

    fn click(model: &mut Model, column: u16, row: u16) {
        model.handle_mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        });
    }

    #[test]
    fn image_label_decodes_last_segment() {
        assert_eq!(
            image_label("https://apod.nasa.gov/apod/image/2401/Nebula%20Wide.jpg"),
            "Nebula Wide.jpg"
        );
        assert_eq!(image_label("not a url"), "image");
    }

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("a longer title", 6), "a lon…");
    }

    #[test]
    fn rect_contains_is_exclusive_at_edges() {
        let rect = Rect::new(2, 2, 3, 3);
        assert!(rect_contains(rect, 2, 2));
        assert!(rect_contains(rect, 4, 4));
        assert!(!rect_contains(rect, 5, 4));
        assert!(!rect_contains(rect, 1, 2));
    }

    #[test]
    fn video_card_lines_hold_no_media_reference() {
        let mut gallery = GalleryRenderer::new();
        gallery.render(vec![record("2024-01-02", "Launch", MediaType::Video)]);
        let lines = card_lines(&gallery.cards()[0], 28);
        let text: Vec<String> = lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect();
        assert_eq!(text[0], VIDEO_PLACEHOLDER);
        assert!(text.iter().all(|line| !line.contains("Nebula")));
        assert!(text.iter().any(|line| line == "Launch"));
        assert_eq!(text.last().unwrap(), "Date: 2024-01-02");
    }

    #[test]
    fn reversed_dates_raise_prompt_without_fetching() {
        let service = Arc::new(MockFeedService::default());
        let mut model = model_with(service.clone());
        model
            .controller
            .dates_mut()
            .set(DateField::Start, "2024-02-10");
        model.controller.dates_mut().set(DateField::End, "2024-02-01");

        assert!(!model.handle_key(KeyCode::Enter));
        assert_eq!(
            model.prompt.as_deref(),
            Some("Start date must be before or equal to end date.")
        );
        assert!(screen(&mut model).contains("Start date must be before"));
        assert!(service.calls().is_empty());

        model.handle_key(KeyCode::Char('q'));
        assert!(model.prompt.is_some(), "prompt blocks other keys");
        model.handle_key(KeyCode::Enter);
        assert!(model.prompt.is_none());
    }

    #[test]
    fn gallery_cards_render_and_open_on_click() {
        let mut model = model_with(Arc::new(MockFeedService::default()));
        model.controller.gallery_mut().render(vec![record(
            "2024-01-01",
            "Nebula",
            MediaType::Image,
        )]);
        let text = screen(&mut model);
        assert!(text.contains("Nebula"));
        assert!(text.contains("Date: 2024-01-01"));

        let (_, rect) = model.hit.cards[0];
        click(&mut model, rect.x + 1, rect.y + 1);
        assert!(model.controller.modal().is_open());

        let text = screen(&mut model);
        assert!(text.contains(CLOSE_LABEL));
        assert!(text.contains("Gas and dust."));
    }

    #[test]
    fn modal_dismissal_by_mouse_and_keys() {
        let mut model = model_with(Arc::new(MockFeedService::default()));
        model.controller.gallery_mut().render(vec![
            record("2024-01-01", "Nebula", MediaType::Image),
            record("2024-01-02", "Launch", MediaType::Video),
        ]);

        model.controller.select(0);
        screen(&mut model);
        let popup = model.hit.modal.unwrap();
        click(&mut model, popup.x + 2, popup.y + 2);
        assert!(model.controller.modal().is_open(), "content click keeps it open");

        click(&mut model, 0, 0);
        assert!(!model.controller.modal().is_open());
        assert_eq!(
            model.controller.modal().background_overflow(),
            Overflow::Auto
        );

        model.controller.select(1);
        screen(&mut model);
        let close = model.hit.modal_close.unwrap();
        click(&mut model, close.x, close.y);
        assert!(!model.controller.modal().is_open());

        model.controller.select(0);
        assert!(!model.handle_key(KeyCode::Esc));
        assert!(!model.controller.modal().is_open());
        assert!(!model.handle_key(KeyCode::Esc), "escape while closed is a no-op");
    }

    #[test]
    fn gallery_navigation_is_frozen_while_modal_open() {
        let mut model = model_with(Arc::new(MockFeedService::default()));
        model.controller.gallery_mut().render(vec![
            record("2024-01-01", "A", MediaType::Image),
            record("2024-01-02", "B", MediaType::Image),
        ]);
        model.focus = Focus::Gallery;
        screen(&mut model);
        model.controller.select(0);
        model.handle_wheel(1);
        model.handle_key(KeyCode::Right);
        assert_eq!(model.controller.gallery().selected(), Some(0));

        model.handle_key(KeyCode::Char('x'));
        model.handle_key(KeyCode::Right);
        assert_eq!(model.controller.gallery().selected(), Some(1));
    }

    #[test]
    fn typing_edits_the_focused_date() {
        let mut model = model_with(Arc::new(MockFeedService::default()));
        model.handle_key(KeyCode::Tab);
        assert_eq!(model.focus, Focus::EndDate);
        model.handle_key(KeyCode::Backspace);
        model.handle_key(KeyCode::Char('9'));
        assert_eq!(model.controller.dates().value(DateField::End), "2024-06-39");
        assert_eq!(model.controller.dates().value(DateField::Start), "2024-06-22");

        model.handle_key(KeyCode::Left);
        assert_eq!(model.focus, Focus::StartDate);
        model.handle_key(KeyCode::Right);
        assert_eq!(model.focus, Focus::EndDate);
    }
}
