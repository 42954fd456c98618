use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Terminal,
};

use crate::{
    error::{classify_error_code, CliGuiError, Result},
    form::{CliForm, FormButton, Geometry},
    spec::ActionKind,
    widget::Widget,
};

const EVENT_POLL_MILLIS: u64 = 200;
const UI_HEADER_HEIGHT: u16 = 3;
const UI_BUTTONS_HEIGHT: u16 = 3;
const UI_FOOTER_HEIGHT: u16 = 3;
const OUTPUT_SCROLL_STEP: u16 = 1;
const OUTPUT_SCROLL_PAGE_STEP: u16 = 8;
const EDIT_CURSOR: &str = "_";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum FocusPane {
    Fields,
    Output,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum InputMode {
    Navigate,
    Edit,
}

/// Selection and edit state layered over a [`CliForm`].
#[derive(Debug)]
struct FormView {
    selected_row: usize,
    focus: FocusPane,
    input_mode: InputMode,
    editing_buffer: String,
    status_line: String,
}

pub(crate) fn run_form(form: &mut CliForm) -> Result<()> {
    if !atty::is(atty::Stream::Stdin) || !atty::is(atty::Stream::Stdout) {
        return Err(CliGuiError::InvalidInput(
            "the form requires an interactive terminal".to_owned(),
        ));
    }

    let mut terminal = init_terminal()?;
    let run_result = run_event_loop(&mut terminal, form);
    let restore_result = restore_terminal(&mut terminal);
    restore_result?;
    run_result
}

fn init_terminal() -> Result<Terminal<CrosstermBackend<std::io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    form: &mut CliForm,
) -> Result<()> {
    let mut view = FormView::new(form);
    while !form.is_terminated() {
        terminal.draw(|frame| view.render(frame, form))?;
        if !event::poll(Duration::from_millis(EVENT_POLL_MILLIS))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            view.on_key(form, key);
        }
    }
    Ok(())
}

impl FormView {
    fn new(form: &CliForm) -> Self {
        let selected_row = form
            .content()
            .widgets()
            .iter()
            .position(|widget| !widget.is_help())
            .unwrap_or(form.content().len());
        Self {
            selected_row,
            focus: FocusPane::Fields,
            input_mode: InputMode::Navigate,
            editing_buffer: String::new(),
            status_line: "Ready".to_owned(),
        }
    }

    fn row_count(form: &CliForm) -> usize {
        form.content().len() + form.buttons().len()
    }

    fn selected_button(&self, form: &CliForm) -> Option<FormButton> {
        self.selected_row
            .checked_sub(form.content().len())
            .and_then(|index| form.buttons().get(index).copied())
    }

    fn on_key(&mut self, form: &mut CliForm, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.input_mode == InputMode::Edit {
            self.on_edit_key(form, key);
            return;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => form.on_cancel(),
            KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => form.on_cancel(),
            KeyCode::Char('r') if key.modifiers == KeyModifiers::CONTROL => self.run(form),
            KeyCode::F(5) => self.run(form),
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    FocusPane::Fields => FocusPane::Output,
                    FocusPane::Output => FocusPane::Fields,
                };
            }
            KeyCode::Char('x') => self.reset_selected_field(form),
            KeyCode::Char('c') => {
                form.output_mut().clear();
                self.status_line = "Output cleared".to_owned();
            }
            _ => match self.focus {
                FocusPane::Fields => self.on_field_key(form, key),
                FocusPane::Output => self.on_output_key(form, key),
            },
        }
    }

    fn on_edit_key(&mut self, form: &mut CliForm, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Navigate;
                self.editing_buffer.clear();
                self.status_line = "Edit canceled".to_owned();
            }
            KeyCode::Enter => self.commit_edit_buffer(form),
            KeyCode::Backspace => {
                self.editing_buffer.pop();
            }
            KeyCode::Char(character) => self.editing_buffer.push(character),
            _ => {}
        }
    }

    fn commit_edit_buffer(&mut self, form: &mut CliForm) {
        if let Some(input) = form
            .content_mut()
            .get_mut(self.selected_row)
            .and_then(Widget::text_input_mut)
        {
            input.set_text(std::mem::take(&mut self.editing_buffer));
            self.status_line = "Value updated".to_owned();
        }
        self.editing_buffer.clear();
        self.input_mode = InputMode::Navigate;
    }

    fn on_field_key(&mut self, form: &mut CliForm, key: KeyEvent) {
        let row_count = Self::row_count(form);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_row = self.selected_row.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected_row = (self.selected_row + 1).min(row_count.saturating_sub(1));
            }
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('e') | KeyCode::Char('i') => {
                self.activate_selected(form);
            }
            _ => {}
        }
    }

    fn activate_selected(&mut self, form: &mut CliForm) {
        match self.selected_button(form) {
            Some(FormButton::Run) => return self.run(form),
            Some(FormButton::Cancel) => return form.on_cancel(),
            None => {}
        }
        let Some(widget) = form.content_mut().get_mut(self.selected_row) else {
            return;
        };
        let dest = widget.spec().dest().to_owned();
        match widget.kind() {
            ActionKind::Store => {
                if let Some(input) = widget.text_input_mut() {
                    self.editing_buffer = input.text().to_owned();
                }
                self.input_mode = InputMode::Edit;
                self.status_line = format!("Editing `{dest}`");
            }
            ActionKind::StoreTrue => {
                if let Some(toggle) = widget.toggle_mut() {
                    toggle.toggle();
                }
                self.status_line = format!("Toggled `{dest}`");
            }
            _ => {
                self.status_line = format!("{} {}", widget.label(), widget.help_caption());
            }
        }
    }

    fn on_output_key(&mut self, form: &mut CliForm, key: KeyEvent) {
        let output = form.output_mut();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => output.scroll_up(OUTPUT_SCROLL_STEP),
            KeyCode::Down | KeyCode::Char('j') => output.scroll_down(OUTPUT_SCROLL_STEP),
            KeyCode::PageUp => output.scroll_up(OUTPUT_SCROLL_PAGE_STEP),
            KeyCode::PageDown => output.scroll_down(OUTPUT_SCROLL_PAGE_STEP),
            KeyCode::Home | KeyCode::Char('g') => output.scroll_to_top(),
            KeyCode::End | KeyCode::Char('G') => output.scroll_to_tail(),
            _ => {}
        }
    }

    fn reset_selected_field(&mut self, form: &mut CliForm) {
        if let Some(widget) = form.content_mut().get_mut(self.selected_row) {
            widget.reset();
            self.status_line = format!("Reset `{}`", widget.spec().dest());
        }
    }

    fn run(&mut self, form: &mut CliForm) {
        match form.on_run() {
            Ok(namespace) => {
                self.status_line = format!("Run finished ({} values)", namespace.len());
            }
            Err(error) => {
                let code = classify_error_code(&error);
                if let CliGuiError::Conversion { dest, .. } = &error {
                    if let Some(index) = form.content().position(dest) {
                        self.selected_row = index;
                        self.focus = FocusPane::Fields;
                    }
                    form.mirror_text(&format!("error[{code}]: {error}\n"));
                }
                self.status_line = format!("error[{code}]: {error}");
            }
        }
    }

    fn render(&mut self, frame: &mut ratatui::Frame, form: &mut CliForm) {
        let window = window_area(form.geometry, frame.area());
        let block = Block::default()
            .borders(Borders::ALL)
            .title(form.title.clone());
        let inner = block.inner(window);
        frame.render_widget(block, window);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(UI_HEADER_HEIGHT),
                Constraint::Min(3),
                Constraint::Length(UI_BUTTONS_HEIGHT),
                Constraint::Percentage(40),
                Constraint::Length(UI_FOOTER_HEIGHT),
            ])
            .split(inner);

        let header = Paragraph::new(format!(
            "mode: {} | focus: {} | status: {}",
            self.input_mode_label(),
            self.focus_label(),
            self.status_line
        ))
        .block(Block::default().borders(Borders::ALL).title("Status"));
        frame.render_widget(header, chunks[0]);

        self.render_fields(frame, chunks[1], form);
        self.render_buttons(frame, chunks[2], form);
        self.render_output(frame, chunks[3], form);

        let footer_text = if self.input_mode == InputMode::Edit {
            "Edit: type, Enter=save, Esc=cancel"
        } else {
            "Up/Down move, Enter/e edit or press, Space toggle, F5/Ctrl+R run, x reset field, Tab output pane, c clear output, Esc/q cancel"
        };
        let footer = Paragraph::new(footer_text)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Keys"));
        frame.render_widget(footer, chunks[4]);
    }

    fn render_fields(&self, frame: &mut ratatui::Frame, area: Rect, form: &CliForm) {
        let items = form
            .content()
            .widgets()
            .iter()
            .enumerate()
            .map(|(index, widget)| {
                let mut spans = vec![Span::styled(
                    format!("{} ", widget.label()),
                    Style::default().add_modifier(Modifier::BOLD),
                )];
                if !widget.is_help() {
                    let value = if self.input_mode == InputMode::Edit && index == self.selected_row
                    {
                        format!("{}{EDIT_CURSOR}", self.editing_buffer)
                    } else {
                        widget.display_value()
                    };
                    spans.push(Span::raw(value));
                    spans.push(Span::raw("  "));
                }
                spans.push(Span::styled(
                    widget.help_caption().to_owned(),
                    Style::default().add_modifier(Modifier::DIM),
                ));
                ListItem::new(Line::from(spans))
            })
            .collect::<Vec<_>>();

        let mut state = ListState::default();
        if self.selected_row < form.content().len() {
            state.select(Some(self.selected_row));
        }
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(pane_title("Arguments", self.focus == FocusPane::Fields)),
            )
            .highlight_symbol(">> ")
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_buttons(&self, frame: &mut ratatui::Frame, area: Rect, form: &CliForm) {
        let selected = self.selected_button(form);
        let mut spans = Vec::new();
        for button in form.buttons() {
            let style = if selected == Some(*button) {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            spans.push(Span::styled(format!("[ {} ]", button.caption()), style));
            spans.push(Span::raw("  "));
        }
        let buttons =
            Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(buttons, area);
    }

    fn render_output(&self, frame: &mut ratatui::Frame, area: Rect, form: &mut CliForm) {
        let text = if form.output().content().is_empty() {
            "No output yet".to_owned()
        } else {
            form.output().content().to_owned()
        };
        let paragraph = Paragraph::new(text).wrap(Wrap { trim: false });
        // Scroll offsets count wrapped rows inside the borders.
        let rows = paragraph.line_count(area.width.saturating_sub(2));
        let output = form.output_mut();
        output.set_display_rows(rows);
        output.set_viewport_height(area.height.saturating_sub(2));
        let widget = paragraph.scroll((output.scroll(), 0)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(pane_title("Output", self.focus == FocusPane::Output)),
        );
        frame.render_widget(widget, area);
    }

    fn input_mode_label(&self) -> &'static str {
        match self.input_mode {
            InputMode::Navigate => "navigate",
            InputMode::Edit => "edit",
        }
    }

    fn focus_label(&self) -> &'static str {
        match self.focus {
            FocusPane::Fields => "arguments",
            FocusPane::Output => "output",
        }
    }
}

fn window_area(geometry: Geometry, screen: Rect) -> Rect {
    let requested = Rect::new(geometry.x, geometry.y, geometry.width, geometry.height);
    let area = requested.intersection(screen);
    if area.width == 0 || area.height == 0 {
        return screen;
    }
    area
}

fn pane_title(title: &str, focused: bool) -> Line<'static> {
    if focused {
        Line::from(vec![
            Span::styled("[*] ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(title.to_owned()),
        ])
    } else {
        Line::from(title.to_owned())
    }
}

#[cfg(test)]
mod unit_tests {
    use std::{io::Write, sync::Arc};

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::{backend::TestBackend, layout::Rect, Terminal};

    use super::{window_area, FocusPane, FormView, InputMode};
    use crate::{
        form::{CliForm, FormState, Geometry, RunCallback},
        spec::{ActionKind, ArgSpec, Coercion},
    };

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(view: &mut FormView, form: &mut CliForm, text: &str) {
        for character in text.chars() {
            view.on_key(form, key(KeyCode::Char(character)));
        }
    }

    fn sample_form() -> CliForm {
        let callback: RunCallback = Box::new(|namespace, out| {
            writeln!(out, "times={:?}", namespace.get_int("times"))?;
            Ok(())
        });
        CliForm::build(
            vec![
                Arc::new(ArgSpec::new("help", ActionKind::Help).help("show help")),
                Arc::new(
                    ArgSpec::new("times", ActionKind::Store)
                        .flag("--times")
                        .coercion(Coercion::integer())
                        .default_value("1"),
                ),
                Arc::new(ArgSpec::new("loud", ActionKind::StoreTrue).flag("--loud")),
            ],
            Some(callback),
        )
        .unwrap()
    }

    #[test]
    fn initial_selection_skips_help_rows() {
        let form = sample_form();
        let view = FormView::new(&form);
        assert_eq!(view.selected_row, 1);
    }

    #[test]
    fn edit_commits_into_text_input() {
        let mut form = sample_form();
        let mut view = FormView::new(&form);
        view.on_key(&mut form, key(KeyCode::Enter));
        assert_eq!(view.input_mode, InputMode::Edit);
        view.on_key(&mut form, key(KeyCode::Backspace));
        type_text(&mut view, &mut form, "42");
        view.on_key(&mut form, key(KeyCode::Enter));
        assert_eq!(view.input_mode, InputMode::Navigate);
        assert_eq!(form.collect().unwrap().get_int("times"), Some(42));
    }

    #[test]
    fn quit_keys_are_plain_text_while_editing() {
        let mut form = sample_form();
        let mut view = FormView::new(&form);
        view.on_key(&mut form, key(KeyCode::Enter));
        type_text(&mut view, &mut form, "q");
        assert_eq!(form.state(), FormState::Editing);
        view.on_key(&mut form, key(KeyCode::Esc));
        assert_eq!(view.input_mode, InputMode::Navigate);
        assert_eq!(form.collect().unwrap().get_int("times"), Some(1));
    }

    #[test]
    fn space_toggles_store_true() {
        let mut form = sample_form();
        let mut view = FormView::new(&form);
        view.on_key(&mut form, key(KeyCode::Down));
        view.on_key(&mut form, key(KeyCode::Char(' ')));
        assert_eq!(form.collect().unwrap().get_bool("loud"), Some(true));
    }

    #[test]
    fn run_button_invokes_callback() {
        let mut form = sample_form();
        let mut view = FormView::new(&form);
        view.on_key(&mut form, key(KeyCode::Down));
        view.on_key(&mut form, key(KeyCode::Down));
        view.on_key(&mut form, key(KeyCode::Enter));
        assert_eq!(form.run_count(), 1);
        assert!(form.output().content().contains("times=Some(1)"));
        assert!(view.status_line.starts_with("Run finished"));
    }

    #[test]
    fn conversion_error_is_reported_inline_and_form_stays_open() {
        let mut form = sample_form();
        let mut view = FormView::new(&form);
        view.on_key(&mut form, key(KeyCode::Enter));
        view.on_key(&mut form, key(KeyCode::Backspace));
        type_text(&mut view, &mut form, "lots");
        view.on_key(&mut form, key(KeyCode::Enter));
        view.on_key(&mut form, key(KeyCode::Down));
        view.on_key(&mut form, key(KeyCode::F(5)));

        assert_eq!(form.state(), FormState::Editing);
        assert!(view.status_line.starts_with("error[E300]"));
        assert_eq!(view.selected_row, 1);
        assert!(form.output().content().contains("invalid value for `times`"));
    }

    #[test]
    fn cancel_button_and_escape_terminate() {
        let mut form = sample_form();
        let mut view = FormView::new(&form);
        for _ in 0..3 {
            view.on_key(&mut form, key(KeyCode::Down));
        }
        view.on_key(&mut form, key(KeyCode::Enter));
        assert!(form.is_terminated());

        let mut form = sample_form();
        let mut view = FormView::new(&form);
        view.on_key(&mut form, key(KeyCode::Esc));
        assert!(form.is_terminated());
    }

    #[test]
    fn tab_switches_to_output_scrolling() {
        let mut form = sample_form();
        let mut view = FormView::new(&form);
        for index in 0..40 {
            form.mirror_text(&format!("line-{index}\n"));
        }
        form.output_mut().set_viewport_height(5);
        view.on_key(&mut form, key(KeyCode::Tab));
        assert_eq!(view.focus, FocusPane::Output);
        view.on_key(&mut form, key(KeyCode::Home));
        assert_eq!(form.output().scroll(), 0);
        assert!(!form.output().follows_tail());
    }

    #[test]
    fn window_area_clamps_to_screen() {
        let screen = Rect::new(0, 0, 80, 24);
        let geometry = Geometry {
            width: 100,
            height: 32,
            x: 10,
            y: 2,
        };
        assert_eq!(window_area(geometry, screen), Rect::new(10, 2, 70, 22));

        let offscreen = Geometry {
            width: 10,
            height: 10,
            x: 200,
            y: 200,
        };
        assert_eq!(window_area(offscreen, screen), screen);
    }

    #[test]
    fn render_draws_labels_buttons_and_output() {
        let mut form = sample_form().with_title("sample");
        form.mirror_text("hello output\n");
        let mut view = FormView::new(&form);
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal
            .draw(|frame| view.render(frame, &mut form))
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        let rendered = buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(rendered.contains("sample"));
        assert!(rendered.contains("times:"));
        assert!(rendered.contains("[ Run ]"));
        assert!(rendered.contains("[ Cancel ]"));
        assert!(rendered.contains("hello output"));
    }

    #[test]
    fn output_pane_follows_wrapped_tail() {
        let mut form = sample_form();
        for index in 0..30 {
            form.mirror_text(&format!("{} row-{index}\n", "word ".repeat(40)));
        }
        let mut view = FormView::new(&form);
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal
            .draw(|frame| view.render(frame, &mut form))
            .unwrap();
        let rendered = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(rendered.contains("row-29"), "{rendered}");
        assert!(form.output().row_count() > form.output().line_count());
        assert!(form.output().follows_tail());
    }
}
