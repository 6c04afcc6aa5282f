//! Key handling and rendering shared by the editor, auth and profile forms.

use catalog_core::{Field, FieldKind, FieldValue, FormState, RelationOption, Relations};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::option_chip;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormAction {
    None,
    Submit,
    Cancel,
}

/// Focus and multi-select cursor of the form currently on screen.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FormCursor {
    pub focus: usize,
    pub option: usize,
}

impl FormCursor {
    pub fn at(focus: usize) -> Self {
        Self { focus, option: 0 }
    }

    fn move_focus(&mut self, len: usize, forward: bool) {
        let len = len.max(1);
        self.focus = if forward {
            (self.focus + 1) % len
        } else {
            (self.focus + len - 1) % len
        };
        self.option = 0;
    }
}

/// Applies one key to `form`. `options` are the choices of the focused multi-select, if any.
pub(crate) fn handle_form_key(
    form: &mut FormState,
    cursor: &mut FormCursor,
    options: &[RelationOption],
    key: KeyEvent,
) -> FormAction {
    let len = form.fields.len();
    match key.code {
        KeyCode::Esc => return FormAction::Cancel,
        KeyCode::Enter => return FormAction::Submit,
        KeyCode::Tab | KeyCode::Down => cursor.move_focus(len, true),
        KeyCode::BackTab | KeyCode::Up => cursor.move_focus(len, false),
        _ => {}
    }

    let Some(field) = form.fields.get_mut(cursor.focus) else {
        return FormAction::None;
    };
    let key_name = field.key;
    let kind = field.kind;
    match kind {
        FieldKind::MultiSelect(_) => match key.code {
            KeyCode::Left => cursor.option = cursor.option.saturating_sub(1),
            KeyCode::Right if cursor.option + 1 < options.len() => cursor.option += 1,
            KeyCode::Char(' ') => {
                if let Some(option) = options.get(cursor.option) {
                    form.toggle_id(key_name, option.id);
                }
            }
            // no clear-all: choices are removed one toggle at a time
            _ => {}
        },
        FieldKind::Text | FieldKind::Password | FieldKind::Number => {
            let FieldValue::Text(text) = &mut field.value else {
                return FormAction::None;
            };
            match key.code {
                KeyCode::Backspace => {
                    text.pop();
                }
                KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    text.clear();
                }
                KeyCode::Char(ch) if accepts(kind, ch, key.modifiers) => text.push(ch),
                _ => {}
            }
        }
    }
    FormAction::None
}

fn accepts(kind: FieldKind, ch: char, modifiers: KeyModifiers) -> bool {
    if modifiers.contains(KeyModifiers::CONTROL) || modifiers.contains(KeyModifiers::ALT) {
        return false;
    }
    match kind {
        FieldKind::Number => ch.is_ascii_digit() || ch == '-',
        _ => !ch.is_control(),
    }
}

pub(crate) fn mask(text: &str) -> String {
    "•".repeat(text.chars().count())
}

/// The choices of the focused field when it is a multi-select.
pub(crate) fn focused_options<'a>(
    form: &FormState,
    cursor: FormCursor,
    relations: &'a Relations,
) -> &'a [RelationOption] {
    match form.fields.get(cursor.focus).map(|field| field.kind) {
        Some(FieldKind::MultiSelect(collection)) => relations.options(collection),
        _ => &[],
    }
}

pub(crate) fn form_lines(
    form: &FormState,
    cursor: FormCursor,
    relations: &Relations,
    accent: Color,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (idx, field) in form.fields.iter().enumerate() {
        let focused = idx == cursor.focus;
        let marker = if focused { "> " } else { "  " };
        let label_style = if focused {
            Style::default().fg(accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let mut label = vec![
            Span::raw(marker),
            Span::styled(field.label.to_string(), label_style),
        ];
        if !field.hint.is_empty() {
            label.push(Span::styled(
                format!("  ({})", field.hint),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(label));
        lines.push(value_line(field, focused, cursor.option, relations));
        for message in form.errors_for(field.key) {
            lines.push(Line::from(Span::styled(
                format!("    {message}"),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines
}

fn value_line(field: &Field, focused: bool, option: usize, relations: &Relations) -> Line<'static> {
    let caret = if focused { "▏" } else { "" };
    match field.kind {
        FieldKind::Text | FieldKind::Number => {
            Line::from(format!("    {}{caret}", field.as_text()))
        }
        FieldKind::Password => Line::from(format!("    {}{caret}", mask(field.as_text()))),
        FieldKind::MultiSelect(collection) => {
            let options = relations.options(collection);
            if options.is_empty() {
                let text = if relations.is_loaded(collection) {
                    format!("    no {} yet", collection.plural())
                } else {
                    format!("    loading {}...", collection.plural())
                };
                return Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)));
            }
            let chosen = field.as_ids();
            let mut spans = vec![Span::raw("    ")];
            for (idx, entry) in options.iter().enumerate() {
                let row_selected = focused && idx == option;
                spans.push(option_chip(
                    &entry.name,
                    chosen.contains(&entry.id),
                    row_selected,
                ));
                spans.push(Span::raw(" "));
            }
            Line::from(spans)
        }
    }
}
