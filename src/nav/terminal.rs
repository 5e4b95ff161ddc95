//! Drives a [`Picker`] from raw terminal key events.
//!
//! Draws an inline block under the cursor (input line, shortlist, preview)
//! and redraws it after every key. When stdin is not a terminal the picker is
//! fed one line of input followed by Enter instead.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::Result;
use colored::Colorize;
use crossterm::{
    cursor::{MoveToColumn, MoveUp},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};

use super::{CandidateSource, Key, Picker, PickerEvent, Rejection};

/// Restores cooked mode even if drawing fails.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

fn map_key(key: KeyEvent) -> Option<Key> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') => Some(Key::Escape),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char(c) => Some(Key::Char(c)),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Esc => Some(Key::Escape),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Tab => Some(Key::Tab),
        _ => None,
    }
}

/// Text lines for the current picker state. The first line is the input line.
pub fn render_lines<S: CandidateSource>(picker: &Picker<S>, prompt: &str, shortlist: usize) -> Vec<String> {
    let mut lines = vec![format!("{} {}", prompt.bold(), picker.buffer())];

    let candidates = picker.candidates();
    let highlight = picker.highlight_index();
    // Keep the highlighted row visible when it sits past the shortlist.
    let start = match highlight {
        Some(i) if i >= shortlist => i + 1 - shortlist,
        _ => 0,
    };
    for (i, item) in candidates.iter().enumerate().skip(start).take(shortlist) {
        let row = picker.source().describe(item);
        if Some(i) == highlight {
            lines.push(format!("{} {}", ">".cyan().bold(), row.cyan()));
        } else {
            lines.push(format!("  {row}"));
        }
    }
    let hidden = candidates.len().saturating_sub(shortlist);
    if hidden > 0 {
        lines.push(format!("  … {hidden} more").dimmed().to_string());
    }

    if !picker.buffer().is_empty() && candidates.is_empty() {
        lines.push("no matches".dimmed().to_string());
    }
    if let Some(preview) = picker.preview() {
        lines.push(format!("{} {}", "preview:".dimmed(), preview));
    }
    if let Some(Rejection::Ambiguous(n)) = picker.last_rejection() {
        lines.push(
            format!("{n} matches: keep typing or pick one with up/down")
                .yellow()
                .to_string(),
        );
    }
    lines
}

/// Run `picker` until the user commits or cancels.
pub fn run_picker<S: CandidateSource>(
    picker: &mut Picker<S>,
    prompt: &str,
    shortlist: usize,
) -> Result<Option<S::Item>> {
    if !io::stdin().is_terminal() {
        return run_line_mode(picker, prompt);
    }

    let _guard = RawModeGuard::enable()?;
    let mut out = io::stdout();
    draw(&mut out, picker, prompt, shortlist)?;

    let outcome = loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(key) = map_key(key) else {
            continue;
        };
        match picker.handle(key) {
            PickerEvent::Committed(item) => break Some(item),
            PickerEvent::Cancelled => break None,
            PickerEvent::Updated | PickerEvent::Rejected(_) | PickerEvent::Ignored => {
                draw(&mut out, picker, prompt, shortlist)?;
            }
        }
    };

    clear_block(&mut out)?;
    out.flush()?;
    Ok(outcome)
}

/// Redraw the block from the input line down, leaving the cursor at the end
/// of the input line.
fn draw<S: CandidateSource>(
    out: &mut impl Write,
    picker: &Picker<S>,
    prompt: &str,
    shortlist: usize,
) -> Result<()> {
    clear_block(out)?;
    let lines = render_lines(picker, prompt, shortlist);
    let below = u16::try_from(lines.len().saturating_sub(1)).unwrap_or(u16::MAX);

    // Raw mode: every line break needs an explicit carriage return.
    write!(out, "{}", lines.join("\r\n"))?;
    if below > 0 {
        queue!(out, MoveUp(below))?;
    }
    let column = format!("{} {}", prompt, picker.buffer()).chars().count();
    queue!(out, MoveToColumn(u16::try_from(column).unwrap_or(u16::MAX)))?;
    out.flush()?;
    Ok(())
}

fn clear_block(out: &mut impl Write) -> Result<()> {
    queue!(out, MoveToColumn(0), Clear(ClearType::FromCursorDown))?;
    Ok(())
}

/// Non-interactive fallback: one line of input, then Enter.
fn run_line_mode<S: CandidateSource>(picker: &mut Picker<S>, prompt: &str) -> Result<Option<S::Item>> {
    print!("{prompt} ");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    picker.type_str(line.trim_end_matches(['\r', '\n']));
    match picker.handle(Key::Enter) {
        PickerEvent::Committed(item) => Ok(Some(item)),
        PickerEvent::Rejected(Rejection::Ambiguous(n)) => {
            println!("{n} matches; be more specific");
            Ok(None)
        }
        PickerEvent::Rejected(Rejection::NoMatches) => {
            println!("no matches");
            Ok(None)
        }
        _ => Ok(None),
    }
}
