//! Command dispatch and the interactive shell.

use std::io::{BufRead, Write};

use clap::Parser;
use color_eyre::eyre::{bail, Result};
use todo_core::{ApiError, EditState, Todo, TodoController, Transport};

use crate::config::{Command, ShellLine};

/// Run one command from the command line.
///
/// Everything except `register`, `login`, `logout` and `shell` needs the
/// stored session, so it is resumed first. Resuming already fetches the list,
/// so `list` only prints it.
pub fn run<T: Transport>(
    controller: &mut TodoController<T>,
    command: Command,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    match &command {
        Command::Shell => return shell(controller, input, out),
        Command::Cancel => bail!("`cancel` only works inside `todo shell`"),
        Command::Edit { text, .. } if text.is_empty() => {
            bail!("`edit` without text only works inside `todo shell`")
        }
        Command::Register { .. } | Command::Login { .. } | Command::Logout => {}
        _ => {
            if !controller.resume()? {
                bail!("not logged in, run `todo login <username> <password>` first");
            }
            if command == Command::List {
                return print_list(controller, out);
            }
        }
    }
    execute(controller, command, out)
}

/// Apply a single command to an already set-up controller.
pub fn execute<T: Transport>(controller: &mut TodoController<T>, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Register { username, password } => {
            controller.register(&username, &password)?;
            writeln!(out, "registered {username}, you can log in now")?;
        }
        Command::Login { username, password } => {
            controller.login(&username, &password)?;
            writeln!(out, "logged in as {username}")?;
            print_list(controller, out)?;
        }
        Command::Logout => {
            controller.logout()?;
            writeln!(out, "logged out")?;
        }
        Command::List => {
            controller.load()?;
            print_list(controller, out)?;
        }
        Command::Add { text } => {
            if controller.add(&text.join(" "))?.is_some() {
                print_list(controller, out)?;
            }
        }
        Command::Toggle { position } => {
            let id = todo_at(controller, position)?.id.clone();
            controller.toggle(&id)?;
            print_list(controller, out)?;
        }
        Command::Rm { position } => {
            let id = todo_at(controller, position)?.id.clone();
            controller.remove(&id)?;
            print_list(controller, out)?;
        }
        Command::Edit { position, text } => {
            let todo = todo_at(controller, position)?.clone();
            if controller.edit_state().is_none_or(|edit| edit.id != todo.id) {
                controller.start_edit(&todo.id, &todo.text);
            }
            if text.is_empty() {
                writeln!(out, "editing {position}: {}", todo.text)?;
                return Ok(());
            }
            controller.set_edit_text(&text.join(" "));
            if controller.save(&todo.id)? {
                print_list(controller, out)?;
            }
        }
        Command::Cancel => controller.cancel_edit(),
        Command::Mv { from, to } => {
            let len = controller.todos().len();
            let (Some(source), Some(dest)) = (from.checked_sub(1), to.checked_sub(1)) else {
                return Err(ApiError::IndexOutOfRange { index: 0, len }.into());
            };
            controller.reorder(source, dest)?;
            print_list(controller, out)?;
        }
        Command::Shell => bail!("already in a shell"),
    }
    Ok(())
}

/// Read commands line by line until EOF, `quit` or `exit`.
///
/// Command errors are printed and the loop carries on; only I/O errors on
/// `input`/`out` end it early.
pub fn shell<T: Transport>(controller: &mut TodoController<T>, input: impl BufRead, out: &mut impl Write) -> Result<()> {
    match controller.resume() {
        Ok(true) => print_list(controller, out)?,
        Ok(false) => writeln!(out, "not logged in, use `login <username> <password>`")?,
        Err(err) => writeln!(out, "session ended: {err}")?,
    }
    prompt(out)?;

    for line in input.lines() {
        let line = line?;
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.first() {
            None => {}
            Some(&"quit") | Some(&"exit") => break,
            Some(_) => match ShellLine::try_parse_from(words.iter().copied()) {
                Ok(ShellLine { command }) => {
                    if let Err(err) = execute(controller, with_typed_text(command, &line), out) {
                        writeln!(out, "error: {err}")?;
                    }
                }
                Err(err) => write!(out, "{err}")?,
            },
        }
        prompt(out)?;
    }
    Ok(())
}

/// Put back the free text of `add` and `edit` exactly as typed, since
/// splitting the line on whitespace loses runs of spaces.
fn with_typed_text(command: Command, line: &str) -> Command {
    match command {
        Command::Add { text } if !text.is_empty() => Command::Add {
            text: vec![words_after(line, 1).to_string()],
        },
        Command::Edit { position, text } if !text.is_empty() => Command::Edit {
            position,
            text: vec![words_after(line, 2).to_string()],
        },
        other => other,
    }
}

/// The rest of `line` after its first `count` whitespace-separated words.
fn words_after(line: &str, count: usize) -> &str {
    let mut rest = line.trim_start();
    for _ in 0..count {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest
}

fn prompt(out: &mut impl Write) -> Result<()> {
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}

/// Resolve a 1-based position from `list` output.
fn todo_at<T: Transport>(controller: &TodoController<T>, position: usize) -> Result<&Todo, ApiError> {
    let todos = controller.todos();
    position
        .checked_sub(1)
        .and_then(|index| todos.get(index))
        .ok_or(ApiError::IndexOutOfRange {
            index: position,
            len: todos.len(),
        })
}

fn print_list<T: Transport>(controller: &TodoController<T>, out: &mut impl Write) -> Result<()> {
    write!(out, "{}", render_list(controller.todos(), controller.edit_state()))?;
    Ok(())
}

pub fn render_list(todos: &[Todo], edit: Option<&EditState>) -> String {
    if todos.is_empty() {
        return "nothing to do\n".to_string();
    }
    let mut rendered = String::new();
    for (index, todo) in todos.iter().enumerate() {
        let mark = if todo.completed { 'x' } else { ' ' };
        rendered.push_str(&format!("{:>3}. [{mark}] {}", index + 1, todo.text));
        if let Some(edit) = edit.filter(|e| e.id == todo.id) {
            rendered.push_str(&format!("  (editing: {})", edit.text));
        }
        rendered.push('\n');
    }
    rendered
}
