//! Key handling for the message input.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub shift: bool,
}

impl KeyPress {
    pub fn enter() -> Self {
        Self {
            key: Key::Enter,
            shift: false,
        }
    }

    pub fn shift_enter() -> Self {
        Self {
            key: Key::Enter,
            shift: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Send the message; the default newline is suppressed.
    Submit,
    /// Keep editing, inserting a line break.
    InsertNewline,
    /// Not handled here.
    Ignore,
}

pub fn action_for(press: KeyPress) -> InputAction {
    match press {
        KeyPress {
            key: Key::Enter,
            shift: false,
        } => InputAction::Submit,
        KeyPress {
            key: Key::Enter,
            shift: true,
        } => InputAction::InsertNewline,
        _ => InputAction::Ignore,
    }
}

/// Builds a message from terminal lines.
///
/// A terminal cannot report Shift+Enter, so a line ending in `\` stands in for
/// it: the backslash is dropped and the message continues on the next line.
#[derive(Debug, Default)]
pub struct MessageComposer {
    buffer: String,
}

impl MessageComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its newline). Returns the message on submit.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        let (text, press) = match line.strip_suffix('\\') {
            Some(head) => (head, KeyPress::shift_enter()),
            None => (line, KeyPress::enter()),
        };
        self.buffer.push_str(text);

        match action_for(press) {
            InputAction::Submit => Some(std::mem::take(&mut self.buffer)),
            InputAction::InsertNewline => {
                self.buffer.push('\n');
                None
            }
            InputAction::Ignore => None,
        }
    }

    pub fn is_composing(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
