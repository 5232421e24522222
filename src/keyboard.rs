use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Key {
    Backspace,
    Delete,
    Escape,
    Char(char),
}

/// A key press as reported by the host, with the modifier state at the time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyInput {
    pub key: Option<Key>,
    pub ctrl: bool,
    /// Cmd on macOS.
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
    /// True while a text field owns the keyboard.
    pub text_input_focused: bool,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self {
            key: Some(key),
            ..Self::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn in_text_input(mut self) -> Self {
        self.text_input_focused = true;
        self
    }

    fn command_modifier(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShortcutAction {
    DeleteSelected,
    Undo,
    Redo,
    ClearSelection,
}

/// Maps a key press to an editor action. Nothing fires while a text input has
/// focus, so typing and native text undo keep working.
pub fn resolve_shortcut(input: &KeyInput) -> Option<ShortcutAction> {
    if input.text_input_focused {
        return None;
    }

    match input.key.as_ref()? {
        Key::Backspace | Key::Delete if !input.command_modifier() && !input.alt => {
            Some(ShortcutAction::DeleteSelected)
        }
        Key::Escape => Some(ShortcutAction::ClearSelection),
        Key::Char(c) if input.command_modifier() && !input.alt => {
            match (c.to_ascii_lowercase(), input.shift) {
                ('z', false) => Some(ShortcutAction::Undo),
                ('z', true) | ('y', false) => Some(ShortcutAction::Redo),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_keys() {
        assert_eq!(
            resolve_shortcut(&KeyInput::new(Key::Backspace)),
            Some(ShortcutAction::DeleteSelected)
        );
        assert_eq!(
            resolve_shortcut(&KeyInput::new(Key::Delete)),
            Some(ShortcutAction::DeleteSelected)
        );
    }

    #[test]
    fn undo_and_redo_on_both_platforms() {
        assert_eq!(
            resolve_shortcut(&KeyInput::new(Key::Char('z')).ctrl()),
            Some(ShortcutAction::Undo)
        );
        assert_eq!(
            resolve_shortcut(&KeyInput::new(Key::Char('z')).meta()),
            Some(ShortcutAction::Undo)
        );
        assert_eq!(
            resolve_shortcut(&KeyInput::new(Key::Char('Z')).meta().shift()),
            Some(ShortcutAction::Redo)
        );
        assert_eq!(
            resolve_shortcut(&KeyInput::new(Key::Char('y')).ctrl()),
            Some(ShortcutAction::Redo)
        );
        assert_eq!(resolve_shortcut(&KeyInput::new(Key::Char('z'))), None);
    }

    #[test]
    fn suppressed_while_typing() {
        for input in [
            KeyInput::new(Key::Backspace),
            KeyInput::new(Key::Char('z')).ctrl(),
            KeyInput::new(Key::Char('y')).meta(),
        ] {
            assert_eq!(resolve_shortcut(&input.in_text_input()), None);
        }
    }
}
