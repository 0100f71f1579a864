use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Where keyboard input is routed right now. An active overlay owns the
/// keyboard exclusively; a list in filter-edit mode owns it next; otherwise
/// the mapping depends on the class of the visible view.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputContext {
    List,
    Detail,
    LogView,
    EventsView,
    Connecting,
    TextEntry,
    Confirm,
    Picker,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
    Select,
    Back,
    Refresh,
    OpenLogs,
    Delete,
    Restart,
    Scale,
    ToggleMetrics,
    StartFilter,
    StartSearch,
    ToggleHelp,
    Follow,
    Timestamps,
    TogglePrevious,
    ChangeContainer,
    NextMatch,
    PrevMatch,
    WarningsOnly,
    CycleKind,
    GotoNamespaces,
    GotoPods,
    GotoDeployments,
    GotoServices,
    GotoEvents,
    GotoSshHosts,
    SubmitInput,
    CancelInput,
    Backspace,
    InputChar(char),
    ConfirmYes,
    ConfirmNo,
    ConfirmToggle,
    ConfirmLeft,
    ConfirmRight,
    ConfirmSelected,
}

pub fn map_key(context: InputContext, key: KeyEvent) -> Option<Action> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }

    match context {
        InputContext::List => map_list_key(key),
        InputContext::Detail => map_detail_key(key),
        InputContext::LogView => map_log_view_key(key),
        InputContext::EventsView => map_events_key(key),
        InputContext::Connecting => None,
        InputContext::TextEntry => map_text_entry_key(key),
        InputContext::Confirm => map_confirm_key(key),
        InputContext::Picker => map_picker_key(key),
        InputContext::Help => map_help_key(key),
    }
}

fn map_scroll_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::Up),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::Top),
        KeyCode::Char('G') | KeyCode::End => Some(Action::Bottom),
        _ => None,
    }
}

fn map_common_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Char('r') | KeyCode::F(5) => Some(Action::Refresh),
        KeyCode::Esc => Some(Action::Back),
        KeyCode::Char('1') => Some(Action::GotoNamespaces),
        KeyCode::Char('2') => Some(Action::GotoPods),
        KeyCode::Char('3') => Some(Action::GotoDeployments),
        KeyCode::Char('4') => Some(Action::GotoServices),
        KeyCode::Char('5') => Some(Action::GotoEvents),
        KeyCode::Char('9') => Some(Action::GotoSshHosts),
        _ => None,
    }
}

fn map_list_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Enter => Some(Action::Select),
        KeyCode::Char('l') => Some(Action::OpenLogs),
        KeyCode::Char('d') => Some(Action::Delete),
        KeyCode::Char('R') => Some(Action::Restart),
        KeyCode::Char('s') => Some(Action::Scale),
        KeyCode::Char('m') => Some(Action::ToggleMetrics),
        KeyCode::Char('/') => Some(Action::StartFilter),
        _ => map_scroll_key(key).or_else(|| map_common_key(key)),
    }
}

fn map_detail_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('l') => Some(Action::OpenLogs),
        KeyCode::Char('d') => Some(Action::Delete),
        KeyCode::Char('R') => Some(Action::Restart),
        KeyCode::Char('s') => Some(Action::Scale),
        _ => map_scroll_key(key).or_else(|| map_common_key(key)),
    }
}

fn map_log_view_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('f') => Some(Action::Follow),
        KeyCode::Char('t') => Some(Action::Timestamps),
        KeyCode::Char('p') => Some(Action::TogglePrevious),
        KeyCode::Char('c') => Some(Action::ChangeContainer),
        KeyCode::Char('/') => Some(Action::StartSearch),
        KeyCode::Char('n') => Some(Action::NextMatch),
        KeyCode::Char('N') => Some(Action::PrevMatch),
        _ => map_scroll_key(key).or_else(|| map_common_key(key)),
    }
}

fn map_events_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('f') => Some(Action::Follow),
        KeyCode::Char('w') => Some(Action::WarningsOnly),
        // The events view has no selection, so 'k' is free for the kind
        // filter; Up still scrolls.
        KeyCode::Char('k') => Some(Action::CycleKind),
        KeyCode::Char('j') | KeyCode::Down => Some(Action::Down),
        KeyCode::Up => Some(Action::Up),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::Top),
        KeyCode::Char('G') | KeyCode::End => Some(Action::Bottom),
        _ => map_common_key(key),
    }
}

fn map_text_entry_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::CancelInput),
        KeyCode::Enter => Some(Action::SubmitInput),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

fn map_confirm_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => Some(Action::ConfirmYes),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(Action::ConfirmNo),
        KeyCode::Left | KeyCode::Char('h') => Some(Action::ConfirmLeft),
        KeyCode::Right | KeyCode::Char('l') => Some(Action::ConfirmRight),
        KeyCode::Tab => Some(Action::ConfirmToggle),
        KeyCode::Enter => Some(Action::ConfirmSelected),
        _ => None,
    }
}

fn map_picker_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::Up),
        KeyCode::Enter => Some(Action::Select),
        KeyCode::Esc => Some(Action::Back),
        _ => None,
    }
}

fn map_help_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('?') | KeyCode::Esc => Some(Action::ToggleHelp),
        KeyCode::Char('q') => Some(Action::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, InputContext, map_key};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn list_mode_maps_quit() {
        assert_eq!(
            map_key(InputContext::List, press(KeyCode::Char('q'))),
            Some(Action::Quit)
        );
    }

    #[test]
    fn ctrl_c_quits_from_any_context() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(InputContext::TextEntry, key), Some(Action::Quit));
        assert_eq!(map_key(InputContext::Connecting, key), Some(Action::Quit));
    }

    #[test]
    fn connecting_swallows_ordinary_keys() {
        assert_eq!(map_key(InputContext::Connecting, press(KeyCode::Char('q'))), None);
        assert_eq!(map_key(InputContext::Connecting, press(KeyCode::Enter)), None);
    }

    #[test]
    fn list_mode_maps_mutating_keys() {
        assert_eq!(
            map_key(InputContext::List, press(KeyCode::Char('d'))),
            Some(Action::Delete)
        );
        let shift_r = KeyEvent::new(KeyCode::Char('R'), KeyModifiers::SHIFT);
        assert_eq!(map_key(InputContext::List, shift_r), Some(Action::Restart));
        assert_eq!(
            map_key(InputContext::List, press(KeyCode::Char('s'))),
            Some(Action::Scale)
        );
    }

    #[test]
    fn log_view_maps_follow_and_search() {
        assert_eq!(
            map_key(InputContext::LogView, press(KeyCode::Char('f'))),
            Some(Action::Follow)
        );
        assert_eq!(
            map_key(InputContext::LogView, press(KeyCode::Char('/'))),
            Some(Action::StartSearch)
        );
        assert_eq!(
            map_key(InputContext::LogView, press(KeyCode::Char('n'))),
            Some(Action::NextMatch)
        );
        let shift_n = KeyEvent::new(KeyCode::Char('N'), KeyModifiers::SHIFT);
        assert_eq!(map_key(InputContext::LogView, shift_n), Some(Action::PrevMatch));
    }

    #[test]
    fn events_view_gives_k_to_the_kind_filter() {
        assert_eq!(
            map_key(InputContext::EventsView, press(KeyCode::Char('k'))),
            Some(Action::CycleKind)
        );
        assert_eq!(
            map_key(InputContext::EventsView, press(KeyCode::Up)),
            Some(Action::Up)
        );
    }

    #[test]
    fn text_entry_maps_chars_and_controls() {
        assert_eq!(
            map_key(InputContext::TextEntry, press(KeyCode::Char('a'))),
            Some(Action::InputChar('a'))
        );
        assert_eq!(
            map_key(InputContext::TextEntry, press(KeyCode::Enter)),
            Some(Action::SubmitInput)
        );
        assert_eq!(
            map_key(InputContext::TextEntry, press(KeyCode::Esc)),
            Some(Action::CancelInput)
        );
    }

    #[test]
    fn confirm_maps_yes_no_and_selection() {
        assert_eq!(
            map_key(InputContext::Confirm, press(KeyCode::Char('y'))),
            Some(Action::ConfirmYes)
        );
        assert_eq!(
            map_key(InputContext::Confirm, press(KeyCode::Esc)),
            Some(Action::ConfirmNo)
        );
        assert_eq!(
            map_key(InputContext::Confirm, press(KeyCode::Enter)),
            Some(Action::ConfirmSelected)
        );
        assert_eq!(
            map_key(InputContext::Confirm, press(KeyCode::Tab)),
            Some(Action::ConfirmToggle)
        );
    }

    #[test]
    fn digit_navigation_is_available_in_lists() {
        assert_eq!(
            map_key(InputContext::List, press(KeyCode::Char('2'))),
            Some(Action::GotoPods)
        );
        assert_eq!(
            map_key(InputContext::List, press(KeyCode::Char('9'))),
            Some(Action::GotoSshHosts)
        );
    }
}
