use super::dom::{is_valid_width, Field, Node, Toast, ToastKind};
use crate::driver::{DomEvent, ElementSnapshot, PageDriver};
use crate::keyboard::{Keystroke, SpecialKey};
use crate::locator::Selector;
use crate::network::{
    origin_of, AdaptCssRequest, HttpMethod, InterceptedRequest, MockResponse, NetworkInterceptor,
    ADAPT_CSS_PATH,
};
use crate::page_object::messages;
use crate::result::{HarnessError, HarnessResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// `localStorage` key holding the theme
pub const THEME_STORAGE_KEY: &str = "theme";

/// Colour theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    /// Light theme, moon icon shown
    #[default]
    Light,
    /// Dark theme, sun icon shown
    Dark,
}

impl Theme {
    const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

#[derive(Debug, Default, Clone)]
struct FieldState {
    value: String,
    /// Caret position in chars
    caret: usize,
    /// Next inserted text replaces the whole value
    selected: bool,
}

impl FieldState {
    fn byte_at(&self, caret: usize) -> usize {
        self.value
            .char_indices()
            .nth(caret)
            .map_or(self.value.len(), |(i, _)| i)
    }

    fn char_len(&self) -> usize {
        self.value.chars().count()
    }

    fn set(&mut self, value: &str) {
        self.value = value.to_string();
        self.caret = self.char_len();
        self.selected = false;
    }

    fn take_selection(&mut self) -> bool {
        if self.selected {
            self.set("");
            true
        } else {
            false
        }
    }

    fn insert(&mut self, c: char) {
        self.take_selection();
        let at = self.byte_at(self.caret);
        self.value.insert(at, c);
        self.caret += 1;
    }

    fn backspace(&mut self) {
        if self.take_selection() || self.caret == 0 {
            return;
        }
        let at = self.byte_at(self.caret - 1);
        self.value.remove(at);
        self.caret -= 1;
    }

    fn delete(&mut self) {
        if self.take_selection() || self.caret >= self.char_len() {
            return;
        }
        let at = self.byte_at(self.caret);
        self.value.remove(at);
    }
}

#[derive(Debug)]
struct PendingResponse {
    due: Instant,
    response: MockResponse,
}

#[derive(Debug, Default)]
struct AppState {
    url: Option<String>,
    local_storage: BTreeMap<String, String>,
    theme: Theme,
    fields: BTreeMap<FieldKey, FieldState>,
    focused: Option<Node>,
    toasts: Vec<Toast>,
    pending: Vec<PendingResponse>,
    clipboard: String,
    history: Vec<String>,
}

/// `Field` keyed for ordered storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum FieldKey {
    Code,
    CurrentWidth,
    TargetWidth,
    Result,
}

impl From<Field> for FieldKey {
    fn from(field: Field) -> Self {
        match field {
            Field::Code => Self::Code,
            Field::CurrentWidth => Self::CurrentWidth,
            Field::TargetWidth => Self::TargetWidth,
            Field::Result => Self::Result,
        }
    }
}

impl AppState {
    fn field(&self, field: Field) -> &str {
        self.fields
            .get(&field.into())
            .map_or("", |f| f.value.as_str())
    }

    fn field_mut(&mut self, field: Field) -> &mut FieldState {
        self.fields.entry(field.into()).or_default()
    }

    fn rendered(&self) -> Vec<Node> {
        if self.url.is_none() {
            return Vec::new();
        }
        let mut nodes = vec![
            Node::ToggleButton,
            match self.theme {
                Theme::Light => Node::IconMoon,
                Theme::Dark => Node::IconSun,
            },
            Node::Form,
            Node::Field(Field::Code),
            Node::Field(Field::CurrentWidth),
            Node::Field(Field::TargetWidth),
            Node::Submit,
            Node::Field(Field::Result),
        ];
        if !self.field(Field::Result).is_empty() {
            nodes.push(Node::CopyButton);
        }
        nodes.extend(self.toasts.iter().map(|t| Node::Toast(t.kind)));
        nodes
    }

    fn snapshot(&self, node: Node) -> ElementSnapshot {
        let focused = self.focused == Some(node);
        match node {
            Node::Field(field) => node.snapshot("", Some(self.field(field)), focused),
            Node::Toast(kind) => {
                let text = self
                    .toasts
                    .iter()
                    .find(|t| t.kind == kind)
                    .map_or("", |t| t.text.as_str());
                node.snapshot(text, None, focused)
            }
            Node::Submit => node.snapshot("Convert", None, focused),
            Node::CopyButton => node.snapshot("Copy", None, focused),
            _ => node.snapshot("", None, focused),
        }
    }

    fn origin(&self) -> String {
        self.url.as_deref().and_then(origin_of).unwrap_or_default()
    }

    fn show(&mut self, toast: Toast) {
        self.toasts.retain(|t| t.kind != toast.kind);
        self.toasts.push(toast);
    }

    fn copy_result(&mut self) {
        self.clipboard = self.field(Field::Result).to_string();
        self.show(Toast::copied());
    }

    fn apply_response(&mut self, response: &MockResponse) {
        if response.is_success() {
            self.field_mut(Field::Result).set(&response.body_string());
            self.copy_result();
        } else {
            self.show(Toast::new(
                ToastKind::RequestFailed,
                format!("Request failed with status {}.", response.status),
            ));
        }
    }

    fn pump(&mut self) {
        let now = Instant::now();
        let (due, waiting): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.pending).into_iter().partition(|p| p.due <= now);
        self.pending = waiting;
        for pending in due {
            self.apply_response(&pending.response);
        }
    }

    /// First failing check wins and shows a single toast
    fn validation_error(&self) -> Option<Toast> {
        let current = self.field(Field::CurrentWidth).trim();
        let target = self.field(Field::TargetWidth).trim();
        if current.is_empty() {
            return Some(Toast::new(
                ToastKind::CurrentWidthRequired,
                messages::CURRENT_WIDTH_REQUIRED,
            ));
        }
        if target.is_empty() {
            return Some(Toast::new(
                ToastKind::TargetWidthRequired,
                messages::TARGET_WIDTH_REQUIRED,
            ));
        }
        if self.field(Field::Code).trim().is_empty() {
            return Some(Toast::new(
                ToastKind::CssCodeMissing,
                messages::CSS_CODE_REQUIRED,
            ));
        }
        if !is_valid_width(current) {
            return Some(Toast::new(
                ToastKind::InvalidCurrentWidth,
                messages::invalid_width(current),
            ));
        }
        if !is_valid_width(target) {
            return Some(Toast::new(
                ToastKind::InvalidTargetWidth,
                messages::invalid_width(target),
            ));
        }
        None
    }
}

/// In-memory css-adapt page.
///
/// Renders the theme toggle, the conversion form, the result field, the
/// copy button and the toast area, and posts conversions through the
/// attached [`NetworkInterceptor`]. Clipboard reads require permission
/// (granted by default, like the CDP driver does at launch) and a focused
/// element.
#[derive(Debug)]
pub struct MockApp {
    state: Mutex<AppState>,
    network: Mutex<Option<NetworkInterceptor>>,
    clipboard_permission: bool,
}

impl Default for MockApp {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApp {
    /// Create the app on `about:blank`
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AppState::default()),
            network: Mutex::new(None),
            clipboard_permission: true,
        }
    }

    /// Grant or deny clipboard-read permission
    #[must_use]
    pub const fn with_clipboard_permission(mut self, granted: bool) -> Self {
        self.clipboard_permission = granted;
        self
    }

    fn lock(&self) -> HarnessResult<MutexGuard<'_, AppState>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| HarnessError::driver("mock app state poisoned"))?;
        state.pump();
        Ok(state)
    }

    fn network(&self) -> Option<NetworkInterceptor> {
        self.network.lock().ok().and_then(|n| n.clone())
    }

    fn resolve_one(state: &AppState, css: &str) -> HarnessResult<Node> {
        let selector = Selector::parse(css)?;
        let path = selector.path();
        let found: Vec<Node> = state
            .rendered()
            .into_iter()
            .filter(|n| n.matches_path(&path))
            .collect();
        match found.as_slice() {
            [node] => Ok(*node),
            other => Err(HarnessError::driver(format!(
                "{css} matched {} elements, expected one",
                other.len()
            ))),
        }
    }

    fn editable(node: Node) -> HarnessResult<Field> {
        match node {
            Node::Field(field) if !field.is_readonly() => Ok(field),
            other => Err(HarnessError::driver(format!(
                "{} is not an editable field",
                other.data_cy()
            ))),
        }
    }

    fn activate(&self, state: &mut AppState, node: Node) {
        match node {
            Node::ToggleButton | Node::IconSun | Node::IconMoon => {
                state.theme = state.theme.toggled();
                state
                    .local_storage
                    .insert(THEME_STORAGE_KEY.to_string(), state.theme.as_str().to_string());
            }
            Node::Submit => self.submit_form(state),
            Node::CopyButton => state.copy_result(),
            _ => {}
        }
    }

    fn submit_form(&self, state: &mut AppState) {
        state.toasts.clear();
        if let Some(toast) = state.validation_error() {
            tracing::debug!(toast = toast.kind.data_cy(), "mock app rejected submission");
            state.show(toast);
            return;
        }

        let payload = AdaptCssRequest {
            code: state.field(Field::Code).to_string(),
            current_width: state.field(Field::CurrentWidth).trim().to_string(),
            target_width: state.field(Field::TargetWidth).trim().to_string(),
        };
        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(e) => {
                state.show(Toast::new(ToastKind::RequestFailed, e.to_string()));
                return;
            }
        };
        let request = InterceptedRequest::new(
            HttpMethod::Post,
            format!("{}{ADAPT_CSS_PATH}", state.origin()),
        )
        .with_header("content-type", "application/json")
        .with_body(body);

        let response = self.network().and_then(|net| net.handle(request));
        match response {
            Some(response) if response.delay_ms > 0 => {
                state.pending.push(PendingResponse {
                    due: Instant::now() + Duration::from_millis(response.delay_ms),
                    response,
                });
            }
            Some(response) => state.apply_response(&response),
            None => state.show(Toast::new(
                ToastKind::RequestFailed,
                "Could not reach the server.",
            )),
        }
    }

    fn press(&self, state: &mut AppState, field: Field, key: Keystroke) {
        match key {
            Keystroke::Char('\n') | Keystroke::Key(SpecialKey::Enter) if !field.is_multiline() => {
                self.submit_form(state);
            }
            Keystroke::Key(SpecialKey::Enter) => state.field_mut(field).insert('\n'),
            Keystroke::Char(c) => state.field_mut(field).insert(c),
            Keystroke::Key(SpecialKey::Backspace) => state.field_mut(field).backspace(),
            Keystroke::Key(SpecialKey::Delete) => state.field_mut(field).delete(),
            Keystroke::Key(SpecialKey::SelectAll) => state.field_mut(field).selected = true,
            Keystroke::Key(SpecialKey::LeftArrow) => {
                let f = state.field_mut(field);
                f.selected = false;
                f.caret = f.caret.saturating_sub(1);
            }
            Keystroke::Key(SpecialKey::RightArrow) => {
                let f = state.field_mut(field);
                f.selected = false;
                f.caret = (f.caret + 1).min(f.char_len());
            }
            Keystroke::Key(SpecialKey::Home) => {
                let f = state.field_mut(field);
                f.selected = false;
                f.caret = 0;
            }
            Keystroke::Key(SpecialKey::End) => {
                let f = state.field_mut(field);
                f.selected = false;
                f.caret = f.char_len();
            }
            Keystroke::Key(SpecialKey::Tab | SpecialKey::Escape) => {}
        }
    }

    /// Current theme
    pub fn theme(&self) -> HarnessResult<Theme> {
        Ok(self.lock()?.theme)
    }

    /// Value stored under `key`
    pub fn local_storage(&self, key: &str) -> HarnessResult<Option<String>> {
        Ok(self.lock()?.local_storage.get(key).cloned())
    }

    /// Clipboard content, ignoring permission and focus
    pub fn clipboard_text(&self) -> HarnessResult<String> {
        Ok(self.lock()?.clipboard.clone())
    }

    /// Put text on the clipboard as another application would
    pub fn write_clipboard(&self, text: &str) {
        if let Ok(mut state) = self.lock() {
            state.clipboard = text.to_string();
        }
    }

    /// Driver calls received since the last navigation
    pub fn history(&self) -> Vec<String> {
        self.lock().map(|s| s.history.clone()).unwrap_or_default()
    }

    /// Check if a driver call starting with `prefix` was received
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.history().iter().any(|c| c.starts_with(prefix))
    }

    /// Responses whose delay has not elapsed yet
    pub fn pending_responses(&self) -> HarnessResult<usize> {
        Ok(self.lock()?.pending.len())
    }
}

#[async_trait]
impl PageDriver for MockApp {
    async fn navigate(&self, url: &str) -> HarnessResult<()> {
        let mut state = self.lock()?;
        state.history.clear();
        state.history.push(format!("navigate:{url}"));
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(HarnessError::NavigationError {
                url: url.to_string(),
                message: "only http(s) URLs are served".to_string(),
            });
        }
        state.url = Some(url.to_string());
        state.fields.clear();
        state.toasts.clear();
        state.pending.clear();
        state.focused = None;
        state.theme = match state.local_storage.get(THEME_STORAGE_KEY).map(String::as_str) {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        };
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> HarnessResult<Vec<ElementSnapshot>> {
        let state = self.lock()?;
        let parsed = Selector::parse(selector)?;
        let path = parsed.path();
        Ok(state
            .rendered()
            .into_iter()
            .filter(|n| n.matches_path(&path))
            .map(|n| state.snapshot(n))
            .collect())
    }

    async fn clear(&self, selector: &str) -> HarnessResult<()> {
        let mut state = self.lock()?;
        state.history.push(format!("clear:{selector}"));
        let field = Self::editable(Self::resolve_one(&state, selector)?)?;
        state.field_mut(field).set("");
        Ok(())
    }

    async fn type_keys(&self, selector: &str, keys: &[Keystroke]) -> HarnessResult<()> {
        let mut state = self.lock()?;
        state.history.push(format!("type:{selector}:{}", keys.len()));
        let node = Self::resolve_one(&state, selector)?;
        let field = Self::editable(node)?;
        if state.focused != Some(node) {
            state.focused = Some(node);
            let f = state.field_mut(field);
            f.caret = f.char_len();
        }
        for key in keys {
            self.press(&mut state, field, *key);
        }
        Ok(())
    }

    async fn set_value(&self, selector: &str, value: &str) -> HarnessResult<()> {
        let mut state = self.lock()?;
        state.history.push(format!("set_value:{selector}"));
        let field = Self::editable(Self::resolve_one(&state, selector)?)?;
        state.field_mut(field).set(value);
        Ok(())
    }

    async fn dispatch_event(&self, selector: &str, event: DomEvent) -> HarnessResult<()> {
        let mut state = self.lock()?;
        state.history.push(format!("event:{event}:{selector}"));
        let node = Self::resolve_one(&state, selector)?;
        match event {
            DomEvent::Click => self.activate(&mut state, node),
            DomEvent::Submit if node == Node::Form => self.submit_form(&mut state),
            DomEvent::Focus => state.focused = Some(node),
            DomEvent::Submit
            | DomEvent::Paste
            | DomEvent::Input
            | DomEvent::Change
            | DomEvent::PointerDown => {}
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> HarnessResult<()> {
        let mut state = self.lock()?;
        state.history.push(format!("click:{selector}"));
        let node = Self::resolve_one(&state, selector)?;
        state.focused = Some(node);
        self.activate(&mut state, node);
        Ok(())
    }

    async fn submit(&self, selector: &str) -> HarnessResult<()> {
        let mut state = self.lock()?;
        state.history.push(format!("submit:{selector}"));
        match Self::resolve_one(&state, selector)? {
            Node::Form => {
                self.submit_form(&mut state);
                Ok(())
            }
            other => Err(HarnessError::driver(format!(
                "{} is not a form",
                other.data_cy()
            ))),
        }
    }

    async fn focus(&self, selector: &str) -> HarnessResult<()> {
        let mut state = self.lock()?;
        state.history.push(format!("focus:{selector}"));
        let node = Self::resolve_one(&state, selector)?;
        state.focused = Some(node);
        Ok(())
    }

    async fn read_clipboard(&self) -> HarnessResult<String> {
        let mut state = self.lock()?;
        state.history.push("read_clipboard".to_string());
        if !self.clipboard_permission {
            return Err(HarnessError::ClipboardUnavailable {
                reason: "clipboard-read permission not granted".to_string(),
            });
        }
        if state.focused.is_none() {
            return Err(HarnessError::ClipboardUnavailable {
                reason: "document is not focused".to_string(),
            });
        }
        Ok(state.clipboard.clone())
    }

    async fn clear_local_storage(&self) -> HarnessResult<()> {
        let mut state = self.lock()?;
        state.history.push("clear_local_storage".to_string());
        state.local_storage.clear();
        Ok(())
    }

    async fn attach_interceptor(&self, interceptor: NetworkInterceptor) -> HarnessResult<()> {
        let mut slot = self
            .network
            .lock()
            .map_err(|_| HarnessError::driver("mock app network slot poisoned"))?;
        *slot = Some(interceptor);
        Ok(())
    }
}
