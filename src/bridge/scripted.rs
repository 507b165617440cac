use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use futures_util::future::{ready, FutureExt};
use serde_json::Value;
use tokio::sync::oneshot;

use super::{
    BridgeError, BridgeFuture, CommandName, EventChannel, HostSettings, InvokeChannel,
    NativeHost, PushHandler, Subscription, WindowHandle, CONTENT_PROTECTION_CHANGED,
    RESIZE_EVENT,
};
use crate::overlay::menu::MenuItemId;

type Reply = Result<Value, String>;

/// How a capability answers when probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Present,
    Absent,
    Broken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOp {
    Minimize,
    ToggleMaximize,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub command: String,
    pub args: Value,
}

struct HostState {
    settings: HostSettings,
    content_protected: bool,
    is_dev: bool,
    maximized: bool,
    maximize_pinned: bool,
    badge_text: Option<Option<String>>,
    overrides: HashMap<CommandName, Reply>,
    deferred: HashMap<CommandName, VecDeque<oneshot::Receiver<Reply>>>,
    calls: Vec<RecordedCall>,
    window_ops: Vec<WindowOp>,
    listeners: Vec<(u64, String, PushHandler)>,
    resize_handlers: Vec<(u64, Rc<dyn Fn()>)>,
    next_token: u64,
    outbox: Vec<(String, Value)>,
    core: Availability,
    events: Availability,
    window: Availability,
    resize_hook: bool,
}

impl HostState {
    fn token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn toggle_protection(&mut self) {
        self.content_protected = !self.content_protected;
        self.outbox.push((
            CONTENT_PROTECTION_CHANGED.to_string(),
            Value::Bool(self.content_protected),
        ));
    }

    fn answer(&mut self, command: CommandName, args: &Value) -> Reply {
        match command {
            CommandName::ToggleContentProtection => {
                self.toggle_protection();
                Ok(Value::Null)
            }
            CommandName::UpdateNotificationBadge => {
                let text = args.get("text").and_then(Value::as_str).map(str::to_string);
                self.badge_text = Some(text);
                Ok(Value::Null)
            }
            CommandName::GetIsMaximized => Ok(Value::Bool(self.maximized)),
            CommandName::GetIsDev => Ok(Value::Bool(self.is_dev)),
            CommandName::GetSettings => {
                serde_json::to_value(&self.settings).map_err(|err| err.to_string())
            }
            CommandName::GetContentProtection => Ok(Value::Bool(self.content_protected)),
            CommandName::MenuAction => {
                let id = args
                    .get("id")
                    .and_then(Value::as_str)
                    .and_then(MenuItemId::parse);
                match id {
                    Some(MenuItemId::ContentProtection) => self.toggle_protection(),
                    Some(MenuItemId::Autostart) => {
                        self.settings.auto_start = !self.settings.auto_start
                    }
                    Some(MenuItemId::StartMinimized) => {
                        self.settings.start_minimized = !self.settings.start_minimized
                    }
                    Some(MenuItemId::Log(level)) => {
                        self.settings.log_level = Some(level.as_str().to_string())
                    }
                    Some(MenuItemId::CloseWindow) | None => {
                        return Err(format!("unsupported menu id {}", args["id"]));
                    }
                }
                Ok(Value::Null)
            }
        }
    }
}

/// Resolves a reply queued with [`ScriptedHost::defer`].
pub struct DeferredReply {
    sender: oneshot::Sender<Reply>,
}

impl DeferredReply {
    pub fn resolve(self, value: Value) {
        let _ = self.sender.send(Ok(value));
    }

    pub fn reject(self, message: &str) {
        let _ = self.sender.send(Err(message.to_string()));
    }
}

/// A native host for headless sessions and tests. Commands are answered from
/// a small model of the native side unless a reply has been queued for them.
/// Every invocation is recorded.
#[derive(Clone)]
pub struct ScriptedHost {
    state: Rc<RefCell<HostState>>,
}

impl Default for ScriptedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(HostState {
                settings: HostSettings {
                    log_level: Some("info".to_string()),
                    ..Default::default()
                },
                content_protected: false,
                is_dev: false,
                maximized: false,
                maximize_pinned: false,
                badge_text: None,
                overrides: HashMap::new(),
                deferred: HashMap::new(),
                calls: Vec::new(),
                window_ops: Vec::new(),
                listeners: Vec::new(),
                resize_handlers: Vec::new(),
                next_token: 0,
                outbox: Vec::new(),
                core: Availability::Present,
                events: Availability::Present,
                window: Availability::Present,
                resize_hook: true,
            })),
        }
    }

    pub fn set_settings(&self, settings: HostSettings) {
        self.state.borrow_mut().settings = settings;
    }

    pub fn settings(&self) -> HostSettings {
        self.state.borrow().settings.clone()
    }

    pub fn set_content_protected(&self, protected: bool) {
        self.state.borrow_mut().content_protected = protected;
    }

    pub fn content_protected(&self) -> bool {
        self.state.borrow().content_protected
    }

    pub fn set_dev(&self, is_dev: bool) {
        self.state.borrow_mut().is_dev = is_dev;
    }

    pub fn set_maximized(&self, maximized: bool) {
        self.state.borrow_mut().maximized = maximized;
    }

    pub fn maximized(&self) -> bool {
        self.state.borrow().maximized
    }

    /// Makes `toggle_maximize` succeed without changing the window state,
    /// like a window manager refusing the request.
    pub fn pin_maximize(&self) {
        self.state.borrow_mut().maximize_pinned = true;
    }

    /// Last badge text relayed through `update_notification_badge`.
    pub fn badge_text(&self) -> Option<Option<String>> {
        self.state.borrow().badge_text.clone()
    }

    pub fn reply(&self, command: CommandName, value: Value) {
        self.state.borrow_mut().overrides.insert(command, Ok(value));
    }

    pub fn reject(&self, command: CommandName, message: &str) {
        self.state
            .borrow_mut()
            .overrides
            .insert(command, Err(message.to_string()));
    }

    pub fn clear_reply(&self, command: CommandName) {
        self.state.borrow_mut().overrides.remove(&command);
    }

    /// Holds the next invocation of `command` until the returned handle is
    /// resolved or dropped.
    pub fn defer(&self, command: CommandName) -> DeferredReply {
        let (sender, receiver) = oneshot::channel();
        self.state
            .borrow_mut()
            .deferred
            .entry(command)
            .or_default()
            .push_back(receiver);
        DeferredReply { sender }
    }

    pub fn set_core(&self, availability: Availability) {
        self.state.borrow_mut().core = availability;
    }

    pub fn set_events(&self, availability: Availability) {
        self.state.borrow_mut().events = availability;
    }

    pub fn set_window(&self, availability: Availability) {
        self.state.borrow_mut().window = availability;
    }

    /// Removes the window handle's own resize hook so listeners fall back to
    /// the resize push event.
    pub fn without_resize_hook(&self) {
        self.state.borrow_mut().resize_hook = false;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.borrow().calls.clone()
    }

    pub fn calls_to(&self, command: CommandName) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| call.command == command.as_str())
            .count()
    }

    pub fn last_args(&self, command: CommandName) -> Option<Value> {
        self.state
            .borrow()
            .calls
            .iter()
            .rev()
            .find(|call| call.command == command.as_str())
            .map(|call| call.args.clone())
    }

    pub fn window_ops(&self) -> Vec<WindowOp> {
        self.state.borrow().window_ops.clone()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.state
            .borrow()
            .listeners
            .iter()
            .filter(|(_, name, _)| name == event)
            .count()
    }

    pub fn emit(&self, event: &str, payload: Value) {
        let handlers: Vec<PushHandler> = self
            .state
            .borrow()
            .listeners
            .iter()
            .filter(|(_, name, _)| name == event)
            .map(|(_, _, handler)| Rc::clone(handler))
            .collect();
        for handler in handlers {
            handler(payload.clone());
        }
    }

    /// Notifies resize hooks and emits the resize push event.
    pub fn emit_resize(&self) {
        let handlers: Vec<Rc<dyn Fn()>> = self
            .state
            .borrow()
            .resize_handlers
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        for handler in handlers {
            handler();
        }
        self.emit(RESIZE_EVENT, Value::Null);
    }

    fn flush_outbox(&self) {
        let outbox = std::mem::take(&mut self.state.borrow_mut().outbox);
        for (event, payload) in outbox {
            self.emit(&event, payload);
        }
    }

    fn window_op(&self, op: WindowOp) -> BridgeFuture<()> {
        {
            let mut state = self.state.borrow_mut();
            state.window_ops.push(op);
            if op == WindowOp::ToggleMaximize && !state.maximize_pinned {
                state.maximized = !state.maximized;
            }
        }
        ready(Ok(())).boxed_local()
    }

    fn probe<T>(&self, availability: Availability, capability: T) -> Result<Option<T>, BridgeError> {
        match availability {
            Availability::Present => Ok(Some(capability)),
            Availability::Absent => Ok(None),
            Availability::Broken => Err(BridgeError::Probe(
                "host global threw while being read".to_string(),
            )),
        }
    }
}

fn unsubscribe_listener(state: Weak<RefCell<HostState>>, token: u64) -> Subscription {
    Subscription::new(move || {
        if let Some(state) = state.upgrade() {
            let mut state = state.borrow_mut();
            state.listeners.retain(|(id, _, _)| *id != token);
            state.resize_handlers.retain(|(id, _)| *id != token);
        }
    })
}

impl InvokeChannel for ScriptedHost {
    fn invoke(&self, command: &str, args: Value) -> BridgeFuture<Value> {
        let command_name = command.to_string();
        let reply = {
            let mut state = self.state.borrow_mut();
            state.calls.push(RecordedCall {
                command: command_name.clone(),
                args: args.clone(),
            });

            let Some(name) = CommandName::parse(command) else {
                return ready(Err(BridgeError::Rejected {
                    command: command_name,
                    message: "unknown command".to_string(),
                }))
                .boxed_local();
            };

            if let Some(receiver) = state.deferred.get_mut(&name).and_then(VecDeque::pop_front) {
                return async move {
                    match receiver.await {
                        Ok(reply) => reply.map_err(|message| BridgeError::Rejected {
                            command: command_name,
                            message,
                        }),
                        Err(_) => Err(BridgeError::Dropped(command_name)),
                    }
                }
                .boxed_local();
            }

            let canned = state.overrides.get(&name).cloned();
            match canned {
                Some(reply) => reply,
                None => state.answer(name, &args),
            }
        };

        self.flush_outbox();
        ready(reply.map_err(|message| BridgeError::Rejected {
            command: command_name,
            message,
        }))
        .boxed_local()
    }
}

impl EventChannel for ScriptedHost {
    fn listen(&self, event: &str, handler: PushHandler) -> Result<Subscription, BridgeError> {
        let mut state = self.state.borrow_mut();
        let token = state.token();
        state.listeners.push((token, event.to_string(), handler));
        Ok(unsubscribe_listener(Rc::downgrade(&self.state), token))
    }
}

impl WindowHandle for ScriptedHost {
    fn minimize(&self) -> BridgeFuture<()> {
        self.window_op(WindowOp::Minimize)
    }

    fn toggle_maximize(&self) -> BridgeFuture<()> {
        self.window_op(WindowOp::ToggleMaximize)
    }

    fn close(&self) -> BridgeFuture<()> {
        self.window_op(WindowOp::Close)
    }

    fn on_resized(&self, handler: Rc<dyn Fn()>) -> Option<Result<Subscription, BridgeError>> {
        let mut state = self.state.borrow_mut();
        if !state.resize_hook {
            return None;
        }
        let token = state.token();
        state.resize_handlers.push((token, handler));
        Some(Ok(unsubscribe_listener(Rc::downgrade(&self.state), token)))
    }
}

impl NativeHost for ScriptedHost {
    fn core(&self) -> Result<Option<Rc<dyn InvokeChannel>>, BridgeError> {
        let availability = self.state.borrow().core;
        self.probe(availability, Rc::new(self.clone()) as Rc<dyn InvokeChannel>)
    }

    fn events(&self) -> Result<Option<Rc<dyn EventChannel>>, BridgeError> {
        let availability = self.state.borrow().events;
        self.probe(availability, Rc::new(self.clone()) as Rc<dyn EventChannel>)
    }

    fn current_window(&self) -> Result<Option<Rc<dyn WindowHandle>>, BridgeError> {
        let availability = self.state.borrow().window;
        self.probe(availability, Rc::new(self.clone()) as Rc<dyn WindowHandle>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn menu_action_drives_native_state() {
        let host = ScriptedHost::new();
        host.invoke("menu_action", json!({ "id": "menu.autostart" }))
            .await
            .unwrap();
        host.invoke("menu_action", json!({ "id": "menu.log.debug" }))
            .await
            .unwrap();

        let settings = host.settings();
        assert!(settings.auto_start);
        assert_eq!(settings.log_level.as_deref(), Some("debug"));
    }

    #[tokio::test]
    async fn deferred_reply_waits_for_resolution() {
        let host = ScriptedHost::new();
        let pending = host.defer(CommandName::GetIsDev);
        let reply = host.invoke("get_is_dev", json!({}));
        pending.resolve(Value::Bool(true));
        assert_eq!(reply.await.unwrap(), Value::Bool(true));

        let dropped = host.defer(CommandName::GetIsDev);
        let reply = host.invoke("get_is_dev", json!({}));
        drop(dropped);
        assert!(matches!(reply.await, Err(BridgeError::Dropped(_))));
    }

    #[tokio::test]
    async fn toggling_protection_pushes_an_event() {
        let host = ScriptedHost::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        host.listen(
            CONTENT_PROTECTION_CHANGED,
            Rc::new(move |payload: Value| sink.borrow_mut().push(payload)),
        )
        .unwrap();

        host.invoke("toggle_content_protection", json!({}))
            .await
            .unwrap();
        assert_eq!(*seen.borrow(), vec![Value::Bool(true)]);
    }
}
