//! Access to the native host process.
//!
//! The host exposes three capabilities: a request/response channel, a push
//! event channel and a handle to the current window. Any of them may be
//! missing (the page loaded before the host wired its globals) or fail while
//! being probed. [`Bridge`] resolves them fresh on every access and turns
//! every failure into `None`, so callers only ever see "available" or
//! "not available".

use std::cell::Cell;
use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::page::Page;

mod commands;
pub mod scripted;

pub use commands::{
    CommandName, GetContentProtection, GetIsDev, GetIsMaximized, GetSettings, HostCommand,
    HostSettings, MenuAction, ToggleContentProtection, UpdateNotificationBadge,
};

/// Push event carrying the new content-protection state as a boolean.
pub const CONTENT_PROTECTION_CHANGED: &str = "content-protection-changed";
/// Window resize notification used when the window handle has no resize hook.
pub const RESIZE_EVENT: &str = "tauri://resize";

pub type BridgeFuture<T> = LocalBoxFuture<'static, Result<T, BridgeError>>;
pub type PushHandler = Rc<dyn Fn(Value)>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("native bridge is unavailable")]
    Unavailable,
    #[error("native host rejected '{command}': {message}")]
    Rejected { command: String, message: String },
    #[error("unexpected reply to '{command}': {source}")]
    Decode {
        command: CommandName,
        source: serde_json::Error,
    },
    #[error("native host dropped the reply to '{0}'")]
    Dropped(String),
    #[error("probing the native host failed: {0}")]
    Probe(String),
}

/// Request/response half of the bridge.
pub trait InvokeChannel {
    fn invoke(&self, command: &str, args: Value) -> BridgeFuture<Value>;
}

/// Push half of the bridge.
pub trait EventChannel {
    fn listen(&self, event: &str, handler: PushHandler) -> Result<Subscription, BridgeError>;
}

pub trait WindowHandle {
    fn minimize(&self) -> BridgeFuture<()>;
    fn toggle_maximize(&self) -> BridgeFuture<()>;
    fn close(&self) -> BridgeFuture<()>;

    /// `None` when this handle has no resize hook of its own; callers then
    /// fall back to [`RESIZE_EVENT`] on the event channel.
    fn on_resized(&self, handler: Rc<dyn Fn()>) -> Option<Result<Subscription, BridgeError>> {
        let _ = handler;
        None
    }
}

/// The host-provided global. Each probe may report absence (`Ok(None)`) or
/// fail outright.
pub trait NativeHost {
    fn core(&self) -> Result<Option<Rc<dyn InvokeChannel>>, BridgeError>;
    fn events(&self) -> Result<Option<Rc<dyn EventChannel>>, BridgeError>;
    fn current_window(&self) -> Result<Option<Rc<dyn WindowHandle>>, BridgeError>;
}

/// Handle returned by subscriptions. Dropping it keeps the subscription
/// alive; only [`Subscription::unsubscribe`] removes it.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    NotProbed,
    Available,
    Absent,
    Errored,
}

pub struct Bridge {
    host: Option<Rc<dyn NativeHost>>,
    last_probe: Cell<ProbeOutcome>,
}

impl Bridge {
    pub fn new(host: Option<Rc<dyn NativeHost>>) -> Self {
        Self {
            host,
            last_probe: Cell::new(ProbeOutcome::NotProbed),
        }
    }

    /// Outcome of the most recent probe, for diagnostics.
    pub fn last_probe(&self) -> ProbeOutcome {
        self.last_probe.get()
    }

    fn probe<T>(
        &self,
        capability: &'static str,
        probe: impl FnOnce(&dyn NativeHost) -> Result<Option<T>, BridgeError>,
    ) -> Option<T> {
        let Some(host) = self.host.as_deref() else {
            self.last_probe.set(ProbeOutcome::Absent);
            debug!(target = "bridge", capability, "native host global is absent");
            return None;
        };

        match probe(host) {
            Ok(Some(found)) => {
                self.last_probe.set(ProbeOutcome::Available);
                Some(found)
            }
            Ok(None) => {
                self.last_probe.set(ProbeOutcome::Absent);
                debug!(target = "bridge", capability, "native capability not exposed");
                None
            }
            Err(err) => {
                self.last_probe.set(ProbeOutcome::Errored);
                error!(target = "bridge", capability, error = %err, "failed to probe native capability");
                None
            }
        }
    }

    pub fn try_get_invoke(&self) -> Option<Invoker> {
        self.probe("invoke", |host| host.core())
            .map(|channel| Invoker { channel })
    }

    pub fn try_get_event_bus(&self) -> Option<EventBus> {
        self.probe("events", |host| host.events())
            .map(|channel| EventBus { channel })
    }

    pub fn try_get_window(&self) -> Option<Rc<dyn WindowHandle>> {
        self.probe("window", |host| host.current_window())
    }
}

#[derive(Clone)]
pub struct Invoker {
    channel: Rc<dyn InvokeChannel>,
}

impl Invoker {
    pub async fn call<C: HostCommand>(&self, command: C) -> Result<C::Output, BridgeError> {
        let reply = self.channel.invoke(C::NAME.as_str(), command.args()).await?;
        serde_json::from_value(reply).map_err(|source| BridgeError::Decode {
            command: C::NAME,
            source,
        })
    }

    /// Sends `command` on the page's task set and only logs the outcome.
    pub fn fire<C>(&self, page: &Page, command: C)
    where
        C: HostCommand + 'static,
    {
        let invoker = self.clone();
        page.spawn(async move {
            if let Err(err) = invoker.call(command).await {
                warn!(target = "bridge", command = %C::NAME, error = %err, "native command failed");
            }
        });
    }
}

#[derive(Clone)]
pub struct EventBus {
    channel: Rc<dyn EventChannel>,
}

impl EventBus {
    pub fn listen<F>(&self, event: &str, handler: F) -> Result<Subscription, BridgeError>
    where
        F: Fn(Value) + 'static,
    {
        self.channel.listen(event, Rc::new(handler))
    }
}

#[cfg(test)]
mod tests {
    use super::scripted::{Availability, ScriptedHost};
    use super::*;

    #[test]
    fn missing_global_reports_absent() {
        let bridge = Bridge::new(None);
        assert_eq!(bridge.last_probe(), ProbeOutcome::NotProbed);
        assert!(bridge.try_get_invoke().is_none());
        assert_eq!(bridge.last_probe(), ProbeOutcome::Absent);
    }

    #[test]
    fn failing_probe_is_swallowed_and_recorded() {
        let host = ScriptedHost::new();
        host.set_core(Availability::Broken);
        let bridge = Bridge::new(Some(Rc::new(host.clone())));

        assert!(bridge.try_get_invoke().is_none());
        assert_eq!(bridge.last_probe(), ProbeOutcome::Errored);

        host.set_core(Availability::Present);
        assert!(bridge.try_get_invoke().is_some());
        assert_eq!(bridge.last_probe(), ProbeOutcome::Available);
    }

    #[tokio::test]
    async fn typed_call_decodes_reply() {
        let host = ScriptedHost::new();
        host.set_maximized(true);
        let bridge = Bridge::new(Some(Rc::new(host.clone())));
        let invoker = bridge.try_get_invoke().unwrap();

        assert!(invoker.call(GetIsMaximized).await.unwrap());
        assert_eq!(host.calls_to(CommandName::GetIsMaximized), 1);
    }

    #[tokio::test]
    async fn malformed_reply_is_a_decode_error() {
        let host = ScriptedHost::new();
        host.reply(CommandName::GetContentProtection, serde_json::json!("yes"));
        let bridge = Bridge::new(Some(Rc::new(host)));
        let invoker = bridge.try_get_invoke().unwrap();

        let err = invoker.call(GetContentProtection).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Decode {
                command: CommandName::GetContentProtection,
                ..
            }
        ));
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let host = ScriptedHost::new();
        let bridge = Bridge::new(Some(Rc::new(host.clone())));
        let bus = bridge.try_get_event_bus().unwrap();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let subscription = bus
            .listen(CONTENT_PROTECTION_CHANGED, move |_| counter.set(counter.get() + 1))
            .unwrap();

        host.emit(CONTENT_PROTECTION_CHANGED, Value::Bool(true));
        subscription.unsubscribe();
        host.emit(CONTENT_PROTECTION_CHANGED, Value::Bool(false));
        assert_eq!(hits.get(), 1);
    }
}
