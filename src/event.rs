//! Process-wide log and event callbacks.
//!
//! The document model never prints. Hosts that want diagnostics install a
//! log callback; hosts that bridge document activity into another event bus
//! install an event callback. With nothing installed both emitters are
//! no-ops apart from a lock check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

/// Log level for debug callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

type EventCallback = Box<dyn Fn(&str, &str) + Send + Sync + 'static>;
type LogCallback = Box<dyn Fn(LogLevel, &str) + Send + Sync + 'static>;

static LOG_INSTALLED: AtomicBool = AtomicBool::new(false);
static EVENT_INSTALLED: AtomicBool = AtomicBool::new(false);

fn event_callback() -> &'static Mutex<Option<EventCallback>> {
    static CALLBACK: OnceLock<Mutex<Option<EventCallback>>> = OnceLock::new();
    CALLBACK.get_or_init(|| Mutex::new(None))
}

fn log_callback() -> &'static Mutex<Option<LogCallback>> {
    static CALLBACK: OnceLock<Mutex<Option<LogCallback>>> = OnceLock::new();
    CALLBACK.get_or_init(|| Mutex::new(None))
}

/// Set the global event callback.
///
/// The callback receives an event name (`"document_modified"`,
/// `"undoable_edit"`) and a `key=value` payload.
pub fn set_event_callback<F>(callback: F)
where
    F: Fn(&str, &str) + Send + Sync + 'static,
{
    if let Ok(mut guard) = event_callback().lock() {
        *guard = Some(Box::new(callback));
        EVENT_INSTALLED.store(true, Ordering::Release);
    }
}

/// Remove the global event callback.
pub fn clear_event_callback() {
    if let Ok(mut guard) = event_callback().lock() {
        *guard = None;
        EVENT_INSTALLED.store(false, Ordering::Release);
    }
}

/// Emit an event to the registered callback.
pub fn emit_event(name: &str, data: &str) {
    if let Ok(guard) = event_callback().lock() {
        if let Some(callback) = guard.as_ref() {
            callback(name, data);
        }
    }
}

/// Emit an event whose payload is only built when a callback is installed.
pub(crate) fn emit_event_with(name: &str, data: impl FnOnce() -> String) {
    if EVENT_INSTALLED.load(Ordering::Acquire) {
        emit_event(name, &data());
    }
}

/// Set the global log callback.
pub fn set_log_callback<F>(callback: F)
where
    F: Fn(LogLevel, &str) + Send + Sync + 'static,
{
    if let Ok(mut guard) = log_callback().lock() {
        *guard = Some(Box::new(callback));
        LOG_INSTALLED.store(true, Ordering::Release);
    }
}

/// Remove the global log callback.
pub fn clear_log_callback() {
    if let Ok(mut guard) = log_callback().lock() {
        *guard = None;
        LOG_INSTALLED.store(false, Ordering::Release);
    }
}

/// Emit a log event.
pub fn emit_log(level: LogLevel, message: &str) {
    if let Ok(guard) = log_callback().lock() {
        if let Some(callback) = guard.as_ref() {
            callback(level, message);
        }
    }
}

/// Emit a log event whose message is only formatted when a callback is installed.
pub(crate) fn emit_log_with(level: LogLevel, message: impl FnOnce() -> String) {
    if LOG_INSTALLED.load(Ordering::Acquire) {
        emit_log(level, &message());
    }
}
