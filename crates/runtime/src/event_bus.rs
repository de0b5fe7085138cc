use foundation::time::Millis;

/// Structured diagnostic event.
///
/// A trace of activation decisions, kept for the host and for tests.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub at: Millis,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, at: Millis, kind: &'static str, message: impl Into<String>) {
        let message = message.into();
        log::trace!("[{kind}] {message}");
        self.events.push(Event { at, kind, message });
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}
