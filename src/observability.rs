use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("qualle.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("qualle.client.request_errors");

pub(crate) static STREAM_BYTES: Counter = Counter::new("qualle.stream.bytes");
pub(crate) static STREAM_EVENTS: Counter = Counter::new("qualle.stream.events");
pub(crate) static STREAM_SKIPPED_RECORDS: Counter = Counter::new("qualle.stream.skipped_records");
pub(crate) static STREAM_DROPPED_RECORDS: Counter = Counter::new("qualle.stream.dropped_records");

pub(crate) static CHAT_TURNS: Counter = Counter::new("qualle.chat.turns");
pub(crate) static CHAT_TURN_FAILURES: Counter = Counter::new("qualle.chat.turn_failures");
pub(crate) static CHAT_TURN_DURATION: Moments = Moments::new("qualle.chat.turn_duration_seconds");
pub(crate) static CHAT_CITATIONS_OPENED: Counter = Counter::new("qualle.chat.citations_opened");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_SKIPPED_RECORDS);
    collector.register_counter(&STREAM_DROPPED_RECORDS);

    collector.register_counter(&CHAT_TURNS);
    collector.register_counter(&CHAT_TURN_FAILURES);
    collector.register_moments(&CHAT_TURN_DURATION);
    collector.register_counter(&CHAT_CITATIONS_OPENED);
}
