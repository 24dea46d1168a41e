use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("tutorstream.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("tutorstream.client.request_errors");

pub(crate) static RESOLVE_BLANK: Counter = Counter::new("tutorstream.resolver.blank");
pub(crate) static RESOLVE_REMOTE: Counter = Counter::new("tutorstream.resolver.remote");
pub(crate) static RESOLVE_LOCAL: Counter = Counter::new("tutorstream.resolver.local");
pub(crate) static RESOLVE_DEADLINE: Counter = Counter::new("tutorstream.resolver.deadline");
pub(crate) static RESOLVE_DURATION: Moments =
    Moments::new("tutorstream.resolver.duration_seconds");

pub(crate) static STREAM_DELTAS: Counter = Counter::new("tutorstream.stream.deltas");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("tutorstream.stream.errors");
pub(crate) static STREAM_DEADLINE: Counter = Counter::new("tutorstream.stream.deadline");
pub(crate) static STREAM_DURATION: Moments = Moments::new("tutorstream.stream.duration_seconds");

pub(crate) static FINALIZE_APPENDS: Counter = Counter::new("tutorstream.finalize.appends");
pub(crate) static FINALIZE_DROPPED_EMPTY: Counter =
    Counter::new("tutorstream.finalize.dropped_empty");
pub(crate) static FINALIZE_UNSIGNALED: Counter = Counter::new("tutorstream.finalize.unsignaled");
pub(crate) static COMPLETE_RETRIES: Counter = Counter::new("tutorstream.finalize.complete_retries");
pub(crate) static COMPLETE_FAILURES: Counter =
    Counter::new("tutorstream.finalize.complete_failures");

pub(crate) static FALLBACK_REPLIES: Counter = Counter::new("tutorstream.fallback.replies");

pub(crate) static CACHE_READ_ERRORS: Counter = Counter::new("tutorstream.cache.read_errors");
pub(crate) static CACHE_WRITE_ERRORS: Counter = Counter::new("tutorstream.cache.write_errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&RESOLVE_BLANK);
    collector.register_counter(&RESOLVE_REMOTE);
    collector.register_counter(&RESOLVE_LOCAL);
    collector.register_counter(&RESOLVE_DEADLINE);
    collector.register_moments(&RESOLVE_DURATION);

    collector.register_counter(&STREAM_DELTAS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_DEADLINE);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&FINALIZE_APPENDS);
    collector.register_counter(&FINALIZE_DROPPED_EMPTY);
    collector.register_counter(&FINALIZE_UNSIGNALED);
    collector.register_counter(&COMPLETE_RETRIES);
    collector.register_counter(&COMPLETE_FAILURES);

    collector.register_counter(&FALLBACK_REPLIES);

    collector.register_counter(&CACHE_READ_ERRORS);
    collector.register_counter(&CACHE_WRITE_ERRORS);
}
