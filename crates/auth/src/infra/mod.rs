pub mod events;
pub mod notifier;
pub mod postgres;

pub use events::TracingEventSink;
pub use notifier::LogOnlyNotifier;
pub use postgres::PgAuthRepository;
