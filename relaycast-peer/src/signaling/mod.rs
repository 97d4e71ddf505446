mod signal_client;
mod signal_sink;

pub use signal_client::SignalClient;
pub use signal_sink::SignalSink;
