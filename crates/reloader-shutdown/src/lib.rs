pub mod signal;

pub use signal::{recv_shutdown, ShutdownSignal, SignalHandler};
