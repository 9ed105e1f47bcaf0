pub mod discovery;
pub mod port;
pub mod runtime;
pub mod tty;
