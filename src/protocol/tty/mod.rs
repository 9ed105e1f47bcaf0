// Platform-dispatched TTY backend

pub mod termios;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod tty_unix;
        pub use tty_unix::{TermiosConnector, TtyLink};
    } else {
        compile_error!("ttylink drives termios devices and only builds on POSIX hosts");
    }
}
