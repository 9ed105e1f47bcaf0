use std::time::Duration;

use serialport::{DataBits, Parity, StopBits};

/// How the device node is opened.
///
/// Embedded ARM boards open the node non-blocking; everywhere else the node is
/// opened blocking and prevented from becoming the controlling terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    NonBlocking,
    NoControllingTerminal,
}

impl OpenMode {
    pub const fn platform_default() -> Self {
        if cfg!(target_arch = "arm") {
            OpenMode::NonBlocking
        } else {
            OpenMode::NoControllingTerminal
        }
    }
}

impl Default for OpenMode {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// What `read` does when the device vanishes (a zero-byte read).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Pause between two `initialize` attempts.
    pub delay: Duration,
    /// `None` keeps retrying until the device comes back.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    pub fn bounded(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    pub open_mode: OpenMode,
    /// Inter-character read timeout in deciseconds (`VTIME`).
    pub read_timeout_ds: u8,
    /// Minimum bytes a blocking read waits for (`VMIN`).
    pub min_read_size: u8,
    pub low_latency: bool,
    pub restore_on_close: bool,
    pub reconnect: ReconnectPolicy,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            open_mode: OpenMode::platform_default(),
            read_timeout_ds: 1,
            min_read_size: 18,
            low_latency: false,
            restore_on_close: true,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl SerialConfig {
    pub fn new(baud: u32) -> Self {
        Self {
            baud,
            ..Self::default()
        }
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Accepts the one-letter parity codes: `O`/`o` odd, `E`/`e` even, anything else none.
    pub fn with_parity_char(self, code: char) -> Self {
        self.with_parity(parity_from_char(code))
    }

    pub fn with_data_bits(mut self, data_bits: u8) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: u8) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub fn with_open_mode(mut self, mode: OpenMode) -> Self {
        self.open_mode = mode;
        self
    }

    pub fn with_read_timing(mut self, read_timeout_ds: u8, min_read_size: u8) -> Self {
        self.read_timeout_ds = read_timeout_ds;
        self.min_read_size = min_read_size;
        self
    }

    pub fn with_low_latency(mut self, enabled: bool) -> Self {
        self.low_latency = enabled;
        self
    }

    pub fn with_restore_on_close(mut self, enabled: bool) -> Self {
        self.restore_on_close = enabled;
        self
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn data_bits(&self) -> DataBits {
        match self.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        }
    }

    pub fn stop_bits(&self) -> StopBits {
        match self.stop_bits {
            2 => StopBits::Two,
            _ => StopBits::One,
        }
    }
}

pub fn parity_from_char(code: char) -> Parity {
    match code {
        'O' | 'o' => Parity::Odd,
        'E' | 'e' => Parity::Even,
        _ => Parity::None,
    }
}

pub fn parity_to_char(parity: Parity) -> char {
    match parity {
        Parity::Odd => 'O',
        Parity::Even => 'E',
        Parity::None => 'N',
    }
}
