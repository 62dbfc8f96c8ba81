//! How results are reported on stdout.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Informational lines, progress dots and detailed results
    Full,
    /// Only `Ping`, `Download` and `Upload` lines
    Simple,
    /// Structured output only
    Json,
}

impl DisplayMode {
    /// `--json` wins over `--simple`.
    pub fn detect(json_flag: bool, simple_flag: bool) -> Self {
        if json_flag {
            DisplayMode::Json
        } else if simple_flag {
            DisplayMode::Simple
        } else {
            DisplayMode::Full
        }
    }

    /// Dots are only drawn in full mode, on a terminal, unless disabled.
    pub fn shows_progress(&self, no_progress: bool, is_tty: bool) -> bool {
        *self == DisplayMode::Full && is_tty && !no_progress
    }
}
