//! Buzzer output

/// What the buzzer should do after an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCommand {
    /// Keep sounding until told otherwise
    Continuous { frequency_hz: u32 },
    /// One short pulse; does not repeat on its own
    Pulse { frequency_hz: u32, duration_ms: u32 },
    /// Stop any tone in progress
    Silence,
}

/// Tone generator driving the buzzer.
pub trait AlertOutput {
    type Error: core::fmt::Debug;

    /// Start a tone. `None` keeps it on until [`AlertOutput::silence`].
    fn tone(&mut self, frequency_hz: u32, duration_ms: Option<u32>) -> Result<(), Self::Error>;

    fn silence(&mut self) -> Result<(), Self::Error>;

    /// Execute an [`AlertCommand`].
    fn apply(&mut self, command: AlertCommand) -> Result<(), Self::Error> {
        match command {
            AlertCommand::Continuous { frequency_hz } => self.tone(frequency_hz, None),
            AlertCommand::Pulse {
                frequency_hz,
                duration_ms,
            } => self.tone(frequency_hz, Some(duration_ms)),
            AlertCommand::Silence => self.silence(),
        }
    }
}

impl<T: AlertOutput + ?Sized> AlertOutput for &mut T {
    type Error = T::Error;

    fn tone(&mut self, frequency_hz: u32, duration_ms: Option<u32>) -> Result<(), Self::Error> {
        (**self).tone(frequency_hz, duration_ms)
    }

    fn silence(&mut self) -> Result<(), Self::Error> {
        (**self).silence()
    }
}
