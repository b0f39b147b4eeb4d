//! PIN entry state machine for the in-app vault challenge.
//!
//! The machine backs two dialogs: creating a new session PIN (enter, then
//! confirm) and unlocking with an existing PIN (single round). It is pure
//! state — the hosting UI renders the masked buffer, prompt, and error text,
//! feeds key presses in, and dismisses when [`PinChallenge::enter`] yields a
//! PIN.

use tracing::debug;

/// Minimum number of digits a PIN must have before Enter is accepted.
pub const MIN_PIN_LEN: usize = 4;

/// Maximum number of digits a PIN may have; further input is ignored.
pub const MAX_PIN_LEN: usize = 8;

/// Inline error shown when the confirmation entry does not match.
pub const MISMATCH_ERROR: &str = "PINs do not match";

/// What the dialog is being used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Two-phase create-and-confirm flow for a new session PIN.
    SetPasscode,
    /// Single-round entry to unlock an existing session.
    Unlock,
}

/// PIN entry state machine.
///
/// Created fresh per dialog invocation; never persisted.
#[derive(Debug, Clone)]
pub struct PinChallenge {
    mode: PinMode,
    entered: String,
    candidate: Option<String>,
    error: Option<&'static str>,
}

impl PinChallenge {
    /// Create a new challenge in the given mode with an empty buffer.
    pub fn new(mode: PinMode) -> Self {
        Self {
            mode,
            entered: String::new(),
            candidate: None,
            error: None,
        }
    }

    /// The mode this challenge was created with.
    pub fn mode(&self) -> PinMode {
        self.mode
    }

    /// Dialog title.
    pub fn title(&self) -> &'static str {
        match self.mode {
            PinMode::SetPasscode => "Create PIN",
            PinMode::Unlock => "Unlock",
        }
    }

    /// Current prompt text. In set-passcode mode this switches to the
    /// verification prompt once a candidate PIN has been captured.
    pub fn prompt(&self) -> &'static str {
        match self.mode {
            PinMode::SetPasscode if self.candidate.is_some() => "Verify PIN",
            PinMode::SetPasscode => "Create Session PIN",
            PinMode::Unlock => "Enter PIN to Unlock",
        }
    }

    /// Current inline error text, if any.
    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    /// Masked rendering of the buffer, one `*` per entered digit.
    pub fn display(&self) -> String {
        "*".repeat(self.entered.len())
    }

    /// Number of digits currently in the buffer.
    pub fn len(&self) -> usize {
        self.entered.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty()
    }

    /// Whether another digit would be accepted.
    pub fn can_append(&self) -> bool {
        self.entered.len() < MAX_PIN_LEN
    }

    /// Whether Delete is enabled.
    pub fn can_delete(&self) -> bool {
        !self.entered.is_empty()
    }

    /// Whether Enter is enabled.
    pub fn can_enter(&self) -> bool {
        self.entered.len() >= MIN_PIN_LEN
    }

    /// Append a digit (0-9). Input beyond [`MAX_PIN_LEN`] digits, or a
    /// non-digit value, is ignored.
    pub fn press(&mut self, digit: u8) {
        if digit > 9 || !self.can_append() {
            return;
        }
        self.error = None;
        self.entered.push((b'0' + digit) as char);
    }

    /// Remove the last digit from the buffer. No-op when empty.
    pub fn delete(&mut self) {
        self.entered.pop();
    }

    /// Handle the Enter key.
    ///
    /// Returns `Some(pin)` when the dialog should dismiss, carrying the
    /// entered (and, in set-passcode mode, confirmed) PIN. Returns `None`
    /// when the dialog stays open: fewer than [`MIN_PIN_LEN`] digits, the
    /// first phase of set-passcode mode, or a confirmation mismatch.
    pub fn enter(&mut self) -> Option<String> {
        if !self.can_enter() {
            return None;
        }

        match self.mode {
            PinMode::Unlock => Some(std::mem::take(&mut self.entered)),
            PinMode::SetPasscode => match self.candidate.take() {
                None => {
                    debug!("pin candidate captured, awaiting verification");
                    self.candidate = Some(std::mem::take(&mut self.entered));
                    None
                }
                Some(candidate) if candidate == self.entered => {
                    self.entered.clear();
                    Some(candidate)
                }
                Some(_) => {
                    debug!("pin verification mismatch, restarting entry");
                    self.entered.clear();
                    self.error = Some(MISMATCH_ERROR);
                    None
                }
            },
        }
    }
}
