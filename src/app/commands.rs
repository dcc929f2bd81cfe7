//! Inbound relay commands.
//!
//! The broker link manager turns payloads received on the control topic
//! into [`Command`]s and queues them for the actuator controller.

/// Manual / automatic relay control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Force the relay on and leave automatic mode.
    SetOn,
    /// Force the relay off and leave automatic mode.
    SetOff,
    /// Re-enable automatic hysteresis control.
    SetAuto,
}

impl Command {
    /// Parse a control-topic payload.
    ///
    /// Accepts `ON`/`1`/`true`, `OFF`/`0`/`false` and `AUTO`; the word
    /// forms match regardless of ASCII case and surrounding whitespace.
    /// Anything else yields `None` and must be ignored by the caller.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let text = core::str::from_utf8(payload).ok()?.trim();
        let is = |word: &str| text.eq_ignore_ascii_case(word);

        if is("ON") || text == "1" || is("true") {
            Some(Self::SetOn)
        } else if is("OFF") || text == "0" || is("false") {
            Some(Self::SetOff)
        } else if is("AUTO") {
            Some(Self::SetAuto)
        } else {
            None
        }
    }
}
