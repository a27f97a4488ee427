use serde::{Deserialize, Serialize};

/// Raw candidate fields returned by the optional LLM pre-extraction step.
/// Transient: validated before use, never persisted, never authoritative.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingEntities {
    #[serde(default)]
    pub guests: Option<u32>,
    /// Free-form time text, e.g. "8pm" or "19:30".
    #[serde(default)]
    pub time: Option<String>,
    /// Expected ISO `YYYY-MM-DD`; anything else fails validation.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

/// Extraction output after the validation gate. `needs_time_clarification`
/// is set when the hint carried a bare 1-12 hour with no meridiem, which the
/// dialog engine must route through the clarification sub-protocol instead of
/// accepting.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBooking {
    pub guests: Option<u32>,
    pub time_display: Option<String>,
    pub date_iso: Option<String>,
    pub name: Option<String>,
    pub needs_time_clarification: Option<u32>,
}

impl NormalizedBooking {
    pub fn is_empty(&self) -> bool {
        self.guests.is_none()
            && self.time_display.is_none()
            && self.date_iso.is_none()
            && self.name.is_none()
            && self.needs_time_clarification.is_none()
    }
}
