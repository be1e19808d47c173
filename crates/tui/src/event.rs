//! Key routing result shared by widgets.

/// Whether a widget handled a key.
///
/// The composer sees keys first; anything it reports as
/// [`EventStatus::NotConsumed`] falls through to the log view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Consumed,
    NotConsumed,
}
