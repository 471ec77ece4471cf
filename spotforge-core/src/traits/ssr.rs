//! Solid-state relay output trait

/// Trait for the SSR switching the weld transformer primary
///
/// Implementations drive the relay via GPIO (directly or through an
/// opto-isolated driver stage).
pub trait SsrOutput {
    /// Switch the relay on or off
    fn set_on(&mut self, on: bool);

    /// Check if the relay is currently commanded on
    fn is_on(&self) -> bool;
}
