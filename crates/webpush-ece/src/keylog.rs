//! Optional logging of intermediate key material.
//!
//! Interoperability debugging needs to see salts, derived keys and nonces.
//! The engine takes a [`KeyLog`] at construction instead of reading a global
//! switch, so two engines in the same process can log differently.

use std::fmt;

/// Sink for labelled intermediate values.
pub trait KeyLog: Send + Sync {
    /// Record one value.
    fn log(&self, label: &str, data: &[u8]);
}

/// Writes each value as hex through `tracing` at TRACE level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingKeyLog;

impl KeyLog for TracingKeyLog {
    fn log(&self, label: &str, data: &[u8]) {
        tracing::trace!(
            target: "webpush_ece::keylog",
            label,
            len = data.len(),
            value = %hex::encode(data),
        );
    }
}

impl<F> KeyLog for F
where
    F: Fn(&str, &[u8]) + Send + Sync,
{
    fn log(&self, label: &str, data: &[u8]) {
        self(label, data)
    }
}

/// Borrowed handle the codec passes around; a no-op when empty.
#[derive(Clone, Copy)]
pub(crate) struct KeyLogger<'a>(pub(crate) Option<&'a dyn KeyLog>);

impl KeyLogger<'_> {
    pub(crate) fn log(&self, label: &str, data: &[u8]) {
        if let Some(sink) = self.0 {
            sink.log(label, data);
        }
    }
}

impl fmt::Debug for KeyLogger<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyLogger").field(&self.0.is_some()).finish()
    }
}
