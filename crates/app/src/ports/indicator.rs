//! Status indicator port (e.g. an LED driven by the board support code).

/// Shows whether the device is operational.
pub trait StatusIndicator {
    /// Switch between "not yet operational" and "operational".
    fn set_operational(&self, operational: bool);
}

impl<T: StatusIndicator + ?Sized> StatusIndicator for std::sync::Arc<T> {
    fn set_operational(&self, operational: bool) {
        (**self).set_operational(operational);
    }
}
