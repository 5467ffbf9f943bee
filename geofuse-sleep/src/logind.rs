//! Proxy for the logind manager interface, limited to the sleep
//! broadcast.

#[zbus::proxy(
    interface = "org.freedesktop.login1.Manager",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1"
)]
pub(crate) trait Manager {
    /// Broadcast shortly before the host sleeps (`start = true`) and
    /// again after it resumes (`start = false`).
    #[zbus(signal)]
    fn prepare_for_sleep(&self, start: bool) -> zbus::Result<()>;
}
