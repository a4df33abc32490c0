/// Platform hook held for the duration of a discovery run. Some platforms
/// drop multicast traffic unless a lock is held (Android's WifiManager
/// multicast lock is the canonical case); embedders supply an
/// implementation that takes and releases whatever their platform needs.
pub trait MulticastLock: Send + Sync {
    fn acquire(&self) -> std::io::Result<()>;
    fn release(&self);
}

/// Lock for platforms where multicast reception needs no arrangement.
#[derive(Debug, Default)]
pub struct NoopMulticastLock;

impl MulticastLock for NoopMulticastLock {
    fn acquire(&self) -> std::io::Result<()> {
        Ok(())
    }

    fn release(&self) {}
}
