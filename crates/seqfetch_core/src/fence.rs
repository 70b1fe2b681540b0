/// Monotonic request generation, stamped on every issued request.
pub type Generation = u64;

/// Fencing token for one fetch slot.
///
/// A response may touch slot state only while the generation it was issued
/// under is still current. Both issuing a request and cancelling advance the
/// fence, so anything in flight becomes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fence {
    current: Generation,
}

impl Fence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the fence for a new request and returns its generation.
    pub fn issue(&mut self) -> Generation {
        self.advance()
    }

    /// Advances the fence without issuing anything.
    pub fn invalidate(&mut self) -> Generation {
        self.advance()
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current == generation
    }

    pub fn current(&self) -> Generation {
        self.current
    }

    fn advance(&mut self) -> Generation {
        self.current = self.current.saturating_add(1);
        self.current
    }
}
