use std::fmt;

/// Teardown callbacks registered against an owner and run together, once.
#[derive(Default)]
pub struct CompositeDisposable {
    callbacks: Vec<Box<dyn FnOnce()>>,
    disposed: bool,
}

impl CompositeDisposable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback. Registering on an already-disposed owner runs it immediately.
    pub fn add(&mut self, callback: impl FnOnce() + 'static) {
        if self.disposed {
            callback();
            return;
        }
        self.callbacks.push(Box::new(callback));
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Runs every registered callback, most recent first.
    ///
    /// # Panics
    ///
    /// Panics when called a second time.
    pub fn dispose(&mut self) {
        assert!(!self.disposed, "already disposed");
        self.disposed = true;
        while let Some(callback) = self.callbacks.pop() {
            callback();
        }
    }
}

impl fmt::Debug for CompositeDisposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeDisposable")
            .field("pending", &self.callbacks.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}
