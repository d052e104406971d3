use tracing::debug;

use super::node::ForegroundTree;

type RenderCallback = Box<dyn FnMut(&ForegroundTree)>;

/// Single-slot render callback. The host framework registers once it has
/// mounted; until then notifications go to a no-op.
pub struct RenderNotifier {
    callback: RenderCallback,
    registered: bool,
}

impl Default for RenderNotifier {
    fn default() -> Self {
        Self {
            callback: Box::new(|_| {}),
            registered: false,
        }
    }
}

impl RenderNotifier {
    /// Installs `callback`, replacing any previous registration.
    pub fn register(&mut self, callback: impl FnMut(&ForegroundTree) + 'static) {
        if self.registered {
            debug!(target: "driver", "replacing render callback");
        }
        self.callback = Box::new(callback);
        self.registered = true;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn notify(&mut self, tree: &ForegroundTree) {
        (self.callback)(tree);
    }
}
