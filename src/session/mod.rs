// One serve run: what gets launched, and the state shared with the interrupt thread.

pub mod controller;
mod state;

pub use controller::{Controller, SessionOutcome, wait_for_exit};
pub use state::{PendingKill, SharedSession};

/// The unit of state for one run. Discarded when the controller returns.
#[derive(Debug, Clone)]
pub struct ContainerSession {
    image: String,
    run_arguments: Vec<String>,
    shared: SharedSession,
}

impl ContainerSession {
    pub fn new(image: impl Into<String>, run_arguments: Vec<String>) -> Self {
        Self {
            image: image.into(),
            run_arguments,
            shared: SharedSession::new(),
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn run_arguments(&self) -> &[String] {
        &self.run_arguments
    }

    /// The cell the launcher publishes into and the guardian reads from.
    pub fn shared(&self) -> &SharedSession {
        &self.shared
    }

    pub fn container_id(&self) -> Option<String> {
        self.shared.container_id()
    }
}
