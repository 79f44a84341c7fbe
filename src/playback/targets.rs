use std::sync::Arc;

use super::adapter::PlaybackAdapter;

/// Program and preview render targets.
///
/// In preview-only mode the program target sits out so a replay can be
/// rehearsed without touching the live output.
#[derive(Clone, Default)]
pub struct PlaybackTargets {
    program: Option<Arc<dyn PlaybackAdapter>>,
    preview: Option<Arc<dyn PlaybackAdapter>>,
    preview_only: bool,
}

impl PlaybackTargets {
    #[must_use]
    pub fn new(
        program: Option<Arc<dyn PlaybackAdapter>>,
        preview: Option<Arc<dyn PlaybackAdapter>>,
    ) -> Self {
        Self {
            program,
            preview,
            preview_only: false,
        }
    }

    #[must_use]
    pub const fn preview_only(&self) -> bool {
        self.preview_only
    }

    pub const fn set_preview_only(&mut self, enabled: bool) {
        self.preview_only = enabled;
    }

    /// Adapters a run fans out to, preview first.
    #[must_use]
    pub fn active(&self) -> Vec<Arc<dyn PlaybackAdapter>> {
        let mut adapters = Vec::with_capacity(2);
        if let Some(preview) = &self.preview {
            adapters.push(Arc::clone(preview));
        }
        if let Some(program) = &self.program
            && !self.preview_only
        {
            adapters.push(Arc::clone(program));
        }
        adapters
    }
}
