//! Creation stack used to detect cycles that early exposure cannot break.

use parking_lot::Mutex;

use crate::error::{DiError, DiResult};

/// Names currently being constructed, outermost first.
///
/// Constructions are serialized by the container's creation lock, so a single
/// stack per container sees exactly one construction chain at a time.
pub(crate) struct CreationStack {
    frames: Mutex<Vec<String>>,
    max_depth: usize,
}

impl CreationStack {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
            max_depth,
        }
    }

    /// Pushes `name`, failing if it is already being constructed.
    ///
    /// The returned guard pops the frame when dropped, including on error
    /// paths, so a failed construction never leaves a stale frame behind.
    pub(crate) fn enter(&self, name: &str) -> DiResult<CreationGuard<'_>> {
        let mut frames = self.frames.lock();

        // Detect before pushing the new name
        if let Some(pos) = frames.iter().position(|n| n == name) {
            let mut path: Vec<String> = frames[pos..].to_vec();
            path.push(name.to_string());
            tracing::debug!(?path, "Unresolvable dependency cycle");
            return Err(DiError::CycleUnresolvable(path));
        }

        if frames.len() >= self.max_depth {
            return Err(DiError::DepthExceeded(frames.len()));
        }

        frames.push(name.to_string());
        Ok(CreationGuard { stack: self })
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.frames.lock().iter().any(|n| n == name)
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.lock().len()
    }
}

/// Pops its frame on drop.
pub(crate) struct CreationGuard<'a> {
    stack: &'a CreationStack,
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        self.stack.frames.lock().pop();
    }
}
