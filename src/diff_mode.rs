use std::collections::HashMap;

/// Per-path reference count for edit-script write transport.
///
/// Multiple independent editor sessions may hold the same file open;
/// edit-script transport stays active as long as any one of them wants it.
/// Counts never go negative: a disable on an unknown or zero path is a no-op.
#[derive(Debug, Default)]
pub struct DiffMode {
    counts: HashMap<String, u32>,
}

impl DiffMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self, path: &str) {
        *self.counts.entry(path.to_string()).or_insert(0) += 1;
    }

    pub fn disable(&mut self, path: &str) {
        if let Some(count) = self.counts.get_mut(path) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(path);
            }
        }
    }

    pub fn is_enabled(&self, path: &str) -> bool {
        self.counts.get(path).is_some_and(|&c| c > 0)
    }
}
