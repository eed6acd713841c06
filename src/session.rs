/// Position within the list of sessions of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionCursor {
    current: usize,
    count: usize,
}

impl SessionCursor {
    pub fn new(count: usize) -> Self {
        Self { current: 0, count }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn has_next(&self) -> bool {
        self.current + 1 < self.count
    }

    pub fn has_previous(&self) -> bool {
        self.current > 0
    }

    /// Move forward; returns `false` at the last session.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        if self.has_next() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Move back; returns `false` at the first session.
    pub fn previous(&mut self) -> bool {
        if self.has_previous() {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to `index`, clamped to the last session.
    pub fn select(&mut self, index: usize) -> bool {
        let index = index.min(self.count.saturating_sub(1));
        let changed = index != self.current;
        self.current = index;
        changed
    }
}
