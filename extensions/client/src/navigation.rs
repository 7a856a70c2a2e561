/// Browser-style page history: `to` drops everything after the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
    cursor: usize,
}

impl History {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            entries: vec![start.into()],
            cursor: 0,
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(String::as_str)
    }

    pub fn push(&mut self, page: impl Into<String>) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(page.into());
        self.cursor = self.entries.len() - 1;
    }

    /// Step back; stays put on the first entry.
    pub fn back(&mut self) -> Option<&str> {
        self.cursor = self.cursor.saturating_sub(1);
        self.current()
    }

    /// Step forward; stays put on the last entry.
    pub fn forward(&mut self) -> Option<&str> {
        if self.cursor + 1 < self.entries.len() {
            self.cursor += 1;
        }
        self.current()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}
