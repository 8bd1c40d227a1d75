use crate::constants::PERSIST_SEPARATOR;

/// A page removed from the sequence, remembered for undo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedPage {
    pub filename: String,
    /// Index the page had when it was removed
    pub index: usize,
}

/// Unbounded LIFO of deleted pages; the most recent deletion is last
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletedStack {
    entries: Vec<DeletedPage>,
}

impl DeletedStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filename: impl Into<String>, index: usize) {
        self.entries.push(DeletedPage {
            filename: filename.into(),
            index,
        });
    }

    pub fn pop(&mut self) -> Option<DeletedPage> {
        self.entries.pop()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DeletedPage] {
        &self.entries
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.entries.iter().any(|e| e.filename == filename)
    }

    /// Pipe-joined `filename:index` entries, oldest first
    pub fn to_persisted(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}:{}", e.filename, e.index))
            .collect::<Vec<_>>()
            .join(PERSIST_SEPARATOR)
    }

    /// Parse the persisted form; malformed entries are dropped
    pub fn from_persisted(value: &str) -> Self {
        let entries = value
            .split(PERSIST_SEPARATOR)
            .filter(|item| !item.is_empty())
            .filter_map(|item| {
                let Some((filename, index)) = item.rsplit_once(':') else {
                    log::warn!("Ignoring malformed deleted entry '{item}'");
                    return None;
                };
                match index.trim().parse() {
                    Ok(index) if !filename.is_empty() => Some(DeletedPage {
                        filename: filename.to_string(),
                        index,
                    }),
                    _ => {
                        log::warn!("Ignoring malformed deleted entry '{item}'");
                        None
                    }
                }
            })
            .collect();
        Self { entries }
    }
}

/// Pipe-joined page order
pub fn encode_order(pages: &[String]) -> String {
    pages.join(PERSIST_SEPARATOR)
}

/// Parse a pipe-joined page order
pub fn decode_order(value: &str) -> Vec<String> {
    value
        .split(PERSIST_SEPARATOR)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
