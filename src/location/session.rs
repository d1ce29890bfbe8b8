//! In-memory session history standing in for the browser history stack.

use std::fmt;

/// Raw document URL as a browser would hold it: path, search, fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentUrl {
    pub path: String,
    /// Without the leading `?`.
    pub search: String,
    /// Without the leading `#`.
    pub hash: String,
}

impl DocumentUrl {
    pub fn parse(url: &str) -> Self {
        let (rest, hash) = match url.split_once('#') {
            Some((rest, hash)) => (rest, hash),
            None => (url, ""),
        };
        let (path, search) = match rest.split_once('?') {
            Some((path, search)) => (path, search),
            None => (rest, ""),
        };
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        Self {
            path,
            search: search.to_string(),
            hash: hash.to_string(),
        }
    }
}

impl fmt::Display for DocumentUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if !self.search.is_empty() {
            write!(f, "?{}", self.search)?;
        }
        if !self.hash.is_empty() {
            write!(f, "#{}", self.hash)?;
        }
        Ok(())
    }
}

/// Entry stack with a cursor. Pushing drops any forward entries.
#[derive(Debug, Clone)]
pub struct SessionHistory {
    entries: Vec<DocumentUrl>,
    cursor: usize,
}

impl SessionHistory {
    pub fn new(initial: DocumentUrl) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
        }
    }

    pub fn current(&self) -> &DocumentUrl {
        &self.entries[self.cursor]
    }

    pub fn push(&mut self, url: DocumentUrl) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(url);
        self.cursor = self.entries.len() - 1;
    }

    pub fn replace(&mut self, url: DocumentUrl) {
        self.entries[self.cursor] = url;
    }

    pub fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn forward(&mut self) -> bool {
        if self.cursor + 1 >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
