use serde::{Deserialize, Serialize};

/// A loaded source document, one entry per page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub checksum: String,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub text: String,
}

/// A bounded text span of a document, ready to be embedded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub seq: u32,
    pub content: String,
    pub page: Option<u32>,
    /// Character offset of the first character within the page text.
    pub start_offset: u64,
    /// Character offset one past the last character within the page text.
    pub end_offset: u64,
    pub source: String,
}

impl Document {
    pub fn new(name: impl Into<String>, checksum: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            name: name.into(),
            checksum: checksum.into(),
            pages,
        }
    }

    /// Build a single-page document from plain text.
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let checksum = crate::utils::calculate_checksum(text.as_bytes());
        Self::new(name, checksum, vec![Page { number: 1, text }])
    }

    pub fn identity(&self) -> DocumentIdentity {
        DocumentIdentity {
            name: self.name.clone(),
            checksum: self.checksum.clone(),
        }
    }

    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }

    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}

/// Content-based identity of a document. Two files with the same name but
/// different bytes are different documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentIdentity {
    pub name: String,
    pub checksum: String,
}

impl DocumentIdentity {
    pub fn same_content(&self, other: &DocumentIdentity) -> bool {
        self.checksum == other.checksum
    }
}

impl Chunk {
    pub fn generate_id(document_checksum: &str, seq: u32) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}", document_checksum, seq);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    /// Short location label, e.g. `module.pdf p.3`.
    pub fn location(&self) -> String {
        match self.page {
            Some(page) => format!("{} p.{}", self.source, page),
            None => self.source.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_generate_id() {
        let id = Chunk::generate_id("abc123", 5);
        assert_eq!(id.len(), 36);
        assert!(id.chars().filter(|c| *c == '-').count() == 4);
        let id2 = Chunk::generate_id("abc123", 5);
        assert_eq!(id, id2);
        let id3 = Chunk::generate_id("abc123", 6);
        assert_ne!(id, id3);
    }

    #[test]
    fn test_identity_compares_content_not_name() {
        let a = Document::from_text("module.pdf", "photosynthesis");
        let b = Document::from_text("module.pdf", "cell division");
        let c = Document::from_text("renamed.pdf", "photosynthesis");
        assert!(!a.identity().same_content(&b.identity()));
        assert!(a.identity().same_content(&c.identity()));
    }

    #[test]
    fn test_blank_document() {
        assert!(Document::from_text("empty.txt", "  \n ").is_blank());
        assert!(!Document::from_text("a.txt", "x").is_blank());
    }
}
