use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use teleassist_core::errors::HandlerError;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "your", "with", "can", "how", "what",
    "why", "when", "does", "did", "this", "that", "from", "have", "has", "was", "will", "about",
    "into", "there", "their", "them", "they", "should", "would", "could", "which", "who",
];
const MIN_TERM_LEN: usize = 3;
// Network generations ("4G", "5G") and similar short codes carry a digit.
const MIN_NUMERIC_TERM_LEN: usize = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Passage {
    pub source: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: usize,
}

#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredPassage>, HandlerError>;
}

/// Paragraph-level keyword index over `.md` and `.txt` files.
#[derive(Clone, Debug, Default)]
pub struct DocumentIndex {
    entries: Vec<IndexedPassage>,
}

#[derive(Clone, Debug)]
struct IndexedPassage {
    passage: Passage,
    terms: HashSet<String>,
}

impl DocumentIndex {
    pub fn from_passages(passages: impl IntoIterator<Item = Passage>) -> Self {
        let entries = passages
            .into_iter()
            .filter(|passage| !passage.text.trim().is_empty())
            .map(|passage| IndexedPassage { terms: terms(&passage.text), passage })
            .collect();
        Self { entries }
    }

    /// Loads every document under `root`, recursing into subdirectories. A missing
    /// directory gives an empty index.
    pub async fn load_dir(root: &Path) -> Result<Self, HandlerError> {
        if !tokio::fs::try_exists(root).await.unwrap_or(false) {
            warn!(
                event_name = "knowledge.documents_missing",
                path = %root.display(),
                "knowledge documents directory not found; index is empty"
            );
            return Ok(Self::default());
        }

        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| HandlerError::Retrieval(format!("{}: {e}", dir.display())))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| HandlerError::Retrieval(format!("{}: {e}", dir.display())))?
            {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if is_document(&path) {
                    files.push(path);
                }
            }
        }
        files.sort();

        let mut passages = Vec::new();
        for path in &files {
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| HandlerError::Retrieval(format!("{}: {e}", path.display())))?;
            let source = source_name(root, path);
            passages.extend(
                split_paragraphs(&content)
                    .into_iter()
                    .map(|text| Passage { source: source.clone(), text }),
            );
        }

        let index = Self::from_passages(passages);
        debug!(
            event_name = "knowledge.index_loaded",
            documents = files.len(),
            passages = index.len(),
            "knowledge index loaded"
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Passages ranked by the number of distinct query terms they contain. Ties keep
    /// document order; passages with no overlap are dropped.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<ScoredPassage> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scored = self
            .entries
            .iter()
            .filter_map(|entry| {
                let score = query_terms.intersection(&entry.terms).count();
                (score > 0).then(|| ScoredPassage { passage: entry.passage.clone(), score })
            })
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.truncate(top_k);
        scored
    }
}

#[async_trait]
impl KnowledgeRetriever for DocumentIndex {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredPassage>, HandlerError> {
        Ok(self.search(query, top_k))
    }
}

fn is_document(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).as_deref(),
        Some("md" | "txt")
    )
}

fn source_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).map(PathBuf::from).unwrap_or_else(|_| path.to_path_buf()).display().to_string()
}

fn split_paragraphs(content: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs
}

pub(crate) fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|term| is_significant(term) && !STOPWORDS.contains(&term.as_str()))
        .collect()
}

fn is_significant(term: &str) -> bool {
    term.len() >= MIN_TERM_LEN
        || (term.len() >= MIN_NUMERIC_TERM_LEN && term.chars().any(|c| c.is_ascii_digit()))
}
