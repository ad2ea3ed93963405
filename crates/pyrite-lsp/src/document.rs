//! Document store
//!
//! Authoritative text of every open document. Each entry is updated under its
//! map entry's write lock, so a reader sees a document either before or after
//! an edit batch, never in between. Reads hand out an `Arc<str>` of the text.

use dashmap::DashMap;
use lsp_types::{Position, Range, TextDocumentContentChangeEvent, Url};
use ropey::Rope;
use std::sync::Arc;
use thiserror::Error;

/// Document errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("UnknownDocument: {0} is not open")]
    UnknownDocument(Url),

    #[error(
        "InvalidRange: {}:{}-{}:{} is outside the text of {uri}",
        range.start.line,
        range.start.character,
        range.end.line,
        range.end.character
    )]
    InvalidRange { uri: Url, range: Range },
}

/// One text change; without a range it replaces the whole text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Option<Range>,
    pub text: String,
}

impl Edit {
    pub fn replace(range: Range, text: impl Into<String>) -> Self {
        Self {
            range: Some(range),
            text: text.into(),
        }
    }

    pub fn full(text: impl Into<String>) -> Self {
        Self {
            range: None,
            text: text.into(),
        }
    }
}

impl From<TextDocumentContentChangeEvent> for Edit {
    fn from(change: TextDocumentContentChangeEvent) -> Self {
        Self {
            range: change.range,
            text: change.text,
        }
    }
}

/// Immutable view of a document at one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub uri: Url,
    pub text: Arc<str>,
    pub version: i32,
    pub language_id: String,
}

#[derive(Debug)]
struct Document {
    rope: Rope,
    /// Text of `rope`, refreshed after every edit batch
    text: Arc<str>,
    version: i32,
    language_id: String,
}

/// Document store
#[derive(Debug, Default)]
pub struct DocumentStore {
    /// Documents indexed by URI
    documents: DashMap<Url, Document>,
}

impl DocumentStore {
    /// Create a new document store
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a document, replacing any previous state for `uri`
    pub fn open(&self, uri: Url, text: &str, version: i32, language_id: impl Into<String>) {
        let document = Document {
            rope: Rope::from_str(text),
            text: Arc::from(text),
            version,
            language_id: language_id.into(),
        };
        self.documents.insert(uri, document);
    }

    /// Apply one edit; the version advances by one
    pub fn apply_edit(&self, uri: &Url, edit: Edit) -> Result<i32, DocumentError> {
        let mut document = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| DocumentError::UnknownDocument(uri.clone()))?;

        let mut rope = document.rope.clone();
        apply(&mut rope, uri, &edit)?;

        let version = document.version + 1;
        commit(&mut document, rope, version);
        Ok(version)
    }

    /// Apply a `didChange` batch atomically.
    ///
    /// The new version is the client's when it moves forward, otherwise the
    /// current version plus one. If any edit fails nothing is applied.
    pub fn apply_changes(
        &self,
        uri: &Url,
        version: i32,
        edits: Vec<Edit>,
    ) -> Result<i32, DocumentError> {
        let mut document = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| DocumentError::UnknownDocument(uri.clone()))?;

        let mut rope = document.rope.clone();
        for edit in &edits {
            apply(&mut rope, uri, edit)?;
        }

        let version = if version > document.version {
            version
        } else {
            document.version + 1
        };
        commit(&mut document, rope, version);
        Ok(version)
    }

    /// Close a document; returns whether it was open
    pub fn close(&self, uri: &Url) -> bool {
        self.documents.remove(uri).is_some()
    }

    /// Current text and version
    pub fn get(&self, uri: &Url) -> Option<DocumentSnapshot> {
        self.documents.get(uri).map(|document| DocumentSnapshot {
            uri: uri.clone(),
            text: document.text.clone(),
            version: document.version,
            language_id: document.language_id.clone(),
        })
    }

    pub fn version(&self, uri: &Url) -> Option<i32> {
        self.documents.get(uri).map(|document| document.version)
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }

    /// Open documents, sorted
    pub fn uris(&self) -> Vec<Url> {
        let mut uris: Vec<Url> = self.documents.iter().map(|entry| entry.key().clone()).collect();
        uris.sort();
        uris
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn commit(document: &mut Document, rope: Rope, version: i32) {
    document.text = Arc::from(rope.to_string());
    document.rope = rope;
    document.version = version;
}

fn apply(rope: &mut Rope, uri: &Url, edit: &Edit) -> Result<(), DocumentError> {
    let Some(range) = edit.range else {
        *rope = Rope::from_str(&edit.text);
        return Ok(());
    };

    let invalid = || DocumentError::InvalidRange {
        uri: uri.clone(),
        range,
    };
    let start = char_index(rope, range.start).ok_or_else(invalid)?;
    let end = char_index(rope, range.end).ok_or_else(invalid)?;
    if start > end {
        return Err(invalid());
    }

    rope.remove(start..end);
    rope.insert(start, &edit.text);
    Ok(())
}

/// Char index of an LSP position (UTF-16 column), or `None` if out of bounds
fn char_index(rope: &Rope, position: Position) -> Option<usize> {
    let line = position.line as usize;
    if line >= rope.len_lines() {
        return None;
    }

    let line_start = rope.line_to_char(line);
    let slice = rope.line(line);
    let mut content_len = slice.len_chars();
    if content_len > 0 && slice.char(content_len - 1) == '\n' {
        content_len -= 1;
    }
    if content_len > 0 && slice.char(content_len - 1) == '\r' {
        content_len -= 1;
    }
    let content = slice.slice(..content_len);

    let column = position.character as usize;
    if column > content.len_utf16_cu() {
        return None;
    }
    Some(line_start + content.utf16_cu_to_char(column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn uri() -> Url {
        Url::parse("file:///workspace/main.py").unwrap()
    }

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> Range {
        Range::new(Position::new(sl, sc), Position::new(el, ec))
    }

    fn text(store: &DocumentStore) -> String {
        store.get(&uri()).unwrap().text.to_string()
    }

    #[test]
    fn test_open_and_get() {
        let store = DocumentStore::new();
        store.open(uri(), "x = 1\n", 3, "python");
        let snapshot = store.get(&uri()).unwrap();
        assert_eq!(&*snapshot.text, "x = 1\n");
        assert_eq!(snapshot.version, 3);
        assert_eq!(snapshot.language_id, "python");
    }

    #[test]
    fn test_apply_edit_increments_version() {
        let store = DocumentStore::new();
        store.open(uri(), "x = 1\ny = 2\n", 1, "python");

        let version = store
            .apply_edit(&uri(), Edit::replace(range(1, 4, 1, 5), "42"))
            .unwrap();

        assert_eq!(version, 2);
        assert_eq!(text(&store), "x = 1\ny = 42\n");
    }

    #[test]
    fn test_multiline_edit_and_insert_at_end() {
        let store = DocumentStore::new();
        store.open(uri(), "a\nb\nc", 1, "python");
        store.apply_edit(&uri(), Edit::replace(range(0, 1, 2, 0), " = ")).unwrap();
        assert_eq!(text(&store), "a = c");
        store.apply_edit(&uri(), Edit::replace(range(0, 5, 0, 5), "\n")).unwrap();
        assert_eq!(text(&store), "a = c\n");
        store.apply_edit(&uri(), Edit::replace(range(1, 0, 1, 0), "d")).unwrap();
        assert_eq!(text(&store), "a = c\nd");
    }

    #[test]
    fn test_utf16_columns() {
        let store = DocumentStore::new();
        store.open(uri(), "s = '𝔸b'\n", 1, "python");
        // '𝔸' occupies columns 5..7
        store.apply_edit(&uri(), Edit::replace(range(0, 7, 0, 8), "c")).unwrap();
        assert_eq!(text(&store), "s = '𝔸c'\n");
    }

    #[test]
    fn test_crlf_line_end_is_not_addressable() {
        let store = DocumentStore::new();
        store.open(uri(), "ab\r\ncd", 1, "python");
        assert!(store.apply_edit(&uri(), Edit::replace(range(0, 2, 0, 2), "!")).is_ok());
        assert!(store.apply_edit(&uri(), Edit::replace(range(0, 4, 0, 4), "!")).is_err());
    }

    #[test]
    fn test_lone_carriage_return_starts_a_line() {
        let store = DocumentStore::new();
        store.open(uri(), "ab\rcd\n", 1, "python");
        store.apply_edit(&uri(), Edit::replace(range(1, 0, 1, 1), "X")).unwrap();
        assert_eq!(text(&store), "ab\rXd\n");
        assert!(store.apply_edit(&uri(), Edit::replace(range(0, 3, 0, 3), "!")).is_err());
    }

    #[test]
    fn test_full_replacement() {
        let store = DocumentStore::new();
        store.open(uri(), "old", 1, "python");
        store.apply_edit(&uri(), Edit::full("new text")).unwrap();
        assert_eq!(text(&store), "new text");
    }

    #[test]
    fn test_unknown_document() {
        let store = DocumentStore::new();
        let err = store.apply_edit(&uri(), Edit::full("x")).unwrap_err();
        assert_eq!(err, DocumentError::UnknownDocument(uri()));
    }

    #[test]
    fn test_invalid_ranges_leave_text_unchanged() {
        let store = DocumentStore::new();
        store.open(uri(), "abc\ndef\n", 1, "python");

        for bad in [range(5, 0, 5, 1), range(0, 4, 0, 4), range(1, 2, 0, 1)] {
            let err = store.apply_edit(&uri(), Edit::replace(bad, "x")).unwrap_err();
            assert!(matches!(err, DocumentError::InvalidRange { .. }));
        }
        assert_eq!(text(&store), "abc\ndef\n");
        assert_eq!(store.version(&uri()), Some(1));
    }

    #[test]
    fn test_batch_is_atomic() {
        let store = DocumentStore::new();
        store.open(uri(), "abc\n", 1, "python");

        let result = store.apply_changes(
            &uri(),
            2,
            vec![Edit::replace(range(0, 0, 0, 1), "z"), Edit::replace(range(9, 0, 9, 0), "y")],
        );

        assert!(result.is_err());
        assert_eq!(text(&store), "abc\n");
        assert_eq!(store.version(&uri()), Some(1));
    }

    #[test]
    fn test_readers_never_see_half_applied_batch() {
        const LOWER: &str = "left = 1\nright = 2\n";
        const UPPER: &str = "LEFT = 1\nRIGHT = 2\n";
        let store = DocumentStore::new();
        store.open(uri(), LOWER, 1, "python");

        let batch = |first: &str, second: &str| {
            vec![
                Edit::replace(range(0, 0, 0, 4), first),
                Edit::replace(range(1, 0, 1, 5), second),
            ]
        };

        let done = std::sync::atomic::AtomicBool::new(false);
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for round in 0..500 {
                    let edits = if round % 2 == 0 {
                        batch("LEFT", "RIGHT")
                    } else {
                        batch("left", "right")
                    };
                    store.apply_changes(&uri(), round + 2, edits).unwrap();
                }
                done.store(true, std::sync::atomic::Ordering::Release);
            });

            for _ in 0..4 {
                scope.spawn(|| {
                    while !done.load(std::sync::atomic::Ordering::Acquire) {
                        let snapshot = store.get(&uri()).unwrap();
                        let expected = if snapshot.version % 2 == 1 { LOWER } else { UPPER };
                        assert_eq!(&*snapshot.text, expected, "version {}", snapshot.version);
                    }
                });
            }
        });

        assert_eq!(store.version(&uri()), Some(501));
        assert_eq!(text(&store), LOWER);
    }

    #[test]
    fn test_batch_uses_client_version_when_newer() {
        let store = DocumentStore::new();
        store.open(uri(), "abc", 1, "python");
        let version = store
            .apply_changes(&uri(), 7, vec![Edit::replace(range(0, 3, 0, 3), "d")])
            .unwrap();
        assert_eq!(version, 7);
        let version = store.apply_changes(&uri(), 7, vec![Edit::full("e")]).unwrap();
        assert_eq!(version, 8);
    }

    #[test]
    fn test_close() {
        let store = DocumentStore::new();
        store.open(uri(), "", 1, "python");
        assert!(store.close(&uri()));
        assert!(!store.close(&uri()));
        assert!(store.get(&uri()).is_none());
        assert!(store.is_empty());
    }
}
