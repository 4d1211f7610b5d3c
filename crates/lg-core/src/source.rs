use std::sync::Arc;

use crate::error::QueryError;

/// Immutable text that span offsets point into. Offsets count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceText {
    text: Arc<str>,
    /// Byte offset of every char plus the total length; `None` for ASCII text.
    boundaries: Option<Arc<[usize]>>,
}

impl SourceText {
    #[must_use]
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text: Arc<str> = text.into();
        let boundaries = (!text.is_ascii()).then(|| {
            text.char_indices()
                .map(|(byte, _)| byte)
                .chain(std::iter::once(text.len()))
                .collect::<Arc<[usize]>>()
        });
        Self { text, boundaries }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn char_len(&self) -> usize {
        match &self.boundaries {
            Some(boundaries) => boundaries.len() - 1,
            None => self.text.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Characters in `[start, end)`.
    pub fn substring(&self, start: usize, end: usize) -> Result<&str, QueryError> {
        let len = self.char_len();
        if start > end || end > len {
            return Err(QueryError::OutOfBounds { start, end, len });
        }
        match &self.boundaries {
            Some(boundaries) => Ok(&self.text[boundaries[start]..boundaries[end]]),
            None => Ok(&self.text[start..end]),
        }
    }
}

impl From<&str> for SourceText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for SourceText {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::SourceText;
    use crate::error::QueryError;

    #[test]
    fn ascii_substring() {
        let source = SourceText::from("MARY had a little lamb");
        assert_eq!(source.char_len(), 22);
        assert_eq!(source.substring(0, 4), Ok("MARY"));
        assert_eq!(source.substring(18, 22), Ok("lamb"));
        assert_eq!(source.substring(3, 3), Ok(""));
    }

    #[test]
    fn offsets_count_characters() {
        let source = SourceText::from("Zoë saß am Fluß");
        assert_eq!(source.char_len(), 15);
        assert_eq!(source.substring(0, 3), Ok("Zoë"));
        assert_eq!(source.substring(4, 7), Ok("saß"));
        assert_eq!(source.substring(11, 15), Ok("Fluß"));
    }

    #[test]
    fn rejects_out_of_bounds() {
        let source = SourceText::from("abc");
        assert_eq!(
            source.substring(2, 9),
            Err(QueryError::OutOfBounds {
                start: 2,
                end: 9,
                len: 3
            })
        );
        assert!(source.substring(2, 1).is_err());
    }

    proptest! {
        #[test]
        fn substring_has_requested_char_count(text in "\\PC{0,40}", a in 0usize..50, b in 0usize..50) {
            let source = SourceText::new(text.as_str());
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            match source.substring(start, end) {
                Ok(slice) => prop_assert_eq!(slice.chars().count(), end - start),
                Err(_) => prop_assert!(end > source.char_len()),
            }
        }
    }
}
