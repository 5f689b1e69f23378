//! Message body texts.

use crate::error::{Error, Result};

/// Kind of a body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextType {
    /// `text/plain`.
    #[default]
    PlainText,
    /// `text/html`.
    Html,
    /// `text/richtext` or `text/enriched`.
    RichText,
}

impl TextType {
    /// The MIME subtype written for this kind.
    #[must_use]
    pub const fn mime_sub_type(self) -> &'static str {
        match self {
            Self::PlainText => "plain",
            Self::Html => "html",
            Self::RichText => "richtext",
        }
    }

    /// Maps a `text/*` subtype, `None` for subtypes that are not body texts.
    #[must_use]
    pub fn from_mime_sub_type(sub_type: &str) -> Option<Self> {
        match sub_type.to_ascii_lowercase().as_str() {
            "plain" => Some(Self::PlainText),
            "html" => Some(Self::Html),
            "richtext" | "enriched" => Some(Self::RichText),
            _ => None,
        }
    }
}

/// One body text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Text {
    /// The content.
    pub text: String,
    /// Plain, HTML or rich text.
    pub text_type: TextType,
    /// Charset label the text arrived in, may be empty.
    pub encoding: String,
}

impl Text {
    /// Creates a text.
    #[must_use]
    pub fn new(text: impl Into<String>, text_type: TextType) -> Self {
        Self {
            text: text.into(),
            text_type,
            encoding: String::new(),
        }
    }

    /// The content as UTF-8 bytes.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.text.as_bytes().to_vec()
    }
}

/// The ordered texts of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Texts {
    items: Vec<Text>,
}

impl Texts {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends a text of the given type.
    pub fn add(&mut self, text: impl Into<String>, text_type: TextType) -> &mut Text {
        self.push(Text::new(text, text_type))
    }

    /// Appends a plain text.
    pub fn add_plain(&mut self, text: impl Into<String>) -> &mut Text {
        self.add(text, TextType::PlainText)
    }

    /// Appends a text.
    pub fn push(&mut self, text: Text) -> &mut Text {
        self.items.push(text);
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    /// Number of texts.
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no texts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Text at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Text> {
        self.items.get(index)
    }

    /// Mutable text at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Text> {
        self.items.get_mut(index)
    }

    /// Removes and returns the text at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgumentValue`] if `index` is out of range.
    pub fn delete(&mut self, index: usize) -> Result<Text> {
        if index >= self.items.len() {
            return Err(Error::InvalidArgumentValue(format!(
                "text index {index} out of range ({} entries)",
                self.items.len()
            )));
        }
        Ok(self.items.remove(index))
    }

    /// Removes every text.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterates in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Text> {
        self.items.iter()
    }

    /// Iterates mutably in order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Text> {
        self.items.iter_mut()
    }
}

impl<'a> IntoIterator for &'a Texts {
    type Item = &'a Text;
    type IntoIter = std::slice::Iter<'a, Text>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_types() {
        assert_eq!(TextType::from_mime_sub_type("HTML"), Some(TextType::Html));
        assert_eq!(TextType::from_mime_sub_type("enriched"), Some(TextType::RichText));
        assert_eq!(TextType::from_mime_sub_type("calendar"), None);
        assert_eq!(TextType::RichText.mime_sub_type(), "richtext");
    }

    #[test]
    fn test_collection() {
        let mut texts = Texts::new();
        texts.add_plain("hello");
        texts.add("<p>hello</p>", TextType::Html).encoding = "utf-8".into();
        assert_eq!(texts.count(), 2);
        assert_eq!(texts.get(1).unwrap().text_type, TextType::Html);
        assert_eq!(texts.get(0).unwrap().data(), b"hello");

        texts.delete(0).unwrap();
        assert_eq!(texts.get(0).unwrap().encoding, "utf-8");
        assert!(texts.delete(3).is_err());
        texts.clear();
        assert!(texts.is_empty());
    }
}
