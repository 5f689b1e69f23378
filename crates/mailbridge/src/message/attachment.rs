//! Message attachments.

use std::path::Path;

use mailbridge_mime::{AttachmentPart, ContentType, TransferEncoding};

use super::Message;
use crate::error::{Error, Result};
use crate::protocol::TextProcessing;

/// Transfer encoding used when an attachment is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachmentEncoding {
    /// MIME Base64.
    #[default]
    Mime,
    /// `x-uuencode`.
    UuEncode,
}

/// A binary attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachment {
    data: Vec<u8>,
    file_name: Option<String>,
    /// Content-ID without angle brackets, may be empty.
    pub cid: String,
    /// Display name, used when there is no file name.
    pub name: String,
    /// Charset label of the payload, may be empty.
    pub encoding: String,
    /// Transfer encoding on send.
    pub encoding_mode: AttachmentEncoding,
    /// Declared MIME type; empty means detect from the name on send.
    pub mime_type: String,
}

impl Attachment {
    /// Reads a file. The file name is the path's base name.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::InvalidArgumentValue(format!("{} has no file name", path.display()))
            })?;
        Ok(Self {
            data,
            name: file_name.clone(),
            file_name: Some(file_name),
            ..Self::default()
        })
    }

    /// Wraps bytes, optionally with a display name.
    #[must_use]
    pub fn from_data(data: Vec<u8>, name: Option<&str>) -> Self {
        Self {
            data,
            name: name.unwrap_or_default().to_string(),
            ..Self::default()
        }
    }

    /// Embeds a whole message as `message/rfc822`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be serialized.
    pub fn from_message(message: &Message, name: Option<&str>) -> Result<Self> {
        let data = message.create_native_message(TextProcessing::DontProcess)?;
        Ok(Self {
            data,
            name: name.unwrap_or_default().to_string(),
            mime_type: "message/rfc822".to_string(),
            ..Self::default()
        })
    }

    /// Builds an attachment from a decoded MIME leaf.
    pub(crate) fn received(
        data: Vec<u8>,
        file_name: Option<String>,
        content_type: &ContentType,
        cid: Option<String>,
    ) -> Self {
        Self {
            data,
            name: file_name.clone().unwrap_or_default(),
            file_name,
            cid: cid.unwrap_or_default(),
            encoding: content_type.charset().unwrap_or_default().to_string(),
            mime_type: content_type.mime_type(),
            ..Self::default()
        }
    }

    /// The payload.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replaces the payload.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// File name set from a path or a received part.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Name written to the part: the file name, else the display name.
    #[must_use]
    pub fn wire_name(&self) -> Option<&str> {
        self.file_name
            .as_deref()
            .or_else(|| Some(self.name.as_str()).filter(|n| !n.is_empty()))
    }

    /// The declared MIME type, else one guessed from the name.
    #[must_use]
    pub fn resolved_content_type(&self) -> ContentType {
        if !self.mime_type.is_empty()
            && let Ok(declared) = ContentType::parse(&self.mime_type)
        {
            return declared;
        }
        // Unknown or missing extensions map to application/octet-stream.
        ContentType::guess_from_file_name(self.wire_name().unwrap_or_default())
    }

    pub(crate) fn to_part(&self) -> AttachmentPart {
        AttachmentPart {
            content_type: self.resolved_content_type(),
            file_name: self.wire_name().map(str::to_string),
            content_id: Some(self.cid.clone()).filter(|c| !c.is_empty()),
            data: self.data.clone(),
            encoding: match self.encoding_mode {
                AttachmentEncoding::Mime => TransferEncoding::Base64,
                AttachmentEncoding::UuEncode => TransferEncoding::UuEncode,
            },
        }
    }
}

/// The ordered attachments of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachments {
    items: Vec<Attachment>,
}

impl Attachments {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Reads and appends a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Attachment> {
        let attachment = Attachment::from_file(path)?;
        Ok(self.push(attachment))
    }

    /// Appends bytes with an optional display name.
    pub fn add_data(&mut self, data: Vec<u8>, name: Option<&str>) -> &mut Attachment {
        self.push(Attachment::from_data(data, name))
    }

    /// Appends a message as `message/rfc822`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be serialized.
    pub fn add_message(&mut self, message: &Message, name: Option<&str>) -> Result<&mut Attachment> {
        let attachment = Attachment::from_message(message, name)?;
        Ok(self.push(attachment))
    }

    /// Appends an attachment.
    pub fn push(&mut self, attachment: Attachment) -> &mut Attachment {
        self.items.push(attachment);
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    /// Number of attachments.
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no attachments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Attachment at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Attachment> {
        self.items.get(index)
    }

    /// Mutable attachment at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Attachment> {
        self.items.get_mut(index)
    }

    /// Removes and returns the attachment at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgumentValue`] if `index` is out of range.
    pub fn delete(&mut self, index: usize) -> Result<Attachment> {
        if index >= self.items.len() {
            return Err(Error::InvalidArgumentValue(format!(
                "attachment index {index} out of range ({} entries)",
                self.items.len()
            )));
        }
        Ok(self.items.remove(index))
    }

    /// Removes every attachment.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterates in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Attachment> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a Attachments {
    type Item = &'a Attachment;
    type IntoIter = std::slice::Iter<'a, Attachment>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file_uses_base_name() {
        let dir = std::env::temp_dir().join(format!("mailbridge-att-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let mut attachments = Attachments::new();
        let attachment = attachments.add_file(&path).unwrap();
        assert_eq!(attachment.file_name(), Some("report.pdf"));
        assert_eq!(attachment.data(), b"%PDF-1.4");
        assert_eq!(attachment.resolved_content_type().mime_type(), "application/pdf");

        std::fs::remove_dir_all(&dir).unwrap();
        assert!(matches!(
            attachments.add_file(dir.join("missing.bin")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_mime_type_fallback() {
        let unnamed = Attachment::from_data(vec![1, 2, 3], None);
        assert_eq!(unnamed.wire_name(), None);
        assert_eq!(
            unnamed.resolved_content_type().mime_type(),
            "application/octet-stream"
        );

        let mut declared = Attachment::from_data(vec![], Some("notes.txt"));
        assert_eq!(declared.resolved_content_type().mime_type(), "text/plain");
        declared.mime_type = "application/x-custom".into();
        assert_eq!(
            declared.resolved_content_type().mime_type(),
            "application/x-custom"
        );
    }

    #[test]
    fn test_to_part() {
        let mut attachment = Attachment::from_data(b"abc".to_vec(), Some("a.bin"));
        attachment.cid = "img1@example".into();
        attachment.encoding_mode = AttachmentEncoding::UuEncode;
        let part = attachment.to_part();
        assert_eq!(part.file_name.as_deref(), Some("a.bin"));
        assert_eq!(part.content_id.as_deref(), Some("img1@example"));
        assert_eq!(part.encoding, TransferEncoding::UuEncode);
    }

    #[test]
    fn test_collection() {
        let mut attachments = Attachments::new();
        attachments.add_data(vec![0; 4], Some("zeros"));
        attachments.add_data(vec![1; 2], None);
        assert_eq!(attachments.count(), 2);
        assert_eq!(attachments.get(0).unwrap().size(), 4);
        assert_eq!(attachments.delete(1).unwrap().size(), 2);
        assert!(attachments.delete(1).is_err());
        attachments.clear();
        assert!(attachments.is_empty());
    }
}
