//! Serializing messages for sending.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use mailbridge_mime::{HeaderEncoding, Mailbox, MessageBuilder, format_date, format_list};

use super::{Addresses, Importance, Message};
use crate::error::Result;
use crate::protocol::TextProcessing;

static MESSAGE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Whether `Bcc` is written into the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BccHeader {
    Keep,
    Strip,
}

impl Message {
    /// Serializes the message as RFC 5322 bytes, `Bcc` included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSenderType`](crate::Error::InvalidSenderType)
    /// without a sender, or an error for an address missing its user or
    /// server part.
    pub fn create_native_message(&self, processing: TextProcessing) -> Result<Vec<u8>> {
        self.to_wire(processing, BccHeader::Keep)
    }

    pub(crate) fn to_wire(&self, processing: TextProcessing, bcc: BccHeader) -> Result<Vec<u8>> {
        if processing == TextProcessing::Process {
            let mut processed = self.clone();
            processed.process_texts();
            return processed.build(bcc);
        }
        self.build(bcc)
    }

    fn build(&self, bcc: BccHeader) -> Result<Vec<u8>> {
        let mode = self.non_ascii_encoding_mode.header_encoding();
        let from = self.sender_mailbox()?;

        let mut builder = MessageBuilder::new()
            .header_encoding(mode)
            .header("From", from.to_header_value(mode));
        builder = address_header(builder, "Reply-To", &self.reply_to, mode)?;
        builder = address_header(builder, "To", &self.to, mode)?;
        builder = address_header(builder, "Cc", &self.cc, mode)?;
        if bcc == BccHeader::Keep {
            builder = address_header(builder, "Bcc", &self.bcc, mode)?;
        }
        builder = builder.text_header("Subject", &self.subject);

        let date = self
            .posting_date()
            .unwrap_or_else(|| Utc::now().fixed_offset());
        builder = builder.header("Date", format_date(&date));

        let message_id = if self.message_id().is_empty() {
            generate_message_id(from.domain())
        } else {
            self.message_id().to_string()
        };
        builder = builder.header("Message-ID", format!("<{message_id}>"));

        if self.importance != Importance::Normal {
            builder = builder
                .header("Importance", self.importance.importance_value())
                .header("X-Priority", self.importance.x_priority_value());
        }
        if !self.organization.is_empty() {
            builder = builder.text_header("Organization", &self.organization);
        }
        if !self.categories.is_empty() {
            builder = builder.text_header("Keywords", &self.categories);
        }
        if self.request_delivery_receipt {
            builder = receipt_header(
                builder,
                "Return-Receipt-To",
                &self.delivery_receipt_addresses,
                &from,
                mode,
            )?;
        }
        if self.request_read_receipt {
            builder = receipt_header(
                builder,
                "Disposition-Notification-To",
                &self.read_receipt_addresses,
                &from,
                mode,
            )?;
        }
        for field in self.custom_fields.iter() {
            builder = builder.text_header(field.name.clone(), &field.value);
        }

        for text in &self.texts {
            builder = builder.text(text.text_type.mime_sub_type(), text.text.clone());
        }
        for attachment in &self.attachments {
            builder = builder.attachment(attachment.to_part());
        }

        Ok(builder.build())
    }
}

fn address_header(
    builder: MessageBuilder,
    name: &str,
    addresses: &Addresses,
    mode: HeaderEncoding,
) -> Result<MessageBuilder> {
    if addresses.is_empty() {
        return Ok(builder);
    }
    let mailboxes = addresses.to_wire()?;
    Ok(builder.header(name, format_list(&mailboxes, mode)))
}

fn receipt_header(
    builder: MessageBuilder,
    name: &str,
    addresses: &Addresses,
    sender: &Mailbox,
    mode: HeaderEncoding,
) -> Result<MessageBuilder> {
    if addresses.is_empty() {
        return Ok(builder.header(name, sender.to_header_value(mode)));
    }
    address_header(builder, name, addresses, mode)
}

fn generate_message_id(domain: &str) -> String {
    let domain = if domain.is_empty() { "localhost" } else { domain };
    let now = Utc::now();
    let counter = MESSAGE_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}.{:x}.{counter}@{domain}",
        now.format("%Y%m%d%H%M%S"),
        now.timestamp_subsec_nanos()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::message::{Address, AttachmentEncoding, NonAsciiEncoding, Sender, TextType};
    use proptest::prelude::*;

    fn outgoing() -> Message {
        let mut message = Message::new();
        message.sender = Some(Sender::Address(Address::new("alice@example.com").unwrap()));
        message.sender_name = "Alice".into();
        message.subject = "Quarterly numbers".into();
        message.to.add("bob@example.com").unwrap();
        message
    }

    #[test]
    fn test_missing_sender() {
        let mut message = outgoing();
        message.sender = None;
        assert!(matches!(
            message.create_native_message(TextProcessing::DontProcess),
            Err(Error::InvalidSenderType)
        ));
    }

    #[test]
    fn test_headers_written() {
        let mut message = outgoing();
        message.reply_to.add("replies@example.com").unwrap();
        message.importance = Importance::Lowest;
        message.organization = "Example Ltd".into();
        message.categories = "finance, q3".into();
        message.request_read_receipt = true;
        message.set_field("X-Mailer", "mailbridge");
        message.texts.add_plain("See attached.");

        let raw = message.create_native_message(TextProcessing::DontProcess).unwrap();
        let text = String::from_utf8(raw).unwrap();
        assert!(text.contains("From: Alice <alice@example.com>\r\n"));
        assert!(text.contains("Reply-To: replies@example.com\r\n"));
        assert!(text.contains("X-Priority: 5 (Lowest)\r\n"));
        assert!(text.contains("Organization: Example Ltd\r\n"));
        assert!(text.contains("Keywords: finance, q3\r\n"));
        assert!(text.contains("Disposition-Notification-To: Alice <alice@example.com>\r\n"));
        assert!(text.contains("X-Mailer: mailbridge\r\n"));
        assert!(text.contains("Message-ID: <"));
        assert!(text.contains("@example.com>\r\n"));
    }

    #[test]
    fn test_bcc_stripped_for_transport() {
        let mut message = outgoing();
        message.bcc.add("hidden@example.com").unwrap();

        let kept = message.create_native_message(TextProcessing::DontProcess).unwrap();
        assert!(String::from_utf8_lossy(&kept).contains("Bcc: hidden@example.com"));

        let stripped = message
            .to_wire(TextProcessing::Process, BccHeader::Strip)
            .unwrap();
        assert!(!String::from_utf8_lossy(&stripped).contains("hidden@example.com"));
    }

    #[test]
    fn test_attachments_written() {
        let mut message = outgoing();
        message.texts.add_plain("body");
        message.attachments.add_data(b"hello".to_vec(), Some("hello.txt"));
        message
            .attachments
            .add_data(b"uu".to_vec(), Some("legacy.bin"))
            .encoding_mode = AttachmentEncoding::UuEncode;

        let raw = message.create_native_message(TextProcessing::DontProcess).unwrap();
        let parsed = Message::from_source_data(&raw, vec!["x".into()]).unwrap();
        assert_eq!(parsed.texts.count(), 1);
        assert_eq!(parsed.attachments.count(), 2);
        let first = parsed.attachments.get(0).unwrap();
        assert_eq!(first.file_name(), Some("hello.txt"));
        assert_eq!(first.data(), b"hello");
        assert_eq!(parsed.attachments.get(1).unwrap().data(), b"uu");
    }

    #[test]
    fn test_embedded_message() {
        let inner = outgoing();
        let mut message = outgoing();
        message.attachments.add_message(&inner, Some("forwarded.eml")).unwrap();
        let raw = message.create_native_message(TextProcessing::DontProcess).unwrap();
        let text = String::from_utf8_lossy(&raw);
        assert!(text.contains("Content-Type: message/rfc822"));
    }

    #[test]
    fn test_non_ascii_subject_modes() {
        let mut message = outgoing();
        message.subject = "Grüße".into();

        message.non_ascii_encoding_mode = NonAsciiEncoding::QuotedPrintable;
        let raw = message.create_native_message(TextProcessing::DontProcess).unwrap();
        assert!(String::from_utf8_lossy(&raw).contains("=?UTF-8?Q?"));
        let parsed = Message::from_source_data(&raw, vec!["1".into()]).unwrap();
        assert_eq!(parsed.subject, "Grüße");

        message.non_ascii_encoding_mode = NonAsciiEncoding::None;
        let raw = message.create_native_message(TextProcessing::DontProcess).unwrap();
        assert!(String::from_utf8_lossy(&raw).contains("Subject: Grüße\r\n"));
    }

    fn text_type() -> impl Strategy<Value = TextType> {
        prop_oneof![
            Just(TextType::PlainText),
            Just(TextType::Html),
            Just(TextType::RichText),
        ]
    }

    proptest! {
        #[test]
        fn native_message_round_trips(
            subject in "[A-Za-z0-9 ,.!?]{0,40}",
            to in prop::collection::vec("[a-z]{1,8}@[a-z]{1,8}\\.com", 1..4),
            cc in prop::collection::vec("[a-z]{1,8}@[a-z]{1,8}\\.org", 0..3),
            bcc in prop::collection::vec("[a-z]{1,8}@[a-z]{1,8}\\.net", 0..3),
            texts in prop::collection::vec(("[A-Za-z0-9 .,]{1,60}", text_type()), 0..4),
        ) {
            let mut message = outgoing();
            message.subject = subject.trim().to_string();
            message.to.clear();
            for address in &to {
                message.to.add(address).unwrap();
            }
            for address in &cc {
                message.cc.add(address).unwrap();
            }
            for address in &bcc {
                message.bcc.add(address).unwrap();
            }
            for (text, text_type) in &texts {
                message.texts.add(text.clone(), *text_type);
            }

            let raw = message.create_native_message(TextProcessing::DontProcess).unwrap();
            let parsed = Message::from_source_data(&raw, vec!["1".into()]).unwrap();

            prop_assert_eq!(&parsed.subject, &message.subject);
            let addresses = |list: &Addresses| list.iter().map(Address::address).collect::<Vec<_>>();
            prop_assert_eq!(addresses(&parsed.to), to);
            prop_assert_eq!(addresses(&parsed.cc), cc);
            prop_assert_eq!(addresses(&parsed.bcc), bcc);

            let sent: Vec<(String, TextType)> = texts.clone();
            let received: Vec<(String, TextType)> = parsed
                .texts
                .iter()
                .map(|t| (t.text.clone(), t.text_type))
                .collect();
            if sent.is_empty() {
                // An empty body is written as one empty plain part.
                prop_assert_eq!(received, vec![(String::new(), TextType::PlainText)]);
            } else {
                prop_assert_eq!(received, sent);
            }
        }
    }
}
