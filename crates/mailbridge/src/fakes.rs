//! In-memory servers behind the session traits, for tests.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use mailbridge_imap::{
    FetchedMessage, Flag, Flags, ListResponse, Mailbox, SearchKey, SeqNum, StoreAction,
    StoreMode, Uid, UidSet, types::UidRange,
};
use mailbridge_pop3::UidlEntry;
use mailbridge_smtp::Envelope;

use crate::error::{Error, Result};
use crate::profile::Profile;
use crate::transport::{Connector, ImapSession, Pop3Session, SmtpTransport};

const INTERNAL_DATE: &str = "2026-10-05T10:00:00+00:00";

/// A plain text message with the given subject.
pub fn plain_message(subject: &str) -> Vec<u8> {
    format!(
        "From: Sender <sender@example.com>\r\n\
         To: rcpt@example.com\r\n\
         Subject: {subject}\r\n\
         Date: Mon, 5 Oct 2026 10:00:00 +0000\r\n\
         \r\n\
         Body of {subject}\r\n"
    )
    .into_bytes()
}

pub fn imap_profile() -> Profile {
    Profile {
        imap_server_address: "imap.example.com".into(),
        imap_user: "user".into(),
        imap_password: "secret".into(),
        ..Profile::default()
    }
}

pub fn pop3_profile() -> Profile {
    Profile {
        pop3_server_address: "pop.example.com".into(),
        user: "user".into(),
        password: "secret".into(),
        ..Profile::default()
    }
}

pub fn smtp_profile() -> Profile {
    Profile {
        smtp_server_address: "smtp.example.com".into(),
        smtp_user: "user".into(),
        smtp_password: "secret".into(),
        ..Profile::default()
    }
}

#[derive(Debug)]
struct Stored {
    uid: Uid,
    flags: Flags,
    raw: Vec<u8>,
}

impl Stored {
    fn header(&self) -> Vec<u8> {
        let end = self
            .raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .map_or(self.raw.len(), |i| i + 4);
        self.raw[..end].to_vec()
    }

    fn header_value(&self, name: &str) -> Option<String> {
        let header = String::from_utf8_lossy(&self.header()).into_owned();
        header.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim().to_string())
        })
    }

    fn header_contains(&self, name: &str, needle: &str) -> bool {
        self.header_value(name)
            .is_some_and(|value| value.to_lowercase().contains(&needle.to_lowercase()))
    }

    fn sent_on(&self) -> Option<NaiveDate> {
        let value = self.header_value("Date")?;
        mailbridge_mime::parse_date(&value).map(|date| date.date_naive())
    }

    fn matches(&self, key: &SearchKey) -> bool {
        match key {
            SearchKey::All => true,
            SearchKey::Answered => self.flags.contains(&Flag::Answered),
            SearchKey::Unanswered => !self.flags.contains(&Flag::Answered),
            SearchKey::Deleted => self.flags.is_deleted(),
            SearchKey::Undeleted => !self.flags.is_deleted(),
            SearchKey::Flagged => self.flags.contains(&Flag::Flagged),
            SearchKey::Unflagged => !self.flags.contains(&Flag::Flagged),
            SearchKey::Seen => self.flags.is_seen(),
            SearchKey::Unseen => !self.flags.is_seen(),
            SearchKey::Recent => self.flags.contains(&Flag::Recent),
            SearchKey::Old => !self.flags.contains(&Flag::Recent),
            SearchKey::New => self.flags.contains(&Flag::Recent) && !self.flags.is_seen(),
            SearchKey::Bcc(s) => self.header_contains("Bcc", s),
            SearchKey::Cc(s) => self.header_contains("Cc", s),
            SearchKey::To(s) => self.header_contains("To", s),
            SearchKey::From(s) => self.header_contains("From", s),
            SearchKey::Subject(s) => self.header_contains("Subject", s),
            SearchKey::Text(s) | SearchKey::Body(s) => String::from_utf8_lossy(&self.raw)
                .to_lowercase()
                .contains(&s.to_lowercase()),
            SearchKey::SentOn(day) => self.sent_on() == Some(*day),
            SearchKey::SentBefore(day) => self.sent_on().is_some_and(|d| d < *day),
            SearchKey::SentSince(day) => self.sent_on().is_some_and(|d| d >= *day),
            SearchKey::Not(inner) => !self.matches(inner),
            SearchKey::Or(a, b) => self.matches(a) || self.matches(b),
            SearchKey::And(keys) => keys.iter().all(|k| self.matches(k)),
        }
    }
}

#[derive(Debug, Default)]
struct FakeMailbox {
    messages: Vec<Stored>,
    last_uid: u32,
}

impl FakeMailbox {
    fn push(&mut self, raw: &[u8], flags: Flags) {
        self.last_uid += 1;
        self.messages.push(Stored {
            uid: Uid::new(self.last_uid).unwrap(),
            flags,
            raw: raw.to_vec(),
        });
    }
}

#[derive(Debug)]
struct ImapServer {
    mailboxes: BTreeMap<String, FakeMailbox>,
    subscribed: BTreeSet<String>,
    selected: Option<String>,
    logons: u32,
    logged_out: bool,
}

impl Default for ImapServer {
    fn default() -> Self {
        Self {
            mailboxes: BTreeMap::from([("INBOX".to_string(), FakeMailbox::default())]),
            subscribed: BTreeSet::new(),
            selected: None,
            logons: 0,
            logged_out: false,
        }
    }
}

#[derive(Debug, Default)]
struct Pop3Server {
    messages: Vec<(String, Vec<u8>)>,
    logons: u32,
}

#[derive(Debug, Default)]
struct SmtpServer {
    sent: Vec<(Envelope, Vec<u8>)>,
    logons: u32,
    quit: bool,
}

/// Connector over shared in-memory servers.
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    imap: Arc<Mutex<ImapServer>>,
    pop3: Arc<Mutex<Pop3Server>>,
    smtp: Arc<Mutex<SmtpServer>>,
}

impl FakeConnector {
    fn imap_server(&self) -> MutexGuard<'_, ImapServer> {
        self.imap.lock().unwrap()
    }

    pub fn add_imap_message(&self, mailbox: &str, raw: &[u8], flags: Flags) {
        self.imap_server()
            .mailboxes
            .entry(mailbox.to_string())
            .or_default()
            .push(raw, flags);
    }

    /// Flags of every message in a mailbox, in UID order.
    pub fn imap_flags(&self, mailbox: &str) -> Vec<Flags> {
        self.imap_server().mailboxes[mailbox]
            .messages
            .iter()
            .map(|m| m.flags.clone())
            .collect()
    }

    pub fn imap_selected(&self) -> Option<String> {
        self.imap_server().selected.clone()
    }

    pub fn imap_logons(&self) -> u32 {
        self.imap_server().logons
    }

    pub fn imap_logged_out(&self) -> bool {
        self.imap_server().logged_out
    }

    pub fn add_pop3_message(&self, uid: &str, raw: &[u8]) {
        self.pop3
            .lock()
            .unwrap()
            .messages
            .push((uid.to_string(), raw.to_vec()));
    }

    pub fn pop3_logons(&self) -> u32 {
        self.pop3.lock().unwrap().logons
    }

    pub fn smtp_sent(&self) -> Vec<(Envelope, Vec<u8>)> {
        self.smtp.lock().unwrap().sent.clone()
    }

    pub fn smtp_logons(&self) -> u32 {
        self.smtp.lock().unwrap().logons
    }

    pub fn smtp_quit(&self) -> bool {
        self.smtp.lock().unwrap().quit
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Imap = FakeImap;
    type Pop3 = FakePop3;
    type Smtp = FakeSmtp;

    async fn imap(&self, _profile: &Profile) -> Result<FakeImap> {
        let mut server = self.imap_server();
        server.logons += 1;
        server.logged_out = false;
        Ok(FakeImap {
            server: Arc::clone(&self.imap),
        })
    }

    async fn pop3(&self, _profile: &Profile) -> Result<FakePop3> {
        self.pop3.lock().unwrap().logons += 1;
        Ok(FakePop3 {
            server: Arc::clone(&self.pop3),
            deleted: BTreeSet::new(),
        })
    }

    async fn smtp(&self, _profile: &Profile) -> Result<FakeSmtp> {
        let mut server = self.smtp.lock().unwrap();
        server.logons += 1;
        server.quit = false;
        Ok(FakeSmtp {
            server: Arc::clone(&self.smtp),
        })
    }
}

fn no(text: &str) -> Error {
    Error::Imap(mailbridge_imap::Error::No(text.to_string()))
}

fn set_contains(set: &UidSet, uid: Uid) -> bool {
    set.ranges().iter().any(|range| match *range {
        UidRange::Single(single) => single == uid,
        UidRange::Range(start, end) => start <= uid && uid <= end,
        UidRange::From(start) => start <= uid,
    })
}

#[derive(Debug)]
pub struct FakeImap {
    server: Arc<Mutex<ImapServer>>,
}

impl FakeImap {
    fn with_selected<T>(&self, f: impl FnOnce(&mut FakeMailbox) -> T) -> Result<T> {
        let mut server = self.server.lock().unwrap();
        let name = server
            .selected
            .clone()
            .ok_or_else(|| Error::Imap(mailbridge_imap::Error::InvalidState("no mailbox selected".into())))?;
        let mailbox = server.mailboxes.get_mut(&name).ok_or_else(|| no("mailbox vanished"))?;
        Ok(f(mailbox))
    }

    fn fetch(&self, uids: &UidSet, full: bool) -> Result<Vec<FetchedMessage>> {
        let internal_date: DateTime<FixedOffset> =
            DateTime::parse_from_rfc3339(INTERNAL_DATE).unwrap();
        self.with_selected(|mailbox| {
            mailbox
                .messages
                .iter()
                .enumerate()
                .filter(|(_, m)| set_contains(uids, m.uid))
                .map(|(i, m)| FetchedMessage {
                    seq: SeqNum::new(u32::try_from(i + 1).unwrap()).unwrap(),
                    uid: Some(m.uid),
                    flags: m.flags.clone(),
                    size: Some(u32::try_from(m.raw.len()).unwrap()),
                    internal_date: Some(internal_date),
                    header: (!full).then(|| m.header()),
                    body: full.then(|| m.raw.clone()),
                })
                .collect()
        })
    }
}

#[async_trait]
impl ImapSession for FakeImap {
    async fn select(&mut self, mailbox: &Mailbox) -> Result<()> {
        let mut server = self.server.lock().unwrap();
        if !server.mailboxes.contains_key(mailbox.as_str()) {
            return Err(no("no such mailbox"));
        }
        server.selected = Some(mailbox.as_str().to_string());
        Ok(())
    }

    async fn search(&mut self, key: &SearchKey) -> Result<Vec<Uid>> {
        self.with_selected(|mailbox| {
            mailbox
                .messages
                .iter()
                .filter(|m| m.matches(key))
                .map(|m| m.uid)
                .collect()
        })
    }

    async fn fetch_summaries(&mut self, uids: &UidSet) -> Result<Vec<FetchedMessage>> {
        self.fetch(uids, false)
    }

    async fn fetch_messages(&mut self, uids: &UidSet) -> Result<Vec<FetchedMessage>> {
        self.fetch(uids, true)
    }

    async fn store(&mut self, uids: &UidSet, action: StoreAction) -> Result<()> {
        self.with_selected(|mailbox| {
            for message in mailbox.messages.iter_mut().filter(|m| set_contains(uids, m.uid)) {
                match action.mode {
                    StoreMode::Replace => message.flags = action.flags.iter().cloned().collect(),
                    StoreMode::Add => action
                        .flags
                        .iter()
                        .for_each(|flag| message.flags.insert(flag.clone())),
                    StoreMode::Remove => action
                        .flags
                        .iter()
                        .for_each(|flag| message.flags.remove(flag)),
                }
            }
        })
    }

    async fn expunge(&mut self) -> Result<()> {
        self.with_selected(|mailbox| mailbox.messages.retain(|m| !m.flags.is_deleted()))
    }

    async fn message_count(&mut self) -> Result<u32> {
        self.with_selected(|mailbox| u32::try_from(mailbox.messages.len()).unwrap())
    }

    async fn list(&mut self, pattern: &str, subscribed_only: bool) -> Result<Vec<ListResponse>> {
        let server = self.server.lock().unwrap();
        let names: Vec<&String> = if subscribed_only {
            server.subscribed.iter().collect()
        } else {
            server.mailboxes.keys().collect()
        };
        Ok(names
            .into_iter()
            .filter(|name| pattern == "*" || name.as_str() == pattern)
            .map(|name| ListResponse {
                attributes: Vec::new(),
                delimiter: Some('/'),
                mailbox: Mailbox::new(name.as_str()),
            })
            .collect())
    }

    async fn create(&mut self, mailbox: &Mailbox) -> Result<()> {
        let mut server = self.server.lock().unwrap();
        if server.mailboxes.contains_key(mailbox.as_str()) {
            return Err(no("mailbox exists"));
        }
        server
            .mailboxes
            .insert(mailbox.as_str().to_string(), FakeMailbox::default());
        Ok(())
    }

    async fn delete(&mut self, mailbox: &Mailbox) -> Result<()> {
        let mut server = self.server.lock().unwrap();
        server
            .mailboxes
            .remove(mailbox.as_str())
            .map(|_| ())
            .ok_or_else(|| no("no such mailbox"))
    }

    async fn rename(&mut self, from: &Mailbox, to: &Mailbox) -> Result<()> {
        let mut server = self.server.lock().unwrap();
        let moved = server
            .mailboxes
            .remove(from.as_str())
            .ok_or_else(|| no("no such mailbox"))?;
        server.mailboxes.insert(to.as_str().to_string(), moved);
        if server.subscribed.remove(from.as_str()) {
            server.subscribed.insert(to.as_str().to_string());
        }
        Ok(())
    }

    async fn subscribe(&mut self, mailbox: &Mailbox) -> Result<()> {
        self.server
            .lock()
            .unwrap()
            .subscribed
            .insert(mailbox.as_str().to_string());
        Ok(())
    }

    async fn unsubscribe(&mut self, mailbox: &Mailbox) -> Result<()> {
        let mut server = self.server.lock().unwrap();
        if server.subscribed.remove(mailbox.as_str()) {
            Ok(())
        } else {
            Err(no("not subscribed"))
        }
    }

    async fn append(&mut self, mailbox: &Mailbox, message: &[u8]) -> Result<()> {
        let mut server = self.server.lock().unwrap();
        let target = server
            .mailboxes
            .get_mut(mailbox.as_str())
            .ok_or_else(|| no("[TRYCREATE] no such mailbox"))?;
        target.push(message, std::iter::once(Flag::Seen).collect());
        Ok(())
    }

    async fn logout(&mut self) -> Result<()> {
        let mut server = self.server.lock().unwrap();
        server.selected = None;
        server.logged_out = true;
        Ok(())
    }
}

/// A POP3 session: deletions are kept aside until QUIT.
#[derive(Debug)]
pub struct FakePop3 {
    server: Arc<Mutex<Pop3Server>>,
    deleted: BTreeSet<u32>,
}

impl FakePop3 {
    fn message(&self, number: u32) -> Result<Vec<u8>> {
        let server = self.server.lock().unwrap();
        let index = number.checked_sub(1).ok_or_else(no_such_message)? as usize;
        if self.deleted.contains(&number) {
            return Err(no_such_message());
        }
        server
            .messages
            .get(index)
            .map(|(_, raw)| raw.clone())
            .ok_or_else(no_such_message)
    }
}

fn no_such_message() -> Error {
    Error::Pop3(mailbridge_pop3::Error::Server("no such message".into()))
}

#[async_trait]
impl Pop3Session for FakePop3 {
    async fn count(&mut self) -> Result<u32> {
        let total = self.server.lock().unwrap().messages.len();
        Ok(u32::try_from(total - self.deleted.len()).unwrap())
    }

    async fn uids(&mut self) -> Result<Vec<UidlEntry>> {
        let server = self.server.lock().unwrap();
        Ok(server
            .messages
            .iter()
            .enumerate()
            .map(|(i, (uid, _))| UidlEntry {
                number: u32::try_from(i + 1).unwrap(),
                uid: uid.clone(),
            })
            .filter(|entry| !self.deleted.contains(&entry.number))
            .collect())
    }

    async fn header(&mut self, number: u32) -> Result<Vec<u8>> {
        let raw = self.message(number)?;
        let end = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .map_or(raw.len(), |i| i + 4);
        Ok(raw[..end].to_vec())
    }

    async fn retrieve(&mut self, number: u32) -> Result<Vec<u8>> {
        self.message(number)
    }

    async fn delete(&mut self, number: u32) -> Result<()> {
        self.message(number)?;
        self.deleted.insert(number);
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        let mut server = self.server.lock().unwrap();
        for number in std::mem::take(&mut self.deleted).into_iter().rev() {
            server.messages.remove(number as usize - 1);
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakeSmtp {
    server: Arc<Mutex<SmtpServer>>,
}

#[async_trait]
impl SmtpTransport for FakeSmtp {
    async fn send(&mut self, envelope: &Envelope, message: &[u8]) -> Result<()> {
        self.server
            .lock()
            .unwrap()
            .sent
            .push((envelope.clone(), message.to_vec()));
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        self.server.lock().unwrap().quit = true;
        Ok(())
    }
}
