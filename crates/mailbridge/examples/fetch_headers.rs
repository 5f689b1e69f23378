//! Example: list message headers from an IMAP or POP3 mailbox
//!
//! The profile is a JSON file with `Profile` fields; missing fields take
//! their defaults.
//!
//! ```bash
//! cat > profile.json <<'EOF'
//! { "imap_server_address": "imap.example.com", "imap_use_ssl": true,
//!   "imap_user": "me@example.com", "imap_password": "app-password" }
//! EOF
//! RUST_LOG=mailbridge=debug cargo run -p mailbridge --example fetch_headers -- profile.json imap
//! ```

use anyhow::{Context, bail};
use mailbridge::{InternetMail, Profile, Protocol, SearchFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailbridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next().context("usage: fetch_headers <profile.json> [imap|pop3] [unseen]")?;
    let protocol = match args.next().as_deref() {
        None | Some("imap") => Protocol::Imap,
        Some("pop3") => Protocol::Pop3,
        Some(other) => bail!("unknown receive protocol {other:?}"),
    };
    let unseen_only = args.next().as_deref() == Some("unseen");

    let profile = Profile::load(&path).with_context(|| format!("loading {path}"))?;
    let mut mail = InternetMail::new();
    mail.logon(&profile, protocol).await?;

    println!("{} message(s)", mail.get_message_count().await?);
    let filter = unseen_only.then(|| SearchFilter::new().with("seen", false));
    for message in mail.get_headers(filter.as_ref()).await? {
        let from = message
            .sender
            .as_ref()
            .and_then(|sender| sender.to_mailbox().ok())
            .map(|mailbox| mailbox.address)
            .unwrap_or_default();
        println!(
            "{:<12} {:<32} {}",
            message.ids().first().map_or("", String::as_str),
            from,
            message.subject
        );
    }

    mail.logoff().await?;
    Ok(())
}
