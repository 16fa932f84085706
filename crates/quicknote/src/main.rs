mod api;
mod link;

use std::io::{self, IsTerminal, Read};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::Password;
use quicknote_core::wire::{CreateNoteRequest, NoteResponse};
use quicknote_core::{expires_at, ExpiryDuration, LinkKey, NoteCipher, Secret, ViewPolicy};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use crate::api::ApiClient;
use crate::link::ShareLink;

const PASSWORD_ATTEMPTS: usize = 3;
const UNAVAILABLE: &str = "note is unavailable: it may have expired or already been read";

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "quicknote",
    about = "quicknote — share end-to-end encrypted notes that destroy themselves",
    version
)]
struct Cli {
    /// Log level for diagnostics on stderr (default: $QUICKNOTE_LOG_LEVEL or warn)
    #[arg(long, global = true, env = "QUICKNOTE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a note locally, upload the ciphertext and print the share link
    Create {
        /// Note text (read from stdin when omitted)
        text: Option<String>,
        /// Protect the note with a password instead of a key in the link
        #[arg(long)]
        password: bool,
        /// Lifetime such as 30m, 2h or 7d
        #[arg(long)]
        expires: Option<ExpiryDuration>,
        /// Maximum number of views
        #[arg(long, conflicts_with = "burn")]
        views: Option<u32>,
        /// Destroy the note after it is read once
        #[arg(long)]
        burn: bool,
        /// Server base URL
        #[arg(long, env = "QUICKNOTE_SERVER", default_value = "http://localhost:8080")]
        server: String,
    },
    /// Fetch, decrypt and print a note from a share link
    Open {
        /// Share link, e.g. https://host/n/<id>#<key>
        link: String,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = match cli.log_level.as_deref() {
        Some(l) if l.eq_ignore_ascii_case("verbose") => "debug".to_owned(),
        Some(l) => l.to_owned(),
        None => "warn".to_owned(),
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::new(level))
        .init();

    match cli.command {
        Commands::Create {
            text,
            password,
            expires,
            views,
            burn,
            server,
        } => cmd_create(text, password, expires, views, burn, &server).await,
        Commands::Open { link } => cmd_open(&link).await,
    }
}

// ── Command implementations ───────────────────────────────────────────────────

async fn cmd_create(
    text: Option<String>,
    password: bool,
    expires: Option<ExpiryDuration>,
    views: Option<u32>,
    burn: bool,
    server: &str,
) -> Result<()> {
    let plaintext = Zeroizing::new(match text {
        Some(t) => t,
        None => read_stdin()?,
    });
    if plaintext.is_empty() {
        bail!("note is empty");
    }

    let policy = ViewPolicy::from_parts(views, burn)?;
    let deadline = match expires {
        Some(d) => Some(
            expires_at(now_ms(), d).ok_or_else(|| anyhow!("expiry {d} is out of range"))?,
        ),
        None => None,
    };

    let (secret, link_key) = if password {
        (Secret::password(prompt_new_password()?.as_str()), None)
    } else {
        let key = LinkKey::generate();
        (Secret::LinkKey(key.clone()), Some(key))
    };

    let encrypted = NoteCipher::default().encrypt(&plaintext, &secret)?;
    let mut req = CreateNoteRequest::new(encrypted, secret.has_password());
    req.expires_at = deadline;
    req.max_views = policy.max_views();
    req.burn_after_reading = policy.burn_after_reading();

    let api = ApiClient::new(server)?;
    let id = api.create_note(&req).await?;
    debug!(%id, "note created");

    println!("{}", ShareLink::new(server, id, link_key));
    Ok(())
}

async fn cmd_open(link: &str) -> Result<()> {
    let link = ShareLink::parse(link)?;
    let api = ApiClient::new(&link.origin)?;
    let plaintext = open_note(&api, &NoteCipher::default(), &link, password_from_env()).await?;
    println!("{}", plaintext.as_str());
    Ok(())
}

/// Fetch, decrypt locally, then confirm the view. The plaintext is only
/// handed back once the server has counted the view.
async fn open_note(
    api: &ApiClient,
    cipher: &NoteCipher,
    link: &ShareLink,
    env_password: Option<Zeroizing<String>>,
) -> Result<Zeroizing<String>> {
    let note = api
        .fetch_note(&link.id)
        .await?
        .ok_or_else(|| anyhow!(UNAVAILABLE))?;

    let plaintext = decrypt_note(cipher, &note, link.key.as_ref(), env_password)?;

    if !api.confirm_view(&link.id).await? {
        bail!(UNAVAILABLE);
    }
    Ok(plaintext)
}

/// Wrong passwords are retried against the already fetched ciphertext, so
/// failed attempts never touch the server.
fn decrypt_note(
    cipher: &NoteCipher,
    note: &NoteResponse,
    key: Option<&LinkKey>,
    env_password: Option<Zeroizing<String>>,
) -> Result<Zeroizing<String>> {
    let encrypted = note.encrypted();

    if !note.has_password {
        let key = key.ok_or_else(|| anyhow!("link is missing its key fragment"))?;
        let plaintext = cipher
            .decrypt(&encrypted, &key.encode())
            .context("decryption failed: the link key does not match")?;
        return Ok(Zeroizing::new(plaintext));
    }

    if let Some(password) = env_password {
        let plaintext = cipher
            .decrypt(&encrypted, &password)
            .context("decryption failed: QUICKNOTE_PASSWORD is wrong")?;
        return Ok(Zeroizing::new(plaintext));
    }

    ensure_terminal()?;
    for attempt in 1..=PASSWORD_ATTEMPTS {
        let password = Zeroizing::new(
            Password::new()
                .with_prompt("Password")
                .interact()
                .map_err(|e| anyhow!("failed to read password: {e}"))?,
        );
        match cipher.decrypt(&encrypted, &password) {
            Ok(plaintext) => return Ok(Zeroizing::new(plaintext)),
            Err(_) if attempt < PASSWORD_ATTEMPTS => eprintln!("Wrong password, try again."),
            Err(_) => {}
        }
    }
    bail!("decryption failed after {PASSWORD_ATTEMPTS} attempts")
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn password_from_env() -> Option<Zeroizing<String>> {
    std::env::var("QUICKNOTE_PASSWORD")
        .ok()
        .filter(|v| !v.is_empty())
        .map(Zeroizing::new)
}

fn prompt_new_password() -> Result<Zeroizing<String>> {
    if let Some(password) = password_from_env() {
        return Ok(password);
    }
    ensure_terminal()?;
    let password = Password::new()
        .with_prompt("Password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .map_err(|e| anyhow!("failed to read password: {e}"))?;
    if password.is_empty() {
        bail!("password must not be empty");
    }
    Ok(Zeroizing::new(password))
}

/// dialoguer prompts on stderr's terminal, so stdin may still be a pipe.
fn ensure_terminal() -> Result<()> {
    if !io::stderr().is_terminal() {
        bail!("no password provided and no TTY available; set QUICKNOTE_PASSWORD");
    }
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("read note from stdin")?;
    let trimmed = buf.trim_end_matches(['\r', '\n']).len();
    buf.truncate(trimmed);
    Ok(buf)
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use quicknote_core::EncryptedNote;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast() -> NoteCipher {
        NoteCipher::with_iterations(1_000)
    }

    fn response_for(encrypted: EncryptedNote, has_password: bool) -> NoteResponse {
        NoteResponse {
            id: "abc".into(),
            ciphertext: encrypted.ciphertext,
            iv: encrypted.iv,
            salt: encrypted.salt,
            has_password,
            expires_at: None,
            created_at: 0,
            view_policy: ViewPolicy::BurnAfterReading,
            view_count: 0,
            views_remaining: Some(1),
        }
    }

    fn password(p: &str) -> Option<Zeroizing<String>> {
        Some(Zeroizing::new(p.to_owned()))
    }

    /// Serves `note` under `/api/notes/abc` and answers view confirmations
    /// with `counted`, expecting exactly `confirmations` of them.
    async fn mock_server(note: &NoteResponse, counted: bool, confirmations: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notes/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(note))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/notes/abc/views"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"counted": counted})),
            )
            .expect(confirmations)
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn link_key_note_decrypts_with_fragment() {
        let key = LinkKey::generate();
        let encrypted = fast().encrypt("hello", &Secret::LinkKey(key.clone())).unwrap();
        let note = response_for(encrypted, false);
        let plaintext = decrypt_note(&fast(), &note, Some(&key), None).unwrap();
        assert_eq!(plaintext.as_str(), "hello");
    }

    #[test]
    fn link_key_note_without_fragment_fails() {
        let encrypted = fast()
            .encrypt("hello", &Secret::LinkKey(LinkKey::generate()))
            .unwrap();
        let note = response_for(encrypted, false);
        assert!(decrypt_note(&fast(), &note, None, None).is_err());
    }

    #[test]
    fn wrong_link_key_fails() {
        let encrypted = fast()
            .encrypt("hello", &Secret::LinkKey(LinkKey::generate()))
            .unwrap();
        let note = response_for(encrypted, false);
        assert!(decrypt_note(&fast(), &note, Some(&LinkKey::generate()), None).is_err());
    }

    #[tokio::test]
    async fn open_returns_plaintext_after_counted_view() {
        let key = LinkKey::generate();
        let encrypted = fast().encrypt("hello", &Secret::LinkKey(key.clone())).unwrap();
        let server = mock_server(&response_for(encrypted, false), true, 1).await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let link = ShareLink::new(&server.uri(), "abc", Some(key));
        let plaintext = open_note(&api, &fast(), &link, None).await.unwrap();
        assert_eq!(plaintext.as_str(), "hello");
    }

    #[tokio::test]
    async fn open_withholds_plaintext_when_view_not_counted() {
        let key = LinkKey::generate();
        let encrypted = fast().encrypt("hello", &Secret::LinkKey(key.clone())).unwrap();
        let server = mock_server(&response_for(encrypted, false), false, 1).await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let link = ShareLink::new(&server.uri(), "abc", Some(key));
        let err = open_note(&api, &fast(), &link, None).await.unwrap_err();
        assert!(err.to_string().contains("unavailable"), "{err}");
    }

    #[tokio::test]
    async fn wrong_password_never_confirms_a_view() {
        let encrypted = fast().encrypt("secret", &Secret::password("p@ss")).unwrap();
        let server = mock_server(&response_for(encrypted, true), true, 0).await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let link = ShareLink::new(&server.uri(), "abc", None);
        assert!(open_note(&api, &fast(), &link, password("wrong"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn right_password_opens_note() {
        let encrypted = fast().encrypt("secret", &Secret::password("p@ss")).unwrap();
        let server = mock_server(&response_for(encrypted, true), true, 1).await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let link = ShareLink::new(&server.uri(), "abc", None);
        let plaintext = open_note(&api, &fast(), &link, password("p@ss"))
            .await
            .unwrap();
        assert_eq!(plaintext.as_str(), "secret");
    }

    #[test]
    fn wrong_password_is_retryable_against_the_same_note() {
        let encrypted = fast().encrypt("secret", &Secret::password("p@ss")).unwrap();
        let note = response_for(encrypted, true);
        assert!(decrypt_note(&fast(), &note, None, password("wrong")).is_err());
        let plaintext = decrypt_note(&fast(), &note, None, password("p@ss")).unwrap();
        assert_eq!(plaintext.as_str(), "secret");
    }

    #[test]
    fn cli_rejects_views_with_burn() {
        assert!(Cli::try_parse_from(["quicknote", "create", "x", "--views", "2", "--burn"]).is_err());
    }

    #[test]
    fn cli_parses_expiry() {
        let cli = Cli::try_parse_from(["quicknote", "create", "x", "--expires", "2h"]).unwrap();
        match cli.command {
            Commands::Create { expires, .. } => assert_eq!(expires.unwrap().to_string(), "2h"),
            Commands::Open { .. } => panic!("expected create"),
        }
    }
}
