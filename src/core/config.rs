// Gateway configuration.
//
// The services only read this; loading happens once at the composition root.
// `from_env` is the standard way to build it (with `.env` support), but the
// struct is plain data so tests just fill the fields in.

use crate::core::gateway::ChatRef;
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::PathBuf;

/// Submission text longer than this is truncated on ingestion.
pub const DEFAULT_MAX_TEXT_LEN: usize = 4000;

const DEFAULT_MUTE_DB_PATH: &str = "data/moderation_data.json";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Identities allowed to approve, reject, mute and retract anything.
    pub admin_ids: HashSet<u64>,
    /// The admin who receives moderation prompts. Always a member of
    /// `admin_ids`; configured explicitly so prompt routing is deterministic.
    pub primary_reviewer: u64,
    /// Where approved submissions are published.
    pub channel: ChatRef,
    /// The group that anonymous inline posts go to.
    pub group: ChatRef,
    /// Truncation limit for submission text.
    pub max_text_len: usize,
    /// Where the mute store persists its document.
    pub mute_db_path: PathBuf,
    /// Extra denylist terms on top of the built-in profanity list.
    pub extra_bad_words: Vec<String>,
}

impl GatewayConfig {
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Load configuration from the environment (and `.env`, if present).
    ///
    /// `ADMIN_IDS` is a comma-separated list; the first entry is the default
    /// primary reviewer unless `PRIMARY_REVIEWER` overrides it.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let admin_list = parse_id_list(
            &std::env::var("ADMIN_IDS").context("Missing ADMIN_IDS environment variable")?,
        )?;
        if admin_list.is_empty() {
            bail!("ADMIN_IDS must name at least one admin");
        }

        let primary_reviewer = match std::env::var("PRIMARY_REVIEWER") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .context("PRIMARY_REVIEWER is not a valid user id")?,
            Err(_) => admin_list[0],
        };

        let admin_ids: HashSet<u64> = admin_list.into_iter().collect();
        if !admin_ids.contains(&primary_reviewer) {
            bail!("PRIMARY_REVIEWER {primary_reviewer} is not in ADMIN_IDS");
        }

        let channel = parse_chat_ref(
            &std::env::var("CHANNEL_ID").context("Missing CHANNEL_ID environment variable")?,
        )?;
        let group = parse_chat_ref(
            &std::env::var("GROUP_ID").context("Missing GROUP_ID environment variable")?,
        )?;

        let max_text_len = match std::env::var("MAX_TEXT_LEN") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .context("MAX_TEXT_LEN is not a valid length")?,
            Err(_) => DEFAULT_MAX_TEXT_LEN,
        };

        let mute_db_path = std::env::var("MUTE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MUTE_DB_PATH));

        let extra_bad_words = std::env::var("BAD_WORDS")
            .map(|raw| {
                raw.split(',')
                    .map(|w| w.trim().to_string())
                    .filter(|w| !w.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            admin_ids,
            primary_reviewer,
            channel,
            group,
            max_text_len,
            mute_db_path,
            extra_bad_words,
        })
    }
}

/// Parse a comma-separated id list, preserving order.
fn parse_id_list(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .with_context(|| format!("'{part}' is not a valid user id"))
        })
        .collect()
}

/// A chat reference is either a public `@handle` or a numeric group id.
fn parse_chat_ref(raw: &str) -> Result<ChatRef> {
    let raw = raw.trim();
    if let Some(handle) = raw.strip_prefix('@') {
        if handle.is_empty() {
            bail!("chat handle '@' is missing a name");
        }
        return Ok(ChatRef::Channel(raw.to_string()));
    }
    let id = raw
        .parse::<i64>()
        .with_context(|| format!("'{raw}' is neither an @handle nor a numeric chat id"))?;
    Ok(ChatRef::Group(id))
}
