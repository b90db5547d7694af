//! Startup configuration, read once from the environment and handed to the
//! request-handling components by reference. Required secrets have no
//! baked-in fallback: the process refuses to start without them.

use std::path::PathBuf;

use anyhow::{Context, Result};

use warroom_api::trigger::DEFAULT_TRIGGER_KEYWORDS;

const DEFAULT_MODEL_CHAIN: &[&str] = &["gemini-1.5-pro", "gemini-1.5-flash", "gemini-pro"];
const DEFAULT_QUOTA_CEILING: u32 = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub jwt_secret: String,
    pub gemini_api_key: String,
    pub model_chain: Vec<String>,
    pub quota_ceiling: u32,
    pub quota_allow_list: Vec<String>,
    pub trigger_keywords: Vec<String>,
    pub solo_room_auto_reply: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = required("WARROOM_JWT_SECRET")?;
        let gemini_api_key = required("WARROOM_GEMINI_API_KEY")?;

        let host = optional("WARROOM_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = optional("WARROOM_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("WARROOM_PORT must be a port number")?;
        let db_path = PathBuf::from(optional("WARROOM_DB_PATH").unwrap_or_else(|| "warroom.db".into()));
        let upload_dir =
            PathBuf::from(optional("WARROOM_UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()));

        let model_chain = optional("WARROOM_MODELS")
            .map(|s| csv_list(&s))
            .unwrap_or_else(|| DEFAULT_MODEL_CHAIN.iter().map(|s| s.to_string()).collect());
        if model_chain.is_empty() {
            anyhow::bail!("WARROOM_MODELS must name at least one model");
        }

        let quota_ceiling = optional("WARROOM_QUOTA_CEILING")
            .unwrap_or_else(|| DEFAULT_QUOTA_CEILING.to_string())
            .parse()
            .context("WARROOM_QUOTA_CEILING must be a number")?;
        let quota_allow_list = optional("WARROOM_QUOTA_ALLOW_LIST")
            .map(|s| csv_list(&s))
            .unwrap_or_default();

        let trigger_keywords = optional("WARROOM_TRIGGER_KEYWORDS")
            .map(|s| csv_list(&s))
            .unwrap_or_else(|| DEFAULT_TRIGGER_KEYWORDS.iter().map(|s| s.to_string()).collect());
        let solo_room_auto_reply = optional("WARROOM_SOLO_ROOM_AUTO_REPLY")
            .map(|s| truthy(&s))
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            db_path,
            upload_dir,
            jwt_secret,
            gemini_api_key,
            model_chain,
            quota_ceiling,
            quota_allow_list,
            trigger_keywords,
            solo_room_auto_reply,
        })
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{} must be set (no fallback exists)", name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn csv_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn truthy(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_lists_trim_and_drop_empties() {
        assert_eq!(csv_list("a, b ,,c"), vec!["a", "b", "c"]);
        assert!(csv_list(" , ").is_empty());
    }

    #[test]
    fn truthy_accepts_common_spellings() {
        assert!(truthy("1"));
        assert!(truthy("TRUE"));
        assert!(truthy(" yes "));
        assert!(!truthy("0"));
        assert!(!truthy("nope"));
    }
}
