pub mod ask;
pub mod chat;
pub mod health;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use studybot_ai::{UserProfile, build_system_prompt, welcome_message};

use crate::config::Settings;

/// What a conversation starts from: the profile and the prompts derived from it.
#[derive(Debug, Clone)]
pub struct Session {
    pub profile: UserProfile,
    pub system_prompt: String,
    pub welcome: String,
}

impl Session {
    pub fn load(settings: &Settings) -> Result<Self> {
        let profile = match &settings.profile {
            Some(path) => UserProfile::load(path)
                .with_context(|| format!("Failed to read profile {}", path.display()))?,
            None => UserProfile::default(),
        };
        Ok(Self::from_profile(profile, Local::now().date_naive()))
    }

    pub fn from_profile(profile: UserProfile, today: NaiveDate) -> Self {
        let system_prompt = build_system_prompt(&profile.tasks, today);
        let welcome = welcome_message(&profile.tasks, today);
        Self {
            profile,
            system_prompt,
            welcome,
        }
    }
}
