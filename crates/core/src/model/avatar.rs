use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlayerError {
    #[error("player name cannot be empty")]
    EmptyName,

    #[error("unknown fur color: {0}")]
    UnknownColor(String),

    #[error("unknown accessory: {0}")]
    UnknownAccessory(String),
}

//
// ─── PLAYER NAME ───────────────────────────────────────────────────────────────
//

/// Trimmed, non-empty display name of the racer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerName(String);

impl PlayerName {
    /// # Errors
    ///
    /// Returns `PlayerError::EmptyName` when the name is blank after trimming.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, PlayerError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(PlayerError::EmptyName);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PlayerName {
    type Error = PlayerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlayerName> for String {
    fn from(value: PlayerName) -> Self {
        value.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── AVATAR ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FurColor {
    Brown,
    Gray,
    Cream,
    Spotted,
    #[default]
    Gold,
    Tricolor,
}

impl FurColor {
    pub const ALL: [FurColor; 6] = [
        FurColor::Brown,
        FurColor::Gray,
        FurColor::Cream,
        FurColor::Spotted,
        FurColor::Gold,
        FurColor::Tricolor,
    ];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            FurColor::Brown => "brown",
            FurColor::Gray => "gray",
            FurColor::Cream => "cream",
            FurColor::Spotted => "spotted",
            FurColor::Gold => "gold",
            FurColor::Tricolor => "tricolor",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            FurColor::Brown => "Brownie",
            FurColor::Gray => "Smokey",
            FurColor::Cream => "Vanilla",
            FurColor::Spotted => "Patches",
            FurColor::Gold => "Goldie",
            FurColor::Tricolor => "Rainbow",
        }
    }
}

impl FromStr for FurColor {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.key() == needle)
            .ok_or_else(|| PlayerError::UnknownColor(s.to_owned()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessory {
    Goggles,
    Headset,
    Flag,
    Helmet,
    Antenna,
    Jetpack,
    Medal,
    Telescope,
    Rocket,
    Satellite,
    Star,
    Planet,
    Comet,
    Alien,
    Flashlight,
    Compass,
}

impl Accessory {
    pub const ALL: [Accessory; 16] = [
        Accessory::Goggles,
        Accessory::Headset,
        Accessory::Flag,
        Accessory::Helmet,
        Accessory::Antenna,
        Accessory::Jetpack,
        Accessory::Medal,
        Accessory::Telescope,
        Accessory::Rocket,
        Accessory::Satellite,
        Accessory::Star,
        Accessory::Planet,
        Accessory::Comet,
        Accessory::Alien,
        Accessory::Flashlight,
        Accessory::Compass,
    ];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Accessory::Goggles => "goggles",
            Accessory::Headset => "headset",
            Accessory::Flag => "flag",
            Accessory::Helmet => "helmet",
            Accessory::Antenna => "antenna",
            Accessory::Jetpack => "jetpack",
            Accessory::Medal => "medal",
            Accessory::Telescope => "telescope",
            Accessory::Rocket => "rocket",
            Accessory::Satellite => "satellite",
            Accessory::Star => "star",
            Accessory::Planet => "planet",
            Accessory::Comet => "comet",
            Accessory::Alien => "alien",
            Accessory::Flashlight => "flashlight",
            Accessory::Compass => "compass",
        }
    }
}

impl FromStr for Accessory {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.key() == needle)
            .ok_or_else(|| PlayerError::UnknownAccessory(s.to_owned()))
    }
}

/// Look of the racer's hamster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarConfig {
    pub color: FurColor,
    pub accessory: Option<Accessory>,
}

impl AvatarConfig {
    #[must_use]
    pub fn new(color: FurColor, accessory: Option<Accessory>) -> Self {
        Self { color, accessory }
    }

    /// Picking the accessory that is already worn takes it off.
    pub fn toggle_accessory(&mut self, accessory: Accessory) {
        self.accessory = if self.accessory == Some(accessory) {
            None
        } else {
            Some(accessory)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_name_is_trimmed() {
        let name = PlayerName::new("  Luna ").unwrap();
        assert_eq!(name.as_str(), "Luna");
    }

    #[test]
    fn blank_player_name_is_rejected() {
        assert_eq!(PlayerName::new("   "), Err(PlayerError::EmptyName));
    }

    #[test]
    fn default_avatar_is_gold_without_accessory() {
        let avatar = AvatarConfig::default();
        assert_eq!(avatar.color, FurColor::Gold);
        assert_eq!(avatar.accessory, None);
    }

    #[test]
    fn toggling_same_accessory_removes_it() {
        let mut avatar = AvatarConfig::default();
        avatar.toggle_accessory(Accessory::Jetpack);
        assert_eq!(avatar.accessory, Some(Accessory::Jetpack));
        avatar.toggle_accessory(Accessory::Helmet);
        assert_eq!(avatar.accessory, Some(Accessory::Helmet));
        avatar.toggle_accessory(Accessory::Helmet);
        assert_eq!(avatar.accessory, None);
    }

    #[test]
    fn parses_color_and_accessory_keys() {
        assert_eq!("Tricolor".parse::<FurColor>().unwrap(), FurColor::Tricolor);
        assert_eq!("comet".parse::<Accessory>().unwrap(), Accessory::Comet);
        assert!("plaid".parse::<FurColor>().is_err());
    }
}
