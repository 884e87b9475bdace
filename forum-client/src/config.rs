/// Deepest reply nesting the locator walks before calling a tree malformed
pub const DEFAULT_MAX_DEPTH: usize = 512;

pub const DEFAULT_GUEST_NICKNAME: &str = "Guest";

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Config {
    pub max_depth: usize,

    /// Nickname used for guest comments submitted without one
    pub guest_nickname: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            max_depth: DEFAULT_MAX_DEPTH,
            guest_nickname: String::from(DEFAULT_GUEST_NICKNAME),
        }
    }
}
