use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Namespace assumed when an atlas id or path doesn't carry one.
pub const DEFAULT_NAMESPACE: &str = "minecraft";
/// Optional override listing every texture path, one per line.
pub const TEXTURES_INDEX_FILE: &str = "textures.index";
pub(crate) const TEXTURES_SEGMENT: &str = "/textures/";
pub(crate) const PNG_SUFFIX: &str = ".png";

// A leaf like `grass_10`: a stem, an underscore, then ASCII digits only.
regex!(NUMBERED_LEAF_REGEX, r"^(.+)_[0-9]+$");
