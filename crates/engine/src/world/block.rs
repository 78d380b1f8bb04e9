use std::fmt;
use std::sync::Arc;

/// Namespace assumed when an identifier is written without one.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Normalize a raw identifier into `namespace:path` form.
///
/// Lowercases, trims, and prefixes [`DEFAULT_NAMESPACE`] when no namespace is
/// given, so `"IRON_ORE"`, `"iron_ore"` and `"minecraft:iron_ore"` all compare
/// equal afterwards.
pub fn normalize_id(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    if lowered.contains(':') {
        lowered
    } else {
        format!("{DEFAULT_NAMESPACE}:{lowered}")
    }
}

/// Opaque block type identifier. The engine compares these by value and
/// never interprets them; game layers attach meaning (drops, tools, XP).
///
/// Cloning is a refcount bump, so a vein can cache the type per member.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockType(Arc<str>);

impl BlockType {
    pub fn new(raw: &str) -> Self {
        Self(Arc::from(normalize_id(raw)))
    }

    /// The universal "empty" block. Cleared positions read back as this.
    pub fn air() -> Self {
        Self::new("air")
    }

    pub fn is_air(&self) -> bool {
        self.path() == "air" && self.namespace() == DEFAULT_NAMESPACE
    }

    /// Full `namespace:path` form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map(|(ns, _)| ns).unwrap_or(DEFAULT_NAMESPACE)
    }

    /// The identifier without its namespace, e.g. `iron_ore`.
    pub fn path(&self) -> &str {
        self.0.split_once(':').map(|(_, path)| path).unwrap_or(&self.0)
    }
}

impl fmt::Debug for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockType({})", self.0)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockType {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
