//! Team name normalization
//!
//! Different sources spell clubs differently ("Manchester United" vs
//! "Man United"). The mapping is configuration, loaded once at startup.

use std::collections::HashMap;

use crate::TeamId;

/// Immutable alias -> canonical name lookup (case-insensitive)
#[derive(Debug, Clone, Default)]
pub struct TeamAliases {
    map: HashMap<String, String>,
}

impl TeamAliases {
    pub fn new(aliases: &HashMap<String, String>) -> Self {
        let map = aliases
            .iter()
            .map(|(alias, canonical)| (alias.trim().to_lowercase(), canonical.trim().to_string()))
            .collect();
        TeamAliases { map }
    }

    /// Canonical id for a raw name; unknown names pass through trimmed
    pub fn canonical(&self, name: &str) -> TeamId {
        let trimmed = name.trim();
        match self.map.get(&trimmed.to_lowercase()) {
            Some(canonical) => TeamId(canonical.clone()),
            None => TeamId(trimmed.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases() -> TeamAliases {
        let mut map = HashMap::new();
        map.insert("Manchester United".to_string(), "Man United".to_string());
        map.insert("Wolverhampton Wanderers".to_string(), "Wolves".to_string());
        TeamAliases::new(&map)
    }

    #[test]
    fn test_alias_lookup() {
        let aliases = aliases();
        assert_eq!(aliases.canonical("Manchester United").as_str(), "Man United");
        assert_eq!(aliases.canonical("  wolverhampton wanderers ").as_str(), "Wolves");
    }

    #[test]
    fn test_unknown_name_passes_through() {
        let aliases = aliases();
        assert_eq!(aliases.canonical(" Arsenal ").as_str(), "Arsenal");
        assert_eq!(aliases.len(), 2);
    }
}
