use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(EntityType {
    Place => "place",
    Lodging => "lodging",
    Transport => "transport",
});

str_enum!(TransportMode {
    Flight => "flight",
    Transfer => "transfer",
    Train => "train",
    Bus => "bus",
});

impl EntityType {
    pub const ALL: [EntityType; 3] = [Self::Place, Self::Lodging, Self::Transport];

    /// Resolve a marker or entity-list keyword, accepting the aliases the
    /// generator uses (`hotel`, `flight`, ...). ASCII case-insensitive.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "place" => Some(Self::Place),
            "lodging" | "hotel" | "stay" => Some(Self::Lodging),
            "transport" | "flight" | "train" | "bus" | "transfer" => Some(Self::Transport),
            _ => None,
        }
    }
}

impl TransportMode {
    /// Lenient parse for generator output ("Flight", "TAXI", "transfer").
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "flight" | "plane" | "air" => Some(Self::Flight),
            "transfer" | "taxi" | "car" => Some(Self::Transfer),
            "train" | "rail" => Some(Self::Train),
            "bus" | "coach" => Some(Self::Bus),
            _ => None,
        }
    }
}

impl Default for TransportMode {
    fn default() -> Self {
        Self::Flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn entity_type_round_trip() {
        for (variant, s) in [
            (EntityType::Place, "place"),
            (EntityType::Lodging, "lodging"),
            (EntityType::Transport, "transport"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(EntityType::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn entity_type_rejects_unknown() {
        let err = EntityType::from_str("restaurant").unwrap_err();
        assert!(err.to_string().contains("restaurant"));
    }

    #[test]
    fn keyword_aliases_map_to_entity_types() {
        assert_eq!(EntityType::from_keyword("HOTEL"), Some(EntityType::Lodging));
        assert_eq!(EntityType::from_keyword("flight"), Some(EntityType::Transport));
        assert_eq!(EntityType::from_keyword("Transfer"), Some(EntityType::Transport));
        assert_eq!(EntityType::from_keyword("Place"), Some(EntityType::Place));
        assert_eq!(EntityType::from_keyword("span"), None);
    }

    #[test]
    fn transport_mode_keywords() {
        assert_eq!(TransportMode::from_keyword(" Flight "), Some(TransportMode::Flight));
        assert_eq!(TransportMode::from_keyword("TAXI"), Some(TransportMode::Transfer));
        assert_eq!(TransportMode::from_keyword("rail"), Some(TransportMode::Train));
        assert_eq!(TransportMode::from_keyword("ferry"), None);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&EntityType::Lodging).unwrap();
        assert_eq!(json, "\"lodging\"");
        let back: TransportMode = serde_json::from_str("\"train\"").unwrap();
        assert_eq!(back, TransportMode::Train);
    }
}
