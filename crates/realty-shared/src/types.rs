use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

id_newtype!(
    /// Row id of a registered user.
    UserId
);
id_newtype!(PropertyId);
id_newtype!(MessageId);
id_newtype!(CommentId);
id_newtype!(ImageId);

// Role chosen at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Realtor,
    Client,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Realtor => "realtor",
            Self::Client => "client",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "realtor" => Some(Self::Realtor),
            "client" => Some(Self::Client),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "M" => Some(Self::Male),
            "F" => Some(Self::Female),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Apartment,
    House,
    Land,
    Commercial,
}

impl PropertyType {
    pub const ALL: [PropertyType; 4] = [
        PropertyType::Apartment,
        PropertyType::House,
        PropertyType::Land,
        PropertyType::Commercial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apartment => "apartment",
            Self::House => "house",
            Self::Land => "land",
            Self::Commercial => "commercial",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Apartment => "Apartment",
            Self::House => "House",
            Self::Land => "Land plot",
            Self::Commercial => "Commercial property",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Listing lifecycle. Only `Active` listings appear in search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    #[default]
    Active,
    Sold,
    Hidden,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Sold => "sold",
            Self::Hidden => "hidden",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "sold" => Some(Self::Sold),
            "hidden" => Some(Self::Hidden),
            _ => None,
        }
    }
}

/// Sort keys accepted by the property search. Anything else falls back to
/// newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertySort {
    PriceAsc,
    PriceDesc,
    CreatedAsc,
    #[default]
    CreatedDesc,
    ViewsAsc,
    ViewsDesc,
}

impl PropertySort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceAsc => "price",
            Self::PriceDesc => "-price",
            Self::CreatedAsc => "created_at",
            Self::CreatedDesc => "-created_at",
            Self::ViewsAsc => "views",
            Self::ViewsDesc => "-views",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "price" => Some(Self::PriceAsc),
            "-price" => Some(Self::PriceDesc),
            "created_at" => Some(Self::CreatedAsc),
            "-created_at" => Some(Self::CreatedDesc),
            "views" => Some(Self::ViewsAsc),
            "-views" => Some(Self::ViewsDesc),
            _ => None,
        }
    }
}
