//! Plant catalog and the profile attached to a monitor at the end of pairing

use serde::{Deserialize, Serialize};

/// Location preselected on the plant details form
pub const DEFAULT_LOCATION: &str = "Living Room";

/// Locations offered as quick picks; any other text is accepted too
pub const LOCATION_SUGGESTIONS: [&str; 6] =
    ["Living Room", "Bedroom", "Kitchen", "Office", "Balcony", "Patio"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaterNeeds {
    Low,
    LowToMedium,
    Medium,
}

impl WaterNeeds {
    pub fn label(&self) -> &'static str {
        match self {
            WaterNeeds::Low => "Low",
            WaterNeeds::LowToMedium => "Low to Medium",
            WaterNeeds::Medium => "Medium",
        }
    }
}

impl std::fmt::Display for WaterNeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The species a monitor can be set up for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantType {
    SnakePlant,
    PeaceLily,
    MoneyPlant,
    AloeVera,
    FiddleLeaf,
    SpiderPlant,
    Monstera,
}

impl PlantType {
    pub const ALL: [PlantType; 7] = [
        PlantType::SnakePlant,
        PlantType::PeaceLily,
        PlantType::MoneyPlant,
        PlantType::AloeVera,
        PlantType::FiddleLeaf,
        PlantType::SpiderPlant,
        PlantType::Monstera,
    ];

    /// Catalog id, as sent to the API
    pub fn id(&self) -> &'static str {
        match self {
            PlantType::SnakePlant => "snake_plant",
            PlantType::PeaceLily => "peace_lily",
            PlantType::MoneyPlant => "money_plant",
            PlantType::AloeVera => "aloe_vera",
            PlantType::FiddleLeaf => "fiddle_leaf",
            PlantType::SpiderPlant => "spider_plant",
            PlantType::Monstera => "monstera",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlantType::SnakePlant => "Snake Plant",
            PlantType::PeaceLily => "Peace Lily",
            PlantType::MoneyPlant => "Money Plant",
            PlantType::AloeVera => "Aloe Vera",
            PlantType::FiddleLeaf => "Fiddle Leaf Fig",
            PlantType::SpiderPlant => "Spider Plant",
            PlantType::Monstera => "Monstera",
        }
    }

    pub fn water_needs(&self) -> WaterNeeds {
        match self {
            PlantType::SnakePlant | PlantType::AloeVera => WaterNeeds::Low,
            PlantType::MoneyPlant | PlantType::SpiderPlant => WaterNeeds::LowToMedium,
            PlantType::PeaceLily | PlantType::FiddleLeaf | PlantType::Monstera => {
                WaterNeeds::Medium
            }
        }
    }
}

impl std::fmt::Display for PlantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plant type: {0}")]
pub struct UnknownPlantType(pub String);

impl std::str::FromStr for PlantType {
    type Err = UnknownPlantType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlantType::ALL
            .into_iter()
            .find(|p| p.id() == s)
            .ok_or_else(|| UnknownPlantType(s.to_string()))
    }
}

/// Plant details entered for a freshly provisioned monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantProfile {
    pub display_name: String,
    pub plant_type: PlantType,
    pub location: String,
}

impl PlantProfile {
    pub fn new(
        display_name: impl Into<String>,
        plant_type: PlantType,
        location: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            plant_type,
            location: location.into(),
        }
    }

    pub fn validate(&self) -> Result<(), crate::ValidationError> {
        crate::validation::validate_plant_name(&self.display_name)
    }
}

/// Where finished setups are recorded.
///
/// The HTTP API client implements this against the plants endpoint;
/// [`LocalRegistry`] keeps everything on the handset.
pub trait PlantRegistry {
    type Error: std::error::Error + Send + Sync + 'static;

    fn register_plant(
        &self,
        device_id: &str,
        profile: &PlantProfile,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Registry that records nothing and always succeeds
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalRegistry;

impl PlantRegistry for LocalRegistry {
    type Error = std::convert::Infallible;

    async fn register_plant(
        &self,
        _device_id: &str,
        _profile: &PlantProfile,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_parse_back() {
        for plant in PlantType::ALL {
            assert_eq!(plant.id().parse::<PlantType>().unwrap(), plant);
            assert_eq!(
                serde_json::to_value(plant).unwrap(),
                serde_json::Value::String(plant.id().to_string())
            );
        }
        assert!("cactus".parse::<PlantType>().is_err());
    }

    #[test]
    fn water_needs() {
        assert_eq!(PlantType::AloeVera.water_needs().label(), "Low");
        assert_eq!(PlantType::SpiderPlant.water_needs().label(), "Low to Medium");
        assert_eq!(PlantType::Monstera.water_needs().label(), "Medium");
    }

    #[test]
    fn profile_needs_a_name() {
        assert!(PlantProfile::new("Fern", PlantType::AloeVera, "Office").validate().is_ok());
        assert!(PlantProfile::new("  ", PlantType::AloeVera, "Office").validate().is_err());
    }
}
