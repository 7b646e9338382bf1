use std::collections::BTreeSet;
use std::fmt;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

/// City/district pair. Locations are written `city-district` (`湘潭-雨湖`) or as
/// a bare area code (`furong`), in which case the district is absent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub district: Option<String>,
}

impl Location {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.split_once('-') {
            Some((city, district)) if !district.is_empty() => Location {
                city: city.to_string(),
                district: Some(district.to_string()),
            },
            Some((city, _)) => Location {
                city: city.to_string(),
                district: None,
            },
            None => Location {
                city: raw.to_string(),
                district: None,
            },
        }
    }

    /// Lookup key used by the price tables and the market index maps.
    pub fn key(&self) -> String {
        match &self.district {
            Some(district) => format!("{}-{}", self.city, district),
            None => self.city.clone(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Scores derived from the GIS layer. Every score is on a 0–100 scale except
/// the cost index (a multiplier) and the land price (currency per m²).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GisScores {
    pub cost_index: Option<f64>,
    pub land_price: Option<f64>,
    pub infrastructure: Option<f64>,
    pub environmental: Option<f64>,
    pub transportation: Option<f64>,
    pub commercial: Option<f64>,
    pub educational: Option<f64>,
    pub medical: Option<f64>,
    pub green_space_ratio: Option<f64>,
}

/// Neighbourhood attributes used by the basic algorithm. Distances are in
/// metres; an absent distance earns no proximity bonus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Amenities {
    pub community_quality: String,
    pub school_district: bool,
    pub transportation: Vec<String>,
    pub subway_distance: Option<f64>,
    pub bus_stop_distance: Option<f64>,
    pub hospital_distance: Option<f64>,
    pub shopping_distance: Option<f64>,
    pub park_distance: Option<f64>,
}

impl Default for Amenities {
    fn default() -> Self {
        Amenities {
            community_quality: "一般".to_string(),
            school_district: false,
            transportation: Vec::new(),
            subway_distance: None,
            bus_stop_distance: None,
            hospital_distance: None,
            shopping_distance: None,
            park_distance: None,
        }
    }
}

/// Everything the pricing algorithms know about one property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInfo {
    pub location: Location,
    pub area: f64,
    pub building_type: String,
    pub property_type: String,
    pub construction_year: i32,
    pub floor: i32,
    pub total_floors: i32,
    pub orientation: String,
    pub decoration_level: String,
    pub lot_ratio: f64,
    pub green_ratio: f64,
    pub nearby_facilities: BTreeSet<String>,
    pub amenities: Amenities,
    pub gis: GisScores,
}

impl PropertyInfo {
    /// Building age in whole years relative to `year`, never negative.
    pub fn age_at(&self, year: i32) -> i32 {
        year.saturating_sub(self.construction_year).max(0)
    }
}

impl From<&ValuationParams> for PropertyInfo {
    fn from(params: &ValuationParams) -> Self {
        PropertyInfo {
            location: Location::parse(&params.location),
            area: params.area,
            building_type: params.building_type.clone(),
            property_type: params.building_type.clone(),
            construction_year: params.construction_year,
            floor: params.floor,
            total_floors: params.total_floors,
            orientation: params.orientation.clone(),
            decoration_level: params.decoration_level.clone(),
            lot_ratio: params.lot_ratio,
            green_ratio: params.green_ratio,
            nearby_facilities: params.nearby_facilities.iter().cloned().collect(),
            amenities: Amenities::default(),
            gis: params.gis.clone(),
        }
    }
}

/// Fully populated valuation input: property fields plus the method name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationParams {
    pub area: f64,
    pub location: String,
    pub building_type: String,
    pub construction_year: i32,
    pub floor: i32,
    pub total_floors: i32,
    pub orientation: String,
    pub decoration_level: String,
    pub lot_ratio: f64,
    pub green_ratio: f64,
    pub nearby_facilities: Vec<String>,
    pub valuation_method: String,
    #[serde(default)]
    pub gis: GisScores,
}

impl ValuationParams {
    pub fn defaults_for_year(current_year: i32) -> Self {
        ValuationParams {
            area: 100.0,
            location: "yuelu".to_string(),
            building_type: "住宅".to_string(),
            construction_year: current_year - 10,
            floor: 5,
            total_floors: 18,
            orientation: "南北".to_string(),
            decoration_level: "中等".to_string(),
            lot_ratio: 2.5,
            green_ratio: 35.0,
            nearby_facilities: vec![
                "地铁".to_string(),
                "学校".to_string(),
                "医院".to_string(),
                "商场".to_string(),
            ],
            valuation_method: "市场比较法".to_string(),
            gis: GisScores::default(),
        }
    }
}

impl Default for ValuationParams {
    fn default() -> Self {
        Self::defaults_for_year(Utc::now().year())
    }
}

/// Caller-supplied parameters. Absent fields take the documented defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRequest {
    pub area: Option<f64>,
    pub location: Option<String>,
    pub building_type: Option<String>,
    pub construction_year: Option<i32>,
    pub floor: Option<i32>,
    pub total_floors: Option<i32>,
    pub orientation: Option<String>,
    pub decoration_level: Option<String>,
    pub lot_ratio: Option<f64>,
    pub green_ratio: Option<f64>,
    pub nearby_facilities: Option<Vec<String>>,
    pub valuation_method: Option<String>,
    pub gis: Option<GisScores>,
}

impl ValuationRequest {
    pub fn merge_over(self, defaults: &ValuationParams) -> ValuationParams {
        ValuationParams {
            area: self.area.unwrap_or(defaults.area),
            location: self.location.unwrap_or_else(|| defaults.location.clone()),
            building_type: self.building_type.unwrap_or_else(|| defaults.building_type.clone()),
            construction_year: self.construction_year.unwrap_or(defaults.construction_year),
            floor: self.floor.unwrap_or(defaults.floor),
            total_floors: self.total_floors.unwrap_or(defaults.total_floors),
            orientation: self.orientation.unwrap_or_else(|| defaults.orientation.clone()),
            decoration_level: self
                .decoration_level
                .unwrap_or_else(|| defaults.decoration_level.clone()),
            lot_ratio: self.lot_ratio.unwrap_or(defaults.lot_ratio),
            green_ratio: self.green_ratio.unwrap_or(defaults.green_ratio),
            nearby_facilities: self
                .nearby_facilities
                .unwrap_or_else(|| defaults.nearby_facilities.clone()),
            valuation_method: self
                .valuation_method
                .unwrap_or_else(|| defaults.valuation_method.clone()),
            gis: self.gis.unwrap_or_else(|| defaults.gis.clone()),
        }
    }
}

impl From<ValuationParams> for ValuationRequest {
    fn from(params: ValuationParams) -> Self {
        ValuationRequest {
            area: Some(params.area),
            location: Some(params.location),
            building_type: Some(params.building_type),
            construction_year: Some(params.construction_year),
            floor: Some(params.floor),
            total_floors: Some(params.total_floors),
            orientation: Some(params.orientation),
            decoration_level: Some(params.decoration_level),
            lot_ratio: Some(params.lot_ratio),
            green_ratio: Some(params.green_ratio),
            nearby_facilities: Some(params.nearby_facilities),
            valuation_method: Some(params.valuation_method),
            gis: Some(params.gis),
        }
    }
}
