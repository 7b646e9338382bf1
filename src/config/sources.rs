use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    /// Higher wins when sources disagree.
    pub priority: i32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub kind: SourceKind,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceKind {
    Static {
        preset: String,
    },
    Http {
        url: String,
        #[serde(default)]
        api_key: Option<String>,
    },
}

fn enabled_by_default() -> bool {
    true
}

impl SourceConfig {
    /// GIS survey first, then the commercial feed (off until a key is
    /// configured), then the built-in fallback.
    pub fn defaults() -> Vec<SourceConfig> {
        vec![
            SourceConfig {
                id: "gis-data-source".to_string(),
                name: "GIS造价查询数据源".to_string(),
                priority: 3,
                enabled: true,
                kind: SourceKind::Static {
                    preset: "gis".to_string(),
                },
            },
            SourceConfig {
                id: "real-estate-api".to_string(),
                name: "真实房产API数据源".to_string(),
                priority: 2,
                enabled: false,
                kind: SourceKind::Http {
                    url: "https://api.example.com/real-estate/market-data".to_string(),
                    api_key: None,
                },
            },
            SourceConfig {
                id: "default".to_string(),
                name: "默认数据源".to_string(),
                priority: 1,
                enabled: true,
                kind: SourceKind::Static {
                    preset: "default".to_string(),
                },
            },
        ]
    }
}
