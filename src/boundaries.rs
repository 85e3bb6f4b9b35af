use crate::config::BoundaryConfig;
use crate::types::ValueTable;
use anyhow::{Context, Result, anyhow};
use geo::{BoundingRect, Coord, Rect};
use geojson::{Feature, GeoJson};
use std::fs;
use tracing::info;

/// Country features of the boundary dataset, in document order.
pub struct Boundaries {
    pub features: Vec<Feature>,
    pub name_property: String,
}

pub async fn load_boundaries(config: &BoundaryConfig) -> Result<Boundaries> {
    let body = if config.source.starts_with("http://") || config.source.starts_with("https://") {
        info!("Fetching boundaries from {}", config.source);
        let response = reqwest::get(&config.source).await
            .with_context(|| format!("Failed to fetch boundaries from {}", config.source))?
            .error_for_status()
            .with_context(|| format!("Boundary source {} returned an error", config.source))?;
        response.text().await.context("Failed to read boundary response body")?
    } else {
        info!("Loading boundaries from {}", config.source);
        fs::read_to_string(&config.source)
            .with_context(|| format!("Failed to read boundary file: {}", config.source))?
    };

    let boundaries = parse_boundaries(&body, &config.name_property)?;
    info!("Loaded {} boundary features", boundaries.features.len());
    Ok(boundaries)
}

pub fn parse_boundaries(body: &str, name_property: &str) -> Result<Boundaries> {
    let geojson: GeoJson = body.parse().context("Failed to parse boundary GeoJSON")?;
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("Boundary GeoJSON must be a FeatureCollection")),
    };
    Ok(Boundaries {
        features: collection.features,
        name_property: name_property.to_string(),
    })
}

pub fn feature_name<'a>(feature: &'a Feature, name_property: &str) -> Option<&'a str> {
    feature.properties.as_ref()?.get(name_property)?.as_str()
}

impl Boundaries {
    /// Canonical names, one per named feature.
    pub fn names(&self) -> Vec<String> {
        self.features.iter()
            .filter_map(|f| feature_name(f, &self.name_property))
            .map(str::to_string)
            .collect()
    }

    /// Features whose name has a value in the table, with that value.
    pub fn matched<'a>(&'a self, table: &ValueTable) -> Vec<(&'a Feature, &'a str, u64)> {
        self.features.iter()
            .filter_map(|f| {
                let name = feature_name(f, &self.name_property)?;
                table.get(name).map(|total| (f, name, total))
            })
            .collect()
    }
}

/// Bounding box covering every feature geometry, if any converts.
pub fn bounds<'a>(features: impl IntoIterator<Item = &'a Feature>) -> Option<Rect<f64>> {
    features.into_iter()
        .filter_map(|f| f.geometry.as_ref())
        .filter_map(|g| geo::Geometry::<f64>::try_from(g.value.clone()).ok())
        .filter_map(|g| g.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )
        })
}
