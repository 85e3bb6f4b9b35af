use crate::boundaries::{bounds, Boundaries};
use crate::chart::format_thousands;
use crate::scale::ColorScale;
use crate::types::ValueTable;
use anyhow::{Context, Result};
use geojson::Feature;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

const BORDER_COLOR: &str = "black";
const BORDER_WEIGHT: f64 = 0.5;
const FILL_OPACITY: f64 = 0.5;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OverlayStyle {
    color: &'static str,
    weight: f64,
    fill_opacity: f64,
    fill_color: String,
}

#[derive(Serialize)]
struct Overlay<'a> {
    name: &'a str,
    label: String,
    feature: &'a Feature,
    style: OverlayStyle,
}

/// Writes the choropleth page and returns how many countries it draws.
pub fn render_map(
    boundaries: &Boundaries,
    table: &ValueTable,
    scale: &ColorScale,
    caption: &str,
    path: &Path,
) -> Result<usize> {
    let matched = boundaries.matched(table);
    info!("Drawing {} of {} boundary features", matched.len(), boundaries.features.len());

    let html = map_document(&matched, scale, caption)?;
    fs::write(path, html).with_context(|| format!("Failed to write map to {:?}", path))?;
    info!("Map saved to {:?}", path);
    Ok(matched.len())
}

pub fn map_document(matched: &[(&Feature, &str, u64)], scale: &ColorScale, caption: &str) -> Result<String> {
    let overlays: Vec<Overlay> = matched.iter()
        .map(|&(feature, name, total)| Overlay {
            name,
            label: format!("{}: {}", name, format_thousands(total)),
            feature,
            style: OverlayStyle {
                color: BORDER_COLOR,
                weight: BORDER_WEIGHT,
                fill_opacity: FILL_OPACITY,
                fill_color: scale.hex(total as f64),
            },
        })
        .collect();

    let fit = bounds(matched.iter().map(|&(f, _, _)| f))
        .map(|r| [[r.min().y, r.min().x], [r.max().y, r.max().x]]);

    let overlays_json = script_safe(serde_json::to_string(&overlays).context("Failed to serialize overlays")?);
    let bounds_json = serde_json::to_string(&fit).context("Failed to serialize bounds")?;

    let gradient = scale.colors().iter().map(|c| c.to_hex()).collect::<Vec<_>>().join(", ");

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{caption}</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
  html, body, #map {{ height: 100%; margin: 0; }}
  .legend {{ background: white; padding: 6px 10px; font: 12px sans-serif; }}
  .legend .bar {{ width: 300px; height: 10px; background: linear-gradient(to right, {gradient}); }}
  .legend .ends {{ display: flex; justify-content: space-between; }}
</style>
</head>
<body>
<div id="map"></div>
<script>
  var map = L.map("map").setView([0, 0], 2);
  L.tileLayer("https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
    attribution: "&copy; OpenStreetMap contributors"
  }}).addTo(map);

  var overlays = {overlays_json};
  overlays.forEach(function (o) {{
    L.geoJSON(o.feature, {{ style: o.style }}).bindTooltip(o.label).addTo(map);
  }});

  var bounds = {bounds_json};
  if (bounds) {{ map.fitBounds(bounds); }}

  var legend = L.control({{ position: "topright" }});
  legend.onAdd = function () {{
    var div = L.DomUtil.create("div", "legend");
    div.innerHTML = '<div class="bar"></div>'
      + '<div class="ends"><span>{min}</span><span>{max}</span></div>'
      + '<div>{caption}</div>';
    return div;
  }};
  legend.addTo(map);
</script>
</body>
</html>
"#,
        caption = escape_html(caption),
        gradient = gradient,
        overlays_json = overlays_json,
        bounds_json = bounds_json,
        min = format_thousands(scale.min as u64),
        max = format_thousands(scale.max as u64),
    ))
}

/// Keeps embedded JSON from closing the surrounding script element.
fn script_safe(json: String) -> String {
    json.replace("</", "<\\/")
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundaries::parse_boundaries;
    use crate::boundaries::tests::collection;
    use crate::config::ScaleMode;

    fn setup() -> (Boundaries, ValueTable) {
        let boundaries = parse_boundaries(&collection(&["Spain", "France", "Italy", "Chile"]), "name").unwrap();
        let table: ValueTable = vec![
            ("Italy".to_string(), 200),
            ("Spain".to_string(), 100),
            ("France".to_string(), 50),
        ]
        .into_iter()
        .collect();
        (boundaries, table)
    }

    #[test]
    fn one_overlay_per_matched_feature() {
        let (boundaries, table) = setup();
        let scale = ColorScale::new(&table.values(), ScaleMode::Percentile).unwrap();
        let html = map_document(&boundaries.matched(&table), &scale, "Spanish population residing abroad").unwrap();

        assert_eq!(html.matches("\"fillColor\"").count(), 3);
        assert!(html.contains("\"fillOpacity\":0.5"));
        assert!(html.contains("\"color\":\"black\""));
        assert!(html.contains("Italy: 200"));
        assert!(!html.contains("\"Chile\""));
        assert!(html.contains("Spanish population residing abroad"));
    }

    #[test]
    fn extremes_use_palette_ends() {
        let (boundaries, table) = setup();
        let scale = ColorScale::new(&table.values(), ScaleMode::Percentile).unwrap();
        let html = map_document(&boundaries.matched(&table), &scale, "caption").unwrap();
        assert!(html.contains("\"fillColor\":\"#ff0000\""));
        assert!(html.contains("\"fillColor\":\"#ffffcc\""));
    }

    #[test]
    fn fits_bounds_of_drawn_features_only() {
        let (boundaries, table) = setup();
        let scale = ColorScale::new(&table.values(), ScaleMode::Linear).unwrap();
        let html = map_document(&boundaries.matched(&table), &scale, "caption").unwrap();
        // Spain at (0,0), Italy at (4,2); Chile at (6,3) is not drawn.
        assert!(html.contains("var bounds = [[0.0,0.0],[3.0,5.0]];"));
    }

    #[test]
    fn writes_map_file() {
        let (boundaries, table) = setup();
        let scale = ColorScale::new(&table.values(), ScaleMode::Percentile).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world_2024.html");
        let drawn = render_map(&boundaries, &table, &scale, "caption", &path).unwrap();
        assert_eq!(drawn, 3);
        assert!(fs::read_to_string(&path).unwrap().starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn caption_is_escaped() {
        assert_eq!(escape_html("<b>\"x\" & y</b>"), "&lt;b&gt;&quot;x&quot; &amp; y&lt;/b&gt;");
        assert_eq!(script_safe("\"</script>\"".to_string()), "\"<\\/script>\"");
    }
}
