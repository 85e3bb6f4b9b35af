use crate::boundaries::{load_boundaries, Boundaries};
use crate::chart::{render_chart, top_n};
use crate::config::AppConfig;
use crate::data::load_data;
use crate::matching::create_mapping;
use crate::processing::build_value_table;
use crate::render::render_map;
use crate::scale::ColorScale;
use crate::translate::{translate_all, Translator};
use crate::types::{CountryRecord, NameMapping, ValueTable};
use anyhow::Result;
use tracing::debug;

pub struct Matched {
    pub source: ValueTable,
    pub mapping: NameMapping,
    pub boundaries: Boundaries,
}

pub struct Summary {
    pub table: ValueTable,
    pub drawn: usize,
    pub top: Vec<CountryRecord>,
}

/// Load, translate and match, without rendering.
pub async fn match_names(config: &AppConfig, translator: &dyn Translator) -> Result<Matched> {
    let source = load_data(&config.input)?;
    let spanish: Vec<String> = source.names().map(str::to_string).collect();
    let english = translate_all(translator, &spanish).await?;

    let boundaries = load_boundaries(&config.boundaries).await?;
    let mapping = create_mapping(&spanish, &english, &boundaries.names(), config.matching.warn_below)?;

    Ok(Matched { source, mapping, boundaries })
}

/// The whole run: matched table, map page and top-N chart.
pub async fn generate(config: &AppConfig, translator: &dyn Translator) -> Result<Summary> {
    let Matched { source, mapping, boundaries } = match_names(config, translator).await?;
    let table = build_value_table(&source, &mapping, &config.overrides());

    let scale = ColorScale::new(&table.values(), config.scale.mode)?;
    debug!("Percentiles: {:?}", scale.percentiles);
    debug!("Color stops: {:?}", scale.stops());
    let drawn = render_map(&boundaries, &table, &scale, &config.output.caption, &config.output.map_html)?;

    let top = top_n(&table, config.chart.top_n, &config.chart.label_aliases);
    render_chart(&top, &config.chart, &config.output.chart)?;

    Ok(Summary { table, drawn, top })
}
