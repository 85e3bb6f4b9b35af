use crate::config::{ChartConfig, LabelAlias};
use crate::error::PipelineError;
use crate::types::{CountryRecord, ValueTable};
use anyhow::{Result, anyhow};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::register_font;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

const FONT: &str = "sans-serif";
static FONT_REGULAR: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");
static FONT_BOLD: &[u8] = include_bytes!("../assets/fonts/DejaVuSans-Bold.ttf");

const BAR_COLORS: [RGBColor; 5] = [
    RGBColor(0x1f, 0x77, 0xb4),
    RGBColor(0xff, 0x7f, 0x0e),
    RGBColor(0x2c, 0xa0, 0x2c),
    RGBColor(0xd6, 0x27, 0x28),
    RGBColor(0x94, 0x67, 0xbd),
];

/// `1234567` -> `"1,234,567"`.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// The `n` largest entries, largest first. Equal totals keep table order.
/// Labels listed in `aliases` are renamed afterwards.
pub fn top_n(table: &ValueTable, n: usize, aliases: &[LabelAlias]) -> Vec<CountryRecord> {
    let mut records = table.records().to_vec();
    records.sort_by(|a, b| b.total.cmp(&a.total));
    records.truncate(n);

    for record in &mut records {
        if let Some(alias) = aliases.iter().find(|a| a.from == record.name) {
            record.name = alias.to.clone();
        }
    }
    records
}

/// Registers the bundled DejaVu faces as `FONT`. Both backends measure text
/// through this registry, and the bitmap backend also rasterizes with it.
fn register_fonts() -> Result<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED.get_or_init(|| {
        register_font(FONT, FontStyle::Normal, FONT_REGULAR).is_ok()
            && register_font(FONT, FontStyle::Bold, FONT_BOLD).is_ok()
    });
    if ok {
        Ok(())
    } else {
        Err(anyhow!("Bundled chart font could not be parsed"))
    }
}

/// Draws the horizontal bar chart; `.png` goes through the bitmap backend,
/// anything else is written as SVG.
pub fn render_chart(top: &[CountryRecord], config: &ChartConfig, path: &Path) -> Result<()> {
    if top.is_empty() {
        return Err(PipelineError::EmptyTable.into());
    }
    register_fonts()?;
    let size = (config.width, config.height);
    let is_png = path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));

    if is_png {
        draw_bars(BitMapBackend::new(path, size).into_drawing_area(), top, &config.title)?;
    } else {
        draw_bars(SVGBackend::new(path, size).into_drawing_area(), top, &config.title)?;
    }
    info!("Chart of top {} saved to {:?}", top.len(), path);
    Ok(())
}

fn draw_bars<DB: DrawingBackend>(root: DrawingArea<DB, Shift>, top: &[CountryRecord], title: &str) -> Result<()> {
    let n = top.len();
    let max = top.iter().map(|r| r.total).max().unwrap_or(0) as f64;
    let x_max = (max * 1.15).max(1.0);
    // Row i sits at y = n - 1 - i so the largest bar is on top.
    let row_y = |i: usize| (n - 1 - i) as f64;
    let label_at = |y: f64| -> String {
        let i = n as f64 - 1.0 - y.round();
        if (y - y.round()).abs() > 1e-6 || i < 0.0 || i >= n as f64 {
            return String::new();
        }
        top[i as usize].name.clone()
    };

    root.fill(&WHITE).map_err(|e| anyhow!("Failed to clear chart: {}", e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 32).into_font().style(FontStyle::Bold))
        .margin(24)
        .x_label_area_size(70)
        .y_label_area_size(240)
        .build_cartesian_2d(0f64..x_max, -0.5f64..(n as f64 - 0.5))
        .map_err(|e| anyhow!("Failed to lay out chart: {}", e))?;

    chart.configure_mesh()
        .disable_y_mesh()
        .x_desc("Population")
        .y_desc("Countries")
        .axis_desc_style((FONT, 28).into_font().style(FontStyle::Bold))
        .label_style((FONT, 24))
        .x_label_formatter(&|v: &f64| format_thousands(*v as u64))
        .y_labels(n)
        .y_label_formatter(&|v: &f64| label_at(*v))
        .bold_line_style(BLACK.mix(0.3))
        .light_line_style(TRANSPARENT)
        .draw()
        .map_err(|e| anyhow!("Failed to draw chart axes: {}", e))?;

    chart.draw_series(top.iter().enumerate().map(|(i, r)| {
        let y = row_y(i);
        Rectangle::new([(0.0, y - 0.4), (r.total as f64, y + 0.4)], BAR_COLORS[i % BAR_COLORS.len()].filled())
    }))
    .map_err(|e| anyhow!("Failed to draw bars: {}", e))?;

    let value_style = TextStyle::from((FONT, 24).into_font()).pos(Pos::new(HPos::Left, VPos::Center));
    chart.draw_series(top.iter().enumerate().map(|(i, r)| {
        Text::new(format!(" {}", format_thousands(r.total)), (r.total as f64, row_y(i)), value_style.clone())
    }))
    .map_err(|e| anyhow!("Failed to draw value labels: {}", e))?;

    root.present().map_err(|e| anyhow!("Failed to save chart: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn table(rows: &[(&str, u64)]) -> ValueTable {
        rows.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    fn usa_alias() -> Vec<LabelAlias> {
        ChartConfig::default().label_aliases
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(27679), "27,679");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }

    #[test]
    fn three_country_scenario_orders_descending() {
        let top = top_n(&table(&[("Spain", 100), ("France", 50), ("Italy", 200)]), 5, &usa_alias());
        assert_eq!(
            top,
            vec![
                CountryRecord::new("Italy", 200),
                CountryRecord::new("Spain", 100),
                CountryRecord::new("France", 50),
            ]
        );
    }

    #[test]
    fn selects_exactly_the_five_largest() {
        let t = table(&[
            ("Argentina", 500), ("Andorra", 27679), ("France", 300), ("Germany", 250),
            ("Chile", 10), ("Mexico", 400), ("Cuba", 350), ("Peru", 20),
        ]);
        let totals: Vec<u64> = top_n(&t, 5, &[]).iter().map(|r| r.total).collect();
        assert_eq!(totals, vec![27679, 500, 400, 350, 300]);
    }

    #[test]
    fn ties_keep_table_order() {
        let t = table(&[("B", 5), ("A", 5), ("C", 9)]);
        let names: Vec<String> = top_n(&t, 5, &[]).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
    }

    #[test]
    fn renames_united_states_when_present() {
        let t = table(&[("United States of America", 60000), ("France", 300000)]);
        let top = top_n(&t, 5, &usa_alias());
        assert_eq!(top[1], CountryRecord::new("USA", 60000));

        let t = table(&[("France", 300000)]);
        assert_eq!(top_n(&t, 5, &usa_alias()), vec![CountryRecord::new("France", 300000)]);
    }

    #[test]
    fn writes_svg_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top_5_countries.svg");
        let top = top_n(&table(&[("Spain", 1500), ("United States of America", 200)]), 5, &usa_alias());
        render_chart(&top, &ChartConfig::default(), &path).unwrap();

        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Top 5 Countries with More Spanish People"));
        assert!(svg.contains("USA"));
        assert!(svg.contains("1,500"));
    }

    #[test]
    fn writes_png_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top_5_countries.png");
        let t = table(&[("Argentina", 500), ("France", 300), ("United States of America", 200)]);
        render_chart(&top_n(&t, 5, &usa_alias()), &ChartConfig::default(), &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn svg_and_png_render_back_to_back() {
        let dir = tempfile::tempdir().unwrap();
        let top = top_n(&table(&[("Spain", 1500)]), 5, &[]);
        for name in ["a.png", "b.svg", "c.PNG"] {
            render_chart(&top, &ChartConfig::default(), &dir.path().join(name)).unwrap();
            assert!(dir.path().join(name).exists());
        }
    }

    #[test]
    fn empty_chart_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_chart(&[], &ChartConfig::default(), &dir.path().join("c.svg")).unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::EmptyTable)));
    }
}
