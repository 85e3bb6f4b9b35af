use crate::config::OverrideEntry;
use crate::types::{NameMapping, ValueTable};
use tracing::{info, warn};

/// Re-keys the source totals by canonical name, then applies the overrides.
///
/// Later writes win: two source names matched to the same country keep the
/// later total, and an override replaces whatever matching produced.
pub fn build_value_table(
    source: &ValueTable,
    mapping: &NameMapping,
    overrides: &[OverrideEntry],
) -> ValueTable {
    let mut table = ValueTable::new();

    for record in source.records() {
        match mapping.canonical(&record.name) {
            Some(canonical) => {
                if table.contains(canonical) {
                    warn!("{:?} also matched {:?}, keeping the later total {}", record.name, canonical, record.total);
                }
                table.insert(canonical, record.total);
            }
            None => warn!("No canonical name for {:?}, dropping it", record.name),
        }
    }

    for entry in overrides {
        table.insert(entry.name.clone(), entry.total);
    }

    info!("Value table holds {} countries ({} overrides)", table.len(), overrides.len());
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_overrides;
    use crate::types::MatchedName;

    fn mapping(pairs: &[(&str, &str)]) -> NameMapping {
        let mut mapping = NameMapping::default();
        for (source, canonical) in pairs {
            mapping.push(MatchedName {
                source: source.to_string(),
                english: canonical.to_string(),
                canonical: canonical.to_string(),
                score: 100,
            });
        }
        mapping
    }

    fn source(rows: &[(&str, u64)]) -> ValueTable {
        rows.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    #[test]
    fn rekeys_by_canonical_name_in_source_order() {
        let table = build_value_table(
            &source(&[("España", 100), ("Francia", 50), ("Italia", 200)]),
            &mapping(&[("España", "Spain"), ("Francia", "France"), ("Italia", "Italy")]),
            &[],
        );
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["Spain", "France", "Italy"]);
        assert_eq!(table.get("Italy"), Some(200));
    }

    #[test]
    fn collisions_keep_the_later_total() {
        let table = build_value_table(
            &source(&[("Congo", 40), ("Perú", 9), ("República del Congo", 11)]),
            &mapping(&[("Congo", "Republic of the Congo"), ("Perú", "Peru"), ("República del Congo", "Republic of the Congo")]),
            &[],
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("Republic of the Congo"), Some(11));
        assert_eq!(table.names().next(), Some("Republic of the Congo"));
    }

    #[test]
    fn overrides_appear_verbatim() {
        let overrides = default_overrides();
        let table = build_value_table(
            &source(&[("Andorra", 5), ("Eslovaquia", 1)]),
            &mapping(&[("Andorra", "Andorra"), ("Eslovaquia", "Slovenia")]),
            &overrides,
        );
        for entry in &overrides {
            assert_eq!(table.get(&entry.name), Some(entry.total), "{}", entry.name);
        }
        assert_eq!(table.get("Slovenia"), Some(1));
    }

    #[test]
    fn unmapped_sources_are_dropped() {
        let table = build_value_table(&source(&[("Narnia", 3)]), &NameMapping::default(), &[]);
        assert!(table.is_empty());
    }
}
