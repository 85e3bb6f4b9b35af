use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryRecord {
    pub name: String,
    pub total: u64,
}

impl CountryRecord {
    pub fn new(name: impl Into<String>, total: u64) -> Self {
        Self { name: name.into(), total }
    }
}

/// One source name resolved to a boundary-dataset name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedName {
    pub source: String,
    pub english: String,
    pub canonical: String,
    pub score: u8,
}

/// Source name -> canonical name, in input order.
#[derive(Debug, Clone, Default)]
pub struct NameMapping {
    entries: Vec<MatchedName>,
    index: HashMap<String, usize>,
}

impl NameMapping {
    pub fn push(&mut self, matched: MatchedName) {
        match self.index.get(&matched.source) {
            Some(&i) => self.entries[i] = matched,
            None => {
                self.index.insert(matched.source.clone(), self.entries.len());
                self.entries.push(matched);
            }
        }
    }

    pub fn canonical(&self, source: &str) -> Option<&str> {
        self.index.get(source).map(|&i| self.entries[i].canonical.as_str())
    }

    pub fn entries(&self) -> &[MatchedName] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Insertion-ordered name -> total table.
///
/// Re-inserting a name overwrites its total but keeps its original position,
/// so ties in later sorts resolve by first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueTable {
    records: Vec<CountryRecord>,
    index: HashMap<String, usize>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, total: u64) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&i) => self.records[i].total = total,
            None => {
                self.index.insert(name.clone(), self.records.len());
                self.records.push(CountryRecord::new(name, total));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.index.get(name).map(|&i| self.records[i].total)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn records(&self) -> &[CountryRecord] {
        &self.records
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name.as_str())
    }

    pub fn values(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.total).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(String, u64)> for ValueTable {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut table = ValueTable::new();
        for (name, total) in iter {
            table.insert(name, total);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reinsert_overwrites_in_place() {
        let mut table = ValueTable::new();
        table.insert("France", 50);
        table.insert("Italy", 200);
        table.insert("France", 70);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("France"), Some(70));
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["France", "Italy"]);
    }

    #[test]
    fn collects_from_pairs() {
        let table: ValueTable = vec![("A".to_string(), 3), ("B".to_string(), 9), ("A".to_string(), 4)].into_iter().collect();
        assert_eq!(table.values(), vec![4, 9]);
        assert!(!table.is_empty());
        assert!(ValueTable::new().is_empty());
    }

    #[test]
    fn mapping_lookup_by_source_name() {
        let mut mapping = NameMapping::default();
        mapping.push(MatchedName {
            source: "Alemania".to_string(),
            english: "Germany".to_string(),
            canonical: "Germany".to_string(),
            score: 100,
        });
        assert_eq!(mapping.canonical("Alemania"), Some("Germany"));
        assert_eq!(mapping.canonical("Francia"), None);
        assert_eq!(mapping.len(), 1);
    }
}
