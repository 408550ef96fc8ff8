//! Articul alias groups.
//!
//! Suppliers publish the same part under different article numbers. The alias
//! table lists `(primary, alternate, brand)` triples; pairs that share a member
//! collapse transitively into one group per brand. Groups never cross brands.
//!
//! [`AliasTableBuilder`] is a union-find arena over interned `(brand, articul)`
//! members. [`AliasTableBuilder::build`] freezes it into an immutable
//! [`AliasTable`] that ingestion consults per row.

use std::collections::HashMap;
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::ConfigError;

/// One raw line of the alias reference file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRow {
    pub primary: String,
    pub alternate: String,
    /// Raw brand field; resolved to a brand id by the caller.
    pub brand: String,
}

/// Read `primary;alternate;brand` rows. Lines starting with `#` are comments.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, a record is not valid
/// CSV, or a row lacks a primary or alternate articul.
pub fn load_alias_rows(path: &Path) -> Result<Vec<AliasRow>, ConfigError> {
    let display = path.display().to_string();
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| ConfigError::ReferenceFileCsv {
            path: display.clone(),
            source: e,
        })?;

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ConfigError::ReferenceFileCsv {
            path: display.clone(),
            source: e,
        })?;
        let primary = record.get(0).unwrap_or_default();
        let alternate = record.get(1).unwrap_or_default();
        if primary.is_empty() || alternate.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{display}: record {} needs both a primary and an alternate articul",
                idx + 1
            )));
        }
        rows.push(AliasRow {
            primary: primary.to_string(),
            alternate: alternate.to_string(),
            brand: record.get(2).unwrap_or_default().to_string(),
        });
    }
    Ok(rows)
}

/// A closed set of articuls that denote the same part for one brand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasGroup {
    pub brand_id: i64,
    /// The primary articul seen earliest in the alias table.
    pub primary: String,
    /// Every other member, sorted.
    pub aliases: Vec<String>,
}

/// Union-find arena. Members are normalized articul keys scoped by brand.
#[derive(Debug, Default)]
pub struct AliasTableBuilder {
    keys: Vec<String>,
    brands: Vec<i64>,
    parent: Vec<usize>,
    size: Vec<usize>,
    /// Per root: `(row, member)` of the earliest primary in the group.
    head: Vec<Option<(usize, usize)>>,
    index: HashMap<i64, HashMap<String, usize>>,
    rows: usize,
}

impl AliasTableBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `alternate` denotes the same part as `primary` for
    /// `brand_id`. Both keys must already be normalized; empty keys are
    /// ignored.
    pub fn add(&mut self, brand_id: i64, primary: &str, alternate: &str) {
        if primary.is_empty() || alternate.is_empty() {
            return;
        }
        let row = self.rows;
        self.rows += 1;

        let p = self.intern(brand_id, primary);
        let root = self.find(p);
        if self.head[root].is_none() {
            self.head[root] = Some((row, p));
        }

        let a = self.intern(brand_id, alternate);
        self.union(p, a);
    }

    /// Number of distinct members across all brands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn build(mut self) -> AliasTable {
        let mut group_of_root: HashMap<usize, usize> = HashMap::new();
        let mut members: Vec<Vec<usize>> = Vec::new();
        let mut member_group = vec![0; self.keys.len()];

        for i in 0..self.keys.len() {
            let root = self.find(i);
            let group = *group_of_root.entry(root).or_insert_with(|| {
                members.push(Vec::new());
                members.len() - 1
            });
            members[group].push(i);
            member_group[i] = group;
        }

        let mut roots = vec![0; members.len()];
        for (&root, &group) in &group_of_root {
            roots[group] = root;
        }

        let groups = members
            .iter()
            .zip(&roots)
            .map(|(list, &root)| {
                let primary = self.head[root].map_or(root, |(_, member)| member);
                let mut aliases: Vec<String> = list
                    .iter()
                    .filter(|&&m| m != primary)
                    .map(|&m| self.keys[m].clone())
                    .collect();
                aliases.sort();
                AliasGroup {
                    brand_id: self.brands[primary],
                    primary: self.keys[primary].clone(),
                    aliases,
                }
            })
            .collect();

        let mut index: HashMap<i64, HashMap<String, usize>> = HashMap::new();
        for (brand_id, by_key) in self.index {
            let entry = index.entry(brand_id).or_default();
            for (key, member) in by_key {
                entry.insert(key, member_group[member]);
            }
        }

        AliasTable { groups, index }
    }

    fn intern(&mut self, brand_id: i64, key: &str) -> usize {
        let by_key = self.index.entry(brand_id).or_default();
        if let Some(&i) = by_key.get(key) {
            return i;
        }
        let i = self.keys.len();
        by_key.insert(key.to_string(), i);
        self.keys.push(key.to_string());
        self.brands.push(brand_id);
        self.parent.push(i);
        self.size.push(1);
        self.head.push(None);
        i
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        let (root, child) = if self.size[ra] >= self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[child] = root;
        self.size[root] += self.size[child];
        self.head[root] = match (self.head[root], self.head[child]) {
            (Some(x), Some(y)) => Some(if y.0 < x.0 { y } else { x }),
            (x, y) => x.or(y),
        };
    }
}

/// Immutable lookup from `(brand, articul)` to its alias group.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    groups: Vec<AliasGroup>,
    index: HashMap<i64, HashMap<String, usize>>,
}

impl AliasTable {
    /// An empty table: every articul is its own primary.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn group(&self, brand_id: i64, articul: &str) -> Option<&AliasGroup> {
        self.index
            .get(&brand_id)
            .and_then(|by_key| by_key.get(articul))
            .map(|&g| &self.groups[g])
    }

    /// Map a normalized articul to the primary it is stored under plus the
    /// rest of its group. Articuls outside any group map to themselves with
    /// no aliases.
    #[must_use]
    pub fn canonicalize(&self, brand_id: i64, articul: &str) -> (String, Vec<String>) {
        match self.group(brand_id, articul) {
            Some(group) => (group.primary.clone(), group.aliases.clone()),
            None => (articul.to_string(), Vec::new()),
        }
    }

    #[must_use]
    pub fn groups(&self) -> &[AliasGroup] {
        &self.groups
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
