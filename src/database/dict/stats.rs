use std::{
    fmt,
    hash::{BuildHasher, Hash},
};

use super::{dict_base::HashTable, Dict};

/// Number of chain-length buckets in the histogram; longer chains are
/// counted in the last one.
pub const DICT_STATS_VECTLEN: usize = 50;

/// Chain statistics of one table generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    /// `0` for the main table, `1` for the rehashing target.
    pub table: usize,
    pub size: usize,
    pub used: usize,
    /// Non-empty buckets.
    pub slots: usize,
    pub max_chain_len: usize,
    pub total_chain_len: usize,
    pub histogram: [usize; DICT_STATS_VECTLEN],
}

/// Statistics of both tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictStats {
    pub main: TableStats,
    pub rehashing: Option<TableStats>,
}

impl TableStats {
    /// Average length of the non-empty chains, measured.
    pub fn avg_chain_len_counted(&self) -> f64 {
        if self.slots == 0 {
            return 0.0;
        }
        self.total_chain_len as f64 / self.slots as f64
    }

    /// Average chain length derived from the element count.
    pub fn avg_chain_len_computed(&self) -> f64 {
        if self.slots == 0 {
            return 0.0;
        }
        self.used as f64 / self.slots as f64
    }

    fn collect<K, V, S>(
        dict: &Dict<K, V, S>,
        table: usize,
    ) -> Self
    where
        K: Hash + Eq,
        S: BuildHasher,
    {
        let ht: &HashTable = &dict.ht[table];
        let mut stats = TableStats {
            table,
            size: ht.size(),
            used: ht.used,
            slots: 0,
            max_chain_len: 0,
            total_chain_len: 0,
            histogram: [0; DICT_STATS_VECTLEN],
        };
        for &head in &ht.buckets {
            let len = dict.chain(head).count();
            let slot = len.min(DICT_STATS_VECTLEN - 1);
            stats.histogram[slot] += 1;
            if len == 0 {
                continue;
            }
            stats.slots += 1;
            stats.max_chain_len = stats.max_chain_len.max(len);
            stats.total_chain_len += len;
        }
        stats
    }
}

impl<K, V, S> Dict<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Bucket and chain statistics for diagnostics.
    pub fn stats(&self) -> DictStats {
        DictStats {
            main: TableStats::collect(self, 0),
            rehashing: self
                .is_rehashing()
                .then(|| TableStats::collect(self, 1)),
        }
    }
}

impl fmt::Display for TableStats {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.used == 0 {
            return writeln!(f, "No stats available for empty dictionaries");
        }
        let title = if self.table == 0 {
            "main hash table"
        } else {
            "rehashing target"
        };
        writeln!(f, "Hash table {} stats ({title}):", self.table)?;
        writeln!(f, " table size: {}", self.size)?;
        writeln!(f, " number of elements: {}", self.used)?;
        writeln!(f, " different slots: {}", self.slots)?;
        writeln!(f, " max chain length: {}", self.max_chain_len)?;
        writeln!(f, " avg chain length (counted): {:.2}", self.avg_chain_len_counted())?;
        writeln!(f, " avg chain length (computed): {:.2}", self.avg_chain_len_computed())?;
        writeln!(f, " Chain length distribution:")?;
        for (len, &count) in self.histogram.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let marker = if len == DICT_STATS_VECTLEN - 1 { ">= " } else { "" };
            writeln!(
                f,
                "   {marker}{len}: {count} ({:.2}%)",
                count as f64 / self.size as f64 * 100.0
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for DictStats {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.main)?;
        if let Some(second) = &self.rehashing {
            write!(f, "{second}")?;
        }
        Ok(())
    }
}
