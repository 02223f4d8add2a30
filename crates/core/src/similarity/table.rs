//! Persisted form of a similarity index.
//!
//! The TSV layout is one header row `threshold<TAB>total_occurrences`
//! followed by one row per token: `value<TAB>count[<TAB>neighbor]...`.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

use super::index::validate_threshold;

/// One dictionary entry with the names of its linked tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub value: String,
    pub count: u64,
    #[serde(default)]
    pub neighbors: Vec<String>,
}

/// Saved similarity index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexTable {
    pub threshold: f64,
    pub total_occurrences: u64,
    pub rows: Vec<TableRow>,
}

impl IndexTable {
    /// Writes the table as tab-separated values.
    pub fn write_tsv<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "{}\t{}", self.threshold, self.total_occurrences)?;
        for row in &self.rows {
            if row.value.contains(['\t', '\n', '\r']) {
                return Err(ScanError::CorruptIndex(format!(
                    "token {:?} cannot be stored in a TSV row",
                    row.value
                )));
            }
            write!(out, "{}\t{}", row.value, row.count)?;
            for n in &row.neighbors {
                write!(out, "\t{n}")?;
            }
            writeln!(out)?;
        }
        out.flush()?;
        Ok(())
    }

    /// Reads a table written by [`write_tsv`](Self::write_tsv).
    ///
    /// Accepts `\r\n` line endings and skips blank lines. Structural
    /// problems are reported as `CorruptIndex` with the offending line
    /// number; neighbor names are resolved later by
    /// `SimilarityIndex::load`.
    pub fn read_tsv<R: BufRead>(input: R) -> Result<Self> {
        let mut lines = input
            .lines()
            .enumerate()
            .map(|(i, line)| line.map(|l| (i + 1, l.trim_end_matches('\r').to_owned())))
            .filter(|r| !matches!(r, Ok((_, l)) if l.is_empty()));

        let (lineno, header) = lines
            .next()
            .transpose()?
            .ok_or_else(|| ScanError::CorruptIndex("missing header row".into()))?;
        let mut fields = header.split('\t');
        let threshold = parse_field::<f64>(fields.next(), lineno, "threshold")?;
        if validate_threshold(threshold).is_err() {
            return Err(ScanError::CorruptIndex(format!(
                "line {lineno}: threshold {threshold} is not within [0, 100]"
            )));
        }
        let total_occurrences = parse_field::<u64>(fields.next(), lineno, "total occurrences")?;

        let mut rows = Vec::new();
        for line in lines {
            let (lineno, line) = line?;
            let mut fields = line.split('\t');
            let value = fields
                .next()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ScanError::CorruptIndex(format!("line {lineno}: missing token")))?
                .to_owned();
            let count = parse_field::<u64>(fields.next(), lineno, "count")?;
            let neighbors = fields.filter(|n| !n.is_empty()).map(str::to_owned).collect();
            rows.push(TableRow {
                value,
                count,
                neighbors,
            });
        }

        let counted: u64 = rows.iter().map(|r| r.count).sum();
        if counted != total_occurrences {
            tracing::warn!(
                header = total_occurrences,
                counted,
                "token counts do not add up to the recorded total"
            );
        }

        Ok(Self {
            threshold,
            total_occurrences,
            rows,
        })
    }
}

fn parse_field<T: std::str::FromStr>(field: Option<&str>, lineno: usize, what: &str) -> Result<T> {
    field
        .and_then(|f| f.trim().parse().ok())
        .ok_or_else(|| ScanError::CorruptIndex(format!("line {lineno}: invalid {what}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IndexTable {
        IndexTable {
            threshold: 80.0,
            total_occurrences: 51,
            rows: vec![
                TableRow {
                    value: "providence".into(),
                    count: 50,
                    neighbors: vec!["provdence".into()],
                },
                TableRow {
                    value: "provdence".into(),
                    count: 1,
                    neighbors: vec!["providence".into()],
                },
            ],
        }
    }

    #[test]
    fn writes_header_then_rows() {
        let mut buf = Vec::new();
        sample().write_tsv(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "80\t51\nprovidence\t50\tprovdence\nprovdence\t1\tprovidence\n"
        );
    }

    #[test]
    fn reads_crlf_files() {
        let text = "80\t51\r\nprovidence\t50\tprovdence\r\n\r\nprovdence\t1\tprovidence\r\n";
        assert_eq!(IndexTable::read_tsv(text.as_bytes()).unwrap(), sample());
    }

    #[test]
    fn rejects_missing_count() {
        let err = IndexTable::read_tsv("50\t1\nlonely\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ScanError::CorruptIndex(msg) if msg.contains("line 2")));
    }

    #[test]
    fn rejects_missing_header() {
        assert!(matches!(
            IndexTable::read_tsv("".as_bytes()),
            Err(ScanError::CorruptIndex(_))
        ));
        assert!(matches!(
            IndexTable::read_tsv("fifty\t1\n".as_bytes()),
            Err(ScanError::CorruptIndex(_))
        ));
    }

    #[test]
    fn rejects_threshold_outside_score_range() {
        for header in ["NaN\t0\n", "inf\t0\n", "-5\t0\n", "101\t0\n"] {
            let err = IndexTable::read_tsv(header.as_bytes()).unwrap_err();
            assert!(
                matches!(&err, ScanError::CorruptIndex(msg) if msg.contains("line 1")),
                "{header:?}: {err}"
            );
        }
        assert!(IndexTable::read_tsv("100\t0\n".as_bytes()).is_ok());
    }
}
