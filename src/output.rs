use std::path::Path;

use csv::WriterBuilder;
use serde::Serialize;
use tracing::debug;

use crate::error::{AnalysisError, AnalysisResult};

/// A row type written to one of the output tables.
pub trait CsvRow: Serialize {
    /// Column names, in field order.
    const HEADERS: &'static [&'static str];
}

/// Write `rows` as a headed CSV file. The header is written even when `rows` is empty.
pub fn write_csv<T: CsvRow>(path: &Path, rows: &[T]) -> AnalysisResult<()> {
    let wrap = |source| AnalysisError::WriteCsv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(wrap)?;
    writer.write_record(T::HEADERS).map_err(wrap)?;
    for row in rows {
        writer.serialize(row).map_err(wrap)?;
    }
    writer.flush().map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::CommunityRow;
    use crate::network::DegreeBin;
    use crate::ranking::{NodeCentrality, RankingRow};

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist.csv");
        let rows = vec![
            DegreeBin { degree: 1, count: 4 },
            DegreeBin { degree: 3, count: 1 },
        ];
        write_csv(&path, &rows).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "degree,count\n1,4\n3,1\n"
        );
    }

    #[test]
    fn empty_table_still_has_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_csv::<DegreeBin>(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "degree,count\n");

        let path = dir.path().join("communities.csv");
        write_csv::<CommunityRow>(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "node,community\n");
    }

    #[test]
    fn headers_match_serialized_field_names() {
        fn serialized_header<T: CsvRow>(row: &T) -> String {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.serialize(row).unwrap();
            let bytes = writer.into_inner().unwrap();
            String::from_utf8(bytes).unwrap().lines().next().unwrap().to_string()
        }

        let bin = DegreeBin { degree: 1, count: 1 };
        assert_eq!(serialized_header(&bin), DegreeBin::HEADERS.join(","));

        let row = CommunityRow {
            node: "A".into(),
            community: 0,
        };
        assert_eq!(serialized_header(&row), CommunityRow::HEADERS.join(","));

        let centrality = NodeCentrality {
            node: "A".into(),
            degree_centrality: 0.5,
            closeness_centrality: 0.5,
            betweenness_centrality: 0.0,
        };
        assert_eq!(serialized_header(&centrality), NodeCentrality::HEADERS.join(","));

        let ranking = RankingRow {
            rank: 1,
            degree_node: Some("A".into()),
            degree_centrality: Some(0.5),
            closeness_node: None,
            closeness_centrality: None,
            betweenness_node: None,
            betweenness_centrality: None,
        };
        assert_eq!(serialized_header(&ranking), RankingRow::HEADERS.join(","));
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let rows: Vec<DegreeBin> = Vec::new();
        let err = write_csv(Path::new("/nonexistent/dir/out.csv"), &rows).unwrap_err();
        assert!(matches!(err, AnalysisError::WriteCsv { .. }));
    }
}
