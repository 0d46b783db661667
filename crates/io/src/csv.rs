// Delimited-text loading for record collections and gold standards

use std::io::Read;
use std::path::Path;

use log::{debug, warn};
use metablock_engine::{EntityCollection, GoldStandard};

use crate::error::IoError;

/// A loaded collection plus the resolved indices of its attribute columns.
#[derive(Debug, Clone)]
pub struct LoadedCollection {
    pub collection: EntityCollection,
    pub attributes: Vec<usize>,
}

/// Load a record collection.
///
/// `columns` names the attribute columns used for blocking. When empty,
/// every column except the primary key is used.
pub fn load_collection(
    path: &Path,
    primary_key: &str,
    columns: &[String],
) -> Result<LoadedCollection, IoError> {
    let content = read_file_as_utf8(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let collection = parse_collection(&name, &content, sniff_delimiter(&content), primary_key)?;
    let attributes = resolve_columns(&collection, columns)?;
    debug!(
        "loaded {}: {} records, {} columns, attributes {:?}",
        collection.name,
        collection.len(),
        collection.headers.len(),
        attributes,
    );
    Ok(LoadedCollection { collection, attributes })
}

/// Load gold-standard pairs; `left` and `right` name the key columns.
pub fn load_gold_standard(path: &Path, left: &str, right: &str) -> Result<GoldStandard, IoError> {
    let content = read_file_as_utf8(path)?;
    let gold = parse_gold_standard(&path.display().to_string(), &content, sniff_delimiter(&content), left, right)?;
    debug!("loaded {} gold pairs from {}", gold.len(), path.display());
    Ok(gold)
}

/// Parse a collection from text. The first record is the header row; short
/// rows are padded with empty fields and long rows truncated.
pub fn parse_collection(
    name: &str,
    content: &str,
    delimiter: u8,
    primary_key: &str,
) -> Result<EntityCollection, IoError> {
    let (headers, mut rows) = read_records(name, content, delimiter)?;
    let pk = position(&headers, name, primary_key)?;

    let width = headers.len();
    let mut ragged = 0usize;
    for row in &mut rows {
        if row.len() != width {
            ragged += 1;
            row.resize(width, String::new());
        }
    }
    if ragged > 0 {
        warn!("{name}: {ragged} rows did not have {width} fields");
    }

    Ok(EntityCollection {
        name: name.to_string(),
        headers,
        rows,
        primary_key: pk,
    })
}

/// Parse gold-standard pairs from text. Rows with an empty key are skipped.
pub fn parse_gold_standard(
    name: &str,
    content: &str,
    delimiter: u8,
    left: &str,
    right: &str,
) -> Result<GoldStandard, IoError> {
    let (headers, rows) = read_records(name, content, delimiter)?;
    let l = position(&headers, name, left)?;
    let r = position(&headers, name, right)?;

    let mut pairs = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;
    for row in rows {
        match (row.get(l), row.get(r)) {
            (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => {
                pairs.push((a.clone(), b.clone()));
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("{name}: skipped {skipped} gold rows with a missing key");
    }
    Ok(GoldStandard { pairs })
}

fn read_records(
    name: &str,
    content: &str,
    delimiter: u8,
) -> Result<(Vec<String>, Vec<Vec<String>>), IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(result) => {
            let record = result.map_err(|e| IoError::Csv(e.to_string()))?;
            // Strip a UTF-8 BOM left on the first header by some exporters.
            record
                .iter()
                .enumerate()
                .map(|(i, h)| if i == 0 { h.trim_start_matches('\u{feff}').to_string() } else { h.to_string() })
                .collect()
        }
        None => return Err(IoError::Empty { file: name.to_string() }),
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(|e| IoError::Csv(e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

fn position(headers: &[String], file: &str, column: &str) -> Result<usize, IoError> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| IoError::MissingColumn {
            file: file.to_string(),
            column: column.to_string(),
        })
}

fn resolve_columns(collection: &EntityCollection, columns: &[String]) -> Result<Vec<usize>, IoError> {
    if columns.is_empty() {
        return Ok((0..collection.headers.len())
            .filter(|&i| i != collection.primary_key)
            .collect());
    }
    columns
        .iter()
        .map(|c| position(&collection.headers, &collection.name, c))
        .collect()
}

/// Candidate field delimiters, in tie-break order.
const DELIMITERS: [u8; 4] = [b'\t', b';', b',', b'|'];

/// Lines of the file inspected by [`sniff_delimiter`].
const SNIFF_LINES: usize = 10;

/// Guess the field delimiter from the first lines of `content`.
///
/// Each candidate splits the sample into records; its score is the number of
/// records with as many fields as the header, times that field count. A
/// candidate that leaves the header in one field is ruled out. Earlier
/// candidates win ties; `,` is the fallback.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample = content.lines().take(SNIFF_LINES).collect::<Vec<_>>().join("\n");
    let mut best: Option<(usize, u8)> = None;
    for delimiter in DELIMITERS {
        if let Some(score) = delimiter_score(&sample, delimiter) {
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, delimiter));
            }
        }
    }
    best.map_or(b',', |(_, delimiter)| delimiter)
}

fn delimiter_score(sample: &str, delimiter: u8) -> Option<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(sample.as_bytes());
    let widths: Vec<usize> = reader
        .records()
        .map(|record| record.map_or(1, |r| r.len()))
        .collect();
    let header = *widths.first()?;
    if header <= 1 {
        return None;
    }
    Some(widths.iter().filter(|&&w| w == header).count() * header)
}

/// Read a file as text, falling back to Windows-1252 when it is not UTF-8.
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let read_err = |e: std::io::Error| IoError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let mut file = std::fs::File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            debug!("{} is not UTF-8, decoding as Windows-1252", path.display());
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "id;title;price\na1;ipod nano;149\na2;zune;99\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "id,title,price\na1,ipod nano,149\na2,zune,99\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "id\ttitle\tprice\na1\tipod nano\t149\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "id;title;manufacturer\na1;\"ipod, nano\";apple\na2;\"zune\";\"microsoft, inc\"\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_falls_back_to_comma() {
        assert_eq!(sniff_delimiter(""), b',');
        assert_eq!(sniff_delimiter("title\nipod\n"), b',');
    }

    #[test]
    fn test_sniff_prefers_consistent_field_counts() {
        // Commas give 3 fields on the header but not below; tabs agree throughout.
        let content = "id\ttitle, maker, year\na1\tipod\na2\tzune\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_parse_collection_pads_short_rows() {
        let c = parse_collection("amazon", "id,title,price\na1,ipod nano\na2,zune,99,extra\n", b',', "id")
            .unwrap();
        assert_eq!(c.headers, vec!["id", "title", "price"]);
        assert_eq!(c.rows[0], vec!["a1", "ipod nano", ""]);
        assert_eq!(c.rows[1], vec!["a2", "zune", "99"]);
        assert_eq!(c.primary_key, 0);
    }

    #[test]
    fn test_parse_collection_missing_key() {
        let err = parse_collection("amazon", "title\nipod\n", b',', "id").unwrap_err();
        assert_eq!(
            err,
            IoError::MissingColumn { file: "amazon".into(), column: "id".into() }
        );
    }

    #[test]
    fn test_parse_empty_input() {
        let err = parse_collection("amazon", "", b',', "id").unwrap_err();
        assert!(matches!(err, IoError::Empty { .. }));
    }

    #[test]
    fn test_header_bom_is_stripped() {
        let c = parse_collection("amazon", "\u{feff}id,title\na1,ipod\n", b',', "id").unwrap();
        assert_eq!(c.headers[0], "id");
    }

    #[test]
    fn test_parse_gold_standard() {
        let content = "idGoogle,idAmazon\ng1,a1\n,a2\ng3,a3\n";
        let gold = parse_gold_standard("gold", content, b',', "idAmazon", "idGoogle").unwrap();
        assert_eq!(
            gold.pairs,
            vec![("a1".to_string(), "g1".to_string()), ("a3".to_string(), "g3".to_string())]
        );
    }

    #[test]
    fn test_load_collection_resolves_attributes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("amazon.csv");
        fs::write(&path, "title;id;price\nipod nano;a1;149\n").unwrap();

        let all = load_collection(&path, "id", &[]).unwrap();
        assert_eq!(all.collection.name, "amazon");
        assert_eq!(all.collection.primary_key, 1);
        assert_eq!(all.attributes, vec![0, 2]);

        let picked = load_collection(&path, "id", &["price".to_string()]).unwrap();
        assert_eq!(picked.attributes, vec![2]);

        let err = load_collection(&path, "id", &["brand".to_string()]).unwrap_err();
        assert!(matches!(err, IoError::MissingColumn { ref column, .. } if column == "brand"));
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "café" with 0xE9 for é
        fs::write(&path, b"id,title\na1,caf\xe9\n").unwrap();
        let loaded = load_collection(&path, "id", &[]).unwrap();
        assert_eq!(loaded.collection.rows[0][1], "café");
    }

    #[test]
    fn test_missing_file() {
        let err = load_gold_standard(Path::new("/nonexistent/gold.csv"), "a", "b").unwrap_err();
        assert!(matches!(err, IoError::Read { .. }));
    }
}
