use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::record::{Kind, ParseError, Record};

pub const SIDECAR_SUFFIX: &str = "_annotations";

/// `<image path>_annotations`, next to the image.
pub fn sidecar_path(image_path: &Path) -> PathBuf {
    let mut path = OsString::from(image_path.as_os_str());
    path.push(SIDECAR_SUFFIX);
    PathBuf::from(path)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Format {
        line: usize,
        #[source]
        source: ParseError,
    },
}

// ── Store ───────────────────────────────────────────────────────────────────

/// Annotations of the open image, one bucket per kind in creation order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationStore {
    buckets: BTreeMap<Kind, Vec<Record>>,
}

impl AnnotationStore {
    pub fn push(&mut self, record: Record) {
        self.buckets.entry(record.kind).or_default().push(record);
    }

    pub fn records(&self, kind: Kind) -> &[Record] {
        self.buckets.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bucket by bucket; only the order inside a bucket is meaningful.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.buckets.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    pub fn to_sidecar(&self) -> String {
        let mut out = String::new();
        for record in self.iter() {
            out.push_str(&record.to_line());
            out.push('\n');
        }
        out
    }

    /// Appends every record of `text`, handing each one to `on_record` in
    /// file order as it is added.
    ///
    /// Stops at the first line that does not parse. Records read before it
    /// stay in the store.
    pub fn load_str(
        &mut self,
        text: &str,
        mut on_record: impl FnMut(&Record),
    ) -> Result<usize, StoreError> {
        let mut loaded = 0;
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = Record::from_line(line).map_err(|source| StoreError::Format {
                line: index + 1,
                source,
            })?;
            on_record(&record);
            self.push(record);
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn load_file(
        &mut self,
        path: &Path,
        on_record: impl FnMut(&Record),
    ) -> Result<usize, StoreError> {
        let text = fs::read_to_string(path)?;
        let loaded = self.load_str(&text, on_record)?;
        log::debug!("read {} annotations from {}", loaded, path.display());
        Ok(loaded)
    }

    pub fn save_file(&self, path: &Path) -> Result<usize, StoreError> {
        fs::write(path, self.to_sidecar())?;
        Ok(self.len())
    }
}

#[cfg(test)]
impl AnnotationStore {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read(path: &Path) -> Result<Self, StoreError> {
        let mut store = Self::default();
        store.load_file(path, |_| {})?;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Point;

    fn sample() -> AnnotationStore {
        let mut store = AnnotationStore::default();
        store.push(Record::text(Point::new(5.0, 5.0), "first"));
        store.push(Record::line(Point::new(0.0, 0.0), Point::new(3.5, 4.0)));
        store.push(Record::rectangle(Point::new(1.0, 1.0), Point::new(-2.0, 9.0)));
        store.push(Record::text(Point::new(6.0, 7.0), ""));
        store.push(Record::line(Point::new(10.0, 20.0), Point::new(30.0, 40.0)));
        store
    }

    #[test]
    fn sidecar_path_appends_suffix() {
        assert_eq!(
            sidecar_path(Path::new("/scans/img.dcm")),
            PathBuf::from("/scans/img.dcm_annotations")
        );
    }

    #[test]
    fn buckets_keep_insertion_order() {
        let store = sample();
        assert_eq!(store.len(), 5);
        let texts: Vec<_> = store
            .records(Kind::Text)
            .iter()
            .map(|r| r.text.as_str())
            .collect();
        assert_eq!(texts, ["first", ""]);
        assert_eq!(store.records(Kind::Line)[1].origin, Point::new(10.0, 20.0));
    }

    #[test]
    fn save_then_read_restores_every_bucket() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("scan.dcm_annotations");
        let store = sample();

        assert_eq!(store.save_file(&path).expect("save should succeed"), 5);
        let loaded = AnnotationStore::read(&path).expect("read should succeed");

        for kind in Kind::ALL {
            assert_eq!(loaded.records(kind), store.records(kind), "bucket {kind}");
        }
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut store = AnnotationStore::default();
        let text = "\n  \nkind: text, text: hello, x0: 5, y0: 5, x1: , y1: \n\n";
        assert_eq!(store.load_str(text, |_| {}).unwrap(), 1);
        assert_eq!(store.records(Kind::Text).len(), 1);
    }

    #[test]
    fn load_reports_records_in_file_order() {
        let mut store = AnnotationStore::default();
        let text = "kind: rectangle, text: , x0: 1, y0: 1, x1: 2, y1: 2\n\
                    kind: text, text: a, x0: 0, y0: 0, x1: , y1: \n\
                    kind: line, text: , x0: 3, y0: 3, x1: 4, y1: 4\n";
        let mut seen = Vec::new();
        store.load_str(text, |r| seen.push(r.kind)).unwrap();
        assert_eq!(seen, [Kind::Rectangle, Kind::Text, Kind::Line]);
    }

    #[test]
    fn bad_line_aborts_and_keeps_earlier_records() {
        let mut store = AnnotationStore::default();
        let text = "kind: line, text: , x0: 1, y0: 2, x1: 3, y1: 4\n\
                    \n\
                    kind: line, text: , x0: 1, y0: 2, x1: 3\n\
                    kind: text, text: late, x0: 0, y0: 0, x1: , y1: \n";
        let err = store.load_str(text, |_| {}).unwrap_err();

        assert!(matches!(
            err,
            StoreError::Format {
                line: 3,
                source: ParseError::MissingField("y1")
            }
        ));
        assert_eq!(store.records(Kind::Line).len(), 1);
        assert!(store.records(Kind::Text).is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let err = AnnotationStore::read(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
