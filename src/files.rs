//! Normalizing the gateway's upload descriptor into a typed tree.
//!
//! Gateways describe uploads as a nested mapping of form-field names to file
//! metadata, mirroring however the HTML form nested its inputs. [`RawUpload`]
//! is that untyped descriptor; [`normalize`] walks it and produces a tree of
//! ready [`UploadedFile`] values with the same shape.
//!
//! Two leaf rules apply on the way through:
//!
//! - A leaf reported as [`UploadError::NoFile`] is an empty form slot, not an
//!   upload. It is dropped from the output entirely.
//! - A leaf with any other non-ok code becomes a streamless [`UploadedFile`]
//!   carrying the code and metadata; its temporary path is never opened.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::Error;
use crate::stream::UploadStream;
use crate::upload_error::UploadError;
use crate::uploaded_file::UploadedFile;

/// One file leaf of the gateway's upload descriptor.
#[derive(Clone, Debug)]
pub struct RawFile {
    /// Where the gateway parked the upload on disk.
    pub tmp_path: PathBuf,
    /// Size in bytes as reported by the gateway, if it reported one.
    pub size: Option<u64>,
    /// Outcome code for this slot.
    pub error: UploadError,
    /// Filename claimed by the client, if any.
    pub client_filename: Option<String>,
    /// Media type claimed by the client, if any.
    pub client_media_type: Option<String>,
}

/// One slot of the descriptor: a single file or a named group of slots.
#[derive(Clone, Debug)]
pub enum RawUpload {
    File(RawFile),
    Group(BTreeMap<String, RawUpload>),
}

/// One node of the normalized tree.
#[derive(Clone, Debug)]
pub enum UploadNode {
    File(UploadedFile),
    Group(BTreeMap<String, UploadNode>),
}

/// The normalized upload tree, keyed by form-field name.
pub type UploadFiles = BTreeMap<String, UploadNode>;

impl UploadNode {
    /// The uploaded file at this node, if it is a leaf.
    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Self::File(file) => Some(file),
            Self::Group(_) => None,
        }
    }

    /// The members of this node, if it is a group.
    pub fn as_group(&self) -> Option<&BTreeMap<String, UploadNode>> {
        match self {
            Self::File(_) => None,
            Self::Group(members) => Some(members),
        }
    }
}

/// Builds the uploaded-file tree from a gateway descriptor.
///
/// Fails only when a leaf that claims success has a temporary path that
/// cannot be opened.
pub fn normalize(descriptor: BTreeMap<String, RawUpload>) -> Result<UploadFiles, Error> {
    let mut tree = UploadFiles::new();
    for (field, slot) in descriptor {
        if let Some(node) = normalize_slot(slot)? {
            tree.insert(field, node);
        }
    }
    Ok(tree)
}

/// Counts the file leaves in a normalized tree.
pub fn file_count(files: &UploadFiles) -> usize {
    files.values().map(count_node).sum()
}

fn normalize_slot(slot: RawUpload) -> Result<Option<UploadNode>, Error> {
    match slot {
        RawUpload::File(file) if file.error == UploadError::NoFile => Ok(None),
        RawUpload::File(file) => Ok(Some(UploadNode::File(build_leaf(file)?))),
        RawUpload::Group(members) => {
            let mut group = BTreeMap::new();
            for (field, member) in members {
                if let Some(node) = normalize_slot(member)? {
                    group.insert(field, node);
                }
            }
            Ok(Some(UploadNode::Group(group)))
        }
    }
}

fn build_leaf(raw: RawFile) -> Result<UploadedFile, Error> {
    let mut file = if raw.error == UploadError::Ok {
        UploadedFile::new(UploadStream::open(&raw.tmp_path)?)
    } else {
        UploadedFile::failed(raw.error)
    };
    if let Some(size) = raw.size {
        file = file.with_size(size);
    }
    if let Some(filename) = raw.client_filename {
        file = file.with_client_filename(filename);
    }
    if let Some(media_type) = raw.client_media_type {
        file = file.with_client_media_type(media_type);
    }
    Ok(file)
}

fn count_node(node: &UploadNode) -> usize {
    match node {
        UploadNode::File(_) => 1,
        UploadNode::Group(members) => members.values().map(count_node).sum(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;

    fn leaf(tmp_path: PathBuf, error: UploadError) -> RawFile {
        RawFile {
            tmp_path,
            size: None,
            error,
            client_filename: None,
            client_media_type: None,
        }
    }

    fn tmp_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(contents).unwrap();
        tmp
    }

    #[test]
    fn single_file_opens_its_temporary_path() {
        let tmp = tmp_file(b"payload");
        let mut raw = leaf(tmp.path().to_owned(), UploadError::Ok);
        raw.client_filename = Some("report.csv".into());
        raw.client_media_type = Some("text/csv".into());

        let tree = normalize(BTreeMap::from([("doc".to_owned(), RawUpload::File(raw))])).unwrap();
        assert_eq!(file_count(&tree), 1);

        let file = tree["doc"].as_file().unwrap();
        assert_eq!(file.size(), Some(7));
        assert_eq!(file.client_filename(), Some("report.csv"));
        assert_eq!(file.client_media_type(), Some("text/csv"));

        let mut contents = String::new();
        file.take_stream().unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "payload");
    }

    #[test]
    fn groups_keep_their_shape() {
        let first = tmp_file(b"a");
        let second = tmp_file(b"bb");
        let descriptor = BTreeMap::from([(
            "album".to_owned(),
            RawUpload::Group(BTreeMap::from([
                (
                    "cover".to_owned(),
                    RawUpload::File(leaf(first.path().to_owned(), UploadError::Ok)),
                ),
                (
                    "back".to_owned(),
                    RawUpload::File(leaf(second.path().to_owned(), UploadError::Ok)),
                ),
            ])),
        )]);

        let tree = normalize(descriptor).unwrap();
        assert_eq!(file_count(&tree), 2);
        let album = tree["album"].as_group().unwrap();
        assert_eq!(album["cover"].as_file().unwrap().size(), Some(1));
        assert_eq!(album["back"].as_file().unwrap().size(), Some(2));
    }

    #[test]
    fn empty_slots_are_dropped() {
        let tmp = tmp_file(b"kept");
        let descriptor = BTreeMap::from([
            (
                "kept".to_owned(),
                RawUpload::File(leaf(tmp.path().to_owned(), UploadError::Ok)),
            ),
            (
                "empty".to_owned(),
                RawUpload::File(leaf(PathBuf::new(), UploadError::NoFile)),
            ),
            (
                "group".to_owned(),
                RawUpload::Group(BTreeMap::from([(
                    "empty".to_owned(),
                    RawUpload::File(leaf(PathBuf::new(), UploadError::NoFile)),
                )])),
            ),
        ]);

        let tree = normalize(descriptor).unwrap();
        assert!(tree.contains_key("kept"));
        assert!(!tree.contains_key("empty"));
        // The group survives even though all its members were empty slots.
        assert!(tree["group"].as_group().unwrap().is_empty());
        assert_eq!(file_count(&tree), 1);
    }

    #[test]
    fn failed_leaves_keep_metadata_without_touching_disk() {
        // The path does not exist; a failed leaf must never try to open it.
        let mut raw = leaf(PathBuf::from("/no/such/tmp"), UploadError::FormSizeLimit);
        raw.size = Some(1_048_576);
        raw.client_filename = Some("huge.bin".into());

        let tree = normalize(BTreeMap::from([("big".to_owned(), RawUpload::File(raw))])).unwrap();
        let file = tree["big"].as_file().unwrap();
        assert_eq!(file.error(), UploadError::FormSizeLimit);
        assert_eq!(file.size(), Some(1_048_576));
        assert_eq!(file.client_filename(), Some("huge.bin"));
        assert!(file.take_stream().is_err());
    }

    #[test]
    fn unreadable_path_on_a_successful_leaf_is_an_error() {
        let descriptor = BTreeMap::from([(
            "gone".to_owned(),
            RawUpload::File(leaf(PathBuf::from("/no/such/tmp"), UploadError::Ok)),
        )]);
        assert!(normalize(descriptor).is_err());
    }
}
