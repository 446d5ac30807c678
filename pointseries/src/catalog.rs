//! On-disk image collection catalog.

use crate::{
    source::{CollectionFilter, ImageCollectionSource, ImageRecord},
    Raster, SourceError,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use geo::geometry::Point;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap},
    ffi::OsStr,
    fs::File,
    io::{BufReader, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};

/// A named set of time-stamped images sharing a band list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CollectionFile")]
pub struct Collection {
    pub id: String,

    /// Bands every image in this collection may carry.
    pub bands: BTreeSet<String>,

    pub images: Vec<Image>,

    /// Image id to position in `images`.
    #[serde(skip)]
    index: HashMap<String, usize>,
}

/// On-disk form of a [`Collection`], before checking and indexing.
#[derive(Deserialize)]
struct CollectionFile {
    id: String,
    bands: BTreeSet<String>,
    images: Vec<Image>,
}

impl TryFrom<CollectionFile> for Collection {
    type Error = SourceError;

    fn try_from(CollectionFile { id, bands, images }: CollectionFile) -> Result<Self, Self::Error> {
        Self::new(id, bands, images)
    }
}

/// One acquisition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: String,

    /// Acquisition time.
    pub time: DateTime<Utc>,

    pub raster: Raster,
}

impl Collection {
    /// Returns a checked and indexed collection.
    pub fn new<I, S>(id: impl Into<String>, bands: I, images: Vec<Image>) -> Result<Self, SourceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let collection = Self {
            id: id.into(),
            bands: bands.into_iter().map(Into::into).collect(),
            images,
            index: HashMap::new(),
        };
        collection.indexed()
    }

    /// Returns the image with `id`, if any.
    pub fn image(&self, id: &str) -> Option<&Image> {
        self.index.get(id).map(|&idx| &self.images[idx])
    }

    fn indexed(mut self) -> Result<Self, SourceError> {
        let malformed = |reason: String| SourceError::Malformed {
            collection: self.id.clone(),
            reason,
        };
        let mut index = HashMap::with_capacity(self.images.len());
        for (idx, image) in self.images.iter().enumerate() {
            image
                .raster
                .validate()
                .map_err(|e| malformed(format!("image {}: {e}", image.id)))?;
            if let Some(band) = image
                .raster
                .band_names()
                .find(|band| !self.bands.contains(*band))
            {
                return Err(malformed(format!(
                    "image {} has undeclared band {band}",
                    image.id
                )));
            }
            if index.insert(image.id.clone(), idx).is_some() {
                return Err(malformed(format!("duplicate image id {}", image.id)));
            }
        }
        self.index = index;
        Ok(self)
    }
}

pub struct Catalog {
    /// Directory containing collection files, if any.
    dir: Option<PathBuf>,

    /// Collections which have been loaded on demand.
    collections: DashMap<String, Arc<Collection>>,
}

impl Catalog {
    /// Returns a catalog which loads collections from `dir` on first
    /// use.
    pub fn open(dir: PathBuf) -> Result<Self, SourceError> {
        let mut has_collection_files = false;

        // Let's try to fail early by checking that dir has at least one
        // `json` file.
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if Some("json") == path.extension().and_then(OsStr::to_str) {
                has_collection_files = true;
                break;
            }
        }

        if has_collection_files {
            Ok(Self {
                dir: Some(dir),
                collections: DashMap::new(),
            })
        } else {
            Err(SourceError::EmptyCatalog(dir))
        }
    }

    /// Returns a catalog serving only `collections`.
    pub fn from_collections<I>(collections: I) -> Self
    where
        I: IntoIterator<Item = Collection>,
    {
        let collections = collections
            .into_iter()
            .map(|collection| (collection.id.clone(), Arc::new(collection)))
            .collect();
        Self {
            dir: None,
            collections,
        }
    }

    /// Returns the collection with `id`.
    ///
    /// The catalog will attempt to load the collection from disk if it
    /// doesn't already have it in memory.
    pub fn collection(&self, id: &str) -> Result<Arc<Collection>, SourceError> {
        if let Some(collection) = self.collections.get(id) {
            return Ok(Arc::clone(collection.value()));
        }
        let dir = self
            .dir
            .as_ref()
            .ok_or_else(|| SourceError::UnknownCollection(id.to_owned()))?;
        self.collections
            .entry(id.to_owned())
            .or_try_insert_with(|| Self::load_collection(dir, id).map(Arc::new))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the ids of every collection this catalog can serve,
    /// sorted.
    ///
    /// This loads every collection file on disk. Files which can't be
    /// loaded, or whose name doesn't match the id they hold, are
    /// skipped.
    pub fn collection_ids(&self) -> Result<Vec<String>, SourceError> {
        if let Some(dir) = &self.dir {
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                if Some("json") != path.extension().and_then(OsStr::to_str) {
                    continue;
                }
                let collection = match Self::read_collection(&path) {
                    Ok(collection) => collection,
                    Err(e) => {
                        warn!("skipping {path:?}: {e}");
                        continue;
                    }
                };
                let expected = file_name(&collection.id);
                let found = path.file_name().and_then(OsStr::to_str).unwrap_or_default();
                if found != expected && found != expected.to_lowercase() {
                    warn!("skipping {path:?}: holds collection {}", collection.id);
                    continue;
                }
                self.collections
                    .entry(collection.id.clone())
                    .or_insert_with(|| Arc::new(collection));
            }
        }
        let mut ids: Vec<String> = self
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

/// Private API.
impl Catalog {
    fn load_collection(dir: &Path, id: &str) -> Result<Collection, SourceError> {
        let path = {
            let file_name = file_name(id);
            let mut path: PathBuf = [dir, Path::new(&file_name)].iter().collect();
            if !path.exists() {
                let file_name = file_name.to_lowercase();
                path = [dir, Path::new(&file_name)].iter().collect();
            }
            path
        };
        debug!("loading {path:?}");
        let collection = match Self::read_collection(&path) {
            Err(SourceError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(SourceError::UnknownCollection(id.to_owned()))
            }
            res => res?,
        };
        if collection.id != id {
            return Err(SourceError::Malformed {
                collection: id.to_owned(),
                reason: format!("{path:?} holds collection {}", collection.id),
            });
        }
        Ok(collection)
    }

    fn read_collection(path: &Path) -> Result<Collection, SourceError> {
        let rdr = BufReader::new(File::open(path)?);
        let file: CollectionFile = serde_json::from_reader(rdr)?;
        Collection::try_from(file)
    }
}

impl ImageCollectionSource for Catalog {
    fn list_available_bands(&self, collection_id: &str) -> Result<BTreeSet<String>, SourceError> {
        Ok(self.collection(collection_id)?.bands.clone())
    }

    fn images(&self, filter: &CollectionFilter) -> Result<Vec<ImageRecord>, SourceError> {
        let collection = self.collection(filter.collection_id())?;
        let records = collection
            .images
            .iter()
            .filter(|image| filter.accepts_time(image.time))
            .filter(|image| {
                filter
                    .location()
                    .map_or(true, |point| image.raster.covers(point))
            })
            .map(|image| ImageRecord {
                collection_id: collection.id.clone(),
                image_id: image.id.clone(),
                timestamp: image.time,
            })
            .collect();
        Ok(records)
    }

    fn sample_point(
        &self,
        record: &ImageRecord,
        band: &str,
        point: Point<f64>,
        scale: f64,
    ) -> Result<Option<f64>, SourceError> {
        let collection = self.collection(&record.collection_id)?;
        let image = collection
            .image(&record.image_id)
            .ok_or_else(|| SourceError::UnknownImage {
                collection: record.collection_id.clone(),
                image: record.image_id.clone(),
            })?;
        Ok(image.raster.sample(band, point, scale))
    }
}

/// Returns the expected file name for collection `id`.
fn file_name(id: &str) -> String {
    format!("{}.json", id.replace('/', "_"))
}
