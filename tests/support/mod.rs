//! In-memory object store for exercising the deploy pipeline without S3.

#![allow(dead_code)]

use async_trait::async_trait;
use flate2::read::GzDecoder;
use s3_deploy::{
    Access, AttributeUpdate, Bucket, ObjectHandle, ObjectStore, ObjectWriter, StoreCredentials,
    StoreError, UploadSpec,
};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Remote operations in the order they happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    OpenWriter(String),
    Commit(String),
    SetPublicRead(String),
    UpdateAttributes(String),
}

/// Where to make the store fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    OpenWriter,
    Commit,
    SetPublicRead,
    UpdateAttributes,
}

#[derive(Debug, Clone, Default)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub public: bool,
    pub attributes: Option<AttributeUpdate>,
}

impl StoredObject {
    pub fn decoded_body(&self) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(self.body.as_slice())
            .read_to_end(&mut out)
            .unwrap();
        out
    }
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<String, StoredObject>,
    events: Vec<Event>,
    failure: Option<(String, FailAt)>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the operation `at` for the object stored under `key`
    pub fn fail_on(&self, key: &str, at: FailAt) {
        self.state.lock().unwrap().failure = Some((key.to_string(), at));
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().unwrap().objects.keys().cloned().collect()
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }
}

impl ObjectStore for MemoryStore {
    type Bucket = MemoryBucket;

    fn bucket(&self, name: &str) -> MemoryBucket {
        MemoryBucket {
            name: name.to_string(),
            state: self.state.clone(),
        }
    }
}

pub struct MemoryBucket {
    name: String,
    state: Arc<Mutex<State>>,
}

impl Bucket for MemoryBucket {
    type Object = MemoryObject;

    fn name(&self) -> &str {
        &self.name
    }

    fn object(&self, key: &str) -> MemoryObject {
        MemoryObject {
            key: key.to_string(),
            state: self.state.clone(),
        }
    }
}

pub struct MemoryObject {
    key: String,
    state: Arc<Mutex<State>>,
}

fn check(state: &State, key: &str, at: FailAt) -> Result<(), StoreError> {
    match &state.failure {
        Some((k, f)) if k == key && *f == at => Err(StoreError::Sdk(format!("injected {at:?} failure"))),
        _ => Ok(()),
    }
}

#[async_trait]
impl ObjectHandle for MemoryObject {
    type Writer = MemoryWriter;

    fn key(&self) -> &str {
        &self.key
    }

    async fn new_writer(&self, _cancel: CancellationToken) -> Result<MemoryWriter, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::OpenWriter(self.key.clone()));
        check(&state, &self.key, FailAt::OpenWriter)?;
        Ok(MemoryWriter {
            key: self.key.clone(),
            body: Vec::new(),
            state: self.state.clone(),
        })
    }

    async fn set_public_read(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::SetPublicRead(self.key.clone()));
        check(&state, &self.key, FailAt::SetPublicRead)?;
        let object = state
            .objects
            .get_mut(&self.key)
            .ok_or_else(|| StoreError::NotFound { key: self.key.clone() })?;
        object.public = true;
        Ok(())
    }

    async fn update_attributes(&self, update: &AttributeUpdate) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::UpdateAttributes(self.key.clone()));
        check(&state, &self.key, FailAt::UpdateAttributes)?;
        let object = state
            .objects
            .get_mut(&self.key)
            .ok_or_else(|| StoreError::NotFound { key: self.key.clone() })?;
        object.attributes = Some(update.clone());
        Ok(())
    }
}

pub struct MemoryWriter {
    key: String,
    body: Vec<u8>,
    state: Arc<Mutex<State>>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ObjectWriter for MemoryWriter {
    async fn close(self) -> Result<u64, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::Commit(self.key.clone()));
        check(&state, &self.key, FailAt::Commit)?;
        let size = self.body.len() as u64;
        state.objects.insert(
            self.key.clone(),
            StoredObject {
                body: self.body,
                ..Default::default()
            },
        );
        Ok(size)
    }
}

/// Create files (relative to a fresh temp dir) with the given contents
pub fn fixture(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
    }
    dir
}

/// Absolute path string inside the fixture dir
pub fn at(dir: &Path, rel: &str) -> String {
    format!("{}/{}", dir.display(), rel)
}

pub fn spec(source: String) -> UploadSpec {
    UploadSpec {
        bucket: "test-bucket".to_string(),
        access: Access::Private,
        source,
        target: String::new(),
        strip_prefix: String::new(),
        exclude: Vec::new(),
        dry_run: false,
        compress: false,
        cache_control: None,
        credentials: StoreCredentials {
            region: "us-east-1".to_string(),
            ..Default::default()
        },
    }
}
