#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use datadock::{
    analyze::Analyzer,
    blob::FsBlobStore,
    catalog::MemoryCatalog,
    dataset::DatasetService,
    engine::LocalEngine,
    pipeline::{Pipeline, PipelineConfig},
    resolve::Resolver,
    worker::WorkerPool,
};
use tempfile::{tempdir, TempDir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}

/// A fully wired service stack over a directory-backed blob store and an
/// in-memory catalog.
pub struct TestStack {
    pub service: DatasetService,
    pub catalog: Arc<MemoryCatalog>,
    pub blobs: Arc<FsBlobStore>,
    pub pool: Arc<WorkerPool>,
    pub blob_root: PathBuf,
}

impl TestStack {
    pub fn new(workspace: &TestWorkspace, threshold: u64) -> Self {
        let blob_root = workspace.path().join("blobs");
        let resolver = Resolver::new(Arc::new(LocalEngine::new()));
        let blobs = Arc::new(FsBlobStore::new(&blob_root));
        let catalog = Arc::new(MemoryCatalog::new());
        let pool = WorkerPool::new(2);
        let config = PipelineConfig {
            large_file_threshold: threshold,
        };
        let pipeline = Pipeline::new(resolver.clone(), blobs.clone(), pool.clone(), config);
        let analyzer = Arc::new(Analyzer::new(
            resolver,
            blobs.clone(),
            catalog.clone(),
            pool.clone(),
        ));
        let service = DatasetService::new(pipeline, analyzer, catalog.clone(), blobs.clone());
        Self {
            service,
            catalog,
            blobs,
            pool,
            blob_root,
        }
    }

    /// Blobs currently present in the store, as paths relative to the root.
    pub fn stored_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        collect_keys(&self.blob_root, &self.blob_root, &mut keys);
        keys.sort();
        keys
    }
}

fn collect_keys(root: &Path, dir: &Path, keys: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_keys(root, &path, keys);
        } else if let Ok(rel) = path.strip_prefix(root) {
            keys.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}
