/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Filesystem Artifact Store
//!
//! [`ArtifactStore`] implementation for deployments that serve a local
//! directory through a CDN or reverse proxy: artifacts are copied into the
//! public directory and addressed under the configured base URL. Bucket
//! providers plug in behind the same trait without touching worker logic.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use cantus::error::StorageError;
use cantus::storage::ArtifactStore;

use crate::config::StorageConfig;

pub struct FsArtifactStore {
    public_dir: PathBuf,
    public_base_url: String,
}

impl FsArtifactStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            public_dir: config.public_dir.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, path: &Path) -> Result<String, StorageError> {
        if !path.exists() {
            return Err(StorageError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let object_key = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::Upload(format!("Unusable file name: {}", path.display())))?
            .to_string();

        let destination = self.public_dir.join(&object_key);
        tokio::fs::copy(path, &destination).await?;

        let url = format!("{}/{}", self.public_base_url, object_key);
        info!("Published {} as {}", path.display(), url);
        Ok(url)
    }
}
