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

//! Storage Boundary
//!
//! [`ArtifactStore`] is the injected "store file, get URL" capability used by
//! the delivery stage. Provider specifics (bucket layout, credentials,
//! signing) live entirely behind this trait.

use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageError;

/// The opaque object-storage capability.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persists a local artifact and returns its public URL.
    async fn put(&self, path: &Path) -> Result<String, StorageError>;
}
