//! Conflict policies for merging a remote container into a local one.
//!
//! A closed set, parsed once at configuration time; each variant is a
//! pure `(local, remote) -> merged` function over container bytes. No
//! policy ever contacts the repository.

use decree_core::storage::container::{concat, Container, Keyed};

use crate::error::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Concatenate remote then local and rely on the container's
    /// id-keyed decode to de-duplicate (newer entry wins, local wins
    /// timestamp ties). The right default for record content.
    Union,
    /// Keep the local container as-is. With no local container yet the
    /// remote one is adopted; there is nothing of ours to keep.
    Ours,
    /// Take the remote container wholesale.
    Theirs,
    /// Union, then sort lines by id. Used for the index ref, where the
    /// content is rederivable and a canonical order keeps repeated
    /// merges from ping-ponging.
    SortedUnique,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::Union => "union",
            ConflictPolicy::Ours => "ours",
            ConflictPolicy::Theirs => "theirs",
            ConflictPolicy::SortedUnique => "sorted-unique",
        }
    }

    /// Merge container bytes. `T` is the entry type the containers
    /// hold; only `union`/`sorted-unique` actually decode.
    pub fn apply<T: Keyed>(
        &self,
        local: Option<&[u8]>,
        remote: &[u8],
    ) -> Result<Vec<u8>, ProtocolError> {
        let merged = match self {
            ConflictPolicy::Ours => match local {
                Some(bytes) => bytes.to_vec(),
                None => remote.to_vec(),
            },
            ConflictPolicy::Theirs => remote.to_vec(),
            ConflictPolicy::Union => {
                let bytes = concat(remote, local.unwrap_or_default());
                Container::<T>::decode(&bytes)
                    .map_err(ProtocolError::Core)?
                    .encode()
            }
            ConflictPolicy::SortedUnique => {
                let bytes = concat(remote, local.unwrap_or_default());
                let mut container = Container::<T>::decode(&bytes).map_err(ProtocolError::Core)?;
                container.sort();
                container.encode()
            }
        };
        Ok(merged)
    }
}

impl std::fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConflictPolicy {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "union" => Ok(ConflictPolicy::Union),
            "ours" => Ok(ConflictPolicy::Ours),
            "theirs" => Ok(ConflictPolicy::Theirs),
            "sorted-unique" => Ok(ConflictPolicy::SortedUnique),
            other => Err(ProtocolError::UnknownPolicy(other.to_string())),
        }
    }
}
