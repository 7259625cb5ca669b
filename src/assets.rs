// Frame asset set: one slot per image in the sequence, loaded concurrently by the host.
// The set owns the completion counter. Readiness flips false -> true exactly once per mount.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

use futures_util::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ViewerError;
use crate::types::*;

static NEXT_MOUNT_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies one mount of a viewer. Tickets from other mounts are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MountId(u32);

impl MountId {
    fn next() -> Self {
        MountId(NEXT_MOUNT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handed out with each load request and returned with its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadTicket {
    pub mount: MountId,
    pub index: FrameIndex,
}

/// A single image fetch the host should start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameState {
    Pending,
    Loaded,
    Failed,
}

/// Result of one fetch as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoadOutcome {
    Loaded,
    Failed(String),
}

/// Aggregate state of the whole set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoadStatus {
    Loading,
    Ready,
    /// At least one frame failed. The set stays unready until the frame loads.
    Failed { failed_frames: Vec<FrameIndex> },
    Abandoned,
}

/// What a completion did to the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionEffect {
    /// Stale, duplicate, or after abandon.
    Ignored,
    Recorded,
    /// This completion was the last frame the set was waiting for.
    BecameReady,
}

#[derive(Debug, Clone)]
struct FrameSlot {
    url: String,
    state: FrameState,
    error: Option<String>,
}

/// Resolves `{image_path}{index + 1}.{extension}`: filenames are 1-indexed.
pub fn frame_url(image_path: &str, index: FrameIndex, extension: &str) -> String {
    format!("{}{}.{}", image_path, index.as_u32() + 1, extension)
}

/// Ordered frame slots with load tracking.
#[derive(Debug)]
pub struct AssetSet {
    mount: MountId,
    slots: Vec<FrameSlot>,
    loaded: u32,
    failed: u32,
    ready: bool,
    abandoned: bool,
}

impl AssetSet {
    pub fn new(image_path: &str, frame_count: u32, extension: &str) -> Self {
        let slots = (0..frame_count)
            .map(|i| FrameSlot {
                url: frame_url(image_path, FrameIndex::new(i), extension),
                state: FrameState::Pending,
                error: None,
            })
            .collect();

        AssetSet {
            mount: MountId::next(),
            slots,
            loaded: 0,
            failed: 0,
            ready: false,
            abandoned: false,
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(
            &config.image_path,
            config.frame_count,
            &config.image_extension,
        )
    }

    pub fn mount_id(&self) -> MountId {
        self.mount
    }

    pub fn frame_count(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn is_ready(&self) -> bool {
        self.ready && !self.abandoned
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    pub fn frame_state(&self, index: FrameIndex) -> Option<FrameState> {
        self.slots.get(index.as_usize()).map(|slot| slot.state)
    }

    /// Error message recorded for a failed frame.
    pub fn frame_error(&self, index: FrameIndex) -> Option<&str> {
        self.slots
            .get(index.as_usize())
            .and_then(|slot| slot.error.as_deref())
    }

    pub fn progress(&self) -> LoadProgress {
        LoadProgress {
            loaded: self.loaded,
            failed: self.failed,
            total: self.frame_count(),
        }
    }

    pub fn status(&self) -> LoadStatus {
        if self.abandoned {
            LoadStatus::Abandoned
        } else if self.ready {
            LoadStatus::Ready
        } else if self.failed > 0 {
            let failed_frames = self
                .slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.state == FrameState::Failed)
                .map(|(i, _)| FrameIndex::new(i as u32))
                .collect();
            LoadStatus::Failed { failed_frames }
        } else {
            LoadStatus::Loading
        }
    }

    /// One request per frame that has not loaded yet. All of them may be in flight at once.
    pub fn requests(&self) -> Vec<LoadRequest> {
        if self.abandoned {
            return Vec::new();
        }
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.state != FrameState::Loaded)
            .map(|(i, slot)| LoadRequest {
                ticket: LoadTicket {
                    mount: self.mount,
                    index: FrameIndex::new(i as u32),
                },
                url: slot.url.clone(),
            })
            .collect()
    }

    /// Record the outcome of one fetch. The only place the counters move.
    pub fn complete(
        &mut self,
        ticket: LoadTicket,
        outcome: LoadOutcome,
    ) -> Result<CompletionEffect, ViewerError> {
        if ticket.mount != self.mount || self.abandoned {
            debug!(index = ticket.index.as_u32(), "discarding load completion for inactive mount");
            return Ok(CompletionEffect::Ignored);
        }

        let frame_count = self.frame_count();
        let slot = self
            .slots
            .get_mut(ticket.index.as_usize())
            .ok_or(ViewerError::UnknownTicket {
                index: ticket.index.as_u32(),
                frame_count,
            })?;

        match (slot.state, outcome) {
            (FrameState::Loaded, _) => Ok(CompletionEffect::Ignored),
            (FrameState::Failed, LoadOutcome::Failed(_)) => Ok(CompletionEffect::Ignored),
            (previous, LoadOutcome::Loaded) => {
                slot.state = FrameState::Loaded;
                slot.error = None;
                if previous == FrameState::Failed {
                    self.failed -= 1;
                }
                self.loaded += 1;

                if !self.ready && self.loaded == frame_count {
                    self.ready = true;
                    info!(frames = frame_count, "all frames loaded");
                    return Ok(CompletionEffect::BecameReady);
                }
                Ok(CompletionEffect::Recorded)
            }
            (FrameState::Pending, LoadOutcome::Failed(reason)) => {
                warn!(
                    index = ticket.index.as_u32(),
                    url = %slot.url,
                    reason = %reason,
                    "frame failed to load"
                );
                slot.state = FrameState::Failed;
                slot.error = Some(reason);
                self.failed += 1;
                Ok(CompletionEffect::Recorded)
            }
        }
    }

    /// Displayable resource for a frame, once that frame has loaded.
    pub fn resolve(&self, index: FrameIndex) -> Option<&str> {
        self.slots
            .get(index.as_usize())
            .filter(|slot| slot.state == FrameState::Loaded)
            .map(|slot| slot.url.as_str())
    }

    /// Stop accepting completions. In-flight fetches are left to finish; their results are dropped.
    pub fn abandon(&mut self) {
        if !self.abandoned {
            debug!(
                pending = self.frame_count() - self.loaded,
                "abandoning frame loads"
            );
            self.abandoned = true;
        }
    }
}

/// Fetches one frame image. Implemented by the host environment.
pub trait FrameFetcher {
    type Fut: Future<Output = Result<(), String>>;

    fn fetch(&self, url: &str) -> Self::Fut;
}

/// Start every pending fetch at once and record completions as they arrive.
pub async fn load_all<F: FrameFetcher>(assets: &mut AssetSet, fetcher: &F) -> LoadStatus {
    let mut in_flight: FuturesUnordered<_> = assets
        .requests()
        .into_iter()
        .map(|request| {
            let fetch = fetcher.fetch(&request.url);
            async move { (request.ticket, fetch.await) }
        })
        .collect();

    while let Some((ticket, result)) = in_flight.next().await {
        let outcome = match result {
            Ok(()) => LoadOutcome::Loaded,
            Err(reason) => LoadOutcome::Failed(reason),
        };
        if let Err(err) = assets.complete(ticket, outcome) {
            warn!(error = %err, "rejected load completion");
        }
    }

    assets.status()
}
