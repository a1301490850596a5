//! Status and telemetry publisher.
//!
//! Snapshots attached field sets and hands the result to an [`Uplink`].
//! The only state of its own is the telemetry sample counter.

use core::sync::atomic::{AtomicU32, Ordering};

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{STREAM_META_CAP, SyncConfig};
use crate::error::RegistryError;
use crate::registry::{FieldSet, NamedValue};

use super::ports::{StatusPublish, Uplink};

type MetaString = heapless::String<STREAM_META_CAP>;

fn meta(text: &str) -> Result<MetaString, RegistryError> {
    let mut s = MetaString::new();
    s.push_str(text).map_err(|_| RegistryError::NameTooLong)?;
    Ok(s)
}

/// Handle to an attached status set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusHandle(usize);

/// Handle to an attached data stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHandle(usize);

/// A collected-data stream: metadata plus the fields sampled each publish.
#[derive(Debug, Clone)]
pub struct DataStream {
    stream_id: MetaString,
    model: MetaString,
    tags: MetaString,
    fields: FieldSet,
}

impl DataStream {
    pub fn new(
        stream_id: &str,
        model: &str,
        tags: &str,
        fields: FieldSet,
    ) -> Result<Self, RegistryError> {
        Ok(Self {
            stream_id: meta(stream_id)?,
            model: meta(model)?,
            tags: meta(tags)?,
            fields,
        })
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    fn longest_meta(&self) -> usize {
        self.stream_id.len().max(self.model.len()).max(self.tags.len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub fields: Vec<NamedValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataReport {
    #[serde(rename = "s")]
    pub stream_id: String,
    #[serde(rename = "m")]
    pub model: String,
    #[serde(rename = "t")]
    pub tags: String,
    pub sample: u32,
    #[serde(rename = "v")]
    pub values: Vec<NamedValue>,
}

#[derive(Debug)]
pub struct Publisher {
    status_sets: Vec<FieldSet>,
    streams: Vec<DataStream>,
    max_status_sets: usize,
    max_data_sets: usize,
    meta_len: usize,
    samples: AtomicU32,
}

impl Publisher {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            status_sets: Vec::new(),
            streams: Vec::new(),
            max_status_sets: config.max_status_sets,
            max_data_sets: config.max_data_sets,
            meta_len: config.stream_meta_len.min(STREAM_META_CAP),
            samples: AtomicU32::new(0),
        }
    }

    pub fn attach_status(&mut self, set: FieldSet) -> Result<StatusHandle, RegistryError> {
        if self.status_sets.len() >= self.max_status_sets {
            warn!("PUB: status set limit {} reached", self.max_status_sets);
            return Err(RegistryError::SetFull);
        }
        info!("PUB: status set {} attached ({} fields)", self.status_sets.len(), set.len());
        self.status_sets.push(set);
        Ok(StatusHandle(self.status_sets.len() - 1))
    }

    pub fn attach_data(&mut self, stream: DataStream) -> Result<DataHandle, RegistryError> {
        if self.streams.len() >= self.max_data_sets {
            warn!("PUB: data stream limit {} reached", self.max_data_sets);
            return Err(RegistryError::SetFull);
        }
        if stream.longest_meta() > self.meta_len {
            warn!("PUB: stream '{}' metadata exceeds {}", stream.stream_id, self.meta_len);
            return Err(RegistryError::NameTooLong);
        }
        info!(
            "PUB: stream '{}' attached ({} fields)",
            stream.stream_id,
            stream.fields.len()
        );
        self.streams.push(stream);
        Ok(DataHandle(self.streams.len() - 1))
    }

    /// Samples published so far.
    pub fn sample_count(&self) -> u32 {
        self.samples.load(Ordering::Relaxed)
    }

    /// Snapshot a status set and push it.
    pub fn publish_status(&self, handle: StatusHandle, uplink: &mut impl Uplink) -> bool {
        let Some(set) = self.status_sets.get(handle.0) else {
            return false;
        };
        let report = StatusReport {
            fields: set.snapshot(),
        };
        debug!("PUB: status {} ({} fields)", handle.0, report.fields.len());
        uplink.push_status(&report);
        true
    }

    /// Push every attached status set.
    pub fn publish_all_status(&self, uplink: &mut impl Uplink) {
        for i in 0..self.status_sets.len() {
            self.publish_status(StatusHandle(i), uplink);
        }
    }

    /// Snapshot a data stream, stamp the sample counter, and push it.
    pub fn publish_data(&self, handle: DataHandle, uplink: &mut impl Uplink) -> bool {
        let Some(stream) = self.streams.get(handle.0) else {
            return false;
        };
        let sample = self.samples.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let report = DataReport {
            stream_id: stream.stream_id.as_str().to_owned(),
            model: stream.model.as_str().to_owned(),
            tags: stream.tags.as_str().to_owned(),
            sample,
            values: stream.fields.snapshot(),
        };
        debug!("PUB: data '{}' sample {}", report.stream_id, sample);
        uplink.push_data(&report);
        true
    }
}

/// Publisher paired with an uplink, usable as a [`StatusPublish`] hook.
pub struct PublishVia<'a, U> {
    pub publisher: &'a Publisher,
    pub uplink: &'a mut U,
}

impl<U: Uplink> StatusPublish for PublishVia<'_, U> {
    fn publish_status(&mut self) {
        self.publisher.publish_all_status(&mut *self.uplink);
    }
}
