//! Parameter synchronizer.
//!
//! Applies remote configuration updates to registered fields. Every update
//! is decoded by the field's kind, checked by the descriptor's validator,
//! and written by this layer under the field's own lock. Validators are
//! pure predicates and never touch storage.

use core::ops::RangeInclusive;

use log::{info, warn};

use crate::config::{MAX_BATCH_UPDATES, SyncConfig};
use crate::error::{ParamError, RegistryError};
use crate::registry::{FieldKind, FieldSet, FieldStorage, FieldValue, TypedField};

// ───────────────────────────────────────────────────────────────
// Validators
// ───────────────────────────────────────────────────────────────

/// Accept/reject predicate over a decoded candidate and the stored value.
pub trait Validator: Send + Sync {
    fn validate(&self, candidate: &FieldValue, current: &FieldValue) -> Result<(), ParamError>;
}

/// Scalar types a [`RangeValidator`] can bound.
pub trait Scalar: Copy + PartialOrd + Send + Sync + 'static {
    fn from_value(value: &FieldValue) -> Option<Self>;
}

macro_rules! impl_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                fn from_value(value: &FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_scalar!(i32 => Int32, u32 => UInt32, u8 => UInt8, f32 => Float, f64 => Double);

/// Closed-range check that also rejects a value equal to the current one.
#[derive(Debug, Clone)]
pub struct RangeValidator<T> {
    range: RangeInclusive<T>,
}

impl<T: Scalar> RangeValidator<T> {
    pub fn new(range: RangeInclusive<T>) -> Self {
        Self { range }
    }
}

impl<T: Scalar> Validator for RangeValidator<T> {
    fn validate(&self, candidate: &FieldValue, current: &FieldValue) -> Result<(), ParamError> {
        let (Some(new), Some(cur)) = (T::from_value(candidate), T::from_value(current)) else {
            return Err(ParamError::LengthInvalid);
        };
        // NaN fails `contains`, so it lands here too.
        if !self.range.contains(&new) {
            return Err(ParamError::OutOfRange);
        }
        if new == cur {
            return Err(ParamError::Unchanged);
        }
        Ok(())
    }
}

/// Accepts any value that passed the kind's structural checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Validator for AcceptAll {
    fn validate(&self, _: &FieldValue, _: &FieldValue) -> Result<(), ParamError> {
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Descriptors
// ───────────────────────────────────────────────────────────────

/// A remotely writable field.
pub struct ParameterDescriptor {
    uref: u16,
    field: TypedField,
    validator: Box<dyn Validator>,
}

impl ParameterDescriptor {
    pub fn new(uref: u16, field: TypedField, validator: impl Validator + 'static) -> Self {
        Self {
            uref,
            field,
            validator: Box::new(validator),
        }
    }

    /// Numeric parameter bounded by `range`.
    pub fn ranged<T: Scalar>(uref: u16, field: TypedField, range: RangeInclusive<T>) -> Self {
        Self::new(uref, field, RangeValidator::new(range))
    }

    /// String parameter with only the capacity bound.
    pub fn text(uref: u16, field: TypedField) -> Self {
        Self::new(uref, field, AcceptAll)
    }

    pub fn uref(&self) -> u16 {
        self.uref
    }

    pub fn field(&self) -> &TypedField {
        &self.field
    }
}

impl core::fmt::Debug for ParameterDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParameterDescriptor")
            .field("uref", &self.uref)
            .field("field", &self.field.name())
            .field("kind", &self.field.kind())
            .finish()
    }
}

/// One entry of a batched update.
#[derive(Debug, Clone, Copy)]
pub struct ParamUpdate<'a> {
    pub uref: u16,
    pub raw: &'a [u8],
}

/// Per-entry results of [`ParameterSynchronizer::apply_batch`].
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: heapless::Vec<(u16, Result<(), ParamError>), MAX_BATCH_UPDATES>,
    /// Entries past the per-request limit, all rejected unapplied.
    pub overflow: usize,
}

impl BatchOutcome {
    pub fn applied(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_ok()).count()
    }
}

// ───────────────────────────────────────────────────────────────
// Synchronizer
// ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ParameterSynchronizer {
    params: Vec<ParameterDescriptor>,
    max_per_update: usize,
}

impl ParameterSynchronizer {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            params: Vec::new(),
            max_per_update: config.max_params_per_update.min(MAX_BATCH_UPDATES),
        }
    }

    /// Register a descriptor. urefs are non-zero and unique.
    pub fn register(&mut self, desc: ParameterDescriptor) -> Result<(), RegistryError> {
        if desc.uref == 0 {
            return Err(RegistryError::ZeroUref);
        }
        if self.get(desc.uref).is_some() {
            return Err(RegistryError::DuplicateUref(desc.uref));
        }
        info!(
            "PARAM: registered uref={} '{}' ({:?})",
            desc.uref,
            desc.field.name(),
            desc.field.kind()
        );
        self.params.push(desc);
        Ok(())
    }

    pub fn get(&self, uref: u16) -> Option<&ParameterDescriptor> {
        self.params.iter().find(|p| p.uref == uref)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Every parameter field, in registration order.
    pub fn field_set(&self) -> FieldSet {
        self.params
            .iter()
            .fold(FieldSet::new(), |set, p| set.with(p.field.clone()))
    }

    /// Validate and apply one raw update.
    ///
    /// Any rejection leaves the stored value untouched.
    pub fn apply_update(&self, uref: u16, raw: &[u8]) -> Result<(), ParamError> {
        let Some(desc) = self.get(uref) else {
            warn!("PARAM: unknown uref={}", uref);
            return Err(ParamError::UnknownParameter);
        };

        let result = match desc.field.storage() {
            FieldStorage::Text(buf) => {
                let cap = buf.with(|b| b.capacity());
                if raw.is_empty() || raw.len() >= cap.saturating_sub(1) || raw.contains(&0) {
                    Err(ParamError::LengthInvalid)
                } else {
                    FieldKind::String.decode(raw).and_then(|candidate| {
                        buf.with_mut(|b| {
                            let current = FieldValue::Text(b.text().into_owned());
                            desc.validator.validate(&candidate, &current)?;
                            b.set_text(raw);
                            Ok(())
                        })
                    })
                }
            }
            _ => desc.field.kind().decode(raw).and_then(|candidate| {
                desc.field
                    .update_scalar(&candidate, |new, cur| desc.validator.validate(new, cur))
            }),
        };

        match result {
            Ok(()) => info!(
                "PARAM: uref={} '{}' applied {:?}",
                uref,
                desc.field.name(),
                desc.field.read()
            ),
            Err(e) => warn!("PARAM: uref={} '{}' rejected: {}", uref, desc.field.name(), e),
        }
        result
    }

    /// Apply several updates independently.
    ///
    /// Only the first `max_params_per_update` entries are applied. Entries
    /// past the limit are answered `BatchOverflow` while result slots remain
    /// and are always counted in `overflow`.
    pub fn apply_batch(&self, updates: &[ParamUpdate<'_>]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let take = updates.len().min(self.max_per_update);
        for u in &updates[..take] {
            // Capacity is MAX_BATCH_UPDATES and take never exceeds it.
            let _ = outcome.results.push((u.uref, self.apply_update(u.uref, u.raw)));
        }
        for u in &updates[take..] {
            if outcome.results.push((u.uref, Err(ParamError::BatchOverflow))).is_err() {
                break;
            }
        }
        outcome.overflow = updates.len() - take;
        if outcome.overflow > 0 {
            warn!(
                "PARAM: batch of {} exceeds limit {}, {} dropped",
                updates.len(),
                self.max_per_update,
                outcome.overflow
            );
        }
        outcome
    }
}
