//! Slice data: one wedge of the wheel

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{WheelError, WheelResult};

/// Slice identifier, unique within a wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SliceId(pub u64);

impl From<u64> for SliceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A single wheel slice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slice {
    pub id: SliceId,
    /// Label text
    pub value: String,
    /// Wedge fill color
    pub bg_color: String,
    /// Label color
    pub color: String,
}

impl Slice {
    pub fn new(
        id: impl Into<SliceId>,
        value: impl Into<String>,
        bg_color: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
            bg_color: bg_color.into(),
            color: color.into(),
        }
    }
}

/// Center image parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImgParams {
    pub src: String,
    pub width: f64,
    pub height: f64,
}

/// Ordered slices; order is angular position, clockwise from twelve o'clock
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SliceSet {
    slices: Vec<Slice>,
}

impl SliceSet {
    pub fn new(slices: Vec<Slice>) -> Self {
        Self { slices }
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Slice> {
        self.slices.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Slice> {
        self.slices.iter()
    }

    pub fn as_slice(&self) -> &[Slice] {
        &self.slices
    }

    /// 1-based position of the slice with `id`, or 0 when nothing matches
    pub fn position_one_based(&self, id: SliceId) -> usize {
        self.slices
            .iter()
            .position(|s| s.id == id)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Id of a uniformly chosen slice, for hosts that let chance pick the prize
    pub fn random_id<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<SliceId> {
        if self.slices.is_empty() {
            return None;
        }
        let index = rng.random_range(0..self.slices.len());
        Some(self.slices[index].id)
    }

    /// Check the set is buildable: non-empty, every field present, ids unique
    pub fn validate(&self) -> WheelResult<()> {
        if self.slices.is_empty() {
            return Err(WheelError::EmptyData);
        }

        for (index, slice) in self.slices.iter().enumerate() {
            let missing = if slice.value.is_empty() {
                Some("value")
            } else if slice.bg_color.is_empty() {
                Some("bgColor")
            } else if slice.color.is_empty() {
                Some("color")
            } else if self.slices[..index].iter().any(|s| s.id == slice.id) {
                Some("id")
            } else {
                None
            };

            if let Some(field) = missing {
                return Err(WheelError::InvalidSlice { index, field });
            }
        }

        Ok(())
    }
}

impl From<Vec<Slice>> for SliceSet {
    fn from(slices: Vec<Slice>) -> Self {
        Self::new(slices)
    }
}

impl<'a> IntoIterator for &'a SliceSet {
    type Item = &'a Slice;
    type IntoIter = std::slice::Iter<'a, Slice>;

    fn into_iter(self) -> Self::IntoIter {
        self.slices.iter()
    }
}
