use std::collections::BTreeMap;

use crate::shared::region::FaceRegion;

/// Sparse frame number → ordered face regions.
///
/// An absent frame means "no faces". Empty sequences are never stored, so
/// the map mirrors the service, which drops a frame once its last face is
/// removed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameAnnotations {
    frames: BTreeMap<u32, Vec<FaceRegion>>,
}

impl FrameAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, frame: u32) -> &[FaceRegion] {
        self.frames.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set(&mut self, frame: u32, regions: Vec<FaceRegion>) {
        if regions.is_empty() {
            self.frames.remove(&frame);
        } else {
            self.frames.insert(frame, regions);
        }
    }

    /// Removes every region on `frame`, returning what was there.
    pub fn take(&mut self, frame: u32) -> Vec<FaceRegion> {
        self.frames.remove(&frame).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &[FaceRegion])> {
        self.frames.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn frames_with_faces(&self) -> usize {
        self.frames.len()
    }

    pub fn total_regions(&self) -> usize {
        self.frames.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FromIterator<(u32, Vec<FaceRegion>)> for FrameAnnotations {
    fn from_iter<T: IntoIterator<Item = (u32, Vec<FaceRegion>)>>(iter: T) -> Self {
        let mut annotations = Self::new();
        for (frame, regions) in iter {
            annotations.set(frame, regions);
        }
        annotations
    }
}
